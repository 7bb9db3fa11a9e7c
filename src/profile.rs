//! Conversion profiles: static declarations of supported conversions.
//!
//! A profile is configuration data, not behaviour — the core passes its
//! options map through to the conversion service uninterpreted. The built-in
//! catalogue covers the stock conversions; callers can replace it with their
//! own list or load one from a JSON file via [`load_catalogue`].

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;

/// One supported conversion: input format, output format, and the opaque
/// option map merged into the convert task request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionProfile {
    /// Stable identifier, e.g. "mod-mov".
    pub id: String,
    /// Human-readable name, e.g. "MOD → MOV".
    pub display_name: String,
    /// Required input format, lowercase, no dot, e.g. "mod".
    pub input_format: String,
    /// Produced output format, lowercase, no dot, e.g. "mov".
    pub output_format: String,
    /// Conversion options passed through to the service uninterpreted.
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl ConversionProfile {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        input_format: impl Into<String>,
        output_format: impl Into<String>,
        options: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            input_format: input_format.into(),
            output_format: output_format.into(),
            options,
        }
    }
}

/// The stock profile catalogue.
pub fn builtin() -> Vec<ConversionProfile> {
    vec![
        ConversionProfile::new(
            "mod-mov",
            "MOD → MOV",
            "mod",
            "mov",
            object(&[("video_codec", json!("h264")), ("crf", json!(23))]),
        ),
        ConversionProfile::new(
            "jpg-webp",
            "JPEG → WEBP",
            "jpg",
            "webp",
            object(&[("quality", json!(85))]),
        ),
        ConversionProfile::new(
            "docx-pdf",
            "DOCX → PDF",
            "docx",
            "pdf",
            object(&[("engine", json!("office"))]),
        ),
    ]
}

/// Look up a profile by id.
pub fn find<'a>(catalogue: &'a [ConversionProfile], id: &str) -> Option<&'a ConversionProfile> {
    catalogue.iter().find(|p| p.id == id)
}

/// Load a profile catalogue from a JSON file (an array of profiles).
pub fn load_catalogue(path: &Path) -> Result<Vec<ConversionProfile>, ConvertError> {
    let bytes = std::fs::read(path)?;
    let profiles: Vec<ConversionProfile> = serde_json::from_slice(&bytes).map_err(|e| {
        ConvertError::InvalidConfig(format!("invalid profile catalogue '{}': {e}", path.display()))
    })?;
    if profiles.is_empty() {
        return Err(ConvertError::InvalidConfig(format!(
            "profile catalogue '{}' is empty",
            path.display()
        )));
    }
    Ok(profiles)
}

fn object(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_catalogue_has_unique_ids() {
        let catalogue = builtin();
        let mut ids: Vec<&str> = catalogue.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), catalogue.len());
    }

    #[test]
    fn find_by_id() {
        let catalogue = builtin();
        let profile = find(&catalogue, "jpg-webp").expect("jpg-webp exists");
        assert_eq!(profile.input_format, "jpg");
        assert_eq!(profile.output_format, "webp");
        assert_eq!(profile.options.get("quality"), Some(&json!(85)));
        assert!(find(&catalogue, "no-such-profile").is_none());
    }

    #[test]
    fn catalogue_loads_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"png-avif","display_name":"PNG → AVIF","input_format":"png","output_format":"avif"}}]"#
        )
        .unwrap();

        let catalogue = load_catalogue(file.path()).unwrap();
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue[0].id, "png-avif");
        // options omitted in the file defaults to an empty map
        assert!(catalogue[0].options.is_empty());
    }

    #[test]
    fn empty_catalogue_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        let err = load_catalogue(file.path()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
