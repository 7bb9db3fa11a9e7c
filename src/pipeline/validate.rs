//! Pre-flight validation for batch entries.
//!
//! Checks run in order and short-circuit on the first failure, each with a
//! specific human-readable reason: the scheduler shows these verbatim as the
//! entry's Skipped/Failed message. Validation is a pure function of
//! filesystem state — calling it twice without a filesystem change yields
//! the same answer.

use crate::profile::ConversionProfile;
use std::collections::BTreeSet;
use std::path::Path;

/// Validates entries against the known profile catalogue.
///
/// The allowed-extension set is derived once from the catalogue's input
/// formats, with `.jpeg` accepted wherever a profile declares `jpg`.
#[derive(Debug, Clone)]
pub struct Validator {
    allowed_extensions: BTreeSet<String>,
}

impl Validator {
    pub fn new(catalogue: &[ConversionProfile]) -> Self {
        let mut allowed_extensions = BTreeSet::new();
        for profile in catalogue {
            let format = profile.input_format.trim().to_ascii_lowercase();
            if format.is_empty() {
                continue;
            }
            allowed_extensions.insert(format!(".{format}"));
            if format == "jpg" {
                allowed_extensions.insert(".jpeg".to_string());
            }
        }
        Self { allowed_extensions }
    }

    /// Check one input file against its assigned profile.
    ///
    /// Returns `Err(reason)` on the first failing check.
    pub fn validate(&self, input: &Path, profile: &ConversionProfile) -> Result<(), String> {
        if input.as_os_str().is_empty() || input.file_name().is_none() {
            return Err("Invalid batch entry".to_string());
        }
        if !input.exists() {
            return Err("File does not exist".to_string());
        }
        if std::fs::File::open(input).is_err() {
            return Err("File is not readable".to_string());
        }
        match std::fs::metadata(input) {
            Ok(meta) => {
                if meta.len() == 0 {
                    return Err("File is empty".to_string());
                }
            }
            Err(e) => return Err(format!("Cannot read file size: {e}")),
        }
        let ext = extension_of(input);
        if !self.allowed_extensions.contains(&ext.to_ascii_lowercase()) {
            return Err(format!("Format not supported: {ext}"));
        }
        if !is_profile_compatible(&ext, profile) {
            return Err("Profile incompatible with file format".to_string());
        }
        Ok(())
    }
}

/// The input's extension including the leading dot, or "" if it has none.
fn extension_of(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.rfind('.') {
        Some(dot) => format!(".{}", &name[dot + 1..]),
        None => String::new(),
    }
}

fn is_profile_compatible(ext: &str, profile: &ConversionProfile) -> bool {
    let mut normalized = ext.trim_start_matches('.').to_ascii_lowercase();
    if normalized == "jpeg" {
        normalized = "jpg".to_string();
    }
    normalized == profile.input_format.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile;
    use std::io::Write;

    fn validator() -> Validator {
        Validator::new(&profile::builtin())
    }

    fn mod_profile() -> ConversionProfile {
        profile::find(&profile::builtin(), "mod-mov").unwrap().clone()
    }

    fn jpg_profile() -> ConversionProfile {
        profile::find(&profile::builtin(), "jpg-webp").unwrap().clone()
    }

    fn write_file(dir: &Path, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        path
    }

    #[test]
    fn missing_file_is_rejected() {
        let err = validator()
            .validate(Path::new("/no/such/file.mod"), &mod_profile())
            .unwrap_err();
        assert_eq!(err, "File does not exist");
    }

    #[test]
    fn empty_path_is_rejected() {
        let err = validator().validate(Path::new(""), &mod_profile()).unwrap_err();
        assert_eq!(err, "Invalid batch entry");
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(dir.path(), "video.mod", b"");
        let err = validator().validate(&input, &mod_profile()).unwrap_err();
        assert_eq!(err, "File is empty");
    }

    #[test]
    fn unknown_extension_is_rejected_with_the_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(dir.path(), "notes.txt", b"hello");
        let err = validator().validate(&input, &mod_profile()).unwrap_err();
        assert_eq!(err, "Format not supported: .txt");
    }

    #[test]
    fn known_format_with_wrong_profile_is_incompatible() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(dir.path(), "photo.jpg", b"jpegdata");
        let err = validator().validate(&input, &mod_profile()).unwrap_err();
        assert!(err.contains("incompatible"), "got: {err}");
    }

    #[test]
    fn jpeg_extension_matches_jpg_profile() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.jpg", "b.jpeg", "c.JPG", "d.JPEG"] {
            let input = write_file(dir.path(), name, b"jpegdata");
            assert!(
                validator().validate(&input, &jpg_profile()).is_ok(),
                "{name} should be accepted"
            );
        }
    }

    #[test]
    fn uppercase_extension_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(dir.path(), "VIDEO.MOD", b"raw");
        assert!(validator().validate(&input, &mod_profile()).is_ok());
    }

    #[test]
    fn validation_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(dir.path(), "video.mod", b"raw");
        let v = validator();
        let first = v.validate(&input, &jpg_profile());
        let second = v.validate(&input, &jpg_profile());
        assert_eq!(first, second);
    }
}
