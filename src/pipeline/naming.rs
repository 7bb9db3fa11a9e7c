//! Output path resolution.
//!
//! Only the input's terminal file-name component is ever used, so any
//! directory or traversal segments in the input path are discarded and the
//! result is always a direct child of the chosen output directory.

use crate::profile::ConversionProfile;
use std::path::{Path, PathBuf};

/// Map an input file to its destination inside `output_dir`: the input's
/// base name (last `.ext` dropped) plus the profile's output format.
pub fn resolve_in_dir(input: &Path, output_dir: &Path, profile: &ConversionProfile) -> PathBuf {
    output_dir.join(format!("{}.{}", base_name(input), profile.output_format))
}

/// The input's file name with its last extension segment removed.
pub(crate) fn base_name(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.rfind('.') {
        Some(dot) => name[..dot].to_string(),
        None => name,
    }
}
