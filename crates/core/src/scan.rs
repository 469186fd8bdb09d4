//! Directory scanning for presentation files.

use crate::Result;
use std::path::Path;

/// Extensions recognised as presentations (lowercase, with the dot).
pub const PRESENTATION_EXTENSIONS: &[&str] = &[".pptx", ".ppt"];

/// Whether a file name looks like a presentation.
pub fn is_presentation_name(name: &str) -> bool {
    let lowered = name.to_lowercase();
    PRESENTATION_EXTENSIONS
        .iter()
        .any(|ext| lowered.ends_with(ext))
}

/// List presentation file names in `directory`.
///
/// Names come back in filesystem enumeration order. Subdirectories are
/// skipped. No matches is an empty list, not an error.
pub fn scan(directory: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                log::warn!("Skipping entry with non UTF-8 name: {:?}", raw);
                continue;
            }
        };

        if !is_presentation_name(&name) {
            continue;
        }

        if entry.file_type()?.is_dir() {
            log::debug!("Skipping directory {}", name);
            continue;
        }

        files.push(name);
    }

    log::debug!("Found {} presentation file(s) in {}", files.len(), directory.display());
    Ok(files)
}
