//! Expansion of the config's include patterns into the ordered file list
//! fed to the parser. Results are sorted and deduplicated so checking
//! order is stable across platforms and pattern overlaps.

use crate::config::ProjectConfig;
use crate::error::ProjectError;
use std::path::{Path, PathBuf};

pub fn project_files(root: &Path, config: &ProjectConfig) -> Result<Vec<PathBuf>, ProjectError> {
    let mut files = Vec::new();
    for pattern in &config.include {
        let full_pattern = root.join(pattern).to_string_lossy().into_owned();
        let entries =
            glob::glob(&full_pattern).map_err(|source| ProjectError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        for entry in entries {
            let path = entry?;
            if path.is_file() {
                files.push(path);
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}
