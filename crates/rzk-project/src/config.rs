//! The `rzk.yaml` project file: which source files belong to the project.

use crate::error::ProjectError;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE: &str = "rzk.yaml";

/// Parsed `rzk.yaml`. Unknown fields are ignored so newer tools can add
/// their own sections without breaking the checker.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectConfig {
    /// Glob patterns, relative to the workspace root, selecting the files
    /// to check.
    pub include: Vec<String>,
}

pub fn parse_config(source: &str) -> Result<ProjectConfig, ProjectError> {
    Ok(serde_yaml::from_str(source)?)
}

/// Read `rzk.yaml` from the workspace root.
pub fn load_config(root: &Path) -> Result<ProjectConfig, ProjectError> {
    let path = root.join(CONFIG_FILE);
    let source = std::fs::read_to_string(&path).map_err(|source| ProjectError::Io {
        path: path.clone(),
        source,
    })?;
    parse_config(&source)
}
