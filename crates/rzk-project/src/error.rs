use crate::parser::ParseError;
use rzk_typeck::LocatedTypeError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error: {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse rzk.yaml: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("invalid include pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("failed to read a matched path: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        source: ParseError,
    },

    #[error("{0}")]
    Type(#[from] Box<LocatedTypeError>),
}
