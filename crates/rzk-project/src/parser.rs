//! The parser collaborator interface. This crate never parses surface
//! syntax itself; the embedding tool supplies an implementation and the
//! driver feeds it the resolved file list in order.

use rzk_syntax::Module;
use std::path::Path;

/// An opaque parse failure, reported verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error: {0}")]
pub struct ParseError(pub String);

/// Supplies parsed, named modules for project files.
pub trait ModuleParser {
    fn parse_module_file(&self, path: &Path) -> Result<Module, ParseError>;
}
