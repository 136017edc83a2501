//! Project-level plumbing around the core checker: the `rzk.yaml` config,
//! include-glob expansion, the parser collaborator interface, and the
//! multi-file driver with its optional incremental cache.

pub mod config;
pub mod driver;
pub mod error;
pub mod parser;
pub mod resolve;

pub use config::{load_config, parse_config, ProjectConfig, CONFIG_FILE};
pub use driver::{check_files, check_project, CheckedModule, CheckedProject, ProjectChecker};
pub use error::ProjectError;
pub use parser::{ModuleParser, ParseError};
pub use resolve::project_files;
