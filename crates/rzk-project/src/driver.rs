//! The multi-file driver: parse each project file through the collaborator
//! and check the modules in order, threading one checker state. An error
//! halts the run; the embedding tool decides whether to re-invoke.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rzk_syntax::Module;
use rzk_typeck::{TypeCheck, TypedDecl};

use crate::config::{self, ProjectConfig};
use crate::error::ProjectError;
use crate::parser::ModuleParser;
use crate::resolve;

/// One checked file: its declarations with evaluated types, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedModule {
    pub path: PathBuf,
    pub decls: Vec<TypedDecl>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckedProject {
    pub modules: Vec<CheckedModule>,
}

/// Check a whole project from its `rzk.yaml`, without caching.
pub fn check_project(
    parser: &dyn ModuleParser,
    root: &Path,
) -> Result<CheckedProject, ProjectError> {
    let config = config::load_config(root)?;
    let files = resolve::project_files(root, &config)?;
    check_files(parser, &files)
}

/// Check an explicit, ordered list of files with a fresh checker state.
pub fn check_files(
    parser: &dyn ModuleParser,
    files: &[PathBuf],
) -> Result<CheckedProject, ProjectError> {
    let mut state = TypeCheck::new();
    let mut modules = Vec::with_capacity(files.len());
    for path in files {
        let module = parse(parser, path)?;
        let decls = state.check_module(path, &module)?;
        modules.push(CheckedModule {
            path: path.clone(),
            decls,
        });
    }
    Ok(CheckedProject { modules })
}

fn parse(parser: &dyn ModuleParser, path: &Path) -> Result<Module, ProjectError> {
    parser
        .parse_module_file(path)
        .map_err(|source| ProjectError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// A driver that keeps per-file results between runs.
///
/// A file whose parsed module is identical to the cached one is not
/// re-checked: its cached declarations are replayed into the context.
/// This assumes each file's checked declarations are semantically
/// independent of sibling files' contents; the driver states this
/// contract but does not verify it. The cache is dropped whenever the
/// project configuration changes.
#[derive(Default)]
pub struct ProjectChecker {
    config: Option<ProjectConfig>,
    cache: HashMap<PathBuf, CacheEntry>,
}

struct CacheEntry {
    module: Module,
    decls: Vec<TypedDecl>,
}

impl ProjectChecker {
    pub fn new() -> Self {
        ProjectChecker::default()
    }

    pub fn check_project(
        &mut self,
        parser: &dyn ModuleParser,
        root: &Path,
    ) -> Result<CheckedProject, ProjectError> {
        let config = config::load_config(root)?;
        if self.config.as_ref() != Some(&config) {
            self.cache.clear();
            self.config = Some(config.clone());
        }
        let files = resolve::project_files(root, &config)?;
        self.check_files(parser, &files)
    }

    pub fn check_files(
        &mut self,
        parser: &dyn ModuleParser,
        files: &[PathBuf],
    ) -> Result<CheckedProject, ProjectError> {
        let mut state = TypeCheck::new();
        let mut modules = Vec::with_capacity(files.len());
        for path in files {
            let module = parse(parser, path)?;
            let cached = self
                .cache
                .get(path)
                .filter(|entry| entry.module == module)
                .map(|entry| entry.decls.clone());
            let decls = match cached {
                Some(decls) => {
                    for decl in &decls {
                        state.declare(decl.name.clone(), decl.ty.clone(), decl.body.clone());
                    }
                    decls
                }
                None => {
                    self.cache.remove(path);
                    let decls = state.check_module(path, &module)?;
                    self.cache.insert(
                        path.clone(),
                        CacheEntry {
                            module,
                            decls: decls.clone(),
                        },
                    );
                    decls
                }
            };
            modules.push(CheckedModule {
                path: path.clone(),
                decls,
            });
        }
        Ok(CheckedProject { modules })
    }
}
