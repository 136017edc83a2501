//! The core type checker: a bidirectional checker with first-order
//! unification, hole instantiation and tope entailment for a type theory
//! with shapes.
//!
//! The state lives in [`TypeCheck`]; `eval`, the tope engine, the unifier
//! and the checker are peer operations over it. Checking is synchronous
//! and single-threaded: one entry point owns the state for the duration of
//! a run, and every scoped assumption is restored on every exit path.

mod checker;
mod ctx;
mod error;
mod eval;
mod topes;
mod unify;

#[cfg(test)]
mod tests;

pub use checker::TypedDecl;
pub use ctx::TypeCheck;
pub use error::{ContextSnapshot, EvalError, LocatedTypeError, TypeError};

use rzk_syntax::{Module, Term};
use std::path::Path;

/// Check a closed term against a closed type with a fresh checker state.
pub fn check_closed_term(term: &Term, ty: &Term) -> Result<(), TypeError> {
    let mut state = TypeCheck::new();
    let ty = state.eval_type(ty)?;
    state.check(term, &ty)
}

/// Infer the type of a closed term with a fresh checker state.
pub fn infer_closed_term(term: &Term) -> Result<Term, TypeError> {
    TypeCheck::new().infer(term)
}

/// Check a whole module with a fresh checker state.
pub fn check_module(path: &Path, module: &Module) -> Result<Vec<TypedDecl>, Box<LocatedTypeError>> {
    TypeCheck::new().check_module(path, module)
}
