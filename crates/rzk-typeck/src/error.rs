use rzk_syntax::{Term, Var};
use std::fmt;
use std::path::{Path, PathBuf};

pub type Result<T, E = TypeError> = std::result::Result<T, E>;

// ── Evaluation errors ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("undefined variable `{0}`")]
    UndefinedVariable(Var),

    #[error("cannot take `{projection}` of a term that is not a pair")]
    ProjectionOfNonPair { projection: &'static str },
}

// ── Type errors ──────────────────────────────────────────────────

/// Everything the checker can reject. Each variant keeps the term under
/// inspection and whatever sub-terms the renderer needs; nothing is
/// recovered mid-check — the first error aborts the current declaration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("cannot solve `?{hole}` with `{term}`: the solution would be infinite")]
    Infinite { hole: Var, term: Term },

    #[error("expected `{expected_full}` but inferred `{inferred_full}` for `{term}` (`{inferred}` does not match `{expected}`)")]
    Unexpected {
        term: Term,
        inferred_full: Term,
        expected_full: Term,
        inferred: Term,
        expected: Term,
    },

    #[error("evaluation of `{term}` failed: {source}")]
    Eval {
        term: Term,
        #[source]
        source: EvalError,
    },

    #[error("{0}")]
    Other(String),

    #[error("cannot infer the type of lambda `{0}`")]
    CannotInferLambda(Term),

    #[error("cannot infer the type of pair `{0}`")]
    CannotInferPair(Term),

    #[error("`{fun}` of type `{fun_type}` is not a function and cannot be applied to `{arg}`")]
    NotAFunction {
        fun: Term,
        fun_type: Term,
        arg: Term,
    },

    #[error("cannot take `{projection}` of `{term}` of type `{term_type}`")]
    NotAPair {
        term: Term,
        term_type: Term,
        projection: &'static str,
    },

    #[error("lambda `{term}` checked against non-function type `{expected}`")]
    ExpectedFunctionType { term: Term, expected: Term },

    #[error("`{0}` is not a valid type family")]
    InvalidTypeFamily(Term),

    #[error("tope `{tope}` is not satisfied while checking `{term}` (assumed topes: {})", render_topes(.context))]
    TopeContextNotSatisfied {
        term: Term,
        tope: Term,
        context: Vec<Term>,
    },
}

fn render_topes(topes: &[Term]) -> String {
    if topes.is_empty() {
        return "none".to_string();
    }
    topes
        .iter()
        .map(|t| format!("`{}`", t))
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Context snapshot ─────────────────────────────────────────────

/// The checker state at the moment a declaration failed: everything the
/// CLI collaborator dumps alongside the first error.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContextSnapshot {
    /// Known variable typings, sorted by name.
    pub types: Vec<(Var, Term)>,
    /// Solved holes, sorted by name.
    pub holes: Vec<(Var, Term)>,
    /// Topes assumed at the failure point, oldest first.
    pub topes: Vec<Term>,
    /// Value environment, oldest first.
    pub env: Vec<(Var, Term)>,
}

impl fmt::Display for ContextSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Known types:")?;
        for (x, ty) in &self.types {
            writeln!(f, "  {} : {}", x, ty)?;
        }
        writeln!(f, "Known hole solutions:")?;
        for (h, t) in &self.holes {
            writeln!(f, "  ?{} := {}", h, t)?;
        }
        writeln!(f, "Local topes:")?;
        for t in &self.topes {
            writeln!(f, "  {}", t)?;
        }
        writeln!(f, "Defined variables:")?;
        for (x, t) in &self.env {
            writeln!(f, "  {} := {}", x, t)?;
        }
        Ok(())
    }
}

// ── Located errors ───────────────────────────────────────────────

/// A type error attached to the declaration it stopped on.
///
/// Lines come from the parser; 0 means the declaration carried no
/// position and the checker never invents one.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedTypeError {
    pub path: PathBuf,
    pub line: u32,
    pub decl: Var,
    pub error: TypeError,
    pub context: ContextSnapshot,
}

impl LocatedTypeError {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// The one-line human message, without the context dump.
    pub fn message(&self) -> String {
        format!(
            "{}:{}: in `{}`: {}",
            self.path.display(),
            self.line,
            self.decl,
            self.error
        )
    }
}

impl fmt::Display for LocatedTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message())?;
        write!(f, "{}", self.context)
    }
}

impl std::error::Error for LocatedTypeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
