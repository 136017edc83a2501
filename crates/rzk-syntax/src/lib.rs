pub mod pretty;

use smol_str::SmolStr;
use std::collections::HashSet;

// ── Identifiers ──────────────────────────────────────────────────

/// A named identifier.
///
/// Variables and holes draw from the same supply: a hole is a `Var` that
/// appears under [`Term::Hole`]. Binders introduce a `Var`; [`refresh_var`]
/// produces a name disjoint from a given used-set when a binder has to be
/// renamed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(SmolStr);

impl Var {
    pub fn new(name: impl AsRef<str>) -> Self {
        Var(SmolStr::new(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for Var {
    fn from(name: &str) -> Self {
        Var::new(name)
    }
}

impl std::fmt::Display for Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Produce a name disjoint from `used` by appending prime marks.
///
/// Deterministic given the same inputs — error messages and hole names
/// must be reproducible across runs.
pub fn refresh_var(var: &Var, used: &HashSet<Var>) -> Var {
    let mut candidate = var.clone();
    while used.contains(&candidate) {
        candidate = Var(SmolStr::new(format!("{}′", candidate.0)));
    }
    candidate
}

// ── Terms ────────────────────────────────────────────────────────

/// The term language: one algebraic type covering types, cubes, topes and
/// their inhabitants.
///
/// Binders are [`Term::Lambda`] and [`Term::ExtensionType`]; `Pi` and
/// `Sigma` carry their type family as a nested `Lambda`. A `Lambda` whose
/// tope guard is present always carries its cube annotation as well
/// (cube-indexed binders are never inferred).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Var(Var),
    /// A metavariable, solvable by unification.
    Hole(Var),
    Universe,
    /// Explicit ascription `(t : A)`.
    Typed(Box<Term>, Box<Term>),

    /// Dependent function former; the child is the type family `Lambda`.
    Pi(Box<Term>),
    /// Dependent pair former; the child is the type family `Lambda`.
    Sigma(Box<Term>),
    Lambda {
        var: Var,
        /// Type of the bound variable, when annotated. Not under the binder.
        arg_ty: Option<Box<Term>>,
        /// Tope guard restricting the domain. Under the binder.
        guard: Option<Box<Term>>,
        body: Box<Term>,
    },
    App(Box<Term>, Box<Term>),

    Pair(Box<Term>, Box<Term>),
    First(Box<Term>),
    Second(Box<Term>),

    /// Identity type `x =_{A} y`.
    IdType(Box<Term>, Box<Term>, Box<Term>),
    /// `refl_{x : A}`; the type witness may be omitted and filled in later.
    Refl(Option<Box<Term>>, Box<Term>),
    /// Path eliminator `idJ(A, a, C, d, x, p)`.
    IdJ(
        Box<Term>,
        Box<Term>,
        Box<Term>,
        Box<Term>,
        Box<Term>,
        Box<Term>,
    ),

    /// The universe of cubes.
    Cube,
    CubeUnit,
    CubeUnitStar,
    CubeProd(Box<Term>, Box<Term>),
    /// The directed interval.
    Cube2,
    Cube2_0,
    Cube2_1,

    /// The universe of topes.
    Tope,
    TopeTop,
    TopeBottom,
    TopeOr(Box<Term>, Box<Term>),
    TopeAnd(Box<Term>, Box<Term>),
    TopeEq(Box<Term>, Box<Term>),
    TopeLeq(Box<Term>, Box<Term>),

    /// Eliminator for the absurd tope.
    RecBottom,
    /// Eliminator for a tope disjunction: `recOR(ψ, φ, a, b)`.
    RecOr(Box<Term>, Box<Term>, Box<Term>, Box<Term>),

    /// `<{t : I | ψ} -> A [φ |-> a]>` — functions on the sub-shape `ψ` of
    /// the cube `I`, landing in `A`, agreeing with `a` on the boundary `φ`.
    /// `cube` is not under the binder; `shape`, `ty`, `tope` and `term` are.
    ExtensionType {
        var: Var,
        cube: Box<Term>,
        shape: Box<Term>,
        ty: Box<Term>,
        tope: Box<Term>,
        term: Box<Term>,
    },
}

impl Term {
    /// The set of free identifiers, holes included.
    pub fn free_vars(&self) -> HashSet<Var> {
        let mut out = HashSet::new();
        collect_free_vars(self, &mut out);
        out
    }
}

fn collect_free_vars(term: &Term, out: &mut HashSet<Var>) {
    match term {
        Term::Var(x) | Term::Hole(x) => {
            out.insert(x.clone());
        }
        Term::Universe
        | Term::Cube
        | Term::CubeUnit
        | Term::CubeUnitStar
        | Term::Cube2
        | Term::Cube2_0
        | Term::Cube2_1
        | Term::Tope
        | Term::TopeTop
        | Term::TopeBottom
        | Term::RecBottom => {}
        Term::Typed(t, ty) => {
            collect_free_vars(t, out);
            collect_free_vars(ty, out);
        }
        Term::Pi(f) | Term::Sigma(f) | Term::First(f) | Term::Second(f) => {
            collect_free_vars(f, out);
        }
        Term::Lambda {
            var,
            arg_ty,
            guard,
            body,
        } => {
            if let Some(a) = arg_ty {
                collect_free_vars(a, out);
            }
            let mut inner = HashSet::new();
            if let Some(g) = guard {
                collect_free_vars(g, &mut inner);
            }
            collect_free_vars(body, &mut inner);
            inner.remove(var);
            out.extend(inner);
        }
        Term::App(f, a)
        | Term::Pair(f, a)
        | Term::CubeProd(f, a)
        | Term::TopeOr(f, a)
        | Term::TopeAnd(f, a)
        | Term::TopeEq(f, a)
        | Term::TopeLeq(f, a) => {
            collect_free_vars(f, out);
            collect_free_vars(a, out);
        }
        Term::IdType(a, x, y) => {
            collect_free_vars(a, out);
            collect_free_vars(x, out);
            collect_free_vars(y, out);
        }
        Term::Refl(ty, x) => {
            if let Some(ty) = ty {
                collect_free_vars(ty, out);
            }
            collect_free_vars(x, out);
        }
        Term::IdJ(a, b, c, d, e, f) => {
            for t in [a, b, c, d, e, f] {
                collect_free_vars(t, out);
            }
        }
        Term::RecOr(psi, phi, a, b) => {
            for t in [psi, phi, a, b] {
                collect_free_vars(t, out);
            }
        }
        Term::ExtensionType {
            var,
            cube,
            shape,
            ty,
            tope,
            term,
        } => {
            collect_free_vars(cube, out);
            let mut inner = HashSet::new();
            for t in [shape, ty, tope, term] {
                collect_free_vars(t, &mut inner);
            }
            inner.remove(var);
            out.extend(inner);
        }
    }
}

// ── Renaming ─────────────────────────────────────────────────────

/// Replace free occurrences of `from` by `to` in `term`, renaming any
/// binder in `term` that would capture `to`.
pub fn rename_var(from: &Var, to: &Var, term: &Term) -> Term {
    match term {
        Term::Var(x) => {
            if x == from {
                Term::Var(to.clone())
            } else {
                term.clone()
            }
        }
        Term::Hole(x) => {
            if x == from {
                Term::Hole(to.clone())
            } else {
                term.clone()
            }
        }
        Term::Universe
        | Term::Cube
        | Term::CubeUnit
        | Term::CubeUnitStar
        | Term::Cube2
        | Term::Cube2_0
        | Term::Cube2_1
        | Term::Tope
        | Term::TopeTop
        | Term::TopeBottom
        | Term::RecBottom => term.clone(),
        Term::Typed(t, ty) => Term::Typed(ren(from, to, t), ren(from, to, ty)),
        Term::Pi(f) => Term::Pi(ren(from, to, f)),
        Term::Sigma(f) => Term::Sigma(ren(from, to, f)),
        Term::First(t) => Term::First(ren(from, to, t)),
        Term::Second(t) => Term::Second(ren(from, to, t)),
        Term::App(f, a) => Term::App(ren(from, to, f), ren(from, to, a)),
        Term::Pair(f, s) => Term::Pair(ren(from, to, f), ren(from, to, s)),
        Term::CubeProd(i, j) => Term::CubeProd(ren(from, to, i), ren(from, to, j)),
        Term::TopeOr(a, b) => Term::TopeOr(ren(from, to, a), ren(from, to, b)),
        Term::TopeAnd(a, b) => Term::TopeAnd(ren(from, to, a), ren(from, to, b)),
        Term::TopeEq(a, b) => Term::TopeEq(ren(from, to, a), ren(from, to, b)),
        Term::TopeLeq(a, b) => Term::TopeLeq(ren(from, to, a), ren(from, to, b)),
        Term::IdType(a, x, y) => {
            Term::IdType(ren(from, to, a), ren(from, to, x), ren(from, to, y))
        }
        Term::Refl(ty, x) => Term::Refl(
            ty.as_ref().map(|t| ren(from, to, t)),
            ren(from, to, x),
        ),
        Term::IdJ(a, b, c, d, e, f) => Term::IdJ(
            ren(from, to, a),
            ren(from, to, b),
            ren(from, to, c),
            ren(from, to, d),
            ren(from, to, e),
            ren(from, to, f),
        ),
        Term::RecOr(psi, phi, a, b) => Term::RecOr(
            ren(from, to, psi),
            ren(from, to, phi),
            ren(from, to, a),
            ren(from, to, b),
        ),
        Term::Lambda {
            var,
            arg_ty,
            guard,
            body,
        } => {
            let arg_ty = arg_ty.as_ref().map(|t| ren(from, to, t));
            if var == from {
                // Shadowed: the binder hides `from` in the guard and body.
                return Term::Lambda {
                    var: var.clone(),
                    arg_ty,
                    guard: guard.clone(),
                    body: body.clone(),
                };
            }
            let (var, guard, body) = rename_binder(from, to, var, guard.as_deref(), body);
            Term::Lambda {
                var,
                arg_ty,
                guard: guard.map(Box::new),
                body: Box::new(body),
            }
        }
        Term::ExtensionType {
            var,
            cube,
            shape,
            ty,
            tope,
            term: bound,
        } => {
            let cube = ren(from, to, cube);
            if var == from {
                return Term::ExtensionType {
                    var: var.clone(),
                    cube,
                    shape: shape.clone(),
                    ty: ty.clone(),
                    tope: tope.clone(),
                    term: bound.clone(),
                };
            }
            let (var, shape, ty, tope, bound) = if var == to {
                let mut used: HashSet<Var> = HashSet::new();
                for t in [shape.as_ref(), ty.as_ref(), tope.as_ref(), bound.as_ref()] {
                    used.extend(t.free_vars());
                }
                used.insert(from.clone());
                used.insert(to.clone());
                let fresh = refresh_var(var, &used);
                (
                    fresh.clone(),
                    rename_var(var, &fresh, shape),
                    rename_var(var, &fresh, ty),
                    rename_var(var, &fresh, tope),
                    rename_var(var, &fresh, bound),
                )
            } else {
                (
                    var.clone(),
                    shape.as_ref().clone(),
                    ty.as_ref().clone(),
                    tope.as_ref().clone(),
                    bound.as_ref().clone(),
                )
            };
            Term::ExtensionType {
                var: var.clone(),
                cube,
                shape: ren(from, to, &shape),
                ty: ren(from, to, &ty),
                tope: ren(from, to, &tope),
                term: ren(from, to, &bound),
            }
        }
    }
}

fn ren(from: &Var, to: &Var, term: &Term) -> Box<Term> {
    Box::new(rename_var(from, to, term))
}

/// Rename a lambda binder out of the way when it would capture `to`,
/// then apply the renaming to the guard and body.
fn rename_binder(
    from: &Var,
    to: &Var,
    var: &Var,
    guard: Option<&Term>,
    body: &Term,
) -> (Var, Option<Term>, Term) {
    let (var, guard, body) = if var == to {
        let mut used: HashSet<Var> = body.free_vars();
        if let Some(g) = guard {
            used.extend(g.free_vars());
        }
        used.insert(from.clone());
        used.insert(to.clone());
        let fresh = refresh_var(var, &used);
        (
            fresh.clone(),
            guard.map(|g| rename_var(var, &fresh, g)),
            rename_var(var, &fresh, body),
        )
    } else {
        (var.clone(), guard.cloned(), body.clone())
    };
    (
        var,
        guard.map(|g| rename_var(from, to, &g)),
        rename_var(from, to, &body),
    )
}

// ── Declarations and modules ─────────────────────────────────────

/// A source position supplied by the parser. The checker never invents
/// positions; a declaration without one reports line 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrcLoc {
    pub line: u32,
    pub column: u32,
}

/// A top-level declaration `name : ty := body`.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub name: Var,
    pub ty: Term,
    pub body: Term,
    pub ty_loc: Option<SrcLoc>,
    pub body_loc: Option<SrcLoc>,
}

impl Decl {
    pub fn new(name: impl Into<Var>, ty: Term, body: Term) -> Self {
        Decl {
            name: name.into(),
            ty,
            body,
            ty_loc: None,
            body_loc: None,
        }
    }

    /// Best-available line for error reporting: the type's location wins,
    /// the body's is the fallback, 0 means unknown.
    pub fn line(&self) -> u32 {
        self.ty_loc
            .or(self.body_loc)
            .map(|loc| loc.line)
            .unwrap_or(0)
    }
}

/// A parsed module: declarations in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub decls: Vec<Decl>,
}
