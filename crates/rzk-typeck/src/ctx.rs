//! The shared checker state: typing assumptions, value environment, tope
//! constraints and the hole store. All other components (`eval`, `topes`,
//! `unify`, `checker`) are `impl` blocks over [`TypeCheck`] so the whole
//! strongly-connected core shares one mutable state.

use rzk_syntax::{refresh_var, Term, Var};
use std::collections::{HashMap, HashSet};

use crate::error::{ContextSnapshot, Result};

/// The checker state for one top-level run.
///
/// Not shareable between threads; a single entry point
/// ([`crate::check_module`] or the closed-term helpers) owns it for the
/// duration of a check.
#[derive(Debug, Default)]
pub struct TypeCheck {
    /// Declared type of each free variable in scope.
    types: HashMap<Var, Term>,
    /// Value definitions, oldest first. Lookup scans from the back so
    /// inner bindings shadow outer ones.
    env: Vec<(Var, Term)>,
    /// Topes assumed true here, oldest first.
    topes: Vec<Term>,
    /// Solved holes. Solutions are fully propagated: no solution mentions
    /// another solved hole.
    holes_known: HashMap<Var, Term>,
    /// Every hole ever introduced, solved or not.
    holes_declared: HashSet<Var>,
    next_hole: u64,
}

impl TypeCheck {
    pub fn new() -> Self {
        TypeCheck::default()
    }

    // ── Typing assumptions ───────────────────────────────────────

    pub fn lookup_type(&self, var: &Var) -> Option<&Term> {
        self.types.get(var)
    }

    pub fn set_type(&mut self, var: Var, ty: Term) {
        self.types.insert(var, ty);
    }

    pub fn unset_type(&mut self, var: &Var) {
        self.types.remove(var);
    }

    // ── Value environment ────────────────────────────────────────

    pub(crate) fn lookup_env(&self, var: &Var) -> Option<&Term> {
        self.env
            .iter()
            .rev()
            .find(|(x, _)| x == var)
            .map(|(_, t)| t)
    }

    pub(crate) fn env_mentions(&self, var: &Var) -> bool {
        self.env
            .iter()
            .any(|(x, value)| x == var || value.free_vars().contains(var))
    }

    /// Record a finished top-level declaration: its type and its value.
    pub fn declare(&mut self, name: Var, ty: Term, body: Term) {
        self.types.insert(name.clone(), ty);
        self.env.push((name, body));
    }

    // ── Topes ────────────────────────────────────────────────────

    pub(crate) fn topes(&self) -> &[Term] {
        &self.topes
    }

    pub(crate) fn replace_topes(&mut self, topes: Vec<Term>) -> Vec<Term> {
        std::mem::replace(&mut self.topes, topes)
    }

    // ── Scoped state ─────────────────────────────────────────────
    //
    // Every `local_*` restores the frame on each exit path: the body runs
    // as a closure and the pop happens unconditionally before its result
    // (ok or error) is propagated. Nested scopes therefore pop in LIFO
    // order even when a rule fails halfway through.

    pub fn local_typing<T>(
        &mut self,
        var: &Var,
        ty: Option<Term>,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = self.types.remove(var);
        if let Some(ty) = ty {
            self.types.insert(var.clone(), ty);
        }
        let result = body(self);
        match saved {
            Some(prev) => {
                self.types.insert(var.clone(), prev);
            }
            None => {
                self.types.remove(var);
            }
        }
        result
    }

    pub fn local_constraint<T>(
        &mut self,
        tope: Term,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.topes.push(tope);
        let result = body(self);
        self.topes.pop();
        result
    }

    pub fn local_var<T>(
        &mut self,
        var: &Var,
        value: Term,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.env.push((var.clone(), value));
        let result = body(self);
        self.env.pop();
        result
    }

    // ── Fresh names ──────────────────────────────────────────────

    /// A name disjoint from everything in scope and from `avoid`.
    pub(crate) fn fresh_var(&self, base: &Var, avoid: &HashSet<Var>) -> Var {
        let mut used = self.in_scope_names();
        used.extend(avoid.iter().cloned());
        used.insert(base.clone());
        refresh_var(base, &used)
    }

    pub(crate) fn in_scope_names(&self) -> HashSet<Var> {
        let mut names: HashSet<Var> = self.types.keys().cloned().collect();
        names.extend(self.env.iter().map(|(x, _)| x.clone()));
        names.extend(self.holes_declared.iter().cloned());
        names
    }

    // ── Holes ────────────────────────────────────────────────────

    pub fn fresh_hole(&mut self) -> Var {
        loop {
            self.next_hole += 1;
            let name = Var::new(format!("h{}", self.next_hole));
            if !self.holes_declared.contains(&name) && !self.types.contains_key(&name) {
                self.holes_declared.insert(name.clone());
                return name;
            }
        }
    }

    pub(crate) fn is_declared_hole(&self, var: &Var) -> bool {
        self.holes_declared.contains(var)
    }

    pub fn lookup_hole(&self, hole: &Var) -> Option<&Term> {
        self.holes_known.get(hole)
    }

    /// Record a solution and rewrite every existing solution with it, so
    /// that no solved hole's right-hand side mentions another solved hole.
    /// Solutions are never retracted.
    pub fn instantiate_hole(&mut self, hole: Var, term: Term) {
        let term = self.resolve_solved_holes(&term);
        for solution in self.holes_known.values_mut() {
            *solution = substitute_hole(&hole, &term, solution);
        }
        self.holes_declared.insert(hole.clone());
        self.holes_known.insert(hole, term);
    }

    /// Replace already-solved holes in `term` by their solutions. Stored
    /// solutions are propagated, so a single pass is enough.
    pub(crate) fn resolve_solved_holes(&self, term: &Term) -> Term {
        let mut out = term.clone();
        for (hole, solution) in &self.holes_known {
            out = substitute_hole(hole, solution, &out);
        }
        out
    }

    // ── Snapshots ────────────────────────────────────────────────

    pub fn snapshot(&self) -> ContextSnapshot {
        let mut types: Vec<_> = self
            .types
            .iter()
            .map(|(x, t)| (x.clone(), t.clone()))
            .collect();
        types.sort_by(|(a, _), (b, _)| a.cmp(b));
        let mut holes: Vec<_> = self
            .holes_known
            .iter()
            .map(|(x, t)| (x.clone(), t.clone()))
            .collect();
        holes.sort_by(|(a, _), (b, _)| a.cmp(b));
        ContextSnapshot {
            types,
            holes,
            topes: self.topes.clone(),
            env: self.env.clone(),
        }
    }
}

/// Replace occurrences of `Hole(hole)` in `term` by `replacement`,
/// refreshing binders that would capture a free variable of the
/// replacement.
pub(crate) fn substitute_hole(hole: &Var, replacement: &Term, term: &Term) -> Term {
    match term {
        Term::Hole(x) if x == hole => replacement.clone(),
        Term::Var(_)
        | Term::Hole(_)
        | Term::Universe
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
        Term::Typed(t, ty) => Term::Typed(sub(hole, replacement, t), sub(hole, replacement, ty)),
        Term::Pi(f) => Term::Pi(sub(hole, replacement, f)),
        Term::Sigma(f) => Term::Sigma(sub(hole, replacement, f)),
        Term::First(t) => Term::First(sub(hole, replacement, t)),
        Term::Second(t) => Term::Second(sub(hole, replacement, t)),
        Term::App(f, a) => Term::App(sub(hole, replacement, f), sub(hole, replacement, a)),
        Term::Pair(a, b) => Term::Pair(sub(hole, replacement, a), sub(hole, replacement, b)),
        Term::CubeProd(i, j) => {
            Term::CubeProd(sub(hole, replacement, i), sub(hole, replacement, j))
        }
        Term::TopeOr(a, b) => Term::TopeOr(sub(hole, replacement, a), sub(hole, replacement, b)),
        Term::TopeAnd(a, b) => {
            Term::TopeAnd(sub(hole, replacement, a), sub(hole, replacement, b))
        }
        Term::TopeEq(a, b) => Term::TopeEq(sub(hole, replacement, a), sub(hole, replacement, b)),
        Term::TopeLeq(a, b) => {
            Term::TopeLeq(sub(hole, replacement, a), sub(hole, replacement, b))
        }
        Term::IdType(a, x, y) => Term::IdType(
            sub(hole, replacement, a),
            sub(hole, replacement, x),
            sub(hole, replacement, y),
        ),
        Term::Refl(ty, x) => Term::Refl(
            ty.as_ref().map(|t| sub(hole, replacement, t)),
            sub(hole, replacement, x),
        ),
        Term::IdJ(a, b, c, d, e, f) => Term::IdJ(
            sub(hole, replacement, a),
            sub(hole, replacement, b),
            sub(hole, replacement, c),
            sub(hole, replacement, d),
            sub(hole, replacement, e),
            sub(hole, replacement, f),
        ),
        Term::RecOr(psi, phi, a, b) => Term::RecOr(
            sub(hole, replacement, psi),
            sub(hole, replacement, phi),
            sub(hole, replacement, a),
            sub(hole, replacement, b),
        ),
        Term::Lambda {
            var,
            arg_ty,
            guard,
            body,
        } => {
            let arg_ty = arg_ty.as_ref().map(|t| sub(hole, replacement, t));
            let replacement_free = replacement.free_vars();
            let (var, guard, body) = if replacement_free.contains(var) {
                let mut used = replacement_free;
                used.extend(body.free_vars());
                if let Some(g) = guard {
                    used.extend(g.free_vars());
                }
                let fresh = refresh_var(var, &used);
                (
                    fresh.clone(),
                    guard
                        .as_ref()
                        .map(|g| rzk_syntax::rename_var(var, &fresh, g)),
                    rzk_syntax::rename_var(var, &fresh, body),
                )
            } else {
                (
                    var.clone(),
                    guard.as_deref().cloned(),
                    body.as_ref().clone(),
                )
            };
            Term::Lambda {
                var,
                arg_ty,
                guard: guard.map(|g| sub(hole, replacement, &g)),
                body: sub(hole, replacement, &body),
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
            let cube = sub(hole, replacement, cube);
            let replacement_free = replacement.free_vars();
            let (var, shape, ty, tope, bound) = if replacement_free.contains(var) {
                let mut used = replacement_free;
                for t in [shape.as_ref(), ty.as_ref(), tope.as_ref(), bound.as_ref()] {
                    used.extend(t.free_vars());
                }
                let fresh = refresh_var(var, &used);
                (
                    fresh.clone(),
                    rzk_syntax::rename_var(var, &fresh, shape),
                    rzk_syntax::rename_var(var, &fresh, ty),
                    rzk_syntax::rename_var(var, &fresh, tope),
                    rzk_syntax::rename_var(var, &fresh, bound),
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
                var,
                cube,
                shape: sub(hole, replacement, &shape),
                ty: sub(hole, replacement, &ty),
                tope: sub(hole, replacement, &tope),
                term: sub(hole, replacement, &bound),
            }
        }
    }
}

fn sub(hole: &Var, replacement: &Term, term: &Term) -> Box<Term> {
    Box::new(substitute_hole(hole, replacement, term))
}
