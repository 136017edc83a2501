//! First-order unification with hole instantiation.
//!
//! Both sides are evaluated up front, then walked structurally. Holes are
//! solved through an infinite-type check; functions and pairs are compared
//! up to η; applications are reduced through extension types before being
//! compared; tope connectives are compared by mutual entailment so that
//! commutativity and associativity do not cause spurious mismatches.
//!
//! Sound but deliberately incomplete: there is no higher-order pattern
//! unification.

use rzk_syntax::{rename_var, Term, Var};
use std::collections::HashSet;

use crate::ctx::TypeCheck;
use crate::error::{Result, TypeError};

/// The enclosing term and the two evaluated outer forms, kept so a deep
/// mismatch can report both the disagreeing sub-terms and their context.
struct UnifyCtx {
    term: Term,
    inferred_full: Term,
    expected_full: Term,
}

impl UnifyCtx {
    fn mismatch(&self, inferred: &Term, expected: &Term) -> TypeError {
        TypeError::Unexpected {
            term: self.term.clone(),
            inferred_full: self.inferred_full.clone(),
            expected_full: self.expected_full.clone(),
            inferred: inferred.clone(),
            expected: expected.clone(),
        }
    }
}

impl TypeCheck {
    /// Make `inferred` and `expected` equal, solving holes as needed.
    /// `term` is the term under inspection, used only for reporting.
    pub fn unify(&mut self, term: &Term, inferred: &Term, expected: &Term) -> Result<()> {
        let l = self.eval(inferred)?;
        let r = self.eval(expected)?;
        let cx = UnifyCtx {
            term: term.clone(),
            inferred_full: l.clone(),
            expected_full: r.clone(),
        };
        self.unify_terms(&cx, &l, &r)
    }

    fn unify_terms(&mut self, cx: &UnifyCtx, l: &Term, r: &Term) -> Result<()> {
        match (l, r) {
            (Term::Hole(x), Term::Hole(y)) if x == y => return Ok(()),
            (Term::Hole(h), _) => {
                return match self.lookup_hole(h).cloned() {
                    Some(solution) => self.unify_terms(cx, &solution, r),
                    None => {
                        self.check_infinite_type(h, r, r)?;
                        self.instantiate_hole(h.clone(), r.clone());
                        Ok(())
                    }
                };
            }
            (_, Term::Hole(x)) => {
                // Historical behavior, kept as-is: a hole on the right is
                // re-examined as a plain variable rather than instantiated.
                let as_var = Term::Var(x.clone());
                return self.unify_terms(cx, &as_var, l);
            }
            _ => {}
        }

        if l == r {
            return Ok(());
        }
        if let Term::Typed(t, _) = l {
            return self.unify_terms(cx, t, r);
        }
        if let Term::Typed(t, _) = r {
            return self.unify_terms(cx, l, t);
        }
        if matches!(l, Term::RecBottom) || matches!(r, Term::RecBottom) {
            return self.ensure_tope_context(&cx.term, &Term::TopeBottom);
        }

        // Applications may compute through an extension type's boundary.
        if matches!(l, Term::App(_, _)) || matches!(r, Term::App(_, _)) {
            let l_reduced = self.reduce_extension_app(l)?;
            let r_reduced = self.reduce_extension_app(r)?;
            if l_reduced.is_some() || r_reduced.is_some() {
                let l2 = l_reduced.unwrap_or_else(|| l.clone());
                let r2 = r_reduced.unwrap_or_else(|| r.clone());
                return self.unify_terms(cx, &l2, &r2);
            }
        }

        match (l, r) {
            (
                Term::Lambda {
                    var: x,
                    arg_ty: a1,
                    guard: g1,
                    body: m,
                },
                Term::Lambda {
                    var: y,
                    arg_ty: a2,
                    guard: g2,
                    body: n,
                },
            ) => {
                if let (Some(a1), Some(a2)) = (a1, a2) {
                    self.unify_terms(cx, a1, a2)?;
                }
                let annotation = a1
                    .as_deref()
                    .or(a2.as_deref())
                    .cloned();
                let n = rename_var(y, x, n);
                let g2 = g2.as_ref().map(|g| rename_var(y, x, g));
                self.local_typing(x, annotation, |state| {
                    match (g1.as_deref(), g2) {
                        (Some(p), Some(q)) => {
                            state.ensure_eq_tope(p, &q)?;
                            state.local_constraint(p.clone(), |state| {
                                state.unify_terms(cx, m, &n)
                            })
                        }
                        (Some(p), None) => state
                            .local_constraint(p.clone(), |state| state.unify_terms(cx, m, &n)),
                        (None, Some(q)) => {
                            state.local_constraint(q, |state| state.unify_terms(cx, m, &n))
                        }
                        (None, None) => state.unify_terms(cx, m, &n),
                    }
                })
            }
            (Term::Pi(a), Term::Pi(b)) | (Term::Sigma(a), Term::Sigma(b)) => {
                self.unify_terms(cx, a, b)
            }
            (Term::First(a), Term::First(b)) | (Term::Second(a), Term::Second(b)) => {
                self.unify_terms(cx, a, b)
            }
            (Term::App(f1, a1), Term::App(f2, a2)) => {
                self.unify_terms(cx, f1, f2)?;
                self.unify_terms(cx, a1, a2)
            }
            (Term::Pair(a1, b1), Term::Pair(a2, b2)) => {
                self.unify_terms(cx, a1, a2)?;
                self.unify_terms(cx, b1, b2)
            }
            (Term::CubeProd(i1, j1), Term::CubeProd(i2, j2)) => {
                self.unify_terms(cx, i1, i2)?;
                self.unify_terms(cx, j1, j2)
            }
            (Term::TopeOr(_, _), Term::TopeOr(_, _))
            | (Term::TopeAnd(_, _), Term::TopeAnd(_, _)) => self.ensure_eq_tope(l, r),
            (Term::TopeEq(a1, b1), Term::TopeEq(a2, b2))
            | (Term::TopeLeq(a1, b1), Term::TopeLeq(a2, b2)) => {
                self.unify_terms(cx, a1, a2)?;
                self.unify_terms(cx, b1, b2)
            }
            (Term::IdType(a1, x1, y1), Term::IdType(a2, x2, y2)) => {
                self.unify_terms(cx, a1, a2)?;
                self.unify_terms(cx, x1, x2)?;
                self.unify_terms(cx, y1, y2)
            }
            (Term::Refl(t1, x1), Term::Refl(t2, x2)) => {
                if let (Some(t1), Some(t2)) = (t1, t2) {
                    self.unify_terms(cx, t1, t2)?;
                }
                self.unify_terms(cx, x1, x2)
            }
            (Term::IdJ(a1, b1, c1, d1, x1, p1), Term::IdJ(a2, b2, c2, d2, x2, p2)) => {
                self.unify_terms(cx, a1, a2)?;
                self.unify_terms(cx, b1, b2)?;
                self.unify_terms(cx, c1, c2)?;
                self.unify_terms(cx, d1, d2)?;
                self.unify_terms(cx, x1, x2)?;
                self.unify_terms(cx, p1, p2)
            }
            (Term::RecOr(s1, f1, a1, b1), Term::RecOr(s2, f2, a2, b2)) => {
                self.unify_terms(cx, s1, s2)?;
                self.unify_terms(cx, f1, f2)?;
                self.unify_terms(cx, a1, a2)?;
                self.unify_terms(cx, b1, b2)
            }
            (
                Term::ExtensionType {
                    var: s1,
                    cube: i1,
                    shape: psi1,
                    ty: ty1,
                    tope: phi1,
                    term: t1,
                },
                Term::ExtensionType {
                    var: s2,
                    cube: i2,
                    shape: psi2,
                    ty: ty2,
                    tope: phi2,
                    term: t2,
                },
            ) => {
                self.unify_terms(cx, i1, i2)?;
                let psi2 = rename_var(s2, s1, psi2);
                let ty2 = rename_var(s2, s1, ty2);
                let phi2 = rename_var(s2, s1, phi2);
                let t2 = rename_var(s2, s1, t2);
                self.local_typing(s1, Some(i1.as_ref().clone()), |state| {
                    state.unify_terms(cx, psi1, &psi2)?;
                    state.local_constraint(psi1.as_ref().clone(), |state| {
                        state.unify_terms(cx, ty1, &ty2)?;
                        state.unify_terms(cx, phi1, &phi2)?;
                        state.local_constraint(phi1.as_ref().clone(), |state| {
                            state.unify_terms(cx, t1, &t2)
                        })
                    })
                })
            }
            _ => self.unify_eta(cx, l, r),
        }
    }

    /// Mismatched head constructors: try η for functions, η for pairs,
    /// then η through an extension type, before giving up.
    fn unify_eta(&mut self, cx: &UnifyCtx, l: &Term, r: &Term) -> Result<()> {
        if let Term::Lambda {
            var,
            arg_ty,
            guard,
            body,
        } = l
        {
            return self.unify_eta_lambda(cx, var, arg_ty.as_deref(), guard.as_deref(), body, r, true);
        }
        if let Term::Lambda {
            var,
            arg_ty,
            guard,
            body,
        } = r
        {
            return self.unify_eta_lambda(cx, var, arg_ty.as_deref(), guard.as_deref(), body, l, false);
        }
        if let Term::Pair(a, b) = l {
            self.unify_terms(cx, a, &Term::First(Box::new(r.clone())))?;
            return self.unify_terms(cx, b, &Term::Second(Box::new(r.clone())));
        }
        if let Term::Pair(a, b) = r {
            self.unify_terms(cx, &Term::First(Box::new(l.clone())), a)?;
            return self.unify_terms(cx, &Term::Second(Box::new(l.clone())), b);
        }
        if self.unify_eta_extension(cx, l, r)?.is_some() {
            return Ok(());
        }
        Err(cx.mismatch(l, r))
    }

    /// One side is a lambda, the other is not: apply the other side to a
    /// fresh variable and compare with the lambda's body.
    #[allow(clippy::too_many_arguments)]
    fn unify_eta_lambda(
        &mut self,
        cx: &UnifyCtx,
        var: &Var,
        arg_ty: Option<&Term>,
        guard: Option<&Term>,
        body: &Term,
        other: &Term,
        lambda_on_left: bool,
    ) -> Result<()> {
        let mut avoid: HashSet<Var> = body.free_vars();
        avoid.extend(other.free_vars());
        if let Some(g) = guard {
            avoid.extend(g.free_vars());
        }
        let fresh = self.fresh_var(var, &avoid);
        let body = rename_var(var, &fresh, body);
        let guard = guard.map(|g| rename_var(var, &fresh, g));
        let applied = Term::App(
            Box::new(other.clone()),
            Box::new(Term::Var(fresh.clone())),
        );
        self.local_typing(&fresh, arg_ty.cloned(), |state| {
            let unify_bodies = |state: &mut Self| {
                if lambda_on_left {
                    state.unify_terms(cx, &body, &applied)
                } else {
                    state.unify_terms(cx, &applied, &body)
                }
            };
            match guard {
                Some(g) => state.local_constraint(g, unify_bodies),
                None => unify_bodies(state),
            }
        })
    }

    /// Neither side is a lambda or pair, but one side's type is an
    /// extension type: apply both sides to a fresh point of the index cube.
    fn unify_eta_extension(&mut self, cx: &UnifyCtx, l: &Term, r: &Term) -> Result<Option<()>> {
        for side in [l, r] {
            let ty = match self.infer(side) {
                Ok(ty) => ty,
                Err(_) => continue,
            };
            if let Term::ExtensionType { var, cube, .. } = ty {
                let mut avoid: HashSet<Var> = l.free_vars();
                avoid.extend(r.free_vars());
                let fresh = self.fresh_var(&var, &avoid);
                let l_applied = Term::App(
                    Box::new(l.clone()),
                    Box::new(Term::Var(fresh.clone())),
                );
                let r_applied = Term::App(
                    Box::new(r.clone()),
                    Box::new(Term::Var(fresh.clone())),
                );
                self.local_typing(&fresh, Some(*cube), |state| {
                    state.unify_terms(cx, &l_applied, &r_applied)
                })?;
                return Ok(Some(()));
            }
        }
        Ok(None)
    }

    /// Walk a candidate solution for `hole`, chasing solved holes, and
    /// fail if `hole` itself shows up. Returns the walked term; callers
    /// discard it, which keeps the historical `Sigma`-to-`Pi` rebuild
    /// below unobservable.
    pub(crate) fn check_infinite_type(
        &mut self,
        hole: &Var,
        full: &Term,
        term: &Term,
    ) -> Result<Term> {
        match term {
            Term::Hole(x) if x == hole => Err(TypeError::Infinite {
                hole: hole.clone(),
                term: full.clone(),
            }),
            Term::Hole(x) => match self.lookup_hole(x).cloned() {
                Some(solution) => self.check_infinite_type(hole, full, &solution),
                None => Ok(term.clone()),
            },
            Term::Var(_)
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
            | Term::RecBottom => Ok(term.clone()),
            Term::Typed(t, ty) => Ok(Term::Typed(
                Box::new(self.check_infinite_type(hole, full, t)?),
                Box::new(self.check_infinite_type(hole, full, ty)?),
            )),
            Term::Pi(t) => Ok(Term::Pi(Box::new(self.check_infinite_type(hole, full, t)?))),
            // Historical behavior, kept as-is: the rebuilt term wraps the
            // child in `Pi` rather than `Sigma`.
            Term::Sigma(t) => Ok(Term::Pi(Box::new(self.check_infinite_type(hole, full, t)?))),
            Term::Lambda {
                var,
                arg_ty,
                guard,
                body,
            } => Ok(Term::Lambda {
                var: var.clone(),
                arg_ty: match arg_ty {
                    Some(a) => Some(Box::new(self.check_infinite_type(hole, full, a)?)),
                    None => None,
                },
                guard: match guard {
                    Some(g) => Some(Box::new(self.check_infinite_type(hole, full, g)?)),
                    None => None,
                },
                body: Box::new(self.check_infinite_type(hole, full, body)?),
            }),
            Term::App(f, a) => Ok(Term::App(
                Box::new(self.check_infinite_type(hole, full, f)?),
                Box::new(self.check_infinite_type(hole, full, a)?),
            )),
            Term::Pair(a, b) => Ok(Term::Pair(
                Box::new(self.check_infinite_type(hole, full, a)?),
                Box::new(self.check_infinite_type(hole, full, b)?),
            )),
            Term::First(t) => Ok(Term::First(Box::new(
                self.check_infinite_type(hole, full, t)?,
            ))),
            Term::Second(t) => Ok(Term::Second(Box::new(
                self.check_infinite_type(hole, full, t)?,
            ))),
            Term::IdType(a, x, y) => Ok(Term::IdType(
                Box::new(self.check_infinite_type(hole, full, a)?),
                Box::new(self.check_infinite_type(hole, full, x)?),
                Box::new(self.check_infinite_type(hole, full, y)?),
            )),
            Term::Refl(ty, x) => Ok(Term::Refl(
                match ty {
                    Some(t) => Some(Box::new(self.check_infinite_type(hole, full, t)?)),
                    None => None,
                },
                Box::new(self.check_infinite_type(hole, full, x)?),
            )),
            Term::IdJ(a, b, c, d, x, p) => Ok(Term::IdJ(
                Box::new(self.check_infinite_type(hole, full, a)?),
                Box::new(self.check_infinite_type(hole, full, b)?),
                Box::new(self.check_infinite_type(hole, full, c)?),
                Box::new(self.check_infinite_type(hole, full, d)?),
                Box::new(self.check_infinite_type(hole, full, x)?),
                Box::new(self.check_infinite_type(hole, full, p)?),
            )),
            Term::CubeProd(i, j) => Ok(Term::CubeProd(
                Box::new(self.check_infinite_type(hole, full, i)?),
                Box::new(self.check_infinite_type(hole, full, j)?),
            )),
            Term::TopeOr(a, b) => Ok(Term::TopeOr(
                Box::new(self.check_infinite_type(hole, full, a)?),
                Box::new(self.check_infinite_type(hole, full, b)?),
            )),
            Term::TopeAnd(a, b) => Ok(Term::TopeAnd(
                Box::new(self.check_infinite_type(hole, full, a)?),
                Box::new(self.check_infinite_type(hole, full, b)?),
            )),
            Term::TopeEq(a, b) => Ok(Term::TopeEq(
                Box::new(self.check_infinite_type(hole, full, a)?),
                Box::new(self.check_infinite_type(hole, full, b)?),
            )),
            Term::TopeLeq(a, b) => Ok(Term::TopeLeq(
                Box::new(self.check_infinite_type(hole, full, a)?),
                Box::new(self.check_infinite_type(hole, full, b)?),
            )),
            Term::RecOr(psi, phi, a, b) => Ok(Term::RecOr(
                Box::new(self.check_infinite_type(hole, full, psi)?),
                Box::new(self.check_infinite_type(hole, full, phi)?),
                Box::new(self.check_infinite_type(hole, full, a)?),
                Box::new(self.check_infinite_type(hole, full, b)?),
            )),
            Term::ExtensionType {
                var,
                cube,
                shape,
                ty,
                tope,
                term: bound,
            } => Ok(Term::ExtensionType {
                var: var.clone(),
                cube: Box::new(self.check_infinite_type(hole, full, cube)?),
                shape: Box::new(self.check_infinite_type(hole, full, shape)?),
                ty: Box::new(self.check_infinite_type(hole, full, ty)?),
                tope: Box::new(self.check_infinite_type(hole, full, tope)?),
                term: Box::new(self.check_infinite_type(hole, full, bound)?),
            }),
        }
    }
}
