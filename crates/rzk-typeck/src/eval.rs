//! Weak normalization under the current value environment and hole store.
//!
//! `eval` unfolds environment bindings, reduces β-redexes, projects from
//! explicit pairs and reduces `idJ` applied to `refl`. `eval_type` adds a
//! middle pass that fires the extension-type application rule, which needs
//! the inferred type of the function side — the deliberate circularity
//! between the evaluator and the checker.
//!
//! Binder bodies are evaluated too, under a refreshed binder where the
//! environment would capture. Substitution is environment-driven
//! (`subst` pushes a binding and evaluates), so it has to reach under
//! binders, and the unifier compares binder bodies structurally without
//! re-evaluating them — both need bodies already in normal form. See
//! DESIGN.md for the full note; `evaluation_normalizes_under_binders`
//! pins the behavior.

use rzk_syntax::{rename_var, Term, Var};
use std::collections::HashSet;

use crate::ctx::TypeCheck;
use crate::error::{EvalError, Result, TypeError};

impl TypeCheck {
    pub fn eval(&mut self, term: &Term) -> Result<Term> {
        match term {
            Term::Var(x) => match self.lookup_env(x).cloned() {
                Some(value) => {
                    if value == *term {
                        Ok(value)
                    } else {
                        self.eval(&value)
                    }
                }
                None => {
                    if self.lookup_type(x).is_some() || self.is_declared_hole(x) {
                        Ok(term.clone())
                    } else {
                        Err(TypeError::Eval {
                            term: term.clone(),
                            source: EvalError::UndefinedVariable(x.clone()),
                        })
                    }
                }
            },
            Term::Hole(h) => match self.lookup_hole(h).cloned() {
                Some(solution) => self.eval(&solution),
                None => Ok(term.clone()),
            },
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
            | Term::RecBottom => Ok(term.clone()),
            Term::Typed(t, ty) => Ok(Term::Typed(
                Box::new(self.eval(t)?),
                Box::new(self.eval(ty)?),
            )),
            Term::Pi(f) => Ok(Term::Pi(Box::new(self.eval(f)?))),
            Term::Sigma(f) => Ok(Term::Sigma(Box::new(self.eval(f)?))),
            Term::Lambda {
                var,
                arg_ty,
                guard,
                body,
            } => {
                let arg_ty = match arg_ty {
                    Some(a) => Some(Box::new(self.eval(a)?)),
                    None => None,
                };
                let mut under: Vec<&Term> = vec![body];
                if let Some(g) = guard {
                    under.push(g);
                }
                let (var, guard, body) = match self.renamed_env_binder(var, &under) {
                    Some(fresh) => (
                        fresh.clone(),
                        guard.as_deref().map(|g| rename_var(var, &fresh, g)),
                        rename_var(var, &fresh, body),
                    ),
                    None => (
                        var.clone(),
                        guard.as_deref().cloned(),
                        body.as_ref().clone(),
                    ),
                };
                let (guard, body) = self.local_var(&var, Term::Var(var.clone()), |state| {
                    let guard = match &guard {
                        Some(g) => Some(Box::new(state.eval(g)?)),
                        None => None,
                    };
                    Ok((guard, state.eval(&body)?))
                })?;
                Ok(Term::Lambda {
                    var,
                    arg_ty,
                    guard,
                    body: Box::new(body),
                })
            }
            Term::App(f, a) => {
                let f = self.eval(f)?;
                let a = self.eval(a)?;
                if let Term::Lambda { var, body, .. } = f {
                    self.local_var(&var, a, |state| state.eval(&body))
                } else {
                    Ok(Term::App(Box::new(f), Box::new(a)))
                }
            }
            Term::Pair(a, b) => Ok(Term::Pair(
                Box::new(self.eval(a)?),
                Box::new(self.eval(b)?),
            )),
            Term::First(t) => {
                let t = self.eval(t)?;
                match t {
                    Term::Pair(a, _) => Ok(*a),
                    _ if is_stuck(&t) => Ok(Term::First(Box::new(t))),
                    _ => Err(TypeError::Eval {
                        term: term.clone(),
                        source: EvalError::ProjectionOfNonPair {
                            projection: "first",
                        },
                    }),
                }
            }
            Term::Second(t) => {
                let t = self.eval(t)?;
                match t {
                    Term::Pair(_, b) => Ok(*b),
                    _ if is_stuck(&t) => Ok(Term::Second(Box::new(t))),
                    _ => Err(TypeError::Eval {
                        term: term.clone(),
                        source: EvalError::ProjectionOfNonPair {
                            projection: "second",
                        },
                    }),
                }
            }
            Term::IdType(a, x, y) => Ok(Term::IdType(
                Box::new(self.eval(a)?),
                Box::new(self.eval(x)?),
                Box::new(self.eval(y)?),
            )),
            Term::Refl(ty, x) => {
                let ty = match ty {
                    Some(t) => Some(Box::new(self.eval(t)?)),
                    None => None,
                };
                Ok(Term::Refl(ty, Box::new(self.eval(x)?)))
            }
            Term::IdJ(a, b, c, d, x, p) => {
                let a = self.eval(a)?;
                let b = self.eval(b)?;
                let c = self.eval(c)?;
                let d = self.eval(d)?;
                let x = self.eval(x)?;
                let p = self.eval(p)?;
                if let Term::Refl(_, _) = p {
                    Ok(d)
                } else {
                    Ok(Term::IdJ(
                        Box::new(a),
                        Box::new(b),
                        Box::new(c),
                        Box::new(d),
                        Box::new(x),
                        Box::new(p),
                    ))
                }
            }
            Term::CubeProd(i, j) => Ok(Term::CubeProd(
                Box::new(self.eval(i)?),
                Box::new(self.eval(j)?),
            )),
            Term::TopeOr(a, b) => Ok(Term::TopeOr(
                Box::new(self.eval(a)?),
                Box::new(self.eval(b)?),
            )),
            Term::TopeAnd(a, b) => Ok(Term::TopeAnd(
                Box::new(self.eval(a)?),
                Box::new(self.eval(b)?),
            )),
            Term::TopeEq(a, b) => Ok(Term::TopeEq(
                Box::new(self.eval(a)?),
                Box::new(self.eval(b)?),
            )),
            Term::TopeLeq(a, b) => Ok(Term::TopeLeq(
                Box::new(self.eval(a)?),
                Box::new(self.eval(b)?),
            )),
            Term::RecOr(psi, phi, a, b) => Ok(Term::RecOr(
                Box::new(self.eval(psi)?),
                Box::new(self.eval(phi)?),
                Box::new(self.eval(a)?),
                Box::new(self.eval(b)?),
            )),
            Term::ExtensionType {
                var,
                cube,
                shape,
                ty,
                tope,
                term: bound,
            } => {
                let cube = Box::new(self.eval(cube)?);
                let under = [shape.as_ref(), ty.as_ref(), tope.as_ref(), bound.as_ref()];
                let (var, shape, ty, tope, bound) = match self.renamed_env_binder(var, &under) {
                    Some(fresh) => (
                        fresh.clone(),
                        rename_var(var, &fresh, shape),
                        rename_var(var, &fresh, ty),
                        rename_var(var, &fresh, tope),
                        rename_var(var, &fresh, bound),
                    ),
                    None => (
                        var.clone(),
                        shape.as_ref().clone(),
                        ty.as_ref().clone(),
                        tope.as_ref().clone(),
                        bound.as_ref().clone(),
                    ),
                };
                let (shape, ty, tope, bound) =
                    self.local_var(&var, Term::Var(var.clone()), |state| {
                        Ok((
                            state.eval(&shape)?,
                            state.eval(&ty)?,
                            state.eval(&tope)?,
                            state.eval(&bound)?,
                        ))
                    })?;
                Ok(Term::ExtensionType {
                    var,
                    cube,
                    shape: Box::new(shape),
                    ty: Box::new(ty),
                    tope: Box::new(tope),
                    term: Box::new(bound),
                })
            }
        }
    }

    /// Substitute `value` for `var` in `body` by evaluating the body under
    /// a scoped environment binding.
    pub(crate) fn subst(&mut self, var: &Var, value: &Term, body: &Term) -> Result<Term> {
        self.local_var(var, value.clone(), |state| state.eval(body))
    }

    /// Full type normalization: evaluate, rewrite extension-type
    /// applications to a fixed point, evaluate again.
    pub fn eval_type(&mut self, term: &Term) -> Result<Term> {
        let term = self.eval(term)?;
        let term = self.eval_extension_apps(&term)?;
        self.eval(&term)
    }

    /// Reduce `App f x` to the boundary value of `f`'s extension type when
    /// the current tope context entails the instantiated boundary tope.
    /// Returns `None` when the rule does not fire.
    pub(crate) fn reduce_extension_app(&mut self, term: &Term) -> Result<Option<Term>> {
        let Term::App(f, x) = term else {
            return Ok(None);
        };
        let f_ty = match self.infer(f) {
            Ok(ty) => ty,
            Err(_) => return Ok(None),
        };
        let Term::ExtensionType {
            var,
            tope,
            term: bound,
            ..
        } = f_ty
        else {
            return Ok(None);
        };
        let tope_at_x = self.subst(&var, x, &tope)?;
        if self.entails(&tope_at_x)? {
            Ok(Some(self.subst(&var, x, &bound)?))
        } else {
            Ok(None)
        }
    }

    fn eval_extension_apps(&mut self, term: &Term) -> Result<Term> {
        match term {
            Term::App(f, a) => {
                if let Some(reduced) = self.reduce_extension_app(term)? {
                    self.eval_extension_apps(&reduced)
                } else {
                    Ok(Term::App(
                        Box::new(self.eval_extension_apps(f)?),
                        Box::new(self.eval_extension_apps(a)?),
                    ))
                }
            }
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
            | Term::RecBottom => Ok(term.clone()),
            Term::Typed(t, ty) => Ok(Term::Typed(
                Box::new(self.eval_extension_apps(t)?),
                Box::new(self.eval_extension_apps(ty)?),
            )),
            Term::Pi(f) => Ok(Term::Pi(Box::new(self.eval_extension_apps(f)?))),
            Term::Sigma(f) => Ok(Term::Sigma(Box::new(self.eval_extension_apps(f)?))),
            Term::Lambda {
                var,
                arg_ty,
                guard,
                body,
            } => {
                let arg_ty_out = match arg_ty {
                    Some(a) => Some(Box::new(self.eval_extension_apps(a)?)),
                    None => None,
                };
                let annotation = arg_ty.as_deref().cloned();
                let (guard, body) =
                    self.local_typing(var, annotation, |state| match guard.as_deref() {
                        Some(g) => {
                            let g = state.eval_extension_apps(g)?;
                            let body = state.local_constraint(g.clone(), |state| {
                                state.eval_extension_apps(body)
                            })?;
                            Ok((Some(Box::new(g)), body))
                        }
                        None => Ok((None, state.eval_extension_apps(body)?)),
                    })?;
                Ok(Term::Lambda {
                    var: var.clone(),
                    arg_ty: arg_ty_out,
                    guard,
                    body: Box::new(body),
                })
            }
            Term::Pair(a, b) => Ok(Term::Pair(
                Box::new(self.eval_extension_apps(a)?),
                Box::new(self.eval_extension_apps(b)?),
            )),
            Term::First(t) => Ok(Term::First(Box::new(self.eval_extension_apps(t)?))),
            Term::Second(t) => Ok(Term::Second(Box::new(self.eval_extension_apps(t)?))),
            Term::IdType(a, x, y) => Ok(Term::IdType(
                Box::new(self.eval_extension_apps(a)?),
                Box::new(self.eval_extension_apps(x)?),
                Box::new(self.eval_extension_apps(y)?),
            )),
            Term::Refl(ty, x) => {
                let ty = match ty {
                    Some(t) => Some(Box::new(self.eval_extension_apps(t)?)),
                    None => None,
                };
                Ok(Term::Refl(ty, Box::new(self.eval_extension_apps(x)?)))
            }
            Term::IdJ(a, b, c, d, x, p) => Ok(Term::IdJ(
                Box::new(self.eval_extension_apps(a)?),
                Box::new(self.eval_extension_apps(b)?),
                Box::new(self.eval_extension_apps(c)?),
                Box::new(self.eval_extension_apps(d)?),
                Box::new(self.eval_extension_apps(x)?),
                Box::new(self.eval_extension_apps(p)?),
            )),
            Term::CubeProd(i, j) => Ok(Term::CubeProd(
                Box::new(self.eval_extension_apps(i)?),
                Box::new(self.eval_extension_apps(j)?),
            )),
            Term::TopeOr(a, b) => Ok(Term::TopeOr(
                Box::new(self.eval_extension_apps(a)?),
                Box::new(self.eval_extension_apps(b)?),
            )),
            Term::TopeAnd(a, b) => Ok(Term::TopeAnd(
                Box::new(self.eval_extension_apps(a)?),
                Box::new(self.eval_extension_apps(b)?),
            )),
            Term::TopeEq(a, b) => Ok(Term::TopeEq(
                Box::new(self.eval_extension_apps(a)?),
                Box::new(self.eval_extension_apps(b)?),
            )),
            Term::TopeLeq(a, b) => Ok(Term::TopeLeq(
                Box::new(self.eval_extension_apps(a)?),
                Box::new(self.eval_extension_apps(b)?),
            )),
            Term::RecOr(psi, phi, a, b) => Ok(Term::RecOr(
                Box::new(self.eval_extension_apps(psi)?),
                Box::new(self.eval_extension_apps(phi)?),
                Box::new(self.eval_extension_apps(a)?),
                Box::new(self.eval_extension_apps(b)?),
            )),
            Term::ExtensionType {
                var,
                cube,
                shape,
                ty,
                tope,
                term: bound,
            } => {
                let cube_out = Box::new(self.eval_extension_apps(cube)?);
                let annotation = Some(cube.as_ref().clone());
                let (shape, ty, tope, bound) = self.local_typing(var, annotation, |state| {
                    let shape = state.eval_extension_apps(shape)?;
                    state.local_constraint(shape.clone(), |state| {
                        Ok((
                            shape.clone(),
                            state.eval_extension_apps(ty)?,
                            state.eval_extension_apps(tope)?,
                            state.eval_extension_apps(bound)?,
                        ))
                    })
                })?;
                Ok(Term::ExtensionType {
                    var: var.clone(),
                    cube: cube_out,
                    shape: Box::new(shape),
                    ty: Box::new(ty),
                    tope: Box::new(tope),
                    term: Box::new(bound),
                })
            }
        }
    }

    /// Pick a fresh name for a binder that the current environment would
    /// capture: the environment binds the same name, or one of its values
    /// mentions it. Returns `None` when the binder is safe as-is.
    fn renamed_env_binder(&self, var: &Var, under: &[&Term]) -> Option<Var> {
        if !self.env_mentions(var) {
            return None;
        }
        let mut used: HashSet<Var> = self.in_scope_names();
        for t in under {
            used.extend(t.free_vars());
        }
        Some(self.fresh_var(var, &used))
    }
}

/// Neutral forms a projection may still reach once a hole is solved or a
/// variable is defined.
fn is_stuck(term: &Term) -> bool {
    match term {
        Term::Var(_)
        | Term::Hole(_)
        | Term::App(_, _)
        | Term::First(_)
        | Term::Second(_)
        | Term::IdJ(_, _, _, _, _, _)
        | Term::RecOr(_, _, _, _)
        | Term::RecBottom => true,
        Term::Typed(t, _) => is_stuck(t),
        _ => false,
    }
}
