//! The bidirectional checker: mutually recursive `infer` and `check`
//! driving evaluation, unification and tope discharge, plus the
//! declaration driver that threads the accumulated context through a
//! module.

use rzk_syntax::{Decl, Module, Term, Var};
use std::collections::HashSet;
use std::path::Path;

use crate::ctx::TypeCheck;
use crate::error::{LocatedTypeError, Result, TypeError};

/// A declaration that went through the checker, with its evaluated type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedDecl {
    pub name: Var,
    pub ty: Term,
    pub body: Term,
}

impl TypeCheck {
    // ── Inference ────────────────────────────────────────────────

    /// Synthesize a type for `term`. The returned type is evaluated.
    pub fn infer(&mut self, term: &Term) -> Result<Term> {
        match term {
            Term::Var(x) | Term::Hole(x) => match self.lookup_type(x).cloned() {
                Some(ty) => self.eval_type(&ty),
                None => {
                    let hole = self.fresh_hole();
                    self.set_type(x.clone(), Term::Hole(hole.clone()));
                    Ok(Term::Hole(hole))
                }
            },
            Term::Universe => Ok(Term::Universe),
            Term::Typed(t, ty) => {
                self.check(t, ty)?;
                self.eval_type(ty)
            }
            Term::Pi(family) | Term::Sigma(family) => {
                self.infer_type_family(family)?;
                Ok(Term::Universe)
            }
            Term::Lambda { .. } => Err(TypeError::CannotInferLambda(term.clone())),
            Term::App(f, a) => self.infer_app(term, f, a),
            Term::Pair(f, s) => {
                let i = self.infer(f)?;
                let j = self.infer(s)?;
                let ti = self.infer(&i)?;
                let tj = self.infer(&j)?;
                if ti == Term::Cube && tj == Term::Cube {
                    Ok(Term::CubeProd(Box::new(i), Box::new(j)))
                } else {
                    Err(TypeError::CannotInferPair(term.clone()))
                }
            }
            Term::First(t) => {
                let t_ty = self.infer(t)?;
                match t_ty {
                    Term::Sigma(family) => match *family {
                        Term::Lambda {
                            arg_ty: Some(a), ..
                        } => self.eval_type(&a),
                        other => Err(TypeError::InvalidTypeFamily(other)),
                    },
                    Term::CubeProd(i, _) => Ok(*i),
                    other => Err(TypeError::NotAPair {
                        term: t.as_ref().clone(),
                        term_type: other,
                        projection: "first",
                    }),
                }
            }
            Term::Second(t) => {
                let t_ty = self.infer(t)?;
                match t_ty {
                    Term::Sigma(family) => match *family {
                        Term::Lambda {
                            var,
                            arg_ty: Some(_),
                            body,
                            ..
                        } => {
                            let first = Term::First(t.clone());
                            let b = self.subst(&var, &first, &body)?;
                            self.eval_type(&b)
                        }
                        other => Err(TypeError::InvalidTypeFamily(other)),
                    },
                    Term::CubeProd(_, j) => Ok(*j),
                    other => Err(TypeError::NotAPair {
                        term: t.as_ref().clone(),
                        term_type: other,
                        projection: "second",
                    }),
                }
            }
            Term::IdType(a, x, y) => {
                self.check(a, &Term::Universe)?;
                self.check(x, a)?;
                self.check(y, a)?;
                Ok(Term::Universe)
            }
            Term::Refl(ty, x) => {
                let ty = match ty {
                    Some(ty) => {
                        self.check(ty, &Term::Universe)?;
                        self.check(x, ty)?;
                        self.eval_type(ty)?
                    }
                    None => self.infer(x)?,
                };
                let x = self.eval(x)?;
                Ok(Term::IdType(
                    Box::new(ty),
                    Box::new(x.clone()),
                    Box::new(x),
                ))
            }
            Term::IdJ(a, b, c, d, x, p) => self.infer_idj(a, b, c, d, x, p),
            Term::Cube => Ok(Term::Universe),
            Term::CubeUnit => Ok(Term::Cube),
            Term::CubeUnitStar => Ok(Term::CubeUnit),
            Term::CubeProd(i, j) => {
                self.check(i, &Term::Cube)?;
                self.check(j, &Term::Cube)?;
                Ok(Term::Cube)
            }
            Term::Cube2 => Ok(Term::Cube),
            Term::Cube2_0 | Term::Cube2_1 => Ok(Term::Cube2),
            Term::Tope => Ok(Term::Universe),
            Term::TopeTop | Term::TopeBottom => Ok(Term::Tope),
            Term::TopeOr(a, b) | Term::TopeAnd(a, b) => {
                self.check(a, &Term::Tope)?;
                self.check(b, &Term::Tope)?;
                Ok(Term::Tope)
            }
            Term::TopeEq(x, y) => {
                let cube = self.infer(x)?;
                self.check(y, &cube)?;
                Ok(Term::Tope)
            }
            Term::TopeLeq(x, y) => {
                self.check(x, &Term::Cube2)?;
                self.check(y, &Term::Cube2)?;
                Ok(Term::Tope)
            }
            Term::RecBottom => {
                self.ensure_tope_context(term, &Term::TopeBottom)?;
                let hole = self.fresh_hole();
                Ok(Term::Hole(hole))
            }
            Term::RecOr(psi, phi, a, b) => {
                self.check(psi, &Term::Tope)?;
                self.check(phi, &Term::Tope)?;
                let psi = self.eval(psi)?;
                let phi = self.eval(phi)?;
                self.ensure_tope_context(
                    term,
                    &Term::TopeOr(Box::new(psi.clone()), Box::new(phi.clone())),
                )?;
                let a_ty = self.local_constraint(psi.clone(), |state| state.infer(a))?;
                let b_ty = self.local_constraint(phi.clone(), |state| state.infer(b))?;
                self.local_constraint(
                    Term::TopeAnd(Box::new(psi.clone()), Box::new(phi.clone())),
                    |state| state.unify(term, &a_ty, &b_ty),
                )?;
                Ok(Term::RecOr(
                    Box::new(psi),
                    Box::new(phi),
                    Box::new(a_ty),
                    Box::new(b_ty),
                ))
            }
            Term::ExtensionType {
                var,
                cube,
                shape,
                ty,
                tope,
                term: bound,
            } => {
                self.check(cube, &Term::Cube)?;
                let cube = self.eval(cube)?;
                self.local_typing(var, Some(cube), |state| {
                    state.check(shape, &Term::Tope)?;
                    state.local_constraint(shape.as_ref().clone(), |state| {
                        state.check(ty, &Term::Universe)?;
                        state.check(tope, &Term::Tope)?;
                        state.ensure_sub_tope(term, shape, tope)?;
                        state.local_constraint(tope.as_ref().clone(), |state| {
                            state.check(bound, ty)
                        })
                    })
                })?;
                Ok(Term::Universe)
            }
        }
    }

    fn infer_app(&mut self, term: &Term, f: &Term, a: &Term) -> Result<Term> {
        let f_ty = self.infer(f)?;
        match f_ty {
            Term::Pi(family) => match *family {
                Term::Lambda {
                    var,
                    arg_ty: Some(arg_ty),
                    guard: None,
                    body,
                } => {
                    self.check(a, &arg_ty)?;
                    let b = self.subst(&var, a, &body)?;
                    self.eval_type(&b)
                }
                Term::Lambda {
                    var,
                    arg_ty: Some(arg_ty),
                    guard: Some(guard),
                    body,
                } => {
                    self.check(a, &arg_ty)?;
                    let guard_at_a = self.subst(&var, a, &guard)?;
                    self.ensure_tope_context(term, &guard_at_a)?;
                    let b = self.subst(&var, a, &body)?;
                    self.eval_type(&b)
                }
                other => Err(TypeError::NotAFunction {
                    fun: f.clone(),
                    fun_type: Term::Pi(Box::new(other)),
                    arg: a.clone(),
                }),
            },
            Term::ExtensionType {
                var,
                cube,
                shape,
                ty,
                ..
            } => {
                self.check(a, &cube)?;
                let shape_at_a = self.subst(&var, a, &shape)?;
                self.ensure_tope_context(term, &shape_at_a)?;
                let ty_at_a = self.subst(&var, a, &ty)?;
                self.eval_type(&ty_at_a)
            }
            other => Err(TypeError::NotAFunction {
                fun: f.clone(),
                fun_type: other,
                arg: a.clone(),
            }),
        }
    }

    #[allow(clippy::many_single_char_names)]
    fn infer_idj(
        &mut self,
        a: &Term,
        b: &Term,
        c: &Term,
        d: &Term,
        x: &Term,
        p: &Term,
    ) -> Result<Term> {
        self.check(a, &Term::Universe)?;
        self.check(b, a)?;

        // Motive: (x' : A) -> (a =_{A} x') -> U
        let mut avoid: HashSet<Var> = a.free_vars();
        avoid.extend(b.free_vars());
        let xv = self.fresh_var(&Var::new("x"), &avoid);
        avoid.insert(xv.clone());
        let pv = self.fresh_var(&Var::new("p"), &avoid);
        let motive = Term::Pi(Box::new(Term::Lambda {
            var: xv.clone(),
            arg_ty: Some(Box::new(a.clone())),
            guard: None,
            body: Box::new(Term::Pi(Box::new(Term::Lambda {
                var: pv,
                arg_ty: Some(Box::new(Term::IdType(
                    Box::new(a.clone()),
                    Box::new(b.clone()),
                    Box::new(Term::Var(xv)),
                ))),
                guard: None,
                body: Box::new(Term::Universe),
            }))),
        }));
        self.check(c, &motive)?;

        let refl = Term::Refl(Some(Box::new(a.clone())), Box::new(b.clone()));
        let d_ty = Term::App(
            Box::new(Term::App(Box::new(c.clone()), Box::new(b.clone()))),
            Box::new(refl),
        );
        self.check(d, &d_ty)?;
        self.check(x, a)?;
        self.check(
            p,
            &Term::IdType(Box::new(a.clone()), Box::new(b.clone()), Box::new(x.clone())),
        )?;

        let out = Term::App(
            Box::new(Term::App(Box::new(c.clone()), Box::new(x.clone()))),
            Box::new(p.clone()),
        );
        self.eval_type(&out)
    }

    /// Accept the two binder shapes a `Pi`/`Sigma` family may take.
    fn infer_type_family(&mut self, family: &Term) -> Result<()> {
        match family {
            Term::Lambda {
                var,
                arg_ty: Some(arg_ty),
                guard: None,
                body,
            } => {
                self.check(arg_ty, &Term::Universe)?;
                let arg_ty = self.eval(arg_ty)?;
                self.local_typing(var, Some(arg_ty), |state| {
                    state.check(body, &Term::Universe)
                })
            }
            Term::Lambda {
                var,
                arg_ty: Some(cube),
                guard: Some(guard),
                body,
            } => {
                self.check(cube, &Term::Cube)?;
                let cube = self.eval(cube)?;
                self.local_typing(var, Some(cube), |state| {
                    state.check(guard, &Term::Tope)?;
                    state.local_constraint(guard.as_ref().clone(), |state| {
                        state.check(body, &Term::Universe)
                    })
                })
            }
            other => Err(TypeError::InvalidTypeFamily(other.clone())),
        }
    }

    // ── Checking ─────────────────────────────────────────────────

    /// Check `term` against `expected`, refining holes where possible.
    pub fn check(&mut self, term: &Term, expected: &Term) -> Result<()> {
        let expected = self.eval(expected)?;
        match (term, &expected) {
            (
                Term::Lambda {
                    var,
                    arg_ty,
                    guard,
                    body,
                },
                Term::ExtensionType { .. },
            ) => self.check_lambda_extension(
                term,
                var,
                arg_ty.as_deref(),
                guard.as_deref(),
                body,
                &expected,
            ),
            (
                Term::Lambda {
                    var,
                    arg_ty,
                    guard,
                    body,
                },
                Term::Pi(family),
            ) => self.check_lambda_pi(
                term,
                var,
                arg_ty.as_deref(),
                guard.as_deref(),
                body,
                family,
            ),
            (Term::Lambda { .. }, _) => Err(TypeError::ExpectedFunctionType {
                term: term.clone(),
                expected: expected.clone(),
            }),
            (Term::Pair(f, s), Term::Sigma(family)) => match family.as_ref() {
                Term::Lambda {
                    var,
                    arg_ty: Some(arg_ty),
                    body,
                    ..
                } => {
                    self.check(f, arg_ty)?;
                    let s_ty = self.subst(var, f, body)?;
                    self.check(s, &s_ty)
                }
                other => Err(TypeError::InvalidTypeFamily(other.clone())),
            },
            (Term::Var(x), _) | (Term::Hole(x), _) => match self.lookup_type(x).cloned() {
                Some(known) => self.unify(term, &known, &expected),
                None => {
                    self.set_type(x.clone(), expected.clone());
                    Ok(())
                }
            },
            _ => {
                let inferred = self.infer(term)?;
                self.unify(term, &inferred, &expected)
            }
        }
    }

    fn check_lambda_extension(
        &mut self,
        term: &Term,
        var: &Var,
        arg_ty: Option<&Term>,
        lambda_guard: Option<&Term>,
        body: &Term,
        expected: &Term,
    ) -> Result<()> {
        let Term::ExtensionType {
            var: t,
            cube,
            shape,
            ty,
            tope,
            term: bound,
        } = expected
        else {
            unreachable!("caller matched an extension type");
        };
        if let Some(a) = arg_ty {
            self.check(a, &Term::Cube)?;
            self.unify(term, a, cube)?;
        }
        self.local_typing(var, Some(cube.as_ref().clone()), |state| {
            let point = Term::Var(var.clone());
            let shape_at = state.subst(t, &point, shape)?;
            if let Some(g) = lambda_guard {
                state.ensure_eq_tope(g, &shape_at)?;
            }
            state.local_constraint(shape_at, |state| {
                let ty_at = state.subst(t, &point, ty)?;
                state.check(body, &ty_at)?;
                let tope_at = state.subst(t, &point, tope)?;
                state.local_constraint(tope_at, |state| {
                    let body_value = state.eval(body)?;
                    let bound_at = state.subst(t, &point, bound)?;
                    state.unify(term, &body_value, &bound_at)
                })
            })
        })
    }

    fn check_lambda_pi(
        &mut self,
        term: &Term,
        var: &Var,
        arg_ty: Option<&Term>,
        lambda_guard: Option<&Term>,
        body: &Term,
        family: &Term,
    ) -> Result<()> {
        match family {
            Term::Lambda {
                var: y,
                arg_ty: Some(dom),
                guard: None,
                body: cod,
            } => {
                if let Some(a) = arg_ty {
                    self.unify(term, a, dom)?;
                }
                if lambda_guard.is_some() {
                    return Err(TypeError::ExpectedFunctionType {
                        term: term.clone(),
                        expected: Term::Pi(Box::new(family.clone())),
                    });
                }
                self.local_typing(var, Some(dom.as_ref().clone()), |state| {
                    let cod_at = state.subst(y, &Term::Var(var.clone()), cod)?;
                    state.check(body, &cod_at)
                })
            }
            Term::Lambda {
                var: y,
                arg_ty: Some(dom),
                guard: Some(pi_guard),
                body: cod,
            } => {
                if let Some(a) = arg_ty {
                    self.unify(term, a, dom)?;
                }
                self.local_typing(var, Some(dom.as_ref().clone()), |state| {
                    let point = Term::Var(var.clone());
                    let pi_guard_at = state.subst(y, &point, pi_guard)?;
                    let constraint = match lambda_guard {
                        Some(g) => {
                            state.ensure_eq_tope(g, &pi_guard_at)?;
                            g.clone()
                        }
                        None => pi_guard_at,
                    };
                    state.local_constraint(constraint, |state| {
                        let cod_at = state.subst(y, &point, cod)?;
                        state.check(body, &cod_at)
                    })
                })
            }
            other => Err(TypeError::InvalidTypeFamily(other.clone())),
        }
    }

    // ── Declarations ─────────────────────────────────────────────

    /// Check one declaration and record it in the context.
    pub fn check_decl(&mut self, decl: &Decl) -> Result<TypedDecl> {
        let ty = self.eval_type(&decl.ty)?;
        self.check(&decl.body, &ty)?;
        self.declare(decl.name.clone(), ty.clone(), decl.body.clone());
        Ok(TypedDecl {
            name: decl.name.clone(),
            ty,
            body: decl.body.clone(),
        })
    }

    /// Check a module's declarations in source order, stopping at the
    /// first failure with the declaration's location attached.
    pub fn check_module(
        &mut self,
        path: &Path,
        module: &Module,
    ) -> Result<Vec<TypedDecl>, Box<LocatedTypeError>> {
        let mut out = Vec::with_capacity(module.decls.len());
        for decl in &module.decls {
            match self.check_decl(decl) {
                Ok(typed) => out.push(typed),
                Err(error) => {
                    return Err(Box::new(LocatedTypeError {
                        path: path.to_path_buf(),
                        line: decl.line(),
                        decl: decl.name.clone(),
                        error,
                        context: self.snapshot(),
                    }));
                }
            }
        }
        Ok(out)
    }
}
