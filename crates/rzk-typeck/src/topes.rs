//! Entailment for the tope fragment: saturate the assumed topes to a
//! fixed point under the interval axioms, then decide the goal by
//! membership, decomposition and case analysis on assumed disjunctions.
//!
//! Saturation terminates because every rule builds topes out of atoms that
//! are already in the set; the set is deduplicated structurally. Case
//! analysis consumes one assumed disjunction per branch and only ever
//! reintroduces its own sub-topes, so it terminates as well.

use rzk_syntax::Term;
use std::collections::HashSet;

use crate::ctx::TypeCheck;
use crate::error::{Result, TypeError};

impl TypeCheck {
    /// Decide whether the current tope context entails `tope`.
    pub fn entails(&mut self, tope: &Term) -> Result<bool> {
        let goal = self.eval(tope)?;
        let saturated = self.saturated_context()?;
        self.entails_goal(&saturated, &goal)
    }

    /// Fail with `TopeContextNotSatisfied` unless the context entails
    /// `tope`; `term` is the term under inspection, kept for rendering.
    pub fn ensure_tope_context(&mut self, term: &Term, tope: &Term) -> Result<()> {
        if self.entails(tope)? {
            Ok(())
        } else {
            Err(TypeError::TopeContextNotSatisfied {
                term: term.clone(),
                tope: tope.clone(),
                context: self.topes().to_vec(),
            })
        }
    }

    /// Check `{sup} ⊢ sub`: entailment of `sub` from `sup` alone, with the
    /// ambient tope context set aside.
    pub fn ensure_sub_tope(&mut self, term: &Term, sub: &Term, sup: &Term) -> Result<()> {
        let saved = self.replace_topes(vec![sup.clone()]);
        let entailed = self.entails(sub);
        self.replace_topes(saved);
        if entailed? {
            Ok(())
        } else {
            Err(TypeError::TopeContextNotSatisfied {
                term: term.clone(),
                tope: sub.clone(),
                context: vec![sup.clone()],
            })
        }
    }

    /// Check that two topes entail each other. Symmetric regardless of
    /// argument order: both directions are always checked, and the
    /// saturation closes equalities under symmetry.
    pub fn ensure_eq_tope(&mut self, left: &Term, right: &Term) -> Result<()> {
        self.ensure_sub_tope(left, left, right)?;
        self.ensure_sub_tope(right, right, left)
    }

    /// The deductive closure of the current tope context.
    fn saturated_context(&mut self) -> Result<HashSet<Term>> {
        let mut set = HashSet::new();
        for tope in self.topes().to_vec() {
            let tope = self.eval(&tope)?;
            self.unfold_tope(&tope, &mut set)?;
        }
        self.saturate(&mut set)?;
        Ok(set)
    }

    /// Close `set` under the interval axioms: conjunction elimination,
    /// symmetry of equality, transitivity and antisymmetry of `<=`, and
    /// the absurdity of `1_2 <= 0_2`.
    fn saturate(&mut self, set: &mut HashSet<Term>) -> Result<()> {
        loop {
            let mut derived: Vec<Term> = Vec::new();
            for tope in set.iter() {
                match tope {
                    Term::TopeAnd(a, b) => {
                        derived.push(a.as_ref().clone());
                        derived.push(b.as_ref().clone());
                    }
                    Term::TopeEq(a, b) => {
                        derived.push(Term::TopeEq(b.clone(), a.clone()));
                    }
                    _ => {}
                }
            }
            let leqs: Vec<(&Term, &Term)> = set
                .iter()
                .filter_map(|t| match t {
                    Term::TopeLeq(a, b) => Some((a.as_ref(), b.as_ref())),
                    _ => None,
                })
                .collect();
            for (x, y) in &leqs {
                for (y2, z) in &leqs {
                    if y == y2 && x != z {
                        derived.push(Term::TopeLeq(
                            Box::new((*x).clone()),
                            Box::new((*z).clone()),
                        ));
                    }
                }
                if x != y && leqs.contains(&(*y, *x)) {
                    derived.push(Term::TopeEq(
                        Box::new((*x).clone()),
                        Box::new((*y).clone()),
                    ));
                }
            }
            if set.contains(&Term::TopeLeq(
                Box::new(Term::Cube2_1),
                Box::new(Term::Cube2_0),
            )) {
                derived.push(Term::TopeBottom);
            }
            let before = set.len();
            for tope in derived {
                if !set.contains(&tope) {
                    self.unfold_tope(&tope, set)?;
                }
            }
            if set.len() == before {
                return Ok(());
            }
        }
    }

    /// Insert `tope` and its immediate logical consequences into `out`.
    ///
    /// Applying a function whose type carries a tope guard asserts the
    /// guard at the argument, so applications unfold through the typing
    /// context.
    fn unfold_tope(&mut self, tope: &Term, out: &mut HashSet<Term>) -> Result<()> {
        match tope {
            Term::TopeAnd(a, b) => {
                out.insert(tope.clone());
                self.unfold_tope(a, out)?;
                self.unfold_tope(b, out)?;
            }
            Term::TopeOr(a, b) => {
                let mut left = HashSet::new();
                self.unfold_tope(a, &mut left)?;
                let mut right = HashSet::new();
                self.unfold_tope(b, &mut right)?;
                for ai in &left {
                    for bj in &right {
                        out.insert(Term::TopeOr(Box::new(ai.clone()), Box::new(bj.clone())));
                    }
                }
            }
            Term::App(f, x) => {
                out.insert(tope.clone());
                if let Term::Var(name) = f.as_ref() {
                    if let Some(f_ty) = self.lookup_type(name).cloned() {
                        let f_ty = self.eval(&f_ty)?;
                        if let Term::Pi(family) = f_ty {
                            if let Term::Lambda {
                                var,
                                guard: Some(guard),
                                ..
                            } = *family
                            {
                                let guard_at_x = self.subst(&var, x, &guard)?;
                                self.unfold_tope(&guard_at_x, out)?;
                            }
                        }
                    }
                }
            }
            _ => {
                out.insert(tope.clone());
            }
        }
        Ok(())
    }

    /// Decide an evaluated goal against a saturated context: membership,
    /// then decomposition of the goal, then case analysis on each assumed
    /// disjunction (both branches must entail the goal).
    fn entails_goal(&mut self, set: &HashSet<Term>, goal: &Term) -> Result<bool> {
        if *goal == Term::TopeTop {
            return Ok(true);
        }
        if set.contains(&Term::TopeBottom) {
            return Ok(true);
        }
        if set.contains(goal) {
            return Ok(true);
        }
        match goal {
            Term::TopeAnd(a, b) => {
                if self.entails_goal(set, a)? && self.entails_goal(set, b)? {
                    return Ok(true);
                }
            }
            Term::TopeOr(a, b) => {
                if self.entails_goal(set, a)? || self.entails_goal(set, b)? {
                    return Ok(true);
                }
            }
            Term::TopeEq(a, b) => {
                if a == b {
                    return Ok(true);
                }
            }
            _ => {}
        }
        let ors: Vec<Term> = set
            .iter()
            .filter(|t| matches!(t, Term::TopeOr(_, _)))
            .cloned()
            .collect();
        for or_tope in ors {
            let Term::TopeOr(a, b) = &or_tope else {
                continue;
            };
            let mut left = set.clone();
            left.remove(&or_tope);
            self.unfold_tope(a, &mut left)?;
            self.saturate(&mut left)?;
            if !self.entails_goal(&left, goal)? {
                continue;
            }
            let mut right = set.clone();
            right.remove(&or_tope);
            self.unfold_tope(b, &mut right)?;
            self.saturate(&mut right)?;
            if self.entails_goal(&right, goal)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
