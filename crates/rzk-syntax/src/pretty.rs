//! Rendering of terms in the surface notation. Used by error messages,
//! so the output has to stay stable and readable rather than minimal.

use crate::Term;
use std::fmt;

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_term(f, self)
    }
}

fn write_term(f: &mut fmt::Formatter<'_>, term: &Term) -> fmt::Result {
    match term {
        Term::Var(x) => write!(f, "{}", x),
        Term::Hole(x) => write!(f, "?{}", x),
        Term::Universe => write!(f, "U"),
        Term::Typed(t, ty) => {
            write!(f, "(")?;
            write_term(f, t)?;
            write!(f, " : ")?;
            write_term(f, ty)?;
            write!(f, ")")
        }
        Term::Pi(family) => match family.as_ref() {
            Term::Lambda {
                var,
                arg_ty: Some(arg_ty),
                guard: None,
                body,
            } => {
                write!(f, "({} : ", var)?;
                write_term(f, arg_ty)?;
                write!(f, ") -> ")?;
                write_term(f, body)
            }
            Term::Lambda {
                var,
                arg_ty: Some(arg_ty),
                guard: Some(guard),
                body,
            } => {
                write!(f, "{{{} : ", var)?;
                write_term(f, arg_ty)?;
                write!(f, " | ")?;
                write_term(f, guard)?;
                write!(f, "}} -> ")?;
                write_term(f, body)
            }
            other => {
                write!(f, "Pi ")?;
                write_atom(f, other)
            }
        },
        Term::Sigma(family) => match family.as_ref() {
            Term::Lambda {
                var,
                arg_ty: Some(arg_ty),
                guard: None,
                body,
            } => {
                write!(f, "∑ ({} : ", var)?;
                write_term(f, arg_ty)?;
                write!(f, "), ")?;
                write_term(f, body)
            }
            other => {
                write!(f, "Sigma ")?;
                write_atom(f, other)
            }
        },
        Term::Lambda {
            var,
            arg_ty,
            guard,
            body,
        } => {
            match (arg_ty, guard) {
                (Some(arg_ty), Some(guard)) => {
                    write!(f, "\\{{{} : ", var)?;
                    write_term(f, arg_ty)?;
                    write!(f, " | ")?;
                    write_term(f, guard)?;
                    write!(f, "}} -> ")?;
                }
                (Some(arg_ty), None) => {
                    write!(f, "\\({} : ", var)?;
                    write_term(f, arg_ty)?;
                    write!(f, ") -> ")?;
                }
                _ => write!(f, "\\{} -> ", var)?,
            }
            write_term(f, body)
        }
        Term::App(fun, arg) => {
            match fun.as_ref() {
                Term::Lambda { .. } | Term::Pi(_) | Term::Sigma(_) => write_atom(f, fun)?,
                _ => write_term(f, fun)?,
            }
            write!(f, " ")?;
            write_atom(f, arg)
        }
        Term::Pair(first, second) => {
            write!(f, "(")?;
            write_term(f, first)?;
            write!(f, ", ")?;
            write_term(f, second)?;
            write!(f, ")")
        }
        Term::First(t) => {
            write!(f, "first ")?;
            write_atom(f, t)
        }
        Term::Second(t) => {
            write!(f, "second ")?;
            write_atom(f, t)
        }
        Term::IdType(ty, x, y) => {
            write_atom(f, x)?;
            write!(f, " =_{{")?;
            write_term(f, ty)?;
            write!(f, "}} ")?;
            write_atom(f, y)
        }
        Term::Refl(Some(ty), x) => {
            write!(f, "refl_{{")?;
            write_term(f, x)?;
            write!(f, " : ")?;
            write_term(f, ty)?;
            write!(f, "}}")
        }
        Term::Refl(None, x) => {
            write!(f, "refl_{{")?;
            write_term(f, x)?;
            write!(f, "}}")
        }
        Term::IdJ(a, b, c, d, e, p) => {
            write!(f, "idJ(")?;
            for (i, t) in [a, b, c, d, e, p].into_iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_term(f, t)?;
            }
            write!(f, ")")
        }
        Term::Cube => write!(f, "CUBE"),
        Term::CubeUnit => write!(f, "1"),
        Term::CubeUnitStar => write!(f, "*_1"),
        Term::CubeProd(i, j) => {
            write_atom(f, i)?;
            write!(f, " * ")?;
            write_atom(f, j)
        }
        Term::Cube2 => write!(f, "2"),
        Term::Cube2_0 => write!(f, "0_2"),
        Term::Cube2_1 => write!(f, "1_2"),
        Term::Tope => write!(f, "TOPE"),
        Term::TopeTop => write!(f, "TOP"),
        Term::TopeBottom => write!(f, "BOT"),
        Term::TopeOr(a, b) => {
            write_atom(f, a)?;
            write!(f, " \\/ ")?;
            write_atom(f, b)
        }
        Term::TopeAnd(a, b) => {
            write_atom(f, a)?;
            write!(f, " /\\ ")?;
            write_atom(f, b)
        }
        Term::TopeEq(a, b) => {
            write_atom(f, a)?;
            write!(f, " === ")?;
            write_atom(f, b)
        }
        Term::TopeLeq(a, b) => {
            write_atom(f, a)?;
            write!(f, " <= ")?;
            write_atom(f, b)
        }
        Term::RecBottom => write!(f, "recBOT"),
        Term::RecOr(psi, phi, a, b) => {
            write!(f, "recOR(")?;
            for (i, t) in [psi, phi, a, b].into_iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_term(f, t)?;
            }
            write!(f, ")")
        }
        Term::ExtensionType {
            var,
            cube,
            shape,
            ty,
            tope,
            term,
        } => {
            write!(f, "<{{{} : ", var)?;
            write_term(f, cube)?;
            write!(f, " | ")?;
            write_term(f, shape)?;
            write!(f, "}} -> ")?;
            write_term(f, ty)?;
            write!(f, " [")?;
            write_term(f, tope)?;
            write!(f, " |-> ")?;
            write_term(f, term)?;
            write!(f, "]>")
        }
    }
}

/// Write `term`, parenthesized unless it renders as a single token.
fn write_atom(f: &mut fmt::Formatter<'_>, term: &Term) -> fmt::Result {
    if is_atomic(term) {
        write_term(f, term)
    } else {
        write!(f, "(")?;
        write_term(f, term)?;
        write!(f, ")")
    }
}

fn is_atomic(term: &Term) -> bool {
    matches!(
        term,
        Term::Var(_)
            | Term::Hole(_)
            | Term::Universe
            | Term::Typed(_, _)
            | Term::Pair(_, _)
            | Term::Refl(_, _)
            | Term::IdJ(_, _, _, _, _, _)
            | Term::Cube
            | Term::CubeUnit
            | Term::CubeUnitStar
            | Term::Cube2
            | Term::Cube2_0
            | Term::Cube2_1
            | Term::Tope
            | Term::TopeTop
            | Term::TopeBottom
            | Term::RecBottom
            | Term::RecOr(_, _, _, _)
            | Term::ExtensionType { .. }
    )
}
