use super::ast::{Expr, UnaryOp};
use super::namespace::{AllowList, AllowListEntry};
use super::{CalcError, CalcResult};

/// A tree that passed [`validate`]. Only the validator can build one, so the
/// evaluator never sees an unchecked tree.
#[derive(Debug, Clone, Copy)]
pub struct Checked<'a> {
    expr: &'a Expr,
}

impl<'a> Checked<'a> {
    pub(crate) fn expr(&self) -> &'a Expr {
        self.expr
    }
}

/// Walks the whole tree and rejects every node outside the arithmetic
/// subset. The first rejected node, in evaluation order, names the error.
pub fn validate<'a>(expr: &'a Expr, names: &AllowList) -> CalcResult<Checked<'a>> {
    check(expr, names)?;
    Ok(Checked { expr })
}

fn check(expr: &Expr, names: &AllowList) -> CalcResult<()> {
    match expr {
        Expr::Number(_) => Ok(()),
        Expr::Group(inner) => check(inner, names),
        Expr::Unary {
            op: UnaryOp::Pos | UnaryOp::Neg,
            operand,
        } => check(operand, names),
        Expr::Binary { op, left, right } if op.is_arithmetic() => {
            check(left, names)?;
            check(right, names)
        }
        Expr::Name(name) if names.contains(name) => Ok(()),
        Expr::Call {
            func,
            args,
            keywords,
        } => check_call(func, args, !keywords.is_empty(), names),
        other => Err(CalcError::unsupported(other.construct())),
    }
}

fn check_call(func: &Expr, args: &[Expr], has_keywords: bool, names: &AllowList) -> CalcResult<()> {
    let func = ungroup(func);
    let Expr::Name(name) = func else {
        return Err(CalcError::unsupported(func.construct()));
    };
    match names.get(name) {
        Some(AllowListEntry::Function { .. }) => {}
        Some(AllowListEntry::Constant(_)) => {
            return Err(CalcError::unsupported(format!("Call to non-function '{name}'")));
        }
        None => return Err(CalcError::unsupported(func.construct())),
    }

    for arg in args {
        check(arg, names)?;
    }
    if has_keywords {
        return Err(CalcError::unsupported("keyword argument"));
    }
    Ok(())
}

pub(crate) fn ungroup(mut expr: &Expr) -> &Expr {
    while let Expr::Group(inner) = expr {
        expr = inner.as_ref();
    }
    expr
}
