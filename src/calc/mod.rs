//! Arithmetic-only expression evaluation.
//!
//! Input is parsed with a general expression grammar, the resulting tree is
//! checked against the allow-list in [`namespace`], and only a tree that
//! passed the check is ever evaluated.

mod ast;
mod eval;
mod lexer;
pub mod namespace;
mod parser;
mod validate;
pub mod value;

use std::error::Error;
use std::fmt::{Display, Formatter};

pub use ast::Expr;
pub use namespace::AllowList;
pub use parser::parse;
pub use validate::{Checked, validate};
pub use value::{Number, format_float};

/// Longest expression the evaluator will look at.
pub const MAX_EXPRESSION_LEN: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    ZeroDivision,
    Domain,
    Overflow,
    Type,
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalcError {
    Syntax { message: String, offset: usize },
    Unsupported { construct: String },
    Evaluation { kind: EvalErrorKind, message: String },
}

impl CalcError {
    pub(crate) fn syntax(message: impl Into<String>, offset: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            offset,
        }
    }

    pub(crate) fn unsupported(construct: impl Into<String>) -> Self {
        Self::Unsupported {
            construct: construct.into(),
        }
    }

    pub(crate) fn evaluation(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self::Evaluation {
            kind,
            message: message.into(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

impl Display for CalcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax { message, offset } => {
                write!(f, "invalid syntax at offset {offset}: {message}")
            }
            Self::Unsupported { construct } => write!(f, "Unsupported expression: {construct}"),
            Self::Evaluation { message, .. } => write!(f, "{message}"),
        }
    }
}

impl Error for CalcError {}

pub type CalcResult<T> = std::result::Result<T, CalcError>;

/// Parses, validates and evaluates `expr` against the process-wide allow-list.
pub fn evaluate(expr: &str) -> CalcResult<Number> {
    evaluate_with(expr, AllowList::global())
}

pub fn evaluate_with(expr: &str, names: &AllowList) -> CalcResult<Number> {
    let tree = parse(expr)?;
    let checked = validate(&tree, names)?;
    let value = eval::evaluate_checked(checked, names)?;
    value.check_printable()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::{CalcError, EvalErrorKind, Number, evaluate};

    #[test]
    fn evaluates_nested_arithmetic_with_power() {
        assert_eq!(evaluate("2*(3+4)**2").expect("eval"), Number::int(98));
    }

    #[test]
    fn evaluates_allow_listed_functions_and_constants() {
        assert_eq!(evaluate("sqrt(16) + 1").expect("eval"), Number::Float(5.0));
        assert_eq!(evaluate("floor(pi)").expect("eval"), Number::int(3));
        let value = evaluate("sin(pi / 2) + log(e)").expect("eval");
        assert_eq!(value, Number::Float(2.0));
    }

    #[test]
    fn rejects_before_evaluating() {
        // The division by zero sits next to a disallowed name, the name wins.
        let err = evaluate("1/0 + os").expect_err("must reject");
        assert_eq!(
            err,
            CalcError::Unsupported {
                construct: "Name 'os'".to_string()
            }
        );
    }

    #[test]
    fn caret_is_xor_and_never_evaluated() {
        let err = evaluate("2^3").expect_err("xor is not arithmetic");
        assert!(err.is_unsupported());
        assert_eq!(err.to_string(), "Unsupported expression: BitXor");
    }

    #[test]
    fn runtime_failures_are_evaluation_errors() {
        match evaluate("1/0").expect_err("division by zero") {
            CalcError::Evaluation { kind, message } => {
                assert_eq!(kind, EvalErrorKind::ZeroDivision);
                assert_eq!(message, "division by zero");
            }
            other => panic!("expected evaluation error, got {other:?}"),
        }

        match evaluate("sqrt(-1)").expect_err("domain error") {
            CalcError::Evaluation { kind, message } => {
                assert_eq!(kind, EvalErrorKind::Domain);
                assert_eq!(message, "math domain error");
            }
            other => panic!("expected evaluation error, got {other:?}"),
        }
    }

    #[test]
    fn classic_escape_attempts_are_unsupported() {
        for source in [
            "__import__('os').system('ls')",
            "(1).__class__",
            "().__class__.__bases__[0].__subclasses__()",
            "[x for x in range(10)]",
            "lambda: 1",
            "pi.real",
            "open('/etc/passwd')",
            "x = 1",
            "(y := 3)",
            "'a' * 3",
            "b'abc'",
            "sqrt(x=4)",
            "sqrt(*[4])",
            "pi(2)",
            "True + 1",
            "1 if 1 else 2",
            "1 < 2",
            "1 and 2",
            "not 1",
            "~1",
            "1j",
            "{1: 2}",
        ] {
            let err = evaluate(source).expect_err(source);
            assert!(
                err.is_unsupported(),
                "{source:?} should be unsupported, got {err:?}"
            );
        }
    }

    #[test]
    fn syntax_errors_are_reported_with_offset() {
        match evaluate("2 +").expect_err("incomplete") {
            CalcError::Syntax { offset, .. } => assert_eq!(offset, 3),
            other => panic!("expected syntax error, got {other:?}"),
        }
        assert!(matches!(
            evaluate("import os").expect_err("statement"),
            CalcError::Syntax { .. }
        ));
        assert!(matches!(
            evaluate("").expect_err("empty"),
            CalcError::Syntax { .. }
        ));
    }

    #[test]
    fn overly_long_input_is_a_syntax_error() {
        let source = "1+".repeat(3000) + "1";
        assert!(matches!(
            evaluate(&source).expect_err("too long"),
            CalcError::Syntax { .. }
        ));
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let source = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert!(matches!(
            evaluate(&source).expect_err("too deep"),
            CalcError::Syntax { .. }
        ));
    }
}
