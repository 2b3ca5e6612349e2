use super::ast::{BinaryOp, Expr, UnaryOp};
use super::namespace::{AllowList, AllowListEntry, Arity};
use super::validate::{Checked, ungroup};
use super::value::Number;
use super::{CalcError, CalcResult, EvalErrorKind};

pub(crate) fn evaluate_checked(checked: Checked<'_>, names: &AllowList) -> CalcResult<Number> {
    eval(checked.expr(), names)
}

// Anything the validator would have refused is reported rather than trusted.
fn eval(expr: &Expr, names: &AllowList) -> CalcResult<Number> {
    match expr {
        Expr::Number(value) => Ok(value.clone()),
        Expr::Group(inner) => eval(inner, names),
        Expr::Unary {
            op: UnaryOp::Pos,
            operand,
        } => eval(operand, names),
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } => Ok(eval(operand, names)?.negate()),
        Expr::Binary { op, left, right } => {
            let left = eval(left, names)?;
            let right = eval(right, names)?;
            apply(*op, left, right)
        }
        Expr::Name(name) => match names.get(name) {
            Some(AllowListEntry::Constant(value)) => Ok(Number::Float(*value)),
            _ => Err(CalcError::unsupported(expr.construct())),
        },
        Expr::Call {
            func,
            args,
            keywords,
        } if keywords.is_empty() => call(ungroup(func), args, names),
        other => Err(CalcError::unsupported(other.construct())),
    }
}

fn apply(op: BinaryOp, left: Number, right: Number) -> CalcResult<Number> {
    match op {
        BinaryOp::Add => left.checked_add(right),
        BinaryOp::Sub => left.checked_sub(right),
        BinaryOp::Mul => left.checked_mul(right),
        BinaryOp::Div => left.true_div(right),
        BinaryOp::FloorDiv => left.floor_div(right),
        BinaryOp::Mod => left.modulo(right),
        BinaryOp::Pow => left.power(right),
        other => Err(CalcError::unsupported(other.construct())),
    }
}

fn call(func: &Expr, args: &[Expr], names: &AllowList) -> CalcResult<Number> {
    let Expr::Name(name) = func else {
        return Err(CalcError::unsupported(func.construct()));
    };
    let Some(AllowListEntry::Function { arity, call }) = names.get(name) else {
        return Err(CalcError::unsupported(format!("Call to non-function '{name}'")));
    };

    if !arity.accepts(args.len()) {
        return Err(CalcError::evaluation(
            EvalErrorKind::Type,
            format!(
                "{name}() takes {} ({} given)",
                describe_arity(*arity),
                args.len()
            ),
        ));
    }

    let values = args
        .iter()
        .map(|arg| eval(arg, names))
        .collect::<CalcResult<Vec<_>>>()?;
    call(&values)
}

fn describe_arity(arity: Arity) -> String {
    match arity {
        Arity::Exact(1) => "exactly one argument".to_string(),
        Arity::Exact(n) => format!("exactly {n} arguments"),
        Arity::Between(low, high) => format!("from {low} to {high} arguments"),
        Arity::AtLeast(n) => format!("at least {n} arguments"),
    }
}

#[cfg(test)]
mod tests {
    use crate::calc::{CalcError, EvalErrorKind, Number, evaluate};

    #[test]
    fn integers_stay_exact_until_division() {
        assert_eq!(evaluate("7 // 2").expect("eval"), Number::int(3));
        assert_eq!(evaluate("7 / 2").expect("eval"), Number::Float(3.5));
        assert_eq!(evaluate("4 / 2").expect("eval"), Number::Float(2.0));
        assert_eq!(evaluate("-7 % 3").expect("eval"), Number::int(2));
        assert_eq!(evaluate("2 ** -1").expect("eval"), Number::Float(0.5));
        assert_eq!(evaluate("-2 ** 2").expect("eval"), Number::int(-4));
        assert_eq!(evaluate("2 ** 3 ** 2").expect("eval"), Number::int(512));
    }

    // Expected strings are what Python's repr prints for the same input.
    #[test]
    fn results_print_like_python_repr() {
        let cases = [
            ("10 ** 100", "10000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000"),
            ("2 ** 128", "340282366920938463463374607431768211456"),
            ("-2 ** 127 - 1", "-170141183460469231731687303715884105729"),
            ("99999999999999999999999999999999999999999 + 1", "100000000000000000000000000000000000000000"),
            ("10 ** 40 // 10 ** 30", "10000000000"),
            ("-(10 ** 30) // 7", "-142857142857142857142857142858"),
            ("(10 ** 30) % -7", "-6"),
            ("-7 // 2", "-4"),
            ("7 % -3", "-2"),
            ("-7.5 // 2", "-4.0"),
            ("-7.5 % 2", "0.5"),
            ("7 % -0.5", "-0.0"),
            ("2 ** 3 ** 2", "512"),
            ("(2 ** 3) ** 2", "64"),
            ("2 ** -2", "0.25"),
            ("2 ** 0.5", "1.4142135623730951"),
            ("10 ** 20 / 10 ** 10", "10000000000.0"),
            ("2 ** 100 / 3", "4.2255020007607644e+29"),
            ("10 ** 400 / 10 ** 399", "10.0"),
            ("1 + 2.0", "3.0"),
            ("0.1 * 3", "0.30000000000000004"),
            ("1e16", "1e+16"),
            ("12345678901234567.0", "1.2345678901234568e+16"),
            ("0.00001", "1e-05"),
            ("-0.0", "-0.0"),
            ("0x_ff", "255"),
            ("0xffffffffffffffffffffffffffffffffff", "87112285931760246646623899502532662132735"),
            ("factorial(30)", "265252859812191058636308480000000"),
            ("comb(100, 50)", "100891344545564193334812497256"),
            ("perm(30, 25)", "2210440498434925488635904000000"),
            ("gcd(2 ** 100, 6 ** 40)", "1099511627776"),
            ("lcm(2 ** 70, 3 ** 40)", "14353237968448109868972222216943775514624"),
            ("isqrt(10 ** 50)", "10000000000000000000000000"),
            ("floor(1e20)", "100000000000000000000"),
            ("ceil(-2.5)", "-2"),
            ("sqrt(2 ** 100)", "1125899906842624.0"),
            ("pow(2, 10)", "1024.0"),
            ("inf - inf", "nan"),
            ("-inf", "-inf"),
        ];
        for (src, repr) in cases {
            let value = evaluate(src).unwrap_or_else(|err| panic!("{src}: {err}"));
            assert_eq!(value.to_string(), repr, "{src}");
        }
    }

    #[test]
    fn displays_integers_and_floats() {
        assert_eq!(evaluate("0.1 + 0.2").expect("eval").to_string(), "0.30000000000000004");
        assert_eq!(evaluate("10 / 4").expect("eval").to_string(), "2.5");
        assert_eq!(evaluate("2 * 3.0").expect("eval").to_string(), "6.0");
        assert_eq!(evaluate("inf").expect("eval").to_string(), "inf");
    }

    #[test]
    fn wrong_argument_count_is_a_type_error() {
        match evaluate("sqrt(1, 2)").expect_err("arity") {
            CalcError::Evaluation { kind, message } => {
                assert_eq!(kind, EvalErrorKind::Type);
                assert_eq!(message, "sqrt() takes exactly one argument (2 given)");
            }
            other => panic!("expected evaluation error, got {other:?}"),
        }
    }

    #[test]
    fn oversized_results_are_reported() {
        for (src, kind) in [
            ("10 ** 400 + 0.5", EvalErrorKind::Overflow),
            ("2 ** 1000000", EvalErrorKind::Overflow),
            ("10 ** 5000", EvalErrorKind::Value),
            ("factorial(100000)", EvalErrorKind::Overflow),
        ] {
            match evaluate(src).expect_err(src) {
                CalcError::Evaluation { kind: actual, .. } => assert_eq!(actual, kind, "{src}"),
                other => panic!("{src}: expected evaluation error, got {other:?}"),
            }
        }
        // Large intermediates are fine while the final result stays printable.
        assert_eq!(
            evaluate("10 ** 5000 // 10 ** 4990").expect("eval"),
            Number::int(10_000_000_000i64)
        );
    }

    #[test]
    fn arguments_are_evaluated_before_the_call() {
        assert_eq!(evaluate("factorial(2 + 3)").expect("eval"), Number::int(120));
        let err = evaluate("sqrt(1 / 0)").expect_err("inner failure");
        assert_eq!(err.to_string(), "division by zero");
    }
}
