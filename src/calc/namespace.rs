//! The names an expression may reference.

use std::collections::BTreeMap;
use std::f64::consts;
use std::sync::LazyLock;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{FromPrimitive, One, Signed, ToPrimitive, Zero};

use super::value::{Number, ensure_bits, int_overflow};
use super::{CalcError, CalcResult, EvalErrorKind};

pub type MathFn = fn(&[Number]) -> CalcResult<Number>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Between(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exact(n) => count == n,
            Self::Between(low, high) => (low..=high).contains(&count),
            Self::AtLeast(n) => count >= n,
        }
    }
}

#[derive(Clone, Copy)]
pub enum AllowListEntry {
    Constant(f64),
    Function { arity: Arity, call: MathFn },
}

/// Immutable mapping from name to constant or function.
pub struct AllowList {
    entries: BTreeMap<&'static str, AllowListEntry>,
}

static GLOBAL: LazyLock<AllowList> = LazyLock::new(AllowList::math);

impl AllowList {
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    pub fn get(&self, name: &str) -> Option<&AllowListEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// The fixed set of numeric constants and pure math functions.
    pub fn math() -> Self {
        use Arity::{AtLeast, Between, Exact};

        let constants = [
            ("pi", consts::PI),
            ("e", consts::E),
            ("tau", consts::TAU),
            ("inf", f64::INFINITY),
            ("nan", f64::NAN),
        ];
        let functions: [(&'static str, Arity, MathFn); 40] = [
            ("acos", Exact(1), acos),
            ("acosh", Exact(1), acosh),
            ("asin", Exact(1), asin),
            ("asinh", Exact(1), |args| unary(args, f64::asinh)),
            ("atan", Exact(1), |args| unary(args, f64::atan)),
            ("atan2", Exact(2), |args| binary(args, f64::atan2)),
            ("atanh", Exact(1), atanh),
            ("cbrt", Exact(1), |args| unary(args, f64::cbrt)),
            ("ceil", Exact(1), ceil),
            ("comb", Exact(2), comb),
            ("copysign", Exact(2), |args| binary(args, f64::copysign)),
            ("cos", Exact(1), cos),
            ("cosh", Exact(1), |args| checked_unary(args, f64::cosh)),
            ("degrees", Exact(1), |args| unary(args, f64::to_degrees)),
            ("exp", Exact(1), |args| checked_unary(args, f64::exp)),
            ("exp2", Exact(1), |args| checked_unary(args, f64::exp2)),
            ("expm1", Exact(1), |args| checked_unary(args, f64::exp_m1)),
            ("fabs", Exact(1), |args| unary(args, f64::abs)),
            ("factorial", Exact(1), factorial),
            ("floor", Exact(1), floor),
            ("fmod", Exact(2), fmod),
            ("gcd", AtLeast(0), gcd),
            ("hypot", AtLeast(0), hypot),
            ("isqrt", Exact(1), isqrt),
            ("lcm", AtLeast(0), lcm),
            ("ldexp", Exact(2), ldexp),
            ("log", Between(1, 2), log),
            ("log10", Exact(1), |args| logarithm(args, f64::log10)),
            ("log1p", Exact(1), log1p),
            ("log2", Exact(1), |args| logarithm(args, f64::log2)),
            ("perm", Between(1, 2), perm),
            ("pow", Exact(2), pow),
            ("radians", Exact(1), |args| unary(args, f64::to_radians)),
            ("remainder", Exact(2), remainder),
            ("sin", Exact(1), sin),
            ("sinh", Exact(1), |args| checked_unary(args, f64::sinh)),
            ("sqrt", Exact(1), sqrt),
            ("tan", Exact(1), tan),
            ("tanh", Exact(1), |args| unary(args, f64::tanh)),
            ("trunc", Exact(1), trunc),
        ];

        let mut entries = BTreeMap::new();
        for (name, value) in constants {
            entries.insert(name, AllowListEntry::Constant(value));
        }
        for (name, arity, call) in functions {
            entries.insert(name, AllowListEntry::Function { arity, call });
        }
        Self { entries }
    }
}

fn domain_error() -> CalcError {
    CalcError::evaluation(EvalErrorKind::Domain, "math domain error")
}

fn range_error() -> CalcError {
    CalcError::evaluation(EvalErrorKind::Overflow, "math range error")
}

fn value_error(message: &str) -> CalcError {
    CalcError::evaluation(EvalErrorKind::Value, message)
}

fn missing_argument() -> CalcError {
    CalcError::evaluation(EvalErrorKind::Type, "missing argument")
}

fn float_arg(args: &[Number], index: usize) -> CalcResult<f64> {
    args.get(index).ok_or_else(missing_argument)?.as_f64()
}

fn int_arg(args: &[Number], index: usize) -> CalcResult<&BigInt> {
    args.get(index).ok_or_else(missing_argument)?.as_integer()
}

// NaN in, NaN out; NaN from a finite input means the input was out of domain.
fn finish(input: f64, result: f64) -> CalcResult<Number> {
    if result.is_nan() && !input.is_nan() {
        return Err(domain_error());
    }
    Ok(Number::Float(result))
}

fn unary(args: &[Number], f: fn(f64) -> f64) -> CalcResult<Number> {
    let x = float_arg(args, 0)?;
    finish(x, f(x))
}

fn checked_unary(args: &[Number], f: fn(f64) -> f64) -> CalcResult<Number> {
    let x = float_arg(args, 0)?;
    let result = f(x);
    if result.is_infinite() && x.is_finite() {
        return Err(range_error());
    }
    finish(x, result)
}

fn binary(args: &[Number], f: fn(f64, f64) -> f64) -> CalcResult<Number> {
    Ok(Number::Float(f(float_arg(args, 0)?, float_arg(args, 1)?)))
}

fn bounded(args: &[Number], low: f64, high: f64, f: fn(f64) -> f64) -> CalcResult<Number> {
    let x = float_arg(args, 0)?;
    if !x.is_nan() && !(low..=high).contains(&x) {
        return Err(domain_error());
    }
    Ok(Number::Float(f(x)))
}

fn acos(args: &[Number]) -> CalcResult<Number> {
    bounded(args, -1.0, 1.0, f64::acos)
}

fn asin(args: &[Number]) -> CalcResult<Number> {
    bounded(args, -1.0, 1.0, f64::asin)
}

fn acosh(args: &[Number]) -> CalcResult<Number> {
    bounded(args, 1.0, f64::INFINITY, f64::acosh)
}

fn atanh(args: &[Number]) -> CalcResult<Number> {
    let x = float_arg(args, 0)?;
    if x.abs() >= 1.0 {
        return Err(domain_error());
    }
    Ok(Number::Float(x.atanh()))
}

fn trig(args: &[Number], f: fn(f64) -> f64) -> CalcResult<Number> {
    let x = float_arg(args, 0)?;
    if x.is_infinite() {
        return Err(domain_error());
    }
    Ok(Number::Float(f(x)))
}

fn sin(args: &[Number]) -> CalcResult<Number> {
    trig(args, f64::sin)
}

fn cos(args: &[Number]) -> CalcResult<Number> {
    trig(args, f64::cos)
}

fn tan(args: &[Number]) -> CalcResult<Number> {
    trig(args, f64::tan)
}

fn sqrt(args: &[Number]) -> CalcResult<Number> {
    let x = float_arg(args, 0)?;
    if x < 0.0 {
        return Err(domain_error());
    }
    Ok(Number::Float(x.sqrt()))
}

fn logarithm(args: &[Number], f: fn(f64) -> f64) -> CalcResult<Number> {
    let x = float_arg(args, 0)?;
    if x <= 0.0 {
        return Err(domain_error());
    }
    Ok(Number::Float(f(x)))
}

fn log(args: &[Number]) -> CalcResult<Number> {
    let x = float_arg(args, 0)?;
    if x <= 0.0 {
        return Err(domain_error());
    }
    match args.get(1) {
        None => Ok(Number::Float(x.ln())),
        Some(base) => {
            let base = base.as_f64()?;
            if base <= 0.0 {
                return Err(domain_error());
            }
            let denominator = base.ln();
            if denominator == 0.0 {
                return Err(CalcError::evaluation(
                    EvalErrorKind::ZeroDivision,
                    "float division by zero",
                ));
            }
            Ok(Number::Float(x.ln() / denominator))
        }
    }
}

fn log1p(args: &[Number]) -> CalcResult<Number> {
    let x = float_arg(args, 0)?;
    if x <= -1.0 {
        return Err(domain_error());
    }
    Ok(Number::Float(x.ln_1p()))
}

fn integral(args: &[Number], f: fn(f64) -> f64) -> CalcResult<Number> {
    match args.first() {
        Some(Number::Int(value)) => Ok(Number::Int(value.clone())),
        Some(Number::Float(value)) => {
            if value.is_nan() {
                return Err(value_error("cannot convert float NaN to integer"));
            }
            if value.is_infinite() {
                return Err(CalcError::evaluation(
                    EvalErrorKind::Overflow,
                    "cannot convert float infinity to integer",
                ));
            }
            BigInt::from_f64(f(*value))
                .map(Number::Int)
                .ok_or_else(range_error)
        }
        None => Err(missing_argument()),
    }
}

fn ceil(args: &[Number]) -> CalcResult<Number> {
    integral(args, f64::ceil)
}

fn floor(args: &[Number]) -> CalcResult<Number> {
    integral(args, f64::floor)
}

fn trunc(args: &[Number]) -> CalcResult<Number> {
    integral(args, f64::trunc)
}

fn fmod(args: &[Number]) -> CalcResult<Number> {
    let x = float_arg(args, 0)?;
    let y = float_arg(args, 1)?;
    if y == 0.0 || x.is_infinite() {
        return Err(domain_error());
    }
    Ok(Number::Float(x % y))
}

fn remainder(args: &[Number]) -> CalcResult<Number> {
    let x = float_arg(args, 0)?;
    let y = float_arg(args, 1)?;
    if y == 0.0 || x.is_infinite() {
        return Err(domain_error());
    }
    if y.is_infinite() {
        return Ok(Number::Float(x));
    }
    // IEEE remainder: x - n*y where n is x/y rounded half to even.
    let quotient = x / y;
    let mut nearest = quotient.round();
    if (quotient - quotient.trunc()).abs() == 0.5 && nearest % 2.0 != 0.0 {
        nearest -= quotient.signum();
    }
    Ok(Number::Float(x - nearest * y))
}

fn hypot(args: &[Number]) -> CalcResult<Number> {
    let mut total = 0.0f64;
    for arg in args {
        let x = arg.as_f64()?;
        if x.is_infinite() {
            return Ok(Number::Float(f64::INFINITY));
        }
        total = total.hypot(x);
    }
    Ok(Number::Float(total))
}

fn ldexp(args: &[Number]) -> CalcResult<Number> {
    let x = float_arg(args, 0)?;
    let exp = int_arg(args, 1)?;
    let exp = exp
        .to_i32()
        .unwrap_or(if exp.is_negative() { i32::MIN } else { i32::MAX })
        .clamp(-2000, 2000);
    let result = x * 2f64.powi(exp);
    if result.is_infinite() && x.is_finite() {
        return Err(range_error());
    }
    Ok(Number::Float(result))
}

fn pow(args: &[Number]) -> CalcResult<Number> {
    let x = float_arg(args, 0)?;
    let y = float_arg(args, 1)?;
    if x == 0.0 && y < 0.0 {
        return Err(domain_error());
    }
    if x < 0.0 && x.is_finite() && y.is_finite() && y.fract() != 0.0 {
        return Err(domain_error());
    }
    let result = x.powf(y);
    if result.is_infinite() && x.is_finite() && y.is_finite() {
        return Err(range_error());
    }
    Ok(Number::Float(result))
}

fn isqrt(args: &[Number]) -> CalcResult<Number> {
    let n = int_arg(args, 0)?;
    if n.is_negative() {
        return Err(value_error("isqrt() argument must be nonnegative"));
    }
    Ok(Number::Int(n.sqrt()))
}

// Running products check their size after every step.
fn product(factors: impl Iterator<Item = u64>) -> CalcResult<BigInt> {
    let mut product = BigInt::one();
    for factor in factors {
        product *= factor;
        ensure_bits(product.bits())?;
    }
    Ok(product)
}

fn factorial(args: &[Number]) -> CalcResult<Number> {
    let n = int_arg(args, 0)?;
    if n.is_negative() {
        return Err(value_error("factorial() not defined for negative values"));
    }
    let n = n.to_u64().ok_or_else(int_overflow)?;
    product(2..=n).map(Number::Int)
}

fn gcd(args: &[Number]) -> CalcResult<Number> {
    let mut result = BigInt::zero();
    for index in 0..args.len() {
        result = result.gcd(int_arg(args, index)?);
    }
    Ok(Number::Int(result))
}

fn lcm(args: &[Number]) -> CalcResult<Number> {
    let mut result = BigInt::one();
    for index in 0..args.len() {
        let value = int_arg(args, index)?;
        if value.is_zero() || result.is_zero() {
            result = BigInt::zero();
            continue;
        }
        ensure_bits(result.bits() + value.bits())?;
        result = result.lcm(value).abs();
    }
    Ok(Number::Int(result))
}

fn non_negative_pair(n: &BigInt, k: &BigInt) -> CalcResult<()> {
    if n.is_negative() || k.is_negative() {
        return Err(value_error("n and k must be non-negative integers"));
    }
    Ok(())
}

fn perm(args: &[Number]) -> CalcResult<Number> {
    let n = int_arg(args, 0)?;
    let k = if args.len() > 1 { int_arg(args, 1)? } else { n };
    non_negative_pair(n, k)?;
    if k > n {
        return Ok(Number::int(0));
    }
    let k = k.to_u64().ok_or_else(int_overflow)?;
    let mut result = BigInt::one();
    let mut factor = n.clone();
    for _ in 0..k {
        result *= &factor;
        ensure_bits(result.bits())?;
        factor -= 1u8;
    }
    Ok(Number::Int(result))
}

fn comb(args: &[Number]) -> CalcResult<Number> {
    let n = int_arg(args, 0)?;
    let k = int_arg(args, 1)?;
    non_negative_pair(n, k)?;
    if k > n {
        return Ok(Number::int(0));
    }
    let k = k.min(&(n - k)).to_u64().ok_or_else(int_overflow)?;
    let base = n - k;
    let mut result = BigInt::one();
    for step in 1..=k {
        // Dividing after each multiplication keeps every partial result exact.
        result = result * (&base + step) / step;
        ensure_bits(result.bits())?;
    }
    Ok(Number::Int(result))
}
