use std::fmt::{self, Display, Formatter};

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::{CalcError, CalcResult, EvalErrorKind};

/// Largest integer, in bits, an operation may produce.
pub const MAX_INT_BITS: u64 = 1 << 17;

/// Integers with more decimal digits than this are not printed.
pub const MAX_INT_DIGITS: usize = 4300;

/// A numeric result. Integers are arbitrary precision and stay exact until
/// an operation needs a float.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Int(BigInt),
    Float(f64),
}

impl Number {
    pub fn int(value: impl Into<BigInt>) -> Self {
        Self::Int(value.into())
    }

    pub fn as_f64(&self) -> CalcResult<f64> {
        match self {
            Self::Int(value) => int_to_f64(value),
            Self::Float(value) => Ok(*value),
        }
    }

    pub fn as_integer(&self) -> CalcResult<&BigInt> {
        match self {
            Self::Int(value) => Ok(value),
            Self::Float(_) => Err(CalcError::evaluation(
                EvalErrorKind::Type,
                "'float' object cannot be interpreted as an integer",
            )),
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Self::Int(value) => Self::Int(-value),
            Self::Float(value) => Self::Float(-value),
        }
    }

    pub fn checked_add(self, rhs: Self) -> CalcResult<Self> {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => Ok(Self::Int(a + b)),
            (a, b) => Ok(Self::Float(a.as_f64()? + b.as_f64()?)),
        }
    }

    pub fn checked_sub(self, rhs: Self) -> CalcResult<Self> {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => Ok(Self::Int(a - b)),
            (a, b) => Ok(Self::Float(a.as_f64()? - b.as_f64()?)),
        }
    }

    pub fn checked_mul(self, rhs: Self) -> CalcResult<Self> {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => {
                if !a.is_zero() && !b.is_zero() {
                    ensure_bits(a.bits() + b.bits())?;
                }
                Ok(Self::Int(a * b))
            }
            (a, b) => Ok(Self::Float(a.as_f64()? * b.as_f64()?)),
        }
    }

    pub fn true_div(self, rhs: Self) -> CalcResult<Self> {
        match (self, rhs) {
            (Self::Int(_), Self::Int(b)) if b.is_zero() => Err(CalcError::evaluation(
                EvalErrorKind::ZeroDivision,
                "division by zero",
            )),
            (Self::Int(a), Self::Int(b)) => int_true_div(&a, &b).map(Self::Float),
            (a, b) => {
                let divisor = b.as_f64()?;
                let dividend = a.as_f64()?;
                if divisor == 0.0 {
                    return Err(CalcError::evaluation(
                        EvalErrorKind::ZeroDivision,
                        "float division by zero",
                    ));
                }
                Ok(Self::Float(dividend / divisor))
            }
        }
    }

    pub fn floor_div(self, rhs: Self) -> CalcResult<Self> {
        match (self, rhs) {
            (Self::Int(_), Self::Int(b)) if b.is_zero() => Err(CalcError::evaluation(
                EvalErrorKind::ZeroDivision,
                "integer division or modulo by zero",
            )),
            (Self::Int(a), Self::Int(b)) => Ok(Self::Int(a.div_floor(&b))),
            (a, b) => {
                let (floor, _) = float_divmod(a.as_f64()?, b.as_f64()?, "float floor division by zero")?;
                Ok(Self::Float(floor))
            }
        }
    }

    pub fn modulo(self, rhs: Self) -> CalcResult<Self> {
        match (self, rhs) {
            (Self::Int(_), Self::Int(b)) if b.is_zero() => Err(CalcError::evaluation(
                EvalErrorKind::ZeroDivision,
                "integer modulo by zero",
            )),
            (Self::Int(a), Self::Int(b)) => Ok(Self::Int(a.mod_floor(&b))),
            (a, b) => {
                let (_, remainder) = float_divmod(a.as_f64()?, b.as_f64()?, "float modulo by zero")?;
                Ok(Self::Float(remainder))
            }
        }
    }

    pub fn power(self, exponent: Self) -> CalcResult<Self> {
        match (self, exponent) {
            (Self::Int(base), Self::Int(exp)) if !exp.is_negative() => int_pow(&base, &exp),
            (base, exp) => float_pow(base.as_f64()?, exp.as_f64()?),
        }
    }

    /// Fails for integers too long to print.
    pub fn check_printable(&self) -> CalcResult<()> {
        let Self::Int(value) = self else {
            return Ok(());
        };
        // 15000 bits is already above 10^4500.
        let too_long = value.bits() > 15_000
            || value.magnitude().to_string().len() > MAX_INT_DIGITS;
        if too_long {
            return Err(CalcError::evaluation(
                EvalErrorKind::Value,
                format!("Exceeds the limit ({MAX_INT_DIGITS} digits) for integer string conversion"),
            ));
        }
        Ok(())
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => f.write_str(&format_float(*value)),
        }
    }
}

/// Shortest round-trip digits with a fractional part. Magnitudes outside
/// `1e-4..1e16` use scientific notation.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let scientific = format!("{value:e}");
        if let Some((mantissa, exponent)) = scientific.split_once('e') {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            return format!("{mantissa}e{sign}{:02}", exponent.abs());
        }
        return scientific;
    }

    let plain = format!("{value}");
    if plain.contains('.') {
        plain
    } else {
        format!("{plain}.0")
    }
}

pub(crate) fn int_overflow() -> CalcError {
    CalcError::evaluation(EvalErrorKind::Overflow, "integer result too large")
}

pub(crate) fn ensure_bits(bits: u64) -> CalcResult<()> {
    if bits > MAX_INT_BITS {
        return Err(int_overflow());
    }
    Ok(())
}

pub(crate) fn int_to_f64(value: &BigInt) -> CalcResult<f64> {
    value
        .to_f64()
        .filter(|converted| converted.is_finite())
        .ok_or_else(|| {
            CalcError::evaluation(EvalErrorKind::Overflow, "int too large to convert to float")
        })
}

// Correctly rounded: the quotient is taken to 55 significant bits plus a
// sticky bit, then rounded once by the u64 to f64 conversion.
fn int_true_div(dividend: &BigInt, divisor: &BigInt) -> CalcResult<f64> {
    let negative = dividend.is_negative() != divisor.is_negative();
    let (mut a, mut b) = (dividend.abs(), divisor.abs());
    if a.is_zero() {
        return Ok(if negative { -0.0 } else { 0.0 });
    }

    let shift = a.bits() as i64 - b.bits() as i64 - 55;
    if shift > 0 {
        b <<= shift as u64;
    } else {
        a <<= shift.unsigned_abs();
    }
    let (quotient, remainder) = a.div_rem(&b);
    let mut bits = quotient.to_u64().ok_or_else(int_overflow)?;
    if !remainder.is_zero() {
        bits |= 1;
    }

    let half = (shift / 2).clamp(-1100, 1100) as i32;
    let rest = (shift - shift / 2).clamp(-1100, 1100) as i32;
    let magnitude = bits as f64 * 2f64.powi(half) * 2f64.powi(rest);
    if magnitude.is_infinite() {
        return Err(CalcError::evaluation(
            EvalErrorKind::Overflow,
            "integer division result too large for a float",
        ));
    }
    Ok(if negative { -magnitude } else { magnitude })
}

fn int_pow(base: &BigInt, exp: &BigInt) -> CalcResult<Number> {
    if base.is_zero() {
        return Ok(Number::int(u8::from(exp.is_zero())));
    }
    if base.is_one() {
        return Ok(Number::int(1));
    }
    if base.abs().is_one() {
        return Ok(Number::int(if exp.is_even() { 1 } else { -1 }));
    }

    let exp = exp.to_u32().ok_or_else(int_overflow)?;
    ensure_bits((base.bits() - 1).saturating_mul(u64::from(exp)))?;
    Ok(Number::Int(base.pow(exp)))
}

fn float_pow(base: f64, exp: f64) -> CalcResult<Number> {
    if base == 0.0 && exp < 0.0 {
        return Err(CalcError::evaluation(
            EvalErrorKind::ZeroDivision,
            "0.0 cannot be raised to a negative power",
        ));
    }
    if base < 0.0 && exp.is_finite() && exp.fract() != 0.0 {
        return Err(CalcError::evaluation(
            EvalErrorKind::Value,
            "negative number cannot be raised to a fractional power",
        ));
    }

    let result = base.powf(exp);
    if result.is_infinite() && base.is_finite() && exp.is_finite() {
        return Err(CalcError::evaluation(
            EvalErrorKind::Overflow,
            "Numerical result out of range",
        ));
    }
    Ok(Number::Float(result))
}

// Floor quotient and remainder with the remainder taking the divisor's sign.
fn float_divmod(dividend: f64, divisor: f64, zero_message: &str) -> CalcResult<(f64, f64)> {
    if divisor == 0.0 {
        return Err(CalcError::evaluation(EvalErrorKind::ZeroDivision, zero_message));
    }

    let mut remainder = dividend % divisor;
    let mut quotient = (dividend - remainder) / divisor;
    if remainder != 0.0 {
        if (divisor < 0.0) != (remainder < 0.0) {
            remainder += divisor;
            quotient -= 1.0;
        }
    } else {
        remainder = 0.0f64.copysign(divisor);
    }

    let floor = if quotient != 0.0 {
        let mut floor = quotient.floor();
        if quotient - floor > 0.5 {
            floor += 1.0;
        }
        floor
    } else {
        0.0f64.copysign(dividend / divisor)
    };

    Ok((floor, remainder))
}
