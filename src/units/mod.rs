//! Recognises "<value> <unit> to <unit>" requests and hands them to a
//! [`UnitConverter`].

mod registry;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use regex::Regex;

pub use registry::{Dimension, Unit, UnitRegistry};

// Unit tokens are letters, the degree sign and `/`, so `km/h` works but `m2` does not.
static CONVERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:convert\s+)?([0-9]+(?:\.[0-9]+)?)\s*([a-zA-Z°/]+)\s*(?:to|in)\s*([a-zA-Z°/]+)")
        .expect("valid conversion regex")
});

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionError {
    UndefinedUnit {
        unit: String,
    },
    Dimensionality {
        from: String,
        from_dimension: String,
        to: String,
        to_dimension: String,
    },
    OffsetUnit {
        unit: String,
    },
    NonFiniteValue {
        value: String,
    },
}

impl Display for ConversionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UndefinedUnit { unit } => {
                write!(f, "'{unit}' is not defined in the unit registry")
            }
            Self::Dimensionality {
                from,
                from_dimension,
                to,
                to_dimension,
            } => write!(
                f,
                "Cannot convert from '{from}' ({from_dimension}) to '{to}' ({to_dimension})"
            ),
            Self::OffsetUnit { unit } => {
                write!(f, "Ambiguous operation with offset unit ({unit}).")
            }
            Self::NonFiniteValue { value } => write!(f, "'{value}' is not a finite number"),
        }
    }
}

impl Error for ConversionError {}

pub type ConversionResult<T> = std::result::Result<T, ConversionError>;

/// A value and the two unit tokens it should be converted between. The
/// value is always finite; units are checked only by the converter.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionQuery {
    value: f64,
    from_unit: String,
    to_unit: String,
}

impl ConversionQuery {
    pub fn new(value: f64, from_unit: &str, to_unit: &str) -> ConversionResult<Self> {
        if !value.is_finite() {
            return Err(ConversionError::NonFiniteValue {
                value: value.to_string(),
            });
        }
        Ok(Self {
            value,
            from_unit: from_unit.to_string(),
            to_unit: to_unit.to_string(),
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn from_unit(&self) -> &str {
        &self.from_unit
    }

    pub fn to_unit(&self) -> &str {
        &self.to_unit
    }
}

/// Display forms of both quantities plus the converted magnitude.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub original: String,
    pub converted: String,
    pub value: f64,
}

pub trait UnitConverter {
    fn convert(&self, query: &ConversionQuery) -> ConversionResult<Conversion>;
}

/// Finds a conversion request anywhere in `text`. `None` means the text is
/// not a conversion request at all.
pub fn parse_conversion(text: &str) -> Option<ConversionResult<ConversionQuery>> {
    let captures = CONVERSION_PATTERN.captures(text)?;
    let literal = captures.get(1)?.as_str();
    let from = captures.get(2)?.as_str();
    let to = captures.get(3)?.as_str();

    let query = match literal.parse::<f64>() {
        Ok(value) => ConversionQuery::new(value, from, to),
        Err(_) => Err(ConversionError::NonFiniteValue {
            value: literal.to_string(),
        }),
    };
    Some(query)
}

/// Matches and converts. A recognised request whose conversion fails is
/// still a match and carries the failure.
pub fn match_conversion(
    text: &str,
    converter: &impl UnitConverter,
) -> Option<ConversionResult<Conversion>> {
    parse_conversion(text).map(|query| query.and_then(|query| converter.convert(&query)))
}
