//! Built-in unit table.
//!
//! Every unit is a scale (and for temperatures an offset) onto the SI base of
//! its dimension, so `base = value * factor + offset`. Information is measured
//! in bits and angles are dimensionless, with the radian as base.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt::{self, Display, Formatter};

use super::{Conversion, ConversionError, ConversionQuery, ConversionResult, UnitConverter};
use crate::calc::format_float;

const BASE_NAMES: [&str; 5] = ["[information]", "[length]", "[mass]", "[temperature]", "[time]"];

/// Exponents over information, length, mass, temperature and time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension([i8; 5]);

impl Dimension {
    const NONE: Self = Self([0, 0, 0, 0, 0]);
    const INFORMATION: Self = Self([1, 0, 0, 0, 0]);
    const LENGTH: Self = Self([0, 1, 0, 0, 0]);
    const AREA: Self = Self([0, 2, 0, 0, 0]);
    const VOLUME: Self = Self([0, 3, 0, 0, 0]);
    const MASS: Self = Self([0, 0, 1, 0, 0]);
    const TEMPERATURE: Self = Self([0, 0, 0, 1, 0]);
    const TIME: Self = Self([0, 0, 0, 0, 1]);
    const FREQUENCY: Self = Self([0, 0, 0, 0, -1]);
    const SPEED: Self = Self([0, 1, 0, 0, -1]);
    const ENERGY: Self = Self([0, 2, 1, 0, -2]);
    const POWER: Self = Self([0, 2, 1, 0, -3]);
    const PRESSURE: Self = Self([0, -1, 1, 0, -2]);

    fn divide(self, other: Self) -> Self {
        let mut exponents = self.0;
        for (exponent, divisor) in exponents.iter_mut().zip(other.0) {
            *exponent -= divisor;
        }
        Self(exponents)
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if *self == Self::NONE {
            return f.write_str("dimensionless");
        }

        let term = |name: &str, exponent: i8| {
            if exponent == 1 {
                name.to_string()
            } else {
                format!("{name} ** {exponent}")
            }
        };
        let numerator: Vec<String> = BASE_NAMES
            .iter()
            .zip(self.0)
            .filter(|(_, exponent)| *exponent > 0)
            .map(|(name, exponent)| term(*name, exponent))
            .collect();
        let denominator: Vec<String> = BASE_NAMES
            .iter()
            .zip(self.0)
            .filter(|(_, exponent)| *exponent < 0)
            .map(|(name, exponent)| term(*name, -exponent))
            .collect();

        if numerator.is_empty() {
            f.write_str("1")?;
        } else {
            f.write_str(&numerator.join(" * "))?;
        }
        for name in denominator {
            write!(f, " / {name}")?;
        }
        Ok(())
    }
}

struct UnitDef {
    name: &'static str,
    aliases: &'static [&'static str],
    factor: f64,
    offset: f64,
    dimension: Dimension,
}

const fn unit(
    name: &'static str,
    aliases: &'static [&'static str],
    factor: f64,
    dimension: Dimension,
) -> UnitDef {
    UnitDef {
        name,
        aliases,
        factor,
        offset: 0.0,
        dimension,
    }
}

const FAHRENHEIT_SCALE: f64 = 5.0 / 9.0;

const UNITS: &[UnitDef] = &[
    // length
    unit("meter", &["m", "metre", "meters", "metres"], 1.0, Dimension::LENGTH),
    unit("kilometer", &["km", "kilometre", "kilometres"], 1e3, Dimension::LENGTH),
    unit("centimeter", &["cm", "centimetre", "centimetres"], 1e-2, Dimension::LENGTH),
    unit("millimeter", &["mm", "millimetre", "millimetres"], 1e-3, Dimension::LENGTH),
    unit("micrometer", &["um", "µm", "micron", "microns"], 1e-6, Dimension::LENGTH),
    unit("nanometer", &["nm", "nanometre"], 1e-9, Dimension::LENGTH),
    unit("mile", &["mi"], 1609.344, Dimension::LENGTH),
    unit("yard", &["yd"], 0.9144, Dimension::LENGTH),
    unit("foot", &["ft", "feet"], 0.3048, Dimension::LENGTH),
    unit("inch", &["in", "inches"], 0.0254, Dimension::LENGTH),
    unit("nautical_mile", &["nmi"], 1852.0, Dimension::LENGTH),
    unit("angstrom", &["Å"], 1e-10, Dimension::LENGTH),
    unit("light_year", &["ly", "lightyear"], 9_460_730_472_580_800.0, Dimension::LENGTH),
    unit("astronomical_unit", &["au"], 149_597_870_700.0, Dimension::LENGTH),
    // area
    unit("hectare", &["ha"], 1e4, Dimension::AREA),
    unit("acre", &[], 4046.856_422_4, Dimension::AREA),
    // volume
    unit("liter", &["l", "L", "litre", "litres"], 1e-3, Dimension::VOLUME),
    unit("milliliter", &["ml", "mL", "millilitre"], 1e-6, Dimension::VOLUME),
    unit("gallon", &["gal"], 3.785_411_784e-3, Dimension::VOLUME),
    unit("quart", &["qt"], 9.463_529_46e-4, Dimension::VOLUME),
    unit("pint", &["pt"], 4.731_764_73e-4, Dimension::VOLUME),
    unit("cup", &[], 2.365_882_365e-4, Dimension::VOLUME),
    unit("fluid_ounce", &["floz"], 2.957_352_956_25e-5, Dimension::VOLUME),
    unit("tablespoon", &["tbsp"], 1.478_676_478_125e-5, Dimension::VOLUME),
    unit("teaspoon", &["tsp"], 4.928_921_593_75e-6, Dimension::VOLUME),
    // mass
    unit("kilogram", &["kg"], 1.0, Dimension::MASS),
    unit("gram", &["g"], 1e-3, Dimension::MASS),
    unit("milligram", &["mg"], 1e-6, Dimension::MASS),
    unit("tonne", &["t", "metric_ton"], 1e3, Dimension::MASS),
    unit("pound", &["lb", "lbs"], 0.453_592_37, Dimension::MASS),
    unit("ounce", &["oz"], 0.028_349_523_125, Dimension::MASS),
    unit("stone", &["st"], 6.350_293_18, Dimension::MASS),
    // time
    unit("second", &["s", "sec", "secs"], 1.0, Dimension::TIME),
    unit("millisecond", &["ms"], 1e-3, Dimension::TIME),
    unit("microsecond", &["us", "µs"], 1e-6, Dimension::TIME),
    unit("nanosecond", &["ns"], 1e-9, Dimension::TIME),
    unit("minute", &["min"], 60.0, Dimension::TIME),
    unit("hour", &["h", "hr"], 3600.0, Dimension::TIME),
    unit("day", &["d"], 86_400.0, Dimension::TIME),
    unit("week", &["wk"], 604_800.0, Dimension::TIME),
    unit("year", &["yr"], 31_557_600.0, Dimension::TIME),
    unit("month", &[], 2_629_800.0, Dimension::TIME),
    // temperature
    unit("kelvin", &["K"], 1.0, Dimension::TEMPERATURE),
    UnitDef {
        name: "degree_Celsius",
        aliases: &["°C", "degC", "celsius", "C"],
        factor: 1.0,
        offset: 273.15,
        dimension: Dimension::TEMPERATURE,
    },
    UnitDef {
        name: "degree_Fahrenheit",
        aliases: &["°F", "degF", "fahrenheit", "F"],
        factor: FAHRENHEIT_SCALE,
        offset: 273.15 - 32.0 * FAHRENHEIT_SCALE,
        dimension: Dimension::TEMPERATURE,
    },
    unit("degree_Rankine", &["°R", "degR", "rankine"], FAHRENHEIT_SCALE, Dimension::TEMPERATURE),
    // speed
    unit("mile_per_hour", &["mph"], 0.447_04, Dimension::SPEED),
    unit("kilometer_per_hour", &["kph", "kmh"], 1e3 / 3600.0, Dimension::SPEED),
    unit("knot", &["kn", "kt", "knots"], 1852.0 / 3600.0, Dimension::SPEED),
    // frequency
    unit("hertz", &["Hz"], 1.0, Dimension::FREQUENCY),
    unit("kilohertz", &["kHz"], 1e3, Dimension::FREQUENCY),
    unit("megahertz", &["MHz"], 1e6, Dimension::FREQUENCY),
    unit("gigahertz", &["GHz"], 1e9, Dimension::FREQUENCY),
    // energy
    unit("joule", &["J"], 1.0, Dimension::ENERGY),
    unit("kilojoule", &["kJ"], 1e3, Dimension::ENERGY),
    unit("calorie", &["cal"], 4.184, Dimension::ENERGY),
    unit("kilocalorie", &["kcal"], 4184.0, Dimension::ENERGY),
    unit("watt_hour", &["Wh"], 3600.0, Dimension::ENERGY),
    unit("kilowatt_hour", &["kWh"], 3.6e6, Dimension::ENERGY),
    unit("electron_volt", &["eV"], 1.602_176_634e-19, Dimension::ENERGY),
    unit("british_thermal_unit", &["BTU", "Btu"], 1055.055_852_62, Dimension::ENERGY),
    // power
    unit("watt", &["W"], 1.0, Dimension::POWER),
    unit("kilowatt", &["kW"], 1e3, Dimension::POWER),
    unit("megawatt", &["MW"], 1e6, Dimension::POWER),
    unit("horsepower", &["hp"], 745.699_871_582_270_2, Dimension::POWER),
    // pressure
    unit("pascal", &["Pa"], 1.0, Dimension::PRESSURE),
    unit("kilopascal", &["kPa"], 1e3, Dimension::PRESSURE),
    unit("bar", &[], 1e5, Dimension::PRESSURE),
    unit("millibar", &["mbar"], 1e2, Dimension::PRESSURE),
    unit("atmosphere", &["atm"], 101_325.0, Dimension::PRESSURE),
    unit("psi", &[], 6894.757_293_168_361, Dimension::PRESSURE),
    unit("torr", &[], 101_325.0 / 760.0, Dimension::PRESSURE),
    unit("millimeter_Hg", &["mmHg"], 133.322_387_415, Dimension::PRESSURE),
    // information
    unit("bit", &["bits"], 1.0, Dimension::INFORMATION),
    unit("byte", &["B"], 8.0, Dimension::INFORMATION),
    unit("kilobit", &["kb", "kbit"], 1e3, Dimension::INFORMATION),
    unit("megabit", &["Mb", "Mbit"], 1e6, Dimension::INFORMATION),
    unit("gigabit", &["Gb", "Gbit"], 1e9, Dimension::INFORMATION),
    unit("kilobyte", &["kB", "KB"], 8e3, Dimension::INFORMATION),
    unit("megabyte", &["MB"], 8e6, Dimension::INFORMATION),
    unit("gigabyte", &["GB"], 8e9, Dimension::INFORMATION),
    unit("terabyte", &["TB"], 8e12, Dimension::INFORMATION),
    unit("kibibyte", &["KiB"], 8.0 * 1024.0, Dimension::INFORMATION),
    unit("mebibyte", &["MiB"], 8.0 * 1_048_576.0, Dimension::INFORMATION),
    unit("gibibyte", &["GiB"], 8.0 * 1_073_741_824.0, Dimension::INFORMATION),
    // angle
    unit("radian", &["rad"], 1.0, Dimension::NONE),
    unit("degree", &["deg", "°"], PI / 180.0, Dimension::NONE),
    unit("arcminute", &["arcmin"], PI / 10_800.0, Dimension::NONE),
    unit("arcsecond", &["arcsec"], PI / 648_000.0, Dimension::NONE),
    unit("turn", &["revolution", "rev"], 2.0 * PI, Dimension::NONE),
    unit("gradian", &["grad", "gon"], PI / 200.0, Dimension::NONE),
];

/// A resolved, possibly compound, unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    name: String,
    factor: f64,
    offset: f64,
    dimension: Dimension,
}

impl Unit {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    fn to_base(&self, value: f64) -> f64 {
        value * self.factor + self.offset
    }

    fn from_base(&self, value: f64) -> f64 {
        (value - self.offset) / self.factor
    }
}

/// Table-driven [`UnitConverter`].
pub struct UnitRegistry {
    exact: HashMap<&'static str, usize>,
    folded: HashMap<String, Vec<usize>>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitRegistry {
    pub fn new() -> Self {
        let mut exact = HashMap::new();
        let mut folded: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, def) in UNITS.iter().enumerate() {
            for alias in std::iter::once(&def.name).chain(def.aliases) {
                exact.insert(*alias, index);
                let entry = folded.entry(alias.to_lowercase()).or_default();
                if !entry.contains(&index) {
                    entry.push(index);
                }
            }
        }
        Self { exact, folded }
    }

    /// Resolves `a`, `a/b` or `a/b/c`.
    pub fn resolve(&self, token: &str) -> ConversionResult<Unit> {
        let mut parts = token.split('/');
        let mut unit = self.simple(parts.next().unwrap_or_default(), token)?;
        for part in parts {
            let divisor = self.simple(part, token)?;
            for operand in [&unit, &divisor] {
                if operand.offset != 0.0 {
                    return Err(ConversionError::OffsetUnit {
                        unit: operand.name.clone(),
                    });
                }
            }
            unit = Unit {
                name: format!("{} / {}", unit.name, divisor.name),
                factor: unit.factor / divisor.factor,
                offset: 0.0,
                dimension: unit.dimension.divide(divisor.dimension),
            };
        }
        Ok(unit)
    }

    fn simple(&self, part: &str, token: &str) -> ConversionResult<Unit> {
        let undefined = || ConversionError::UndefinedUnit {
            unit: token.to_string(),
        };
        if part.is_empty() {
            return Err(undefined());
        }

        let index = self
            .lookup(part)
            .or_else(|| {
                ["es", "s"]
                    .iter()
                    .filter_map(|suffix| part.strip_suffix(suffix))
                    .filter(|stem| !stem.is_empty())
                    .find_map(|stem| self.lookup(stem))
            })
            .ok_or_else(undefined)?;

        let def = UNITS.get(index).ok_or_else(undefined)?;
        Ok(Unit {
            name: def.name.to_string(),
            factor: def.factor,
            offset: def.offset,
            dimension: def.dimension,
        })
    }

    // Exact alias first, then a case-insensitive alias naming exactly one unit.
    fn lookup(&self, alias: &str) -> Option<usize> {
        if let Some(index) = self.exact.get(alias) {
            return Some(*index);
        }
        match self.folded.get(&alias.to_lowercase())?.as_slice() {
            [index] => Some(*index),
            _ => None,
        }
    }
}

impl UnitConverter for UnitRegistry {
    fn convert(&self, query: &ConversionQuery) -> ConversionResult<Conversion> {
        let from = self.resolve(query.from_unit())?;
        let to = self.resolve(query.to_unit())?;
        if from.dimension != to.dimension {
            return Err(ConversionError::Dimensionality {
                from: from.name,
                from_dimension: from.dimension.to_string(),
                to: to.name,
                to_dimension: to.dimension.to_string(),
            });
        }

        let value = to.from_base(from.to_base(query.value()));
        Ok(Conversion {
            original: format!("{} {}", format_float(query.value()), from.name),
            converted: format!("{} {}", format_float(value), to.name),
            value,
        })
    }
}
