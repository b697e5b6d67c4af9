//! Physical lengths and the units they are expressed in.
//!
//! Every position a track draws starts life as a [`Length`]. Arithmetic and
//! comparisons between lengths in different units convert the right-hand
//! operand into the left-hand operand's unit first, so `1 m + 50 cm` is
//! `1.5 m` while `50 cm + 1 m` is `150 cm`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Typographic points per inch; the layout engine treats one point as one pixel.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Length units understood by the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Unit {
    #[serde(rename = "mm")]
    Millimeter,
    #[serde(rename = "cm")]
    Centimeter,
    #[serde(rename = "m")]
    Meter,
    #[serde(rename = "km")]
    Kilometer,
    #[serde(rename = "in")]
    Inch,
    #[serde(rename = "ft")]
    Foot,
    #[serde(rename = "yd")]
    Yard,
}

impl Unit {
    /// All units, smallest first.
    pub const ALL: [Unit; 7] = [
        Unit::Millimeter,
        Unit::Centimeter,
        Unit::Inch,
        Unit::Foot,
        Unit::Yard,
        Unit::Meter,
        Unit::Kilometer,
    ];

    /// Multiplicative factor converting one of this unit into meters.
    pub fn meters(self) -> f64 {
        match self {
            Unit::Millimeter => 0.001,
            Unit::Centimeter => 0.01,
            Unit::Meter => 1.0,
            Unit::Kilometer => 1000.0,
            Unit::Inch => 0.0254,
            Unit::Foot => 0.3048,
            Unit::Yard => 0.9144,
        }
    }

    /// Short abbreviation used in labels and parameters.
    pub fn abbreviation(self) -> &'static str {
        match self {
            Unit::Millimeter => "mm",
            Unit::Centimeter => "cm",
            Unit::Meter => "m",
            Unit::Kilometer => "km",
            Unit::Inch => "in",
            Unit::Foot => "ft",
            Unit::Yard => "yd",
        }
    }

    /// Parses an abbreviation or a spelled-out unit name (case-insensitive).
    pub fn from_abbreviation(text: &str) -> Option<Unit> {
        match text.trim().to_lowercase().as_str() {
            "mm" | "millimeter" | "millimeters" | "millimetre" | "millimetres" => {
                Some(Unit::Millimeter)
            }
            "cm" | "centimeter" | "centimeters" | "centimetre" | "centimetres" => {
                Some(Unit::Centimeter)
            }
            "m" | "meter" | "meters" | "metre" | "metres" => Some(Unit::Meter),
            "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => {
                Some(Unit::Kilometer)
            }
            "in" | "inch" | "inches" | "\"" => Some(Unit::Inch),
            "ft" | "foot" | "feet" | "'" => Some(Unit::Foot),
            "yd" | "yard" | "yards" => Some(Unit::Yard),
            _ => None,
        }
    }

    /// Converts `value` expressed in this unit into `target`.
    pub fn convert(self, value: f64, target: Unit) -> f64 {
        if self == target {
            value
        } else {
            value * self.meters() / target.meters()
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

impl FromStr for Unit {
    type Err = LengthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::from_abbreviation(s).ok_or_else(|| LengthParseError::UnknownUnit(s.to_string()))
    }
}

/// Errors produced while parsing a [`Length`] or [`Unit`] from text.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LengthParseError {
    #[error("empty length")]
    Empty,

    #[error("invalid magnitude '{0}'")]
    InvalidMagnitude(String),

    #[error("unknown unit '{0}'")]
    UnknownUnit(String),
}

/// An immutable physical length.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct Length {
    pub value: f64,
    pub unit: Unit,
}

impl Length {
    pub const fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub const fn meters(value: f64) -> Self {
        Self::new(value, Unit::Meter)
    }

    pub const fn zero(unit: Unit) -> Self {
        Self::new(0.0, unit)
    }

    /// Converts this length into `unit`.
    pub fn to(self, unit: Unit) -> Length {
        Length::new(self.unit.convert(self.value, unit), unit)
    }

    /// Magnitude of this length once converted into `unit`.
    pub fn value_in(self, unit: Unit) -> f64 {
        self.unit.convert(self.value, unit)
    }

    /// Typographic points (1/72 inch).
    pub fn to_points(self) -> f64 {
        self.value_in(Unit::Inch) * POINTS_PER_INCH
    }

    pub fn abs(self) -> Length {
        Length::new(self.value.abs(), self.unit)
    }

    pub fn min(self, other: Length) -> Length {
        if other < self { other.to(self.unit) } else { self }
    }

    pub fn max(self, other: Length) -> Length {
        if other > self { other.to(self.unit) } else { self }
    }

    /// Parses strings such as `"2.5 m"`, `"10in"` or `"-3 ft"`.
    ///
    /// A bare number is interpreted in `default_unit`.
    pub fn parse_with_default(text: &str, default_unit: Unit) -> Result<Length, LengthParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LengthParseError::Empty);
        }

        let split = text
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        let (number, unit) = text.split_at(split);

        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| LengthParseError::InvalidMagnitude(number.trim().to_string()))?;
        let unit = if unit.trim().is_empty() {
            default_unit
        } else {
            unit.parse()?
        };
        Ok(Length::new(value, unit))
    }

    /// Parses a length that must carry an explicit unit.
    pub fn parse(text: &str) -> Result<Length, LengthParseError> {
        let length = Self::parse_with_default(text, Unit::Meter)?;
        if !contains_unit_token(text) {
            return Err(LengthParseError::UnknownUnit(text.trim().to_string()));
        }
        Ok(length)
    }
}

/// Whether `text` contains something that reads as a unit after the number.
pub fn contains_unit_token(text: &str) -> bool {
    let trimmed = text.trim();
    let tail = trimmed.trim_start_matches(|c: char| {
        c.is_ascii_digit() || matches!(c, '.' | '-' | '+') || c.is_whitespace()
    });
    !tail.is_empty() && Unit::from_abbreviation(tail).is_some()
}

impl PartialEq for Length {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value_in(self.unit)
    }
}

impl PartialOrd for Length {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value_in(self.unit))
    }
}

impl Add for Length {
    type Output = Length;

    fn add(self, rhs: Length) -> Length {
        Length::new(self.value + rhs.value_in(self.unit), self.unit)
    }
}

impl Sub for Length {
    type Output = Length;

    fn sub(self, rhs: Length) -> Length {
        Length::new(self.value - rhs.value_in(self.unit), self.unit)
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

impl FromStr for Length {
    type Err = LengthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Length::parse(s)
    }
}

/// Serde adapter reading a [`Length`] from `"1.5 m"`, a bare number of
/// meters, or the `{ value, unit }` table form.
pub mod text {
    use super::{Length, Unit};
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(f64),
        Table { value: f64, unit: Unit },
    }

    pub fn serialize<S: Serializer>(length: &Length, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(length)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Length, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => {
                Length::parse_with_default(&text, Unit::Meter).map_err(serde::de::Error::custom)
            }
            Repr::Number(value) => Ok(Length::meters(value)),
            Repr::Table { value, unit } => Ok(Length::new(value, unit)),
        }
    }
}
