//! Measurement module - scalar quantities tagged with a linear unit
//!
//! A [`Measurement`] is a magnitude plus a unit. Every unit knows its
//! coefficient to the base unit of its dimension, so conversion is a single
//! multiplication or division. Arithmetic and comparisons always happen in
//! the base unit.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// A unit of some dimension (duration, data size, ...) with a linear
/// conversion to that dimension's base unit
pub trait MeasurementUnit: Copy + fmt::Debug + PartialEq + 'static {
    /// The base unit of this dimension (coefficient 1)
    const BASE: Self;

    /// How many base units one of this unit is worth
    fn coefficient(&self) -> f64;

    /// Short symbol, e.g. `"d"` or `"GiB"`
    fn symbol(&self) -> &'static str;

    /// Singular name, e.g. `"day"`
    fn singular_name(&self) -> &'static str;

    /// Plural name, e.g. `"days"`
    fn plural_name(&self) -> &'static str;

    /// Every unit that [`Measurement::from_str`] recognizes
    fn all() -> &'static [Self];

    /// Convert a magnitude in this unit into the base unit
    fn convert_to_base(&self, value: f64) -> f64 {
        value * self.coefficient()
    }

    /// Convert a magnitude in the base unit into this unit
    fn convert_from_base(&self, value: f64) -> f64 {
        value / self.coefficient()
    }
}

/// A magnitude in some unit
#[derive(Debug, Clone, Copy)]
pub struct Measurement<U: MeasurementUnit> {
    /// The magnitude, expressed in `unit`
    pub value: f64,
    /// The unit `value` is expressed in
    pub unit: U,
}

impl<U: MeasurementUnit> Measurement<U> {
    /// Zero, in the base unit
    pub const ZERO: Self = Self::new(0.0, U::BASE);

    /// Positive infinity, in the base unit
    pub const INFINITE: Self = Self::new(f64::INFINITY, U::BASE);

    /// Create a measurement
    pub const fn new(value: f64, unit: U) -> Self {
        Self { value, unit }
    }

    /// Zero, in the base unit
    pub fn zero() -> Self {
        Self::ZERO
    }

    /// Positive infinity, in the base unit. Nothing finite exceeds it.
    pub fn infinite() -> Self {
        Self::INFINITE
    }

    /// The magnitude converted to the base unit
    pub fn base_value(&self) -> f64 {
        self.unit.convert_to_base(self.value)
    }

    /// This same quantity, expressed in another unit
    ///
    /// # Examples
    ///
    /// ```
    /// use janitor_domain::{Age, DurationUnit};
    ///
    /// let week = Age::days(7.0).converted(DurationUnit::Week);
    /// assert_eq!(week.value, 1.0);
    /// ```
    pub fn converted(&self, unit: U) -> Self {
        Self::new(unit.convert_from_base(self.base_value()), unit)
    }

    /// Whether this measurement is unbounded
    pub fn is_infinite(&self) -> bool {
        self.value.is_infinite() && self.value.is_sign_positive()
    }
}

impl<U: MeasurementUnit> Default for Measurement<U> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<U: MeasurementUnit> PartialEq for Measurement<U> {
    fn eq(&self, other: &Self) -> bool {
        self.base_value() == other.base_value()
    }
}

impl<U: MeasurementUnit> PartialOrd for Measurement<U> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.base_value().partial_cmp(&other.base_value())
    }
}

impl<U: MeasurementUnit> Add for Measurement<U> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.base_value() + rhs.base_value(), U::BASE)
    }
}

impl<U: MeasurementUnit> AddAssign for Measurement<U> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<U: MeasurementUnit> Sub for Measurement<U> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.base_value() - rhs.base_value(), U::BASE)
    }
}

impl<U: MeasurementUnit> SubAssign for Measurement<U> {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<U: MeasurementUnit> Sum for Measurement<U> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, m| acc + m)
    }
}

impl<'a, U: MeasurementUnit> Sum<&'a Measurement<U>> for Measurement<U> {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, m| acc + *m)
    }
}

impl<U: MeasurementUnit> fmt::Display for Measurement<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            return write!(f, "unlimited");
        }
        let name = if self.value == 1.0 {
            self.unit.singular_name()
        } else {
            self.unit.plural_name()
        };
        write!(f, "{} {}", self.value, name)
    }
}

/// Error returned when a measurement string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseMeasurementError {
    /// The input was empty
    Empty,
    /// The numeric part could not be read
    InvalidNumber(String),
    /// The unit part did not name a known unit
    UnknownUnit(String),
    /// Negative quantities make no sense as limits
    Negative(String),
}

impl fmt::Display for ParseMeasurementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMeasurementError::Empty => write!(f, "empty measurement"),
            ParseMeasurementError::InvalidNumber(s) => write!(f, "invalid number: {}", s),
            ParseMeasurementError::UnknownUnit(s) => write!(f, "unknown unit: {}", s),
            ParseMeasurementError::Negative(s) => write!(f, "negative measurement: {}", s),
        }
    }
}

impl std::error::Error for ParseMeasurementError {}

impl<U: MeasurementUnit> FromStr for Measurement<U> {
    type Err = ParseMeasurementError;

    /// Parse `"<number><optional space><unit>"`, e.g. `"30d"`, `"1.5 GiB"`.
    ///
    /// A bare number is read in the base unit. `"inf"`, `"infinity"` and
    /// `"unlimited"` parse to [`Measurement::infinite`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseMeasurementError::Empty);
        }
        if matches!(
            s.to_lowercase().as_str(),
            "inf" | "infinity" | "unlimited" | "∞"
        ) {
            return Ok(Self::infinite());
        }

        let split = s
            .char_indices()
            .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || *c == '_' || (*i == 0 && (*c == '-' || *c == '+'))))
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        let number: String = number.chars().filter(|c| *c != '_').collect();
        let value: f64 = number
            .parse()
            .map_err(|_| ParseMeasurementError::InvalidNumber(s.to_string()))?;
        if value < 0.0 {
            return Err(ParseMeasurementError::Negative(s.to_string()));
        }

        let unit = unit.trim();
        if unit.is_empty() {
            return Ok(Self::new(value, U::BASE));
        }
        // Symbols are case-sensitive ("Mb" is not "MB"); names are not
        let found = U::all()
            .iter()
            .find(|u| u.symbol() == unit)
            .or_else(|| {
                U::all().iter().find(|u| {
                    u.singular_name().eq_ignore_ascii_case(unit)
                        || u.plural_name().eq_ignore_ascii_case(unit)
                })
            })
            .ok_or_else(|| ParseMeasurementError::UnknownUnit(unit.to_string()))?;

        Ok(Self::new(value, *found))
    }
}
