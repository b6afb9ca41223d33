//! Age module - how long ago something happened

use crate::measurement::{Measurement, MeasurementUnit};
use std::time::{Duration, SystemTime};

/// Seconds in a mean tropical year (365.242190402 days)
const SECONDS_PER_YEAR: f64 = 86_400.0 * 365.242_190_402;

/// Units of duration. The base unit is the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationUnit {
    /// 10⁻¹² seconds
    Picosecond,
    /// 10⁻⁹ seconds
    Nanosecond,
    /// 10⁻⁶ seconds
    Microsecond,
    /// 10⁻³ seconds
    Millisecond,
    /// The base unit
    Second,
    /// 60 seconds
    Minute,
    /// 60 minutes
    Hour,
    /// 24 hours
    Day,
    /// 7 days
    Week,
    /// A mean tropical year
    Year,
}

impl DurationUnit {
    /// Units worth offering when describing how old a file may get
    pub const COMMON_FILE_AGE_UNITS: [DurationUnit; 5] = [
        DurationUnit::Year,
        DurationUnit::Week,
        DurationUnit::Day,
        DurationUnit::Hour,
        DurationUnit::Minute,
    ];
}

impl MeasurementUnit for DurationUnit {
    const BASE: Self = DurationUnit::Second;

    fn coefficient(&self) -> f64 {
        match self {
            DurationUnit::Picosecond => 1e-12,
            DurationUnit::Nanosecond => 1e-9,
            DurationUnit::Microsecond => 1e-6,
            DurationUnit::Millisecond => 1e-3,
            DurationUnit::Second => 1.0,
            DurationUnit::Minute => 60.0,
            DurationUnit::Hour => 3_600.0,
            DurationUnit::Day => 86_400.0,
            DurationUnit::Week => 604_800.0,
            DurationUnit::Year => SECONDS_PER_YEAR,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            DurationUnit::Picosecond => "ps",
            DurationUnit::Nanosecond => "ns",
            DurationUnit::Microsecond => "μs",
            DurationUnit::Millisecond => "ms",
            DurationUnit::Second => "s",
            DurationUnit::Minute => "m",
            DurationUnit::Hour => "h",
            DurationUnit::Day => "d",
            DurationUnit::Week => "w",
            DurationUnit::Year => "y",
        }
    }

    fn singular_name(&self) -> &'static str {
        match self {
            DurationUnit::Picosecond => "picosecond",
            DurationUnit::Nanosecond => "nanosecond",
            DurationUnit::Microsecond => "microsecond",
            DurationUnit::Millisecond => "millisecond",
            DurationUnit::Second => "second",
            DurationUnit::Minute => "minute",
            DurationUnit::Hour => "hour",
            DurationUnit::Day => "day",
            DurationUnit::Week => "week",
            DurationUnit::Year => "year",
        }
    }

    fn plural_name(&self) -> &'static str {
        match self {
            DurationUnit::Picosecond => "picoseconds",
            DurationUnit::Nanosecond => "nanoseconds",
            DurationUnit::Microsecond => "microseconds",
            DurationUnit::Millisecond => "milliseconds",
            DurationUnit::Second => "seconds",
            DurationUnit::Minute => "minutes",
            DurationUnit::Hour => "hours",
            DurationUnit::Day => "days",
            DurationUnit::Week => "weeks",
            DurationUnit::Year => "years",
        }
    }

    fn all() -> &'static [Self] {
        &[
            DurationUnit::Picosecond,
            DurationUnit::Nanosecond,
            DurationUnit::Microsecond,
            DurationUnit::Millisecond,
            DurationUnit::Second,
            DurationUnit::Minute,
            DurationUnit::Hour,
            DurationUnit::Day,
            DurationUnit::Week,
            DurationUnit::Year,
        ]
    }
}

/// The age of something: seconds, hours, years, ...
pub type Age = Measurement<DurationUnit>;

impl Age {
    /// An age in seconds
    pub fn seconds(value: f64) -> Self {
        Self::new(value, DurationUnit::Second)
    }

    /// An age in minutes
    pub fn minutes(value: f64) -> Self {
        Self::new(value, DurationUnit::Minute)
    }

    /// An age in hours
    pub fn hours(value: f64) -> Self {
        Self::new(value, DurationUnit::Hour)
    }

    /// An age in days
    pub fn days(value: f64) -> Self {
        Self::new(value, DurationUnit::Day)
    }

    /// An age in weeks
    pub fn weeks(value: f64) -> Self {
        Self::new(value, DurationUnit::Week)
    }

    /// An age in mean tropical years
    pub fn years(value: f64) -> Self {
        Self::new(value, DurationUnit::Year)
    }

    /// Time elapsed from `reference` until `now`
    ///
    /// A reference instant in the future yields an age of zero rather than
    /// a negative age.
    pub fn between(reference: SystemTime, now: SystemTime) -> Self {
        Self::from(now.duration_since(reference).unwrap_or(Duration::ZERO))
    }

    /// Convert to a [`Duration`], saturating at zero and [`Duration::MAX`]
    pub fn to_duration(&self) -> Duration {
        let seconds = self.base_value();
        if seconds.is_nan() || seconds <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }
}

impl From<Duration> for Age {
    fn from(duration: Duration) -> Self {
        Self::seconds(duration.as_secs_f64())
    }
}
