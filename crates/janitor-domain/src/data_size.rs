//! Data size module - how much storage something takes

use crate::measurement::{Measurement, MeasurementUnit};

/// Units of data size. The base unit is the byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataUnit {
    /// 1/8 byte
    Bit,
    /// 1/2 byte
    Nibble,
    /// The base unit
    Byte,
    /// 10³ bytes
    Kilobyte,
    /// 10⁶ bytes
    Megabyte,
    /// 10⁹ bytes
    Gigabyte,
    /// 10¹² bytes
    Terabyte,
    /// 10¹⁵ bytes
    Petabyte,
    /// 10¹⁸ bytes
    Exabyte,
    /// 10²¹ bytes
    Zettabyte,
    /// 10²⁴ bytes
    Yottabyte,
    /// 2¹⁰ bytes
    Kibibyte,
    /// 2²⁰ bytes
    Mebibyte,
    /// 2³⁰ bytes
    Gibibyte,
    /// 2⁴⁰ bytes
    Tebibyte,
    /// 2⁵⁰ bytes
    Pebibyte,
    /// 2⁶⁰ bytes
    Exbibyte,
    /// 2⁷⁰ bytes
    Zebibyte,
    /// 2⁸⁰ bytes
    Yobibyte,
    /// 10³ bits
    Kilobit,
    /// 10⁶ bits
    Megabit,
    /// 10⁹ bits
    Gigabit,
    /// 10¹² bits
    Terabit,
}

impl MeasurementUnit for DataUnit {
    const BASE: Self = DataUnit::Byte;

    fn coefficient(&self) -> f64 {
        const KILO: f64 = 1_000.0;
        const KIBI: f64 = 1_024.0;
        match self {
            DataUnit::Bit => 0.125,
            DataUnit::Nibble => 0.5,
            DataUnit::Byte => 1.0,
            DataUnit::Kilobyte => KILO,
            DataUnit::Megabyte => KILO.powi(2),
            DataUnit::Gigabyte => KILO.powi(3),
            DataUnit::Terabyte => KILO.powi(4),
            DataUnit::Petabyte => KILO.powi(5),
            DataUnit::Exabyte => KILO.powi(6),
            DataUnit::Zettabyte => KILO.powi(7),
            DataUnit::Yottabyte => KILO.powi(8),
            DataUnit::Kibibyte => KIBI,
            DataUnit::Mebibyte => KIBI.powi(2),
            DataUnit::Gibibyte => KIBI.powi(3),
            DataUnit::Tebibyte => KIBI.powi(4),
            DataUnit::Pebibyte => KIBI.powi(5),
            DataUnit::Exbibyte => KIBI.powi(6),
            DataUnit::Zebibyte => KIBI.powi(7),
            DataUnit::Yobibyte => KIBI.powi(8),
            DataUnit::Kilobit => KILO / 8.0,
            DataUnit::Megabit => KILO.powi(2) / 8.0,
            DataUnit::Gigabit => KILO.powi(3) / 8.0,
            DataUnit::Terabit => KILO.powi(4) / 8.0,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            DataUnit::Bit => "b",
            DataUnit::Nibble => "nibble",
            DataUnit::Byte => "B",
            DataUnit::Kilobyte => "KB",
            DataUnit::Megabyte => "MB",
            DataUnit::Gigabyte => "GB",
            DataUnit::Terabyte => "TB",
            DataUnit::Petabyte => "PB",
            DataUnit::Exabyte => "EB",
            DataUnit::Zettabyte => "ZB",
            DataUnit::Yottabyte => "YB",
            DataUnit::Kibibyte => "KiB",
            DataUnit::Mebibyte => "MiB",
            DataUnit::Gibibyte => "GiB",
            DataUnit::Tebibyte => "TiB",
            DataUnit::Pebibyte => "PiB",
            DataUnit::Exbibyte => "EiB",
            DataUnit::Zebibyte => "ZiB",
            DataUnit::Yobibyte => "YiB",
            DataUnit::Kilobit => "Kb",
            DataUnit::Megabit => "Mb",
            DataUnit::Gigabit => "Gb",
            DataUnit::Terabit => "Tb",
        }
    }

    fn singular_name(&self) -> &'static str {
        match self {
            DataUnit::Bit => "bit",
            DataUnit::Nibble => "nibble",
            DataUnit::Byte => "byte",
            DataUnit::Kilobyte => "kilobyte",
            DataUnit::Megabyte => "megabyte",
            DataUnit::Gigabyte => "gigabyte",
            DataUnit::Terabyte => "terabyte",
            DataUnit::Petabyte => "petabyte",
            DataUnit::Exabyte => "exabyte",
            DataUnit::Zettabyte => "zettabyte",
            DataUnit::Yottabyte => "yottabyte",
            DataUnit::Kibibyte => "kibibyte",
            DataUnit::Mebibyte => "mebibyte",
            DataUnit::Gibibyte => "gibibyte",
            DataUnit::Tebibyte => "tebibyte",
            DataUnit::Pebibyte => "pebibyte",
            DataUnit::Exbibyte => "exbibyte",
            DataUnit::Zebibyte => "zebibyte",
            DataUnit::Yobibyte => "yobibyte",
            DataUnit::Kilobit => "kilobit",
            DataUnit::Megabit => "megabit",
            DataUnit::Gigabit => "gigabit",
            DataUnit::Terabit => "terabit",
        }
    }

    fn plural_name(&self) -> &'static str {
        match self {
            DataUnit::Bit => "bits",
            DataUnit::Nibble => "nibbles",
            DataUnit::Byte => "bytes",
            DataUnit::Kilobyte => "kilobytes",
            DataUnit::Megabyte => "megabytes",
            DataUnit::Gigabyte => "gigabytes",
            DataUnit::Terabyte => "terabytes",
            DataUnit::Petabyte => "petabytes",
            DataUnit::Exabyte => "exabytes",
            DataUnit::Zettabyte => "zettabytes",
            DataUnit::Yottabyte => "yottabytes",
            DataUnit::Kibibyte => "kibibytes",
            DataUnit::Mebibyte => "mebibytes",
            DataUnit::Gibibyte => "gibibytes",
            DataUnit::Tebibyte => "tebibytes",
            DataUnit::Pebibyte => "pebibytes",
            DataUnit::Exbibyte => "exbibytes",
            DataUnit::Zebibyte => "zebibytes",
            DataUnit::Yobibyte => "yobibytes",
            DataUnit::Kilobit => "kilobits",
            DataUnit::Megabit => "megabits",
            DataUnit::Gigabit => "gigabits",
            DataUnit::Terabit => "terabits",
        }
    }

    fn all() -> &'static [Self] {
        &[
            DataUnit::Bit,
            DataUnit::Nibble,
            DataUnit::Byte,
            DataUnit::Kilobyte,
            DataUnit::Megabyte,
            DataUnit::Gigabyte,
            DataUnit::Terabyte,
            DataUnit::Petabyte,
            DataUnit::Exabyte,
            DataUnit::Zettabyte,
            DataUnit::Yottabyte,
            DataUnit::Kibibyte,
            DataUnit::Mebibyte,
            DataUnit::Gibibyte,
            DataUnit::Tebibyte,
            DataUnit::Pebibyte,
            DataUnit::Exbibyte,
            DataUnit::Zebibyte,
            DataUnit::Yobibyte,
            DataUnit::Kilobit,
            DataUnit::Megabit,
            DataUnit::Gigabit,
            DataUnit::Terabit,
        ]
    }
}

/// The size of some data: bytes, gigabytes, mebibytes, ...
pub type DataSize = Measurement<DataUnit>;

impl DataSize {
    /// An exact byte count, as reported by file metadata
    pub fn from_bytes(bytes: u64) -> Self {
        Self::new(bytes as f64, DataUnit::Byte)
    }

    /// A size in bytes
    pub fn bytes(value: f64) -> Self {
        Self::new(value, DataUnit::Byte)
    }

    /// A size in kilobytes (10³)
    pub fn kilobytes(value: f64) -> Self {
        Self::new(value, DataUnit::Kilobyte)
    }

    /// A size in megabytes (10⁶)
    pub fn megabytes(value: f64) -> Self {
        Self::new(value, DataUnit::Megabyte)
    }

    /// A size in gigabytes (10⁹)
    pub fn gigabytes(value: f64) -> Self {
        Self::new(value, DataUnit::Gigabyte)
    }

    /// A size in kibibytes (2¹⁰)
    pub fn kibibytes(value: f64) -> Self {
        Self::new(value, DataUnit::Kibibyte)
    }

    /// A size in mebibytes (2²⁰)
    pub fn mebibytes(value: f64) -> Self {
        Self::new(value, DataUnit::Mebibyte)
    }

    /// A size in gibibytes (2³⁰)
    pub fn gibibytes(value: f64) -> Self {
        Self::new(value, DataUnit::Gibibyte)
    }

    /// A size in tebibytes (2⁴⁰)
    pub fn tebibytes(value: f64) -> Self {
        Self::new(value, DataUnit::Tebibyte)
    }

    /// The size in bytes
    pub fn as_bytes(&self) -> f64 {
        self.base_value()
    }

    /// A human-friendly rendering using the largest binary unit that keeps
    /// the magnitude at or above one, e.g. `"1.5 GiB"`
    pub fn humanized(&self) -> String {
        if self.is_infinite() {
            return "unlimited".to_string();
        }
        let bytes = self.as_bytes();
        let unit = [
            DataUnit::Tebibyte,
            DataUnit::Gibibyte,
            DataUnit::Mebibyte,
            DataUnit::Kibibyte,
        ]
        .into_iter()
        .find(|u| bytes.abs() >= u.coefficient())
        .unwrap_or(DataUnit::Byte);
        let value = unit.convert_from_base(bytes);
        if unit == DataUnit::Byte {
            format!("{} {}", value, unit.symbol())
        } else {
            format!("{:.1} {}", value, unit.symbol())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_and_decimal_units() {
        assert_eq!(DataSize::kibibytes(1.0).as_bytes(), 1024.0);
        assert_eq!(DataSize::kilobytes(1.0).as_bytes(), 1000.0);
        assert_eq!(DataSize::gibibytes(1.0).converted(DataUnit::Mebibyte).value, 1024.0);
        assert!(DataSize::gibibytes(1.0) > DataSize::gigabytes(1.0));
    }

    #[test]
    fn test_bits() {
        assert_eq!(DataSize::new(16.0, DataUnit::Bit), DataSize::bytes(2.0));
        assert_eq!(DataSize::new(1.0, DataUnit::Kilobit).as_bytes(), 125.0);
    }

    #[test]
    fn test_arithmetic_in_base_unit() {
        let total = DataSize::gigabytes(1.0) + DataSize::megabytes(500.0);
        assert_eq!(total.unit, DataUnit::Byte);
        assert_eq!(total, DataSize::gigabytes(1.5));

        let sizes = [DataSize::from_bytes(10), DataSize::from_bytes(20)];
        let sum: DataSize = sizes.iter().sum();
        assert_eq!(sum, DataSize::from_bytes(30));
        assert_eq!(sum - DataSize::from_bytes(5), DataSize::from_bytes(25));
    }

    #[test]
    fn test_parse_case_sensitive_symbols() {
        assert_eq!("1GiB".parse::<DataSize>().unwrap(), DataSize::gibibytes(1.0));
        assert_eq!("1.5 GB".parse::<DataSize>().unwrap(), DataSize::gigabytes(1.5));
        assert_eq!("8 Mb".parse::<DataSize>().unwrap(), DataSize::megabytes(1.0));
        assert_eq!("2 gigabytes".parse::<DataSize>().unwrap(), DataSize::gigabytes(2.0));
        assert_eq!("1_000".parse::<DataSize>().unwrap(), DataSize::kilobytes(1.0));
    }

    #[test]
    fn test_humanized() {
        assert_eq!(DataSize::from_bytes(512).humanized(), "512 B");
        assert_eq!(DataSize::mebibytes(1536.0).humanized(), "1.5 GiB");
        assert_eq!(DataSize::infinite().humanized(), "unlimited");
    }
}
