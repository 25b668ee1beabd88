//! Throughput units and conversion from bytes per second.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Decimal prefixes, in increasing order (each step is a factor of 1000)
const PREFIXES: &[(&str, Prefix)] = &[
    ("", Prefix::None),
    ("k", Prefix::Kilo),
    ("M", Prefix::Mega),
    ("G", Prefix::Giga),
    ("T", Prefix::Tera),
];

/// Every unit string accepted by [`Unit::from_str`].
pub const UNIT_CHOICES: &[&str] = &[
    "Bps", "kBps", "MBps", "GBps", "TBps", "bps", "kbps", "Mbps", "Gbps", "Tbps",
];

/// The unit string did not match `[prefix]{Bps|bps}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot parse unit {0:?} (expected one of: {choices})", choices = UNIT_CHOICES.join(", "))]
pub struct UnitParseError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    None,
    Kilo,
    Mega,
    Giga,
    Tera,
}

impl Prefix {
    /// Number of factor-1000 steps below the base unit.
    fn steps(self) -> u32 {
        match self {
            Prefix::None => 0,
            Prefix::Kilo => 1,
            Prefix::Mega => 2,
            Prefix::Giga => 3,
            Prefix::Tera => 4,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Prefix::None => "",
            Prefix::Kilo => "k",
            Prefix::Mega => "M",
            Prefix::Giga => "G",
            Prefix::Tera => "T",
        }
    }
}

/// What is counted per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Bytes,
    Bits,
}

/// A per-second throughput unit such as `Bps`, `kbps` or `GBps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    pub prefix: Prefix,
    pub measure: Measure,
}

impl Unit {
    /// Bytes per second, the unit of the kernel counters.
    pub const BYTES_PER_SEC: Unit = Unit {
        prefix: Prefix::None,
        measure: Measure::Bytes,
    };

    /// Convert a bytes/sec value into this unit.
    ///
    /// Bits multiply by 8 first, then each prefix step divides by 1000.
    pub fn convert(&self, bytes_per_sec: f64) -> f64 {
        let mut value = match self.measure {
            Measure::Bytes => bytes_per_sec,
            Measure::Bits => bytes_per_sec * 8.0,
        };
        for _ in 0..self.prefix.steps() {
            value /= 1000.0;
        }
        value
    }
}

impl Default for Unit {
    fn default() -> Self {
        Self::BYTES_PER_SEC
    }
}

impl FromStr for Unit {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (measure, prefix) = if let Some(prefix) = s.strip_suffix("Bps") {
            (Measure::Bytes, prefix)
        } else if let Some(prefix) = s.strip_suffix("bps") {
            (Measure::Bits, prefix)
        } else {
            return Err(UnitParseError(s.to_string()));
        };

        PREFIXES
            .iter()
            .find(|(symbol, _)| *symbol == prefix)
            .map(|(_, prefix)| Unit {
                prefix: *prefix,
                measure,
            })
            .ok_or_else(|| UnitParseError(s.to_string()))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.measure {
            Measure::Bytes => "Bps",
            Measure::Bits => "bps",
        };
        write!(f, "{}{}", self.prefix.symbol(), suffix)
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Convert a bytes/sec `value` into the unit named by `unit`.
pub fn convert(value: f64, unit: &str) -> Result<f64, UnitParseError> {
    Ok(unit.parse::<Unit>()?.convert(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[f64] = &[
        0.0, 1.0, 10.0, 100.0, 1000.0, 3214.0, 57665.0, 739373.0, 8635791.0,
    ];

    #[test]
    fn test_zero_is_zero_in_every_unit() {
        for unit in UNIT_CHOICES {
            assert_eq!(convert(0.0, unit).unwrap(), 0.0, "unit {}", unit);
        }
    }

    #[test]
    fn test_byte_units_divide_by_1000_per_step() {
        for &value in SAMPLES {
            let mut expected = value;
            for unit in ["Bps", "kBps", "MBps", "GBps", "TBps"] {
                let converted = convert(value, unit).unwrap();
                assert_eq!(converted, expected, "{} in {}", value, unit);
                expected /= 1000.0;
            }
        }
        assert_eq!(convert(1_000_000.0, "MBps").unwrap(), 1.0);
    }

    #[test]
    fn test_bit_units_multiply_by_8() {
        assert_eq!(convert(1.0, "bps").unwrap(), 8.0);
        assert_eq!(convert(1000.0, "kbps").unwrap(), 8.0);
        for &value in SAMPLES {
            let mut expected = value * 8.0;
            for unit in ["bps", "kbps", "Mbps", "Gbps", "Tbps"] {
                let converted = convert(value, unit).unwrap();
                assert_eq!(converted, expected, "{} in {}", value, unit);
                expected /= 1000.0;
            }
        }
    }

    #[test]
    fn test_rejects_unknown_units() {
        for unit in ["", "B", "Kbps", "kiBps", "mbps", "Pbps", "kBps ", "bytes"] {
            assert_eq!(convert(1.0, unit), Err(UnitParseError(unit.to_string())));
        }
    }

    #[test]
    fn test_display_round_trips_choices() {
        for unit in UNIT_CHOICES {
            assert_eq!(unit.parse::<Unit>().unwrap().to_string(), *unit);
        }
    }
}
