use std::fmt;

use serde::{Serialize, Serializer};

/// An analytic result as stored upstream, with the censoring marker lifted out
/// of the text and into the tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Abundance {
    Measured(Reading),
    /// Reported as `<x`: below the detection limit `x`.
    BelowDetectionLimit(Reading),
    /// Reported as `>x`: above the upper reporting limit `x`.
    AboveUpperLimit(Reading),
    /// Non-numeric result kept verbatim (e.g. `n.a.`, `IS`).
    Text(String),
    Blank,
}

/// A numeric result together with the digits the lab reported, so trailing
/// zeros survive into the product. Compares by value only.
#[derive(Debug, Clone)]
pub struct Reading {
    value: f64,
    reported: String,
}

impl Reading {
    fn parse(text: &str) -> Option<Self> {
        let reported = text.trim();
        let value = reported.parse::<f64>().ok().filter(|value| value.is_finite())?;
        Some(Self {
            value,
            reported: reported.to_string(),
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn reported(&self) -> &str {
        &self.reported
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Self {
            value,
            reported: value.to_string(),
        }
    }
}

impl PartialEq for Reading {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

/// Controls how raw abundance strings are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbundanceParsing {
    /// Some loaders stored `<x` as `-x`. When set, negative numbers are read
    /// back as below-detection-limit values.
    pub negative_is_censored: bool,
}

impl Default for AbundanceParsing {
    fn default() -> Self {
        Self {
            negative_is_censored: true,
        }
    }
}

impl Abundance {
    pub fn parse(raw: &str) -> Self {
        Self::parse_with(raw, AbundanceParsing::default())
    }

    pub fn parse_with(raw: &str, parsing: AbundanceParsing) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Abundance::Blank;
        }

        if let Some(rest) = trimmed.strip_prefix('<') {
            return match Reading::parse(rest) {
                Some(reading) => Abundance::BelowDetectionLimit(reading),
                None => Abundance::Text(trimmed.to_string()),
            };
        }

        if let Some(rest) = trimmed.strip_prefix('>') {
            return match Reading::parse(rest) {
                Some(reading) => Abundance::AboveUpperLimit(reading),
                None => Abundance::Text(trimmed.to_string()),
            };
        }

        match Reading::parse(trimmed) {
            Some(reading) if reading.value < 0.0 && parsing.negative_is_censored => {
                match trimmed.strip_prefix('-').and_then(Reading::parse) {
                    Some(limit) => Abundance::BelowDetectionLimit(limit),
                    None => Abundance::BelowDetectionLimit(Reading::from(-reading.value)),
                }
            }
            Some(reading) => Abundance::Measured(reading),
            None => Abundance::Text(trimmed.to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Abundance::Blank)
    }
}

impl fmt::Display for Abundance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Abundance::Measured(reading) => f.write_str(reading.reported()),
            Abundance::BelowDetectionLimit(reading) => write!(f, "<{}", reading.reported()),
            Abundance::AboveUpperLimit(reading) => write!(f, ">{}", reading.reported()),
            Abundance::Text(text) => f.write_str(text),
            Abundance::Blank => Ok(()),
        }
    }
}

impl Serialize for Abundance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
