use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::abundance::AbundanceParsing;
use crate::crs::CrsDefinition;

/// Upper bound on repeated slots per column key. The largest repeat seen in
/// comparable data products was five.
pub const DEFAULT_MAX_REPEATS: usize = 9;
/// NAD83 geographic.
pub const DEFAULT_CANONICAL_EPSG: u32 = 4269;
pub const DEFAULT_REGION_TAG_PROPERTY: &str = "map_tile";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How the schema accumulator grants extra slots to a recurring column key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatPolicy {
    /// A new slot only when one sample holds more occurrences of the key than
    /// the catalog already provides.
    #[default]
    PerSample,
    /// Every recurrence appends a slot while under the cap; blank slots are
    /// left for the pruning pass to remove.
    PerOccurrence,
}

/// One six-degree longitude band and the projected system it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtmBand {
    pub west: f64,
    pub east: f64,
    pub zone: i32,
    pub epsg: u32,
}

impl UtmBand {
    /// Both edges are inclusive; callers resolve shared edges by band order.
    pub fn contains(&self, longitude: f64) -> bool {
        longitude >= self.west && longitude <= self.east
    }
}

/// NAD83 / UTM zones 7 to 11.
pub fn default_utm_bands() -> Vec<UtmBand> {
    (7..=11)
        .map(|zone| {
            let west = -180.0 + f64::from(zone - 1) * 6.0;
            UtmBand {
                west,
                east: west + 6.0,
                zone,
                epsg: 26900 + zone as u32,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductConfig {
    pub max_repeats: usize,
    pub repeat_policy: RepeatPolicy,
    pub canonical_epsg: u32,
    pub utm_bands: Vec<UtmBand>,
    pub region_tag_property: String,
    pub region_placeholder: String,
    pub delimiter: char,
    pub negative_abundance_is_censored: bool,
    pub crs: Vec<CrsDefinition>,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            max_repeats: DEFAULT_MAX_REPEATS,
            repeat_policy: RepeatPolicy::default(),
            canonical_epsg: DEFAULT_CANONICAL_EPSG,
            utm_bands: default_utm_bands(),
            region_tag_property: DEFAULT_REGION_TAG_PROPERTY.to_string(),
            region_placeholder: String::new(),
            delimiter: ',',
            negative_abundance_is_censored: true,
            crs: Vec::new(),
        }
    }
}

impl ProductConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ProductConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_repeats == 0 {
            return Err(ConfigError::Invalid(
                "max_repeats must be at least 1".to_string(),
            ));
        }
        if !self.delimiter.is_ascii() {
            return Err(ConfigError::Invalid(format!(
                "delimiter '{}' must be a single ASCII character",
                self.delimiter
            )));
        }
        for band in &self.utm_bands {
            if !(band.west < band.east) {
                return Err(ConfigError::Invalid(format!(
                    "UTM band for zone {} has west {} not less than east {}",
                    band.zone, band.west, band.east
                )));
            }
        }
        Ok(())
    }

    pub fn abundance_parsing(&self) -> AbundanceParsing {
        AbundanceParsing {
            negative_is_censored: self.negative_abundance_is_censored,
        }
    }

    pub fn delimiter_byte(&self) -> u8 {
        if self.delimiter.is_ascii() {
            self.delimiter as u8
        } else {
            b','
        }
    }
}
