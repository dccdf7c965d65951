use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::abundance::Abundance;

pub type SampleId = i64;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("sample {sample_id} appears more than once")]
    DuplicateSample { sample_id: SampleId },
    #[error("{kind} references unknown sample {sample_id}")]
    UnknownSample {
        kind: &'static str,
        sample_id: SampleId,
    },
    #[error("unrecognised coordinate confidence '{value}' on sample {sample_id}")]
    CoordConfidence { sample_id: SampleId, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordConfidence {
    Low,
    Medium,
    High,
}

impl CoordConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordConfidence::Low => "low",
            CoordConfidence::Medium => "medium",
            CoordConfidence::High => "high",
        }
    }
}

impl FromStr for CoordConfidence {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(CoordConfidence::Low),
            "medium" => Ok(CoordConfidence::Medium),
            "high" => Ok(CoordConfidence::High),
            other => Err(other.to_string()),
        }
    }
}

/// One physical specimen.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sample {
    pub sample_id: SampleId,
    pub sample_code: Option<String>,
    pub sample_name: Option<String>,
    pub sample_type: Option<String>,
    pub sample_subtype: Option<String>,
    pub depth: Option<String>,
    pub duplicate: Option<String>,
    pub borehole: Option<String>,
    pub core_top: Option<f64>,
    pub core_bottom: Option<f64>,
    pub azimuth: Option<f64>,
    pub dip: Option<f64>,
    pub drill_type: Option<String>,
    pub material_type: Option<String>,
    pub description: Option<String>,
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    /// EPSG identifier of the reference system `x`/`y` are expressed in.
    pub epsg: u32,
    pub coord_conf: Option<CoordConfidence>,
}

/// One analytic result for a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub sample_id: SampleId,
    pub analyte: String,
    pub abundance: Abundance,
    pub detection_limit: Option<String>,
    pub size_fraction: String,
    pub method_id: i64,
    pub unit_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationLink {
    pub sample_id: SampleId,
    pub pub_issue: String,
}

/// Identity of an output column family: (analyte, method group, unit, size fraction).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ColumnKey {
    pub analyte: String,
    pub method_group: String,
    pub unit: String,
    pub size_fraction: String,
}

impl ColumnKey {
    pub fn new(
        analyte: impl AsRef<str>,
        method_group: impl Into<String>,
        unit: impl Into<String>,
        size_fraction: impl Into<String>,
    ) -> Self {
        let analyte = analyte
            .as_ref()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        Self {
            analyte,
            method_group: method_group.into(),
            unit: unit.into(),
            size_fraction: size_fraction.into().trim().to_string(),
        }
    }

    /// `<Analyte>[<occurrence>]_<MethodGroup>_<Unit>_<SizeFraction>`; occurrence 0 is omitted.
    pub fn header(&self, occurrence: usize) -> String {
        if occurrence == 0 {
            self.to_string()
        } else {
            format!(
                "{}{}_{}_{}_{}",
                self.analyte, occurrence, self.method_group, self.unit, self.size_fraction
            )
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.analyte, self.method_group, self.unit, self.size_fraction
        )
    }
}

/// A sample together with everything that hangs off it, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub sample: Sample,
    pub measurements: Vec<Measurement>,
    pub publications: Vec<PublicationLink>,
}

/// The three entity streams as read from the upstream store.
#[derive(Debug, Clone, Default)]
pub struct ProductInputs {
    pub samples: Vec<Sample>,
    pub measurements: Vec<Measurement>,
    pub publications: Vec<PublicationLink>,
}

impl ProductInputs {
    /// Groups measurements and publication links under their samples.
    ///
    /// Sample order is the order of `samples`; child order within a sample is
    /// the order of the child streams.
    pub fn into_records(self) -> Result<Vec<SampleRecord>, InputError> {
        let mut seen = HashSet::with_capacity(self.samples.len());
        let mut positions: HashMap<SampleId, usize> = HashMap::with_capacity(self.samples.len());
        let mut records = Vec::with_capacity(self.samples.len());

        for sample in self.samples {
            if !seen.insert(sample.sample_id) {
                return Err(InputError::DuplicateSample {
                    sample_id: sample.sample_id,
                });
            }
            positions.insert(sample.sample_id, records.len());
            records.push(SampleRecord {
                sample,
                measurements: Vec::new(),
                publications: Vec::new(),
            });
        }

        for measurement in self.measurements {
            let idx = *positions
                .get(&measurement.sample_id)
                .ok_or(InputError::UnknownSample {
                    kind: "measurement",
                    sample_id: measurement.sample_id,
                })?;
            records[idx].measurements.push(measurement);
        }

        for link in self.publications {
            let idx = *positions
                .get(&link.sample_id)
                .ok_or(InputError::UnknownSample {
                    kind: "publication link",
                    sample_id: link.sample_id,
                })?;
            records[idx].publications.push(link);
        }

        Ok(records)
    }
}
