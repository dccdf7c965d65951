use std::collections::HashMap;

use thiserror::Error;

use crate::model::{ColumnKey, Measurement, PublicationLink, Sample, SampleId, SampleRecord};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no method with id {method_id} exists in the method code table (sample {sample_id})")]
    UnknownMethod { method_id: i64, sample_id: SampleId },
    #[error("no unit with id {unit_id} exists in the unit code table (sample {sample_id})")]
    UnknownUnit { unit_id: i64, sample_id: SampleId },
}

/// Resolves method and unit identifiers to the labels used in column headers.
pub trait CodeLookup {
    fn method_group(&self, method_id: i64) -> Option<&str>;
    fn unit_name(&self, unit_id: i64) -> Option<&str>;

    fn column_key(&self, measurement: &Measurement) -> Result<ColumnKey, LookupError> {
        let method_group =
            self.method_group(measurement.method_id)
                .ok_or(LookupError::UnknownMethod {
                    method_id: measurement.method_id,
                    sample_id: measurement.sample_id,
                })?;
        let unit = self
            .unit_name(measurement.unit_id)
            .ok_or(LookupError::UnknownUnit {
                unit_id: measurement.unit_id,
                sample_id: measurement.sample_id,
            })?;

        Ok(ColumnKey::new(
            &measurement.analyte,
            method_group,
            unit,
            measurement.size_fraction.as_str(),
        ))
    }
}

/// In-memory copy of the `code_method` / `code_unit` tables.
#[derive(Debug, Clone, Default)]
pub struct CodeTables {
    methods: HashMap<i64, String>,
    units: HashMap<i64, String>,
}

impl CodeTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_method(&mut self, method_id: i64, method_group: impl Into<String>) {
        self.methods.insert(method_id, method_group.into());
    }

    pub fn insert_unit(&mut self, unit_id: i64, name: impl Into<String>) {
        self.units.insert(unit_id, name.into());
    }

    pub fn with_method(mut self, method_id: i64, method_group: impl Into<String>) -> Self {
        self.insert_method(method_id, method_group);
        self
    }

    pub fn with_unit(mut self, unit_id: i64, name: impl Into<String>) -> Self {
        self.insert_unit(unit_id, name);
        self
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }
}

impl CodeLookup for CodeTables {
    fn method_group(&self, method_id: i64) -> Option<&str> {
        self.methods.get(&method_id).map(String::as_str)
    }

    fn unit_name(&self, unit_id: i64) -> Option<&str> {
        self.units.get(&unit_id).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct KeyedMeasurement<'a> {
    pub key: ColumnKey,
    pub measurement: &'a Measurement,
}

/// A sample whose measurements have been labelled with their column keys.
///
/// Both the catalog pass and row assembly walk the same `&[KeyedSample]`, so
/// slot discovery and slot placement see samples in the same order.
#[derive(Debug, Clone)]
pub struct KeyedSample<'a> {
    pub sample: &'a Sample,
    pub measurements: Vec<KeyedMeasurement<'a>>,
    pub publications: &'a [PublicationLink],
}

/// Labels every measurement. Fails on the first unknown method or unit.
pub fn key_records<'a>(
    records: &'a [SampleRecord],
    lookups: &dyn CodeLookup,
) -> Result<Vec<KeyedSample<'a>>, LookupError> {
    records
        .iter()
        .map(|record| {
            let measurements = record
                .measurements
                .iter()
                .map(|measurement| {
                    Ok(KeyedMeasurement {
                        key: lookups.column_key(measurement)?,
                        measurement,
                    })
                })
                .collect::<Result<Vec<_>, LookupError>>()?;
            Ok(KeyedSample {
                sample: &record.sample,
                measurements,
                publications: &record.publications,
            })
        })
        .collect()
}
