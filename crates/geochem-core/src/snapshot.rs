//! Reads a CSV export of the sample store: one file per entity table.

use std::fs::File;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::abundance::{Abundance, AbundanceParsing};
use crate::code_tables::CodeTables;
use crate::model::{
    CoordConfidence, InputError, Measurement, ProductInputs, PublicationLink, Sample,
};

pub const SAMPLES_FILE: &str = "samples.csv";
pub const MEASUREMENTS_FILE: &str = "measurements.csv";
pub const PUBLICATIONS_FILE: &str = "publications.csv";
pub const METHODS_FILE: &str = "methods.csv";
pub const UNITS_FILE: &str = "units.csv";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} CSV error: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error(transparent)]
    Input(#[from] InputError),
}

/// Entity streams plus the code tables needed to label them.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub inputs: ProductInputs,
    pub codes: CodeTables,
}

#[derive(Debug, Deserialize)]
struct SampleRow {
    sample_id: i64,
    sample_code: Option<String>,
    sample_name: Option<String>,
    sample_type: Option<String>,
    sample_subtype: Option<String>,
    depth: Option<String>,
    duplicate: Option<String>,
    borehole: Option<String>,
    core_top: Option<f64>,
    core_bottom: Option<f64>,
    azimuth: Option<f64>,
    dip: Option<f64>,
    drill_type: Option<String>,
    material_type: Option<String>,
    #[serde(rename = "sample_desp")]
    description: Option<String>,
    x_coord: f64,
    y_coord: f64,
    z_coord: Option<f64>,
    coord_conf: Option<String>,
    #[serde(rename = "epsg_srid")]
    epsg: u32,
}

#[derive(Debug, Deserialize)]
struct MeasurementRow {
    sample_id: i64,
    analyte: String,
    abundance: Option<String>,
    detection_limit: Option<String>,
    #[serde(rename = "size_frac")]
    size_fraction: Option<String>,
    method_id: i64,
    unit_id: i64,
}

#[derive(Debug, Deserialize)]
struct PublicationRow {
    sample_id: i64,
    pub_issue: String,
}

#[derive(Debug, Deserialize)]
struct MethodRow {
    method_id: i64,
    method_group: String,
}

#[derive(Debug, Deserialize)]
struct UnitRow {
    unit_id: i64,
    name: String,
}

pub fn load_snapshot(dir: impl AsRef<Path>, parsing: AbundanceParsing) -> Result<Snapshot, SnapshotError> {
    let dir = dir.as_ref();

    let samples = read_rows::<SampleRow>(&dir.join(SAMPLES_FILE))?
        .into_iter()
        .map(sample_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    let measurements = read_rows::<MeasurementRow>(&dir.join(MEASUREMENTS_FILE))?
        .into_iter()
        .map(|row| Measurement {
            sample_id: row.sample_id,
            analyte: row.analyte,
            abundance: row
                .abundance
                .as_deref()
                .map(|raw| Abundance::parse_with(raw, parsing))
                .unwrap_or(Abundance::Blank),
            detection_limit: row.detection_limit,
            size_fraction: row.size_fraction.unwrap_or_default(),
            method_id: row.method_id,
            unit_id: row.unit_id,
        })
        .collect::<Vec<_>>();

    let publications = read_rows::<PublicationRow>(&dir.join(PUBLICATIONS_FILE))?
        .into_iter()
        .map(|row| PublicationLink {
            sample_id: row.sample_id,
            pub_issue: row.pub_issue,
        })
        .collect::<Vec<_>>();

    let mut codes = CodeTables::new();
    for row in read_rows::<MethodRow>(&dir.join(METHODS_FILE))? {
        codes.insert_method(row.method_id, row.method_group);
    }
    for row in read_rows::<UnitRow>(&dir.join(UNITS_FILE))? {
        codes.insert_unit(row.unit_id, row.name);
    }

    info!(
        dir = %dir.display(),
        samples = samples.len(),
        measurements = measurements.len(),
        publications = publications.len(),
        "Loaded snapshot"
    );

    Ok(Snapshot {
        inputs: ProductInputs {
            samples,
            measurements,
            publications,
        },
        codes,
    })
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, SnapshotError> {
    let file = File::open(path).map_err(|source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|source| SnapshotError::Csv {
            path: path.display().to_string(),
            source,
        })
}

fn sample_from_row(row: SampleRow) -> Result<Sample, InputError> {
    let coord_conf = parse_coord_conf(row.sample_id, row.coord_conf.as_deref())?;

    Ok(Sample {
        sample_id: row.sample_id,
        sample_code: row.sample_code,
        sample_name: row.sample_name,
        sample_type: row.sample_type,
        sample_subtype: row.sample_subtype,
        depth: row.depth,
        duplicate: row.duplicate,
        borehole: row.borehole,
        core_top: row.core_top,
        core_bottom: row.core_bottom,
        azimuth: row.azimuth,
        dip: row.dip,
        drill_type: row.drill_type,
        material_type: row.material_type,
        description: row.description,
        x: row.x_coord,
        y: row.y_coord,
        z: row.z_coord,
        epsg: row.epsg,
        coord_conf,
    })
}

pub(crate) fn parse_coord_conf(
    sample_id: i64,
    raw: Option<&str>,
) -> Result<Option<CoordConfidence>, InputError> {
    raw.map(|value| {
        value
            .parse::<CoordConfidence>()
            .map_err(|value| InputError::CoordConfidence { sample_id, value })
    })
    .transpose()
}
