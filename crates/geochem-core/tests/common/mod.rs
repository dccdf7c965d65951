#![allow(dead_code)]

use std::path::PathBuf;

use geochem_core::abundance::Abundance;
use geochem_core::code_tables::CodeTables;
use geochem_core::config::{default_utm_bands, ProductConfig};
use geochem_core::coordinates::{CoordinateNormalizer, ReprojectionError, Reprojector};
use geochem_core::model::{Measurement, ProductInputs, PublicationLink, Sample, SampleRecord};
use geochem_core::product::{DataProduct, ProductBuilder};
use geochem_core::regions::RegionResolver;

pub const NAD83: u32 = 4269;
/// Test-only system whose x is shifted one degree west of NAD83.
pub const SHIFTED: u32 = 990_001;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

/// Deterministic stand-in for the projection backend: easting and northing
/// are degrees scaled by 1000, and one extra system is a plain offset.
pub struct LinearReprojector;

impl Reprojector for LinearReprojector {
    fn reproject(
        &self,
        x: f64,
        y: f64,
        source_epsg: u32,
        target_epsg: u32,
    ) -> Result<(f64, f64), ReprojectionError> {
        match (source_epsg, target_epsg) {
            (s, t) if s == t => Ok((x, y)),
            (SHIFTED, NAD83) => Ok((x - 1.0, y)),
            (NAD83, utm) if (26901..=26923).contains(&utm) => {
                Ok(((x + 180.0) * 1000.0 + 0.75, y * 1000.0 + 0.25))
            }
            (NAD83, _) => Err(ReprojectionError::UnsupportedCrs { epsg: target_epsg }),
            _ => Err(ReprojectionError::UnsupportedCrs { epsg: source_epsg }),
        }
    }
}

pub fn normalizer() -> CoordinateNormalizer {
    CoordinateNormalizer::new(NAD83, default_utm_bands(), Box::new(LinearReprojector))
}

pub fn codes() -> CodeTables {
    CodeTables::new()
        .with_method(1, "FA")
        .with_method(2, "ICP")
        .with_method(3, "INAA")
        .with_unit(1, "ppb")
        .with_unit(2, "ppm")
        .with_unit(3, "pct")
}

pub fn sample(sample_id: i64) -> Sample {
    Sample {
        sample_id,
        sample_code: Some(format!("S{sample_id}")),
        x: -128.0,
        y: 54.0,
        epsg: NAD83,
        ..Default::default()
    }
}

/// Measurement with method `FA`, unit `ppb`, fraction `63`.
pub fn au(sample_id: i64, abundance: &str) -> Measurement {
    measurement(sample_id, "Au", abundance, 1, 1, "63")
}

pub fn measurement(
    sample_id: i64,
    analyte: &str,
    abundance: &str,
    method_id: i64,
    unit_id: i64,
    size_fraction: &str,
) -> Measurement {
    Measurement {
        sample_id,
        analyte: analyte.to_string(),
        abundance: Abundance::parse(abundance),
        detection_limit: None,
        size_fraction: size_fraction.to_string(),
        method_id,
        unit_id,
    }
}

pub fn publication(sample_id: i64, pub_issue: &str) -> PublicationLink {
    PublicationLink {
        sample_id,
        pub_issue: pub_issue.to_string(),
    }
}

pub fn records(
    samples: Vec<Sample>,
    measurements: Vec<Measurement>,
    publications: Vec<PublicationLink>,
) -> Vec<SampleRecord> {
    ProductInputs {
        samples,
        measurements,
        publications,
    }
    .into_records()
    .expect("consistent inputs")
}

pub fn build(records: &[SampleRecord], config: &ProductConfig) -> DataProduct {
    let codes = codes();
    let normalizer = normalizer();
    let regions = RegionResolver::without_grid(config.region_placeholder.clone());
    ProductBuilder::new(config, &codes, &normalizer, &regions)
        .build(records)
        .expect("product builds")
}
