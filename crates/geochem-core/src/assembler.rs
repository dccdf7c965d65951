use serde::Serialize;
use tracing::{debug, warn};

use crate::abundance::Abundance;
use crate::catalog::ColumnCatalog;
use crate::code_tables::KeyedSample;
use crate::coordinates::{
    round_elevation, CoordinateNormalizer, GeographicPoint, ReprojectionError, UtmCoordinate,
};
use crate::model::{Sample, SampleId};
use crate::regions::RegionResolver;
use crate::table::FixedColumn;

/// A measurement that found neither an empty slot nor a slot holding the same value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssemblyConflict {
    pub sample_id: SampleId,
    pub sample_code: Option<String>,
    pub column: String,
    pub abundance: Abundance,
    pub slots: usize,
    pub occupied: Vec<Abundance>,
}

/// One output row before it is laid into the table.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledRow {
    pub sample_id: SampleId,
    /// One value per [`FixedColumn::ALL`] entry.
    pub fixed: Vec<String>,
    /// One value per publication link, in link order.
    pub publications: Vec<String>,
    /// One value per catalog slot.
    pub values: Vec<Option<Abundance>>,
    pub point: GeographicPoint,
    pub utm: UtmCoordinate,
    pub in_region_grid: bool,
    pub conflicts: Vec<AssemblyConflict>,
}

/// Where a measurement's value went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Filled(usize),
    /// An equal value already occupies this slot.
    Redundant(usize),
    Skipped,
    Conflict,
}

/// Builds rows against a fixed catalog.
pub struct RowAssembler<'a> {
    catalog: &'a ColumnCatalog,
    normalizer: &'a CoordinateNormalizer,
    regions: &'a RegionResolver,
}

impl<'a> RowAssembler<'a> {
    pub fn new(
        catalog: &'a ColumnCatalog,
        normalizer: &'a CoordinateNormalizer,
        regions: &'a RegionResolver,
    ) -> Self {
        Self {
            catalog,
            normalizer,
            regions,
        }
    }

    pub fn assemble(&self, keyed: &KeyedSample<'_>) -> Result<AssembledRow, ReprojectionError> {
        let sample = keyed.sample;
        let point = self
            .normalizer
            .to_canonical(sample.x, sample.y, sample.epsg)?;
        let utm = self.normalizer.to_utm(point)?;
        if utm.is_out_of_band() {
            debug!(sample_id = sample.sample_id, longitude = point.longitude, "Longitude outside UTM bands");
        }

        let region = self.regions.locate(point);
        if region.is_none() {
            debug!(sample_id = sample.sample_id, "Point outside region grid");
        }
        let region_tag = region.unwrap_or(self.regions.placeholder());

        let fixed = fixed_values(sample, point, region_tag, utm);
        let publications = keyed
            .publications
            .iter()
            .map(|link| link.pub_issue.clone())
            .collect();

        let mut values: Vec<Option<Abundance>> = vec![None; self.catalog.len()];
        let mut conflicts = Vec::new();
        for entry in &keyed.measurements {
            let abundance = &entry.measurement.abundance;
            let slots = self.catalog.slots_for(&entry.key);
            if place(&mut values, slots, abundance) == Placement::Conflict {
                warn!(
                    sample_id = sample.sample_id,
                    column = %entry.key,
                    abundance = %abundance,
                    slots = slots.len(),
                    "No free slot for measurement"
                );
                conflicts.push(AssemblyConflict {
                    sample_id: sample.sample_id,
                    sample_code: sample.sample_code.clone(),
                    column: entry.key.to_string(),
                    abundance: abundance.clone(),
                    slots: slots.len(),
                    occupied: slots.iter().filter_map(|&s| values[s].clone()).collect(),
                });
            }
        }

        Ok(AssembledRow {
            sample_id: sample.sample_id,
            fixed,
            publications,
            values,
            point,
            utm,
            in_region_grid: region.is_some(),
            conflicts,
        })
    }
}

/// Puts `abundance` into the first of `slots` that already holds an equal
/// value, else the first empty one. Blank abundances are never placed.
pub fn place(values: &mut [Option<Abundance>], slots: &[usize], abundance: &Abundance) -> Placement {
    if abundance.is_blank() {
        return Placement::Skipped;
    }

    if let Some(&slot) = slots
        .iter()
        .find(|&&slot| values[slot].as_ref() == Some(abundance))
    {
        return Placement::Redundant(slot);
    }

    match slots.iter().find(|&&slot| values[slot].is_none()) {
        Some(&slot) => {
            values[slot] = Some(abundance.clone());
            Placement::Filled(slot)
        }
        None => Placement::Conflict,
    }
}

fn fixed_values(
    sample: &Sample,
    point: GeographicPoint,
    region_tag: &str,
    utm: UtmCoordinate,
) -> Vec<String> {
    FixedColumn::ALL
        .iter()
        .map(|column| match column {
            FixedColumn::SampleId => sample.sample_id.to_string(),
            FixedColumn::SampleCode => text(&sample.sample_code),
            FixedColumn::SampleName => text(&sample.sample_name),
            FixedColumn::SampleType => text(&sample.sample_type),
            FixedColumn::SampleSubtype => text(&sample.sample_subtype),
            FixedColumn::Depth => text(&sample.depth),
            FixedColumn::Duplicate => text(&sample.duplicate),
            FixedColumn::Borehole => text(&sample.borehole),
            FixedColumn::CoreTop => number(sample.core_top),
            FixedColumn::CoreBottom => number(sample.core_bottom),
            FixedColumn::Azimuth => number(sample.azimuth),
            FixedColumn::Dip => number(sample.dip),
            FixedColumn::DrillType => text(&sample.drill_type),
            FixedColumn::MaterialType => text(&sample.material_type),
            FixedColumn::SampleDescription => text(&sample.description),
            FixedColumn::Longitude => point.longitude.to_string(),
            FixedColumn::Latitude => point.latitude.to_string(),
            FixedColumn::Elevation => sample
                .z
                .filter(|z| z.is_finite())
                .map(|z| round_elevation(z).to_string())
                .unwrap_or_default(),
            FixedColumn::CoordConf => sample
                .coord_conf
                .map(|conf| conf.as_str().to_string())
                .unwrap_or_default(),
            FixedColumn::Region => region_tag.to_string(),
            FixedColumn::UtmEasting => utm.easting.to_string(),
            FixedColumn::UtmNorthing => utm.northing.to_string(),
            FixedColumn::UtmZone => utm.zone.to_string(),
        })
        .collect()
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
