use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assembler::{AssemblyConflict, RowAssembler};
use crate::catalog::build_catalog;
use crate::code_tables::{key_records, CodeLookup};
use crate::config::ProductConfig;
use crate::coordinates::CoordinateNormalizer;
use crate::error::Result;
use crate::model::{SampleId, SampleRecord};
use crate::postprocess;
use crate::regions::RegionResolver;
use crate::table::{ColumnKind, FlatTable};

/// Run summary written next to the data product. Recoverable problems end up
/// here rather than aborting the run.
#[derive(Debug, Clone, Serialize)]
pub struct ProductReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub sample_count: usize,
    pub row_count: usize,
    pub fixed_columns: usize,
    pub publication_columns: usize,
    pub analyte_columns: usize,
    pub catalog_slots: usize,
    pub distinct_column_keys: usize,
    pub pruned_columns: usize,
    pub renamed_columns: usize,
    pub max_repeats: usize,
    pub capped_keys: Vec<String>,
    pub conflicts: Vec<AssemblyConflict>,
    pub out_of_band_samples: Vec<SampleId>,
    pub outside_region_grid_samples: Vec<SampleId>,
}

impl ProductReport {
    pub fn has_warnings(&self) -> bool {
        !self.conflicts.is_empty() || !self.capped_keys.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DataProduct {
    pub table: FlatTable,
    pub report: ProductReport,
}

/// Wires the engine stages together for one batch run.
pub struct ProductBuilder<'a> {
    config: &'a ProductConfig,
    lookups: &'a dyn CodeLookup,
    normalizer: &'a CoordinateNormalizer,
    regions: &'a RegionResolver,
}

impl<'a> ProductBuilder<'a> {
    pub fn new(
        config: &'a ProductConfig,
        lookups: &'a dyn CodeLookup,
        normalizer: &'a CoordinateNormalizer,
        regions: &'a RegionResolver,
    ) -> Self {
        Self {
            config,
            lookups,
            normalizer,
            regions,
        }
    }

    /// Builds the flat table for `records`, in their order.
    ///
    /// Fails on an unknown method/unit or an unsupported reference system.
    pub fn build(&self, records: &[SampleRecord]) -> Result<DataProduct> {
        let keyed = key_records(records, self.lookups)?;

        let catalog = build_catalog(&keyed, self.config);
        info!(
            samples = keyed.len(),
            slots = catalog.len(),
            keys = catalog.distinct_keys(),
            publication_width = catalog.publication_width(),
            "Column catalog discovered"
        );
        for key in catalog.capped_keys() {
            warn!(column = %key, cap = self.config.max_repeats, "Column key exceeded repeat cap");
        }

        let assembler = RowAssembler::new(&catalog, self.normalizer, self.regions);
        let mut rows = Vec::with_capacity(keyed.len());
        let mut conflicts = Vec::new();
        let mut out_of_band_samples = Vec::new();
        let mut outside_region_grid_samples = Vec::new();
        for sample in &keyed {
            let mut row = assembler.assemble(sample)?;
            if row.utm.is_out_of_band() {
                out_of_band_samples.push(row.sample_id);
            }
            if !row.in_region_grid {
                outside_region_grid_samples.push(row.sample_id);
            }
            conflicts.append(&mut row.conflicts);
            rows.push(row);
        }

        let mut table = FlatTable::from_rows(&catalog, rows);
        let stats = postprocess::finalize(&mut table);

        let report = ProductReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            sample_count: records.len(),
            row_count: table.height(),
            fixed_columns: table.count_kind(ColumnKind::Fixed),
            publication_columns: table.count_kind(ColumnKind::Publication),
            analyte_columns: table.count_kind(ColumnKind::Analyte),
            catalog_slots: catalog.len(),
            distinct_column_keys: catalog.distinct_keys(),
            pruned_columns: stats.pruned_columns,
            renamed_columns: stats.renamed_columns,
            max_repeats: self.config.max_repeats,
            capped_keys: catalog.capped_keys().iter().map(|k| k.to_string()).collect(),
            conflicts,
            out_of_band_samples,
            outside_region_grid_samples,
        };

        info!(
            rows = report.row_count,
            columns = table.width(),
            pruned = report.pruned_columns,
            conflicts = report.conflicts.len(),
            "Data product assembled"
        );

        Ok(DataProduct { table, report })
    }
}
