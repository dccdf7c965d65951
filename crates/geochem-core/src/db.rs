use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres, Row};
use tracing::info;

use crate::abundance::{Abundance, AbundanceParsing};
use crate::code_tables::CodeTables;
use crate::model::{Measurement, ProductInputs, PublicationLink, Sample};
use crate::snapshot::{parse_coord_conf, Snapshot};

pub type DbPool = Pool<Postgres>;

/// Establish a read-only pool against the sample store.
pub async fn connect(database_url: &str) -> Result<DbPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .with_context(|| "failed to connect to Postgres")
}

/// Reads the same entity streams a CSV snapshot carries, straight from the store.
pub async fn load_snapshot(pool: &DbPool, parsing: AbundanceParsing) -> Result<Snapshot> {
    let sample_rows = sqlx::query(
        r#"
        SELECT
            sample_id,
            sample_code,
            sample_name,
            sample_type,
            sample_subtype,
            depth,
            duplicate,
            borehole,
            core_top,
            core_bottom,
            azimuth,
            dip,
            drill_type,
            material_type,
            sample_desp,
            x_coord,
            y_coord,
            z_coord,
            coord_conf,
            epsg_srid
        FROM data_sample
        ORDER BY sample_id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to query data_sample")?;

    let mut samples = Vec::with_capacity(sample_rows.len());
    for row in sample_rows {
        let sample_id: i64 = row.try_get("sample_id")?;
        let coord_conf: Option<String> = row.try_get("coord_conf")?;
        let epsg: i32 = row.try_get("epsg_srid")?;
        let epsg = u32::try_from(epsg)
            .with_context(|| format!("sample {} has negative SRID {}", sample_id, epsg))?;

        samples.push(Sample {
            sample_id,
            sample_code: row.try_get("sample_code")?,
            sample_name: row.try_get("sample_name")?,
            sample_type: row.try_get("sample_type")?,
            sample_subtype: row.try_get("sample_subtype")?,
            depth: row.try_get("depth")?,
            duplicate: row.try_get("duplicate")?,
            borehole: row.try_get("borehole")?,
            core_top: row.try_get("core_top")?,
            core_bottom: row.try_get("core_bottom")?,
            azimuth: row.try_get("azimuth")?,
            dip: row.try_get("dip")?,
            drill_type: row.try_get("drill_type")?,
            material_type: row.try_get("material_type")?,
            description: row.try_get("sample_desp")?,
            x: row.try_get("x_coord")?,
            y: row.try_get("y_coord")?,
            z: row.try_get("z_coord")?,
            epsg,
            coord_conf: parse_coord_conf(sample_id, coord_conf.as_deref())?,
        });
    }

    let measurement_rows = sqlx::query(
        r#"
        SELECT sample_id, analyte, abundance, detection_limit, size_frac, method_id, unit_id
        FROM data_analyte
        ORDER BY sample_id, analyte_id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to query data_analyte")?;

    let mut measurements = Vec::with_capacity(measurement_rows.len());
    for row in measurement_rows {
        let abundance: Option<String> = row.try_get("abundance")?;
        let size_fraction: Option<String> = row.try_get("size_frac")?;
        measurements.push(Measurement {
            sample_id: row.try_get("sample_id")?,
            analyte: row.try_get("analyte")?,
            abundance: abundance
                .as_deref()
                .map(|raw| Abundance::parse_with(raw, parsing))
                .unwrap_or(Abundance::Blank),
            detection_limit: row.try_get("detection_limit")?,
            size_fraction: size_fraction.unwrap_or_default(),
            method_id: row.try_get("method_id")?,
            unit_id: row.try_get("unit_id")?,
        });
    }

    let publication_rows = sqlx::query(
        r#"SELECT sample_id, pub_issue FROM data_publish ORDER BY sample_id, pub_issue"#,
    )
    .fetch_all(pool)
    .await
    .context("failed to query data_publish")?;

    let mut publications = Vec::with_capacity(publication_rows.len());
    for row in publication_rows {
        publications.push(PublicationLink {
            sample_id: row.try_get("sample_id")?,
            pub_issue: row.try_get("pub_issue")?,
        });
    }

    let mut codes = CodeTables::new();
    for row in sqlx::query(r#"SELECT method_id, method_group FROM code_method"#)
        .fetch_all(pool)
        .await
        .context("failed to query code_method")?
    {
        codes.insert_method(
            row.try_get::<i64, _>("method_id")?,
            row.try_get::<String, _>("method_group")?,
        );
    }
    for row in sqlx::query(r#"SELECT unit_id, name FROM code_unit"#)
        .fetch_all(pool)
        .await
        .context("failed to query code_unit")?
    {
        codes.insert_unit(
            row.try_get::<i64, _>("unit_id")?,
            row.try_get::<String, _>("name")?,
        );
    }

    info!(
        samples = samples.len(),
        measurements = measurements.len(),
        publications = publications.len(),
        methods = codes.method_count(),
        units = codes.unit_count(),
        "Loaded entity streams from database"
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
