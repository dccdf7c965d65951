mod common;

use std::fs;

use geochem_core::config::ProductConfig;
use geochem_core::outputs::{
    create_parquet_bytes, default_report_path, write_delimited, write_delimited_file,
    write_parquet_file, write_report,
};
use polars::prelude::*;

use common::{au, build, measurement, publication, records, sample};

fn product() -> geochem_core::DataProduct {
    let records = records(
        vec![sample(1), sample(2)],
        vec![
            au(1, "10.2"),
            au(1, "<5"),
            measurement(2, "Cu", "41", 2, 2, "63"),
        ],
        vec![publication(1, "GF 2012-3")],
    );
    build(&records, &ProductConfig::default())
}

#[test]
fn delimited_output_has_header_and_one_line_per_sample() {
    let product = product();
    let mut buffer = Vec::new();
    write_delimited(&product.table, &mut buffer, b',').expect("csv written");
    let text = String::from_utf8(buffer).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Sample_ID,Sample_Code,"));
    assert!(lines[0].ends_with("PublicationIssue,Au_FA_ppb_63,Au1_FA_ppb_63,Cu_ICP_ppm_63"));
    assert!(lines[1].ends_with("GF 2012-3,10.2,<5,"));
    assert!(lines[2].ends_with(",,,41"));
}

#[test]
fn delimiter_is_configurable() {
    let product = product();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("product.tsv");
    write_delimited_file(&product.table, &path, b'\t').expect("tsv written");

    let text = fs::read_to_string(&path).expect("read back");
    let header = text.lines().next().expect("header line");
    assert_eq!(header.split('\t').count(), product.table.width());
}

#[test]
fn parquet_output_keeps_headers_and_values() -> PolarsResult<()> {
    let product = product();
    let bytes = create_parquet_bytes(&product.table).expect("parquet bytes");
    let df = ParquetReader::new(std::io::Cursor::new(bytes)).finish()?;

    assert_eq!(df.height(), 2);
    assert_eq!(df.width(), product.table.width());
    let au1 = df.column("Au1_FA_ppb_63")?.str()?;
    assert_eq!(au1.get(0), Some("<5"));
    assert_eq!(au1.get(1), Some(""));

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("product.parquet");
    write_parquet_file(&product.table, &path).expect("parquet file");
    assert!(fs::metadata(&path).expect("file exists").len() > 0);
    Ok(())
}

#[test]
fn report_serializes_as_json() {
    let product = product();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("report.json");
    write_report(&product.report, &path).expect("report written");

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read back")).expect("json");
    assert_eq!(value["sample_count"], 2);
    assert_eq!(value["analyte_columns"], 3);
    assert_eq!(value["publication_columns"], 1);
    assert!(value["run_id"].is_string());
    assert!(value["conflicts"].as_array().expect("array").is_empty());
}

#[test]
fn report_defaults_to_a_sibling_of_the_output() {
    assert_eq!(
        default_report_path("out/geochem_product.csv"),
        std::path::PathBuf::from("out/geochem_product_report.json")
    );
    assert_eq!(
        default_report_path("product.tsv"),
        std::path::PathBuf::from("product_report.json")
    );
}
