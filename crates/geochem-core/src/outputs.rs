use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};

use crate::product::ProductReport;
use crate::table::FlatTable;

/// Writes the header row and one record per sample.
pub fn write_delimited<W: Write>(table: &FlatTable, writer: W, delimiter: u8) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    csv_writer
        .write_record(table.headers())
        .context("failed to write header row")?;
    for index in 0..table.height() {
        let Some(row) = table.row(index) else {
            break;
        };
        csv_writer
            .write_record(&row)
            .with_context(|| format!("failed to write data row {}", index))?;
    }
    csv_writer.flush().context("failed to flush delimited output")?;
    Ok(())
}

pub fn write_delimited_file(table: &FlatTable, path: impl AsRef<Path>, delimiter: u8) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_delimited(table, BufWriter::new(file), delimiter)
        .with_context(|| format!("failed to write {}", path.display()))
}

pub fn create_parquet_bytes(table: &FlatTable) -> Result<Vec<u8>> {
    let mut df = table
        .to_dataframe()
        .context("failed to convert table to a dataframe")?;
    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        ParquetWriter::new(&mut cursor)
            .with_compression(ParquetCompression::Zstd(None))
            .with_statistics(StatisticsOptions::default())
            .finish(&mut df)
            .context("failed to write parquet to buffer")?;
    }
    Ok(buffer)
}

pub fn write_parquet_file(table: &FlatTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = create_parquet_bytes(table)?;
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_report(report: &ProductReport, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = serde_json::to_vec_pretty(report).context("failed to serialize run report")?;
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

/// Report location used when none is given: `<stem>_report.json` beside the
/// delimited output.
pub fn default_report_path(output: impl AsRef<Path>) -> PathBuf {
    let output = output.as_ref();
    let stem = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "geochem_product".to_string());
    output.with_file_name(format!("{stem}_report.json"))
}
