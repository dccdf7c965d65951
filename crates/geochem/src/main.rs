use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use geochem_core::catalog::build_catalog;
use geochem_core::code_tables::key_records;
use geochem_core::coordinates::CoordinateNormalizer;
use geochem_core::regions::{load_region_grid, RegionResolver};
use geochem_core::snapshot::{self, Snapshot};
use geochem_core::{db, outputs, ProductBuilder, ProductConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Geochemistry data product builder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the flat sample-by-column data product
    Build(BuildArgs),
    /// Discover and print the column catalog without assembling rows
    Catalog(SourceArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Directory holding a CSV snapshot of the sample store
    #[arg(long, conflicts_with = "database_url")]
    snapshot: Option<PathBuf>,

    /// Postgres URL of the sample store. Falls back to DATABASE_URL when
    /// neither this nor --snapshot is given.
    #[arg(long)]
    database_url: Option<String>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct BuildArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// GeoJSON FeatureCollection of map-sheet cells
    #[arg(long)]
    grid: Option<PathBuf>,

    /// Delimited text output
    #[arg(long, default_value = "geochem_product.csv")]
    output: PathBuf,

    /// Also write the table as Parquet
    #[arg(long)]
    parquet: Option<PathBuf>,

    /// JSON run report [default: <output stem>_report.json next to the output]
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => run_build(args).await,
        Command::Catalog(args) => run_catalog(args).await,
    }
}

async fn run_build(args: BuildArgs) -> Result<()> {
    let config = load_config(args.source.config.as_deref())?;
    let snapshot = load_source(&args.source, &config).await?;
    let records = snapshot
        .inputs
        .into_records()
        .context("entity streams are inconsistent")?;

    let normalizer = CoordinateNormalizer::from_config(&config);
    let regions = match &args.grid {
        Some(path) => {
            let index = load_region_grid(path, &config.region_tag_property)?;
            RegionResolver::new(Box::new(index), config.region_placeholder.clone())
        }
        None => {
            warn!("No region grid supplied; every sample gets the placeholder region");
            RegionResolver::without_grid(config.region_placeholder.clone())
        }
    };

    let product = ProductBuilder::new(&config, &snapshot.codes, &normalizer, &regions)
        .build(&records)?;

    outputs::write_delimited_file(&product.table, &args.output, config.delimiter_byte())?;
    info!(path = %args.output.display(), rows = product.table.height(), "Wrote delimited output");

    if let Some(path) = &args.parquet {
        outputs::write_parquet_file(&product.table, path)?;
        info!(path = %path.display(), "Wrote parquet output");
    }
    let report_path = args
        .report
        .clone()
        .unwrap_or_else(|| outputs::default_report_path(&args.output));
    outputs::write_report(&product.report, &report_path)?;
    info!(path = %report_path.display(), "Wrote run report");
    if product.report.has_warnings() {
        warn!(
            conflicts = product.report.conflicts.len(),
            capped_keys = product.report.capped_keys.len(),
            "Data product built with warnings"
        );
    }
    Ok(())
}

async fn run_catalog(args: SourceArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let snapshot = load_source(&args, &config).await?;
    let records = snapshot
        .inputs
        .into_records()
        .context("entity streams are inconsistent")?;
    let keyed = key_records(&records, &snapshot.codes)?;
    let catalog = build_catalog(&keyed, &config);

    let capped: HashSet<_> = catalog.capped_keys().iter().collect();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Column key", "Slots", "Capped"]);

    let mut listed = HashSet::new();
    for key in catalog.keys() {
        if !listed.insert(key) {
            continue;
        }
        table.add_row(vec![
            key.to_string(),
            catalog.slot_count(key).to_string(),
            if capped.contains(key) { "yes" } else { "" }.to_string(),
        ]);
    }

    println!("{table}");
    println!(
        "{} slots across {} keys; publication width {}",
        catalog.len(),
        catalog.distinct_keys(),
        catalog.publication_width()
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ProductConfig> {
    match path {
        Some(path) => ProductConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(ProductConfig::default()),
    }
}

async fn load_source(args: &SourceArgs, config: &ProductConfig) -> Result<Snapshot> {
    match &args.snapshot {
        Some(dir) => Ok(snapshot::load_snapshot(dir, config.abundance_parsing())?),
        None => {
            let pool = connect_pool(args.database_url.as_deref()).await?;
            db::load_snapshot(&pool, config.abundance_parsing()).await
        }
    }
}

async fn connect_pool(database_url: Option<&str>) -> Result<db::DbPool> {
    let database_url = match database_url {
        Some(url) => url.to_string(),
        None => {
            dotenvy::dotenv().ok();
            std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("GEOCHEM_DATABASE_URL"))
                .context("DATABASE_URL (or GEOCHEM_DATABASE_URL) must be set when --snapshot is not given")?
        }
    };
    db::connect(&database_url).await
}
