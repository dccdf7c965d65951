pub mod abundance;
pub mod assembler;
pub mod catalog;
pub mod code_tables;
pub mod config;
pub mod coordinates;
pub mod crs;
pub mod error;
pub mod model;
pub mod outputs;
pub mod postprocess;
pub mod product;
pub mod regions;
pub mod snapshot;
pub mod table;

#[cfg(feature = "runtime")]
pub mod db;

pub use abundance::Abundance;
pub use config::{ProductConfig, RepeatPolicy};
pub use error::{ProductError, Result};
pub use model::{ColumnKey, Measurement, ProductInputs, PublicationLink, Sample, SampleRecord};
pub use product::{DataProduct, ProductBuilder, ProductReport};
pub use table::FlatTable;
