// crates/geochem-core/src/error.rs

use thiserror::Error;

use crate::code_tables::LookupError;
use crate::coordinates::ReprojectionError;

/// Conditions that abort a product run. Loaders, config and output writers
/// report through their own error types.
#[derive(Error, Debug)]
pub enum ProductError {
    #[error("code table lookup failed: {0}")]
    Lookup(#[from] LookupError),

    #[error("coordinate reprojection failed: {0}")]
    Reprojection(#[from] ReprojectionError),
}

pub type Result<T> = std::result::Result<T, ProductError>;
