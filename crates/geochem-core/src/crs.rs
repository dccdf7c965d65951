//! Proj definitions for the reference systems that appear in staged sample
//! locations, keyed by EPSG identifier.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrsDefinition {
    pub epsg: u32,
    pub proj: String,
}

const NAD83_TOWGS84: &str = "+ellps=GRS80 +towgs84=0,0,0,0,0,0,0";
const NAD27_TOWGS84: &str = "+ellps=clrk66 +towgs84=-8,160,176,0,0,0,0";

static NAMED: Lazy<HashMap<u32, CrsDefinition>> = Lazy::new(|| {
    [
        (4269, format!("+proj=longlat {NAD83_TOWGS84} +no_defs")),
        (4326, "+proj=longlat +datum=WGS84 +no_defs".to_string()),
        (4267, format!("+proj=longlat {NAD27_TOWGS84} +no_defs")),
        (
            3005,
            format!(
                "+proj=aea +lat_0=45 +lon_0=-126 +lat_1=50 +lat_2=58.5 +x_0=1000000 +y_0=0 {NAD83_TOWGS84} +units=m +no_defs"
            ),
        ),
    ]
    .into_iter()
    .map(|(epsg, proj)| (epsg, CrsDefinition { epsg, proj }))
    .collect()
});

fn utm_definition(epsg: u32) -> Option<CrsDefinition> {
    let proj = match epsg {
        26901..=26923 => format!(
            "+proj=utm +zone={} {NAD83_TOWGS84} +units=m +no_defs",
            epsg - 26900
        ),
        26701..=26722 => format!(
            "+proj=utm +zone={} {NAD27_TOWGS84} +units=m +no_defs",
            epsg - 26700
        ),
        32601..=32660 => format!(
            "+proj=utm +zone={} +datum=WGS84 +units=m +no_defs",
            epsg - 32600
        ),
        _ => return None,
    };
    Some(CrsDefinition { epsg, proj })
}

/// Built-in definitions plus any supplied through configuration. Configured
/// entries shadow built-in ones with the same identifier.
#[derive(Debug, Clone, Default)]
pub struct CrsRegistry {
    overrides: HashMap<u32, CrsDefinition>,
}

impl CrsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definitions(definitions: impl IntoIterator<Item = CrsDefinition>) -> Self {
        let overrides = definitions
            .into_iter()
            .map(|definition| (definition.epsg, definition))
            .collect();
        Self { overrides }
    }

    pub fn get(&self, epsg: u32) -> Option<CrsDefinition> {
        self.overrides
            .get(&epsg)
            .or_else(|| NAMED.get(&epsg))
            .cloned()
            .or_else(|| utm_definition(epsg))
    }

    pub fn contains(&self, epsg: u32) -> bool {
        self.get(epsg).is_some()
    }
}
