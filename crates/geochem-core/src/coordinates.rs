use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use serde::Serialize;
use thiserror::Error;

use crate::config::{ProductConfig, UtmBand};
use crate::crs::CrsRegistry;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReprojectionError {
    #[error("EPSG:{epsg} is not a supported reference system")]
    UnsupportedCrs { epsg: u32 },
    #[error("invalid definition for EPSG:{epsg}: {message}")]
    InvalidDefinition { epsg: u32, message: String },
    #[error("EPSG:{source_epsg} -> EPSG:{target_epsg} transform failed for ({x}, {y}): {message}")]
    Transform {
        source_epsg: u32,
        target_epsg: u32,
        x: String,
        y: String,
        message: String,
    },
}

/// Reference-system transform service: `source` coordinates in, `target` coordinates out.
pub trait Reprojector {
    fn reproject(
        &self,
        x: f64,
        y: f64,
        source_epsg: u32,
        target_epsg: u32,
    ) -> Result<(f64, f64), ReprojectionError>;
}

struct Transformer {
    source: Proj,
    target: Proj,
    source_is_geographic: bool,
    target_is_geographic: bool,
}

impl Transformer {
    fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), String> {
        let (in_x, in_y) = if self.source_is_geographic {
            (x.to_radians(), y.to_radians())
        } else {
            (x, y)
        };

        let mut point = (in_x, in_y, 0.0);
        transform(&self.source, &self.target, &mut point).map_err(|e| format!("{e:?}"))?;

        if self.target_is_geographic {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }
}

/// [`Reprojector`] backed by `proj4rs`, caching one transformer per system pair.
pub struct Proj4Reprojector {
    registry: CrsRegistry,
    cache: RefCell<HashMap<(u32, u32), Rc<Transformer>>>,
}

impl Proj4Reprojector {
    pub fn new(registry: CrsRegistry) -> Self {
        Self {
            registry,
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn transformer(&self, source_epsg: u32, target_epsg: u32) -> Result<Rc<Transformer>, ReprojectionError> {
        if let Some(cached) = self.cache.borrow().get(&(source_epsg, target_epsg)) {
            return Ok(Rc::clone(cached));
        }

        let (source, source_is_geographic) = self.load(source_epsg)?;
        let (target, target_is_geographic) = self.load(target_epsg)?;
        let transformer = Rc::new(Transformer {
            source,
            target,
            source_is_geographic,
            target_is_geographic,
        });
        self.cache
            .borrow_mut()
            .insert((source_epsg, target_epsg), Rc::clone(&transformer));
        Ok(transformer)
    }

    /// Whether a system takes degrees is read off the parsed definition, not
    /// configured alongside it.
    fn load(&self, epsg: u32) -> Result<(Proj, bool), ReprojectionError> {
        let definition = self
            .registry
            .get(epsg)
            .ok_or(ReprojectionError::UnsupportedCrs { epsg })?;
        let proj = Proj::from_proj_string(&definition.proj).map_err(|e| {
            ReprojectionError::InvalidDefinition {
                epsg,
                message: format!("{e:?}"),
            }
        })?;
        let geographic = proj.is_latlong();
        Ok((proj, geographic))
    }
}

impl Default for Proj4Reprojector {
    fn default() -> Self {
        Self::new(CrsRegistry::new())
    }
}

impl Reprojector for Proj4Reprojector {
    fn reproject(
        &self,
        x: f64,
        y: f64,
        source_epsg: u32,
        target_epsg: u32,
    ) -> Result<(f64, f64), ReprojectionError> {
        if source_epsg == target_epsg {
            return Ok((x, y));
        }
        let transformer = self.transformer(source_epsg, target_epsg)?;
        transformer
            .transform(x, y)
            .map_err(|message| ReprojectionError::Transform {
                source_epsg,
                target_epsg,
                x: x.to_string(),
                y: y.to_string(),
                message,
            })
    }
}

/// A point in the canonical geographic reference system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeographicPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeographicPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// Projected grid position, truncated to whole metres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UtmCoordinate {
    pub easting: i64,
    pub northing: i64,
    pub zone: i32,
}

impl UtmCoordinate {
    /// Emitted for longitudes outside every configured band.
    pub const OUT_OF_BAND: UtmCoordinate = UtmCoordinate {
        easting: -1,
        northing: -1,
        zone: -1,
    };

    pub fn is_out_of_band(&self) -> bool {
        *self == Self::OUT_OF_BAND
    }
}

/// Brings raw sample locations into the canonical reference and onto the UTM grid.
pub struct CoordinateNormalizer {
    canonical_epsg: u32,
    bands: Vec<UtmBand>,
    reprojector: Box<dyn Reprojector>,
}

impl CoordinateNormalizer {
    pub fn new(canonical_epsg: u32, bands: Vec<UtmBand>, reprojector: Box<dyn Reprojector>) -> Self {
        Self {
            canonical_epsg,
            bands,
            reprojector,
        }
    }

    /// Normalizer with the `proj4rs` backend and the configured reference systems.
    pub fn from_config(config: &ProductConfig) -> Self {
        let registry = CrsRegistry::with_definitions(config.crs.iter().cloned());
        Self::new(
            config.canonical_epsg,
            config.utm_bands.clone(),
            Box::new(Proj4Reprojector::new(registry)),
        )
    }

    pub fn canonical_epsg(&self) -> u32 {
        self.canonical_epsg
    }

    pub fn bands(&self) -> &[UtmBand] {
        &self.bands
    }

    pub fn to_canonical(&self, x: f64, y: f64, source_epsg: u32) -> Result<GeographicPoint, ReprojectionError> {
        if source_epsg == self.canonical_epsg {
            return Ok(GeographicPoint::new(x, y));
        }
        let (longitude, latitude) =
            self.reprojector
                .reproject(x, y, source_epsg, self.canonical_epsg)?;
        Ok(GeographicPoint::new(longitude, latitude))
    }

    /// First band in configuration order whose edges include `longitude`.
    pub fn band_for(&self, longitude: f64) -> Option<&UtmBand> {
        self.bands.iter().find(|band| band.contains(longitude))
    }

    pub fn to_utm(&self, point: GeographicPoint) -> Result<UtmCoordinate, ReprojectionError> {
        let Some(band) = self.band_for(point.longitude) else {
            return Ok(UtmCoordinate::OUT_OF_BAND);
        };
        let (easting, northing) = self.reprojector.reproject(
            point.longitude,
            point.latitude,
            self.canonical_epsg,
            band.epsg,
        )?;
        Ok(UtmCoordinate {
            easting: easting.trunc() as i64,
            northing: northing.trunc() as i64,
            zone: band.zone,
        })
    }
}

/// Elevations are reported to the nearest metre, halves away from zero.
pub fn round_elevation(z: f64) -> i64 {
    z.round() as i64
}
