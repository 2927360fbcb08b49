use utility::crs::{CrsError, Transformer};

pub mod annotate;
pub mod assemble;
pub mod classify;
pub mod frames;
pub mod ingest;
pub mod matcher;
pub mod pipeline;
pub mod plole;
pub mod tracks;

pub use pipeline::{process_region, region_query, ObjectSource, ProcessError};

/// Distance and buffer settings of the reconstruction, in metric units.
#[derive(Debug, Clone)]
pub struct EngineParams {
    pub half_plafo_width: f64,
    pub station_radius: f64,
    pub pole_stopo_dist: f64,
    pub plafo_stopo_dist: f64,
    pub plafo_pole_dist: f64,
    pub stop_buffer_size: f64,
}

/// The coordinate systems a region is processed in: geographic degrees for
/// ingest and export, a region-local metric CRS for buffering and distance
/// queries, and the web projection for tile-friendly stop outlines.
pub struct RegionCrs {
    pub to_meters: Transformer,
    pub to_lon_lat: Transformer,
    pub meters_to_web: Transformer,
    pub web_to_meters: Transformer,
}

impl RegionCrs {
    pub fn new(lon_lat_def: &str, meters_def: &str, web_def: &str) -> Result<Self, CrsError> {
        Ok(Self {
            to_meters: Transformer::new(lon_lat_def, meters_def)?,
            to_lon_lat: Transformer::new(meters_def, lon_lat_def)?,
            meters_to_web: Transformer::new(meters_def, web_def)?,
            web_to_meters: Transformer::new(web_def, meters_def)?,
        })
    }
}
