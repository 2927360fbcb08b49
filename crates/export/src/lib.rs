use std::error;
use std::fmt;
use std::io;

use utility::crs::CrsError;

pub mod layers;
pub mod ploles;
pub mod tiles;

/// Directories the per-region outputs land in, each with a trailing
/// separator as configured.
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub export_path: String,
    pub ploles_path: String,
    pub tiles_path: String,
    pub tiles_tmp_path: String,
}

#[derive(Debug)]
pub enum ExportError {
    Io(io::Error),
    Json(serde_json::Error),
    Crs(CrsError),
    Tiles { layer: &'static str },
}

impl error::Error for ExportError {}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "export I/O error: {}", e),
            ExportError::Json(e) => write!(f, "export serialization error: {}", e),
            ExportError::Crs(e) => write!(f, "{}", e),
            ExportError::Tiles { layer } => {
                write!(f, "tippecanoe failed for layer {}", layer)
            }
        }
    }
}

impl From<io::Error> for ExportError {
    fn from(e: io::Error) -> Self {
        ExportError::Io(e)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::Json(e)
    }
}

impl From<CrsError> for ExportError {
    fn from(e: CrsError) -> Self {
        ExportError::Crs(e)
    }
}

/// Writes every per-region output: the GeoJSON layers, the per-plole
/// provenance files and the vector tiles.
pub fn export_region(
    frames: &stops::frames::RegionFrames,
    crs: &stops::RegionCrs,
    paths: &ExportPaths,
    region_code: &str,
) -> Result<(), ExportError> {
    layers::write_layers(frames, crs, &paths.export_path, region_code)?;
    ploles::write_ploles(frames, &paths.ploles_path, region_code)?;
    tiles::write_tiles(paths, region_code)?;
    Ok(())
}
