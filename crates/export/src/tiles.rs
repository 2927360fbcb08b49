use std::process::Command;

use crate::{ExportError, ExportPaths};

struct TileSpec {
    file: &'static str,
    layer: &'static str,
    base_zoom: u8,
    min_zoom: u8,
    max_zoom: u8,
}

/// Detail layers render only at the highest zooms; the centroid and review
/// layers cover the whole zoom range.
const TILE_SPECS: [TileSpec; 6] = [
    TileSpec {
        file: "stops",
        layer: "a_stops",
        base_zoom: 18,
        min_zoom: 18,
        max_zoom: 19,
    },
    TileSpec {
        file: "plafos",
        layer: "b_plafos",
        base_zoom: 18,
        min_zoom: 18,
        max_zoom: 19,
    },
    TileSpec {
        file: "poles",
        layer: "c_poles",
        base_zoom: 18,
        min_zoom: 18,
        max_zoom: 19,
    },
    TileSpec {
        file: "stopos",
        layer: "d_stopos",
        base_zoom: 18,
        min_zoom: 18,
        max_zoom: 19,
    },
    TileSpec {
        file: "nstops",
        layer: "e_nstops",
        base_zoom: 11,
        min_zoom: 0,
        max_zoom: 17,
    },
    TileSpec {
        file: "dubobs",
        layer: "f_dubobs",
        base_zoom: 11,
        min_zoom: 0,
        max_zoom: 19,
    },
];

/// Rasterizes the exported GeoJSON layers into mbtiles by shelling out to
/// tippecanoe.
pub fn write_tiles(paths: &ExportPaths, region_code: &str) -> Result<(), ExportError> {
    log::info!("making tiles...");
    for spec in &TILE_SPECS {
        let input = format!("{}{}_{}.geojson", paths.export_path, region_code, spec.file);
        let output = format!("{}{}_{}.mbtiles", paths.tiles_path, region_code, spec.file);
        let status = Command::new("tippecanoe")
            .arg(format!("--base-zoom={}", spec.base_zoom))
            .arg(format!("--minimum-zoom={}", spec.min_zoom))
            .arg(format!("--maximum-zoom={}", spec.max_zoom))
            .args([
                "--buffer=20",
                "--drop-densest-as-needed",
                "--no-clipping",
                "--no-tile-compression",
                "--force",
            ])
            .args(["-t", &paths.tiles_tmp_path])
            .arg(format!("--layer={}", spec.layer))
            .arg(format!("--output={output}"))
            .arg(&input)
            .status()?;
        if !status.success() {
            return Err(ExportError::Tiles { layer: spec.layer });
        }
    }
    log::info!("...done");
    Ok(())
}
