use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use export::ExportPaths;
use stops::EngineParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionsMode {
    Include,
    Exclude,
}

/// Run configuration, read from a JSON file. Distances and buffer widths
/// are in the metric units of the per-region CRS.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub overpass_url: String,
    pub overpass_key: String,
    pub overpass_timeout: u64,
    pub lon_lat_crs: String,
    pub web_crs: String,
    pub half_plafo_width: f64,
    pub station_radius: f64,
    pub pole_stopo_dist: f64,
    pub plafo_stopo_dist: f64,
    pub plafo_pole_dist: f64,
    pub stop_buffer_size: f64,
    pub regions_path: String,
    pub export_path: String,
    pub tiles_path: String,
    pub tiles_tmp_path: String,
    #[serde(default)]
    pub logs_path: String,
    pub ploles_path: String,
    #[serde(default = "default_regions_mode")]
    pub regions_mode: RegionsMode,
    #[serde(default)]
    pub regions_codes: Vec<String>,
    #[serde(default)]
    pub debug: bool,
}

fn default_regions_mode() -> RegionsMode {
    RegionsMode::Exclude
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Region selection: an empty code list selects everything in either
    /// mode.
    pub fn wants_region(&self, code: &str) -> bool {
        if self.regions_codes.is_empty() {
            return true;
        }
        let listed = self.regions_codes.iter().any(|c| c == code);
        match self.regions_mode {
            RegionsMode::Include => listed,
            RegionsMode::Exclude => !listed,
        }
    }

    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            half_plafo_width: self.half_plafo_width,
            station_radius: self.station_radius,
            pole_stopo_dist: self.pole_stopo_dist,
            plafo_stopo_dist: self.plafo_stopo_dist,
            plafo_pole_dist: self.plafo_pole_dist,
            stop_buffer_size: self.stop_buffer_size,
        }
    }

    pub fn export_paths(&self) -> ExportPaths {
        ExportPaths {
            export_path: self.export_path.clone(),
            ploles_path: self.ploles_path.clone(),
            tiles_path: self.tiles_path.clone(),
            tiles_tmp_path: self.tiles_tmp_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(mode: RegionsMode, codes: &[&str]) -> Config {
        Config {
            overpass_url: String::new(),
            overpass_key: String::new(),
            overpass_timeout: 600,
            lon_lat_crs: String::new(),
            web_crs: String::new(),
            half_plafo_width: 2.0,
            station_radius: 50.0,
            pole_stopo_dist: 30.0,
            plafo_stopo_dist: 30.0,
            plafo_pole_dist: 20.0,
            stop_buffer_size: 5.0,
            regions_path: String::new(),
            export_path: String::new(),
            tiles_path: String::new(),
            tiles_tmp_path: String::new(),
            logs_path: String::new(),
            ploles_path: String::new(),
            regions_mode: mode,
            regions_codes: codes.iter().map(|c| c.to_string()).collect(),
            debug: false,
        }
    }

    #[test]
    fn region_selection_modes() {
        let include = config_with(RegionsMode::Include, &["ki"]);
        assert!(include.wants_region("ki"));
        assert!(!include.wants_region("hl"));

        let exclude = config_with(RegionsMode::Exclude, &["ki"]);
        assert!(!exclude.wants_region("ki"));
        assert!(exclude.wants_region("hl"));

        let all = config_with(RegionsMode::Include, &[]);
        assert!(all.wants_region("ki"));
    }

    #[test]
    fn defaults_cover_optional_keys() {
        let raw = r#"{
            "overpass_url": "https://overpass.example/api/interpreter",
            "overpass_key": "secret",
            "overpass_timeout": 600,
            "lon_lat_crs": "+proj=longlat +datum=WGS84 +no_defs",
            "web_crs": "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs",
            "half_plafo_width": 2.0,
            "station_radius": 50.0,
            "pole_stopo_dist": 30.0,
            "plafo_stopo_dist": 30.0,
            "plafo_pole_dist": 20.0,
            "stop_buffer_size": 5.0,
            "regions_path": "regions.csv",
            "export_path": "export/",
            "tiles_path": "tiles/",
            "tiles_tmp_path": "tiles_tmp/",
            "ploles_path": "ploles/"
        }"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.regions_mode, RegionsMode::Exclude);
        assert!(config.regions_codes.is_empty());
        assert!(!config.debug);
        assert!(config.logs_path.is_empty());
    }
}
