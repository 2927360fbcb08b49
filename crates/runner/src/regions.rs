use std::error::Error;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// The offset turning an OSM relation id into an Overpass area id.
pub const AREA_ID_OFFSET: i64 = 3_600_000_000;

/// One row of the region manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub osm_id: i64,
    pub code: String,
    pub admin_level: u8,
    pub name: String,
    pub meters_crs: String,
    pub ignore: bool,
    pub timestamp: u64,
}

impl Region {
    pub fn area_id(&self) -> i64 {
        self.osm_id + AREA_ID_OFFSET
    }
}

pub fn load_regions(path: &Path) -> Result<Vec<Region>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut regions = Vec::new();
    for row in reader.deserialize() {
        regions.push(row?);
    }
    Ok(regions)
}

pub fn save_regions(path: &Path, regions: &[Region]) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    for region in regions {
        writer.serialize(region)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_round_trip() {
        let rows = "osm_id,code,admin_level,name,meters_crs,ignore,timestamp\n\
                    27021,ki,6,Kiel,+proj=aeqd +lat_0=54.3 +lon_0=10.1 +datum=WGS84 +units=m +no_defs,false,0\n";
        let mut reader = csv::Reader::from_reader(rows.as_bytes());
        let regions: Vec<Region> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].code, "ki");
        assert_eq!(regions[0].area_id(), 3_600_027_021);
        assert!(!regions[0].ignore);

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(&regions[0]).unwrap();
        let written = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert!(written.starts_with("osm_id,code,admin_level,name,meters_crs,ignore,timestamp"));
        assert!(written.contains("27021,ki,6,Kiel"));
    }
}
