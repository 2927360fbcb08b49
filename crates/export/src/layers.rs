use std::fs::File;
use std::io::BufWriter;

use geo::Centroid;
use geojson::{Feature, FeatureCollection};
use serde_json::{json, Map, Value};

use stops::frames::RegionFrames;
use stops::RegionCrs;

use crate::ExportError;

fn joined(list: &[String]) -> String {
    list.join(";")
}

fn feature(geometry: Option<geojson::Value>, properties: Map<String, Value>) -> Feature {
    Feature {
        bbox: None,
        geometry: geometry.map(geojson::Geometry::new),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn write_collection(path: &str, features: Vec<Feature>) -> Result<(), ExportError> {
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, &collection)?;
    Ok(())
}

/// Writes the six GeoJSON layers of a region, geometries reprojected to the
/// geographic CRS.
pub fn write_layers(
    frames: &RegionFrames,
    crs: &RegionCrs,
    export_path: &str,
    region_code: &str,
) -> Result<(), ExportError> {
    let prefix = format!("{export_path}{region_code}_");

    let mut features = Vec::new();
    for (id, row) in &frames.stopos {
        let point = crs.to_lon_lat.point(row.geo)?;
        let mut props = Map::new();
        props.insert("id".into(), json!(id));
        props.insert("lon".into(), json!(row.lon));
        props.insert("lat".into(), json!(row.lat));
        props.insert("comments".into(), json!(joined(&row.obj.core.comments)));
        props.insert("warnings".into(), json!(joined(&row.obj.core.warnings)));
        props.insert("mods".into(), json!(row.mods.to_string()));
        props.insert("type".into(), json!("stopo"));
        features.push(feature(Some(geojson::Value::from(&point)), props));
    }
    write_collection(&format!("{prefix}stopos.geojson"), features)?;

    let mut features = Vec::new();
    for (id, row) in &frames.poles {
        let point = crs.to_lon_lat.point(row.geo)?;
        let mut props = Map::new();
        props.insert("id".into(), json!(id));
        props.insert("lon".into(), json!(row.lon));
        props.insert("lat".into(), json!(row.lat));
        // virtual poles have no source object and no modalities of their own
        match &row.obj {
            Some(obj) => {
                props.insert("comments".into(), json!(joined(&obj.core.comments)));
                props.insert("warnings".into(), json!(joined(&obj.core.warnings)));
                props.insert("mods".into(), json!(row.mods.to_string()));
                props.insert("maybe_mods".into(), json!(row.maybe_mods.to_string()));
            }
            None => {
                props.insert("comments".into(), json!(""));
                props.insert("warnings".into(), json!(""));
                props.insert("mods".into(), json!(""));
                props.insert("maybe_mods".into(), json!(""));
            }
        }
        props.insert("type".into(), json!("pole"));
        features.push(feature(Some(geojson::Value::from(&point)), props));
    }
    write_collection(&format!("{prefix}poles.geojson"), features)?;

    let mut features = Vec::new();
    for (id, row) in &frames.plafos {
        let surface = crs.to_lon_lat.geometry(&row.geo)?;
        let mut props = Map::new();
        props.insert("id".into(), json!(id));
        props.insert("lon".into(), json!(row.lon));
        props.insert("lat".into(), json!(row.lat));
        props.insert("comments".into(), json!(joined(&row.obj.core.comments)));
        props.insert("warnings".into(), json!(joined(&row.obj.core.warnings)));
        props.insert("mods".into(), json!(row.mods.to_string()));
        props.insert("maybe_mods".into(), json!(row.maybe_mods.to_string()));
        props.insert("type".into(), json!("plafo"));
        features.push(feature(Some(geojson::Value::from(&surface)), props));
    }
    write_collection(&format!("{prefix}plafos.geojson"), features)?;

    let mut outlines = Vec::new();
    let mut centroids = Vec::new();
    for (index, row) in frames.stops.iter().enumerate() {
        let stop_id = RegionFrames::stop_id(index);
        let mut props = Map::new();
        props.insert("index".into(), json!(stop_id));
        props.insert("lon".into(), json!(row.lon));
        props.insert("lat".into(), json!(row.lat));
        props.insert("warnings".into(), json!(joined(&row.warnings)));
        props.insert("mods".into(), json!(row.mods.to_string()));
        props.insert("maybe_mods".into(), json!(row.maybe_mods.to_string()));
        props.insert("render".into(), json!(row.render));
        props.insert("ptv2".into(), json!(row.ptv2));
        props.insert("member_comments".into(), json!(row.member_comments));
        props.insert("member_warnings".into(), json!(row.member_warnings));
        props.insert("plafo_id".into(), json!(row.plafo_id));
        props.insert("pole_id".into(), json!(row.pole_id));
        props.insert("stopo_id".into(), json!(row.stopo_id));
        props.insert("plole_id".into(), json!(row.plole_id));
        props.insert("type".into(), json!("stop"));
        props.insert("region".into(), json!(region_code));

        let outline = crs.to_lon_lat.geometry(&row.geo)?;
        outlines.push(feature(Some(geojson::Value::from(&outline)), props.clone()));
        let centroid = match row.geo.centroid() {
            Some(point) => Some(geojson::Value::from(&crs.to_lon_lat.point(point)?)),
            None => None,
        };
        centroids.push(feature(centroid, props));
    }
    write_collection(&format!("{prefix}stops.geojson"), outlines)?;
    write_collection(&format!("{prefix}nstops.geojson"), centroids)?;

    let mut features = Vec::new();
    for (index, row) in frames.dubobs.iter().enumerate() {
        let geometry = crs.to_lon_lat.geometry(&row.geo)?;
        let core = row.obj.core();
        let mut props = Map::new();
        props.insert("index".into(), json!(index));
        props.insert("lon".into(), json!(row.lon));
        props.insert("lat".into(), json!(row.lat));
        props.insert("osm_type".into(), json!(core.kind.as_str()));
        props.insert("osm_id".into(), json!(core.id));
        props.insert("warnings".into(), json!(joined(&core.warnings)));
        props.insert("comments".into(), json!(joined(&core.comments)));
        props.insert("type".into(), json!("dubob"));
        features.push(feature(Some(geojson::Value::from(&geometry)), props));
    }
    write_collection(&format!("{prefix}dubobs.geojson"), features)?;

    Ok(())
}
