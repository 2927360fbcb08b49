use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;

use indexmap::IndexMap;
use serde::Serialize;

use model::ObjectCore;
use stops::frames::{MatchInfo, RegionFrames};

use crate::ExportError;

const MATCH_KEYS: [&str; 7] = [
    "ref:IFOPT",
    "ref",
    "local_ref",
    "ref_name",
    "name",
    "layer",
    "level",
];

/// Full provenance of one matching decision, one file per plole.
#[derive(Debug, Serialize)]
struct PloleRecord {
    plole_id: i64,
    plafo_id: i64,
    pole_id: i64,
    plole_mods: Vec<&'static str>,
    plole_maybe_mods: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plafo_mods: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plafo_maybe_mods: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plafo_lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plafo_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pole_mods: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pole_maybe_mods: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pole_lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pole_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plafo_tags: Option<IndexMap<&'static str, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pole_tags: Option<IndexMap<&'static str, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plafo_stopos: Option<BTreeMap<i64, CandidateDetail>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pole_stopos: Option<BTreeMap<i64, CandidateDetail>>,
    plole_stopos: BTreeMap<i64, ChosenDetail>,
}

/// One nearby stopo of a plafo or pole, with the raw match components.
#[derive(Debug, Serialize)]
struct CandidateDetail {
    mods_match: bool,
    #[serde(rename = "ref:IFOPT_match", skip_serializing_if = "Option::is_none")]
    ifopt_match: Option<i8>,
    #[serde(rename = "ref_match", skip_serializing_if = "Option::is_none")]
    reference_match: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    local_ref_match: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ref_name_match: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name_match: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    layer_match: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    level_match: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
    #[serde(rename = "ref:IFOPT")]
    ifopt: String,
    #[serde(rename = "ref")]
    reference: String,
    local_ref: String,
    ref_name: String,
    name: String,
    layer: String,
    level: String,
    mods: Vec<&'static str>,
    lon: f64,
    lat: f64,
}

/// One stopo of the assembled plole: where it went and why.
#[derive(Debug, Serialize)]
struct ChosenDetail {
    score: f64,
    stop_id: i64,
    reason: String,
    mods: Vec<&'static str>,
    lon: f64,
    lat: f64,
}

fn match_tags(core: &ObjectCore) -> IndexMap<&'static str, String> {
    MATCH_KEYS
        .iter()
        .map(|key| (*key, core.tags.get(key).unwrap_or_default().to_owned()))
        .collect()
}

fn candidate_details(
    frames: &RegionFrames,
    infos: &IndexMap<i64, MatchInfo>,
) -> BTreeMap<i64, CandidateDetail> {
    let mut details = BTreeMap::new();
    for (stopo_id, info) in infos {
        let Some(stopo) = frames.stopos.get(stopo_id) else {
            continue;
        };
        let tags = match_tags(&stopo.obj.core);
        details.insert(
            *stopo_id,
            CandidateDetail {
                mods_match: info.mods_match,
                ifopt_match: info.parts.map(|p| p.ifopt),
                reference_match: info.parts.map(|p| p.reference),
                local_ref_match: info.parts.map(|p| p.local_ref),
                ref_name_match: info.parts.map(|p| p.ref_name),
                name_match: info.parts.map(|p| p.name),
                layer_match: info.parts.map(|p| p.layer),
                level_match: info.parts.map(|p| p.level),
                score: info.score,
                ifopt: tags["ref:IFOPT"].clone(),
                reference: tags["ref"].clone(),
                local_ref: tags["local_ref"].clone(),
                ref_name: tags["ref_name"].clone(),
                name: tags["name"].clone(),
                layer: tags["layer"].clone(),
                level: tags["level"].clone(),
                mods: stopo.mods.names(),
                lon: stopo.lon,
                lat: stopo.lat,
            },
        );
    }
    details
}

/// Writes the matching provenance of every plole as one JSON file under the
/// configured path.
pub fn write_ploles(
    frames: &RegionFrames,
    ploles_path: &str,
    region_code: &str,
) -> Result<(), ExportError> {
    for (plole_index, plole) in frames.ploles.iter().enumerate() {
        let plafo = (plole.plafo_id != 0)
            .then(|| frames.plafos.get(&plole.plafo_id))
            .flatten();
        let pole = (plole.pole_id > 0)
            .then(|| frames.poles.get(&plole.pole_id))
            .flatten();

        let mut chosen = BTreeMap::new();
        for (stopo_id, info) in &plole.stopo_infos {
            if !info.mods_match || info.score.unwrap_or(0.0) <= 0.0 {
                continue;
            }
            let Some(stopo) = frames.stopos.get(stopo_id) else {
                continue;
            };
            let (stop_id, reason) = match info.stop_id {
                Some(stop_id) => (
                    stop_id,
                    frames.stops[RegionFrames::stop_index(stop_id)]
                        .stopo_reason
                        .clone(),
                ),
                None => (
                    -1,
                    "not required by this plole and better score with other plole".to_owned(),
                ),
            };
            chosen.insert(
                *stopo_id,
                ChosenDetail {
                    score: info.score.unwrap_or(0.0),
                    stop_id,
                    reason,
                    mods: stopo.mods.names(),
                    lon: stopo.lon,
                    lat: stopo.lat,
                },
            );
        }

        let record = PloleRecord {
            plole_id: plole_index as i64,
            plafo_id: plole.plafo_id,
            pole_id: plole.pole_id,
            plole_mods: plole.mods.names(),
            plole_maybe_mods: plole.maybe_mods.names(),
            plafo_mods: plafo.map(|row| row.mods.names()),
            plafo_maybe_mods: plafo.map(|row| row.maybe_mods.names()),
            plafo_lon: plafo.map(|row| row.lon),
            plafo_lat: plafo.map(|row| row.lat),
            pole_mods: pole.map(|row| row.mods.names()),
            pole_maybe_mods: pole.map(|row| row.maybe_mods.names()),
            pole_lon: pole.map(|row| row.lon),
            pole_lat: pole.map(|row| row.lat),
            plafo_tags: plafo.map(|row| match_tags(&row.obj.core)),
            pole_tags: pole
                .and_then(|row| row.obj.as_ref())
                .map(|obj| match_tags(&obj.core)),
            plafo_stopos: plafo.map(|row| candidate_details(frames, &row.stopo.infos)),
            pole_stopos: pole.map(|row| candidate_details(frames, &row.stopo.infos)),
            plole_stopos: chosen,
        };

        let path = format!("{ploles_path}{region_code}{plole_index}.json");
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &record)?;
    }
    Ok(())
}
