use std::error;
use std::fmt;

use async_trait::async_trait;
use indexmap::IndexMap;

use model::{Area, AreaError, Node, Way};
use overpass::{ApiError, Elements};
use utility::crs::CrsError;

use crate::annotate;
use crate::assemble;
use crate::classify::classify;
use crate::frames::{RegionFrames, ScoreParts};
use crate::ingest::build_frames;
use crate::matcher::{self, AnchorGeo, Candidates};
use crate::plole::build_ploles;
use crate::tracks;
use crate::{EngineParams, RegionCrs};

/// All public-transport related objects of a region. Nodes and ways with
/// private access are excluded, relations are limited to multipolygons, and
/// the trailing recursion downloads the member skeletons.
const REGION_QUERY: &str = r#"area({area_id})->.roi;
(
    nwr["highway"~"^((bus_stop|platform);?)*$"](area.roi);
    nwr["public_transport"~"^((stop_position|platform|station);?)*$"](area.roi);
    nwr["amenity"~"^((bus_stop|bus_station|ferry_terminal);?)*$"](area.roi);
    nwr["railway"~"^((platform|station|halt|stop|tram_stop);?)*$"](area.roi);
    nwr["station"~"^((subway|light_rail|train|monorail|funicular|tram);?)*$"](area.roi);
    nwr["aerialway"~"^((yes|station);?)*$"](area.roi);
    nwr["share_taxi"="yes"](area.roi);
    nwr["shared_taxi"="yes"](area.roi);
)->.all;
(
    nw.all["access"!="private"];
    rel.all["type"="multipolygon"];
);
out;

>;
out skel;
"#;

pub fn region_query(area_id: i64) -> String {
    REGION_QUERY.replace("{area_id}", &area_id.to_string())
}

#[derive(Debug)]
pub enum ProcessError {
    Query(ApiError),
    EmptyDownload,
    Area(AreaError),
    Crs(CrsError),
}

impl error::Error for ProcessError {}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProcessError::Query(e) => write!(f, "query service error: {}", e),
            ProcessError::EmptyDownload => write!(f, "query service returned no objects"),
            ProcessError::Area(e) => write!(f, "area construction error: {}", e),
            ProcessError::Crs(e) => write!(f, "{}", e),
        }
    }
}

impl From<ApiError> for ProcessError {
    fn from(e: ApiError) -> Self {
        ProcessError::Query(e)
    }
}

impl From<AreaError> for ProcessError {
    fn from(e: AreaError) -> Self {
        ProcessError::Area(e)
    }
}

impl From<CrsError> for ProcessError {
    fn from(e: CrsError) -> Self {
        ProcessError::Crs(e)
    }
}

/// The engine's seam to the tagged-object query service: one call for the
/// region's objects, one for the tracks connected to a set of nodes.
#[async_trait]
pub trait ObjectSource {
    async fn region_objects(&self, area_id: i64) -> Result<Elements, ApiError>;

    async fn track_ways(&self, node_ids: &[i64]) -> Result<Vec<Way>, ApiError>;
}

#[async_trait]
impl ObjectSource for overpass::Client {
    async fn region_objects(&self, area_id: i64) -> Result<Elements, ApiError> {
        self.fetch(&region_query(area_id)).await
    }

    async fn track_ways(&self, node_ids: &[i64]) -> Result<Vec<Way>, ApiError> {
        Ok(self.fetch(&tracks::track_query(node_ids)).await?.ways)
    }
}

/// Reconstructs the normalized stops of one region.
///
/// Purely synchronous between the two query-service calls; the result
/// frames are deterministic for a fixed input.
pub async fn process_region<S: ObjectSource + Sync>(
    source: &S,
    params: &EngineParams,
    crs: &RegionCrs,
    area_id: i64,
) -> Result<RegionFrames, ProcessError> {
    log::info!("sending query to overpass");
    let elements = source.region_objects(area_id).await?;
    if elements.is_empty() {
        log::error!("overpass did not return anything, aborting");
        return Err(ProcessError::EmptyDownload);
    }

    let nodes: IndexMap<i64, Node> = elements
        .nodes
        .into_iter()
        .map(|node| (node.core.id, node))
        .collect();
    let ways: IndexMap<i64, Way> = elements
        .ways
        .into_iter()
        .map(|way| (way.core.id, way))
        .collect();
    let mut areas: Vec<Area> = ways.values().map(|way| Area::from_way(way, &nodes)).collect();
    for rel in &elements.rels {
        areas.push(Area::from_relation(rel, &nodes, &ways)?);
    }
    log::info!("areas: {}", areas.len());

    let bins = classify(&nodes, areas);
    let mut frames = build_frames(bins, &crs.to_meters, params)?;

    // track context for stopos and poles
    let stopo_ids: Vec<i64> = frames.stopos.keys().copied().collect();
    if !stopo_ids.is_empty() {
        let track_ways = source.track_ways(&stopo_ids).await?;
        tracks::assign_tracks(&mut frames.stopos, &track_ways);
    }
    let pole_ids: Vec<i64> = frames.poles.keys().copied().collect();
    if !pole_ids.is_empty() {
        let track_ways = source.track_ways(&pole_ids).await?;
        tracks::assign_tracks(&mut frames.poles, &track_ways);
    }
    tracks::seal_stopos(&mut frames);
    tracks::seal_poles(&mut frames);

    log::info!("dubious objects: {}", frames.dubobs.len());
    for row in &frames.dubobs {
        log::info!(
            "{} {:?} {:?}",
            row.obj.core(),
            row.obj.core().comments,
            row.obj.core().warnings
        );
    }
    log::info!("stop positions: {}", frames.stopos.len());
    log::info!("poles: {}", frames.poles.len());
    log::info!("platforms: {}", frames.plafos.len());

    run_matchers(&mut frames, params);
    build_ploles(&mut frames);
    assemble::build_stops(&mut frames);
    assemble::add_virtual_poles(&mut frames);
    assemble::build_stop_outlines(&mut frames, crs, params.stop_buffer_size)?;

    annotate::derive_stop_mods(&mut frames);
    annotate::warn_empty_mods(&mut frames);
    annotate::flag_member_diagnostics(&mut frames);
    annotate::grade_render(&mut frames);
    annotate::upgrade_station_stops(&mut frames);
    annotate::grade_ptv2(&mut frames);
    annotate::set_popup_anchors(&mut frames, crs)?;

    Ok(frames)
}

/// The three matcher runs: stopos against poles, stopos against plafos,
/// poles against plafos.
fn run_matchers(frames: &mut RegionFrames, params: &EngineParams) {
    let stopo_candidates = Candidates::new(
        frames
            .stopos
            .iter()
            .map(|(id, row)| (*id, row.geo))
            .collect(),
    );

    let results = matcher::get_nearby(
        frames
            .poles
            .iter()
            .map(|(id, row)| (*id, AnchorGeo::Point(&row.geo))),
        &stopo_candidates,
        params.pole_stopo_dist,
        |pole_id, stopo_id| {
            let pole = &frames.poles[&pole_id];
            (pole.mods | pole.maybe_mods).intersects(frames.stopos[&stopo_id].mods)
        },
        |pole_id, stopo_id| match &frames.poles[&pole_id].obj {
            Some(obj) => {
                matcher::score_stopo_to_plole(&obj.core, &frames.stopos[&stopo_id].obj.core)
            }
            None => ScoreParts::default(),
        },
    );
    for (id, list) in results {
        if let Some(row) = frames.poles.get_mut(&id) {
            row.stopo = list;
        }
    }

    let results = matcher::get_nearby(
        frames
            .plafos
            .iter()
            .map(|(id, row)| (*id, AnchorGeo::Surface(&row.geo))),
        &stopo_candidates,
        params.plafo_stopo_dist,
        |plafo_id, stopo_id| {
            let plafo = &frames.plafos[&plafo_id];
            (plafo.mods | plafo.maybe_mods).intersects(frames.stopos[&stopo_id].mods)
        },
        |plafo_id, stopo_id| {
            matcher::score_stopo_to_plole(
                &frames.plafos[&plafo_id].obj.core,
                &frames.stopos[&stopo_id].obj.core,
            )
        },
    );
    for (id, list) in results {
        if let Some(row) = frames.plafos.get_mut(&id) {
            row.stopo = list;
        }
    }

    let pole_candidates = Candidates::new(
        frames
            .poles
            .iter()
            .map(|(id, row)| (*id, row.geo))
            .collect(),
    );
    let results = matcher::get_nearby(
        frames
            .plafos
            .iter()
            .map(|(id, row)| (*id, AnchorGeo::Surface(&row.geo))),
        &pole_candidates,
        params.plafo_pole_dist,
        |plafo_id, pole_id| {
            let plafo = &frames.plafos[&plafo_id];
            let pole = &frames.poles[&pole_id];
            let plafo_all = plafo.mods | plafo.maybe_mods;
            (!pole.mods.is_empty() && pole.mods.is_subset(plafo_all))
                || (pole.mods.is_empty() && pole.maybe_mods.intersects(plafo_all))
        },
        |plafo_id, pole_id| match &frames.poles[&pole_id].obj {
            Some(obj) => {
                matcher::score_pole_to_plafo(&frames.plafos[&plafo_id].obj.core, &obj.core)
            }
            None => ScoreParts::default(),
        },
    );
    for (id, list) in results {
        if let Some(row) = frames.plafos.get_mut(&id) {
            row.pole = list;
        }
    }
}
