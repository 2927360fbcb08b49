use geo::{Centroid, Closest, ClosestPoint, Coord, MultiPolygon, Point};
use indexmap::IndexMap;

use model::ModSet;
use utility::crs::CrsError;
use utility::geometry;

use crate::frames::{PoleRow, RegionFrames, StopRow};
use crate::RegionCrs;

const REASON_BEST: &str = "best match by score (and modalities match)";
const REASON_NEW_MODALITY: &str = "adds relevant modality to plole";
const REASON_THIRD_CHOICE: &str =
    "third choice for all nearby ploles; best score with this plole";

/// Expands the plole list into stops.
///
/// Pass A gives every plole its best-scoring stop position. Pass B walks
/// the remaining candidates and appends those that contribute a new
/// modality, postponing unused leftovers to the plole offering the best
/// score. Pass C emits stops for orphan stop positions and for ploles with
/// no stop position at all.
pub fn build_stops(frames: &mut RegionFrames) {
    // pass A: primary stopo per plole
    for plole_index in 0..frames.ploles.len() {
        let Some(&stopo_id) = frames.ploles[plole_index].stopo_ids.first() else {
            continue;
        };
        push_stop(frames, plole_index, stopo_id, REASON_BEST);
    }

    // pass B: additional stopos for new modalities, postponing the rest
    let mut postponed: IndexMap<i64, (usize, f64)> = IndexMap::new();
    for plole_index in 0..frames.ploles.len() {
        let ranked = frames.ploles[plole_index].stopo_ids.clone();
        if ranked.len() < 2 {
            continue;
        }
        let mut chosen_mods = frames
            .stopos
            .get(&ranked[0])
            .map(|row| row.mods)
            .unwrap_or(ModSet::EMPTY);
        for &stopo_id in &ranked[1..] {
            let score = frames.ploles[plole_index].stopo_infos[&stopo_id]
                .score
                .unwrap_or(0.0);
            let stopo_mods = frames.stopos[&stopo_id].mods;
            let plole_mods = frames.ploles[plole_index].mods;
            if (stopo_mods & chosen_mods).is_empty() && !(stopo_mods & plole_mods).is_empty() {
                chosen_mods.extend(stopo_mods);
                push_stop(frames, plole_index, stopo_id, REASON_NEW_MODALITY);
            } else if !frames.stopos[&stopo_id].in_stop {
                match postponed.get(&stopo_id) {
                    Some((_, best)) if *best >= score => {}
                    _ => {
                        postponed.insert(stopo_id, (plole_index, score));
                    }
                }
            }
        }
    }
    for (stopo_id, (plole_index, _)) in postponed {
        if frames.stopos[&stopo_id].in_stop {
            continue;
        }
        push_stop(frames, plole_index, stopo_id, REASON_THIRD_CHOICE);
    }

    // pass C: orphan stopos, then ploles that found no stopo
    let orphans: Vec<i64> = frames
        .stopos
        .iter()
        .filter(|(_, row)| !row.in_stop)
        .map(|(id, _)| *id)
        .collect();
    for stopo_id in orphans {
        frames.stops.push(StopRow::new(-1, 0, 0, stopo_id, ""));
    }
    for plole_index in 0..frames.ploles.len() {
        let plole = &frames.ploles[plole_index];
        if plole.stopo_ids.is_empty() {
            frames.stops.push(StopRow::new(
                plole_index as i64,
                plole.plafo_id,
                plole.pole_id,
                0,
                "",
            ));
        }
    }
}

fn push_stop(frames: &mut RegionFrames, plole_index: usize, stopo_id: i64, reason: &str) {
    let stop_id = RegionFrames::stop_id(frames.stops.len());
    if let Some(row) = frames.stopos.get_mut(&stopo_id) {
        row.in_stop = true;
    }
    let plole = &mut frames.ploles[plole_index];
    if let Some(info) = plole.stopo_infos.get_mut(&stopo_id) {
        info.stop_id = Some(stop_id);
    }
    frames.stops.push(StopRow::new(
        plole_index as i64,
        plole.plafo_id,
        plole.pole_id,
        stopo_id,
        reason,
    ));
}

fn nearest_point(surface: &MultiPolygon<f64>, target: Point<f64>) -> Point<f64> {
    match surface.closest_point(&target) {
        Closest::Intersection(point) | Closest::SinglePoint(point) => point,
        Closest::Indeterminate => target,
    }
}

/// Synthesizes a pole for every stop that has none: on the platform edge
/// nearest the stop position, at the platform centroid, or on the stop
/// position itself. Virtual pole ids are the negated stop ids.
pub fn add_virtual_poles(frames: &mut RegionFrames) {
    for index in 0..frames.stops.len() {
        let stop = &frames.stops[index];
        if stop.pole_id != 0 {
            continue;
        }
        let geo = if stop.plafo_id != 0 && stop.stopo_id != 0 {
            nearest_point(
                &frames.plafos[&stop.plafo_id].geo,
                frames.stopos[&stop.stopo_id].geo,
            )
        } else if stop.plafo_id != 0 {
            match frames.plafos[&stop.plafo_id].geo.centroid() {
                Some(centroid) => centroid,
                None => continue,
            }
        } else {
            frames.stopos[&stop.stopo_id].geo
        };
        let vpole_id = -RegionFrames::stop_id(index);
        frames.poles.insert(vpole_id, PoleRow::virtual_pole(geo));
        frames.stops[index].pole_id = vpole_id;
    }
}

/// Builds each stop's outline: the platform and the pole/stopo hull, both
/// round-buffered in the web projection, united and projected back to the
/// metric CRS.
pub fn build_stop_outlines(
    frames: &mut RegionFrames,
    crs: &RegionCrs,
    stop_buffer_size: f64,
) -> Result<(), CrsError> {
    let mut plafo_web: IndexMap<i64, MultiPolygon<f64>> = IndexMap::new();
    for (id, row) in &frames.plafos {
        plafo_web.insert(*id, crs.meters_to_web.geometry(&row.geo)?);
    }
    let mut pole_web: IndexMap<i64, Point<f64>> = IndexMap::new();
    for (id, row) in &frames.poles {
        pole_web.insert(*id, crs.meters_to_web.point(row.geo)?);
    }
    let mut stopo_web: IndexMap<i64, Point<f64>> = IndexMap::new();
    for (id, row) in &frames.stopos {
        stopo_web.insert(*id, crs.meters_to_web.point(row.geo)?);
    }

    for index in 0..frames.stops.len() {
        let stop = &frames.stops[index];
        let mut outline = MultiPolygon::new(Vec::new());
        if stop.plafo_id != 0 {
            outline = geometry::union(
                &outline,
                &geometry::buffer_surface_round(&plafo_web[&stop.plafo_id], stop_buffer_size),
            );
        }
        let mut anchors: Vec<Coord<f64>> = Vec::new();
        if stop.pole_id != 0 {
            if let Some(point) = pole_web.get(&stop.pole_id) {
                anchors.push(point.0);
            }
        }
        if stop.stopo_id != 0 {
            if let Some(point) = stopo_web.get(&stop.stopo_id) {
                anchors.push(point.0);
            }
        }
        if !anchors.is_empty() {
            outline = geometry::union(
                &outline,
                &geometry::buffer_hull_round(&anchors, stop_buffer_size),
            );
        }
        frames.stops[index].geo = crs.web_to_meters.geometry(&outline)?;
    }
    Ok(())
}
