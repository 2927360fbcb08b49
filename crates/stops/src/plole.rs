use std::cmp::Ordering;

use geo::Area;
use indexmap::IndexMap;

use crate::frames::{MatchInfo, PloleRow, RegionFrames};

/// Unifies platforms and their candidate poles into ploles.
///
/// Plafos claim poles in descending platform area (insertion order on
/// ties), so a pole contested between two platforms deterministically goes
/// to the larger one; the loser keeps a warning. Unbound poles and plafos
/// become single-member ploles afterwards.
pub fn build_ploles(frames: &mut RegionFrames) {
    let mut order: Vec<(i64, f64)> = frames
        .plafos
        .iter()
        .map(|(id, row)| (*id, row.geo.unsigned_area()))
        .collect();
    order.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    for (plafo_id, _) in order {
        let candidates = frames.plafos[&plafo_id].pole.ranked.clone();
        let weight = if candidates.len() == 1 { 1.0 } else { 0.5 };
        for pole_id in candidates {
            if frames.poles[&pole_id].has_plafo {
                if let Some(obj) = frames
                    .poles
                    .get_mut(&pole_id)
                    .and_then(|row| row.obj.as_mut())
                {
                    obj.core.warning(format!(
                        "Pole is already assigned to a platform. Cannot assign \
                         pole to platform {plafo_id}."
                    ));
                }
                continue;
            }

            let plafo = &frames.plafos[&plafo_id];
            let pole = &frames.poles[&pole_id];
            let mods = (plafo.mods & (pole.mods | pole.maybe_mods))
                | (pole.mods & (plafo.mods | plafo.maybe_mods));
            let maybe_mods = plafo.maybe_mods & pole.maybe_mods;

            // intersect the two ranked stopo lists and average the scores
            let mut stopo_ids: Vec<i64> = plafo
                .stopo
                .ranked
                .iter()
                .filter(|id| pole.stopo.ranked.contains(id))
                .copied()
                .collect();
            let mut stopo_infos = IndexMap::new();
            for id in &stopo_ids {
                let score = weight * plafo.stopo.infos[id].score.unwrap_or(0.0)
                    + (1.0 - weight) * pole.stopo.infos[id].score.unwrap_or(0.0);
                stopo_infos.insert(
                    *id,
                    MatchInfo {
                        mods_match: true,
                        parts: None,
                        score: Some(score),
                        stop_id: None,
                    },
                );
            }
            stopo_ids.sort_by(|a, b| {
                let score_a = stopo_infos[a].score.unwrap_or(0.0);
                let score_b = stopo_infos[b].score.unwrap_or(0.0);
                score_b.partial_cmp(&score_a).unwrap_or(Ordering::Equal)
            });

            if let Some(row) = frames.poles.get_mut(&pole_id) {
                row.has_plafo = true;
            }
            if let Some(row) = frames.plafos.get_mut(&plafo_id) {
                row.has_poles = true;
            }
            frames.ploles.push(PloleRow {
                plafo_id,
                pole_id,
                mods,
                maybe_mods,
                stopo_ids,
                stopo_infos,
            });
        }
    }

    let unbound_poles: Vec<i64> = frames
        .poles
        .iter()
        .filter(|(_, row)| !row.has_plafo)
        .map(|(id, _)| *id)
        .collect();
    for pole_id in unbound_poles {
        let row = &frames.poles[&pole_id];
        frames.ploles.push(PloleRow {
            plafo_id: 0,
            pole_id,
            mods: row.mods,
            maybe_mods: row.maybe_mods,
            stopo_ids: row.stopo.ranked.clone(),
            stopo_infos: row.stopo.infos.clone(),
        });
    }

    let unbound_plafos: Vec<i64> = frames
        .plafos
        .iter()
        .filter(|(_, row)| !row.has_poles)
        .map(|(id, _)| *id)
        .collect();
    for plafo_id in unbound_plafos {
        let row = &frames.plafos[&plafo_id];
        frames.ploles.push(PloleRow {
            plafo_id,
            pole_id: 0,
            mods: row.mods,
            maybe_mods: row.maybe_mods,
            stopo_ids: row.stopo.ranked.clone(),
            stopo_infos: row.stopo.infos.clone(),
        });
    }
}
