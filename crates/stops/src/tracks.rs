use geo::Geometry;
use indexmap::IndexMap;
use itertools::Itertools;

use model::{ModSet, Modality, Tags, Way};

use crate::frames::{DubobRow, PoleRow, RegionFrames, SourceObject, StopoRow};

/// Row kinds that receive modality context from the tracks passing through
/// their node.
pub trait TrackContext {
    fn add_track_mods(&mut self, mods: ModSet);
    fn object_tags_mut(&mut self) -> Option<&mut Tags>;
}

impl TrackContext for StopoRow {
    fn add_track_mods(&mut self, mods: ModSet) {
        self.track_mods.extend(mods);
    }

    fn object_tags_mut(&mut self) -> Option<&mut Tags> {
        Some(&mut self.obj.core.tags)
    }
}

impl TrackContext for PoleRow {
    fn add_track_mods(&mut self, mods: ModSet) {
        self.track_mods.extend(mods);
    }

    fn object_tags_mut(&mut self) -> Option<&mut Tags> {
        self.obj.as_mut().map(|obj| &mut obj.core.tags)
    }
}

/// The distinct tag keys marking ways as tracks, in modality order.
pub fn track_keys() -> Vec<&'static str> {
    let mut keys = Vec::new();
    for modality in Modality::ALL {
        for (key, _) in modality.track_tags() {
            if !keys.contains(key) {
                keys.push(key);
            }
        }
    }
    keys
}

/// Query fetching all ways through the given nodes that look like tracks.
pub fn track_query(node_ids: &[i64]) -> String {
    let ids = node_ids.iter().map(i64::to_string).join(",");
    let filters = track_keys()
        .iter()
        .map(|key| format!("way.all[{key}];"))
        .join("\n");
    format!("node(id: {ids});\nway(bn)->.all;\n({filters});\nout;\n")
}

/// Modalities a way serves as a track.
///
/// Modality flags (`bus=yes`) are trusted except on platform ways, where
/// they describe the platform's users, not the way itself. Tracks under
/// construction count for the modalities of the finished track.
pub fn way_track_mods(way: &Way) -> ModSet {
    let tags = &way.core.tags;
    let platform_way = tags.has("highway", "platform")
        || tags.has("railway", "platform")
        || tags.has("public_transport", "platform");
    let mut mods = ModSet::EMPTY;
    for modality in Modality::ALL {
        if tags.has(modality.name(), "yes") && !platform_way {
            mods.insert(modality);
            continue;
        }
        if tags.has(modality.name(), "no") {
            continue;
        }
        for (key, values) in modality.track_tags() {
            if values.iter().any(|value| tags.has(key, value)) {
                mods.insert(modality);
                break;
            }
            if tags.has(key, "construction")
                && values.iter().any(|value| tags.has("construction", value))
            {
                mods.insert(modality);
                break;
            }
        }
    }
    mods
}

/// Merges the track modalities of the downloaded ways into the rows of the
/// nodes they pass through, importing the tracks' layer/level tags.
pub fn assign_tracks<R: TrackContext>(rows: &mut IndexMap<i64, R>, ways: &[Way]) {
    for way in ways {
        let mods = way_track_mods(way);
        let mut seen = Vec::new();
        for node_id in &way.node_ids {
            if seen.contains(node_id) {
                continue;
            }
            seen.push(*node_id);
            let Some(row) = rows.get_mut(node_id) else {
                continue;
            };
            row.add_track_mods(mods);
            if let Some(tags) = row.object_tags_mut() {
                for key in ["layer", "level"] {
                    if let Some(value) = way.core.tags.get(key) {
                        if !value.is_empty() {
                            tags.append(key, value);
                        }
                    }
                }
            }
        }
    }
}

/// Seals stopo modalities against the tracks beneath them. Stopos with no
/// track are demoted to poles or moved to the dubious bin; tagged
/// modalities not supported by any track are dropped.
pub fn seal_stopos(frames: &mut RegionFrames) {
    let mut pole_ids = Vec::new();
    let mut to_dubobs = Vec::new();

    let ids: Vec<i64> = frames.stopos.keys().copied().collect();
    for id in ids {
        let in_poles = frames.poles.contains_key(&id);
        let Some(row) = frames.stopos.get_mut(&id) else {
            continue;
        };
        if row.track_mods.is_empty() {
            if in_poles {
                row.obj.core.comment(format!(
                    "looking at tags only, node could be a stop position for {}, \
                     but is not on suitable track",
                    row.tag_mods | row.tag_maybe_mods
                ));
                pole_ids.push(id);
            } else if row.tag_mods.is_empty() {
                if row.tag_maybe_mods.is_empty() {
                    row.obj.core.warning(
                        "node tagged as stop position but neither has modality tags \
                         nor is on any relevant track",
                    );
                } else {
                    row.obj.core.warning(format!(
                        "node tagged as stop position with ambiguous modalities {}, \
                         but node is not on any relevant track",
                        row.tag_maybe_mods
                    ));
                }
                to_dubobs.push(id);
            } else {
                row.obj.core.warning(format!(
                    "node is tagged as stop position for {}, but is not on any \
                     relevant track",
                    row.tag_mods
                ));
                to_dubobs.push(id);
            }
        } else {
            let all_tag_mods = row.tag_mods | row.tag_maybe_mods;
            if all_tag_mods.is_empty() {
                // trolleybus and share_taxi are never inferred from the
                // track alone
                let mut assumed = row.track_mods;
                assumed.remove(Modality::Trolleybus);
                assumed.remove(Modality::ShareTaxi);
                row.mods = assumed;
                row.obj.core.warning(format!(
                    "stop position without modality tags, assuming {} because \
                     node is on suitable track",
                    row.mods
                ));
            } else {
                row.mods = all_tag_mods & row.track_mods;
                if row.mods.is_empty() {
                    row.obj.core.warning(format!(
                        "stop position for which tagged modalities {} do not \
                         match track modalities {}",
                        all_tag_mods, row.track_mods
                    ));
                    to_dubobs.push(id);
                }
            }
        }
    }

    for id in &to_dubobs {
        if let Some(row) = frames.stopos.shift_remove(id) {
            frames.dubobs.push(DubobRow {
                geo: Geometry::Point(row.geo),
                obj: SourceObject::Node(row.obj),
                lon: 0.0,
                lat: 0.0,
            });
        }
    }
    for id in &pole_ids {
        // the node lives on as a pole; keep the diagnostics with it
        if let Some(row) = frames.stopos.shift_remove(id) {
            if let Some(obj) = frames.poles.get_mut(id).and_then(|pole| pole.obj.as_mut()) {
                obj.core.comments.extend(row.obj.core.comments);
                obj.core.warnings.extend(row.obj.core.warnings);
            }
        }
    }
    log::info!(
        "moved {} invalid stopos to dubobs, removed {} invalid stopos that are poles",
        to_dubobs.len(),
        pole_ids.len()
    );
}

/// Seals pole modalities against the tracks. A flagged modality whose track
/// runs through the node marks a stop position, not a pole, and is dropped;
/// poles left without any modality move on or out.
pub fn seal_poles(frames: &mut RegionFrames) {
    let mut to_dubobs = Vec::new();
    let mut stopo_ids = Vec::new();

    let ids: Vec<i64> = frames.poles.keys().copied().collect();
    for id in ids {
        let in_stopos = frames.stopos.contains_key(&id);
        let Some(row) = frames.poles.get_mut(&id) else {
            continue;
        };
        row.mods = row.tag_mods;
        let on_track = row.tag_mods & row.track_mods;
        if !on_track.is_empty() {
            if let Some(obj) = row.obj.as_mut() {
                obj.core.comment(format!(
                    "from tags only node looks like a pole for {on_track}, but \
                     node is on track, not beside"
                ));
            }
            row.mods = row.mods - on_track;
        }

        row.maybe_mods = row.tag_maybe_mods;
        let on_track = row.tag_maybe_mods & row.track_mods;
        if !on_track.is_empty() {
            if let Some(obj) = row.obj.as_mut() {
                obj.core.comment(format!(
                    "from tags only node could be a pole for {on_track}, but \
                     node is on track, not beside"
                ));
            }
            row.maybe_mods = row.maybe_mods - on_track;
        }

        if row.mods.is_empty() && row.maybe_mods.is_empty() {
            if in_stopos {
                stopo_ids.push(id);
            } else {
                if let Some(obj) = row.obj.as_mut() {
                    obj.core.warning("pole without modalities");
                }
                to_dubobs.push(id);
            }
        } else if row.mods.is_empty() {
            if let Some(obj) = row.obj.as_mut() {
                obj.core.comment("pole with ambiguous modality tags");
            }
        }
    }

    for id in &to_dubobs {
        if let Some(row) = frames.poles.shift_remove(id) {
            if let Some(obj) = row.obj {
                frames.dubobs.push(DubobRow {
                    geo: Geometry::Point(row.geo),
                    obj: SourceObject::Node(obj),
                    lon: 0.0,
                    lat: 0.0,
                });
            }
        }
    }
    for id in &stopo_ids {
        // the node lives on as a stopo; keep the diagnostics with it
        if let Some(row) = frames.poles.shift_remove(id) {
            if let (Some(obj), Some(stopo)) = (row.obj, frames.stopos.get_mut(id)) {
                stopo.obj.core.comments.extend(obj.core.comments);
                stopo.obj.core.warnings.extend(obj.core.warnings);
            }
        }
    }
    log::info!(
        "moved {} invalid poles to dubobs, removed {} invalid poles that are stopos",
        to_dubobs.len(),
        stopo_ids.len()
    );

    // nodes in both frames stay stopos only
    let overlap: Vec<i64> = frames
        .stopos
        .keys()
        .filter(|id| frames.poles.contains_key(*id))
        .copied()
        .collect();
    for id in &overlap {
        if let Some(row) = frames.poles.shift_remove(id) {
            if let (Some(obj), Some(stopo)) = (row.obj, frames.stopos.get_mut(id)) {
                stopo.obj.core.comments.extend(obj.core.comments);
                stopo.obj.core.warnings.extend(obj.core.warnings);
            }
        }
        if let Some(row) = frames.stopos.get_mut(id) {
            row.obj.core.warning("stop position with pole-like tags");
        }
    }
    log::info!("removed {} poles that also are stop positions", overlap.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Way;

    fn way(id: i64, pairs: &[(&str, &str)], node_ids: Vec<i64>) -> Way {
        Way::new(id, pairs.iter().copied().collect(), node_ids)
    }

    #[test]
    fn road_serves_all_road_modalities_without_flags() {
        let mods = way_track_mods(&way(1, &[("highway", "primary")], vec![]));
        assert!(mods.contains(Modality::Bus));
        assert!(mods.contains(Modality::Trolleybus));
        assert!(mods.contains(Modality::ShareTaxi));
        assert!(!mods.contains(Modality::Tram));
    }

    #[test]
    fn modality_flag_wins_over_track_tags() {
        let mods = way_track_mods(&way(1, &[("railway", "rail"), ("train", "no")], vec![]));
        assert!(!mods.contains(Modality::Train));
        let mods = way_track_mods(&way(1, &[("highway", "pedestrian"), ("tram", "yes")], vec![]));
        assert!(mods.contains(Modality::Tram));
    }

    #[test]
    fn platform_ways_suppress_the_flag_fast_path() {
        let mods = way_track_mods(&way(
            1,
            &[("highway", "platform"), ("bus", "yes")],
            vec![],
        ));
        assert!(mods.is_empty());
    }

    #[test]
    fn construction_tracks_count() {
        let mods = way_track_mods(&way(
            1,
            &[("railway", "construction"), ("construction", "rail")],
            vec![],
        ));
        assert!(mods.contains(Modality::Train));
        assert!(!mods.contains(Modality::Tram));
    }

    #[test]
    fn track_query_filters_every_track_key() {
        let query = track_query(&[5, 7]);
        assert!(query.contains("node(id: 5,7);"));
        for key in ["highway", "psv", "railway", "route", "aerialway"] {
            assert!(query.contains(&format!("way.all[{key}];")), "missing {key}");
        }
    }

    use geo::Point;
    use model::{ModSet, Node};

    use crate::frames::StopoRow;

    fn stopo_frame(tags: &[(&str, &str)]) -> RegionFrames {
        let mut frames = RegionFrames::default();
        let node = Node::new(1, tags.iter().copied().collect(), 0.0, 0.0);
        frames
            .stopos
            .insert(1, StopoRow::new(Point::new(0.0, 0.0), node));
        frames
    }

    #[test]
    fn stopo_off_track_moves_to_dubobs() {
        let mut frames = stopo_frame(&[("public_transport", "stop_position"), ("bus", "yes")]);
        frames.stopos[&1].tag_mods = ModSet::single(Modality::Bus);
        seal_stopos(&mut frames);
        assert!(frames.stopos.is_empty());
        assert_eq!(frames.dubobs.len(), 1);
        assert!(frames.dubobs[0].obj.core().warnings[0].contains("not on any relevant track"));
    }

    #[test]
    fn trackside_stopo_without_tags_assumes_track_modalities() {
        let mut frames = stopo_frame(&[("public_transport", "stop_position")]);
        let track: ModSet = [
            Modality::Bus,
            Modality::Trolleybus,
            Modality::ShareTaxi,
            Modality::Tram,
        ]
        .into_iter()
        .collect();
        frames.stopos[&1].track_mods = track;
        seal_stopos(&mut frames);
        let row = &frames.stopos[&1];
        let expected: ModSet = [Modality::Bus, Modality::Tram].into_iter().collect();
        assert_eq!(row.mods, expected);
        assert!(row.obj.core.warnings[0].contains("assuming"));
    }

    #[test]
    fn tagged_modalities_are_cut_to_the_track() {
        let mut frames = stopo_frame(&[("public_transport", "stop_position"), ("tram", "yes")]);
        frames.stopos[&1].tag_mods = ModSet::single(Modality::Tram);
        frames.stopos[&1].track_mods = ModSet::single(Modality::Bus);
        seal_stopos(&mut frames);
        // tram stopo on a bus-only track is dubious
        assert!(frames.stopos.is_empty());
        assert_eq!(frames.dubobs.len(), 1);
        assert!(frames.dubobs[0].obj.core().warnings[0].contains("do not match"));
    }
}
