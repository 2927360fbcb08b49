use std::cmp::Ordering;
use std::collections::BTreeSet;

use geo::{BoundingRect, EuclideanDistance, MultiPolygon, Point};
use indexmap::IndexMap;
use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};

use model::{ObjectCore, Tags};

use crate::frames::{MatchInfo, NearbyList, ScoreParts};

/// Geometry an anchor searches around: a point (poles) or a surface
/// (platforms).
pub enum AnchorGeo<'a> {
    Point(&'a Point<f64>),
    Surface(&'a MultiPolygon<f64>),
}

impl AnchorGeo<'_> {
    fn distance(&self, p: &Point<f64>) -> f64 {
        match self {
            AnchorGeo::Point(a) => a.euclidean_distance(p),
            AnchorGeo::Surface(mp) => mp
                .0
                .iter()
                .map(|polygon| polygon.euclidean_distance(p))
                .fold(f64::INFINITY, f64::min),
        }
    }

    fn envelope(&self, radius: f64) -> Option<AABB<[f64; 2]>> {
        match self {
            AnchorGeo::Point(a) => Some(AABB::from_corners(
                [a.x() - radius, a.y() - radius],
                [a.x() + radius, a.y() + radius],
            )),
            AnchorGeo::Surface(mp) => mp.bounding_rect().map(|rect| {
                AABB::from_corners(
                    [rect.min().x - radius, rect.min().y - radius],
                    [rect.max().x + radius, rect.max().y + radius],
                )
            }),
        }
    }
}

/// Bulk-loaded point index over the candidate nodes of one matcher run.
pub struct Candidates {
    tree: RTree<GeomWithData<[f64; 2], i64>>,
    points: IndexMap<i64, Point<f64>>,
}

impl Candidates {
    pub fn new(points: IndexMap<i64, Point<f64>>) -> Self {
        let items = points
            .iter()
            .map(|(id, p)| GeomWithData::new([p.x(), p.y()], *id))
            .collect();
        Self {
            tree: RTree::bulk_load(items),
            points,
        }
    }

    /// Ids and distances of all candidates inside the anchor's buffer, in
    /// candidate insertion order.
    fn within(&self, anchor: &AnchorGeo, radius: f64) -> Vec<(i64, f64)> {
        let Some(envelope) = anchor.envelope(radius) else {
            return Vec::new();
        };
        let mut hits: Vec<(i64, f64)> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|item| {
                let id = item.data;
                let distance = anchor.distance(&self.points[&id]);
                (distance <= radius).then_some((id, distance))
            })
            .collect();
        hits.sort_by_key(|(id, _)| self.points.get_index_of(id));
        hits
    }
}

/// Finds, filters, scores and ranks the candidates near every anchor.
///
/// The distance tiebreaker stays below the smallest tag-score gap, so it
/// only orders candidates whose tag scores are equal.
pub fn get_nearby<'a>(
    anchors: impl IntoIterator<Item = (i64, AnchorGeo<'a>)>,
    candidates: &Candidates,
    radius: f64,
    mut mods_filter: impl FnMut(i64, i64) -> bool,
    mut scorer: impl FnMut(i64, i64) -> ScoreParts,
) -> IndexMap<i64, NearbyList> {
    let mut result = IndexMap::new();
    for (anchor_id, geo) in anchors {
        let mut list = NearbyList::default();
        for (candidate_id, distance) in candidates.within(&geo, radius) {
            let mods_match = mods_filter(anchor_id, candidate_id);
            let mut info = MatchInfo {
                mods_match,
                ..MatchInfo::default()
            };
            if mods_match {
                let parts = scorer(anchor_id, candidate_id);
                info.parts = Some(parts);
                info.score = Some(parts.weighted() + (radius - distance) / (2.0 * radius));
            }
            list.infos.insert(candidate_id, info);
        }
        let mut ranked: Vec<i64> = list
            .infos
            .iter()
            .filter(|(_, info)| info.mods_match && info.score.unwrap_or(0.0) > 0.0)
            .map(|(id, _)| *id)
            .collect();
        ranked.sort_by(|a, b| {
            let score_a = list.infos[a].score.unwrap_or(0.0);
            let score_b = list.infos[b].score.unwrap_or(0.0);
            score_b.partial_cmp(&score_a).unwrap_or(Ordering::Equal)
        });
        list.ranked = ranked;
        result.insert(anchor_id, list);
    }
    result
}

/// Single value atoms under `key`, with `0` as the implicit default for
/// layer-like tags.
fn atom_set<'a>(tags: &'a Tags, key: &str) -> BTreeSet<&'a str> {
    if tags.contains_key(key) {
        tags.atoms(key).collect()
    } else {
        BTreeSet::from(["0"])
    }
}

fn layer_match(a: &Tags, b: &Tags) -> i8 {
    let a_layers = atom_set(a, "layer");
    let b_layers = atom_set(b, "layer");
    let common = a_layers.intersection(&b_layers).count();
    if a.contains_key("layer") && b.contains_key("layer") {
        // both carry an explicit layer
        if common == 0 {
            0
        } else {
            1
        }
    } else if common == 0 {
        -1
    } else {
        0
    }
}

fn level_match(a: &Tags, b: &Tags) -> i8 {
    let a_levels = atom_set(a, "level");
    let b_levels = atom_set(b, "level");
    let common: BTreeSet<&str> = a_levels.intersection(&b_levels).copied().collect();
    if common.is_empty() {
        -1
    } else if common.contains("0") {
        0
    } else {
        1
    }
}

fn both(a: &Tags, b: &Tags, key: &str) -> bool {
    a.contains_key(key) && b.contains_key(key)
}

fn score_from(value: bool) -> i8 {
    if value {
        1
    } else {
        -1
    }
}

/// Symmetric scorer for stop positions against ploles (poles or platforms):
/// references and names match in either direction.
pub fn score_stopo_to_plole(plole: &ObjectCore, stopo: &ObjectCore) -> ScoreParts {
    let p = &plole.tags;
    let s = &stopo.tags;
    ScoreParts {
        ifopt: if both(p, s, "ref:IFOPT") {
            let pv = p.get("ref:IFOPT").unwrap_or_default();
            let sv = s.get("ref:IFOPT").unwrap_or_default();
            score_from(sv.contains(pv) || pv.contains(sv))
        } else {
            0
        },
        reference: if both(p, s, "ref") {
            score_from(
                s.has("ref", p.get("ref").unwrap_or_default())
                    || p.has("ref", s.get("ref").unwrap_or_default()),
            )
        } else {
            0
        },
        local_ref: if both(p, s, "local_ref") {
            score_from(
                s.has("local_ref", p.get("local_ref").unwrap_or_default())
                    || p.has("local_ref", s.get("local_ref").unwrap_or_default()),
            )
        } else {
            0
        },
        ref_name: if both(p, s, "ref_name") {
            let pv = p.get("ref_name").unwrap_or_default();
            let sv = s.get("ref_name").unwrap_or_default();
            score_from(sv.contains(pv) || pv.contains(sv))
        } else {
            0
        },
        name: if both(p, s, "name") {
            let pv = p.get("name").unwrap_or_default();
            let sv = s.get("name").unwrap_or_default();
            score_from(sv.contains(pv) || pv.contains(sv))
        } else {
            0
        },
        layer: layer_match(s, p),
        level: level_match(s, p),
    }
}

/// Directional scorer for poles against platforms: a platform serving
/// several poles may carry the longer identifier or the multi-value ref.
pub fn score_pole_to_plafo(plafo: &ObjectCore, pole: &ObjectCore) -> ScoreParts {
    let f = &plafo.tags;
    let p = &pole.tags;
    ScoreParts {
        ifopt: if both(f, p, "ref:IFOPT") {
            let fv = f.get("ref:IFOPT").unwrap_or_default();
            let pv = p.get("ref:IFOPT").unwrap_or_default();
            score_from(pv.contains(fv))
        } else {
            0
        },
        reference: if both(f, p, "ref") {
            score_from(f.has("ref", p.get("ref").unwrap_or_default()))
        } else {
            0
        },
        local_ref: if both(f, p, "local_ref") {
            score_from(f.has("local_ref", p.get("local_ref").unwrap_or_default()))
        } else {
            0
        },
        ref_name: if both(f, p, "ref_name") {
            let fv = f.get("ref_name").unwrap_or_default();
            let pv = p.get("ref_name").unwrap_or_default();
            score_from(pv.contains(fv))
        } else {
            0
        },
        name: if both(f, p, "name") {
            let fv = f.get("name").unwrap_or_default();
            let pv = p.get("name").unwrap_or_default();
            score_from(pv.contains(fv))
        } else {
            0
        },
        layer: layer_match(p, f),
        level: level_match(p, f),
    }
}
