use std::error;
use std::fmt;

use geo::{Coord, LineString};
use indexmap::IndexMap;

use crate::{Node, ObjectCore, ObjectKind, Relation, Way};

/// Raised when an area is built from anything but a way or a multipolygon
/// relation.
#[derive(Debug, Clone)]
pub struct AreaError {
    pub kind: ObjectKind,
    pub id: i64,
}

impl error::Error for AreaError {}

impl fmt::Display for AreaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "cannot make area from {} {}", self.kind, self.id)
    }
}

/// A surface candidate derived from a way or a multipolygon relation.
///
/// Multipolygon areas carry the negated relation id so they never collide
/// with way ids. The linework is kept in geographic coordinates; turning it
/// into polygons (and buffering open lines) happens at frame construction.
#[derive(Debug, Clone)]
pub struct Area {
    pub core: ObjectCore,
    /// The source was a single open polyline and needs buffering later.
    pub from_line: bool,
    /// One open polyline when `from_line`, otherwise candidate rings.
    pub lines: Vec<LineString<f64>>,
}

impl Area {
    pub fn from_way(way: &Way, nodes: &IndexMap<i64, Node>) -> Self {
        let mut core = ObjectCore::new(ObjectKind::WayArea, way.core.id, way.core.tags.clone());
        core.comments = way.core.comments.clone();
        core.warnings = way.core.warnings.clone();

        let line = resolve_line(&mut core, &way.node_ids, nodes);
        let from_line = way.node_ids.first() != way.node_ids.last();
        Self {
            core,
            from_line,
            lines: vec![line],
        }
    }

    pub fn from_relation(
        rel: &Relation,
        nodes: &IndexMap<i64, Node>,
        ways: &IndexMap<i64, Way>,
    ) -> Result<Self, AreaError> {
        if !rel.core.has_tag("type", "multipolygon") {
            return Err(AreaError {
                kind: rel.core.kind,
                id: rel.core.id,
            });
        }
        let mut core = ObjectCore::new(ObjectKind::MupoArea, -rel.core.id, rel.core.tags.clone());
        core.comments = rel.core.comments.clone();
        core.warnings = rel.core.warnings.clone();

        let mut member_ways: Vec<&Way> = rel
            .members
            .iter()
            .filter(|m| m.kind == ObjectKind::Way && m.role == "outer")
            .filter_map(|m| ways.get(&m.id))
            .collect();
        if member_ways.is_empty() {
            // no outer rings, use all ways
            member_ways = rel
                .members
                .iter()
                .filter(|m| m.kind == ObjectKind::Way)
                .filter_map(|m| ways.get(&m.id))
                .collect();
            core.warning("invalid area");
        }
        let lines = member_ways
            .iter()
            .map(|w| resolve_line(&mut core, &w.node_ids, nodes))
            .collect();
        Ok(Self {
            core,
            from_line: false,
            lines,
        })
    }
}

fn resolve_line(
    core: &mut ObjectCore,
    node_ids: &[i64],
    nodes: &IndexMap<i64, Node>,
) -> LineString<f64> {
    let mut coords = Vec::with_capacity(node_ids.len());
    for node_id in node_ids {
        match nodes.get(node_id) {
            Some(node) => coords.push(Coord {
                x: node.lon,
                y: node.lat,
            }),
            None => core.warning(format!("node {node_id} missing from download")),
        }
    }
    LineString::new(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RelMember, Tags};

    fn node(id: i64, lon: f64, lat: f64) -> (i64, Node) {
        (id, Node::new(id, Tags::new(), lon, lat))
    }

    fn platform_tags() -> Tags {
        [("public_transport", "platform")].into_iter().collect()
    }

    #[test]
    fn closed_way_is_a_ring() {
        let nodes: IndexMap<i64, Node> = [
            node(1, 0.0, 0.0),
            node(2, 1.0, 0.0),
            node(3, 1.0, 1.0),
        ]
        .into_iter()
        .collect();
        let way = Way::new(7, platform_tags(), vec![1, 2, 3, 1]);
        let area = Area::from_way(&way, &nodes);
        assert!(!area.from_line);
        assert_eq!(area.core.id, 7);
        assert_eq!(area.lines.len(), 1);
        assert_eq!(area.lines[0].0.len(), 4);
    }

    #[test]
    fn open_way_is_a_line() {
        let nodes: IndexMap<i64, Node> = [node(1, 0.0, 0.0), node(2, 1.0, 0.0)]
            .into_iter()
            .collect();
        let way = Way::new(7, platform_tags(), vec![1, 2]);
        let area = Area::from_way(&way, &nodes);
        assert!(area.from_line);
    }

    #[test]
    fn multipolygon_without_outer_role_uses_all_ways() {
        let nodes: IndexMap<i64, Node> = [
            node(1, 0.0, 0.0),
            node(2, 1.0, 0.0),
            node(3, 1.0, 1.0),
        ]
        .into_iter()
        .collect();
        let way = Way::new(4, Tags::new(), vec![1, 2, 3, 1]);
        let ways: IndexMap<i64, Way> = [(4, way)].into_iter().collect();
        let mut tags = platform_tags();
        tags.insert("type", "multipolygon");
        let rel = Relation::new(
            9,
            tags,
            vec![RelMember {
                kind: ObjectKind::Way,
                id: 4,
                role: String::new(),
            }],
        );
        let area = Area::from_relation(&rel, &nodes, &ways).unwrap();
        assert_eq!(area.core.id, -9);
        assert_eq!(area.lines.len(), 1);
        assert_eq!(area.core.warnings, vec!["invalid area".to_owned()]);
    }

    #[test]
    fn non_multipolygon_relation_is_rejected() {
        let rel = Relation::new(9, platform_tags(), Vec::new());
        let err = Area::from_relation(&rel, &IndexMap::new(), &IndexMap::new()).unwrap_err();
        assert_eq!(err.id, 9);
    }
}
