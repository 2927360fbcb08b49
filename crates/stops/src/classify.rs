use indexmap::IndexMap;

use model::{Area, Node, ObjectCore};

use crate::frames::SourceObject;

/// Candidate bins after the tag-only classification. A node may sit in
/// several bins at once; the conflicts are resolved once track context is
/// known.
#[derive(Debug, Default)]
pub struct Classified {
    pub stopos: IndexMap<i64, Node>,
    pub poles: IndexMap<i64, Node>,
    pub plafos: Vec<Area>,
    pub stations: Vec<SourceObject>,
    pub dubobs: Vec<SourceObject>,
}

fn is_stopo(core: &ObjectCore) -> bool {
    core.has_tag("public_transport", "stop_position")
        || (core.has_tag("highway", "bus_stop") && !core.has_tag("public_transport", "platform"))
        || core.has_tag("amenity", "bus_stop")
        || core.has_tag("amenity", "ferry_terminal")
        || core.has_tag("railway", "stop")
        || (core.has_tag("railway", "tram_stop")
            && !core.has_tag("public_transport", "platform")
            && !core.has_tag("public_transport", "station"))
        || core.has_tag("aerialway", "station")
}

fn is_pole(core: &ObjectCore) -> bool {
    core.has_tag("public_transport", "platform")
        || (core.has_tag("highway", "bus_stop")
            && !core.has_tag("public_transport", "stop_position"))
        || core.has_tag("amenity", "bus_stop")
        || core.has_tag("highway", "platform")
        || core.has_tag("railway", "platform")
}

fn is_node_station(core: &ObjectCore) -> bool {
    core.has_tag("public_transport", "station")
        || core.has_tag("amenity", "bus_station")
        || core.has_tag("railway", "station")
        || core.has_tag("railway", "halt")
}

fn is_plafo(core: &ObjectCore) -> bool {
    core.has_tag("public_transport", "platform")
        || core.has_tag("highway", "bus_stop")
        || core.has_tag("highway", "platform")
        || core.has_tag("amenity", "bus_stop")
        || core.has_tag("railway", "platform")
        || core.has_tag("amenity", "ferry_terminal")
}

fn is_area_station(core: &ObjectCore) -> bool {
    core.has_tag("public_transport", "station")
        || core.has_tag("amenity", "bus_station")
        || core.has_tag("railway", "station")
        || core.has_tag("railway", "halt")
        || core.has_tag("aerialway", "station")
}

pub fn classify(nodes: &IndexMap<i64, Node>, areas: Vec<Area>) -> Classified {
    let mut bins = Classified::default();

    for node in nodes.values() {
        if node.core.tags.is_empty() {
            continue;
        }
        let mut dubious = true;
        if is_stopo(&node.core) {
            bins.stopos.insert(node.core.id, node.clone());
            dubious = false;
        }
        if is_pole(&node.core) {
            bins.poles.insert(node.core.id, node.clone());
            dubious = false;
        }
        if is_node_station(&node.core) {
            bins.stations.push(SourceObject::Node(node.clone()));
            dubious = false;
        }
        if dubious {
            let mut node = node.clone();
            node.core
                .warning("node somehow related to public transport, but how?");
            bins.dubobs.push(SourceObject::Node(node));
        }
    }

    for area in areas {
        if area.core.tags.is_empty() {
            continue;
        }
        let mut dubious = true;
        if is_plafo(&area.core) {
            bins.plafos.push(area.clone());
            dubious = false;
        }
        if is_area_station(&area.core) {
            bins.stations.push(SourceObject::Area(area.clone()));
            dubious = false;
        }
        if dubious {
            let mut area = area;
            area.core
                .warning("area somehow related to public transport, but how?");
            bins.dubobs.push(SourceObject::Area(area));
        }
    }

    log::info!("stop positions: {}", bins.stopos.len());
    log::info!("poles: {}", bins.poles.len());
    log::info!("platforms: {}", bins.plafos.len());
    log::info!("stations: {}", bins.stations.len());
    log::info!("dubious objects: {}", bins.dubobs.len());
    bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Tags;

    fn node(id: i64, pairs: &[(&str, &str)]) -> (i64, Node) {
        let tags: Tags = pairs.iter().copied().collect();
        (id, Node::new(id, tags, 0.0, 0.0))
    }

    #[test]
    fn ptv2_bus_stop_node_joins_stopo_and_pole_bins() {
        let nodes: IndexMap<i64, Node> =
            [node(1, &[("highway", "bus_stop"), ("bus", "yes")])].into_iter().collect();
        let bins = classify(&nodes, Vec::new());
        assert!(bins.stopos.contains_key(&1));
        assert!(bins.poles.contains_key(&1));
        assert!(bins.dubobs.is_empty());
    }

    #[test]
    fn platform_tag_suppresses_the_stopo_reading() {
        let nodes: IndexMap<i64, Node> = [node(
            1,
            &[("highway", "bus_stop"), ("public_transport", "platform")],
        )]
        .into_iter()
        .collect();
        let bins = classify(&nodes, Vec::new());
        assert!(!bins.stopos.contains_key(&1));
        assert!(bins.poles.contains_key(&1));
    }

    #[test]
    fn tram_stop_with_station_tag_is_not_a_stopo() {
        let nodes: IndexMap<i64, Node> = [node(
            1,
            &[("railway", "tram_stop"), ("public_transport", "station")],
        )]
        .into_iter()
        .collect();
        let bins = classify(&nodes, Vec::new());
        assert!(bins.stopos.is_empty());
        assert_eq!(bins.stations.len(), 1);
    }

    #[test]
    fn unmatched_tagged_node_is_dubious() {
        let nodes: IndexMap<i64, Node> =
            [node(1, &[("share_taxi", "yes")])].into_iter().collect();
        let bins = classify(&nodes, Vec::new());
        assert_eq!(bins.dubobs.len(), 1);
        assert!(!bins.dubobs[0].core().warnings.is_empty());
    }

    #[test]
    fn untagged_node_is_skipped() {
        let nodes: IndexMap<i64, Node> = [node(1, &[])].into_iter().collect();
        let bins = classify(&nodes, Vec::new());
        assert!(bins.dubobs.is_empty());
        assert!(bins.stopos.is_empty());
    }
}
