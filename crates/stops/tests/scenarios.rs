use async_trait::async_trait;

use model::{Modality, Node, Way};
use overpass::{ApiError, Elements};
use stops::frames::RegionFrames;
use stops::{process_region, EngineParams, ObjectSource, RegionCrs};

const LON_LAT: &str = "+proj=longlat +datum=WGS84 +no_defs";
const METERS: &str = "+proj=aeqd +lat_0=54.0 +lon_0=10.0 +datum=WGS84 +units=m +no_defs";
const WEB: &str =
    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs";

const LAT0: f64 = 54.0;
const LON0: f64 = 10.0;

/// Geographic coordinates roughly `dx`/`dy` meters east/north of the test
/// region's center.
fn lon_lat(dx: f64, dy: f64) -> (f64, f64) {
    let lon = LON0 + dx / (111_320.0 * LAT0.to_radians().cos());
    let lat = LAT0 + dy / 110_540.0;
    (lon, lat)
}

fn tagged_node(id: i64, dx: f64, dy: f64, pairs: &[(&str, &str)]) -> Node {
    let (lon, lat) = lon_lat(dx, dy);
    Node::new(id, pairs.iter().copied().collect(), lon, lat)
}

fn plain_node(id: i64, dx: f64, dy: f64) -> Node {
    tagged_node(id, dx, dy, &[])
}

fn way(id: i64, pairs: &[(&str, &str)], node_ids: &[i64]) -> Way {
    Way::new(id, pairs.iter().copied().collect(), node_ids.to_vec())
}

struct CannedSource {
    objects: Elements,
    tracks: Vec<Way>,
}

#[async_trait]
impl ObjectSource for CannedSource {
    async fn region_objects(&self, _area_id: i64) -> Result<Elements, ApiError> {
        Ok(self.objects.clone())
    }

    async fn track_ways(&self, node_ids: &[i64]) -> Result<Vec<Way>, ApiError> {
        Ok(self
            .tracks
            .iter()
            .filter(|way| way.node_ids.iter().any(|id| node_ids.contains(id)))
            .cloned()
            .collect())
    }
}

fn params() -> EngineParams {
    EngineParams {
        half_plafo_width: 2.0,
        station_radius: 50.0,
        pole_stopo_dist: 30.0,
        plafo_stopo_dist: 30.0,
        plafo_pole_dist: 20.0,
        stop_buffer_size: 5.0,
    }
}

fn crs() -> RegionCrs {
    RegionCrs::new(LON_LAT, METERS, WEB).unwrap()
}

async fn run(source: &CannedSource) -> RegionFrames {
    process_region(source, &params(), &crs(), 3_600_000_001)
        .await
        .unwrap()
}

fn mods_of(frames: &RegionFrames, stop_index: usize) -> Vec<&'static str> {
    frames.stops[stop_index].mods.names()
}

#[tokio::test]
async fn pure_ptv2_bus_stop() {
    let source = CannedSource {
        objects: Elements {
            nodes: vec![
                tagged_node(
                    1,
                    0.0,
                    0.0,
                    &[
                        ("highway", "bus_stop"),
                        ("public_transport", "stop_position"),
                        ("bus", "yes"),
                    ],
                ),
                tagged_node(
                    2,
                    5.0,
                    0.0,
                    &[("public_transport", "platform"), ("highway", "bus_stop")],
                ),
                plain_node(90, -50.0, 0.0),
                plain_node(91, 50.0, 0.0),
            ],
            ways: vec![],
            rels: vec![],
        },
        tracks: vec![way(100, &[("highway", "primary")], &[90, 1, 91])],
    };
    let frames = run(&source).await;

    assert_eq!(frames.stops.len(), 1);
    let stop = &frames.stops[0];
    assert_eq!(stop.stopo_id, 1);
    assert_eq!(stop.pole_id, 2);
    assert_eq!(mods_of(&frames, 0), vec!["bus"]);
    assert_eq!(stop.ptv2, 3);
    // two bus symbols render: one on the stopo, one on the pole
    assert_eq!(stop.render, 2);
}

#[tokio::test]
async fn tram_platform_without_stop_position() {
    let ring = [10, 11, 12, 13, 10];
    let source = CannedSource {
        objects: Elements {
            nodes: vec![
                plain_node(10, -10.0, 5.0),
                plain_node(11, 10.0, 5.0),
                plain_node(12, 10.0, 8.0),
                plain_node(13, -10.0, 8.0),
            ],
            ways: vec![way(
                200,
                &[("railway", "platform"), ("tram", "yes")],
                &ring,
            )],
            rels: vec![],
        },
        tracks: vec![],
    };
    let frames = run(&source).await;

    assert_eq!(frames.stops.len(), 1);
    let stop = &frames.stops[0];
    assert_eq!(stop.plafo_id, 200);
    assert_eq!(stop.stopo_id, 0);
    // the virtual pole id is the negated 1-based stop id
    assert_eq!(stop.pole_id, -1);
    assert!(frames.poles.contains_key(&-1));
    assert_eq!(mods_of(&frames, 0), vec!["tram"]);
}

#[tokio::test]
async fn mixed_bus_tram_platform_appends_second_stopo() {
    let ring = [20, 21, 22, 23, 20];
    let source = CannedSource {
        objects: Elements {
            nodes: vec![
                plain_node(20, -15.0, 3.0),
                plain_node(21, 15.0, 3.0),
                plain_node(22, 15.0, 6.0),
                plain_node(23, -15.0, 6.0),
                tagged_node(31, -5.0, 0.0, &[("highway", "bus_stop")]),
                tagged_node(32, 5.0, 0.0, &[("railway", "tram_stop")]),
                plain_node(92, -60.0, 0.0),
                plain_node(93, 60.0, 0.0),
                plain_node(94, -60.0, 0.5),
                plain_node(95, 60.0, 0.5),
            ],
            ways: vec![way(300, &[("public_transport", "platform")], &ring)],
            rels: vec![],
        },
        tracks: vec![
            way(301, &[("highway", "residential")], &[92, 31, 93]),
            way(302, &[("railway", "tram")], &[94, 32, 95]),
        ],
    };
    let frames = run(&source).await;

    assert_eq!(frames.stops.len(), 2);
    assert_eq!(frames.stops[0].plole_id, frames.stops[1].plole_id);
    let combined = frames.stops[0].mods | frames.stops[1].mods;
    assert!(combined.contains(Modality::Bus));
    assert!(combined.contains(Modality::Tram));
}

#[tokio::test]
async fn orphan_stopo_becomes_standalone_stop() {
    let source = CannedSource {
        objects: Elements {
            nodes: vec![
                tagged_node(
                    41,
                    0.0,
                    0.0,
                    &[("public_transport", "stop_position"), ("bus", "yes")],
                ),
                plain_node(96, -50.0, 0.0),
                plain_node(97, 50.0, 0.0),
            ],
            ways: vec![],
            rels: vec![],
        },
        tracks: vec![way(400, &[("highway", "secondary")], &[96, 41, 97])],
    };
    let frames = run(&source).await;

    assert_eq!(frames.stops.len(), 1);
    let stop = &frames.stops[0];
    assert_eq!(stop.plole_id, -1);
    assert_eq!(stop.stopo_id, 41);
    assert_eq!(stop.pole_id, -1);
    assert_eq!(mods_of(&frames, 0), vec!["bus"]);
    // the virtual pole sits on the stop position
    let vpole = &frames.poles[&-1];
    let stopo = &frames.stopos[&41];
    assert!((vpole.geo.x() - stopo.geo.x()).abs() < 1e-9);
    assert!((vpole.geo.y() - stopo.geo.y()).abs() < 1e-9);
    // no symbol anywhere: invisible
    assert_eq!(stop.render, 1);
}

#[tokio::test]
async fn invisible_stop_in_bus_station_upgrades_to_grade_four() {
    let ring = [50, 51, 52, 53, 50];
    let source = CannedSource {
        objects: Elements {
            nodes: vec![
                tagged_node(
                    41,
                    0.0,
                    0.0,
                    &[("public_transport", "stop_position"), ("bus", "yes")],
                ),
                plain_node(50, -30.0, -30.0),
                plain_node(51, 30.0, -30.0),
                plain_node(52, 30.0, 30.0),
                plain_node(53, -30.0, 30.0),
                plain_node(96, -50.0, 0.0),
                plain_node(97, 50.0, 0.0),
            ],
            ways: vec![way(500, &[("amenity", "bus_station")], &ring)],
            rels: vec![],
        },
        tracks: vec![way(400, &[("highway", "secondary")], &[96, 41, 97])],
    };
    let frames = run(&source).await;

    assert_eq!(frames.stops.len(), 1);
    assert_eq!(frames.stops[0].render, 4);
}

#[tokio::test]
async fn bus_pole_on_the_road_is_reclassified_as_stopo() {
    let source = CannedSource {
        objects: Elements {
            nodes: vec![
                tagged_node(61, 0.0, 0.0, &[("highway", "bus_stop")]),
                plain_node(96, -50.0, 0.0),
                plain_node(97, 50.0, 0.0),
            ],
            ways: vec![],
            rels: vec![],
        },
        tracks: vec![way(600, &[("highway", "tertiary")], &[96, 61, 97])],
    };
    let frames = run(&source).await;

    // the node stays a stop position; the pole reading is dropped
    assert!(frames.stopos.contains_key(&61));
    assert!(!frames.poles.contains_key(&61));
    let stopo = &frames.stopos[&61];
    assert!(stopo.mods.contains(Modality::Bus));
    assert!(!stopo.obj.core.comments.is_empty());
    assert_eq!(frames.stops.len(), 1);
    assert_eq!(frames.stops[0].stopo_id, 61);
}

#[tokio::test]
async fn reruns_are_deterministic() {
    let ring = [20, 21, 22, 23, 20];
    let source = CannedSource {
        objects: Elements {
            nodes: vec![
                plain_node(20, -15.0, 3.0),
                plain_node(21, 15.0, 3.0),
                plain_node(22, 15.0, 6.0),
                plain_node(23, -15.0, 6.0),
                tagged_node(31, -5.0, 0.0, &[("highway", "bus_stop")]),
                tagged_node(32, 5.0, 0.0, &[("railway", "tram_stop")]),
                plain_node(92, -60.0, 0.0),
                plain_node(93, 60.0, 0.0),
                plain_node(94, -60.0, 0.5),
                plain_node(95, 60.0, 0.5),
            ],
            ways: vec![way(300, &[("public_transport", "platform")], &ring)],
            rels: vec![],
        },
        tracks: vec![
            way(301, &[("highway", "residential")], &[92, 31, 93]),
            way(302, &[("railway", "tram")], &[94, 32, 95]),
        ],
    };

    let digest = |frames: &RegionFrames| {
        frames
            .stops
            .iter()
            .map(|stop| {
                (
                    stop.plole_id,
                    stop.plafo_id,
                    stop.pole_id,
                    stop.stopo_id,
                    stop.mods.to_string(),
                    stop.maybe_mods.to_string(),
                    stop.render,
                    stop.ptv2,
                )
            })
            .collect::<Vec<_>>()
    };
    let first = run(&source).await;
    let second = run(&source).await;
    assert_eq!(digest(&first), digest(&second));
}

#[tokio::test]
async fn no_plole_member_is_bound_twice() {
    let ring_a = [70, 71, 72, 73, 70];
    let ring_b = [74, 75, 76, 77, 74];
    let source = CannedSource {
        objects: Elements {
            nodes: vec![
                plain_node(70, -20.0, 2.0),
                plain_node(71, -2.0, 2.0),
                plain_node(72, -2.0, 6.0),
                plain_node(73, -20.0, 6.0),
                plain_node(74, 2.0, 2.0),
                plain_node(75, 12.0, 2.0),
                plain_node(76, 12.0, 6.0),
                plain_node(77, 2.0, 6.0),
                // one pole between two platforms, in range of both
                tagged_node(80, 0.0, 0.0, &[("public_transport", "platform"), ("bus", "yes")]),
            ],
            ways: vec![
                way(700, &[("public_transport", "platform"), ("bus", "yes")], &ring_a),
                way(701, &[("public_transport", "platform"), ("bus", "yes")], &ring_b),
            ],
            rels: vec![],
        },
        tracks: vec![],
    };
    let frames = run(&source).await;

    let bound: Vec<i64> = frames
        .ploles
        .iter()
        .filter(|plole| plole.pole_id > 0)
        .map(|plole| plole.pole_id)
        .collect();
    assert_eq!(bound, vec![80]);
    // the larger platform wins the contested pole
    let winner = frames
        .ploles
        .iter()
        .find(|plole| plole.pole_id == 80)
        .unwrap();
    assert_eq!(winner.plafo_id, 700);
    // the loser still forms a plafo-only plole
    assert!(frames
        .ploles
        .iter()
        .any(|plole| plole.plafo_id == 701 && plole.pole_id == 0));
    // the pole carries the double-binding warning
    let pole = frames.poles[&80].obj.as_ref().unwrap();
    assert!(pole
        .core
        .warnings
        .iter()
        .any(|warning| warning.contains("already assigned")));
}
