use geo::{Geometry, MultiPolygon, Point};
use indexmap::IndexMap;

use model::{Area, ModSet, Node, ObjectCore};

/// Tag-match components of one candidate/anchor pairing, each in
/// {-1, 0, +1}.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreParts {
    pub ifopt: i8,
    pub reference: i8,
    pub local_ref: i8,
    pub ref_name: i8,
    pub name: i8,
    pub layer: i8,
    pub level: i8,
}

impl ScoreParts {
    /// Composite tag score; identifier agreement dominates name agreement.
    pub fn weighted(self) -> f64 {
        f64::from(
            10 * i32::from(self.ifopt)
                + 2 * i32::from(self.reference)
                + 2 * i32::from(self.local_ref)
                + i32::from(self.ref_name)
                + i32::from(self.name)
                + i32::from(self.layer)
                + 2 * i32::from(self.level),
        )
    }
}

/// What is known about one nearby candidate of an anchor.
#[derive(Debug, Clone, Default)]
pub struct MatchInfo {
    pub mods_match: bool,
    pub parts: Option<ScoreParts>,
    pub score: Option<f64>,
    /// Filled during stop assembly when the candidate ends up in a stop.
    pub stop_id: Option<i64>,
}

/// Nearby candidates of one anchor: every neighbor inside the radius plus
/// the ranked ids of those that match and score positive.
#[derive(Debug, Clone, Default)]
pub struct NearbyList {
    pub infos: IndexMap<i64, MatchInfo>,
    pub ranked: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct StopoRow {
    pub geo: Point<f64>,
    pub obj: Node,
    pub tag_mods: ModSet,
    pub tag_maybe_mods: ModSet,
    pub track_mods: ModSet,
    pub mods: ModSet,
    pub in_stop: bool,
    pub lon: f64,
    pub lat: f64,
}

impl StopoRow {
    pub fn new(geo: Point<f64>, obj: Node) -> Self {
        Self {
            geo,
            obj,
            tag_mods: ModSet::EMPTY,
            tag_maybe_mods: ModSet::EMPTY,
            track_mods: ModSet::EMPTY,
            mods: ModSet::EMPTY,
            in_stop: false,
            lon: 0.0,
            lat: 0.0,
        }
    }
}

/// A pole row. Virtual poles synthesized during stop assembly carry no
/// source object.
#[derive(Debug, Clone)]
pub struct PoleRow {
    pub geo: Point<f64>,
    pub obj: Option<Node>,
    pub tag_mods: ModSet,
    pub tag_maybe_mods: ModSet,
    pub track_mods: ModSet,
    pub mods: ModSet,
    pub maybe_mods: ModSet,
    pub stopo: NearbyList,
    pub has_plafo: bool,
    pub in_stop: bool,
    pub lon: f64,
    pub lat: f64,
}

impl PoleRow {
    pub fn new(geo: Point<f64>, obj: Node) -> Self {
        Self {
            geo,
            obj: Some(obj),
            tag_mods: ModSet::EMPTY,
            tag_maybe_mods: ModSet::EMPTY,
            track_mods: ModSet::EMPTY,
            mods: ModSet::EMPTY,
            maybe_mods: ModSet::EMPTY,
            stopo: NearbyList::default(),
            has_plafo: false,
            in_stop: false,
            lon: 0.0,
            lat: 0.0,
        }
    }

    pub fn virtual_pole(geo: Point<f64>) -> Self {
        Self {
            geo,
            obj: None,
            tag_mods: ModSet::EMPTY,
            tag_maybe_mods: ModSet::EMPTY,
            track_mods: ModSet::EMPTY,
            mods: ModSet::EMPTY,
            maybe_mods: ModSet::EMPTY,
            stopo: NearbyList::default(),
            has_plafo: false,
            in_stop: true,
            lon: 0.0,
            lat: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlafoRow {
    pub geo: MultiPolygon<f64>,
    pub obj: Area,
    pub mods: ModSet,
    pub maybe_mods: ModSet,
    pub stopo: NearbyList,
    pub pole: NearbyList,
    pub has_poles: bool,
    pub lon: f64,
    pub lat: f64,
}

impl PlafoRow {
    pub fn new(geo: MultiPolygon<f64>, obj: Area) -> Self {
        Self {
            geo,
            obj,
            mods: ModSet::EMPTY,
            maybe_mods: ModSet::EMPTY,
            stopo: NearbyList::default(),
            pole: NearbyList::default(),
            has_poles: false,
            lon: 0.0,
            lat: 0.0,
        }
    }
}

/// A node or an area kept for context (stations) or review (dubobs).
#[derive(Debug, Clone)]
pub enum SourceObject {
    Node(Node),
    Area(Area),
}

impl SourceObject {
    pub fn core(&self) -> &ObjectCore {
        match self {
            SourceObject::Node(n) => &n.core,
            SourceObject::Area(a) => &a.core,
        }
    }

    pub fn core_mut(&mut self) -> &mut ObjectCore {
        match self {
            SourceObject::Node(n) => &mut n.core,
            SourceObject::Area(a) => &mut a.core,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StationRow {
    pub geo: MultiPolygon<f64>,
    pub obj: SourceObject,
    pub mods: ModSet,
    pub maybe_mods: ModSet,
}

#[derive(Debug, Clone)]
pub struct DubobRow {
    pub geo: Geometry<f64>,
    pub obj: SourceObject,
    pub lon: f64,
    pub lat: f64,
}

/// A matched platform/pole pair. Id 0 marks an absent member; at most one
/// of the two is absent.
#[derive(Debug, Clone)]
pub struct PloleRow {
    pub plafo_id: i64,
    pub pole_id: i64,
    pub mods: ModSet,
    pub maybe_mods: ModSet,
    pub stopo_ids: Vec<i64>,
    pub stopo_infos: IndexMap<i64, MatchInfo>,
}

#[derive(Debug, Clone)]
pub struct StopRow {
    /// Index into the plole list, -1 for orphan stop positions.
    pub plole_id: i64,
    pub plafo_id: i64,
    pub pole_id: i64,
    pub stopo_id: i64,
    pub stopo_reason: String,
    pub geo: MultiPolygon<f64>,
    pub warnings: Vec<String>,
    pub mods: ModSet,
    pub maybe_mods: ModSet,
    pub member_comments: bool,
    pub member_warnings: bool,
    pub render: u8,
    pub ptv2: u8,
    pub lon: f64,
    pub lat: f64,
}

impl StopRow {
    pub fn new(plole_id: i64, plafo_id: i64, pole_id: i64, stopo_id: i64, reason: &str) -> Self {
        Self {
            plole_id,
            plafo_id,
            pole_id,
            stopo_id,
            stopo_reason: reason.to_owned(),
            geo: MultiPolygon::new(Vec::new()),
            warnings: Vec::new(),
            mods: ModSet::EMPTY,
            maybe_mods: ModSet::EMPTY,
            member_comments: false,
            member_warnings: false,
            render: 0,
            ptv2: 0,
            lon: 0.0,
            lat: 0.0,
        }
    }
}

/// All per-region state the pipeline accumulates. Stop ids are 1-based row
/// numbers; a stop's virtual pole id is the negated stop id.
#[derive(Debug, Default)]
pub struct RegionFrames {
    pub stopos: IndexMap<i64, StopoRow>,
    pub poles: IndexMap<i64, PoleRow>,
    pub plafos: IndexMap<i64, PlafoRow>,
    pub stations: Vec<StationRow>,
    pub dubobs: Vec<DubobRow>,
    pub ploles: Vec<PloleRow>,
    pub stops: Vec<StopRow>,
}

impl RegionFrames {
    pub fn stop_id(index: usize) -> i64 {
        index as i64 + 1
    }

    pub fn stop_index(stop_id: i64) -> usize {
        (stop_id - 1) as usize
    }
}
