use std::fmt;

pub mod area;
pub mod modality;
pub mod tags;

pub use area::{Area, AreaError};
pub use modality::{Assessment, ModSet, Modality};
pub use tags::Tags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Node,
    Way,
    Relation,
    WayArea,
    MupoArea,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Node => "node",
            ObjectKind::Way => "way",
            ObjectKind::Relation => "rel",
            ObjectKind::WayArea => "way_area",
            ObjectKind::MupoArea => "mupo_area",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity, tags and diagnostics shared by every raw object and area.
///
/// Comments and warnings are append-only; they flow through to the export
/// layer unchanged and are additionally logged when attached.
#[derive(Debug, Clone)]
pub struct ObjectCore {
    pub kind: ObjectKind,
    pub id: i64,
    pub tags: Tags,
    pub comments: Vec<String>,
    pub warnings: Vec<String>,
}

impl ObjectCore {
    pub fn new(kind: ObjectKind, id: i64, tags: Tags) -> Self {
        Self {
            kind,
            id,
            tags,
            comments: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn comment(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::info!("comment for {} {}: {}", self.kind, self.id, text);
        self.comments.push(text);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::info!("warning for {} {}: {}", self.kind, self.id, text);
        self.warnings.push(text);
    }

    pub fn has_tag(&self, key: &str, value: &str) -> bool {
        self.tags.has(key, value)
    }
}

impl fmt::Display for ObjectCore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub core: ObjectCore,
    pub lon: f64,
    pub lat: f64,
}

impl Node {
    pub fn new(id: i64, tags: Tags, lon: f64, lat: f64) -> Self {
        Self {
            core: ObjectCore::new(ObjectKind::Node, id, tags),
            lon,
            lat,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Way {
    pub core: ObjectCore,
    pub node_ids: Vec<i64>,
}

impl Way {
    pub fn new(id: i64, tags: Tags, node_ids: Vec<i64>) -> Self {
        Self {
            core: ObjectCore::new(ObjectKind::Way, id, tags),
            node_ids,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelMember {
    pub kind: ObjectKind,
    pub id: i64,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct Relation {
    pub core: ObjectCore,
    pub members: Vec<RelMember>,
}

impl Relation {
    pub fn new(id: i64, tags: Tags, members: Vec<RelMember>) -> Self {
        Self {
            core: ObjectCore::new(ObjectKind::Relation, id, tags),
            members,
        }
    }
}
