use std::fmt;
use std::ops::{BitAnd, BitOr, Sub};

use crate::Tags;

/// Transport modality a stop component may serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modality {
    Bus,
    Trolleybus,
    ShareTaxi,
    Tram,
    LightRail,
    Train,
    Monorail,
    Subway,
    Funicular,
    Ferry,
    Aerialway,
}

/// Trivalent outcome of a tag assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    Yes,
    Maybe,
    No,
}

const ROAD_TRACK_TAGS: &[(&str, &[&str])] = &[
    (
        "highway",
        &[
            "motorway",
            "trunk",
            "primary",
            "secondary",
            "tertiary",
            "unclassified",
            "residential",
            "road",
            "busway",
            "bus_guideway",
            "service",
            "living_street",
            "construction",
            "track",
            "motorway_link",
            "trunk_link",
            "primary_link",
            "secondary_link",
            "tertiary_link",
        ],
    ),
    ("psv", &["yes"]),
];

impl Modality {
    pub const ALL: [Modality; 11] = [
        Modality::Bus,
        Modality::Trolleybus,
        Modality::ShareTaxi,
        Modality::Tram,
        Modality::LightRail,
        Modality::Train,
        Modality::Monorail,
        Modality::Subway,
        Modality::Funicular,
        Modality::Ferry,
        Modality::Aerialway,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Modality::Bus => "bus",
            Modality::Trolleybus => "trolleybus",
            Modality::ShareTaxi => "share_taxi",
            Modality::Tram => "tram",
            Modality::LightRail => "light_rail",
            Modality::Train => "train",
            Modality::Monorail => "monorail",
            Modality::Subway => "subway",
            Modality::Funicular => "funicular",
            Modality::Ferry => "ferry",
            Modality::Aerialway => "aerialway",
        }
    }

    /// Tag patterns of the ways this modality runs on.
    pub fn track_tags(self) -> &'static [(&'static str, &'static [&'static str])] {
        match self {
            Modality::Bus | Modality::Trolleybus | Modality::ShareTaxi => ROAD_TRACK_TAGS,
            Modality::Tram => &[("railway", &["tram"])],
            Modality::LightRail => &[("railway", &["light_rail"])],
            Modality::Train => &[("railway", &["miniature", "narrow_gauge", "rail", "preserved"])],
            Modality::Monorail => &[("railway", &["monorail"])],
            Modality::Subway => &[("railway", &["subway"])],
            Modality::Funicular => &[("railway", &["funicular"])],
            Modality::Ferry => &[("route", &["ferry"])],
            Modality::Aerialway => &[(
                "aerialway",
                &[
                    "cable_car",
                    "gondola",
                    "mixed_lift",
                    "chair_lift",
                    "drag_lift",
                    "t-bar",
                    "j-bar",
                    "platter",
                    "rope_tow",
                    "magic_carpet",
                    "zip_line",
                    "goods",
                ],
            )],
        }
    }

    /// Assesses whether the tags mark the object as serving this modality.
    pub fn assess(self, tags: &Tags) -> Assessment {
        match self {
            Modality::Bus => assess_bus(tags),
            Modality::Trolleybus => assess_trolleybus(tags),
            Modality::ShareTaxi => assess_share_taxi(tags),
            Modality::Tram => assess_tram(tags),
            Modality::LightRail => assess_light_rail(tags),
            Modality::Train => assess_train(tags),
            Modality::Monorail => assess_rail_flagged(tags, "monorail"),
            Modality::Subway => assess_rail_flagged(tags, "subway"),
            Modality::Funicular => assess_rail_flagged(tags, "funicular"),
            Modality::Ferry => assess_ferry(tags),
            Modality::Aerialway => assess_aerialway(tags),
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn assess_bus(tags: &Tags) -> Assessment {
    if tags.has("bus", "no") {
        return Assessment::No;
    }
    if tags.has("bus", "yes") || tags.has("bus", "school") {
        return Assessment::Yes;
    }
    if tags.has("highway", "bus_stop")
        || tags.has("amenity", "bus_stop")
        || tags.has("amenity", "bus_station")
    {
        return Assessment::Yes;
    }
    // hw=platform is for bus and tram
    if tags.has("highway", "platform") || tags.has("public_transport", "platform") {
        return Assessment::Maybe;
    }
    Assessment::No
}

fn assess_trolleybus(tags: &Tags) -> Assessment {
    if tags.has("trolleybus", "no") {
        return Assessment::No;
    }
    if tags.has("trolleybus", "yes") {
        return Assessment::Yes;
    }
    if tags.has("public_transport", "platform") {
        return Assessment::Maybe;
    }
    Assessment::No
}

fn assess_share_taxi(tags: &Tags) -> Assessment {
    // the shared_taxi spelling shows up in the wild as well
    if tags.has("share_taxi", "no") || tags.has("shared_taxi", "no") {
        return Assessment::No;
    }
    if tags.has("share_taxi", "yes") || tags.has("shared_taxi", "yes") {
        return Assessment::Yes;
    }
    Assessment::No
}

fn assess_tram(tags: &Tags) -> Assessment {
    if tags.has("tram", "no") {
        return Assessment::No;
    }
    if tags.has("tram", "yes") || tags.has("station", "tram") {
        return Assessment::Yes;
    }
    // rw=tram_stop could also be light_rail, rw=station/halt any rail kind
    if tags.has("railway", "tram_stop")
        || tags.has("railway", "station")
        || tags.has("railway", "halt")
        || tags.has("highway", "platform")
        || tags.has("railway", "platform")
        || tags.has("public_transport", "platform")
    {
        return Assessment::Maybe;
    }
    Assessment::No
}

fn assess_light_rail(tags: &Tags) -> Assessment {
    if tags.has("light_rail", "no") {
        return Assessment::No;
    }
    if tags.has("light_rail", "yes") || tags.has("station", "light_rail") {
        return Assessment::Yes;
    }
    if tags.has("railway", "tram_stop")
        || tags.has("railway", "station")
        || tags.has("railway", "halt")
        || tags.has("railway", "platform")
        || tags.has("public_transport", "platform")
    {
        return Assessment::Maybe;
    }
    Assessment::No
}

fn assess_train(tags: &Tags) -> Assessment {
    if tags.has("train", "no") {
        return Assessment::No;
    }
    if tags.has("train", "yes") || tags.has("station", "train") {
        return Assessment::Yes;
    }
    // rw=stop without train=yes may still refer to trains as the default
    // rail modality
    if tags.has("railway", "stop")
        || tags.has("railway", "station")
        || tags.has("railway", "halt")
        || tags.has("railway", "platform")
        || tags.has("public_transport", "platform")
    {
        return Assessment::Maybe;
    }
    Assessment::No
}

/// Shared shape of the monorail/subway/funicular assessments: an explicit
/// flag or `station=<mod>` confirms, `railway=stop` counts only without a
/// PTv2 stop position tag.
fn assess_rail_flagged(tags: &Tags, flag: &str) -> Assessment {
    if tags.has(flag, "no") {
        return Assessment::No;
    }
    if tags.has(flag, "yes") || tags.has("station", flag) {
        return Assessment::Yes;
    }
    if tags.has("railway", "stop") && !tags.has("public_transport", "stop_position") {
        return Assessment::Maybe;
    }
    if tags.has("railway", "station")
        || tags.has("railway", "halt")
        || tags.has("railway", "platform")
        || tags.has("public_transport", "platform")
    {
        return Assessment::Maybe;
    }
    Assessment::No
}

fn assess_ferry(tags: &Tags) -> Assessment {
    if tags.has("ferry", "no") {
        return Assessment::No;
    }
    if tags.has("ferry", "yes") || tags.has("amenity", "ferry_terminal") {
        return Assessment::Yes;
    }
    if tags.has("public_transport", "platform") {
        return Assessment::Maybe;
    }
    Assessment::No
}

fn assess_aerialway(tags: &Tags) -> Assessment {
    if tags.has("aerialway", "no") {
        return Assessment::No;
    }
    if tags.has("aerialway", "yes") || tags.has("aerialway", "station") {
        return Assessment::Yes;
    }
    if tags.has("public_transport", "platform") {
        return Assessment::Maybe;
    }
    Assessment::No
}

/// Set of modalities. Iteration and formatting follow declaration order,
/// keeping every derived output deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModSet(u16);

impl ModSet {
    pub const EMPTY: ModSet = ModSet(0);

    pub fn single(modality: Modality) -> Self {
        ModSet(1 << modality as u16)
    }

    pub fn insert(&mut self, modality: Modality) {
        self.0 |= 1 << modality as u16;
    }

    pub fn remove(&mut self, modality: Modality) {
        self.0 &= !(1 << modality as u16);
    }

    pub fn contains(self, modality: Modality) -> bool {
        self.0 & (1 << modality as u16) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn extend(&mut self, other: ModSet) {
        self.0 |= other.0;
    }

    pub fn intersects(self, other: ModSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_subset(self, other: ModSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Modality> {
        Modality::ALL.into_iter().filter(move |m| self.contains(*m))
    }

    pub fn names(self) -> Vec<&'static str> {
        self.iter().map(Modality::name).collect()
    }
}

impl BitOr for ModSet {
    type Output = ModSet;

    fn bitor(self, rhs: ModSet) -> ModSet {
        ModSet(self.0 | rhs.0)
    }
}

impl BitAnd for ModSet {
    type Output = ModSet;

    fn bitand(self, rhs: ModSet) -> ModSet {
        ModSet(self.0 & rhs.0)
    }
}

impl Sub for ModSet {
    type Output = ModSet;

    fn sub(self, rhs: ModSet) -> ModSet {
        ModSet(self.0 & !rhs.0)
    }
}

impl FromIterator<Modality> for ModSet {
    fn from_iter<I: IntoIterator<Item = Modality>>(iter: I) -> Self {
        let mut set = ModSet::EMPTY;
        for modality in iter {
            set.insert(modality);
        }
        set
    }
}

/// `bus, tram` style rendering with a sentinel for the empty set.
impl fmt::Display for ModSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NO_MODALITY");
        }
        let mut first = true;
        for modality in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(modality.name())?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter().copied().collect()
    }

    #[test]
    fn bus_assessments() {
        assert_eq!(
            Modality::Bus.assess(&tags(&[("highway", "bus_stop")])),
            Assessment::Yes
        );
        assert_eq!(
            Modality::Bus.assess(&tags(&[("bus", "school")])),
            Assessment::Yes
        );
        assert_eq!(
            Modality::Bus.assess(&tags(&[("public_transport", "platform")])),
            Assessment::Maybe
        );
        assert_eq!(
            Modality::Bus.assess(&tags(&[("highway", "bus_stop"), ("bus", "no")])),
            Assessment::No
        );
        assert_eq!(Modality::Bus.assess(&tags(&[])), Assessment::No);
    }

    #[test]
    fn tram_stop_is_ambiguous_between_tram_and_light_rail() {
        let t = tags(&[("railway", "tram_stop")]);
        assert_eq!(Modality::Tram.assess(&t), Assessment::Maybe);
        assert_eq!(Modality::LightRail.assess(&t), Assessment::Maybe);
        assert_eq!(Modality::Subway.assess(&t), Assessment::No);
    }

    #[test]
    fn railway_stop_defaults_to_train_even_with_ptv2_tag() {
        let t = tags(&[("railway", "stop"), ("public_transport", "stop_position")]);
        assert_eq!(Modality::Train.assess(&t), Assessment::Maybe);
        // the flagged rail kinds only accept rw=stop without a PTv2 stopo tag
        assert_eq!(Modality::Subway.assess(&t), Assessment::No);
        assert_eq!(Modality::Monorail.assess(&t), Assessment::No);
        let bare = tags(&[("railway", "stop")]);
        assert_eq!(Modality::Subway.assess(&bare), Assessment::Maybe);
    }

    #[test]
    fn share_taxi_without_flags_is_excluded() {
        assert_eq!(
            Modality::ShareTaxi.assess(&tags(&[("public_transport", "platform")])),
            Assessment::No
        );
        assert_eq!(
            Modality::ShareTaxi.assess(&tags(&[("shared_taxi", "yes")])),
            Assessment::Yes
        );
    }

    #[test]
    fn mod_set_algebra_and_order() {
        let a: ModSet = [Modality::Tram, Modality::Bus].into_iter().collect();
        let b = ModSet::single(Modality::Tram);
        assert_eq!((a & b).names(), vec!["tram"]);
        assert_eq!((a - b).names(), vec!["bus"]);
        assert_eq!((a | b).len(), 2);
        assert!(b.is_subset(a));
        assert!(!a.is_subset(b));
        // declaration order, not insertion order
        assert_eq!(a.to_string(), "bus, tram");
        assert_eq!(ModSet::EMPTY.to_string(), "NO_MODALITY");
    }
}
