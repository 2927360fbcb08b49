use std::collections::HashMap;

use geo::{Centroid, Contains, Intersects};

use model::{ModSet, Modality};
use utility::crs::CrsError;

use crate::frames::RegionFrames;
use crate::RegionCrs;

/// Derives each stop's modality sets from its plole and stop position.
///
/// A definite agreement between plole and stopo settles the stop; an
/// ambiguous agreement collapses to definite only when it is a single
/// modality or the stopo serves a single stop.
pub fn derive_stop_mods(frames: &mut RegionFrames) {
    let mut stopo_use: HashMap<i64, usize> = HashMap::new();
    for stop in &frames.stops {
        if stop.stopo_id > 0 {
            *stopo_use.entry(stop.stopo_id).or_default() += 1;
        }
    }

    for index in 0..frames.stops.len() {
        let stop = &frames.stops[index];
        let (plole_mods, plole_maybe_mods) = if stop.plole_id > -1 {
            let plole = &frames.ploles[stop.plole_id as usize];
            (plole.mods, plole.maybe_mods)
        } else {
            (ModSet::EMPTY, ModSet::EMPTY)
        };
        let stopo_mods = if stop.stopo_id > 0 {
            frames.stopos[&stop.stopo_id].mods
        } else {
            ModSet::EMPTY
        };

        let (mods, maybe_mods) = if stop.plole_id == -1 {
            (stopo_mods, ModSet::EMPTY)
        } else if stop.stopo_id == 0 {
            if !plole_mods.is_empty() {
                (plole_mods, plole_maybe_mods)
            } else if plole_maybe_mods.len() == 1 {
                (plole_maybe_mods, ModSet::EMPTY)
            } else {
                (ModSet::EMPTY, plole_maybe_mods)
            }
        } else {
            let settled = plole_mods & stopo_mods;
            let ambiguous = plole_maybe_mods & stopo_mods;
            if !settled.is_empty() {
                (settled, ambiguous)
            } else if ambiguous.len() == 1
                || stopo_use.get(&stop.stopo_id).copied().unwrap_or(0) == 1
            {
                (ambiguous, ModSet::EMPTY)
            } else {
                (ModSet::EMPTY, ambiguous)
            }
        };
        frames.stops[index].mods = mods;
        frames.stops[index].maybe_mods = maybe_mods;
    }
}

/// Explains stops that ended up without a definite modality.
pub fn warn_empty_mods(frames: &mut RegionFrames) {
    for index in 0..frames.stops.len() {
        let stop = &frames.stops[index];
        if !stop.mods.is_empty() {
            continue;
        }
        let warning = if stop.pole_id <= 0 && stop.stopo_id == 0 {
            format!(
                "platform-only stop with ambiguous modalities {} (add a stop \
                 position to clarify modalities)",
                stop.maybe_mods
            )
        } else if stop.pole_id > 0 {
            let pole = &frames.poles[&stop.pole_id];
            let bus_pole_on_road = pole.obj.as_ref().is_some_and(|obj| {
                obj.core.has_tag("public_transport", "platform")
                    && obj.core.has_tag("highway", "bus_stop")
                    && !pole.mods.contains(Modality::Bus)
                    && !obj.core.has_tag("bus", "no")
            });
            if bus_pole_on_road {
                "stop has a bus pole on a road (probably supposed to be a stop \
                 position)"
                    .to_owned()
            } else if stop.stopo_id == 0 {
                format!(
                    "stop with ambiguous modalities {} (add a stop position to \
                     clarify modalities)",
                    stop.maybe_mods
                )
            } else {
                format!(
                    "stop with ambiguous modalities {} (check carefully, really \
                     really weird)",
                    stop.maybe_mods
                )
            }
        } else {
            format!(
                "stop with ambiguous modalities {} (check carefully, really weird)",
                stop.maybe_mods
            )
        };
        frames.stops[index].warnings.push(warning);
    }
}

/// Flags stops whose members carry comments or warnings.
pub fn flag_member_diagnostics(frames: &mut RegionFrames) {
    for index in 0..frames.stops.len() {
        let stop = &frames.stops[index];
        let mut comments = false;
        let mut warnings = false;
        if stop.plafo_id != 0 {
            let core = &frames.plafos[&stop.plafo_id].obj.core;
            comments |= !core.comments.is_empty();
            warnings |= !core.warnings.is_empty();
        }
        if stop.pole_id > 0 {
            if let Some(obj) = &frames.poles[&stop.pole_id].obj {
                comments |= !obj.core.comments.is_empty();
                warnings |= !obj.core.warnings.is_empty();
            }
        }
        if stop.stopo_id > 0 {
            let core = &frames.stopos[&stop.stopo_id].obj.core;
            comments |= !core.comments.is_empty();
            warnings |= !core.warnings.is_empty();
        }
        frames.stops[index].member_comments = comments;
        frames.stops[index].member_warnings = warnings;
    }
}

/// Grades how a bus stop renders on a standard map: 0 no info, 1 invisible,
/// 2 incorrect (multiple or misplaced symbols), 3 good, 4 invisible but
/// inside a bus station.
pub fn grade_render(frames: &mut RegionFrames) {
    for index in 0..frames.stops.len() {
        let stop = &frames.stops[index];
        if !stop.mods.contains(Modality::Bus) {
            continue;
        }
        let stopo_symbol = stop.stopo_id > 0
            && frames.stopos[&stop.stopo_id]
                .obj
                .core
                .has_tag("highway", "bus_stop");
        let pole_symbol = stop.pole_id > 0
            && frames.poles[&stop.pole_id]
                .obj
                .as_ref()
                .is_some_and(|obj| obj.core.has_tag("highway", "bus_stop"));
        let (plafo_symbol, plafo_visible) = if stop.plafo_id != 0 {
            let core = &frames.plafos[&stop.plafo_id].obj.core;
            let as_area = core.has_tag("area", "yes") || core.tags.contains_key("building");
            let symbol = core.has_tag("highway", "bus_stop") && as_area;
            let visible = core.has_tag("highway", "platform")
                || core.has_tag("railway", "platform")
                || symbol;
            (symbol, visible)
        } else {
            (false, false)
        };

        let symbols = usize::from(stopo_symbol) + usize::from(pole_symbol)
            + usize::from(plafo_symbol);
        let render = if symbols == 0 {
            1
        } else if symbols > 1 {
            2
        } else if !plafo_visible && stop.pole_id > 0 && !pole_symbol {
            2
        } else if !plafo_visible && stop.pole_id <= 0 {
            2
        } else {
            3
        };
        frames.stops[index].render = render;
    }
}

/// Upgrades invisible bus stops lying inside a bus-capable station.
pub fn upgrade_station_stops(frames: &mut RegionFrames) {
    let bus_stations: Vec<&geo::MultiPolygon<f64>> = frames
        .stations
        .iter()
        .filter(|station| station.mods.contains(Modality::Bus))
        .map(|station| &station.geo)
        .collect();
    if bus_stations.is_empty() {
        return;
    }

    let mut upgrades = Vec::new();
    for (index, stop) in frames.stops.iter().enumerate() {
        if stop.render != 1 || !stop.mods.contains(Modality::Bus) {
            continue;
        }
        let in_station = (stop.plafo_id != 0
            && bus_stations
                .iter()
                .any(|geo| geo.intersects(&frames.plafos[&stop.plafo_id].geo)))
            || (stop.pole_id > 0
                && bus_stations
                    .iter()
                    .any(|geo| geo.contains(&frames.poles[&stop.pole_id].geo)))
            || (stop.stopo_id > 0
                && bus_stations
                    .iter()
                    .any(|geo| geo.contains(&frames.stopos[&stop.stopo_id].geo)));
        if in_station {
            upgrades.push(index);
        }
    }
    for index in upgrades {
        frames.stops[index].render = 4;
    }
}

/// Grades PTv2 adoption: 1 none of the members uses the new schema, 2 some
/// do, 3 all do.
pub fn grade_ptv2(frames: &mut RegionFrames) {
    for index in 0..frames.stops.len() {
        let stop = &frames.stops[index];
        let stopo_pt = stop.stopo_id > 0
            && frames.stopos[&stop.stopo_id]
                .obj
                .core
                .tags
                .contains_key("public_transport");
        let pole_pt = stop.pole_id > 0
            && frames.poles[&stop.pole_id]
                .obj
                .as_ref()
                .is_some_and(|obj| obj.core.tags.contains_key("public_transport"));
        let plafo_pt = stop.plafo_id != 0
            && frames.plafos[&stop.plafo_id]
                .obj
                .core
                .tags
                .contains_key("public_transport");

        let tagged = usize::from(stopo_pt) + usize::from(pole_pt) + usize::from(plafo_pt);
        let members = usize::from(stop.stopo_id > 0)
            + usize::from(stop.pole_id > 0)
            + usize::from(stop.plafo_id != 0);
        frames.stops[index].ptv2 = if tagged == 0 {
            1
        } else if tagged == members {
            3
        } else {
            2
        };
    }
}

/// Computes the geographic popup anchor of every exported row. Stops anchor
/// on their pole, real or virtual.
pub fn set_popup_anchors(frames: &mut RegionFrames, crs: &RegionCrs) -> Result<(), CrsError> {
    for row in frames.stopos.values_mut() {
        let p = crs.to_lon_lat.point(row.geo)?;
        row.lon = p.x();
        row.lat = p.y();
    }
    for row in frames.poles.values_mut() {
        let p = crs.to_lon_lat.point(row.geo)?;
        row.lon = p.x();
        row.lat = p.y();
    }
    for row in frames.plafos.values_mut() {
        if let Some(centroid) = row.geo.centroid() {
            let p = crs.to_lon_lat.point(centroid)?;
            row.lon = p.x();
            row.lat = p.y();
        }
    }
    for row in frames.dubobs.iter_mut() {
        if let Some(centroid) = row.geo.centroid() {
            let p = crs.to_lon_lat.point(centroid)?;
            row.lon = p.x();
            row.lat = p.y();
        }
    }
    for index in 0..frames.stops.len() {
        let pole_id = frames.stops[index].pole_id;
        if let Some(pole) = frames.poles.get(&pole_id) {
            frames.stops[index].lon = pole.lon;
            frames.stops[index].lat = pole.lat;
        }
    }
    Ok(())
}
