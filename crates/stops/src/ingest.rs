use geo::{Geometry, MultiPolygon, Point};

use model::{Area, Assessment, ModSet, Modality, Tags};
use utility::crs::{CrsError, Transformer};
use utility::geometry;

use crate::classify::Classified;
use crate::frames::{
    DubobRow, PlafoRow, PoleRow, RegionFrames, SourceObject, StationRow, StopoRow,
};
use crate::EngineParams;

/// Runs every modality assessment over one tag map.
fn assess(tags: &Tags) -> (ModSet, ModSet) {
    let mut mods = ModSet::EMPTY;
    let mut maybe_mods = ModSet::EMPTY;
    for modality in Modality::ALL {
        match modality.assess(tags) {
            Assessment::Yes => mods.insert(modality),
            Assessment::Maybe => maybe_mods.insert(modality),
            Assessment::No => {}
        }
    }
    (mods, maybe_mods)
}

fn area_surface(area: &Area, to_meters: &Transformer) -> Result<MultiPolygon<f64>, CrsError> {
    let lines = area
        .lines
        .iter()
        .map(|line| to_meters.geometry(line))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(geometry::polygonize(&lines))
}

/// Turns the classified bins into geometric frames in the region's metric
/// CRS and attaches the tag-derived modality sets.
pub fn build_frames(
    bins: Classified,
    to_meters: &Transformer,
    params: &EngineParams,
) -> Result<RegionFrames, CrsError> {
    let mut frames = RegionFrames::default();

    for (id, node) in bins.stopos {
        let geo = to_meters.point(Point::new(node.lon, node.lat))?;
        let (tag_mods, tag_maybe_mods) = assess(&node.core.tags);
        let mut row = StopoRow::new(geo, node);
        row.tag_mods = tag_mods;
        row.tag_maybe_mods = tag_maybe_mods;
        frames.stopos.insert(id, row);
    }

    for (id, node) in bins.poles {
        let geo = to_meters.point(Point::new(node.lon, node.lat))?;
        let (tag_mods, tag_maybe_mods) = assess(&node.core.tags);
        let mut row = PoleRow::new(geo, node);
        row.tag_mods = tag_mods;
        row.tag_maybe_mods = tag_maybe_mods;
        frames.poles.insert(id, row);
    }

    let mut empty_plafos = Vec::new();
    for area in bins.plafos {
        let geo = if area.from_line {
            let line = to_meters.geometry(&area.lines[0])?;
            geometry::buffer_line_flat(&line, params.half_plafo_width)
        } else {
            area_surface(&area, to_meters)?
        };
        if geo.0.is_empty() {
            empty_plafos.push(area.core.id);
            continue;
        }
        let (mods, maybe_mods) = assess(&area.core.tags);
        let mut row = PlafoRow::new(geo, area);
        row.mods = mods;
        row.maybe_mods = maybe_mods;
        frames.plafos.insert(row.obj.core.id, row);
    }
    if !empty_plafos.is_empty() {
        log::warn!("Dropping plafos with empty geometry: {:?}", empty_plafos);
    }

    for obj in bins.stations {
        let geo = match &obj {
            SourceObject::Node(node) => {
                let center = to_meters.point(Point::new(node.lon, node.lat))?;
                MultiPolygon::new(vec![geometry::circle(center.0, params.station_radius)])
            }
            SourceObject::Area(area) => {
                if area.from_line {
                    let line = to_meters.geometry(&area.lines[0])?;
                    geometry::buffer_line_round(&line, params.station_radius)
                } else {
                    area_surface(area, to_meters)?
                }
            }
        };
        let (mods, maybe_mods) = assess(&obj.core().tags);
        frames.stations.push(StationRow {
            geo,
            obj,
            mods,
            maybe_mods,
        });
    }

    for obj in bins.dubobs {
        let row = dubob_row(obj, to_meters)?;
        frames.dubobs.push(row);
    }

    log::info!("stop positions: {}", frames.stopos.len());
    log::info!("poles: {}", frames.poles.len());
    log::info!("platforms: {}", frames.plafos.len());
    Ok(frames)
}

/// A review row for an object that defied classification, in the metric CRS.
pub fn dubob_row(obj: SourceObject, to_meters: &Transformer) -> Result<DubobRow, CrsError> {
    let geo = match &obj {
        SourceObject::Node(node) => {
            Geometry::Point(to_meters.point(Point::new(node.lon, node.lat))?)
        }
        SourceObject::Area(area) => {
            if area.from_line {
                Geometry::LineString(to_meters.geometry(&area.lines[0])?)
            } else {
                Geometry::MultiPolygon(area_surface(area, to_meters)?)
            }
        }
    };
    Ok(DubobRow {
        geo,
        obj,
        lon: 0.0,
        lat: 0.0,
    })
}
