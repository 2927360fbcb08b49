use std::error;
use std::fmt;

use geo::{Coord, MapCoords, Point};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

/// Failure to parse a CRS definition or to project a coordinate.
#[derive(Debug)]
pub struct CrsError(proj4rs::errors::Error);

impl error::Error for CrsError {}

impl fmt::Display for CrsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "projection error: {}", self.0)
    }
}

impl From<proj4rs::errors::Error> for CrsError {
    fn from(e: proj4rs::errors::Error) -> Self {
        CrsError(e)
    }
}

/// One-way coordinate transformation between two proj-string definitions.
///
/// Geographic endpoints work in degrees; the radians conversion required by
/// the projection engine stays internal.
pub struct Transformer {
    from: Proj,
    to: Proj,
}

impl Transformer {
    pub fn new(from_def: &str, to_def: &str) -> Result<Self, CrsError> {
        Ok(Self {
            from: Proj::from_proj_string(from_def)?,
            to: Proj::from_proj_string(to_def)?,
        })
    }

    pub fn coord(&self, c: Coord<f64>) -> Result<Coord<f64>, CrsError> {
        let mut point = (c.x, c.y, 0.0);
        if self.from.is_latlong() {
            point.0 = point.0.to_radians();
            point.1 = point.1.to_radians();
        }
        transform(&self.from, &self.to, &mut point)?;
        if self.to.is_latlong() {
            point.0 = point.0.to_degrees();
            point.1 = point.1.to_degrees();
        }
        Ok(Coord {
            x: point.0,
            y: point.1,
        })
    }

    pub fn point(&self, p: Point<f64>) -> Result<Point<f64>, CrsError> {
        self.coord(p.0).map(Point::from)
    }

    /// Projects every coordinate of a geometry.
    pub fn geometry<G>(&self, geometry: &G) -> Result<G, CrsError>
    where
        G: MapCoords<f64, f64, Output = G>,
    {
        geometry.try_map_coords(|c| self.coord(c))
    }
}
