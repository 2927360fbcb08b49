use geo::{BooleanOps, ConvexHull, Coord, LineString, MultiPoint, MultiPolygon, Point, Polygon};

/// Segments per quarter circle when approximating round caps and joins.
const ARC_SEGMENTS: usize = 4;

fn arc(center: Coord<f64>, radius: f64, start: f64, end: f64, out: &mut Vec<Coord<f64>>) {
    let steps = 2 * ARC_SEGMENTS;
    for i in 0..=steps {
        let angle = start + (end - start) * i as f64 / steps as f64;
        out.push(Coord {
            x: center.x + radius * angle.cos(),
            y: center.y + radius * angle.sin(),
        });
    }
}

/// Regular polygon approximating the circle around `center`.
pub fn circle(center: Coord<f64>, radius: f64) -> Polygon<f64> {
    let n = 4 * ARC_SEGMENTS;
    let ring = (0..n)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            Coord {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect::<Vec<_>>();
    Polygon::new(LineString::new(ring), Vec::new())
}

/// The segment from `a` to `b` widened by `radius` with round end caps.
pub fn capsule(a: Coord<f64>, b: Coord<f64>, radius: f64) -> Polygon<f64> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if dx == 0.0 && dy == 0.0 {
        return circle(a, radius);
    }
    let theta = dy.atan2(dx);
    let half_pi = std::f64::consts::FRAC_PI_2;
    let mut ring = Vec::new();
    arc(b, radius, theta - half_pi, theta + half_pi, &mut ring);
    arc(a, radius, theta + half_pi, theta + 3.0 * half_pi, &mut ring);
    Polygon::new(LineString::new(ring), Vec::new())
}

fn segment_rectangle(a: Coord<f64>, b: Coord<f64>, half_width: f64) -> Option<Polygon<f64>> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return None;
    }
    let nx = -dy / len * half_width;
    let ny = dx / len * half_width;
    let ring = vec![
        Coord { x: a.x - nx, y: a.y - ny },
        Coord { x: b.x - nx, y: b.y - ny },
        Coord { x: b.x + nx, y: b.y + ny },
        Coord { x: a.x + nx, y: a.y + ny },
    ];
    Some(Polygon::new(LineString::new(ring), Vec::new()))
}

fn union_into(acc: MultiPolygon<f64>, piece: Polygon<f64>) -> MultiPolygon<f64> {
    if acc.0.is_empty() {
        return MultiPolygon::new(vec![piece]);
    }
    acc.union(&MultiPolygon::new(vec![piece]))
}

/// Widens an open polyline by `half_width` without extending it beyond its
/// end points (flat caps, round joins at interior vertices).
pub fn buffer_line_flat(line: &LineString<f64>, half_width: f64) -> MultiPolygon<f64> {
    let coords = &line.0;
    let mut acc = MultiPolygon::new(Vec::new());
    for pair in coords.windows(2) {
        if let Some(rect) = segment_rectangle(pair[0], pair[1], half_width) {
            acc = union_into(acc, rect);
        }
    }
    if coords.len() > 2 {
        for vertex in &coords[1..coords.len() - 1] {
            acc = union_into(acc, circle(*vertex, half_width));
        }
    }
    acc
}

/// Widens an open polyline by `radius` with round end caps.
pub fn buffer_line_round(line: &LineString<f64>, radius: f64) -> MultiPolygon<f64> {
    let mut acc = MultiPolygon::new(Vec::new());
    for pair in line.0.windows(2) {
        acc = union_into(acc, capsule(pair[0], pair[1], radius));
    }
    if acc.0.is_empty() {
        if let Some(first) = line.0.first() {
            acc = MultiPolygon::new(vec![circle(*first, radius)]);
        }
    }
    acc
}

/// Dilates a surface by `radius` with round joins: the surface united with
/// a capsule along every exterior edge.
pub fn buffer_surface_round(surface: &MultiPolygon<f64>, radius: f64) -> MultiPolygon<f64> {
    let mut acc = surface.clone();
    for polygon in &surface.0 {
        for pair in polygon.exterior().0.windows(2) {
            acc = union_into(acc, capsule(pair[0], pair[1], radius));
        }
    }
    acc
}

/// Convex hull of the given points, dilated by `radius` with round joins.
pub fn buffer_hull_round(points: &[Coord<f64>], radius: f64) -> MultiPolygon<f64> {
    match points {
        [] => MultiPolygon::new(Vec::new()),
        [p] => MultiPolygon::new(vec![circle(*p, radius)]),
        [a, b] => MultiPolygon::new(vec![capsule(*a, *b, radius)]),
        more => {
            let points: Vec<Point<f64>> = more.iter().map(|c| Point::from(*c)).collect();
            let hull = MultiPoint::from(points).convex_hull();
            buffer_surface_round(&MultiPolygon::new(vec![hull]), radius)
        }
    }
}

/// Stitches way fragments into closed rings and unions the resulting
/// polygons into one surface. Fragments that cannot be closed are dropped.
pub fn polygonize(lines: &[LineString<f64>]) -> MultiPolygon<f64> {
    let mut rings: Vec<Vec<Coord<f64>>> = Vec::new();
    let mut open: Vec<Vec<Coord<f64>>> = Vec::new();
    for line in lines {
        let coords = line.0.clone();
        if coords.len() < 2 {
            continue;
        }
        if coords.first() == coords.last() && coords.len() > 3 {
            rings.push(coords);
        } else {
            open.push(coords);
        }
    }

    while let Some(mut current) = open.pop() {
        loop {
            if current.first() == current.last() && current.len() > 3 {
                rings.push(current);
                break;
            }
            let (Some(&first), Some(&last)) = (current.first(), current.last()) else {
                break;
            };
            let joinable = open.iter().position(|other| {
                let ends = [other.first(), other.last()];
                ends.contains(&Some(&last)) || ends.contains(&Some(&first))
            });
            let Some(index) = joinable else {
                break;
            };
            let mut other = open.remove(index);
            if other.first() == Some(&last) {
                current.extend(other.drain(1..));
            } else if other.last() == Some(&last) {
                other.pop();
                other.reverse();
                current.extend(other);
            } else if other.last() == Some(&first) {
                other.pop();
                other.extend(current);
                current = other;
            } else {
                other.reverse();
                other.pop();
                other.extend(current);
                current = other;
            }
        }
    }

    let mut acc = MultiPolygon::new(Vec::new());
    for ring in rings {
        acc = union_into(acc, Polygon::new(LineString::new(ring), Vec::new()));
    }
    acc
}

/// Union of two surfaces, tolerating empties.
pub fn union(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if a.0.is_empty() {
        return b.clone();
    }
    if b.0.is_empty() {
        return a.clone();
    }
    a.union(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Contains, Point};

    #[test]
    fn circle_approximates_disc_area() {
        let c = circle(Coord { x: 0.0, y: 0.0 }, 10.0);
        let expected = std::f64::consts::PI * 100.0;
        let area = c.unsigned_area();
        assert!(area > 0.95 * expected && area < expected);
    }

    #[test]
    fn capsule_covers_segment_neighborhood() {
        let cap = capsule(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 0.0 }, 2.0);
        assert!(cap.contains(&Point::new(5.0, 1.5)));
        assert!(cap.contains(&Point::new(11.0, 0.0)));
        assert!(!cap.contains(&Point::new(5.0, 2.5)));
    }

    #[test]
    fn flat_buffer_stops_at_line_ends() {
        let line = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 0.0 },
        ]);
        let buffered = buffer_line_flat(&line, 2.0);
        assert!(buffered.contains(&Point::new(5.0, 1.5)));
        assert!(!buffered.contains(&Point::new(11.0, 0.0)));
    }

    #[test]
    fn polygonize_stitches_fragments() {
        let a = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 4.0, y: 0.0 },
            Coord { x: 4.0, y: 4.0 },
        ]);
        let b = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.0, y: 4.0 },
            Coord { x: 4.0, y: 4.0 },
        ]);
        let surface = polygonize(&[a, b]);
        assert_eq!(surface.0.len(), 1);
        assert!((surface.unsigned_area() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn polygonize_drops_unclosable_fragments() {
        let dangling = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 4.0, y: 0.0 },
        ]);
        assert!(polygonize(&[dangling]).0.is_empty());
    }

    #[test]
    fn surface_dilation_grows_the_square() {
        let square = polygonize(&[LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 4.0, y: 0.0 },
            Coord { x: 4.0, y: 4.0 },
            Coord { x: 0.0, y: 4.0 },
            Coord { x: 0.0, y: 0.0 },
        ])]);
        let grown = buffer_surface_round(&square, 1.0);
        assert!(grown.contains(&Point::new(-0.5, 2.0)));
        assert!(grown.contains(&Point::new(4.5, 4.5)));
        assert!(!grown.contains(&Point::new(5.5, 5.5)));
    }
}
