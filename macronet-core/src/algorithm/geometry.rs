use geo::{Coord, LineString, Point};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// quantization factor for treating WGS84 positions as identical. one unit is
/// roughly a centimetre at the equator, well below OSM coordinate precision.
const POSITION_SCALE: f64 = 10_000_000.0;

/// positions have no total ordering or stable hash as floats; scaling to i64
/// is a feasible bijection since coordinate values are bounded by +-180.
pub fn position_key(p: &Point<f64>) -> (i64, i64) {
    let x = (p.x() * POSITION_SCALE).round() as i64;
    let y = (p.y() * POSITION_SCALE).round() as i64;
    (x, y)
}

pub fn same_position(a: &Point<f64>, b: &Point<f64>) -> bool {
    position_key(a) == position_key(b)
}

/// great-circle distance between two WGS84 points in meters.
pub fn haversine_m(a: &Point<f64>, b: &Point<f64>) -> f64 {
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();
    let dlat = (b.y() - a.y()).to_radians();
    let dlon = (b.x() - a.x()).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// length of a polyline as the sum of great-circle distances between
/// consecutive positions, in kilometers.
pub fn length_km(geometry: &LineString<f64>) -> f64 {
    geometry
        .0
        .windows(2)
        .map(|w| haversine_m(&Point(w[0]), &Point(w[1])))
        .sum::<f64>()
        / 1000.0
}

/// meters per degree of longitude/latitude at the given latitude, used for
/// local equirectangular projections in distance and side computations.
fn meters_per_degree(lat: f64) -> (f64, f64) {
    let m_per_deg_lat = 2.0 * std::f64::consts::PI * EARTH_RADIUS_M / 360.0;
    let m_per_deg_lon = m_per_deg_lat * lat.to_radians().cos();
    (m_per_deg_lon, m_per_deg_lat)
}

/// result of projecting a point onto a polyline.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub distance_m: f64,
    pub closest: Point<f64>,
    /// index of the polyline segment the closest point falls on
    pub segment_index: usize,
    /// parameter along that segment in [0, 1]
    pub fraction: f64,
}

/// projects a point onto the segment [a, b] using a local equirectangular
/// projection anchored at the point's latitude.
fn project_to_segment(p: &Point<f64>, a: &Point<f64>, b: &Point<f64>) -> (f64, Point<f64>) {
    let (mx, my) = meters_per_degree(p.y());
    let ax = (a.x() - p.x()) * mx;
    let ay = (a.y() - p.y()) * my;
    let bx = (b.x() - p.x()) * mx;
    let by = (b.y() - p.y()) * my;
    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (-(ax * dx + ay * dy) / len2).clamp(0.0, 1.0)
    };
    let closest = Point::new(a.x() + (b.x() - a.x()) * t, a.y() + (b.y() - a.y()) * t);
    (t, closest)
}

/// closest point of a polyline to the given point, with the great-circle
/// distance to it. returns None for degenerate (empty) geometry.
pub fn closest_on_linestring(p: &Point<f64>, geometry: &LineString<f64>) -> Option<Projection> {
    if geometry.0.len() < 2 {
        let only = geometry.0.first()?;
        let closest = Point(*only);
        return Some(Projection {
            distance_m: haversine_m(p, &closest),
            closest,
            segment_index: 0,
            fraction: 0.0,
        });
    }
    let mut best: Option<Projection> = None;
    for (index, w) in geometry.0.windows(2).enumerate() {
        let (fraction, closest) = project_to_segment(p, &Point(w[0]), &Point(w[1]));
        let distance_m = haversine_m(p, &closest);
        let better = match &best {
            Some(b) => distance_m < b.distance_m,
            None => true,
        };
        if better {
            best = Some(Projection {
                distance_m,
                closest,
                segment_index: index,
                fraction,
            });
        }
    }
    best
}

/// which side of the directed line a->b a point lies on, in a local planar
/// projection. used to decide whether a waiting area sits on the door side of
/// a directional link segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    On,
}

pub fn side_of(a: &Point<f64>, b: &Point<f64>, p: &Point<f64>) -> Side {
    let (mx, my) = meters_per_degree(a.y());
    let abx = (b.x() - a.x()) * mx;
    let aby = (b.y() - a.y()) * my;
    let apx = (p.x() - a.x()) * mx;
    let apy = (p.y() - a.y()) * my;
    let cross = abx * apy - aby * apx;
    if cross > 1e-9 {
        Side::Left
    } else if cross < -1e-9 {
        Side::Right
    } else {
        Side::On
    }
}

/// index of the vertex of a polyline equal to the given position, if any.
pub fn vertex_index_at(geometry: &LineString<f64>, position: &Point<f64>) -> Option<usize> {
    let key = position_key(position);
    geometry
        .0
        .iter()
        .position(|c| position_key(&Point(*c)) == key)
}

/// splits a polyline at the given vertex index into two polylines sharing
/// that vertex. the index must be internal (neither first nor last).
pub fn split_at_vertex(
    geometry: &LineString<f64>,
    index: usize,
) -> Option<(LineString<f64>, LineString<f64>)> {
    if index == 0 || index + 1 >= geometry.0.len() {
        return None;
    }
    let first: Vec<Coord<f64>> = geometry.0[..=index].to_vec();
    let second: Vec<Coord<f64>> = geometry.0[index..].to_vec();
    Some((LineString(first), LineString(second)))
}

/// inserts a vertex into a polyline on the given segment at the given
/// fraction, returning the index of the inserted (or reused) vertex. when the
/// projected location coincides with an existing vertex, that vertex is
/// reused and no insertion happens.
pub fn insert_vertex(
    geometry: &mut LineString<f64>,
    segment_index: usize,
    position: Point<f64>,
) -> usize {
    let key = position_key(&position);
    if position_key(&Point(geometry.0[segment_index])) == key {
        return segment_index;
    }
    if position_key(&Point(geometry.0[segment_index + 1])) == key {
        return segment_index + 1;
    }
    geometry.0.insert(segment_index + 1, position.0);
    segment_index + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_one_degree_longitude_at_equator() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 0.0);
        let d = haversine_m(&a, &b);
        assert!((d - 111_195.0).abs() < 100.0, "got {d}");
    }

    #[test]
    fn test_length_of_two_segment_polyline() {
        let ls = LineString::from(vec![(0.0, 0.0), (0.001, 0.0), (0.002, 0.0)]);
        let km = length_km(&ls);
        assert!((km - 0.2224).abs() < 0.001, "got {km}");
    }

    #[test]
    fn test_closest_on_linestring_midpoint() {
        let ls = LineString::from(vec![(0.0, 0.0), (0.01, 0.0)]);
        let p = Point::new(0.005, 0.001);
        let proj = closest_on_linestring(&p, &ls).unwrap();
        assert_eq!(proj.segment_index, 0);
        assert!((proj.fraction - 0.5).abs() < 1e-6);
        assert!((proj.closest.x() - 0.005).abs() < 1e-9);
        assert!((proj.distance_m - 111.195).abs() < 1.0);
    }

    #[test]
    fn test_side_of_directed_line() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 0.0);
        assert_eq!(side_of(&a, &b, &Point::new(0.5, 0.5)), Side::Left);
        assert_eq!(side_of(&a, &b, &Point::new(0.5, -0.5)), Side::Right);
        assert_eq!(side_of(&a, &b, &Point::new(0.5, 0.0)), Side::On);
    }

    #[test]
    fn test_split_at_vertex_rejects_endpoints() {
        let ls = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        assert!(split_at_vertex(&ls, 0).is_none());
        assert!(split_at_vertex(&ls, 2).is_none());
        let (first, second) = split_at_vertex(&ls, 1).unwrap();
        assert_eq!(first.0.len(), 2);
        assert_eq!(second.0.len(), 2);
        assert_eq!(first.0[1], second.0[0]);
    }

    #[test]
    fn test_insert_vertex_reuses_existing() {
        let mut ls = LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]);
        let index = insert_vertex(&mut ls, 0, Point::new(1.0, 0.0));
        assert_eq!(index, 1);
        assert_eq!(ls.0.len(), 2);
        let index = insert_vertex(&mut ls, 0, Point::new(0.5, 0.0));
        assert_eq!(index, 1);
        assert_eq!(ls.0.len(), 3);
    }
}
