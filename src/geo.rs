//! Great-circle distance helpers used to rank and filter providers by
//! proximity to the customer's location.

/// Mean Earth radius in meters (spherical approximation).
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Radius used when neither the caller nor the entity supplies one.
pub const DEFAULT_SERVICE_RADIUS_M: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

impl Point {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Haversine distance between two points, in meters.
pub fn distance_m(a: Point, b: Point) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Render a distance for display: whole meters under 1 km, otherwise
/// kilometers to one decimal place.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round() as i64)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

pub fn is_within_service_area(center: Point, radius_m: f64, point: Point) -> bool {
    distance_m(center, point) <= radius_m
}

/// Anything that may carry coordinates and an own service radius.
pub trait Located {
    fn coordinates(&self) -> Option<Point>;

    fn service_radius_m(&self) -> Option<f64> {
        None
    }
}

/// Sort entities ascending by distance from `reference`. Entities without
/// coordinates are kept but sort last; ties keep their input order.
pub fn rank_by_distance<T: Located>(entities: Vec<T>, reference: Point) -> Vec<(T, f64)> {
    let mut ranked: Vec<(T, f64)> = entities
        .into_iter()
        .map(|e| {
            let d = e
                .coordinates()
                .map(|c| distance_m(reference, c))
                .unwrap_or(f64::INFINITY);
            (e, d)
        })
        .collect();
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

/// Keep entities within radius of `reference`. The radius is the explicit
/// argument when given, else the entity's own service radius, else
/// [`DEFAULT_SERVICE_RADIUS_M`]. Entities without coordinates are dropped.
pub fn filter_within_radius<T: Located>(
    entities: Vec<T>,
    reference: Point,
    radius_m: Option<f64>,
) -> Vec<T> {
    entities
        .into_iter()
        .filter(|e| {
            let Some(coords) = e.coordinates() else {
                return false;
            };
            let radius = radius_m
                .or_else(|| e.service_radius_m())
                .unwrap_or(DEFAULT_SERVICE_RADIUS_M);
            distance_m(reference, coords) <= radius
        })
        .collect()
}
