use detailing_booking_api::geo::{
    self, DEFAULT_SERVICE_RADIUS_M, Located, Point, distance_m, format_distance,
    is_within_service_area,
};

#[derive(Debug, PartialEq)]
struct Shop {
    id: u32,
    coords: Option<Point>,
    radius: Option<f64>,
}

impl Located for Shop {
    fn coordinates(&self) -> Option<Point> {
        self.coords
    }

    fn service_radius_m(&self) -> Option<f64> {
        self.radius
    }
}

fn shop(id: u32, coords: Option<(f64, f64)>) -> Shop {
    Shop {
        id,
        coords: coords.map(|(lat, lng)| Point::new(lat, lng)),
        radius: None,
    }
}

#[test]
fn distance_is_symmetric_and_zero_for_coincident_points() {
    let paris = Point::new(48.8566, 2.3522);
    let london = Point::new(51.5074, -0.1278);

    assert_eq!(distance_m(paris, paris), 0.0);
    let ab = distance_m(paris, london);
    let ba = distance_m(london, paris);
    assert!((ab - ba).abs() < 1e-6);

    // Paris-London is roughly 344 km.
    assert!(ab > 330_000.0 && ab < 360_000.0, "got {ab}");
}

#[test]
fn distance_satisfies_triangle_inequality() {
    let a = Point::new(40.7128, -74.0060);
    let b = Point::new(41.8781, -87.6298);
    let c = Point::new(34.0522, -118.2437);

    let ac = distance_m(a, c);
    let detour = distance_m(a, b) + distance_m(b, c);
    // Small tolerance for the spherical approximation.
    assert!(ac <= detour * 1.000001, "ac={ac} detour={detour}");
}

#[test]
fn one_degree_of_latitude_is_about_111_km() {
    let d = distance_m(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
    assert!((d - 111_195.0).abs() < 100.0, "got {d}");
}

#[test]
fn format_distance_switches_units_at_one_kilometer() {
    assert_eq!(format_distance(0.0), "0 m");
    assert_eq!(format_distance(850.4), "850 m");
    assert_eq!(format_distance(999.4), "999 m");
    assert_eq!(format_distance(1000.0), "1.0 km");
    assert_eq!(format_distance(1234.0), "1.2 km");
    assert_eq!(format_distance(15500.0), "15.5 km");
}

#[test]
fn service_area_check_is_inclusive_of_the_boundary() {
    let center = Point::new(0.0, 0.0);
    let near = Point::new(0.01, 0.0);
    let d = distance_m(center, near);

    assert!(is_within_service_area(center, d, near));
    assert!(!is_within_service_area(center, d - 1.0, near));
}

#[test]
fn ranking_sorts_by_distance_and_puts_unlocated_entities_last() {
    let reference = Point::new(0.0, 0.0);
    let shops = vec![
        shop(1, Some((0.0, 0.0))),
        shop(2, Some((0.0, 1.0))),
        shop(3, None),
    ];

    let ranked = geo::rank_by_distance(shops, reference);
    let ids: Vec<u32> = ranked.iter().map(|(s, _)| s.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(ranked[0].1, 0.0);
    assert!(ranked[2].1.is_infinite());
}

#[test]
fn ranking_is_stable_for_equal_distances() {
    let reference = Point::new(0.0, 0.0);
    let shops = vec![
        shop(10, Some((0.0, 1.0))),
        shop(20, Some((0.0, 1.0))),
        shop(30, Some((0.0, 0.5))),
    ];

    let ranked = geo::rank_by_distance(shops, reference);
    let ids: Vec<u32> = ranked.iter().map(|(s, _)| s.id).collect();
    assert_eq!(ids, vec![30, 10, 20]);
}

#[test]
fn radius_filter_prefers_explicit_then_entity_then_default_radius() {
    let reference = Point::new(0.0, 0.0);
    // About 11.1 km east of the reference.
    let coords = Some((0.0, 0.1));

    // Default 10 km radius excludes it.
    let shops = vec![shop(1, coords)];
    assert!(geo::filter_within_radius(shops, reference, None).is_empty());

    // The entity's own radius admits it.
    let mut wide = shop(2, coords);
    wide.radius = Some(20_000.0);
    let kept = geo::filter_within_radius(vec![wide], reference, None);
    assert_eq!(kept.len(), 1);

    // An explicit radius overrides the entity's.
    let mut narrow = shop(3, coords);
    narrow.radius = Some(20_000.0);
    assert!(geo::filter_within_radius(vec![narrow], reference, Some(5_000.0)).is_empty());
}

#[test]
fn radius_filter_drops_entities_without_coordinates() {
    let reference = Point::new(0.0, 0.0);
    let shops = vec![shop(1, None), shop(2, Some((0.0, 0.0)))];
    let kept = geo::filter_within_radius(shops, reference, Some(DEFAULT_SERVICE_RADIUS_M));
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].id, 2);
}
