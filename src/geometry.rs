use crate::types::Coordinate;

/// Great-circle distance in meters.
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    let ap = haversine_rs::point::Point { latitude: a.latitude, longitude: a.longitude };
    let bp = haversine_rs::point::Point { latitude: b.latitude, longitude: b.longitude };
    haversine_rs::distance(ap, bp, haversine_rs::units::Unit::Meters)
}

pub fn route_length_meters(coordinates: &[Coordinate]) -> f64 {
    coordinates
        .windows(2)
        .map(|pair| distance_meters(&pair[0], &pair[1]))
        .sum()
}

/// Squared planar distance in degrees, used for vertex merging only.
pub fn squared_degree_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let dlat = a.latitude - b.latitude;
    let dlng = a.longitude - b.longitude;
    dlat * dlat + dlng * dlng
}
