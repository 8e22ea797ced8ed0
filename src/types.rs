use serde::{Deserialize, Serialize};

use crate::geometry::route_length_meters;

// ** Coordinates **

/// A WGS84 position in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate { latitude, longitude }
    }

    /// GeoJSON positions are `[lng, lat]`.
    pub fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [longitude, latitude, ..] if latitude.is_finite() && longitude.is_finite() => {
                Some(Coordinate { latitude: *latitude, longitude: *longitude })
            }
            _ => None,
        }
    }
}

// ** Road network **

/// One stretch of gritted road, as delivered by the feature service.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadSegment {
    points: Vec<Coordinate>,
}

impl RoadSegment {
    pub fn new(points: Vec<Coordinate>) -> Self {
        RoadSegment { points }
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    /// Only segments with at least two points can contribute an edge.
    pub fn is_routable(&self) -> bool {
        self.points.len() >= 2
    }
}

// ** Routes **

/// Which rung of the fallback ladder produced a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// A real path over the gritted network.
    Network,
    /// No vertex near an endpoint; jumps between the closest raw road points.
    RoadPoints,
    /// Both endpoints snapped but the graph is disconnected between them.
    AnchorJump,
    /// Straight line from origin to destination.
    Direct,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub kind: RouteKind,
    pub coordinates: Vec<Coordinate>,
}

impl Route {
    pub fn direct(origin: Coordinate, destination: Coordinate) -> Self {
        Route { kind: RouteKind::Direct, coordinates: vec![origin, destination] }
    }

    pub fn length_meters(&self) -> f64 {
        route_length_meters(&self.coordinates)
    }

    /// Kilometres with a single decimal, the way the route panel shows it.
    pub fn length_km_rounded(&self) -> f64 {
        (self.length_meters() / 100.0).round() / 10.0
    }

    pub fn to_line_string(&self) -> geo::LineString<f64> {
        self.coordinates
            .iter()
            .map(|c| geo::Coord { x: c.longitude, y: c.latitude })
            .collect::<Vec<_>>()
            .into()
    }
}
