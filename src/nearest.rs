use crate::geometry::distance_meters;
use crate::graph::{Graph, VertexKey};
use crate::types::{Coordinate, RoadSegment};

/// Closest graph vertex strictly within `max_distance_m` of `point`.
///
/// Ties go to the vertex created first.
pub fn nearest_vertex(
    graph: &Graph,
    point: &Coordinate,
    max_distance_m: f64,
) -> Option<VertexKey> {
    let mut nearest = None;
    let mut min_distance = f64::INFINITY;
    for vertex in graph.vertices() {
        let distance = distance_meters(point, &vertex.location);
        if distance < min_distance && distance < max_distance_m {
            min_distance = distance;
            nearest = Some(&vertex.key);
        }
    }
    nearest.cloned()
}

/// Closest raw point of any segment, however far away it is.
pub fn nearest_road_point(point: &Coordinate, segments: &[RoadSegment]) -> Option<Coordinate> {
    let mut nearest = None;
    let mut min_distance = f64::INFINITY;
    for road_point in segments.iter().flat_map(RoadSegment::points) {
        let distance = distance_meters(point, road_point);
        if distance < min_distance {
            min_distance = distance;
            nearest = Some(*road_point);
        }
    }
    nearest
}
