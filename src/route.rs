use crate::config::RouterConfig;
use crate::dijkstra::shortest_path;
use crate::error::RouteError;
use crate::graph::{Graph, GraphOptions, VertexKey};
use crate::nearest::{nearest_road_point, nearest_vertex};
use crate::road_fetcher::SegmentSource;
use crate::types::{Coordinate, RoadSegment, Route, RouteKind};

fn vertex_location(graph: &Graph, key: &VertexKey) -> Result<Coordinate, RouteError> {
    graph
        .vertex(key)
        .map(|vertex| vertex.location)
        .ok_or_else(|| RouteError::MissingVertex(key.clone()))
}

/// Snaps both endpoints, searches the graph and stitches the result into
/// `[origin, anchor, ..path.., anchor, destination]`, degrading step by step
/// when snapping or the search fails.
pub fn assemble_route(
    graph: &Graph,
    segments: &[RoadSegment],
    origin: Coordinate,
    destination: Coordinate,
    search_radius_m: f64,
) -> Result<Route, RouteError> {
    let origin_key = nearest_vertex(graph, &origin, search_radius_m);
    let destination_key = nearest_vertex(graph, &destination, search_radius_m);

    let (origin_key, destination_key) = match (origin_key, destination_key) {
        (Some(o), Some(d)) => (o, d),
        _ => {
            log::warn!("Could not find gritted roads near origin or destination");
            let origin_road_point = nearest_road_point(&origin, segments);
            let destination_road_point = nearest_road_point(&destination, segments);
            return Ok(match (origin_road_point, destination_road_point) {
                (Some(o), Some(d)) => Route {
                    kind: RouteKind::RoadPoints,
                    coordinates: vec![origin, o, d, destination],
                },
                _ => Route::direct(origin, destination),
            });
        }
    };

    log::info!("Finding path from vertex {} to {}...", origin_key, destination_key);
    let origin_anchor = vertex_location(graph, &origin_key)?;
    let destination_anchor = vertex_location(graph, &destination_key)?;

    let path = match shortest_path(graph, &origin_key, &destination_key) {
        Some(path) if !path.is_empty() => path,
        _ => {
            log::warn!("No path found through the gritted road network");
            return Ok(Route {
                kind: RouteKind::AnchorJump,
                coordinates: vec![origin, origin_anchor, destination_anchor, destination],
            });
        }
    };
    log::info!("Path found with {} vertices", path.len());

    let mut coordinates = Vec::with_capacity(path.len() + 3);
    coordinates.push(origin);
    coordinates.push(vertex_location(graph, &path[0])?);
    if path.len() > 2 {
        for key in &path[1..path.len() - 1] {
            coordinates.push(vertex_location(graph, key)?);
        }
    }
    // A single-vertex path repeats its anchor here
    coordinates.push(vertex_location(graph, &path[path.len() - 1])?);
    coordinates.push(destination);

    Ok(Route { kind: RouteKind::Network, coordinates })
}

/// Routes from `origin` to `destination` over a freshly loaded network.
///
/// Returns `None` only when the network is empty. Every other failure
/// degrades to a straight origin-destination line.
pub async fn calculate_route<S: SegmentSource>(
    source: &S,
    origin: Coordinate,
    destination: Coordinate,
    config: &RouterConfig,
) -> Option<Route> {
    log::info!("Loading gritted roads...");
    let segments = match source.load_segments().await {
        Ok(segments) => segments,
        Err(e) => {
            log::error!("Route calculation error: {}", e);
            return Some(Route::direct(origin, destination));
        }
    };

    if segments.is_empty() {
        log::error!("No gritted road segments found");
        return None;
    }

    log::info!("Building graph from {} segments...", segments.len());
    let graph = Graph::build(&segments, GraphOptions::from(config));
    log::info!("Graph built: {} vertices, {} edges", graph.vertex_count(), graph.edge_count());

    match assemble_route(&graph, &segments, origin, destination, config.search_radius_m) {
        Ok(route) => Some(route),
        Err(e) => {
            log::error!("Route calculation error: {}", e);
            Some(Route::direct(origin, destination))
        }
    }
}
