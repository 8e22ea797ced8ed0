use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use ordered_float::OrderedFloat;
use priority_queue::PriorityQueue;

use crate::graph::{Graph, VertexKey};

/// Minimum-distance path from `start` to `end`, both endpoints included.
///
/// Returns `None` when either key is unknown or `end` is unreachable.
pub fn shortest_path(graph: &Graph, start: &str, end: &str) -> Option<Vec<VertexKey>> {
    if !graph.contains(start) || !graph.contains(end) {
        return None;
    }

    let mut distances: HashMap<&str, f64> = HashMap::new();
    let mut previous: HashMap<&str, &str> = HashMap::new();
    let mut visited: HashSet<&str> = HashSet::new();
    // Highest priority pops first, so distances are reversed
    let mut frontier = PriorityQueue::new();

    distances.insert(start, 0.0);
    frontier.push(start, Reverse(OrderedFloat(0.0)));

    while let Some((current, Reverse(OrderedFloat(current_distance)))) = frontier.pop() {
        if current == end {
            return Some(reconstruct(&previous, end));
        }
        visited.insert(current);

        for edge in graph.edges_from(current) {
            let neighbour = edge.to.as_str();
            if visited.contains(neighbour) {
                continue;
            }
            let alt = current_distance + edge.distance_m;
            let known = distances.get(neighbour).copied().unwrap_or(f64::INFINITY);
            if alt < known {
                distances.insert(neighbour, alt);
                previous.insert(neighbour, current);
                frontier.push_increase(neighbour, Reverse(OrderedFloat(alt)));
            }
        }
    }

    log::debug!("Explored {} vertices without reaching {}", visited.len(), end);
    None
}

fn reconstruct<'a>(previous: &HashMap<&'a str, &'a str>, end: &'a str) -> Vec<VertexKey> {
    let mut path = vec![end.to_string()];
    let mut current = end;
    while let Some(&prior) = previous.get(current) {
        path.push(prior.to_string());
        current = prior;
    }
    path.reverse();
    path
}

/// Sum of edge weights along `path`, or `None` if two consecutive keys are not adjacent.
pub fn path_cost(graph: &Graph, path: &[VertexKey]) -> Option<f64> {
    path.windows(2)
        .map(|pair| {
            graph
                .edges_from(&pair[0])
                .iter()
                .find(|edge| edge.to == pair[1])
                .map(|edge| edge.distance_m)
        })
        .sum()
}
