use std::collections::{HashMap, HashSet};

use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::config::RouterConfig;
use crate::geometry::{distance_meters, squared_degree_distance};
use crate::types::{Coordinate, RoadSegment};

/// Canonical `"lat,lng"` string of a rounded coordinate.
pub type VertexKey = String;

// Raw degrees as [lat, lng], tagged with the vertex's creation index
type VertexEntry = GeomWithData<[f64; 2], usize>;

#[derive(Clone, Debug)]
pub struct GraphVertex {
    pub key: VertexKey,
    pub location: Coordinate,
    pub neighbours: HashSet<VertexKey>,
}

/// A directed half of a road edge; the reverse half always exists too.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphEdge {
    pub from: VertexKey,
    pub to: VertexKey,
    pub distance_m: f64,
    /// Index of the source segment in the slice the graph was built from.
    pub segment: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphOptions {
    pub merge_threshold_deg: f64,
    pub key_precision: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        GraphOptions::from(&RouterConfig::default())
    }
}

impl From<&RouterConfig> for GraphOptions {
    fn from(config: &RouterConfig) -> Self {
        GraphOptions {
            merge_threshold_deg: config.merge_threshold_deg,
            key_precision: config.key_precision,
        }
    }
}

pub fn vertex_key(location: &Coordinate, precision: usize) -> VertexKey {
    format!("{:.*},{:.*}", precision, location.latitude, precision, location.longitude)
}

/// Undirected road graph, stored as pairs of directed edges.
pub struct Graph {
    vertices: Vec<GraphVertex>,
    index: HashMap<VertexKey, usize>,
    edges: HashMap<VertexKey, Vec<GraphEdge>>,
    tree: RTree<VertexEntry>,
    options: GraphOptions,
}

impl Graph {
    pub fn new(options: GraphOptions) -> Self {
        Graph {
            vertices: Vec::new(),
            index: HashMap::new(),
            edges: HashMap::new(),
            tree: RTree::new(),
            options,
        }
    }

    /// Builds the graph from every consecutive point pair of every segment.
    pub fn build(segments: &[RoadSegment], options: GraphOptions) -> Self {
        let mut graph = Graph::new(options);
        for (segment_idx, segment) in segments.iter().enumerate() {
            if !segment.is_routable() {
                continue;
            }
            let keys: Vec<VertexKey> = segment
                .points()
                .iter()
                .map(|point| graph.get_or_create_vertex(point))
                .collect();
            for pair in keys.windows(2) {
                graph.connect(&pair[0], &pair[1], segment_idx);
            }
        }
        graph
    }

    /// Returns the first vertex created within the merge threshold of
    /// `location`, else the vertex already holding its key, or mints a new one.
    ///
    /// Merging is not transitive: with three or more nearby points the
    /// resulting vertex identity depends on insertion order.
    pub fn get_or_create_vertex(&mut self, location: &Coordinate) -> VertexKey {
        let threshold = self.options.merge_threshold_deg;
        let query = [location.latitude, location.longitude];
        let max_distance_2 = threshold * threshold;
        let existing = self
            .tree
            .locate_within_distance(query, max_distance_2)
            .map(|entry| entry.data)
            .filter(|&idx| {
                squared_degree_distance(&self.vertices[idx].location, location) < max_distance_2
            })
            .min();
        if let Some(idx) = existing {
            return self.vertices[idx].key.clone();
        }

        // A threshold finer than the key precision can still round onto a taken key
        let key = vertex_key(location, self.options.key_precision);
        if self.index.contains_key(&key) {
            return key;
        }
        let idx = self.vertices.len();
        self.vertices.push(GraphVertex {
            key: key.clone(),
            location: *location,
            neighbours: HashSet::new(),
        });
        self.index.insert(key.clone(), idx);
        self.tree.insert(VertexEntry::new(query, idx));
        key
    }

    fn connect(&mut self, from: &str, to: &str, segment: usize) {
        if from == to || self.has_edge(from, to) {
            return;
        }
        let (Some(&from_idx), Some(&to_idx)) = (self.index.get(from), self.index.get(to)) else {
            return;
        };
        let distance_m =
            distance_meters(&self.vertices[from_idx].location, &self.vertices[to_idx].location);

        for (a, b) in [(from, to), (to, from)] {
            self.edges.entry(a.to_string()).or_default().push(GraphEdge {
                from: a.to_string(),
                to: b.to_string(),
                distance_m,
                segment,
            });
        }
        self.vertices[from_idx].neighbours.insert(to.to_string());
        self.vertices[to_idx].neighbours.insert(from.to_string());
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edges_from(from).iter().any(|edge| edge.to == to)
    }

    pub fn edges_from(&self, key: &str) -> &[GraphEdge] {
        self.edges.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn vertex(&self, key: &str) -> Option<&GraphVertex> {
        self.index.get(key).map(|&idx| &self.vertices[idx])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Vertices in creation order.
    pub fn vertices(&self) -> impl Iterator<Item = &GraphVertex> {
        self.vertices.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.values().flatten()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }
}
