use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use geojson::{Feature, Geometry, Value as GeometryValue};

use crate::error::LoadError;
use crate::road_fetcher::{FeaturePage, PageFetcher};
use crate::types::{Coordinate, RoadSegment};

pub fn segment(points: &[(f64, f64)]) -> RoadSegment {
    RoadSegment::new(
        points
            .iter()
            .map(|&(lat, lng)| Coordinate::new(lat, lng))
            .collect(),
    )
}

/// A `LineString` feature from `[lat, lng]` pairs.
pub fn line_feature(points: &[(f64, f64)]) -> Feature {
    Feature {
        geometry: Some(Geometry::new(GeometryValue::LineString(
            points.iter().map(|&(lat, lng)| vec![lng, lat]).collect(),
        ))),
        ..Default::default()
    }
}

/// A page of `count` short, disjoint road features.
pub fn page(count: usize) -> Result<FeaturePage, LoadError> {
    Ok(FeaturePage {
        features: (0..count)
            .map(|i| {
                let lng = 5.1 + i as f64 * 0.01;
                line_feature(&[(52.09, lng), (52.091, lng + 0.001)])
            })
            .collect(),
        exceeded_transfer_limit: false,
    })
}

/// Replays scripted pages per layer and records every request.
/// Layers without (remaining) script answer with empty pages.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: RefCell<HashMap<String, VecDeque<Result<FeaturePage, LoadError>>>>,
    calls: RefCell<Vec<(String, usize)>>,
}

impl ScriptedFetcher {
    pub fn script(self, layer: &str, pages: Vec<Result<FeaturePage, LoadError>>) -> Self {
        self.pages.borrow_mut().insert(layer.to_string(), pages.into());
        self
    }

    pub fn offsets(&self, layer: &str) -> Vec<usize> {
        self.calls
            .borrow()
            .iter()
            .filter(|(l, _)| l == layer)
            .map(|(_, offset)| *offset)
            .collect()
    }
}

impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(
        &self,
        layer_url: &str,
        offset: usize,
        _page_size: usize,
    ) -> Result<FeaturePage, LoadError> {
        self.calls.borrow_mut().push((layer_url.to_string(), offset));
        self.pages
            .borrow_mut()
            .get_mut(layer_url)
            .and_then(|pages| pages.pop_front())
            .unwrap_or_else(|| Ok(FeaturePage::default()))
    }
}
