use geojson::{Feature, Value as GeometryValue};
use reqwest::Client;
use serde_json::Value;

use crate::config::RouterConfig;
use crate::error::LoadError;
use crate::types::{Coordinate, RoadSegment};

/// One response of a feature layer query.
#[derive(Debug, Default)]
pub struct FeaturePage {
    pub features: Vec<Feature>,
    pub exceeded_transfer_limit: bool,
}

/// Fetches a single page of a feature layer.
#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    async fn fetch_page(
        &self,
        layer_url: &str,
        offset: usize,
        page_size: usize,
    ) -> Result<FeaturePage, LoadError>;
}

/// Anything that can hand the router a list of road segments.
#[allow(async_fn_in_trait)]
pub trait SegmentSource {
    async fn load_segments(&self) -> Result<Vec<RoadSegment>, LoadError>;
}

pub fn query_url(
    layer_url: &str,
    offset: usize,
    page_size: usize,
    geometry_precision: u8,
) -> String {
    format!(
        "{}/query?f=geojson&where=1=1&outSR=4326&outFields=*&resultOffset={}\
         &resultRecordCount={}&returnGeometry=true&geometryPrecision={}",
        layer_url, offset, page_size, geometry_precision
    )
}

/// Queries an ArcGIS feature server over HTTP.
pub struct HttpPageFetcher {
    client: Client,
    geometry_precision: u8,
}

impl HttpPageFetcher {
    pub fn new(geometry_precision: u8) -> Self {
        HttpPageFetcher { client: Client::new(), geometry_precision }
    }
}

impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(
        &self,
        layer_url: &str,
        offset: usize,
        page_size: usize,
    ) -> Result<FeaturePage, LoadError> {
        let url = query_url(layer_url, offset, page_size, self.geometry_precision);
        log::debug!("Fetching {}", url);
        let json = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        parse_page(json)
    }
}

fn parse_page(mut json: Value) -> Result<FeaturePage, LoadError> {
    // The service answers errors with HTTP 200 and an `error` object
    if let Some(error) = json.get("error") {
        return Err(LoadError::Api {
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }
    let exceeded_transfer_limit = json
        .get("exceededTransferLimit")
        .or_else(|| json.get("properties").and_then(|p| p.get("exceededTransferLimit")))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let Some(Value::Array(raw_features)) = json.get_mut("features").map(Value::take) else {
        return Err(LoadError::Malformed("expected a FeatureCollection".into()));
    };

    // A broken feature only costs itself, not the rest of the page
    let total = raw_features.len();
    let features: Vec<Feature> = raw_features
        .into_iter()
        .filter_map(|raw| serde_json::from_value::<Feature>(raw).ok())
        .collect();
    if features.len() < total {
        log::warn!("  Skipped {} unparseable features", total - features.len());
    }

    Ok(FeaturePage { features, exceeded_transfer_limit })
}

/// Turns a feature into zero or more routable segments.
fn segments_from_feature(feature: &Feature) -> Vec<RoadSegment> {
    let Some(geometry) = &feature.geometry else {
        return Vec::new();
    };
    let lines: Vec<&Vec<Vec<f64>>> = match &geometry.value {
        GeometryValue::LineString(line) => vec![line],
        GeometryValue::MultiLineString(lines) => lines.iter().collect(),
        _ => Vec::new(),
    };
    lines
        .into_iter()
        .filter_map(|line| {
            let points: Vec<Coordinate> =
                line.iter().filter_map(|p| Coordinate::from_position(p)).collect();
            let segment = RoadSegment::new(points);
            segment.is_routable().then_some(segment)
        })
        .collect()
}

async fn load_layer<F: PageFetcher>(
    fetcher: &F,
    layer_url: &str,
    config: &RouterConfig,
) -> Result<Vec<RoadSegment>, LoadError> {
    let page_size = config.page_size.max(1);
    let mut offset = 0;
    let mut consecutive_empty_pages = 0;
    let mut features = Vec::new();

    loop {
        let page = fetcher.fetch_page(layer_url, offset, page_size).await?;
        let fetched = page.features.len();
        if fetched == 0 {
            // An empty page is retried once before we believe the layer is exhausted
            consecutive_empty_pages += 1;
            log::warn!("  Empty page at offset={} ({} in a row)", offset, consecutive_empty_pages);
            if consecutive_empty_pages >= config.max_consecutive_empty_pages {
                break;
            }
            continue;
        }

        consecutive_empty_pages = 0;
        offset += fetched;
        features.extend(page.features);
        log::info!(
            "  Page: offset={}, fetched={}, total={}, exceededTransferLimit={}",
            offset - fetched,
            fetched,
            features.len(),
            page.exceeded_transfer_limit
        );
        if fetched < page_size {
            break;
        }
    }

    let segments: Vec<RoadSegment> = features.iter().flat_map(segments_from_feature).collect();
    log::info!(
        "Loaded {} features ({} usable segments) from layer {}",
        features.len(),
        segments.len(),
        layer_url
    );
    Ok(segments)
}

/// Loads every configured layer. A failing layer is logged and skipped.
pub async fn load_road_segments<F: PageFetcher>(
    fetcher: &F,
    config: &RouterConfig,
) -> Vec<RoadSegment> {
    let mut all_segments = Vec::new();
    for layer_url in &config.layers {
        match load_layer(fetcher, layer_url, config).await {
            Ok(segments) => all_segments.extend(segments),
            Err(e) => log::error!("Error loading layer {}: {}", layer_url, e),
        }
    }
    log::info!("Total segments loaded: {}", all_segments.len());
    all_segments
}

/// The gritting-route feature service, read fresh on every call.
pub struct FeatureServiceLoader<F = HttpPageFetcher> {
    fetcher: F,
    config: RouterConfig,
}

impl FeatureServiceLoader<HttpPageFetcher> {
    pub fn new(config: RouterConfig) -> Self {
        let fetcher = HttpPageFetcher::new(config.geometry_precision);
        FeatureServiceLoader { fetcher, config }
    }
}

impl<F: PageFetcher> FeatureServiceLoader<F> {
    pub fn with_fetcher(fetcher: F, config: RouterConfig) -> Self {
        FeatureServiceLoader { fetcher, config }
    }
}

impl<F: PageFetcher> SegmentSource for FeatureServiceLoader<F> {
    async fn load_segments(&self) -> Result<Vec<RoadSegment>, LoadError> {
        Ok(load_road_segments(&self.fetcher, &self.config).await)
    }
}

/// A network that is already in memory.
pub struct StaticSegments(pub Vec<RoadSegment>);

impl SegmentSource for StaticSegments {
    async fn load_segments(&self) -> Result<Vec<RoadSegment>, LoadError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{page, segment, ScriptedFetcher};
    use futures::executor::block_on;
    use geojson::Geometry;
    use serde_json::json;

    fn config(layers: &[&str], page_size: usize) -> RouterConfig {
        RouterConfig {
            layers: layers.iter().map(|l| l.to_string()).collect(),
            page_size,
            ..RouterConfig::default()
        }
    }

    #[test]
    fn pages_until_a_short_page() {
        let fetcher = ScriptedFetcher::default().script("a", vec![page(2), page(2), page(1)]);
        let segments = block_on(load_road_segments(&fetcher, &config(&["a"], 2)));
        assert_eq!(segments.len(), 5);
        assert_eq!(fetcher.offsets("a"), vec![0, 2, 4]);
    }

    #[test]
    fn two_empty_pages_in_a_row_stop_the_layer() {
        let fetcher = ScriptedFetcher::default().script("a", vec![page(0), page(0), page(3)]);
        let segments = block_on(load_road_segments(&fetcher, &config(&["a"], 2)));
        assert!(segments.is_empty());
        assert_eq!(fetcher.offsets("a"), vec![0, 0]);
    }

    #[test]
    fn a_single_empty_page_is_retried() {
        let fetcher = ScriptedFetcher::default().script("a", vec![page(2), page(0), page(1)]);
        let segments = block_on(load_road_segments(&fetcher, &config(&["a"], 2)));
        assert_eq!(segments.len(), 3);
        assert_eq!(fetcher.offsets("a"), vec![0, 2, 2]);
    }

    #[test]
    fn failing_layer_does_not_abort_the_others() {
        let fetcher = ScriptedFetcher::default()
            .script("a", vec![page(2), Err(LoadError::Malformed("boom".into()))])
            .script("b", vec![page(1)]);
        let segments = block_on(load_road_segments(&fetcher, &config(&["a", "b"], 2)));
        // everything from layer a is discarded
        assert_eq!(segments.len(), 1);
        assert_eq!(fetcher.offsets("b"), vec![0]);
    }

    #[test]
    fn unusable_geometry_is_filtered() {
        let no_geometry = Feature::default();
        let point = Feature {
            geometry: Some(Geometry::new(GeometryValue::Point(vec![5.1, 52.1]))),
            ..Default::default()
        };
        let single_position = Feature {
            geometry: Some(Geometry::new(GeometryValue::LineString(vec![vec![5.1, 52.1]]))),
            ..Default::default()
        };
        let multi = Feature {
            geometry: Some(Geometry::new(GeometryValue::MultiLineString(vec![
                vec![vec![5.1, 52.1], vec![5.2, 52.2]],
                vec![vec![5.3, 52.3], vec![5.4, 52.4], vec![5.5, 52.5]],
            ]))),
            ..Default::default()
        };

        assert!(segments_from_feature(&no_geometry).is_empty());
        assert!(segments_from_feature(&point).is_empty());
        assert!(segments_from_feature(&single_position).is_empty());

        let parts = segments_from_feature(&multi);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].points().len(), 3);
        assert_eq!(parts[0].points()[0], Coordinate::new(52.1, 5.1));
    }

    #[test]
    fn parses_feature_collection_pages() {
        let json = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[5.12, 52.09], [5.13, 52.10]]},
                "properties": {"OBJECTID": 1}
            }],
            "properties": {"exceededTransferLimit": true}
        });
        let page = parse_page(json).unwrap();
        assert_eq!(page.features.len(), 1);
        assert!(page.exceeded_transfer_limit);
    }

    #[test]
    fn broken_feature_is_dropped_and_the_rest_kept() {
        let json = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {"type": "LineString", "coordinates": "not coordinates"},
                    "properties": {"OBJECTID": 1}
                },
                {
                    "type": "Feature",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[5.12, 52.09], [5.13, 52.10]]
                    },
                    "properties": {"OBJECTID": 2}
                }
            ]
        });
        let page = parse_page(json).unwrap();
        assert_eq!(page.features.len(), 1);
        let segments = segments_from_feature(&page.features[0]);
        assert_eq!(segments, vec![segment(&[(52.09, 5.12), (52.10, 5.13)])]);
    }

    #[test]
    fn service_error_body_is_an_error() {
        let json = json!({"error": {"code": 400, "message": "Invalid query parameters"}});
        match parse_page(json) {
            Err(LoadError::Api { code, message }) => {
                assert_eq!(code, 400);
                assert_eq!(message, "Invalid query parameters");
            }
            other => panic!("expected an API error, got {:?}", other),
        }
    }

    #[test]
    fn response_without_features_is_malformed() {
        let json = json!({"type": "Point", "coordinates": [5.1, 52.1]});
        assert!(matches!(parse_page(json), Err(LoadError::Malformed(_))));
    }

    #[test]
    fn query_url_carries_paging_parameters() {
        let url = query_url("https://example.org/FeatureServer/2", 3000, 1000, 6);
        assert!(url.starts_with("https://example.org/FeatureServer/2/query?f=geojson"));
        assert!(url.contains("resultOffset=3000&resultRecordCount=1000"));
        assert!(url.contains("geometryPrecision=6"));
        assert!(url.contains("outSR=4326"));
    }

    #[test]
    fn static_segments_are_returned_as_is() {
        let road = segment(&[(52.0, 5.0), (52.1, 5.1)]);
        let source = StaticSegments(vec![road.clone()]);
        assert_eq!(block_on(source.load_segments()).unwrap(), vec![road]);
    }
}
