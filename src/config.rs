use serde::Deserialize;

const STROOIROUTES_SERVICE: &str =
    "https://services-eu1.arcgis.com/SMnoOtmU2UWf0vRp/arcgis/rest/services/_171206_strooiroutes/FeatureServer";

/// Tunables for loading the network and routing over it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Feature layers that together make up the gritted network.
    pub layers: Vec<String>,
    /// The service never returns more than this many features per request.
    pub page_size: usize,
    /// Decimal digits requested for returned geometry.
    pub geometry_precision: u8,
    /// Give up on a layer after this many empty pages in a row.
    pub max_consecutive_empty_pages: usize,
    /// Maximum snapping distance from a query point to a graph vertex.
    pub search_radius_m: f64,
    /// Points closer than this (plain degrees) share a vertex; about 11 m.
    pub merge_threshold_deg: f64,
    /// Decimal digits used when minting vertex keys.
    pub key_precision: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            layers: (0..4).map(|layer| format!("{}/{}", STROOIROUTES_SERVICE, layer)).collect(),
            page_size: 1000,
            geometry_precision: 6,
            max_consecutive_empty_pages: 2,
            search_radius_m: 500.0,
            merge_threshold_deg: 0.0001,
            key_precision: 6,
        }
    }
}
