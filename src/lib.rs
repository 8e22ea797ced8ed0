use std::sync::Once;

use geo::BoundingRect;
use geojson::{Feature, GeoJson, Geometry, Value};
use log::Level;
use serde::Deserialize;
use serde_json::{json, Map};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use wasm_bindgen_futures::js_sys;

pub mod config;
pub mod dijkstra;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod nearest;
pub mod road_fetcher;
pub mod route;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

use self::config::RouterConfig;
use self::road_fetcher::FeatureServiceLoader;
use self::route::calculate_route;
use self::session::{CalculationGuard, CalculationState};
use self::types::{Coordinate, Route};

static LOGGER: Once = Once::new();

#[derive(Clone, Copy, Deserialize)]
pub struct JsLocation {
    pub lat: f64,
    pub lng: f64,
}

impl From<JsLocation> for Coordinate {
    fn from(location: JsLocation) -> Self {
        Coordinate::new(location.lat, location.lng)
    }
}

#[derive(Deserialize)]
pub struct RouteParams {
    pub origin: JsLocation,
    pub destination: JsLocation,
    #[serde(default)]
    pub config: RouterConfig,
}

#[wasm_bindgen]
pub fn rust_init() {
    LOGGER.call_once(|| {
        if let Err(e) = console_log::init_with_level(Level::Info) {
            log::warn!("A logger was already installed: {}", e);
        }
    });
    log::info!("Logger initialized from library");
}

fn parse_params(params_json: &str) -> Result<RouteParams, String> {
    serde_json::from_str(params_json).map_err(|e| e.to_string())
}

/// Renders a route as a GeoJSON Feature with its length and fallback kind.
pub fn route_to_geojson(route: &Route) -> Result<String, String> {
    let line = route.to_line_string();
    let bbox = line
        .bounding_rect()
        .map(|rect| vec![rect.min().x, rect.min().y, rect.max().x, rect.max().y]);

    let mut properties = Map::new();
    properties.insert("distance_km".to_string(), json!(route.length_km_rounded()));
    let kind = serde_json::to_value(route.kind).map_err(|e| e.to_string())?;
    properties.insert("kind".to_string(), kind);

    let feature = Feature {
        bbox,
        geometry: Some(Geometry::new(Value::from(&line))),
        properties: Some(properties),
        ..Default::default()
    };
    serde_json::to_string(&GeoJson::Feature(feature)).map_err(|e| e.to_string())
}

async fn route_between(
    origin: Coordinate,
    destination: Coordinate,
    config: RouterConfig,
) -> Result<Option<String>, String> {
    let loader = FeatureServiceLoader::new(config.clone());
    match calculate_route(&loader, origin, destination, &config).await {
        Some(route) => {
            log::info!("Route of {} km ({:?})", route.length_km_rounded(), route.kind);
            route_to_geojson(&route).map(Some)
        }
        None => Ok(None),
    }
}

pub async fn compute_route_async(params_json: &str) -> Result<Option<String>, String> {
    let params = parse_params(params_json)?;
    route_between(params.origin.into(), params.destination.into(), params.config).await
}

fn to_promise_value(result: Result<Option<String>, String>) -> Result<JsValue, JsValue> {
    match result {
        Ok(Some(geojson_str)) => Ok(JsValue::from_str(&geojson_str)),
        Ok(None) => Ok(JsValue::NULL),
        Err(e) => Err(JsValue::from_str(&e)),
    }
}

/// Resolves to a GeoJSON Feature string, or `null` when no gritted roads
/// could be loaded.
#[wasm_bindgen]
pub fn compute_route(params: String) -> js_sys::Promise {
    future_to_promise(async move { to_promise_value(compute_route_async(&params).await) })
}

/// Route calculation bound to one UI panel, allowing a single request in flight.
#[wasm_bindgen]
pub struct RoutePanel {
    state: CalculationState,
    config: RouterConfig,
}

#[wasm_bindgen]
impl RoutePanel {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<RoutePanel, JsValue> {
        let config = if config.is_undefined() || config.is_null() {
            RouterConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        Ok(RoutePanel { state: CalculationState::new(), config })
    }

    #[wasm_bindgen(js_name = isCalculating)]
    pub fn is_calculating(&self) -> bool {
        self.state.is_calculating()
    }

    /// Rejects right away while an earlier calculation is still running.
    pub fn calculate(&self, origin: JsValue, destination: JsValue) -> js_sys::Promise {
        let Some(guard) = self.begin() else {
            return js_sys::Promise::reject(&JsValue::from_str(
                "route calculation already in progress",
            ));
        };
        let config = self.config.clone();
        future_to_promise(async move {
            let _guard = guard;
            let origin: JsLocation = serde_wasm_bindgen::from_value(origin)?;
            let destination: JsLocation = serde_wasm_bindgen::from_value(destination)?;
            to_promise_value(route_between(origin.into(), destination.into(), config).await)
        })
    }
}

impl RoutePanel {
    /// Marks the panel busy before any work is scheduled.
    fn begin(&self) -> Option<CalculationGuard> {
        self.state.try_begin()
    }
}
