use thiserror::Error;

use crate::graph::VertexKey;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feature service error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("unexpected response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("vertex {0} is not part of the graph")]
    MissingVertex(VertexKey),
}
