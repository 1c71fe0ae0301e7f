use crate::model::EdgeId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TopologyError {
    /// Start and end lie in disconnected parts of the network.
    #[error("no route between the two endpoints")]
    NoRoute,
    /// One of the endpoints is not attached to any segment.
    #[error("endpoint is not snapped to a segment")]
    UnboundEndpoint,
    #[error("segment {edge} is not in the current network")]
    StaleReference { edge: EdgeId },
    #[error("malformed field value: {0}")]
    Decode(String),
    #[error("cannot load segment graph: {0}")]
    GraphLoad(String),
    #[error("invalid settings: {0}")]
    InvalidConfig(String),
    /// A computed path that cannot be turned into a topology record.
    #[error("cannot encode path: {0}")]
    Encode(String),
}

impl TopologyError {
    /// Stable machine-readable code, used by the host bindings.
    pub fn code(&self) -> &'static str {
        match self {
            TopologyError::NoRoute => "no_route",
            TopologyError::UnboundEndpoint => "unbound_endpoint",
            TopologyError::StaleReference { .. } => "stale_reference",
            TopologyError::Decode(_) => "decode_error",
            TopologyError::GraphLoad(_) => "graph_load_error",
            TopologyError::InvalidConfig(_) => "invalid_config",
            TopologyError::Encode(_) => "encode_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, TopologyError>;
