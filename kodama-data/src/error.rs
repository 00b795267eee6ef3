use thiserror::Error;

/// Error types for decoding and validating panel records.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Invalid node status: {0}. Valid values: ONLINE, OFFLINE, UNKNOWN")]
    InvalidNodeStatus(String),

    #[error("Invalid instance state: {0}. Valid values: REQUESTED, PREPARING, PREPARED, STARTING, RUNNING, STOPPING, STOPPED, DESTROYED, FAILED")]
    InvalidInstanceState(String),

    #[error("Unknown {kind} tag {tag}")]
    UnknownTag { kind: &'static str, tag: u64 },

    #[error("Node '{node_id}' uses {used} slots but only has {capacity}")]
    SlotsExceedCapacity {
        node_id: String,
        used: u32,
        capacity: u32,
    },

    #[error("Instance '{instance_id}' has a failure reason but is {state}")]
    UnexpectedFailureReason { instance_id: String, state: String },

    #[error("Expected a JSON array of records in {0}")]
    NotAnArray(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, DataError>;
