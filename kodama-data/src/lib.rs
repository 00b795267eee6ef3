//! Shared data layer for the Kodama panel
//!
//! This crate provides the Instance and Node record types, the amount
//! formatting and table column model, and snapshot loading from the JSON
//! exports an orchestrator writes into a data directory. Used by
//! kodama-web (web dashboard).

pub mod amount;
pub mod column;
pub mod error;
pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

pub use column::{ColumnDef, RenderedCell, Row, TableView};
pub use error::{DataError, Result};
pub use types::{Instance, InstanceState, Node, NodeStatus};

pub const NODES_FILE: &str = "nodes.json";
pub const INSTANCES_FILE: &str = "instances.json";

/// A record that could not be decoded, kept so the dashboard can show it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRecord {
    pub file: String,
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

/// Records decoded from one listing file, plus the ones that were dropped.
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RejectedRecord>,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

/// Both listings as loaded at one point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub instances: Vec<Instance>,
    pub rejected: Vec<RejectedRecord>,
}

/// Records that can check their own producer-side invariants after decoding.
///
/// Exists as the bound for the generic [`load_listing`]; the impls forward to
/// the inherent `validate` methods on [`Node`] and [`Instance`].
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

impl Validate for Node {
    fn validate(&self) -> Result<()> {
        Node::validate(self)
    }
}

impl Validate for Instance {
    fn validate(&self) -> Result<()> {
        Instance::validate(self)
    }
}

/// Data source reading orchestrator exports from a directory
pub struct DataSource {
    data_dir: PathBuf,
}

impl DataSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        DataSource {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn nodes_path(&self) -> PathBuf {
        self.data_dir.join(NODES_FILE)
    }

    pub fn instances_path(&self) -> PathBuf {
        self.data_dir.join(INSTANCES_FILE)
    }

    pub fn load_nodes(&self) -> Result<Listing<Node>> {
        load_listing(&self.nodes_path())
    }

    pub fn load_instances(&self) -> Result<Listing<Instance>> {
        load_listing(&self.instances_path())
    }

    /// Load both listings. A file that is unreadable as a whole fails the
    /// snapshot; individual bad records only drop themselves.
    pub fn load_snapshot(&self) -> Result<Snapshot> {
        let nodes = self.load_nodes()?;
        let instances = self.load_instances()?;

        let mut rejected = nodes.rejected;
        rejected.extend(instances.rejected);

        Ok(Snapshot {
            nodes: nodes.records,
            instances: instances.records,
            rejected,
        })
    }
}

/// Read a JSON array of records, decoding each element on its own.
///
/// A missing file is an empty listing.
pub fn load_listing<T>(path: &Path) -> Result<Listing<T>>
where
    T: DeserializeOwned + Validate,
{
    if !path.exists() {
        debug!(path = %path.display(), "listing file not present");
        return Ok(Listing::default());
    }

    let file = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: file.clone(),
        source,
    })?;
    let root: Value = serde_json::from_str(&content).map_err(|source| DataError::Json {
        path: file.clone(),
        source,
    })?;
    let Value::Array(elements) = root else {
        return Err(DataError::NotAnArray(file));
    };

    let mut listing = Listing::default();
    for (index, element) in elements.into_iter().enumerate() {
        let id = element.get("id").and_then(Value::as_str).map(str::to_string);
        let decoded = serde_json::from_value::<T>(element)
            .map_err(|e| e.to_string())
            .and_then(|record| record.validate().map(|_| record).map_err(|e| e.to_string()));

        match decoded {
            Ok(record) => listing.records.push(record),
            Err(reason) => {
                warn!(file = %file, index, id = ?id, %reason, "rejected record");
                listing.rejected.push(RejectedRecord {
                    file: file.clone(),
                    index,
                    id,
                    reason,
                });
            }
        }
    }

    Ok(listing)
}
