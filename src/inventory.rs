use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// A node of a cluster and the roles assigned to it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub id: u64,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Node {
    pub fn new<I, S>(id: u64, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Cluster {
    pub id: u64,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// Source of cluster topology.
pub trait Inventory {
    /// # Errors
    /// Returns [`Error::ClusterNotFound`] for an unknown id.
    fn cluster(&self, env_id: u64) -> Result<Cluster>;
}

/// Fixed inventory, built in code or read from a TOML file.
///
/// Example TOML:
/// ```toml
/// [[clusters]]
/// id = 1
///
/// [[clusters.nodes]]
/// id = 7
/// roles = ["controller"]
/// ```
#[derive(Debug, Default, Clone)]
pub struct StaticInventory {
    clusters: BTreeMap<u64, Cluster>,
}

#[derive(Deserialize)]
struct InventoryFile {
    #[serde(default)]
    clusters: Vec<Cluster>,
}

impl StaticInventory {
    pub fn new(clusters: impl IntoIterator<Item = Cluster>) -> Self {
        Self {
            clusters: clusters.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    /// Load clusters from a TOML file. A missing file is an empty inventory.
    pub fn load(path: &Path) -> Result<Self> {
        let txt = match fs::read_to_string(path) {
            Ok(txt) => txt,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::fs("read inventory", path)(e)),
        };
        let file: InventoryFile = toml::from_str(&txt)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Ok(Self::new(file.clusters))
    }
}

impl Inventory for StaticInventory {
    fn cluster(&self, env_id: u64) -> Result<Cluster> {
        self.clusters
            .get(&env_id)
            .cloned()
            .ok_or(Error::ClusterNotFound(env_id))
    }
}
