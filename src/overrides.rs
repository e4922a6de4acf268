use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::inventory::Cluster;

pub const OVERRIDES_FILE: &str = "overrides.yaml";

/// What to do when `overrides.yaml` already exists in the working copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverridesPolicy {
    /// Leave an existing file untouched, even if the topology changed.
    #[default]
    WriteIfAbsent,
    /// Regenerate the file on every initialization.
    Overwrite,
}

/// Node and role override references consumed by config-management tooling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverridesDocument {
    pub nodes: BTreeMap<u64, String>,
    pub roles: BTreeMap<String, String>,
}

impl OverridesDocument {
    /// One entry per node (`node_<id>_configs`) and one per distinct role (`<role>_configs`).
    pub fn from_cluster(cluster: &Cluster) -> Self {
        let mut doc = Self::default();
        for node in &cluster.nodes {
            doc.nodes.insert(node.id, format!("node_{}_configs", node.id));
            for role in &node.roles {
                doc.roles
                    .entry(role.clone())
                    .or_insert_with(|| format!("{role}_configs"));
            }
        }
        doc
    }

    /// Block-style YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write the document to `path` according to `policy`.
    ///
    /// Returns `true` if the file was written.
    pub fn write(&self, path: &Path, policy: OverridesPolicy) -> Result<bool> {
        if policy == OverridesPolicy::WriteIfAbsent && path.exists() {
            debug!(path = %path.display(), "overrides already present, keeping existing file");
            return Ok(false);
        }
        fs::write(path, self.to_yaml()?).map_err(Error::fs("write overrides", path))?;
        debug!(path = %path.display(), nodes = self.nodes.len(), roles = self.roles.len(), "wrote overrides");
        Ok(true)
    }
}
