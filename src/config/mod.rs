//! Task configuration.
//!
//! A task config describes one run of the protocol: the participating
//! parties, which of them this process is, the locally allocated ports, the
//! component evaluation parameters, and the key authority endpoint. Configs
//! are JSON files handed to the orchestrator by the task scheduler.

pub mod eval;

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use eval::{AttrValue, EvalParam, IoRef};

use crate::error::{Error, Result};

/// Service and port name under which peer transfer endpoints are published.
pub const TEE_DM_SERVICE: &str = "tee-dm";

/// One participating party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    /// Party name, unique within a task.
    pub name: String,
    /// Reachable service endpoints keyed by service name.
    #[serde(default)]
    pub services: BTreeMap<String, String>,
}

/// The parties of a task and which of them this process is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterDef {
    pub parties: Vec<Party>,
    pub self_party_idx: usize,
}

/// Full configuration of one task run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub task_id: String,
    pub task_cluster_def: ClusterDef,
    /// Locally allocated listen ports keyed by port name.
    #[serde(default)]
    pub allocated_ports: BTreeMap<String, u16>,
    /// Component evaluation parameters.
    pub tee_app_params: EvalParam,
    /// Endpoint of the key authority.
    pub capsule_manager_endpoint: String,
    /// Authorization scope policies are registered under.
    #[serde(default)]
    pub scope: String,
}

impl TaskConfig {
    /// Loads and validates a task config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: TaskConfig = serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!(
                "failed to parse task config {}: {e}",
                path.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks structural invariants that parsing alone cannot enforce.
    pub fn validate(&self) -> Result<()> {
        let parties = &self.task_cluster_def.parties;
        if parties.is_empty() {
            return Err(Error::Config("task config lists no parties".into()));
        }
        if self.task_cluster_def.self_party_idx >= parties.len() {
            return Err(Error::Config(format!(
                "self_party_idx {} out of range for {} parties",
                self.task_cluster_def.self_party_idx,
                parties.len()
            )));
        }
        let mut names = HashSet::new();
        for party in parties {
            if !names.insert(party.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate party name '{}'",
                    party.name
                )));
            }
        }
        Ok(())
    }

    pub fn party_count(&self) -> usize {
        self.task_cluster_def.parties.len()
    }

    /// The party this process runs as.
    pub fn self_party(&self) -> Result<&Party> {
        let idx = self.task_cluster_def.self_party_idx;
        self.task_cluster_def
            .parties
            .get(idx)
            .ok_or_else(|| Error::Config(format!("self_party_idx {idx} out of range")))
    }

    /// The other party of a two-party task.
    pub fn peer_party(&self) -> Result<&Party> {
        let idx = self.task_cluster_def.self_party_idx ^ 1;
        self.task_cluster_def
            .parties
            .get(idx)
            .ok_or_else(|| Error::Config("task has no peer party".into()))
    }

    /// Endpoint of the named service exposed by the peer party.
    pub fn peer_service_endpoint(&self, service: &str) -> Result<&str> {
        let peer = self.peer_party()?;
        peer.services
            .get(service)
            .map(String::as_str)
            .ok_or_else(|| {
                Error::Config(format!(
                    "party '{}' exposes no '{service}' service",
                    peer.name
                ))
            })
    }

    /// Locally allocated port with the given name.
    pub fn allocated_port(&self, name: &str) -> Result<u16> {
        self.allocated_ports
            .get(name)
            .copied()
            .ok_or_else(|| Error::Config(format!("no allocated port named '{name}'")))
    }
}
