//! Persisted record types.

use std::collections::BTreeMap;

use cs_netlist::Netlist;
use cs_project::ProjectConfig;
use cs_symbolic::SymbolicEquationSet;
use serde::{Deserialize, Serialize};

pub type CircuitKey = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub dataset_id: String,
    pub name: String,
    pub timestamp: String,
    pub generator_version: String,
    pub config: ProjectConfig,
    pub requested: usize,
    pub produced: usize,
    pub analyzed: usize,
    pub attempts: usize,
    /// Failure counts keyed by failure kind.
    #[serde(default)]
    pub failures: BTreeMap<String, usize>,
}

impl DatasetManifest {
    pub fn new(name: impl Into<String>, config: ProjectConfig) -> Self {
        Self {
            dataset_id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            config,
            requested: 0,
            produced: 0,
            analyzed: 0,
            attempts: 0,
            failures: BTreeMap::new(),
        }
    }
}

/// One line of `netlists.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetlistRecord {
    pub circuit_id: CircuitKey,
    pub level: u8,
    pub seed: u64,
    pub netlist: Netlist,
    /// SPICE-style rendering of `netlist`.
    pub spice: String,
}

/// One line of `equations.jsonl`; joins to a netlist by `circuit_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquationRecord {
    pub circuit_id: CircuitKey,
    pub equations: SymbolicEquationSet,
}
