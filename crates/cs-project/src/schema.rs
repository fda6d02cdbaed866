//! Configuration schema definitions.

use cs_components::{GridSizes, Palette};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    pub version: u32,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            version: crate::migrate::LATEST_VERSION,
            name: default_name(),
            generation: GenerationConfig::default(),
            analysis: AnalysisConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

fn default_name() -> String {
    "circuits".to_string()
}

/// Options that shape the generated topologies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Emit parameter names instead of numeric values.
    pub symbolic: bool,
    /// Favour small grids.
    pub simple: bool,
    /// Force exactly one integrator op-amp.
    pub integrator: bool,
    /// Force one source plus at least one reactive element.
    pub rlc: bool,
    /// Draw measurement probes on edges.
    pub probes: bool,
    /// Legacy inverse of `probes`, folded in by migration.
    #[serde(skip_serializing)]
    pub no_meas: Option<bool>,
    /// Placement weights; `None` uses the standard palette.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub palette: Option<Palette>,
    /// Largest grid side length allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_grid: Option<u32>,
    /// Candidates tried per circuit before giving up.
    pub max_attempts: u32,
    /// Sub-blocks embedded per composed circuit (upper bound).
    pub max_blocks: u32,
    pub selection: SelectionDef,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            symbolic: true,
            simple: false,
            integrator: false,
            rlc: false,
            probes: true,
            no_meas: None,
            palette: None,
            max_grid: None,
            max_attempts: 20,
            max_blocks: 2,
            selection: SelectionDef::Random,
        }
    }
}

impl GenerationConfig {
    pub fn palette(&self) -> Palette {
        self.palette.clone().unwrap_or_default()
    }

    /// Grid size distribution for the active mode, clipped to `max_grid`.
    pub fn grid_sizes(&self) -> GridSizes {
        let mut sizes = if self.simple {
            GridSizes::simple()
        } else {
            GridSizes::standard()
        };
        if let Some(max) = self.max_grid {
            sizes.options.retain(|&(side, _)| side <= max);
        }
        sizes
    }
}

/// How the composer picks among eligible sub-blocks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionDef {
    #[default]
    Random,
    RoundRobin,
    LeastUsed,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SolveModeDef {
    Fast,
    #[default]
    Thorough,
}

/// Options for symbolic derivation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub enabled: bool,
    /// Netlists with more elements than this are never solved.
    pub component_cap: usize,
    /// Wall-clock budget per circuit.
    pub budget_ms: u64,
    pub mode: SolveModeDef,
    /// Maximum number of circuits to analyze in one batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_circuits: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            component_cap: 20,
            budget_ms: 30_000,
            mode: SolveModeDef::Thorough,
            max_circuits: None,
        }
    }
}

/// Batch sizing and reproducibility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    pub count: usize,
    pub level: u8,
    pub workers: usize,
    pub seed: u64,
    /// Total candidate circuits the batch may consume; `None` derives it
    /// from `count` and `max_attempts`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_budget: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 10,
            level: 0,
            workers: 1,
            seed: 0,
            attempt_budget: None,
        }
    }
}

impl ProjectConfig {
    /// Effective global attempt budget.
    pub fn attempt_budget(&self) -> usize {
        self.batch.attempt_budget.unwrap_or_else(|| {
            self.batch
                .count
                .saturating_mul(self.generation.max_attempts as usize)
                .saturating_mul(4)
                .max(1)
        })
    }
}
