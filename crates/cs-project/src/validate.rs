//! Configuration validation logic.
//!
//! Violations here are the only fatal errors of a batch: a configuration
//! that cannot be satisfied would otherwise burn the whole attempt budget.

use cs_components::ElementKind;

use crate::schema::{AnalysisConfig, BatchConfig, GenerationConfig, ProjectConfig};

/// Highest hierarchy level accepted in a configuration.
const MAX_LEVEL: u8 = 5;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Contradictory options: {reason}")]
    Contradiction { reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn contradiction(reason: &str) -> ValidationError {
    ValidationError::Contradiction {
        reason: reason.to_string(),
    }
}

pub fn validate_config(config: &ProjectConfig) -> Result<(), ValidationError> {
    if config.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }
    validate_generation(&config.generation)?;
    validate_analysis(&config.analysis)?;
    validate_batch(&config.batch, &config.generation)?;
    Ok(())
}

pub fn validate_generation(generation: &GenerationConfig) -> Result<(), ValidationError> {
    let palette = generation.palette();
    palette
        .validate()
        .map_err(|e| invalid("generation.palette", "<palette>", &e.to_string()))?;

    let places_elements = ElementKind::ALL
        .iter()
        .any(|k| !k.is_wiring() && palette.allows(*k));
    if !places_elements {
        return Err(contradiction("palette places only wires and open edges"));
    }

    if generation.rlc && !palette.allows_reactive() {
        return Err(contradiction(
            "forced RLC requires at least one allowed reactive element",
        ));
    }
    if generation.integrator && !palette.allows(ElementKind::Resistor) {
        return Err(contradiction(
            "forced integrator is promoted from a resistor, but resistors are not allowed",
        ));
    }

    if generation.max_attempts == 0 {
        return Err(invalid(
            "generation.max_attempts",
            generation.max_attempts,
            "must be at least 1",
        ));
    }
    if let Some(max_grid) = generation.max_grid
        && max_grid < 2
    {
        return Err(invalid("generation.max_grid", max_grid, "must be at least 2"));
    }
    generation
        .grid_sizes()
        .validate()
        .map_err(|e| invalid("generation.max_grid", "<grid sizes>", &e.to_string()))?;

    Ok(())
}

pub fn validate_analysis(analysis: &AnalysisConfig) -> Result<(), ValidationError> {
    if analysis.component_cap == 0 {
        return Err(invalid("analysis.component_cap", 0, "must be at least 1"));
    }
    if analysis.budget_ms == 0 {
        return Err(invalid("analysis.budget_ms", 0, "must be positive"));
    }
    Ok(())
}

pub fn validate_batch(
    batch: &BatchConfig,
    generation: &GenerationConfig,
) -> Result<(), ValidationError> {
    if batch.workers == 0 {
        return Err(invalid("batch.workers", 0, "must be at least 1"));
    }
    if batch.level > MAX_LEVEL {
        return Err(invalid("batch.level", batch.level, "levels run from 0 to 5"));
    }
    if batch.level > 0 && generation.max_blocks == 0 {
        return Err(contradiction(
            "hierarchical level requested but max_blocks is 0",
        ));
    }
    if batch.attempt_budget == Some(0) {
        return Err(invalid("batch.attempt_budget", 0, "must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_components::Palette;

    #[test]
    fn default_config_is_valid() {
        validate_config(&ProjectConfig::default()).unwrap();
    }

    #[test]
    fn rlc_without_reactive_is_contradiction() {
        let mut palette = Palette::standard();
        for table in [&mut palette.inner, &mut palette.outer] {
            table.set(ElementKind::Capacitor, 0);
            table.set(ElementKind::Inductor, 0);
        }
        let mut cfg = ProjectConfig::default();
        cfg.generation.rlc = true;
        cfg.generation.palette = Some(palette);
        assert!(matches!(
            validate_config(&cfg),
            Err(ValidationError::Contradiction { .. })
        ));
    }

    #[test]
    fn zero_workers_rejected() {
        let mut cfg = ProjectConfig::default();
        cfg.batch.workers = 0;
        assert!(matches!(
            validate_config(&cfg),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn level_out_of_range_rejected() {
        let mut cfg = ProjectConfig::default();
        cfg.batch.level = 6;
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn tiny_max_grid_rejected() {
        let mut cfg = ProjectConfig::default();
        cfg.generation.max_grid = Some(1);
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn future_version_rejected() {
        let mut cfg = ProjectConfig::default();
        cfg.version = 99;
        assert_eq!(
            validate_config(&cfg),
            Err(ValidationError::UnsupportedVersion { version: 99 })
        );
    }
}
