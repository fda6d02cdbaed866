//! Schema migration framework.

use crate::ProjectError;
use crate::schema::ProjectConfig;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut config: ProjectConfig) -> Result<ProjectConfig, ProjectError> {
    while config.version < LATEST_VERSION {
        config = migrate_one_version(config)?;
    }
    Ok(config)
}

fn migrate_one_version(config: ProjectConfig) -> Result<ProjectConfig, ProjectError> {
    match config.version {
        0 => migrate_v0_to_v1(config),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 0 spelled probe visibility as `no_meas`.
fn migrate_v0_to_v1(mut config: ProjectConfig) -> Result<ProjectConfig, ProjectError> {
    if let Some(no_meas) = config.generation.no_meas.take() {
        config.generation.probes = !no_meas;
    }
    config.version = 1;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v0_no_meas_becomes_probes() {
        let cfg: ProjectConfig =
            serde_yaml::from_str("version: 0\ngeneration:\n  no_meas: true\n").unwrap();
        let cfg = migrate_to_latest(cfg).unwrap();
        assert_eq!(cfg.version, LATEST_VERSION);
        assert!(!cfg.generation.probes);
        assert_eq!(cfg.generation.no_meas, None);
    }

    #[test]
    fn latest_is_untouched() {
        let cfg = ProjectConfig::default();
        assert_eq!(migrate_to_latest(cfg.clone()).unwrap(), cfg);
    }
}
