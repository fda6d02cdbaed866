use cs_project::{
    ProjectConfig, ProjectError, SelectionDef, SolveModeDef, from_yaml_str, load_json, load_yaml,
    save_json, save_yaml, validate_config,
};

#[test]
fn roundtrip_yaml_default_config() {
    let config = ProjectConfig::default();
    validate_config(&config).unwrap();

    let path = std::env::temp_dir().join("cs_project_roundtrip_default.yaml");
    save_yaml(&path, &config).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(config, loaded);
}

#[test]
fn roundtrip_json_tuned_config() {
    let mut config = ProjectConfig::default();
    config.name = "rlc sweep".to_string();
    config.generation.rlc = true;
    config.generation.simple = true;
    config.generation.selection = SelectionDef::LeastUsed;
    config.analysis.mode = SolveModeDef::Fast;
    config.analysis.budget_ms = 1_000;
    config.analysis.max_circuits = Some(3);
    config.batch.workers = 4;
    config.batch.seed = 1234;

    let path = std::env::temp_dir().join("cs_project_roundtrip_tuned.json");
    save_json(&path, &config).unwrap();
    let loaded = load_json(&path).unwrap();

    assert_eq!(config, loaded);
}

#[test]
fn invalid_config_is_rejected_on_load() {
    let yaml = "version: 1\nbatch:\n  workers: 0\n";
    let err = from_yaml_str(yaml).unwrap_err();
    assert!(matches!(err, ProjectError::Validation(_)));
}

#[test]
fn contradictory_palette_is_rejected_on_load() {
    let yaml = "\
version: 1
generation:
  rlc: true
  palette:
    inner:
      resistor: 4
      short: 2
    outer:
      resistor: 1
";
    let err = from_yaml_str(yaml).unwrap_err();
    assert!(err.to_string().contains("reactive"));
}

#[test]
fn legacy_file_migrates() {
    let config = from_yaml_str("version: 0\ngeneration:\n  no_meas: true\n").unwrap();
    assert!(!config.generation.probes);
    assert_eq!(config.version, cs_project::LATEST_VERSION);
}
