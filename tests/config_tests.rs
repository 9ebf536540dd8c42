use pyvet::config::{ConfigOverrides, PyvetConfig};
use tempfile::TempDir;

#[test]
fn clone_threshold_ordering_is_validated_before_any_run() {
    let mut config = PyvetConfig::default();
    assert!(config.validate().is_ok());

    // type1 > type2 > type3 > type4 must hold strictly
    config.clone.type3_threshold = 0.96;
    assert!(config.validate().is_err());

    config.clone.type3_threshold = 0.80;
    config.clone.type4_threshold = 0.80;
    assert!(config.validate().is_err());
}

#[test]
fn discovery_walks_up_parent_directories() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("pyvet.toml"),
        "[complexity]\nlow_threshold = 4\nmedium_threshold = 11\n",
    )
    .unwrap();
    let nested = dir.path().join("src/app");
    std::fs::create_dir_all(&nested).unwrap();

    let config = PyvetConfig::load(&nested).unwrap();
    assert_eq!(config.complexity.low_threshold, 4);
    assert_eq!(config.complexity.medium_threshold, 11);
}

#[test]
fn dotted_file_wins_over_plain() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".pyvet.toml"), "[clone]\nmin_lines = 7\n").unwrap();
    std::fs::write(dir.path().join("pyvet.toml"), "[clone]\nmin_lines = 3\n").unwrap();
    let config = PyvetConfig::load(dir.path()).unwrap();
    assert_eq!(config.clone.min_lines, 7);
}

#[test]
fn explicit_overrides_beat_file_values() {
    let mut config = PyvetConfig::default();
    config.output.format = "yaml".to_string();
    config.deadline_seconds = 120;

    let overrides = ConfigOverrides {
        deadline_seconds: Some(30),
        ..Default::default()
    };
    config.apply_overrides(&overrides);
    assert_eq!(config.deadline_seconds, 30);
    // untouched because the override was not explicitly set
    assert_eq!(config.output.format, "yaml");
}

#[test]
fn invalid_toml_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".pyvet.toml"), "[clone\nmin_lines = 3\n").unwrap();
    let err = PyvetConfig::load(dir.path()).unwrap_err();
    assert!(matches!(err, pyvet::Error::Config(_)));
}
