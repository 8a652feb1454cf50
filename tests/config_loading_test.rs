//! Configuration loading through the full provider chain.

use std::fs;
use std::sync::Arc;

use caissa::adapters::memory::{InMemoryAnalysisSource, InMemoryProfileStore};
use caissa::domain::models::Config;
use caissa::services::CoachingService;
use caissa::{ConfigLoader, DomainError, RuleTable};
use tempfile::TempDir;

fn write_config(dir: &TempDir, yaml: &str) -> std::path::PathBuf {
    let path = dir.path().join("caissa.yaml");
    fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn test_explicit_file_keeps_nested_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "habit:\n  initial_intensity: 3\nscoring:\n  severity_weights:\n    blunder: 4.0\n",
    );

    let config = temp_env::with_vars_unset(["CAISSA_HABIT__INITIAL_INTENSITY"], || {
        ConfigLoader::load_with(Some(&path))
    })
    .unwrap();

    assert_eq!(config.habit.initial_intensity, 3);
    assert!((config.scoring.severity_weights.blunder - 4.0).abs() < f64::EPSILON);
    assert!((config.scoring.severity_weights.mistake - 2.0).abs() < f64::EPSILON);
    assert_eq!(config.habit.rotation_window, 8);
    assert_eq!(config.scoring.window_games, 15);
}

#[test]
fn test_environment_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "habit:\n  initial_intensity: 3\nlogging:\n  level: warn\n");

    let config = temp_env::with_vars(
        [
            ("CAISSA_HABIT__INITIAL_INTENSITY", Some("4")),
            ("CAISSA_SCORING__WINDOW_GAMES", Some("20")),
        ],
        || ConfigLoader::load_with(Some(&path)),
    )
    .unwrap();

    assert_eq!(config.habit.initial_intensity, 4);
    assert_eq!(config.scoring.window_games, 20);
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "habit:\n  initial_intensity: 9\n");

    let err = temp_env::with_vars_unset(["CAISSA_HABIT__INITIAL_INTENSITY"], || {
        ConfigLoader::load_with(Some(&path))
    })
    .unwrap_err();
    assert!(err.to_string().contains("initial_intensity"), "unexpected error: {err:#}");

    let path = write_config(&dir, "scoring:\n  window_games: 4\n  min_games: 6\n");
    assert!(ConfigLoader::load_from_file(&path).is_err());
}

#[test]
fn test_service_loads_rule_table_from_file() {
    let dir = TempDir::new().unwrap();
    let table_path = dir.path().join("rules.yaml");
    fs::write(&table_path, serde_yaml::to_string(&RuleTable::builtin()).unwrap()).unwrap();

    let mut config = Config::default();
    config.plan.rule_table_path = Some(table_path.display().to_string());
    let built = CoachingService::new(
        Arc::new(InMemoryAnalysisSource::new()),
        Arc::new(InMemoryProfileStore::new()),
        &config,
    );
    assert!(built.is_ok());

    fs::write(&table_path, "domains: {}\n").unwrap();
    let failed = CoachingService::new(
        Arc::new(InMemoryAnalysisSource::new()),
        Arc::new(InMemoryProfileStore::new()),
        &config,
    );
    assert!(matches!(failed, Err(DomainError::ValidationFailed(_))));
}
