use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::{Intensity, RatingTier};

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid initial_intensity: {0}. Must be between 1 and 5")]
    InvalidInitialIntensity(u8),

    #[error("Invalid window: min_games ({min_games}) must be between 1 and window_games ({window_games})")]
    InvalidWindow { min_games: usize, window_games: usize },

    #[error("Invalid weight {name}: {value}. Must be finite and non-negative")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("Invalid reflection_cap_fraction: {0}. Must be in [0, 1)")]
    InvalidReflectionCap(f64),

    #[error("Invalid severity thresholds: need 0 <= min_cp_loss and 0 < mistake_cp ({mistake}) < blunder_cp ({blunder})")]
    InvalidSeverityThresholds { mistake: i32, blunder: i32 },

    #[error("Invalid phase thresholds for {tier}: opening_end_move ({opening_end}) must be before endgame_start_move ({endgame_start})")]
    InvalidPhaseThresholds {
        tier: &'static str,
        opening_end: u32,
        endgame_start: u32,
    },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .caissa/config.yaml (project config, created by init)
    /// 3. .caissa/local.yaml (project local overrides, optional)
    /// 4. Environment variables (CAISSA_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_with(None)
    }

    /// Same as [`load`](Self::load), with an explicit file merged after the
    /// project files and before the environment.
    pub fn load_with(explicit: Option<&Path>) -> Result<Config> {
        let config: Config = Self::figment(explicit)
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// The merged provider chain, before extraction.
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".caissa/config.yaml"))
            .merge(Yaml::file(".caissa/local.yaml"));
        if let Some(path) = explicit {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed("CAISSA_").split("__"))
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Self::validate_extractor(config)?;
        Self::validate_scoring(config)?;

        let habit = &config.habit;
        if Intensity::new(habit.initial_intensity).is_err() {
            return Err(ConfigError::InvalidInitialIntensity(habit.initial_intensity));
        }
        if habit.rotation_window == 0
            || habit.min_attempts_for_improving > habit.rotation_window
            || habit.resolve_hits_in_window > habit.rotation_window
        {
            return Err(ConfigError::ValidationFailed(format!(
                "habit.rotation_window ({}) must be at least 1 and cover min_attempts_for_improving ({}) and resolve_hits_in_window ({})",
                habit.rotation_window, habit.min_attempts_for_improving, habit.resolve_hits_in_window
            )));
        }
        if !(habit.improving_success_rate > 0.0 && habit.improving_success_rate <= 1.0) {
            return Err(ConfigError::ValidationFailed(format!(
                "habit.improving_success_rate ({}) must be in (0, 1]",
                habit.improving_success_rate
            )));
        }

        if config.plan.min_opening_games == 0 {
            return Err(ConfigError::ValidationFailed(
                "plan.min_opening_games must be at least 1".to_string(),
            ));
        }
        if config.cache.max_capacity == 0 {
            return Err(ConfigError::ValidationFailed(
                "cache.max_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_extractor(config: &Config) -> Result<(), ConfigError> {
        let extractor = &config.extractor;
        if extractor.min_cp_loss < 0
            || extractor.mistake_cp <= 0
            || extractor.mistake_cp >= extractor.blunder_cp
        {
            return Err(ConfigError::InvalidSeverityThresholds {
                mistake: extractor.mistake_cp,
                blunder: extractor.blunder_cp,
            });
        }
        if extractor.eval_clamp_cp <= 0 || extractor.equal_band_cp < 0 {
            return Err(ConfigError::ValidationFailed(
                "extractor.eval_clamp_cp must be positive and equal_band_cp non-negative".to_string(),
            ));
        }
        for tier in RatingTier::ALL {
            let thresholds = extractor.phase_thresholds.for_tier(tier);
            if thresholds.opening_end_move >= thresholds.endgame_start_move {
                return Err(ConfigError::InvalidPhaseThresholds {
                    tier: tier.as_str(),
                    opening_end: thresholds.opening_end_move,
                    endgame_start: thresholds.endgame_start_move,
                });
            }
        }
        Ok(())
    }

    fn validate_scoring(config: &Config) -> Result<(), ConfigError> {
        let scoring = &config.scoring;
        if scoring.min_games == 0 || scoring.min_games > scoring.window_games {
            return Err(ConfigError::InvalidWindow {
                min_games: scoring.min_games,
                window_games: scoring.window_games,
            });
        }
        if scoring.cp_loss_cap <= 0 {
            return Err(ConfigError::ValidationFailed(
                "scoring.cp_loss_cap must be positive".to_string(),
            ));
        }

        let weights = [
            ("severity_weights.blunder", scoring.severity_weights.blunder),
            ("severity_weights.mistake", scoring.severity_weights.mistake),
            ("severity_weights.inaccuracy", scoring.severity_weights.inaccuracy),
            ("context_weights.losing", scoring.context_weights.losing),
            ("context_weights.equal", scoring.context_weights.equal),
            ("context_weights.winning", scoring.context_weights.winning),
            ("frequency_weight", scoring.frequency_weight),
            ("instability_boost", scoring.instability_boost),
            ("reflection_weight", scoring.reflection_weight),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }

        let cap = scoring.reflection_cap_fraction;
        if !(0.0..1.0).contains(&cap) {
            return Err(ConfigError::InvalidReflectionCap(cap));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scoring.window_games, 15);
        assert_eq!(config.scoring.min_games, 3);
        assert_eq!(config.database.path, ".caissa/caissa.db");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
scoring:
  window_games: 20
  frequency_weight: 0.75
  severity_weights:
    blunder: 4.0
audit:
  materiality_cp:
    safety: 250
habit:
  initial_intensity: 3
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.scoring.window_games, 20);
        assert!((config.scoring.frequency_weight - 0.75).abs() < f64::EPSILON);
        assert!((config.scoring.severity_weights.blunder - 4.0).abs() < f64::EPSILON);
        assert!((config.scoring.severity_weights.mistake - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.audit.materiality_cp.safety, 250);
        assert_eq!(config.audit.materiality_cp.opening, 150);
        assert_eq!(config.habit.initial_intensity, 3);
        assert_eq!(config.logging.format, "json");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogFormat(_)
        ));
    }

    #[test]
    fn test_validate_empty_database_path() {
        let mut config = Config::default();
        config.database.path = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptyDatabasePath
        ));
    }

    #[test]
    fn test_validate_initial_intensity() {
        let mut config = Config::default();
        config.habit.initial_intensity = 6;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidInitialIntensity(6)
        ));
    }

    #[test]
    fn test_validate_window() {
        let mut config = Config::default();
        config.scoring.min_games = 20;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidWindow { min_games: 20, window_games: 15 }
        ));
    }

    #[test]
    fn test_validate_negative_weight() {
        let mut config = Config::default();
        config.scoring.context_weights.losing = -0.1;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidWeight { name: "context_weights.losing", .. }
        ));
    }

    #[test]
    fn test_validate_reflection_cap() {
        let mut config = Config::default();
        config.scoring.reflection_cap_fraction = 1.0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidReflectionCap(_)
        ));
    }

    #[test]
    fn test_validate_severity_order() {
        let mut config = Config::default();
        config.extractor.mistake_cp = 400;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidSeverityThresholds { mistake: 400, blunder: 300 }
        ));
    }

    #[test]
    fn test_validate_phase_thresholds() {
        let mut config = Config::default();
        config.extractor.phase_thresholds.advanced.opening_end_move = 50;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidPhaseThresholds { tier: "advanced", .. }
        ));
    }

    #[test]
    fn test_validate_rotation_window() {
        let mut config = Config::default();
        config.habit.resolve_hits_in_window = 9;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ValidationFailed(_)
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "scoring:\n  window_games: 10\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "scoring:\n  window_games: 12\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.scoring.window_games, 12, "Override should win");
        assert_eq!(config.logging.level, "debug", "Override should win for nested fields");
        assert_eq!(config.logging.format, "json", "Base value should persist when not overridden");
        assert_eq!(config.scoring.min_games, 3, "Defaults fill the rest");
    }
}
