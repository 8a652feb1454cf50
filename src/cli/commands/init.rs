//! Implementation of the `caissa init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::adapters::sqlite::{database_url, initialize_database, PoolConfig};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing .caissa/config.yaml
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub config_written: bool,
    pub database_path: PathBuf,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.config_written {
            lines.push("\nWrote .caissa/config.yaml".to_string());
        }
        lines.push(format!("Database ready at {}", self.database_path.display()));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: InitArgs, config: &Config, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir().context("Failed to get current directory")?.join(&args.path)
    };

    let caissa_dir = target_path.join(".caissa");
    fs::create_dir_all(&caissa_dir)
        .await
        .with_context(|| format!("Failed to create {}", caissa_dir.display()))?;

    let config_path = caissa_dir.join("config.yaml");
    let config_written = args.force || !config_path.exists();
    if config_written {
        let yaml = serde_yaml::to_string(&Config::default()).context("Failed to serialize default config")?;
        fs::write(&config_path, yaml)
            .await
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
    }

    // Relative database paths resolve against the target directory
    let database_path = {
        let configured = PathBuf::from(&config.database.path);
        if configured.is_absolute() {
            configured
        } else {
            target_path.join(configured)
        }
    };
    initialize_database(
        &database_url(&database_path.display().to_string()),
        Some(PoolConfig::from(&config.database)),
    )
    .await
    .context("Failed to initialize database")?;

    tracing::info!(path = %target_path.display(), config_written, "Project initialized");

    let output_data = InitOutput {
        success: true,
        message: "Project initialized successfully.".to_string(),
        initialized_path: target_path,
        config_written,
        database_path,
    };
    output(&output_data, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_writes_config_and_database() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs { force: false, path: dir.path().to_path_buf() };

        execute(args, &Config::default(), true).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join(".caissa/config.yaml")).unwrap();
        let parsed: Config = serde_yaml::from_str(&written).unwrap();
        assert_eq!(parsed, Config::default());
        assert!(dir.path().join(".caissa/caissa.db").exists());
    }

    #[tokio::test]
    async fn test_init_keeps_existing_config_without_force() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".caissa")).unwrap();
        std::fs::write(dir.path().join(".caissa/config.yaml"), "habit:\n  initial_intensity: 2\n").unwrap();

        let args = InitArgs { force: false, path: dir.path().to_path_buf() };
        execute(args, &Config::default(), true).await.unwrap();

        let kept = std::fs::read_to_string(dir.path().join(".caissa/config.yaml")).unwrap();
        assert!(kept.contains("initial_intensity: 2"));
    }
}
