//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::{
    audit::AuditArgs, history::HistoryArgs, ingest::IngestArgs, init::InitArgs, plan::PlanArgs,
    reflect::ReflectArgs, weakness::WeaknessArgs,
};

#[derive(Parser, Debug)]
#[command(name = "caissa")]
#[command(about = "Caissa - behavioral coaching for chess improvement", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Extra YAML config file, merged after .caissa/config.yaml
    #[arg(short, long, global = true, env = "CAISSA_CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Caissa configuration and database
    Init(InitArgs),
    /// Load analyzed games from a JSON file into the analysis store
    Ingest(IngestArgs),
    /// Show the user's plan for the next game
    Plan(PlanArgs),
    /// Audit the user's latest game against the current plan
    Audit(AuditArgs),
    /// Show the user's dominant weakness
    Weakness(WeaknessArgs),
    /// Record a self-reported weakness
    Reflect(ReflectArgs),
    /// List past plans
    History(HistoryArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_reflect_with_global_flags() {
        let cli = Cli::parse_from(["caissa", "--json", "reflect", "alice", "time_discipline"]);
        assert!(cli.json);
        let Commands::Reflect(args) = cli.command else {
            panic!("expected reflect");
        };
        assert_eq!(args.user, "alice");
        assert_eq!(args.bucket, "time_discipline");
    }
}
