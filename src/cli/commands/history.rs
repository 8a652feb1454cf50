//! Implementation of the `caissa history` command.

use anyhow::{Context, Result};
use clap::Args;

use super::plan::render_plan;
use super::CommandContext;
use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::{Config, Plan};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// User id
    pub user: String,

    /// Maximum number of plans to list
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Show every plan in full instead of a summary table
    #[arg(long)]
    pub full: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct HistoryOutput {
    pub plans: Vec<Plan>,
    #[serde(skip)]
    pub full: bool,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        if self.plans.is_empty() {
            return "No plans found.".to_string();
        }
        if self.full {
            return self.plans.iter().map(render_plan).collect::<Vec<_>>().join("\n\n");
        }

        let mut table = list_table(&["created", "plan", "focus", "intensity", "game"]);
        for plan in &self.plans {
            let short_id = plan.plan_id.to_string();
            table.add_row(vec![
                plan.created_at.format("%Y-%m-%d %H:%M").to_string(),
                short_id.chars().take(8).collect(),
                plan.primary_focus.to_string(),
                plan.intensity.level().to_string(),
                plan.based_on_game_id.clone(),
            ]);
        }
        format!("{} plan(s):\n{}", self.plans.len(), table)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: HistoryArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = CommandContext::open(config).await?;
    let plans = ctx
        .service
        .plan_history(&args.user, args.limit)
        .await
        .with_context(|| format!("Failed to load plan history for {}", args.user))?;
    output(&HistoryOutput { plans, full: args.full }, json_mode);
    Ok(())
}
