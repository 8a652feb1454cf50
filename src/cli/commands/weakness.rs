//! Implementation of the `caissa weakness` command.

use anyhow::{Context, Result};
use clap::Args;

use super::CommandContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, WeaknessReport};

#[derive(Args, Debug)]
pub struct WeaknessArgs {
    /// User id
    pub user: String,
}

#[derive(Debug, serde::Serialize)]
#[serde(transparent)]
pub struct WeaknessOutput(pub WeaknessReport);

impl CommandOutput for WeaknessOutput {
    fn to_human(&self) -> String {
        match &self.0 {
            WeaknessReport::NeedsMoreGames { analyzed_games, required } => {
                format!("Not enough analyzed games yet ({analyzed_games}/{required}).")
            }
            WeaknessReport::AllClear { streak } => {
                format!("No recurring weakness in recent games. Clean streak: {streak}.")
            }
            WeaknessReport::Dominant { bucket, cost_score, secondary, evidence, baseline_cost } => {
                let b = &cost_score.breakdown;
                let mut lines = vec![
                    format!("Dominant weakness: {bucket} ({})", bucket.domain()),
                    format!("Cost: {:.1} over {} event(s)", cost_score.value, cost_score.sample_events),
                    format!(
                        "  eval {:.1}  frequency {:.1}  instability {:.1}  reflection {:.1}",
                        b.eval_component,
                        b.frequency_component,
                        b.instability_component,
                        cost_score.reflection.applied
                    ),
                ];
                if let Some(baseline) = baseline_cost {
                    lines.push(format!("Cost when this focus started: {baseline:.1}"));
                }
                if let Some(secondary) = secondary {
                    lines.push(format!("Runner-up: {secondary}"));
                }
                if !evidence.is_empty() {
                    lines.push("\nWorst moments:".to_string());
                    for item in evidence {
                        lines.push(format!(
                            "  {} move {}: -{}cp",
                            item.game_id, item.evidence.move_number, item.evidence.cp_loss
                        ));
                    }
                }
                lines.join("\n")
            }
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: WeaknessArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = CommandContext::open(config).await?;
    let report = ctx
        .service
        .get_dominant_weakness(&args.user)
        .await
        .with_context(|| format!("Failed to compute weakness for {}", args.user))?;
    output(&WeaknessOutput(report), json_mode);
    Ok(())
}
