//! Implementation of the `caissa plan` command.

use anyhow::{Context, Result};
use clap::Args;

use super::CommandContext;
use crate::cli::output::{list_table, output, truncate, CommandOutput};
use crate::domain::models::{Config, OpeningRecommendation, Plan, PlanOutcome};

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// User id
    pub user: String,
}

#[derive(Debug, serde::Serialize)]
#[serde(transparent)]
pub struct PlanOutput(pub PlanOutcome);

/// Human rendering of a single plan, shared with `history`.
pub fn render_plan(plan: &Plan) -> String {
    let mut lines = vec![
        format!("Plan {} for {}", plan.plan_id, plan.user_id),
        format!("Created: {}", plan.created_at.format("%Y-%m-%d %H:%M UTC")),
        format!("Based on game: {}", plan.based_on_game_id),
        format!("Tier: {}  Intensity: {}", plan.rating_tier.as_str(), plan.intensity),
        format!("Primary focus: {}", plan.primary_focus),
    ];
    if let Some(secondary) = plan.secondary_focus {
        lines.push(format!("Secondary focus: {secondary}"));
    }

    let mut table = list_table(&["domain", "goal", "audited"]);
    for card in &plan.domains {
        table.add_row(vec![
            card.domain.to_string(),
            truncate(&card.goal, 60),
            if card.rule.is_some() { "yes" } else { "-" }.to_string(),
        ]);
    }
    lines.push(String::new());
    lines.push(table.to_string());

    for card in plan.domains.iter().filter(|c| !c.bullets.is_empty()) {
        lines.push(format!("\n{}:", card.domain));
        for bullet in &card.bullets {
            lines.push(format!("  - {bullet}"));
        }
    }

    if !plan.opening_recommendations.is_empty() {
        lines.push("\nOpenings:".to_string());
        for rec in &plan.opening_recommendations {
            lines.push(match rec {
                OpeningRecommendation::Recommended { color, opening, games, score_rate } => format!(
                    "  {}: {} ({} games, {:.0}%)",
                    color.as_str(),
                    opening,
                    games,
                    score_rate * 100.0
                ),
                OpeningRecommendation::InsufficientData { color } => {
                    format!("  {}: not enough games yet", color.as_str())
                }
            });
        }
    }

    if !plan.focus_items.is_empty() {
        lines.push("\nFrom your last game:".to_string());
        for item in &plan.focus_items {
            lines.push(format!("  - [{}] {}", item.domain, item.text));
        }
    }

    if !plan.example_positions.is_empty() {
        lines.push("\nPositions to review:".to_string());
        for pos in &plan.example_positions {
            lines.push(format!(
                "  {} move {}: played {} (best {}), -{}cp",
                pos.game_id,
                pos.move_number,
                pos.played_move.as_deref().unwrap_or("?"),
                pos.best_move.as_deref().unwrap_or("?"),
                pos.cp_loss
            ));
        }
    }

    lines.join("\n")
}

impl CommandOutput for PlanOutput {
    fn to_human(&self) -> String {
        match &self.0 {
            PlanOutcome::NeedsMoreGames { analyzed_games, required } => format!(
                "Not enough analyzed games yet ({analyzed_games}/{required}). Play a few more and check back."
            ),
            PlanOutcome::AllClear { streak } => {
                format!("No recurring weakness in recent games. Clean streak: {streak}.")
            }
            PlanOutcome::Ready { plan, regenerated } => {
                let mut text = render_plan(plan);
                if *regenerated {
                    text.push_str("\n\n(new plan)");
                }
                text
            }
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: PlanArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = CommandContext::open(config).await?;
    let outcome = ctx
        .service
        .get_current_plan(&args.user)
        .await
        .with_context(|| format!("Failed to get plan for {}", args.user))?;
    output(&PlanOutput(outcome), json_mode);
    Ok(())
}
