//! Implementation of the `caissa audit` command.

use anyhow::{Context, Result};
use clap::Args;

use super::CommandContext;
use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::{AuditOutcome, AuditReport, Config};

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// User id
    pub user: String,
}

#[derive(Debug, serde::Serialize)]
#[serde(transparent)]
pub struct AuditOutput(pub AuditOutcome);

fn render_report(report: &AuditReport) -> String {
    let mut table = list_table(&["domain", "status", "reason", "evidence"]);
    for result in &report.results {
        let evidence = result
            .evidence
            .iter()
            .map(|e| format!("m{} -{}cp", e.move_number, e.cp_loss))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            result.domain.to_string(),
            result.status.as_str().to_string(),
            format!("{:?}", result.reason),
            evidence,
        ]);
    }

    let summary = &report.summary;
    format!(
        "Audit of game {}\n\n{}\n\nExecuted {}/{} ({:.0}%)",
        report.game_id,
        table,
        summary.executed,
        summary.domains_shown,
        summary.execution_score * 100.0
    )
}

impl CommandOutput for AuditOutput {
    fn to_human(&self) -> String {
        match &self.0 {
            AuditOutcome::NoGames => "No analyzed games yet.".to_string(),
            AuditOutcome::NothingToAudit { game_id } => {
                format!("Game {game_id} was the basis of the current plan; play your next game first.")
            }
            AuditOutcome::Audited { report, transition, replayed } => {
                let mut text = render_report(report);
                if *replayed {
                    text.push_str("\n(already audited)");
                }
                if let Some(t) = transition {
                    if t.intensity_before != t.intensity_after {
                        text.push_str(&format!("\nIntensity: {} -> {}", t.intensity_before, t.intensity_after));
                    }
                    if t.phase_before != t.phase_after {
                        text.push_str(&format!(
                            "\nHabit phase: {} -> {}",
                            t.phase_before.as_str(),
                            t.phase_after.as_str()
                        ));
                    }
                    if let Some(resolved) = t.resolved {
                        text.push_str(&format!("\nResolved: {resolved}"));
                    }
                    if let Some(promoted) = t.promoted {
                        text.push_str(&format!("\nNext focus: {promoted}"));
                    }
                }
                text
            }
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: AuditArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = CommandContext::open(config).await?;
    let outcome = ctx
        .service
        .audit_last_game(&args.user)
        .await
        .with_context(|| format!("Failed to audit last game for {}", args.user))?;
    output(&AuditOutput(outcome), json_mode);
    Ok(())
}
