//! Implementation of the `caissa reflect` command.

use anyhow::{Context, Result};
use clap::Args;

use super::CommandContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Bucket, Config, Reflection};

#[derive(Args, Debug)]
pub struct ReflectArgs {
    /// User id
    pub user: String,

    /// Bucket the user believes cost them, e.g. time_discipline
    pub bucket: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ReflectOutput {
    pub reflection: Reflection,
}

impl CommandOutput for ReflectOutput {
    fn to_human(&self) -> String {
        format!("Noted: {} for {}", self.reflection.bucket, self.reflection.user_id)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ReflectArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = CommandContext::open(config).await?;
    let reflection = ctx.service.record_reflection(&args.user, &args.bucket).await.with_context(|| {
        let known: Vec<&str> = Bucket::ALL.iter().map(Bucket::as_str).collect();
        format!("Failed to record reflection (known buckets: {})", known.join(", "))
    })?;
    output(&ReflectOutput { reflection }, json_mode);
    Ok(())
}
