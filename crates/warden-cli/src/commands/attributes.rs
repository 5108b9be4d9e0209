//! Attribute listing command.

use super::Context;
use anyhow::Result;
use std::process::ExitCode;

/// Prints the attribute paths a rule needs, one per line.
pub fn run(ctx: &Context, rule: &str, namespace: Option<&str>) -> Result<ExitCode> {
    let engine = ctx.engine()?;

    if !engine.is_registered(rule) {
        tracing::warn!(rule, "no such rule");
    }

    for path in engine.attributes_list(rule, namespace) {
        println!("{path}");
    }
    Ok(ExitCode::SUCCESS)
}
