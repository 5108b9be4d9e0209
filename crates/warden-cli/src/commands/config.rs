//! Configuration display command.

use super::Context;
use anyhow::Result;
use std::process::ExitCode;

/// Show the effective configuration as TOML.
pub fn show(ctx: &Context) -> Result<ExitCode> {
    print!("{}", ctx.config.to_toml()?);
    Ok(ExitCode::SUCCESS)
}
