//! Rule listing command.

use super::Context;
use anyhow::Result;
use std::process::ExitCode;
use warden_abac::RuleEntry;

/// Prints every rule name with its compilation status.
pub fn run(ctx: &Context) -> Result<ExitCode> {
    let engine = ctx.engine()?;

    for name in engine.names() {
        match engine.entry(name) {
            Some(RuleEntry::Compiled(rule)) => {
                println!("{name}\tcompiled\t{} attributes", rule.attributes().len());
            }
            Some(RuleEntry::Invalid(e)) => println!("{name}\tinvalid\t{e}"),
            None => {}
        }
    }
    Ok(ExitCode::SUCCESS)
}
