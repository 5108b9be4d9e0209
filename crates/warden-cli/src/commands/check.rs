//! Access check command.

use super::{Context, parse_json};
use anyhow::Result;
use std::process::ExitCode;
use warden_abac::{AccessRequest, EnvironmentAttributes};

/// Decides one request. Prints `allow` or `deny`; exit code 0 only on allow.
pub fn run(
    ctx: &Context,
    rule: &str,
    subject: Option<&str>,
    object: Option<&str>,
    environment: Option<&str>,
    now: bool,
) -> Result<ExitCode> {
    let engine = ctx.engine()?;

    let mut environment = parse_json("environment", environment)?;
    if environment.is_none() && now {
        environment = Some(EnvironmentAttributes::now().to_value());
    }

    let request = AccessRequest {
        subject: parse_json("subject", subject)?,
        object: parse_json("object", object)?,
        environment,
    };

    let decision = engine.evaluate(rule, &request);
    if decision.is_allowed() {
        println!("allow");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("deny");
        eprintln!("{}", decision.reason);
        Ok(ExitCode::FAILURE)
    }
}
