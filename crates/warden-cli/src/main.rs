//! Warden CLI.
//!
//! Checks access requests against schema-based ABAC rules.
//!
//! # Quick Start
//!
//! ```bash
//! # Which attributes does a rule need?
//! warden --rules rules.json attributes office-hours --namespace subject
//!
//! # Decide a request (exit code 0 = allow, 1 = deny)
//! warden --rules rules.json check office-hours \
//!     --subject '{"staff": true}' --now
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Warden - attribute-based access control from JSON rule schemas.
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Rule file (JSON object of rule name to schema). Defaults to `rules.file` from config.
    #[arg(short, long, global = true)]
    rules: Option<PathBuf>,

    /// Project directory holding warden.toml.
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Classify attribute paths by their first segment only.
    #[arg(long, global = true)]
    strict: bool,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide an access request against a rule.
    Check {
        /// Rule name.
        rule: String,

        /// Subject attributes as JSON.
        #[arg(long)]
        subject: Option<String>,

        /// Object attributes as JSON.
        #[arg(long)]
        object: Option<String>,

        /// Environment attributes as JSON.
        #[arg(long)]
        environment: Option<String>,

        /// Use the current UTC time as the environment when none is given.
        #[arg(long)]
        now: bool,
    },

    /// List the attribute paths a rule needs.
    Attributes {
        /// Rule name.
        rule: String,

        /// Only this namespace (subject, object, environment).
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// List registered rules and whether they compiled.
    Rules,

    /// Show the effective configuration.
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let ctx = commands::Context::load(&cli.project, cli.rules, cli.strict)?;

    match cli.command {
        Commands::Check {
            rule,
            subject,
            object,
            environment,
            now,
        } => commands::check::run(
            &ctx,
            &rule,
            subject.as_deref(),
            object.as_deref(),
            environment.as_deref(),
            now,
        ),
        Commands::Attributes { rule, namespace } => {
            commands::attributes::run(&ctx, &rule, namespace.as_deref())
        }
        Commands::Rules => commands::rules::run(&ctx),
        Commands::Config => commands::config::show(&ctx),
    }
}
