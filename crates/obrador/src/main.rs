// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Obrador operator CLI.
//!
//! Works the intake queue of one bakery tenant: list and search the inbox,
//! inspect and triage conversations, finalize or discard them, and create
//! folios straight from the order form.

mod app;
mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use obrador_config::ObradorConfig;
use obrador_core::{FolioError, Priority};
use obrador_draft::describe_missing;

use crate::app::App;
use crate::render::Output;

/// Obrador - conversational order intake for bakeries.
#[derive(Parser, Debug)]
#[command(name = "obrador", version, about, long_about = None)]
struct Cli {
    /// Configuration file to load instead of the default search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    /// Operator id recorded in the audit trail.
    #[arg(long, global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List active sessions in triage order.
    Inbox {
        /// Filter by customer name.
        #[arg(long)]
        search: Option<String>,
    },
    /// Show a session with its transcript.
    Show { session_id: String },
    /// Change a session's priority or operator flag.
    Triage {
        session_id: String,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        needs_human: Option<bool>,
    },
    /// Abandon a session.
    Discard {
        session_id: String,
        #[arg(long)]
        reason: String,
    },
    /// Materialize a session's draft into a folio.
    Finalize { session_id: String },
    /// Create a folio from an order-form JSON file.
    CreateFromForm {
        form: PathBuf,
        /// Idempotency key for the submission.
        #[arg(long)]
        request_id: Option<String>,
    },
    /// Show a folio by number.
    Folio { number: i64 },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            obrador_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.app.log_level);

    let out = Output::new(cli.json, cli.plain);
    if let Err(e) = run(cli, &config, out).await {
        report_error(&e, out);
        std::process::exit(1);
    }
}

fn load_config(
    path: Option<&std::path::Path>,
) -> Result<ObradorConfig, Vec<obrador_config::ConfigError>> {
    match path {
        Some(path) => obrador_config::load_and_validate_path(path),
        None => obrador_config::load_and_validate(),
    }
}

async fn run(cli: Cli, config: &ObradorConfig, out: Output) -> Result<(), FolioError> {
    let app = App::open(config).await?;
    let actor = cli.actor.as_deref();

    let result = match &cli.command {
        Commands::Inbox { search } => commands::inbox(&app, out, search.as_deref()).await,
        Commands::Show { session_id } => commands::show(&app, out, session_id).await,
        Commands::Triage {
            session_id,
            priority,
            needs_human,
        } => commands::triage(&app, out, session_id, *priority, *needs_human, actor).await,
        Commands::Discard { session_id, reason } => {
            commands::discard(&app, out, session_id, reason, actor).await
        }
        Commands::Finalize { session_id } => {
            commands::finalize(&app, out, session_id, actor).await
        }
        Commands::CreateFromForm { form, request_id } => {
            commands::create_from_form(&app, out, form, request_id.as_deref(), actor).await
        }
        Commands::Folio { number } => commands::folio(&app, out, *number).await,
    };

    // Close even when the command failed so audit writes are not lost.
    let closed = app.close().await;
    result.and(closed)
}

fn report_error(err: &FolioError, out: Output) {
    if out.json {
        let mut body = serde_json::json!({ "error": err.to_string() });
        if let Some(fields) = err.missing_fields() {
            body["missingFields"] = serde_json::json!(fields);
        }
        eprintln!("{body}");
        return;
    }

    let label = if out.color {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    };
    eprintln!("{label} {err}");
    if let Some(fields) = err.missing_fields() {
        eprintln!("  {}", describe_missing(fields));
    }
}

/// Initialize the tracing subscriber with the configured log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("obrador={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn triage_flags_parse() {
        let cli = Cli::parse_from([
            "obrador",
            "--actor",
            "maria",
            "triage",
            "sess-1",
            "--priority",
            "urgente",
            "--needs-human",
            "true",
        ]);
        assert_eq!(cli.actor.as_deref(), Some("maria"));
        match cli.command {
            Commands::Triage {
                session_id,
                priority,
                needs_human,
            } => {
                assert_eq!(session_id, "sess-1");
                assert_eq!(priority, Some(Priority::Urgente));
                assert_eq!(needs_human, Some(true));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::parse_from(["obrador", "inbox", "--search", "ana", "--json"]);
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Inbox { search: Some(ref s) } if s == "ana"
        ));
    }

    #[test]
    fn discard_requires_reason() {
        assert!(Cli::try_parse_from(["obrador", "discard", "sess-1"]).is_err());
    }

    #[test]
    fn create_from_form_takes_request_id() {
        let cli = Cli::parse_from([
            "obrador",
            "create-from-form",
            "order.json",
            "--request-id",
            "req-7",
        ]);
        match cli.command {
            Commands::CreateFromForm { form, request_id } => {
                assert_eq!(form, PathBuf::from("order.json"));
                assert_eq!(request_id.as_deref(), Some("req-7"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn default_config_loads() {
        let config = obrador_config::load_and_validate_str("").expect("defaults are valid");
        assert_eq!(config.tenant.id, "default");
    }
}
