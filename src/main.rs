//! Sprintcast CLI - sprint metrics and capacity forecasts from tracker exports.

use clap::Parser;
use sprintcast::cli::{ArchiveCommands, Cli, Commands, ConfigCommands, SessionCommands};
use sprintcast::commands::{self, Context, Output};
use sprintcast::config::{ConfigOverrides, OutputFormat};
use sprintcast::storage::Storage;
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "SC_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mut human = cli.human_readable;
    let result = run(cli, &mut human);

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Resolve config, then dispatch. `human` picks up a configured output format.
fn run(cli: Cli, human: &mut bool) -> Result<(), sprintcast::Error> {
    let storage = Storage::open()?;
    let overrides = overrides(&cli);
    let ctx = Context::new(storage, cli.session, &overrides)?;
    *human = *human || ctx.config.output_format() == OutputFormat::Human;
    run_command(cli.command, &ctx, *human)
}

/// Logs go to stderr so stdout stays parseable.
fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

/// Config values given as command flags.
fn overrides(cli: &Cli) -> ConfigOverrides {
    let mut overrides = ConfigOverrides::new();
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    match cli.command {
        Commands::Forecast {
            window, capacity, ..
        } => {
            if let Some(window) = window {
                overrides = overrides.with_window(window);
            }
            if let Some(capacity) = capacity {
                overrides = overrides.with_team_capacity(capacity);
            }
        }
        Commands::Dashboard {
            capacity: Some(capacity),
            ..
        } => {
            overrides = overrides.with_team_capacity(capacity);
        }
        _ => {}
    }
    overrides
}

fn run_command(command: Commands, ctx: &Context, human: bool) -> Result<(), sprintcast::Error> {
    match command {
        Commands::Load { file } => output(&commands::load(ctx, &file)?, human),
        Commands::Sprints => output(&commands::sprints(ctx)?, human),
        Commands::Metrics { sprint } => output(&commands::metrics(ctx, sprint.sprint)?, human),
        Commands::Velocity => output(&commands::velocity(ctx)?, human),
        Commands::Forecast { sprint, .. } => {
            output(&commands::forecast(ctx, sprint.sprint)?, human)
        }
        Commands::Assignees { sprint } => {
            output(&commands::assignees(ctx, sprint.sprint)?, human)
        }
        Commands::Projects { sprint } => output(&commands::projects(ctx, sprint.sprint)?, human),
        Commands::Dashboard { sprint, .. } => {
            output(&commands::dashboard(ctx, sprint.sprint)?, human)
        }
        Commands::IssueTypes => output(&commands::issue_types(ctx)?, human),
        Commands::Archive { command } => match command {
            ArchiveCommands::Create { sprint } => {
                output(&commands::archive_create(ctx, sprint.sprint)?, human)
            }
            ArchiveCommands::List => output(&commands::archive_list(ctx)?, human),
            ArchiveCommands::Show { id } => output(&commands::archive_show(ctx, &id)?, human),
            ArchiveCommands::Delete { id } => {
                output(&commands::archive_delete(ctx, &id)?, human)
            }
        },
        Commands::Session { command } => match command {
            SessionCommands::List => output(&commands::session_list(ctx)?, human),
            SessionCommands::Show => output(&commands::session_show(ctx)?, human),
            SessionCommands::Rm { id } => output(&commands::session_remove(ctx, &id)?, human),
            SessionCommands::Prune => output(&commands::session_prune(ctx)?, human),
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => output(&commands::config_show(ctx)?, human),
            ConfigCommands::Set { key, value } => {
                output(&commands::config_set(ctx, &key, &value)?, human)
            }
        },
    }
    Ok(())
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
