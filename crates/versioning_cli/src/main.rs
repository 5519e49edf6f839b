//! Repository versioning CLI.
//!
//! # Responsibility
//! - Expose repository use-cases for local inspection and scripting.
//! - Print records as JSON on stdout and failures on stderr.
//!
//! # Invariants
//! - Each subcommand runs in exactly one committed or rolled-back session.
//! - Exit code is 0 on success, 1 on command failure, 2 on usage errors.

use clap::{Parser, Subcommand};
use log::info;
use std::process::ExitCode;
use versioning_core::{
    core_version, init_logging, CommandExecutor, CoreConfig, NewRepository, RepositoryListQuery,
    RepositoryRecord, RepositoryRef, RepositoryService,
};

#[derive(Parser)]
#[command(name = "versioning_cli")]
#[command(about = "Inspect and edit versioned repositories in a local database")]
struct Cli {
    #[command(subcommand)]
    invocation: Invocation,
}

#[derive(Subcommand)]
enum Invocation {
    /// Print the core library version.
    Version,
    /// Create a repository owned by `owner`.
    Create {
        workspace: String,
        name: String,
        owner: String,
    },
    /// Show one active repository.
    Get { workspace: String, name: String },
    /// Rename a repository within its workspace.
    Rename {
        workspace: String,
        name: String,
        new_name: String,
    },
    /// Soft-delete a repository.
    Delete { workspace: String, name: String },
    /// List active repositories of a workspace.
    List { workspace: String },
}

fn main() -> ExitCode {
    let invocation = Cli::parse().invocation;

    if let Invocation::Version = invocation {
        println!("versioning_core version={}", core_version());
        return ExitCode::SUCCESS;
    }

    match run(invocation) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(invocation: Invocation) -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| format!("config error: {err}"))?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(&config.log_level, log_dir).map_err(|err| format!("logging error: {err}"))?;
    }
    info!(
        "event=cli_start module=cli status=ok db_path={}",
        config.db_path.display()
    );

    let executor = CommandExecutor::open(&config.db_path, config.executor)
        .map_err(|err| format!("failed to open `{}`: {err}", config.db_path.display()))?;
    let mut service = RepositoryService::new(executor);

    let outcome = match invocation {
        Invocation::Version => return Ok(()),
        Invocation::Create {
            workspace,
            name,
            owner,
        } => service
            .create(NewRepository::new(workspace, name, owner))
            .map(|record| vec![record]),
        Invocation::Get { workspace, name } => service
            .get(RepositoryRef::by_name(workspace, name))
            .map(|record| vec![record]),
        Invocation::Rename {
            workspace,
            name,
            new_name,
        } => service
            .rename(RepositoryRef::by_name(workspace, name), new_name, None)
            .map(|record| vec![record]),
        Invocation::Delete { workspace, name } => service
            .delete(RepositoryRef::by_name(workspace, name), None)
            .map(|record| vec![record]),
        Invocation::List { workspace } => service.list(&RepositoryListQuery {
            workspace: Some(workspace),
            ..RepositoryListQuery::default()
        }),
    };

    let records = outcome.map_err(|err| format!("error_kind={} error={err}", err.kind()))?;
    print_records(&records)
}

fn print_records(records: &[RepositoryRecord]) -> Result<(), String> {
    for record in records {
        let line = serde_json::to_string(record)
            .map_err(|err| format!("failed to encode record: {err}"))?;
        println!("{line}");
    }
    Ok(())
}
