//! `pvw project compose`: Manage the project's compose file.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use previewctl_client::ApiClient;
use previewctl_common::config::CliConfig;
use previewctl_common::error::PreviewError;
use previewctl_compose::ResolvedDependency;

use super::Globals;
use crate::output::{format_bytes, rule};

/// Subcommands of `project compose`.
#[derive(Subcommand, Debug)]
pub enum ComposeCommand {
    /// Upload a compose file and every file it references.
    Set(FileArgs),
    /// Remove the project's compose file.
    Unset,
    /// Print the project's compose file.
    Describe,
    /// Ask the service to validate a compose file without storing it.
    Validate(FileArgs),
    /// List the files that would be uploaded with a compose file.
    Plan(FileArgs),
}

/// Arguments naming a local compose file.
#[derive(Args, Debug)]
pub struct FileArgs {
    /// Path to the compose file.
    #[arg(short, long)]
    pub file: PathBuf,
}

/// A subcommand that talks to the preview service.
enum RemoteAction {
    Set(PathBuf),
    Unset,
    Describe,
    Validate(PathBuf),
}

/// An authenticated client and the project it acts on.
struct Session {
    client: ApiClient,
    project: String,
}

/// Executes a `project compose` subcommand.
///
/// # Errors
///
/// Returns an error if the compose file cannot be resolved, the request
/// fails, or the service rejects it.
pub fn execute(command: ComposeCommand, globals: &Globals) -> anyhow::Result<()> {
    let action = match command {
        ComposeCommand::Plan(args) => return plan(&args.file),
        ComposeCommand::Set(args) => RemoteAction::Set(args.file),
        ComposeCommand::Unset => RemoteAction::Unset,
        ComposeCommand::Describe => RemoteAction::Describe,
        ComposeCommand::Validate(args) => RemoteAction::Validate(args.file),
    };
    execute_remote(action, globals)
}

fn execute_remote(action: RemoteAction, globals: &Globals) -> anyhow::Result<()> {
    let config = globals.load_config()?;
    let Some(session) = open_session(&config)? else {
        return Ok(());
    };

    match action {
        RemoteAction::Set(file) => {
            let bundle = previewctl_compose::bundle(&file)?;
            session
                .client
                .set_compose_file(&session.project, &bundle)
                .map_err(rejected)?;
            println!("compose file created");
        }
        RemoteAction::Unset => {
            session
                .client
                .unset_compose_file(&session.project)
                .map_err(rejected)?;
            println!("compose file deleted");
        }
        RemoteAction::Describe => {
            let content = session
                .client
                .describe_compose_file(&session.project)
                .map_err(rejected)?;
            print!("{content}");
        }
        RemoteAction::Validate(file) => {
            let bundle = previewctl_compose::bundle(&file)?;
            session
                .client
                .validate_compose_file(&session.project, &bundle)
                .map_err(rejected)?;
            println!("compose file is valid");
        }
    }

    Ok(())
}

/// Checks the sign-in and project preconditions, printing why one fails.
fn open_session(config: &CliConfig) -> anyhow::Result<Option<Session>> {
    if let Some(message) = precondition_failure(config) {
        println!("{message}");
        return Ok(None);
    }
    let Some(project) = config.project.clone() else {
        return Ok(None);
    };
    let client = ApiClient::from_config(config)?;
    Ok(Some(Session { client, project }))
}

fn precondition_failure(config: &CliConfig) -> Option<&'static str> {
    if !config.is_signed_in() {
        Some("You are not logged in.")
    } else if !config.is_project_set() {
        Some("This command needs project to be set in config file")
    } else {
        None
    }
}

/// Turns a service rejection into one error line per message.
fn rejected(err: PreviewError) -> anyhow::Error {
    match err {
        PreviewError::Api { messages, .. } if !messages.is_empty() => {
            anyhow::anyhow!(messages.join("\n"))
        }
        other => other.into(),
    }
}

/// Resolves a compose file locally and prints what would be uploaded.
fn plan(file: &Path) -> anyhow::Result<()> {
    let deps = previewctl_compose::resolve(file)?;

    println!("Upload plan for: {}", file.display());
    println!("{}", rule(35));
    println!();
    for line in plan_lines(&deps) {
        println!("{line}");
    }
    Ok(())
}

fn plan_lines(deps: &[ResolvedDependency]) -> Vec<String> {
    let mut lines: Vec<String> = deps
        .iter()
        .map(|dep| {
            format!(
                "  + {} ({}, {})",
                dep.path.display(),
                dep.kind,
                format_bytes(dep.content.len() as u64)
            )
        })
        .collect();
    let total: u64 = deps.iter().map(|d| d.content.len() as u64).sum();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "  {} file(s), {} will be uploaded with the compose file.",
        deps.len(),
        format_bytes(total)
    ));
    lines
}
