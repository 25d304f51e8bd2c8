//! CLI command definitions and dispatch.

pub mod compose;
pub mod config;
pub mod version;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use previewctl_common::config::CliConfig;

/// pvw: Manage preview environments from the command line.
#[derive(Parser, Debug)]
#[command(name = "pvw", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Project slug to use instead of the configured project.
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Path to the configuration file.
    #[arg(long, global = true, env = previewctl_common::constants::CONFIG_ENV_VAR)]
    pub config: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print version information.
    Version,
    /// Read and change CLI configuration options.
    Config(config::ConfigArgs),
    /// Manage the selected project.
    Project(ProjectArgs),
}

/// Arguments for the `project` subcommand.
#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// Project resource to manage.
    #[command(subcommand)]
    pub command: ProjectCommand,
}

/// Subcommands of `project`.
#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Manage the project's compose file.
    #[command(subcommand)]
    Compose(compose::ComposeCommand),
}

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct Globals {
    /// Configuration file location.
    pub config_path: PathBuf,
    /// Project override from `--project`.
    pub project: Option<String>,
}

impl Globals {
    /// Loads the configuration file with the project override applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read.
    pub fn load_config(&self) -> anyhow::Result<CliConfig> {
        Ok(CliConfig::load(&self.config_path)?.with_project_override(self.project.clone()))
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let globals = Globals {
        config_path: cli
            .config
            .unwrap_or_else(previewctl_common::constants::default_config_path),
        project: cli.project,
    };
    tracing::debug!(config = %globals.config_path.display(), "dispatching command");

    match cli.command {
        Command::Version => version::execute(),
        Command::Config(args) => config::execute(args, &globals),
        Command::Project(ProjectArgs {
            command: ProjectCommand::Compose(command),
        }) => compose::execute(command, &globals),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_compose_set_with_global_project() {
        let cli = Cli::try_parse_from([
            "pvw", "project", "compose", "set", "--file", "compose.yml", "--project", "shop",
        ])
        .expect("should parse");
        assert_eq!(cli.project.as_deref(), Some("shop"));
        assert!(matches!(
            cli.command,
            Command::Project(ProjectArgs {
                command: ProjectCommand::Compose(compose::ComposeCommand::Set(_))
            })
        ));
    }

    #[test]
    fn compose_set_requires_file() {
        assert!(Cli::try_parse_from(["pvw", "project", "compose", "set"]).is_err());
    }
}
