//! `pvw config`: Read and change CLI configuration options.

use clap::{Args, Subcommand};
use previewctl_common::config::{CliConfig, ConfigKey};

use super::Globals;
use crate::output::mask_secret;

/// Arguments for the `config` subcommand.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Configuration action to perform.
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// List every set option.
    List,
    /// Print the value of one option.
    GetValue {
        /// Option name (server, project, token).
        key: String,
    },
    /// Set an option.
    Set {
        /// Option name (server, project, token).
        key: String,
        /// New value.
        value: String,
    },
    /// Clear an option.
    Unset {
        /// Option name (server, project, token).
        key: String,
    },
}

/// Executes the `config` command.
///
/// # Errors
///
/// Returns an error if the key is unknown or the configuration file cannot
/// be read or written.
pub fn execute(args: ConfigArgs, globals: &Globals) -> anyhow::Result<()> {
    let path = &globals.config_path;
    let mut config = CliConfig::load(path)?;

    match args.action {
        ConfigAction::List => {
            for line in list_lines(&config) {
                println!("{line}");
            }
        }
        ConfigAction::GetValue { key } => {
            let key: ConfigKey = key.parse()?;
            match config.read_option(key) {
                Some(value) => println!("{}", display_value(key, value)),
                None => println!("The option {key} doesn't exist in config file"),
            }
        }
        ConfigAction::Set { key, value } => {
            let key: ConfigKey = key.parse()?;
            config.write_option(key, value)?;
            config.save(path)?;
            tracing::info!(%key, "config option updated");
            println!("Updated property [{key}]");
        }
        ConfigAction::Unset { key } => {
            let key: ConfigKey = key.parse()?;
            if config.unset_option(key).is_some() {
                config.save(path)?;
                println!("Unset property [{key}]");
            } else {
                println!("The option {key} doesn't exist in config file");
            }
        }
    }

    Ok(())
}

fn display_value(key: ConfigKey, value: &str) -> String {
    match key {
        ConfigKey::Token => mask_secret(value),
        ConfigKey::Server | ConfigKey::Project => value.to_owned(),
    }
}

fn list_lines(config: &CliConfig) -> Vec<String> {
    config
        .list()
        .into_iter()
        .map(|(key, value)| format!("{key} - {}", display_value(key, value)))
        .collect()
}
