//! CLI configuration file model.
//!
//! The configuration is a small JSON document holding the API server, the
//! selected project, and the session token written by the login flow.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PreviewError, Result};

/// A recognized configuration option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    /// Base URL of the preview service API.
    Server,
    /// Slug of the selected project.
    Project,
    /// Session token for the signed-in user.
    Token,
}

impl ConfigKey {
    /// All options, in listing order.
    pub const ALL: [Self; 3] = [Self::Server, Self::Project, Self::Token];

    /// Returns the key as it appears in the configuration file.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Project => "project",
            Self::Token => "token",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| PreviewError::NotFound {
                kind: "config option",
                id: s.to_owned(),
            })
    }
}

/// Root configuration for the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Base URL of the preview service API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Slug of the selected project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Session token for the signed-in user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl CliConfig {
    /// Loads the configuration from `path`.
    ///
    /// A missing file yields the default (empty) configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading config file");
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| PreviewError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Persists the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        tracing::debug!(path = %path.display(), "saving config file");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PreviewError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| PreviewError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Returns the value of an option, if set.
    #[must_use]
    pub fn read_option(&self, key: ConfigKey) -> Option<&str> {
        self.slot(key).as_deref()
    }

    /// Sets an option.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is empty.
    pub fn write_option(&mut self, key: ConfigKey, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(PreviewError::Config {
                message: format!("value for {key} must not be empty"),
            });
        }
        *self.slot_mut(key) = Some(value);
        Ok(())
    }

    /// Clears an option. Returns the previous value.
    pub fn unset_option(&mut self, key: ConfigKey) -> Option<String> {
        self.slot_mut(key).take()
    }

    /// Returns every set option in listing order.
    #[must_use]
    pub fn list(&self) -> Vec<(ConfigKey, &str)> {
        ConfigKey::ALL
            .into_iter()
            .filter_map(|key| self.read_option(key).map(|value| (key, value)))
            .collect()
    }

    /// Whether a server and session token are both configured.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.server.is_some() && self.token.is_some()
    }

    /// Whether a project has been selected.
    #[must_use]
    pub const fn is_project_set(&self) -> bool {
        self.project.is_some()
    }

    /// Replaces the selected project for this run when `project` is given.
    #[must_use]
    pub fn with_project_override(mut self, project: Option<String>) -> Self {
        if project.is_some() {
            self.project = project;
        }
        self
    }

    const fn slot(&self, key: ConfigKey) -> &Option<String> {
        match key {
            ConfigKey::Server => &self.server,
            ConfigKey::Project => &self.project,
            ConfigKey::Token => &self.token,
        }
    }

    const fn slot_mut(&mut self, key: ConfigKey) -> &mut Option<String> {
        match key {
            ConfigKey::Server => &mut self.server,
            ConfigKey::Project => &mut self.project,
            ConfigKey::Token => &mut self.token,
        }
    }
}
