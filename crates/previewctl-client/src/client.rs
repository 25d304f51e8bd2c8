//! Compose-file API client.

use std::time::Duration;

use previewctl_common::config::CliConfig;
use previewctl_common::constants::{API_PREFIX, APP_NAME};
use previewctl_common::error::{PreviewError, Result};
use previewctl_compose::payload::{ComposeBundle, decode_content};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};

use crate::response::{DescribeResponse, error_messages};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Authenticated client bound to one preview service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    server: String,
    token: String,
}

impl ApiClient {
    /// Creates a client for `server` authenticating with `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(server: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let server = server.into().trim_end_matches('/').to_owned();
        let http = Client::builder()
            .user_agent(format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PreviewError::Http {
                url: server.clone(),
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            server,
            token: token.into(),
        })
    }

    /// Creates a client from the server and token stored in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if either option is unset.
    pub fn from_config(config: &CliConfig) -> Result<Self> {
        let server = config.server.as_deref().ok_or_else(|| PreviewError::Config {
            message: "no server configured".into(),
        })?;
        let token = config.token.as_deref().ok_or_else(|| PreviewError::Config {
            message: "no session token; log in first".into(),
        })?;
        Self::new(server, token)
    }

    /// Base URL of the service.
    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    /// URL of a project's compose-file resource.
    #[must_use]
    pub fn compose_file_url(&self, project: &str) -> String {
        format!("{}{API_PREFIX}/projects/{project}/compose_file", self.server)
    }

    /// Uploads the compose bundle as the project's compose file.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service rejects it.
    pub fn set_compose_file(&self, project: &str, bundle: &ComposeBundle) -> Result<()> {
        let url = self.compose_file_url(project);
        tracing::info!(%url, dependencies = bundle.dependencies.len(), "uploading compose file");
        let request = self.http.post(&url).json(bundle);
        let _ = self.send(request, &url, StatusCode::CREATED)?;
        Ok(())
    }

    /// Removes the project's compose file.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service rejects it.
    pub fn unset_compose_file(&self, project: &str) -> Result<()> {
        let url = self.compose_file_url(project);
        tracing::info!(%url, "deleting compose file");
        let _ = self.send(self.http.delete(&url), &url, StatusCode::NO_CONTENT)?;
        Ok(())
    }

    /// Fetches the project's compose file and returns its decoded text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the service rejects it, or
    /// the returned content cannot be decoded.
    pub fn describe_compose_file(&self, project: &str) -> Result<String> {
        let url = self.compose_file_url(project);
        tracing::info!(%url, "fetching compose file");
        let response = self.send(self.http.get(&url), &url, StatusCode::OK)?;
        let body = read_body(response, &url)?;
        let described: DescribeResponse = serde_json::from_str(&body)?;
        let bytes = decode_content(&described.compose_file.content).map_err(|e| PreviewError::Http {
            url: url.clone(),
            message: format!("compose file content is not valid base64: {e}"),
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Asks the service to validate the compose bundle without storing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the bundle is rejected.
    pub fn validate_compose_file(&self, project: &str, bundle: &ComposeBundle) -> Result<()> {
        let url = format!("{}/validate", self.compose_file_url(project));
        tracing::info!(%url, dependencies = bundle.dependencies.len(), "validating compose file");
        let request = self.http.post(&url).json(bundle);
        let _ = self.send(request, &url, StatusCode::OK)?;
        Ok(())
    }

    fn send(&self, request: RequestBuilder, url: &str, expected: StatusCode) -> Result<Response> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| PreviewError::Http {
                url: url.to_owned(),
                message: e.to_string(),
            })?;

        let status = response.status();
        tracing::debug!(%url, status = status.as_u16(), "received response");
        if status == expected {
            return Ok(response);
        }

        let body = read_body(response, url)?;
        let mut messages = error_messages(&body);
        if messages.is_empty() {
            messages.push(status.canonical_reason().unwrap_or("unexpected response").to_owned());
        }
        Err(PreviewError::Api {
            status: status.as_u16(),
            messages,
        })
    }
}

fn read_body(response: Response, url: &str) -> Result<String> {
    response.text().map_err(|e| PreviewError::Http {
        url: url.to_owned(),
        message: format!("failed to read response body: {e}"),
    })
}
