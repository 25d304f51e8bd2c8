//! # previewctl-client
//!
//! Thin blocking client for the preview service's compose-file endpoints.
//! Each operation issues a single request and maps the response onto
//! [`previewctl_common::error::PreviewError`].

pub mod client;
pub mod response;

pub use client::ApiClient;
