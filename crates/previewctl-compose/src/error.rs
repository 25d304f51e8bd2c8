//! Failures of a dependency resolution run.
//!
//! Every variant aborts the whole run; no partial bundle is returned.

use std::path::PathBuf;

use thiserror::Error;

use crate::parser::MalformedManifest;
use crate::paths::display_chain;

/// Error returned by the dependency resolver.
#[derive(Debug, Error)]
pub enum DependencyError {
    /// The root or an included manifest could not be decoded.
    #[error("malformed manifest {}: {source}", .path.display())]
    MalformedManifest {
        /// Manifest that failed to decode.
        path: PathBuf,
        /// Decoding failure.
        source: MalformedManifest,
    },

    /// A referenced file does not exist.
    #[error(
        "missing dependency {} (resolved to {}) referenced by {}{}",
        .reference.display(),
        .resolved.display(),
        .declared_in.display(),
        service_suffix(.service.as_deref())
    )]
    MissingDependency {
        /// Path as written in the manifest.
        reference: PathBuf,
        /// Absolute path that was looked up.
        resolved: PathBuf,
        /// Manifest that declared the reference.
        declared_in: PathBuf,
        /// Service that declared the reference, if any.
        service: Option<String>,
    },

    /// A chain of includes leads back to a manifest still being expanded.
    #[error("cyclic dependency: {}", display_chain(.chain))]
    CyclicDependency {
        /// Absolute paths from the first revisited manifest back to itself.
        chain: Vec<PathBuf>,
    },

    /// A file exists but could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    UnreadableFile {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Includes nest deeper than the resolver allows.
    #[error("include depth limit of {limit} exceeded at {}", .path.display())]
    IncludeDepthExceeded {
        /// Manifest that would have exceeded the limit.
        path: PathBuf,
        /// Configured maximum depth.
        limit: usize,
    },
}

fn service_suffix(service: Option<&str>) -> String {
    service.map_or_else(String::new, |name| format!(" (service `{name}`)"))
}
