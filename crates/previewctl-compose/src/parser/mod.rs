//! Compose manifest parser.
//!
//! Decodes raw manifest bytes into a [`Node`] tree and collects every
//! file reference the tree declares. Parsing never touches the filesystem.

pub mod node;
pub mod references;

use std::path::{Path, PathBuf};

use thiserror::Error;

use self::node::Node;
use self::references::ManifestReference;

/// The manifest bytes are not a well-formed compose document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct MalformedManifest {
    message: String,
}

impl MalformedManifest {
    /// Creates an error with the given description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Description of what is wrong with the document.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A decoded manifest together with the directory it was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedManifest {
    /// Decoded document; always a mapping.
    pub root: Node,
    /// Directory relative references are resolved against.
    pub base_dir: PathBuf,
}

/// Parses raw manifest bytes.
///
/// `base_dir` is recorded on the result for later path resolution; it is
/// not accessed. References are returned in order of first appearance.
///
/// # Errors
///
/// Returns [`MalformedManifest`] if the bytes are not UTF-8 YAML, the top
/// level is not a mapping, or a recognized reference field has the wrong
/// shape.
pub fn parse(
    raw: &[u8],
    base_dir: &Path,
) -> Result<(ParsedManifest, Vec<ManifestReference>), MalformedManifest> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| MalformedManifest::new(format!("manifest is not valid UTF-8: {e}")))?;
    let mut value: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| MalformedManifest::new(e.to_string()))?;
    value
        .apply_merge()
        .map_err(|e| MalformedManifest::new(format!("invalid merge key: {e}")))?;

    let root = match Node::try_from(value)? {
        node if node.is_null() => Node::empty(),
        node @ Node::Mapping(_) => node,
        other => {
            return Err(MalformedManifest::new(format!(
                "top level must be a mapping, found {}",
                other.shape()
            )));
        }
    };

    let refs = references::collect(&root)?;
    tracing::debug!(
        base_dir = %base_dir.display(),
        references = refs.len(),
        "parsed compose manifest"
    );

    Ok((
        ParsedManifest {
            root,
            base_dir: base_dir.to_path_buf(),
        },
        refs,
    ))
}
