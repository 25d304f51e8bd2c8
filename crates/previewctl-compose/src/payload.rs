//! Transport payload for a resolved dependency bundle.
//!
//! File contents are Base64-encoded so arbitrary bytes survive a JSON API.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::resolver::ResolvedDependency;

/// One file as transmitted to the preview service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Absolute local path.
    pub path: String,
    /// Base64-encoded file bytes.
    pub content: String,
    /// Absolute local path the file was read from.
    pub source: String,
}

impl FileEntry {
    /// Builds an entry for the file at `path` holding `content`.
    #[must_use]
    pub fn encode(path: &Path, content: &[u8]) -> Self {
        let path = path.to_string_lossy().into_owned();
        Self {
            source: path.clone(),
            path,
            content: encode_content(content),
        }
    }

    /// Decodes the entry's content back to raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid Base64.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        decode_content(&self.content)
    }
}

impl From<&ResolvedDependency> for FileEntry {
    fn from(dep: &ResolvedDependency) -> Self {
        Self::encode(dep.source(), &dep.content)
    }
}

/// The root manifest and every file it needs, ready to send in one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeBundle {
    /// The root manifest.
    #[serde(rename = "compose_file")]
    pub manifest: FileEntry,
    /// Transitively referenced files, in resolution order.
    pub dependencies: Vec<FileEntry>,
}

/// Encodes bytes with standard padded Base64.
#[must_use]
pub fn encode_content(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes standard Base64, tolerating embedded line breaks.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_content(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_mirrors_path_into_source() {
        let entry = FileEntry::encode(Path::new("/app/.env"), b"KEY=value\n");
        assert_eq!(entry.path, "/app/.env");
        assert_eq!(entry.source, "/app/.env");
        assert_eq!(entry.content, "S0VZPXZhbHVlCg==");
    }

    #[test]
    fn binary_content_survives_encoding() {
        let bytes: Vec<u8> = (0..=255).collect();
        let entry = FileEntry::encode(Path::new("/app/blob.bin"), &bytes);
        assert_eq!(entry.decode().expect("decode"), bytes);
    }

    #[test]
    fn decode_accepts_wrapped_lines() {
        assert_eq!(decode_content("S0VZPXZh\nbHVlCg==\n").expect("decode"), b"KEY=value\n");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_content("not base64!").is_err());
    }

    #[test]
    fn bundle_serializes_with_service_field_names() {
        let bundle = ComposeBundle {
            manifest: FileEntry::encode(Path::new("/app/compose.yml"), b"services: {}\n"),
            dependencies: vec![FileEntry::encode(Path::new("/app/.env"), b"A=1")],
        };
        let json = serde_json::to_value(&bundle).expect("serialize");
        assert_eq!(json["compose_file"]["path"], "/app/compose.yml");
        assert_eq!(json["compose_file"]["source"], "/app/compose.yml");
        assert_eq!(json["dependencies"][0]["path"], "/app/.env");
        assert_eq!(json["dependencies"][0]["content"], "QT0x");
    }
}
