//! File references declared by a compose manifest.
//!
//! Recognized fields are listed in two lookup tables, one for top-level
//! keys and one for keys inside a service definition. Every other field
//! is passed over without inspection.

use std::fmt;
use std::path::{Path, PathBuf};

use super::MalformedManifest;
use super::node::Node;

/// Dockerfile name assumed when a build section does not name one.
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// The role a referenced file plays in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Dockerfile inside a service's build context.
    BuildContext,
    /// Environment file loaded into a service.
    EnvFile,
    /// Host path bind-mounted into a service.
    BindMount,
    /// Another manifest pulled in through `include` or `extends`.
    IncludedManifest,
    /// File backing a top-level config or secret.
    ConfigFile,
}

impl ReferenceKind {
    /// Tag used in logs and CLI output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuildContext => "build-context",
            Self::EnvFile => "env-file",
            Self::BindMount => "bind-mount",
            Self::IncludedManifest => "included-manifest",
            Self::ConfigFile => "config-file",
        }
    }

    /// Whether the referenced file is itself a manifest to expand.
    #[must_use]
    pub const fn is_manifest(self) -> bool {
        matches!(self, Self::IncludedManifest)
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single file reference found in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestReference {
    /// Path as written, relative to the declaring manifest's directory.
    pub path: PathBuf,
    /// Role of the referenced file.
    pub kind: ReferenceKind,
    /// `false` when the manifest marks the file optional.
    pub required: bool,
    /// Service that declared the reference, if any.
    pub service: Option<String>,
}

type Extractor = fn(&Node, &mut Collector) -> Result<(), MalformedManifest>;

/// Maps a recognized field name to the kind of reference it declares.
struct FieldRule {
    field: &'static str,
    kind: ReferenceKind,
    extract: Extractor,
}

const TOP_LEVEL_RULES: &[FieldRule] = &[
    FieldRule {
        field: "include",
        kind: ReferenceKind::IncludedManifest,
        extract: extract_include,
    },
    FieldRule {
        field: "configs",
        kind: ReferenceKind::ConfigFile,
        extract: extract_file_entries,
    },
    FieldRule {
        field: "secrets",
        kind: ReferenceKind::ConfigFile,
        extract: extract_file_entries,
    },
];

const SERVICE_RULES: &[FieldRule] = &[
    FieldRule {
        field: "build",
        kind: ReferenceKind::BuildContext,
        extract: extract_build,
    },
    FieldRule {
        field: "env_file",
        kind: ReferenceKind::EnvFile,
        extract: extract_env_files,
    },
    FieldRule {
        field: "volumes",
        kind: ReferenceKind::BindMount,
        extract: extract_bind_mounts,
    },
    FieldRule {
        field: "extends",
        kind: ReferenceKind::IncludedManifest,
        extract: extract_extends,
    },
];

/// Accumulates references while one field is being scanned.
struct Collector {
    refs: Vec<ManifestReference>,
    field: &'static str,
    kind: ReferenceKind,
    service: Option<String>,
}

impl Collector {
    fn push(&mut self, path: impl Into<PathBuf>) {
        self.push_as(path, self.kind, true);
    }

    fn push_as(&mut self, path: impl Into<PathBuf>, kind: ReferenceKind, required: bool) {
        self.refs.push(ManifestReference {
            path: path.into(),
            kind,
            required,
            service: self.service.clone(),
        });
    }

    fn shape_error(&self, expected: &str, found: &Node) -> MalformedManifest {
        let location = self
            .service
            .as_ref()
            .map_or_else(String::new, |s| format!(" of service `{s}`"));
        MalformedManifest::new(format!(
            "`{}`{location} must be {expected}, found {}",
            self.field,
            found.shape()
        ))
    }

    fn apply(&mut self, rule: &FieldRule, value: &Node) -> Result<(), MalformedManifest> {
        self.field = rule.field;
        self.kind = rule.kind;
        (rule.extract)(value, self)
    }
}

/// Collects every reference in a decoded manifest, in source order.
///
/// # Errors
///
/// Returns [`MalformedManifest`] if `services` or a recognized reference
/// field has an unexpected shape.
pub fn collect(root: &Node) -> Result<Vec<ManifestReference>, MalformedManifest> {
    let mut collector = Collector {
        refs: Vec::new(),
        field: "",
        kind: ReferenceKind::IncludedManifest,
        service: None,
    };

    let Node::Mapping(entries) = root else {
        return Ok(Vec::new());
    };

    for (key, value) in entries {
        if key == "services" {
            collect_services(value, &mut collector)?;
        } else if let Some(rule) = TOP_LEVEL_RULES.iter().find(|r| r.field == key) {
            collector.service = None;
            collector.apply(rule, value)?;
        }
    }

    Ok(collector.refs)
}

fn collect_services(services: &Node, collector: &mut Collector) -> Result<(), MalformedManifest> {
    let entries = match services {
        Node::Mapping(entries) => entries,
        node if node.is_null() => return Ok(()),
        other => {
            return Err(MalformedManifest::new(format!(
                "`services` must be a mapping, found {}",
                other.shape()
            )));
        }
    };

    for (name, definition) in entries {
        let fields = match definition {
            Node::Mapping(fields) => fields,
            node if node.is_null() => continue,
            other => {
                return Err(MalformedManifest::new(format!(
                    "service `{name}` must be a mapping, found {}",
                    other.shape()
                )));
            }
        };
        collector.service = Some(name.clone());
        for (key, value) in fields {
            if let Some(rule) = SERVICE_RULES.iter().find(|r| r.field == key) {
                collector.apply(rule, value)?;
            }
        }
    }
    collector.service = None;
    Ok(())
}

fn is_remote(location: &str) -> bool {
    location.contains("://") || location.starts_with("git@") || location.starts_with("github.com/")
}

fn is_host_path(source: &str) -> bool {
    source.starts_with('.') || source.starts_with('/') || source.starts_with('~')
}

fn extract_build(node: &Node, collector: &mut Collector) -> Result<(), MalformedManifest> {
    match node {
        Node::Mapping(_) => {
            if node.get("dockerfile_inline").is_some() {
                return Ok(());
            }
            let context = match node.get("context") {
                None => ".",
                Some(value) => value
                    .as_str()
                    .ok_or_else(|| collector.shape_error("a string context", value))?,
            };
            let dockerfile = match node.get("dockerfile") {
                None => DEFAULT_DOCKERFILE,
                Some(value) => value
                    .as_str()
                    .ok_or_else(|| collector.shape_error("a string dockerfile", value))?,
            };
            if !is_remote(context) {
                collector.push(Path::new(context).join(dockerfile));
            }
            Ok(())
        }
        Node::Scalar(_) => {
            let context = node
                .as_str()
                .ok_or_else(|| collector.shape_error("a string or a mapping", node))?;
            if !is_remote(context) {
                collector.push(Path::new(context).join(DEFAULT_DOCKERFILE));
            }
            Ok(())
        }
        Node::Sequence(_) => Err(collector.shape_error("a string or a mapping", node)),
    }
}

fn extract_env_files(node: &Node, collector: &mut Collector) -> Result<(), MalformedManifest> {
    let expected = "a string or a list";
    match node {
        Node::Sequence(items) => {
            for item in items {
                if let Some(path) = item.as_str() {
                    collector.push(path);
                } else if matches!(item, Node::Mapping(_)) {
                    let path = item
                        .get("path")
                        .and_then(Node::as_str)
                        .ok_or_else(|| collector.shape_error("an entry with a string `path`", item))?;
                    let required = item.get("required").and_then(Node::as_bool).unwrap_or(true);
                    collector.push_as(path, collector.kind, required);
                } else {
                    return Err(collector.shape_error("a list of paths", item));
                }
            }
            Ok(())
        }
        _ => {
            let path = node.as_str().ok_or_else(|| collector.shape_error(expected, node))?;
            collector.push(path);
            Ok(())
        }
    }
}

fn extract_bind_mounts(node: &Node, collector: &mut Collector) -> Result<(), MalformedManifest> {
    let Node::Sequence(items) = node else {
        return Err(collector.shape_error("a list", node));
    };

    for item in items {
        match item {
            Node::Mapping(_) => {
                let is_bind = item.get("type").and_then(Node::as_str) == Some("bind");
                if let Some(source) = item.get("source").and_then(Node::as_str).filter(|_| is_bind) {
                    collector.push(source);
                }
            }
            _ => {
                let spec = item
                    .as_str()
                    .ok_or_else(|| collector.shape_error("a list of strings or mappings", item))?;
                if let Some((source, _target)) = spec.split_once(':') {
                    if is_host_path(source) {
                        collector.push(source);
                    }
                }
            }
        }
    }
    Ok(())
}

fn extract_extends(node: &Node, collector: &mut Collector) -> Result<(), MalformedManifest> {
    match node {
        Node::Mapping(_) => {
            if let Some(file) = node.get("file") {
                let path = file
                    .as_str()
                    .ok_or_else(|| collector.shape_error("a string file", file))?;
                collector.push(path);
            }
            Ok(())
        }
        // A bare service name extends a service of the same file.
        _ if node.as_str().is_some() => Ok(()),
        _ => Err(collector.shape_error("a string or a mapping", node)),
    }
}

fn extract_include(node: &Node, collector: &mut Collector) -> Result<(), MalformedManifest> {
    let Node::Sequence(items) = node else {
        return Err(collector.shape_error("a list", node));
    };

    for item in items {
        if let Some(path) = item.as_str() {
            collector.push(path);
            continue;
        }
        if !matches!(item, Node::Mapping(_)) {
            return Err(collector.shape_error("a list of paths or mappings", item));
        }
        match item.get("path") {
            Some(Node::Sequence(paths)) => {
                for path in paths {
                    let path = path
                        .as_str()
                        .ok_or_else(|| collector.shape_error("a list of string paths", path))?;
                    collector.push(path);
                }
            }
            Some(path) => {
                let path = path
                    .as_str()
                    .ok_or_else(|| collector.shape_error("a string path", path))?;
                collector.push(path);
            }
            None => return Err(collector.shape_error("an entry with a `path`", item)),
        }
        match item.get("env_file") {
            Some(Node::Sequence(files)) => {
                for file in files {
                    let file = file
                        .as_str()
                        .ok_or_else(|| collector.shape_error("a list of string env files", file))?;
                    collector.push_as(file, ReferenceKind::EnvFile, true);
                }
            }
            Some(file) => {
                let file = file
                    .as_str()
                    .ok_or_else(|| collector.shape_error("a string env file", file))?;
                collector.push_as(file, ReferenceKind::EnvFile, true);
            }
            None => {}
        }
    }
    Ok(())
}

fn extract_file_entries(node: &Node, collector: &mut Collector) -> Result<(), MalformedManifest> {
    let entries = match node {
        Node::Mapping(entries) => entries,
        _ if node.is_null() => return Ok(()),
        _ => return Err(collector.shape_error("a mapping", node)),
    };

    for (_name, entry) in entries {
        match entry {
            Node::Mapping(_) => {
                if let Some(file) = entry.get("file") {
                    let path = file
                        .as_str()
                        .ok_or_else(|| collector.shape_error("entries with a string `file`", file))?;
                    collector.push(path);
                }
            }
            _ if entry.is_null() => {}
            _ => return Err(collector.shape_error("a mapping of definitions", entry)),
        }
    }
    Ok(())
}
