//! Decoded manifest tree.
//!
//! YAML documents are converted into this closed set of node variants so
//! that reference extraction can match on shape explicitly.

use super::MalformedManifest;

/// A node of a decoded manifest.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Ordered key/value pairs, in source order.
    Mapping(Vec<(String, Node)>),
    /// Ordered list of nodes.
    Sequence(Vec<Node>),
    /// A leaf value.
    Scalar(Scalar),
}

/// A leaf value of a manifest.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Explicit or implicit `null`.
    Null,
    /// `true` or `false`.
    Bool(bool),
    /// Any numeric literal, kept in its canonical text form.
    Number(String),
    /// A string literal.
    String(String),
}

impl Node {
    /// Returns an empty mapping.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Mapping(Vec::new())
    }

    /// Looks up `key` if this node is a mapping.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Returns the string value of a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the value of a boolean scalar.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Whether this node is a `null` scalar.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Null))
    }

    /// Short description of the node's shape, for error messages.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Mapping(_) => "a mapping",
            Self::Sequence(_) => "a list",
            Self::Scalar(Scalar::Null) => "null",
            Self::Scalar(Scalar::Bool(_)) => "a boolean",
            Self::Scalar(Scalar::Number(_)) => "a number",
            Self::Scalar(Scalar::String(_)) => "a string",
        }
    }
}

impl TryFrom<serde_yaml::Value> for Node {
    type Error = MalformedManifest;

    fn try_from(value: serde_yaml::Value) -> Result<Self, Self::Error> {
        use serde_yaml::Value;

        Ok(match value {
            Value::Null => Self::Scalar(Scalar::Null),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Self::Scalar(Scalar::Number(n.to_string())),
            Value::String(s) => Self::Scalar(Scalar::String(s)),
            Value::Sequence(items) => Self::Sequence(
                items
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Mapping(mapping) => {
                let mut entries = Vec::with_capacity(mapping.len());
                for (key, value) in mapping {
                    entries.push((mapping_key(key)?, Self::try_from(value)?));
                }
                Self::Mapping(entries)
            }
            Value::Tagged(tagged) => Self::try_from(tagged.value)?,
        })
    }
}

fn mapping_key(key: serde_yaml::Value) -> Result<String, MalformedManifest> {
    use serde_yaml::Value;

    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(MalformedManifest::new(format!(
            "unsupported mapping key: {other:?}"
        ))),
    }
}
