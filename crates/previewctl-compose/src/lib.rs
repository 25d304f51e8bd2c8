//! # previewctl-compose
//!
//! Compose manifest handling for the preview CLI.
//!
//! Handles:
//! - **Parser**: Decoding of compose YAML and discovery of file references.
//! - **Resolver**: Depth-first expansion of references into a deduplicated
//!   dependency list, with cycle and depth checks.
//! - **Payload**: Base64 transport encoding of the resolved bundle.
//! - **Paths**: Lexical path normalization shared by the above.

pub mod error;
pub mod parser;
pub mod paths;
pub mod payload;
pub mod resolver;

pub use error::DependencyError;
pub use resolver::{DependencyResolver, ResolvedDependency, bundle, resolve};
