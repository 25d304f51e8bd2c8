//! Path normalization helpers shared by the resolver.

use std::path::{Component, Path, PathBuf};

/// Replaces a leading `~` component with the user's home directory.
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            previewctl_common::constants::home_dir()
                .map_or_else(|| path.to_path_buf(), |home| home.join(components.as_path()))
        }
        _ => path.to_path_buf(),
    }
}

/// Lexically removes `.` and `..` components.
///
/// `..` at the filesystem root is dropped; symlinks are not consulted.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    let _ = out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(Component::ParentDir),
            },
            other => out.push(other),
        }
    }
    out
}

/// Makes `path` absolute against the working directory and normalizes it.
///
/// # Errors
///
/// Returns an error if the working directory cannot be determined.
pub fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    std::path::absolute(expand_home(path)).map(|p| normalize(&p))
}

/// Resolves a reference written in a manifest against that manifest's directory.
#[must_use]
pub fn resolve_against(base_dir: &Path, reference: &Path) -> PathBuf {
    let expanded = expand_home(reference);
    if expanded.is_absolute() {
        normalize(&expanded)
    } else {
        normalize(&base_dir.join(expanded))
    }
}

/// Renders a chain of paths as file names joined by ` -> `.
#[must_use]
pub fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| {
            p.file_name()
                .map_or_else(|| p.display().to_string(), |n| n.to_string_lossy().into_owned())
        })
        .collect::<Vec<_>>()
        .join(" -> ")
}
