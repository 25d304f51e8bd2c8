//! Dependency bundle resolution.
//!
//! Starting from a root manifest, walks every file reference depth-first,
//! expanding included manifests, and produces the flat, deduplicated list
//! of files the preview service needs alongside the root manifest.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use previewctl_common::constants::MAX_INCLUDE_DEPTH;
use walkdir::WalkDir;

use crate::error::DependencyError;
use crate::parser::references::{ManifestReference, ReferenceKind};
use crate::parser::{self, ParsedManifest};
use crate::payload::{ComposeBundle, FileEntry};
use crate::paths;

/// Directories skipped when a bind-mounted directory is expanded.
const SKIPPED_DIRS: &[&str] = &[".git", ".hg", ".svn"];

type Result<T> = std::result::Result<T, DependencyError>;

/// A file the bundle depends on, with its content captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    /// Absolute, normalized path of the file.
    pub path: PathBuf,
    /// Raw file bytes.
    pub content: Vec<u8>,
    /// How the file was referenced when first reached.
    pub kind: ReferenceKind,
}

impl ResolvedDependency {
    /// Path the file is reported under when transmitted.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.path
    }
}

/// Traversal state for one resolution run.
#[derive(Debug, Default)]
struct ResolutionContext {
    /// Manifests currently being expanded, root first.
    in_progress: Vec<PathBuf>,
    /// Files already emitted.
    resolved: HashSet<PathBuf>,
    /// Manifests whose references have been expanded.
    expanded: HashSet<PathBuf>,
    output: Vec<ResolvedDependency>,
}

/// Resolves compose manifests into dependency bundles.
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver {
    max_depth: usize,
}

impl DependencyResolver {
    /// Creates a resolver with the default include depth limit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_depth: MAX_INCLUDE_DEPTH,
        }
    }

    /// Sets how many levels of nested includes are followed.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Resolves every file the manifest at `root` depends on.
    ///
    /// The root manifest itself is not part of the result.
    ///
    /// # Errors
    ///
    /// Returns a [`DependencyError`] if any manifest is malformed, any
    /// required file is missing or unreadable, includes form a cycle, or
    /// includes nest deeper than the configured limit.
    pub fn resolve(&self, root: &Path) -> Result<Vec<ResolvedDependency>> {
        self.resolve_with_root(root).map(|(_, _, deps)| deps)
    }

    /// Resolves the manifest at `root` and encodes it with its dependencies.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::resolve`].
    pub fn bundle(&self, root: &Path) -> Result<ComposeBundle> {
        let (root_path, root_content, deps) = self.resolve_with_root(root)?;
        Ok(ComposeBundle {
            manifest: FileEntry::encode(&root_path, &root_content),
            dependencies: deps.iter().map(FileEntry::from).collect(),
        })
    }

    fn resolve_with_root(&self, root: &Path) -> Result<(PathBuf, Vec<u8>, Vec<ResolvedDependency>)> {
        let root_path = paths::absolute(root).map_err(|e| DependencyError::UnreadableFile {
            path: root.to_path_buf(),
            source: e,
        })?;
        tracing::info!(root = %root_path.display(), "resolving compose dependencies");

        let content = read_file(&root_path)?;
        let (manifest, refs) = parse_manifest(&root_path, &content)?;

        let mut ctx = ResolutionContext::default();
        ctx.in_progress.push(root_path.clone());
        self.expand(&mut ctx, &root_path, &manifest, &refs)?;
        let _ = ctx.in_progress.pop();

        tracing::info!(
            root = %root_path.display(),
            dependencies = ctx.output.len(),
            "resolved compose dependencies"
        );
        Ok((root_path, content, ctx.output))
    }

    fn expand(
        &self,
        ctx: &mut ResolutionContext,
        manifest_path: &Path,
        manifest: &ParsedManifest,
        refs: &[ManifestReference],
    ) -> Result<()> {
        for reference in refs {
            let target = paths::resolve_against(&manifest.base_dir, &reference.path);
            tracing::debug!(
                manifest = %manifest_path.display(),
                kind = %reference.kind,
                path = %target.display(),
                "visiting reference"
            );

            let metadata = match std::fs::metadata(&target) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    if !reference.required {
                        tracing::debug!(path = %target.display(), "skipping optional missing file");
                        continue;
                    }
                    return Err(DependencyError::MissingDependency {
                        reference: reference.path.clone(),
                        resolved: target,
                        declared_in: manifest_path.to_path_buf(),
                        service: reference.service.clone(),
                    });
                }
                Err(e) => {
                    return Err(DependencyError::UnreadableFile {
                        path: target,
                        source: e,
                    });
                }
            };

            if metadata.is_dir() {
                if reference.kind == ReferenceKind::BindMount {
                    if reference.path.is_absolute() {
                        tracing::debug!(path = %target.display(), "skipping host directory mount");
                    } else {
                        self.expand_directory(ctx, &target)?;
                    }
                    continue;
                }
                return Err(DependencyError::UnreadableFile {
                    path: target,
                    source: io::Error::from(io::ErrorKind::IsADirectory),
                });
            }

            // Sockets and devices mounted from the host have no content to send.
            if reference.kind == ReferenceKind::BindMount && !metadata.is_file() {
                tracing::debug!(path = %target.display(), "skipping special file");
                continue;
            }

            self.visit(ctx, target, reference.kind)?;
        }
        Ok(())
    }

    fn visit(&self, ctx: &mut ResolutionContext, path: PathBuf, kind: ReferenceKind) -> Result<()> {
        let emitted = ctx.resolved.contains(&path);
        if emitted && (!kind.is_manifest() || ctx.expanded.contains(&path)) {
            tracing::debug!(path = %path.display(), "already resolved");
            return Ok(());
        }
        if let Some(start) = ctx.in_progress.iter().position(|p| *p == path) {
            let mut chain = ctx.in_progress[start..].to_vec();
            chain.push(path);
            return Err(DependencyError::CyclicDependency { chain });
        }
        if kind.is_manifest() && ctx.in_progress.len() > self.max_depth {
            return Err(DependencyError::IncludeDepthExceeded {
                path,
                limit: self.max_depth,
            });
        }

        ctx.in_progress.push(path.clone());
        let content = read_file(&path)?;
        if kind.is_manifest() {
            let _ = ctx.expanded.insert(path.clone());
            let (manifest, refs) = parse_manifest(&path, &content)?;
            self.expand(ctx, &path, &manifest, &refs)?;
        }
        let _ = ctx.in_progress.pop();

        // A file first reached as a plain file keeps its original entry.
        if emitted {
            return Ok(());
        }
        let _ = ctx.resolved.insert(path.clone());
        ctx.output.push(ResolvedDependency {
            path,
            content,
            kind,
        });
        Ok(())
    }

    /// Emits every regular file under a bind-mounted directory.
    ///
    /// Symlinked directories are not descended into; symlinked files are
    /// followed. Manifests already being expanded are skipped, not reported
    /// as cycles.
    fn expand_directory(&self, ctx: &mut ResolutionContext, dir: &Path) -> Result<()> {
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !SKIPPED_DIRS.iter().any(|s| e.file_name() == *s)
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.loop_ancestor().is_some() => {
                    tracing::debug!(error = %e, "skipping filesystem loop");
                    continue;
                }
                Err(e) => {
                    return Err(DependencyError::UnreadableFile {
                        path: e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf),
                        source: e.into(),
                    });
                }
            };
            if entry.path_is_symlink() {
                match std::fs::metadata(entry.path()) {
                    Ok(metadata) if metadata.is_file() => {}
                    Ok(_) => {
                        tracing::debug!(path = %entry.path().display(), "skipping linked directory");
                        continue;
                    }
                    Err(e) => {
                        tracing::debug!(path = %entry.path().display(), error = %e, "skipping dangling link");
                        continue;
                    }
                }
            } else if !entry.file_type().is_file() {
                continue;
            }
            let path = paths::normalize(entry.path());
            if ctx.in_progress.contains(&path) {
                continue;
            }
            self.visit(ctx, path, ReferenceKind::BindMount)?;
        }
        Ok(())
    }
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the dependencies of `root` with the default resolver.
///
/// # Errors
///
/// See [`DependencyResolver::resolve`].
pub fn resolve(root: &Path) -> Result<Vec<ResolvedDependency>> {
    DependencyResolver::new().resolve(root)
}

/// Builds the transport bundle for `root` with the default resolver.
///
/// # Errors
///
/// See [`DependencyResolver::resolve`].
pub fn bundle(root: &Path) -> Result<ComposeBundle> {
    DependencyResolver::new().bundle(root)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| DependencyError::UnreadableFile {
        path: path.to_path_buf(),
        source: e,
    })
}

fn parse_manifest(path: &Path, content: &[u8]) -> Result<(ParsedManifest, Vec<ManifestReference>)> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new("/"));
    parser::parse(content, base_dir).map_err(|source| DependencyError::MalformedManifest {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, content).expect("write file");
        path
    }

    fn names(deps: &[ResolvedDependency], root: &Path) -> Vec<String> {
        deps.iter()
            .map(|d| {
                d.path
                    .strip_prefix(root)
                    .expect("under root")
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    fn tempdir() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().canonicalize().expect("canonical tempdir");
        (dir, root)
    }

    #[test]
    fn resolve_build_context_and_env_file() {
        let (_guard, dir) = tempdir();
        write(&dir, "api/Dockerfile", "FROM rust\n");
        write(&dir, "shared.env", "A=1\n");
        let root = write(
            &dir,
            "compose.yml",
            "services:\n  api:\n    build: ./api\n    env_file: ./shared.env\n",
        );

        let deps = resolve(&root).expect("should resolve");
        assert_eq!(names(&deps, &dir), vec!["api/Dockerfile", "shared.env"]);
        assert_eq!(deps[0].kind, ReferenceKind::BuildContext);
        assert_eq!(deps[1].content, b"A=1\n");
        assert!(deps.iter().all(|d| d.path != root));
    }

    #[test]
    fn resolve_empty_manifest() {
        let (_guard, dir) = tempdir();
        let root = write(&dir, "compose.yml", "");
        assert!(resolve(&root).expect("should resolve").is_empty());
    }

    #[test]
    fn resolve_deduplicates_shared_file() {
        let (_guard, dir) = tempdir();
        write(&dir, "shared.env", "A=1\n");
        let root = write(
            &dir,
            "compose.yml",
            "services:\n  web:\n    env_file: ./shared.env\n  worker:\n    env_file: shared.env\n",
        );
        let deps = resolve(&root).expect("should resolve");
        assert_eq!(names(&deps, &dir), vec!["shared.env"]);
    }

    #[test]
    fn resolve_emits_included_manifest_after_its_dependencies() {
        let (_guard, dir) = tempdir();
        write(&dir, "db/db.env", "PG=1\n");
        write(&dir, "db/compose.yml", "services:\n  db:\n    env_file: ./db.env\n");
        let root = write(&dir, "compose.yml", "include:\n  - ./db/compose.yml\n");

        let deps = resolve(&root).expect("should resolve");
        assert_eq!(names(&deps, &dir), vec!["db/db.env", "db/compose.yml"]);
        assert_eq!(deps[1].kind, ReferenceKind::IncludedManifest);
    }

    #[test]
    fn resolve_rejects_include_cycle() {
        let (_guard, dir) = tempdir();
        write(&dir, "part.yml", "include:\n  - ./compose.yml\n");
        let root = write(&dir, "compose.yml", "include:\n  - ./part.yml\n");

        let err = resolve(&root).unwrap_err();
        assert!(matches!(err, DependencyError::CyclicDependency { .. }));
        assert_eq!(
            err.to_string(),
            "cyclic dependency: compose.yml -> part.yml -> compose.yml"
        );
    }

    #[test]
    fn resolve_rejects_self_include() {
        let (_guard, dir) = tempdir();
        let root = write(&dir, "compose.yml", "include:\n  - compose.yml\n");
        let err = resolve(&root).unwrap_err();
        let DependencyError::CyclicDependency { chain } = &err else {
            panic!("expected cycle, got {err}");
        };
        assert_eq!(chain, &vec![root.clone(), root]);
    }

    #[test]
    fn resolve_reports_missing_file_and_declaring_manifest() {
        let (_guard, dir) = tempdir();
        let root = write(&dir, "compose.yml", "services:\n  web:\n    env_file: ./missing.env\n");

        let err = resolve(&root).unwrap_err();
        let DependencyError::MissingDependency {
            reference,
            resolved,
            declared_in,
            service,
        } = &err
        else {
            panic!("expected missing dependency, got {err}");
        };
        assert_eq!(reference, &PathBuf::from("./missing.env"));
        assert_eq!(resolved, &dir.join("missing.env"));
        assert_eq!(declared_in, &root);
        assert_eq!(service.as_deref(), Some("web"));
        let message = err.to_string();
        assert!(message.contains("missing.env"), "got: {message}");
        assert!(message.contains("service `web`"), "got: {message}");
    }

    #[test]
    fn resolve_skips_optional_missing_env_file() {
        let (_guard, dir) = tempdir();
        let root = write(
            &dir,
            "compose.yml",
            "services:\n  web:\n    env_file:\n      - path: ./local.env\n        required: false\n",
        );
        assert!(resolve(&root).expect("should resolve").is_empty());
    }

    #[test]
    fn resolve_relative_to_declaring_manifest() {
        let (_guard, dir) = tempdir();
        write(&dir, "services/api/api.env", "X=1\n");
        write(&dir, "services/api/compose.yml", "services:\n  api:\n    env_file: ./api.env\n");
        let root = write(&dir, "compose.yml", "include:\n  - services/api/compose.yml\n");

        let deps = resolve(&root).expect("should resolve");
        assert_eq!(
            names(&deps, &dir),
            vec!["services/api/api.env", "services/api/compose.yml"]
        );
    }

    #[test]
    fn resolve_malformed_included_manifest_names_it() {
        let (_guard, dir) = tempdir();
        let part = write(&dir, "part.yml", "services: [broken\n");
        let root = write(&dir, "compose.yml", "include:\n  - part.yml\n");

        let err = resolve(&root).unwrap_err();
        let DependencyError::MalformedManifest { path, .. } = &err else {
            panic!("expected malformed manifest, got {err}");
        };
        assert_eq!(path, &part);
    }

    #[test]
    fn resolve_malformed_root() {
        let (_guard, dir) = tempdir();
        let root = write(&dir, "compose.yml", "- not\n- a mapping\n");
        assert!(matches!(
            resolve(&root),
            Err(DependencyError::MalformedManifest { .. })
        ));
    }

    #[test]
    fn resolve_missing_root_is_unreadable() {
        let (_guard, dir) = tempdir();
        assert!(matches!(
            resolve(&dir.join("absent.yml")),
            Err(DependencyError::UnreadableFile { .. })
        ));
    }

    #[test]
    fn resolve_directory_reference_for_env_file_is_unreadable() {
        let (_guard, dir) = tempdir();
        fs::create_dir_all(dir.join("conf.env")).expect("mkdir");
        let root = write(&dir, "compose.yml", "services:\n  web:\n    env_file: conf.env\n");
        assert!(matches!(
            resolve(&root),
            Err(DependencyError::UnreadableFile { .. })
        ));
    }

    #[test]
    fn resolve_expands_bind_mounted_directory() {
        let (_guard, dir) = tempdir();
        write(&dir, "conf/b.conf", "b");
        write(&dir, "conf/a.conf", "a");
        write(&dir, "conf/nested/c.conf", "c");
        let root = write(
            &dir,
            "compose.yml",
            "services:\n  web:\n    volumes:\n      - ./conf:/etc/web\n",
        );

        let deps = resolve(&root).expect("should resolve");
        assert_eq!(
            names(&deps, &dir),
            vec!["conf/a.conf", "conf/b.conf", "conf/nested/c.conf"]
        );
    }

    #[test]
    fn bind_mounting_project_dir_skips_root_and_vcs() {
        let (_guard, dir) = tempdir();
        write(&dir, ".git/HEAD", "ref: refs/heads/main\n");
        write(&dir, "app.py", "print()\n");
        let root = write(
            &dir,
            "compose.yml",
            "services:\n  web:\n    volumes:\n      - .:/code\n",
        );

        let deps = resolve(&root).expect("should resolve");
        assert_eq!(names(&deps, &dir), vec!["app.py"]);
    }

    #[test]
    fn manifest_first_mounted_is_still_expanded_when_included() {
        let (_guard, dir) = tempdir();
        write(&dir, "outside/db.env", "PG=1\n");
        write(&dir, "app/db/compose.yml", "services:\n  db:\n    env_file: ../../outside/db.env\n");
        let root = write(
            &dir,
            "app/compose.yml",
            "services:\n  web:\n    volumes:\n      - ./db:/db\ninclude:\n  - ./db/compose.yml\n",
        );

        let deps = resolve(&root).expect("should resolve");
        assert_eq!(names(&deps, &dir), vec!["app/db/compose.yml", "outside/db.env"]);
        assert_eq!(deps[0].kind, ReferenceKind::BindMount);
    }

    #[test]
    fn config_file_later_included_is_expanded() {
        let (_guard, dir) = tempdir();
        write(&dir, "part.env", "P=1\n");
        write(&dir, "part.yml", "services:\n  part:\n    env_file: ./part.env\n");
        let root = write(
            &dir,
            "compose.yml",
            "configs:\n  c:\n    file: ./part.yml\ninclude:\n  - ./part.yml\n",
        );

        let deps = resolve(&root).expect("should resolve");
        assert_eq!(names(&deps, &dir), vec!["part.yml", "part.env"]);
    }

    #[test]
    fn included_manifest_later_used_as_config_is_not_repeated() {
        let (_guard, dir) = tempdir();
        write(&dir, "part.env", "P=1\n");
        write(&dir, "part.yml", "services:\n  part:\n    env_file: ./part.env\n");
        let root = write(
            &dir,
            "compose.yml",
            "include:\n  - ./part.yml\nconfigs:\n  c:\n    file: ./part.yml\n",
        );

        let deps = resolve(&root).expect("should resolve");
        assert_eq!(names(&deps, &dir), vec!["part.env", "part.yml"]);
        assert_eq!(deps[1].kind, ReferenceKind::IncludedManifest);
    }

    #[test]
    fn mounted_manifest_including_root_is_a_cycle() {
        let (_guard, dir) = tempdir();
        write(&dir, "conf/part.yml", "include:\n  - ../compose.yml\n");
        let root = write(
            &dir,
            "compose.yml",
            "services:\n  web:\n    volumes:\n      - ./conf:/conf\ninclude:\n  - ./conf/part.yml\n",
        );

        let err = resolve(&root).unwrap_err();
        assert!(matches!(err, DependencyError::CyclicDependency { .. }), "got: {err}");
    }

    #[test]
    fn resolve_follows_merged_env_file() {
        let (_guard, dir) = tempdir();
        write(&dir, "common.env", "C=1\n");
        let root = write(
            &dir,
            "compose.yml",
            "x-common: &common\n  env_file: ./common.env\nservices:\n  web:\n    <<: *common\n    image: nginx\n",
        );

        let deps = resolve(&root).expect("should resolve");
        assert_eq!(names(&deps, &dir), vec!["common.env"]);
    }

    #[cfg(unix)]
    #[test]
    fn mounted_directory_with_ancestor_link_resolves() {
        let (_guard, dir) = tempdir();
        write(&dir, "src/main.rs", "fn main() {}\n");
        std::os::unix::fs::symlink(dir.join("src"), dir.join("src/self")).expect("symlink");
        let root = write(
            &dir,
            "compose.yml",
            "services:\n  web:\n    volumes:\n      - ./src:/code\n",
        );

        let deps = resolve(&root).expect("should resolve");
        assert_eq!(names(&deps, &dir), vec!["src/main.rs"]);
    }

    #[cfg(unix)]
    #[test]
    fn mounted_directory_follows_linked_files() {
        let (_guard, dir) = tempdir();
        write(&dir, "shared/settings.toml", "a = 1\n");
        write(&dir, "conf/local.toml", "b = 2\n");
        std::os::unix::fs::symlink(dir.join("shared/settings.toml"), dir.join("conf/settings.toml"))
            .expect("symlink");
        let root = write(
            &dir,
            "compose.yml",
            "services:\n  web:\n    volumes:\n      - ./conf:/etc/app\n",
        );

        let deps = resolve(&root).expect("should resolve");
        assert_eq!(names(&deps, &dir), vec!["conf/local.toml", "conf/settings.toml"]);
    }

    #[test]
    fn absolute_host_directory_mount_is_skipped() {
        let (_guard, dir) = tempdir();
        write(&dir, "host/data.bin", "x");
        let root = write(
            &dir,
            "compose.yml",
            &format!(
                "services:\n  web:\n    volumes:\n      - {}:/data\n",
                dir.join("host").display()
            ),
        );
        assert!(resolve(&root).expect("should resolve").is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn bind_mounted_socket_is_skipped() {
        let (_guard, dir) = tempdir();
        let socket = dir.join("agent.sock");
        let _listener = std::os::unix::net::UnixListener::bind(&socket).expect("bind socket");
        let root = write(
            &dir,
            "compose.yml",
            "services:\n  web:\n    volumes:\n      - ./agent.sock:/run/agent.sock\n",
        );
        assert!(resolve(&root).expect("should resolve").is_empty());
    }

    #[test]
    fn include_depth_is_bounded() {
        let (_guard, dir) = tempdir();
        write(&dir, "b.yml", "services: {}\n");
        write(&dir, "a.yml", "include:\n  - b.yml\n");
        let root = write(&dir, "compose.yml", "include:\n  - a.yml\n");

        let shallow = DependencyResolver::new().with_max_depth(1);
        assert!(matches!(
            shallow.resolve(&root),
            Err(DependencyError::IncludeDepthExceeded { limit: 1, .. })
        ));

        let deep = DependencyResolver::new().with_max_depth(2);
        let deps = deep.resolve(&root).expect("should resolve");
        assert_eq!(names(&deps, &dir), vec!["b.yml", "a.yml"]);
    }

    #[test]
    fn bundle_carries_root_and_dependencies() {
        let (_guard, dir) = tempdir();
        write(&dir, ".env", "A=1");
        let root = write(&dir, "compose.yml", "services:\n  web:\n    env_file: .env\n");

        let bundle = bundle(&root).expect("should bundle");
        assert_eq!(bundle.manifest.path, root.to_string_lossy());
        assert_eq!(
            bundle.manifest.decode().expect("decode"),
            b"services:\n  web:\n    env_file: .env\n"
        );
        assert_eq!(bundle.dependencies.len(), 1);
        assert_eq!(bundle.dependencies[0].decode().expect("decode"), b"A=1");
    }
}
