//! Layered ignore-pattern resolution for the file walker and the
//! filesystem watcher.
//!
//! Four layers apply, in order: a built-in default list (vcs metadata,
//! build output, dependency caches), the project's own `.gitignore` family
//! (root and per-directory), a per-directory `.indexignore` file for
//! indexing-specific excludes, and finally caller-supplied globs passed in
//! at index time. The same [`IgnoreResolver`] backs both the one-shot
//! directory walk and the live watcher's per-event filtering, so a path
//! excluded by `.gitignore` is never re-indexed on every edit just because
//! it was already absent from the initial walk.
//!
//! Negation (`!pattern`) lines in `.gitignore`/`.indexignore` are dropped
//! rather than honored: without negation, a deeper directory's ignore file
//! can only ever add exclusions, never resurrect a path an ancestor
//! already excluded, which is what lets a single flat [`Gitignore`] built
//! once up front (rather than the `ignore` crate's own directory-by-
//! directory descent) stay correct.

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IgnoreError {
    #[error("invalid ignore glob {pattern:?}: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

pub type Result<T> = std::result::Result<T, IgnoreError>;

/// Always excluded, independent of any `.gitignore` content.
pub const DEFAULT_IGNORE_GLOBS: &[&str] = &[
    "**/.git/**",
    "**/.hg/**",
    "**/.svn/**",
    "**/.codeindex/**",
    "**/target/**",
    "**/node_modules/**",
    "**/dist/**",
    "**/build/**",
    "**/out/**",
    "**/.venv/**",
    "**/__pycache__/**",
    "**/*.pyc",
];

const INDEXIGNORE_FILENAME: &str = ".indexignore";
const GITIGNORE_FILENAME: &str = ".gitignore";

/// Resolves whether a path should be skipped during indexing: the default
/// list, caller-supplied globs, and a single combined `.gitignore`/
/// `.indexignore` matcher collected from every directory under the
/// project root at construction time.
#[derive(Clone)]
pub struct IgnoreResolver {
    extra: GlobSet,
    gitignore: Gitignore,
}

impl IgnoreResolver {
    pub fn new(root: &Path, caller_globs: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in DEFAULT_IGNORE_GLOBS {
            builder.add(compile(pattern)?);
        }
        for pattern in caller_globs {
            builder.add(compile(pattern)?);
        }
        let extra = builder.build().map_err(|source| IgnoreError::InvalidGlob {
            pattern: "<set>".to_string(),
            source,
        })?;

        let gitignore = build_gitignore_matcher(root);

        Ok(Self { extra, gitignore })
    }

    /// True if `relative_path` matches the default list or a caller glob.
    /// Does not account for `.gitignore`/`.indexignore` — use
    /// [`IgnoreResolver::is_ignored`] for the full C2 layering.
    #[must_use]
    pub fn is_extra_ignored(&self, relative_path: &Path) -> bool {
        self.extra.is_match(relative_path)
    }

    /// True if `relative_path` (relative to the root this resolver was
    /// built for) is excluded by any layer: the default list, a caller
    /// glob, or a `.gitignore`/`.indexignore` rule from the root down to
    /// the path's own directory. `is_dir` affects directory-only
    /// (trailing-slash) gitignore patterns.
    #[must_use]
    pub fn is_ignored(&self, relative_path: &Path, is_dir: bool) -> bool {
        if self.is_extra_ignored(relative_path) {
            return true;
        }
        self.gitignore.matched(relative_path, is_dir).is_ignore()
    }

    /// Configures an `ignore::WalkBuilder` to prune directories this
    /// resolver already excludes, using our own negation-free matcher
    /// rather than the crate's native (negation-aware) `.gitignore`
    /// support. `root` must match the root this resolver was built for.
    pub fn configure_walk_builder(&self, root: &Path, builder: &mut ignore::WalkBuilder) {
        let resolver = self.clone();
        let root = root.to_path_buf();
        builder.hidden(false).standard_filters(false).filter_entry(move |entry| {
            let Ok(relative) = entry.path().strip_prefix(&root) else {
                return true;
            };
            if relative.as_os_str().is_empty() {
                return true;
            }
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !resolver.is_ignored(relative, is_dir)
        });
    }
}

/// Walks `root` collecting every `.gitignore`/`.indexignore` file and
/// compiling their patterns into one matcher, anchored per-directory via
/// `add_line`'s `from` so a subdirectory's own file only governs paths
/// under it. Lines starting with `!` are skipped: negation is not
/// supported.
fn build_gitignore_matcher(root: &Path) -> Gitignore {
    let mut builder = GitignoreBuilder::new(root);
    let mut dirs = vec![root.to_path_buf()];
    while let Some(dir) = dirs.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else { continue };
            if file_type.is_dir() {
                dirs.push(path);
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            if name != GITIGNORE_FILENAME && name != INDEXIGNORE_FILENAME {
                continue;
            }
            let Ok(contents) = std::fs::read_to_string(&path) else { continue };
            for line in contents.lines() {
                if line.trim_start().starts_with('!') {
                    continue;
                }
                let _ = builder.add_line(Some(dir.clone()), line);
            }
        }
    }
    builder.build().unwrap_or_else(|_| GitignoreBuilder::new(root).build().expect("empty gitignore builder always builds"))
}

fn compile(pattern: &str) -> Result<Glob> {
    Glob::new(pattern).map_err(|source| IgnoreError::InvalidGlob {
        pattern: pattern.to_string(),
        source,
    })
}
