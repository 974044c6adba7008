//! Gitignore-aware file walking for indexing.
//!
//! Walks a project root, skipping ignored paths (see `codeindex-ignore`),
//! binary files, symlinks and anything over the configured size limit, and
//! yields one [`FileEntry`] per remaining regular file. The walker never
//! reads file content itself beyond the small prefix used for the binary
//! heuristic; chunking and hashing happen downstream.

use codeindex_chunker::Language;
use codeindex_ignore::IgnoreResolver;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalkerError {
    #[error("walk root {0:?} does not exist or is not a directory")]
    InvalidRoot(PathBuf),
    #[error("ignore pattern error: {0}")]
    Ignore(#[from] codeindex_ignore::IgnoreError),
    #[error("walk error: {0}")]
    Walk(#[from] ignore::Error),
    #[error("io error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, WalkerError>;

/// A single file discovered by the walker.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub absolute_path: PathBuf,
    /// Forward-slash-normalized path relative to the walked root.
    pub relative_path: String,
    pub size_bytes: u64,
    pub mtime_unix_ms: u64,
    pub language: Language,
}

#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Files larger than this are skipped entirely.
    pub max_file_size_bytes: u64,
    /// Additional glob patterns to ignore, on top of the default list.
    pub extra_ignore_globs: Vec<String>,
    /// Number of leading bytes inspected for the binary heuristic.
    pub binary_probe_bytes: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 10 * 1024 * 1024,
            extra_ignore_globs: Vec::new(),
            binary_probe_bytes: 8192,
        }
    }
}

pub struct FileWalker {
    root: PathBuf,
    config: WalkerConfig,
    resolver: IgnoreResolver,
}

impl FileWalker {
    pub fn new(root: impl Into<PathBuf>, config: WalkerConfig) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(WalkerError::InvalidRoot(root));
        }
        let resolver = IgnoreResolver::new(&root, &config.extra_ignore_globs)?;
        Ok(Self { root, config, resolver })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks the root synchronously, returning every eligible file entry.
    /// Symlinks are never followed: a symlinked file or directory is
    /// skipped rather than traversed, to avoid escaping the project root
    /// and to keep content-hash based change detection well defined.
    pub fn walk(&self) -> Result<Vec<FileEntry>> {
        let mut builder = ignore::WalkBuilder::new(&self.root);
        builder.follow_links(false).standard_filters(false);
        self.resolver.configure_walk_builder(&self.root, &mut builder);

        let mut entries = Vec::new();
        for result in builder.build() {
            let entry = result?;
            let Some(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_file() {
                continue;
            }

            let absolute_path = entry.path().to_path_buf();
            let relative = match absolute_path.strip_prefix(&self.root) {
                Ok(r) => r,
                Err(_) => continue,
            };
            let relative_path = normalize_relative(relative);

            if self.resolver.is_extra_ignored(Path::new(&relative_path)) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(_) => continue,
            };

            if metadata.len() > self.config.max_file_size_bytes {
                log::debug!(
                    "skipping {} ({} bytes over limit of {})",
                    relative_path,
                    metadata.len(),
                    self.config.max_file_size_bytes
                );
                continue;
            }

            if self.looks_binary(&absolute_path)? {
                log::debug!("skipping binary file {relative_path}");
                continue;
            }

            let mtime_unix_ms = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);

            let language = Language::from_path(&relative_path);

            entries.push(FileEntry {
                absolute_path,
                relative_path,
                size_bytes: metadata.len(),
                mtime_unix_ms,
                language,
            });
        }

        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(entries)
    }

    /// A file is treated as binary if a NUL byte appears within the first
    /// `binary_probe_bytes` bytes, matching the common heuristic used by
    /// `git` and most text-oriented tooling.
    fn looks_binary(&self, path: &Path) -> Result<bool> {
        use std::io::Read;
        let mut file = std::fs::File::open(path).map_err(|source| WalkerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut buf = vec![0u8; self.config.binary_probe_bytes];
        let read = file.read(&mut buf).map_err(|source| WalkerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(buf[..read].contains(&0))
    }
}

fn normalize_relative(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn walks_and_classifies_language() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/main.rs", b"fn main() {}");
        write(dir.path(), "README.md", b"# hi");

        let walker = FileWalker::new(dir.path(), WalkerConfig::default()).unwrap();
        let entries = walker.walk().unwrap();

        let rs = entries.iter().find(|e| e.relative_path == "src/main.rs").unwrap();
        assert_eq!(rs.language, Language::Rust);
        assert!(entries.iter().any(|e| e.relative_path == "README.md"));
    }

    #[test]
    fn skips_binary_and_oversized_and_ignored_files() {
        let dir = tempdir().unwrap();
        write(dir.path(), "kept.rs", b"fn kept() {}");
        write(dir.path(), "binary.bin", &[0u8, 1, 2, 0, 3]);
        write(dir.path(), "target/debug/app", b"ignored via default list");
        write(dir.path(), "huge.rs", &vec![b'a'; 1024]);

        let config = WalkerConfig {
            max_file_size_bytes: 100,
            ..WalkerConfig::default()
        };
        let walker = FileWalker::new(dir.path(), config).unwrap();
        let entries = walker.walk().unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.relative_path.as_str()).collect();

        assert!(names.contains(&"kept.rs"));
        assert!(!names.contains(&"binary.bin"));
        assert!(!names.iter().any(|n| n.starts_with("target/")));
        assert!(!names.contains(&"huge.rs"));
    }

    #[test]
    fn rejects_nonexistent_root() {
        let err = FileWalker::new("/no/such/path/at/all", WalkerConfig::default()).unwrap_err();
        assert!(matches!(err, WalkerError::InvalidRoot(_)));
    }
}
