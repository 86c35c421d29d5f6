use ignore::WalkBuilder;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::filters::is_candidate_file;

/// Produces the candidate files of a run, lazily and in deterministic order.
///
/// Owns the filtering criteria and hands out fresh lazy walks over the
/// tree. Entries within each directory are visited in name order, so two
/// runs over the same tree enumerate identically; that determinism is what
/// makes position-based resume meaningful. File contents are never read
/// here.
#[derive(Debug, Clone)]
pub struct PathFilter {
    pub root: PathBuf,
    /// Extension entries (wildcards allowed). `None` admits every file.
    pub extensions: Option<Vec<String>>,
    pub include_extensionless: bool,
    pub exclude_patterns: Vec<String>,
}

impl PathFilter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: None,
            include_extensionless: false,
            exclude_patterns: Vec::new(),
        }
    }

    /// Starts a fresh walk. Each call enumerates from the beginning, which is
    /// what lets percentage bounds do a counting pass before the real one.
    pub fn files(&self) -> FileWalk {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .ignore(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b));

        FileWalk {
            inner: builder.build(),
            extensions: self.extensions.clone(),
            include_extensionless: self.include_extensionless,
            exclude_patterns: self.exclude_patterns.clone(),
        }
    }

    /// Collects the full candidate list; only needed when a percentage bound
    /// must be resolved against file indexes.
    pub fn collect_files(&self) -> Vec<PathBuf> {
        let files: Vec<PathBuf> = self.files().collect();
        debug!("collected {} candidate files under {}", files.len(), self.root.display());
        files
    }
}

/// Lazy iterator over candidate files. Unreadable directory entries are
/// logged and skipped; they never end the walk.
pub struct FileWalk {
    inner: ignore::Walk,
    extensions: Option<Vec<String>>,
    include_extensionless: bool,
    exclude_patterns: Vec<String>,
}

impl Iterator for FileWalk {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.into_path();
            if is_candidate_file(
                &path,
                &self.extensions,
                self.include_extensionless,
                &self.exclude_patterns,
            ) {
                return Some(path);
            }
        }
    }
}
