use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::matcher::Matcher;
use crate::patch::Patch;
use crate::position::{LineMark, Position};
use crate::source::SourceFile;

struct FileState {
    path: PathBuf,
    pending: VecDeque<Patch>,
}

/// Lazy, resumable cursor over every patch the matcher proposes for a tree.
///
/// Walks candidate files in order, runs the matcher over each one, and
/// serves the resulting patches one at a time: [`peek`](Self::peek) shows
/// the next patch, [`advance`](Self::advance) consumes it,
/// [`skip_file`](Self::skip_file) drops the rest of the current file, and
/// [`note_applied`](Self::note_applied) keeps the still-pending line numbers
/// consistent with an edit just written to disk. All resume state is plain
/// inspectable data: the current [`Position`] can be saved and fed back in
/// as a start bound later.
///
/// Files that cannot be read or decoded are logged and skipped, and
/// enumeration continues with the next file.
pub struct MatchEnumerator {
    files: Box<dyn Iterator<Item = PathBuf>>,
    matcher: Matcher,
    /// Start bound, consumed when its file is reached. While set, every
    /// other file is skipped; a start path absent from the walk therefore
    /// yields an empty run.
    start: Option<Position>,
    end: Option<Position>,
    finished: bool,
    current: Option<FileState>,
}

impl MatchEnumerator {
    pub fn new(
        files: impl Iterator<Item = PathBuf> + 'static,
        matcher: Matcher,
        start: Option<Position>,
        end: Option<Position>,
    ) -> Self {
        Self {
            files: Box::new(files),
            matcher,
            start,
            end,
            finished: false,
            current: None,
        }
    }

    /// The next undecided patch, loading files as needed. Returns `None`
    /// once the walk (or the end bound) is exhausted.
    pub fn peek(&mut self) -> Option<&Patch> {
        while !self
            .current
            .as_ref()
            .is_some_and(|state| !state.pending.is_empty())
        {
            self.current = None;
            if self.finished {
                return None;
            }
            let path = self.files.next()?;
            self.current = self.load_file(path);
        }
        self.current.as_ref().and_then(|state| state.pending.front())
    }

    /// Consumes the patch `peek` returned.
    pub fn advance(&mut self) -> Option<Patch> {
        self.current
            .as_mut()
            .and_then(|state| state.pending.pop_front())
    }

    /// Drops every remaining patch of the current file.
    pub fn skip_file(&mut self) {
        self.current = None;
    }

    /// Position of the next patch, if one is loaded.
    pub fn position(&self) -> Option<Position> {
        self.current
            .as_ref()
            .and_then(|state| state.pending.front())
            .map(Patch::start_position)
    }

    /// Reconciles the pending set with an accepted patch that has just been
    /// written to disk. The applied patch must already have been taken out
    /// via [`advance`](Self::advance).
    ///
    /// Pattern matchers shift every pending patch starting at or after the
    /// applied range by the applied line delta, and discard pending patches
    /// whose range overlapped it (their text no longer exists). A custom
    /// matcher is re-run over the rewritten file instead, keeping only
    /// patches at or after the applied edit's post-edit end so decided
    /// sites are not presented twice.
    pub fn note_applied(&mut self, applied: &Patch) {
        let Some(mut state) = self.current.take() else {
            return;
        };
        if state.path != applied.path {
            self.current = Some(state);
            return;
        }

        if self.matcher.rescans_after_apply() {
            match SourceFile::load(&state.path) {
                Ok(file) => {
                    let floor = applied.start_line + applied.new_line_count();
                    let mut pending =
                        adopt_custom(self.matcher.find_patches(file.lines()), &file);
                    pending.retain(|p| p.start_line >= floor);
                    state.pending = pending;
                    self.current = Some(state);
                }
                Err(e) => {
                    // Leaves `current` empty so the cursor moves on.
                    warn!(
                        "skipping the rest of {} after edit: {}",
                        state.path.display(),
                        e
                    );
                }
            }
        } else {
            let delta = applied.line_delta();
            let mut kept = VecDeque::with_capacity(state.pending.len());
            for mut patch in state.pending {
                if patch.overlaps(applied.start_line, applied.end_line) {
                    warn!("dropping stale match at {}", patch.render_range());
                    continue;
                }
                if patch.start_line >= applied.end_line {
                    patch.shift(delta);
                }
                kept.push_back(patch);
            }
            state.pending = kept;
            self.current = Some(state);
        }
    }

    fn load_file(&mut self, path: PathBuf) -> Option<FileState> {
        // A pending start bound skips every file until its own.
        if let Some(start) = &self.start {
            if start.path != path {
                return None;
            }
        }
        let start = self.start.take();
        let is_end_file = self.end.as_ref().is_some_and(|end| end.path == path);

        let file = match SourceFile::load(&path) {
            Ok(file) => file,
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
                return None;
            }
        };

        let found = self.matcher.find_patches(file.lines());
        let mut pending = if self.matcher.is_custom() {
            adopt_custom(found, &file)
        } else {
            adopt_patterns(found, file.path())
        };

        if let Some(start) = start {
            match start.line {
                LineMark::Line(n) => pending.retain(|p| p.start_line >= n),
                LineMark::End => pending.clear(),
            }
        }
        if is_end_file {
            if let Some(LineMark::Line(n)) = self.end.as_ref().map(|end| end.line) {
                pending.retain(|p| p.end_line < n);
            }
            self.finished = true;
        }

        if pending.is_empty() {
            return None;
        }
        Some(FileState { path, pending })
    }
}

fn adopt_patterns(patches: Vec<Patch>, path: &Path) -> VecDeque<Patch> {
    patches
        .into_iter()
        .map(|mut p| {
            p.path = path.to_path_buf();
            p
        })
        .collect()
}

/// Custom matchers are not trusted: out-of-range patches are dropped with a
/// warning, replacements identical to the text they replace are suppressed,
/// and the rest are ordered and tagged for the single custom counter.
fn adopt_custom(patches: Vec<Patch>, file: &SourceFile) -> VecDeque<Patch> {
    let mut adopted: Vec<Patch> = patches
        .into_iter()
        .filter(|p| match p.check_in_bounds(file.line_count()) {
            Ok(()) => true,
            Err(e) => {
                warn!("dropping patch from custom matcher: {}", e);
                false
            }
        })
        .filter(|p| match &p.new_lines {
            Some(new) => new[..] != file.lines()[p.start_line - 1..p.end_line - 1],
            None => true,
        })
        .map(|mut p| {
            p.path = file.path().to_path_buf();
            p.pattern_index = 0;
            p
        })
        .collect();
    adopted.sort_by_key(|p| (p.start_line, p.end_line));
    adopted.into()
}
