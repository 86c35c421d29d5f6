use std::fmt;
use std::path::PathBuf;

use crate::errors::{MendError, MendResult};
use crate::position::Position;

/// A proposed change: replace lines `[start_line, end_line)` of `path` with
/// `new_lines`.
///
/// Line numbers are 1-based; the range is half-open, so `start_line ==
/// end_line` is a pure insertion before `start_line`. `new_lines` is `None`
/// when the matcher had no substitution to offer; the site is flagged for
/// manual editing instead of proposing text.
///
/// Matchers create patches without a path; the enumerator fills in `path` and
/// `pattern_index` when it adopts them into a file's pending set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub path: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
    pub new_lines: Option<Vec<String>>,
    pub pattern_index: usize,
}

impl Patch {
    pub fn new(start_line: usize, end_line: usize, new_lines: Option<Vec<String>>) -> Self {
        debug_assert!(start_line >= 1, "line numbers are 1-based");
        debug_assert!(start_line <= end_line, "patch range is half-open");
        Self {
            path: PathBuf::new(),
            start_line,
            end_line,
            new_lines,
            pattern_index: 0,
        }
    }

    /// Number of lines the patch removes.
    pub fn old_line_count(&self) -> usize {
        self.end_line - self.start_line
    }

    /// Number of lines the patch inserts.
    pub fn new_line_count(&self) -> usize {
        self.new_lines.as_ref().map_or(0, |l| l.len())
    }

    /// Line-count change this patch introduces when applied.
    pub fn line_delta(&self) -> isize {
        self.new_line_count() as isize - self.old_line_count() as isize
    }

    pub fn is_insertion(&self) -> bool {
        self.start_line == self.end_line
    }

    pub fn has_suggestion(&self) -> bool {
        self.new_lines.is_some()
    }

    /// The position a resume bound should record for this patch.
    pub fn start_position(&self) -> Position {
        Position::new(self.path.clone(), self.start_line)
    }

    /// Moves the whole range by `delta` lines. Callers only shift patches
    /// sitting at or after an applied edit, so the result stays >= 1.
    pub fn shift(&mut self, delta: isize) {
        self.start_line = (self.start_line as isize + delta) as usize;
        self.end_line = (self.end_line as isize + delta) as usize;
        debug_assert!(self.start_line >= 1 && self.start_line <= self.end_line);
    }

    /// True when this patch's range intersects `[start, end)`. Empty ranges
    /// on either side never overlap anything.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start_line.max(start) < self.end_line.min(end)
    }

    /// Checks the range against a file of `line_count` lines.
    pub fn check_in_bounds(&self, line_count: usize) -> MendResult<()> {
        if self.start_line >= 1 && self.start_line <= self.end_line && self.end_line <= line_count + 1
        {
            Ok(())
        } else {
            Err(MendError::config_error(format!(
                "patch range {}..{} does not fit a {}-line file",
                self.start_line, self.end_line, line_count
            )))
        }
    }

    /// Human-readable range: `path:3` for one line, `path:3-5` for several.
    pub fn render_range(&self) -> String {
        if self.end_line <= self.start_line + 1 {
            format!("{}:{}", self.path.display(), self.start_line)
        } else {
            format!(
                "{}:{}-{}",
                self.path.display(),
                self.start_line,
                self.end_line - 1
            )
        }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render_range())
    }
}
