use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{MendError, MendResult};
use crate::patch::Patch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// One file's content, loaded as terminator-stripped lines plus the
/// detected line ending and whether the file ended with a newline, so that
/// an accepted edit writes untouched lines back byte-identically.
///
/// Saving rewrites the whole file via a sibling temp path and an atomic
/// rename, so a patch is either fully applied on disk or not at all.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    lines: Vec<String>,
    ending: LineEnding,
    trailing_newline: bool,
}

impl SourceFile {
    /// Reads and decodes the file. Files must be UTF-8; anything else is a
    /// per-file encoding error the enumerator reports and skips.
    pub fn load(path: impl Into<PathBuf>) -> MendResult<Self> {
        let path = path.into();
        let bytes = fs::read(&path).map_err(|e| MendError::for_file(&path, e))?;
        let content =
            String::from_utf8(bytes).map_err(|e| MendError::encoding_error(&path, e))?;

        // The first terminator in the file decides; a file with mixed
        // endings is normalized to it on save.
        let ending = match content.find('\n') {
            Some(i) if i > 0 && content.as_bytes()[i - 1] == b'\r' => LineEnding::CrLf,
            _ => LineEnding::Lf,
        };
        let trailing_newline = content.ends_with('\n');
        let lines = content.lines().map(str::to_string).collect();

        Ok(Self {
            path,
            lines,
            ending,
            trailing_newline,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// 1-based line lookup.
    pub fn line(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }

    pub fn ending(&self) -> LineEnding {
        self.ending
    }

    /// Replaces lines `[start, end)` (1-based, half-open) with `new`.
    /// `start == end` inserts before `start`; `start == line_count + 1`
    /// appends.
    pub fn splice(&mut self, start: usize, end: usize, new: &[String]) -> MendResult<()> {
        if start < 1 || start > end || end > self.lines.len() + 1 {
            return Err(MendError::config_error(format!(
                "splice range {}..{} does not fit a {}-line file",
                start,
                end,
                self.lines.len()
            )));
        }
        self.lines.splice(start - 1..end - 1, new.iter().cloned());
        Ok(())
    }

    /// Applies a patch's replacement to the in-memory lines.
    pub fn apply(&mut self, patch: &Patch) -> MendResult<()> {
        let new_lines = patch.new_lines.as_ref().ok_or_else(|| {
            MendError::config_error("cannot apply a patch with no suggested lines")
        })?;
        patch.check_in_bounds(self.lines.len())?;
        self.splice(patch.start_line, patch.end_line, new_lines)
    }

    /// The content as it will be written: detected ending between lines,
    /// trailing newline preserved.
    pub fn rendered(&self) -> String {
        let mut out = self.lines.join(self.ending.as_str());
        if self.trailing_newline && !self.lines.is_empty() {
            out.push_str(self.ending.as_str());
        }
        out
    }

    /// Writes the whole file atomically: temp sibling, then rename.
    pub fn save(&self) -> MendResult<()> {
        let mut tmp_name = OsString::from(self.path.as_os_str());
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, self.rendered()).map_err(|e| MendError::for_file(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| MendError::for_file(&self.path, e))?;
        Ok(())
    }
}
