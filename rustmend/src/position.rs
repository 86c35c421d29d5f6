use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::{MendError, MendResult};

/// A line coordinate: a concrete 1-based line, or the marker sorting after
/// every line of its file. The marker only ever appears in bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LineMark {
    Line(usize),
    End,
}

impl fmt::Display for LineMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineMark::Line(n) => write!(f, "{}", n),
            LineMark::End => write!(f, "end"),
        }
    }
}

/// A point in the enumeration space: file path plus line coordinate.
///
/// Total order: paths compare first, lines within equal paths; `LineMark::End`
/// sorts after every concrete line. Positions order the same way enumeration
/// proceeds, which is what makes "stop here and pick up later" work: the
/// boundary captures the last presented position as a `path:line` string and
/// re-supplies it as the next run's start bound. A concrete line is valid at
/// creation time but not guaranteed to survive later edits to the file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub path: PathBuf,
    pub line: LineMark,
}

impl Position {
    /// Position at a concrete 1-based line of `path`.
    pub fn new(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line: LineMark::Line(line),
        }
    }

    /// Position after every line of `path`; used only as a bound.
    pub fn past_end_of(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            line: LineMark::End,
        }
    }

    /// The concrete line number, if this is not the end marker.
    pub fn line_number(&self) -> Option<usize> {
        match self.line {
            LineMark::Line(n) => Some(n),
            LineMark::End => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

impl FromStr for Position {
    type Err = MendError;

    /// Parses a `path:line` string. The split is on the last colon so paths
    /// containing colons still parse; lines are 1-based.
    fn from_str(s: &str) -> MendResult<Self> {
        let (path, line) = s
            .rsplit_once(':')
            .ok_or_else(|| MendError::invalid_position(s))?;
        if path.is_empty() {
            return Err(MendError::invalid_position(s));
        }
        let line: usize = line
            .parse()
            .map_err(|_| MendError::invalid_position(s))?;
        if line == 0 {
            return Err(MendError::invalid_position(s));
        }
        Ok(Position::new(path, line))
    }
}

/// A start or end limit for a run: a concrete position, or a percentage of
/// the candidate file list resolved once the list is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Bound {
    At(Position),
    Percent(u32),
}

impl Bound {
    /// Resolves this bound against the candidate files in enumeration order.
    ///
    /// A percentage `p` picks the file at index `floor(p/100 * N)`, line 1.
    /// Index `N` (only `p == 100`) resolves to the last file's end marker,
    /// which the enumerator's comparisons turn into "skip everything" as a
    /// start and "keep everything" as an end. An empty tree has no bound.
    pub fn resolve(&self, files: &[PathBuf]) -> Option<Position> {
        match self {
            Bound::At(pos) => Some(pos.clone()),
            Bound::Percent(p) => {
                if files.is_empty() {
                    return None;
                }
                let index = (*p as usize * files.len()) / 100;
                if index >= files.len() {
                    files.last().map(|f| Position::past_end_of(f.clone()))
                } else {
                    Some(Position::new(files[index].clone(), 1))
                }
            }
        }
    }

    /// True when resolving this bound requires the candidate file list.
    pub fn needs_file_list(&self) -> bool {
        matches!(self, Bound::Percent(_))
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::At(pos) => pos.fmt(f),
            Bound::Percent(p) => write!(f, "{}%", p),
        }
    }
}

impl FromStr for Bound {
    type Err = MendError;

    fn from_str(s: &str) -> MendResult<Self> {
        if let Some(percent) = s.strip_suffix('%') {
            let p: u32 = percent
                .trim()
                .parse()
                .map_err(|_| MendError::invalid_position(s))?;
            if p > 100 {
                return Err(MendError::invalid_position(s));
            }
            return Ok(Bound::Percent(p));
        }
        Ok(Bound::At(s.parse()?))
    }
}

impl TryFrom<String> for Bound {
    type Error = MendError;

    fn try_from(s: String) -> MendResult<Self> {
        s.parse()
    }
}

impl From<Bound> for String {
    fn from(b: Bound) -> String {
        b.to_string()
    }
}
