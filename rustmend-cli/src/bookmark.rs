use std::fs;
use std::path::{Path, PathBuf};

use rustmend::{MendResult, Position};

pub const BOOKMARK_FILE: &str = ".rustmend.bookmark";

/// Records the position about to be presented in a `.rustmend.bookmark`
/// file in the working directory. If the process dies or the operator
/// quits, the next run finds the file and offers to pick up there; a run
/// that finishes normally deletes it.
pub fn save(position: &Position) -> MendResult<()> {
    save_in(Path::new("."), position)
}

pub fn load() -> Option<Position> {
    load_from(Path::new("."))
}

pub fn delete() {
    delete_in(Path::new("."));
}

fn bookmark_path(dir: &Path) -> PathBuf {
    dir.join(BOOKMARK_FILE)
}

pub fn save_in(dir: &Path, position: &Position) -> MendResult<()> {
    fs::write(bookmark_path(dir), format!("{}\n", position))?;
    Ok(())
}

/// Reads the saved position, if any. A file that does not parse as a
/// `path:line` position is treated the same as no bookmark at all.
pub fn load_from(dir: &Path) -> Option<Position> {
    let contents = fs::read_to_string(bookmark_path(dir)).ok()?;
    contents.trim().parse().ok()
}

pub fn delete_in(dir: &Path) {
    // A bookmark that was never written is not an error.
    let _ = fs::remove_file(bookmark_path(dir));
}
