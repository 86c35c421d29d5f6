use std::fs;
use std::io::Write;
use std::process::Command;

use itertools::Itertools;
use tempfile::NamedTempFile;
use tracing::debug;

use rustmend::{EditorLauncher, MendError, MendResult, SourceFile};

/// Runs the configured editor command on a scratch copy of the range under
/// review; whatever the scratch file holds afterwards becomes the
/// replacement lines. The real file is never handed to the editor, the
/// engine applies the returned lines itself.
///
/// The command is split on whitespace, so `--editor "code -w"` works; the
/// scratch path is appended as the final argument.
pub struct ExternalEditor {
    command: String,
}

impl ExternalEditor {
    pub fn new(command: String) -> Self {
        Self { command }
    }
}

impl EditorLauncher for ExternalEditor {
    fn edit(
        &mut self,
        file: &SourceFile,
        start_line: usize,
        end_line: usize,
    ) -> MendResult<Vec<String>> {
        let mut scratch = scratch_file(file)?;
        let mut region = (start_line..end_line)
            .filter_map(|number| file.line(number))
            .join("\n");
        if !region.is_empty() {
            region.push('\n');
        }
        scratch.write_all(region.as_bytes())?;
        scratch.flush()?;

        let mut parts = self.command.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(MendError::editor_error("empty editor command"));
        };
        debug!("launching {} on {}", program, scratch.path().display());
        let status = Command::new(program)
            .args(parts)
            .arg(scratch.path())
            .status()
            .map_err(|e| {
                MendError::editor_error(format!("could not launch {}: {}", program, e))
            })?;
        if !status.success() {
            return Err(MendError::editor_error(format!(
                "{} exited with {}",
                program, status
            )));
        }

        let bytes = fs::read(scratch.path())?;
        let edited = String::from_utf8(bytes)
            .map_err(|_| MendError::editor_error("edit buffer is not valid UTF-8"))?;
        Ok(split_buffer(&edited))
    }
}

fn scratch_file(file: &SourceFile) -> MendResult<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("rustmend-edit-");
    let suffix = file
        .path()
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()));
    if let Some(suffix) = &suffix {
        builder.suffix(suffix);
    }
    Ok(builder.tempfile()?)
}

/// Splits the edit buffer into lines. An empty buffer means "delete the
/// range"; a trailing newline does not produce a trailing empty line.
fn split_buffer(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}
