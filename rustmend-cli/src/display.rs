use std::time::Duration;

use colored::Colorize;
use crossterm::terminal::{self, Clear, ClearType};
use similar::{ChangeTag, TextDiff};

use rustmend::{Patch, RunReport, SourceFile};

/// Rows kept free for the header, the prompt, and whatever the editor of the
/// operator's terminal adds on top.
const RESERVED_ROWS: usize = 20;

pub fn clear_screen() {
    print!("{}", Clear(ClearType::All));
    print!("\x1B[H"); // Move cursor to top-left
}

/// Clears the screen and renders one patch in place with as much context as
/// fits: unchanged context indented two spaces, removed lines prefixed `- `
/// in red, suggestion-less flagged lines `* ` in yellow, proposed lines
/// `+ ` in green.
pub fn show_patch(patch: &Patch, use_color: bool) {
    clear_screen();
    let header = patch.render_range();
    if use_color {
        println!("{}", header.bold());
    } else {
        println!("{}", header);
    }
    println!();

    match SourceFile::load(&patch.path) {
        Ok(file) => {
            let budget = terminal_rows().saturating_sub(RESERVED_ROWS);
            print_patch(patch, &file, budget, use_color);
        }
        Err(e) => println!("could not read {}: {}", patch.path.display(), e),
    }
    println!();
}

fn terminal_rows() -> usize {
    terminal::size()
        .map(|(_cols, rows)| rows as usize)
        .unwrap_or(25)
}

/// The context window for a patch: the first and one-past-last line numbers
/// to render, splitting whatever budget the diff itself leaves over evenly
/// above and below (the extra line goes below).
fn context_range(patch: &Patch, line_count: usize, budget: usize) -> (usize, usize) {
    let diff_size = patch.old_line_count() + patch.new_line_count();
    let context = budget.saturating_sub(diff_size);
    let up = context / 2;
    let down = context - up;
    let first = patch.start_line.saturating_sub(up).max(1);
    let last = (patch.end_line + down).min(line_count + 1);
    (first, last)
}

fn print_patch(patch: &Patch, file: &SourceFile, budget: usize, use_color: bool) {
    let (first, last) = context_range(patch, file.line_count(), budget);

    for number in first..patch.start_line {
        if let Some(line) = file.line(number) {
            println!("  {}", line);
        }
    }
    for number in patch.start_line..patch.end_line {
        let Some(line) = file.line(number) else {
            continue;
        };
        if patch.has_suggestion() {
            if use_color {
                println!("{}", format!("- {}", line).red());
            } else {
                println!("- {}", line);
            }
        } else if use_color {
            println!("{}", format!("* {}", line).yellow());
        } else {
            println!("* {}", line);
        }
    }
    if let Some(new_lines) = &patch.new_lines {
        for line in new_lines {
            if use_color {
                println!("{}", format!("+ {}", line).green());
            } else {
                println!("+ {}", line);
            }
        }
    }
    for number in patch.end_line..last {
        if let Some(line) = file.line(number) {
            println!("  {}", line);
        }
    }
}

/// Prints one patch as a unified hunk with real file line numbers. Used by
/// apply-everything mode, where there is no screen to clear.
pub fn print_patch_diff(patch: &Patch, use_color: bool) {
    let Some(new_lines) = &patch.new_lines else {
        println!("{}: no suggested replacement", patch.render_range());
        return;
    };
    let file = match SourceFile::load(&patch.path) {
        Ok(file) => file,
        Err(e) => {
            println!("could not read {}: {}", patch.path.display(), e);
            return;
        }
    };

    // Terminate every line so the diff never glues two lines together at a
    // missing final newline.
    let old: String = (patch.start_line..patch.end_line)
        .filter_map(|number| file.line(number))
        .map(|line| format!("{}\n", line))
        .collect();
    let new: String = new_lines.iter().map(|line| format!("{}\n", line)).collect();

    if use_color {
        println!("{}", patch.render_range().bold());
    } else {
        println!("{}", patch.render_range());
    }
    println!(
        "@@ -{},{} +{},{} @@",
        patch.start_line,
        patch.old_line_count(),
        patch.start_line,
        patch.new_line_count()
    );

    let diff = TextDiff::from_lines(&old, &new);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Delete => {
                if use_color {
                    print!("{}", format!("-{}", change.value()).red());
                } else {
                    print!("-{}", change.value());
                }
            }
            ChangeTag::Insert => {
                if use_color {
                    print!("{}", format!("+{}", change.value()).green());
                } else {
                    print!("+{}", change.value());
                }
            }
            ChangeTag::Equal => print!(" {}", change.value()),
        }
    }
    println!();
}

/// Closing summary for a run.
pub fn print_summary(report: &RunReport, use_color: bool) {
    println!();
    if use_color {
        println!("{}", "Run complete".bright_green().bold());
    } else {
        println!("Run complete");
    }
    println!("  Presented: {}", report.presented);
    println!("  Accepted:  {}", report.accepted);
    println!("  Rejected:  {}", report.rejected);
    println!("  Edited:    {}", report.edited);
    if report.files_skipped > 0 {
        println!("  Files skipped: {}", report.files_skipped);
    }
    println!("  Elapsed:   {}", format_elapsed(report.elapsed));

    if report.aborted {
        if let Some(position) = &report.last_position {
            println!();
            println!(
                "Stopped at {}; the bookmark will offer to resume there.",
                position
            );
        }
    }
}

/// Printed once at the end of a run where the operator switched to
/// yes-to-all partway through.
pub fn print_accept_rest_warning() {
    println!();
    println!("You accepted the remaining changes without seeing them.");
    println!("Make sure you and other people review them.");
    println!();
    println!("With great power, comes great responsibility.");
}

fn format_elapsed(elapsed: Duration) -> String {
    // Sub-millisecond noise makes the summary unreadable.
    humantime::format_duration(Duration::from_millis(elapsed.as_millis() as u64)).to_string()
}
