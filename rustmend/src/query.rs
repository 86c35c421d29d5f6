use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::enumerate::MatchEnumerator;
use crate::errors::{MendError, MendResult};
use crate::matcher::Matcher;
use crate::patch::Patch;
use crate::position::{Bound, Position};
use crate::source::SourceFile;

/// What the operator (or policy) chose for one presented patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Write the suggested lines to the file.
    Accept,
    /// Leave the file alone and move on.
    Reject,
    /// Hand the range to the external editor, then accept its result.
    Edit,
    /// Drop every remaining match in the current file.
    SkipFile,
    /// Stop the run; nothing further is presented or written.
    Abort,
}

/// Supplies a [`Decision`] for each presented patch.
pub trait DecisionSource {
    fn decide(&mut self, patch: &Patch) -> Decision;
}

/// Accepts everything. The `--accept-all` policy.
pub struct AcceptAll;

impl DecisionSource for AcceptAll {
    fn decide(&mut self, _patch: &Patch) -> Decision {
        Decision::Accept
    }
}

/// Replays a fixed sequence of decisions, then aborts. Meant for automation
/// and tests.
pub struct QueuedDecisions {
    queue: VecDeque<Decision>,
}

impl QueuedDecisions {
    pub fn new(decisions: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            queue: decisions.into_iter().collect(),
        }
    }
}

impl DecisionSource for QueuedDecisions {
    fn decide(&mut self, _patch: &Patch) -> Decision {
        self.queue.pop_front().unwrap_or(Decision::Abort)
    }
}

struct RejectAll;

impl DecisionSource for RejectAll {
    fn decide(&mut self, _patch: &Patch) -> Decision {
        Decision::Reject
    }
}

/// Produces replacement lines for a patch's range, typically by opening an
/// external editor on a scratch copy of the region.
pub trait EditorLauncher {
    fn edit(
        &mut self,
        file: &SourceFile,
        start_line: usize,
        end_line: usize,
    ) -> MendResult<Vec<String>>;
}

/// Final snapshot of a completed (or aborted) run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Patches shown to the decision source.
    pub presented: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub edited: usize,
    /// Operator skip-file decisions, not unreadable files.
    pub files_skipped: usize,
    /// Presented patches per pattern, indexed like the pattern list.
    pub pattern_counts: Vec<usize>,
    pub aborted: bool,
    /// Where the last presented patch sat; the place to resume from after
    /// an abort.
    pub last_position: Option<Position>,
    pub elapsed: Duration,
}

impl RunReport {
    /// Accepted plus edited: how many patches changed a file.
    pub fn applied(&self) -> usize {
        self.accepted + self.edited
    }
}

/// One configured find-and-replace run, tying the walk, the matcher, and
/// the operator together.
///
/// A query resolves the configured bounds, enumerates matches lazily, asks a
/// [`DecisionSource`] what to do with each one, and applies accepted patches
/// to disk one at a time. The decision source may be a human prompt, an
/// automated policy, or a queue in tests; the external editor is likewise a
/// trait object so the loop never blocks on anything it cannot fake.
pub struct Query {
    config: RunConfig,
    matcher: Matcher,
}

impl Query {
    pub fn new(config: RunConfig, matcher: Matcher) -> Self {
        Self { config, matcher }
    }

    /// Runs the decision loop to completion.
    ///
    /// Bound resolution failures and invalid bound pairs fail fast; write
    /// failures for an accepted patch abort the run with the error, leaving
    /// previously applied edits intact.
    pub fn run(
        self,
        decisions: &mut dyn DecisionSource,
        mut editor: Option<&mut dyn EditorLauncher>,
    ) -> MendResult<RunReport> {
        let started = Instant::now();
        let filter = self.config.path_filter();
        let pattern_count = self.matcher.pattern_count();
        info!(
            "starting run under {} with {} pattern(s)",
            filter.root.display(),
            pattern_count
        );

        // Percentage bounds need the file count; path:line bounds do not,
        // and the walk stays lazy for them.
        let needs_file_list = self
            .config
            .start
            .as_ref()
            .is_some_and(|b| b.needs_file_list())
            || self.config.end.as_ref().is_some_and(|b| b.needs_file_list());

        let collected = needs_file_list.then(|| filter.collect_files());
        let resolve = |bound: &Option<Bound>| {
            bound
                .as_ref()
                .and_then(|b| b.resolve(collected.as_deref().unwrap_or(&[])))
        };
        let start = resolve(&self.config.start);
        let end = resolve(&self.config.end);
        if let (Some(start), Some(end)) = (&start, &end) {
            if start > end {
                return Err(MendError::config_error(format!(
                    "start bound {} is after end bound {}",
                    start, end
                )));
            }
        }

        let mut enumerator = match collected {
            Some(files) => MatchEnumerator::new(files.into_iter(), self.matcher, start, end),
            None => MatchEnumerator::new(filter.files(), self.matcher, start, end),
        };

        let mut report = RunReport {
            pattern_counts: vec![0; pattern_count],
            ..RunReport::default()
        };

        loop {
            let Some(patch) = enumerator.peek() else { break };
            let patch = patch.clone();
            report.presented += 1;
            if let Some(count) = report.pattern_counts.get_mut(patch.pattern_index) {
                *count += 1;
            }
            report.last_position = Some(patch.start_position());

            match decisions.decide(&patch) {
                Decision::Accept => {
                    enumerator.advance();
                    if patch.has_suggestion() {
                        apply_patch(&patch)?;
                        enumerator.note_applied(&patch);
                        report.accepted += 1;
                    } else {
                        warn!(
                            "no suggested replacement for {}; leaving it alone",
                            patch.render_range()
                        );
                        report.rejected += 1;
                    }
                }
                Decision::Reject => {
                    enumerator.advance();
                    report.rejected += 1;
                }
                Decision::Edit => {
                    enumerator.advance();
                    // Editor trouble degrades to a rejection; a failure to
                    // write the edited result is as fatal as any other
                    // write failure.
                    match prepare_edit(&patch, &mut editor) {
                        Ok(edited) => {
                            apply_patch(&edited)?;
                            enumerator.note_applied(&edited);
                            report.edited += 1;
                        }
                        Err(e) => {
                            warn!("could not edit {}: {}", patch.render_range(), e);
                            report.rejected += 1;
                        }
                    }
                }
                Decision::SkipFile => {
                    enumerator.skip_file();
                    report.files_skipped += 1;
                }
                Decision::Abort => {
                    report.aborted = true;
                    break;
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            "run finished: {} presented, {} applied, aborted: {}",
            report.presented,
            report.applied(),
            report.aborted
        );
        Ok(report)
    }

    /// Counts matches without prompting or mutating anything. The totals
    /// are definitionally the presented-patch stream of a run that rejects
    /// everything.
    pub fn count(self) -> MendResult<RunReport> {
        self.run(&mut RejectAll, None)
    }
}

/// Writes an accepted patch to its file.
fn apply_patch(patch: &Patch) -> MendResult<()> {
    debug!("applying {}", patch.render_range());
    let mut file = SourceFile::load(&patch.path)?;
    file.apply(patch)?;
    file.save()
}

/// Runs the editor seam for one patch. The returned patch carries the
/// edited lines as its suggestion; nothing is written here.
///
/// Takes the editor slot by reference so the borrow it hands the launcher
/// ends with this call, letting the decision loop reach the editor again on
/// its next iteration.
fn prepare_edit(
    patch: &Patch,
    editor: &mut Option<&mut dyn EditorLauncher>,
) -> MendResult<Patch> {
    let Some(launcher) = editor.as_deref_mut() else {
        return Err(MendError::editor_error("no editor is configured"));
    };
    let file = SourceFile::load(&patch.path)?;
    let new_lines = launcher.edit(&file, patch.start_line, patch.end_line)?;

    let mut edited = patch.clone();
    edited.new_lines = Some(new_lines);
    Ok(edited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::PatternDef;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn write_tree(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    fn config_for(root: &Path) -> RunConfig {
        RunConfig {
            root_path: root.to_path_buf(),
            ..RunConfig::default()
        }
    }

    fn substitution(pattern: &str, template: &str) -> Matcher {
        Matcher::patterns(vec![PatternDef::new(pattern).with_template(template)]).unwrap()
    }

    fn read(dir: &TempDir, name: &str) -> String {
        fs::read_to_string(dir.path().join(name)).unwrap()
    }

    /// Rejects everything and records what was presented.
    struct Recording {
        seen: Vec<String>,
    }

    impl DecisionSource for Recording {
        fn decide(&mut self, patch: &Patch) -> Decision {
            self.seen.push(patch.render_range());
            Decision::Reject
        }
    }

    struct FakeEditor {
        replacement: Vec<String>,
        calls: Vec<(PathBuf, usize, usize)>,
    }

    impl EditorLauncher for FakeEditor {
        fn edit(
            &mut self,
            file: &SourceFile,
            start_line: usize,
            end_line: usize,
        ) -> MendResult<Vec<String>> {
            self.calls
                .push((file.path().to_path_buf(), start_line, end_line));
            Ok(self.replacement.clone())
        }
    }

    #[test]
    fn test_accept_all_rewrites_every_match() {
        let dir = write_tree(&[("a.txt", "foo\nbar\nfoo\n"), ("b.txt", "foo\n")]);
        let report = Query::new(config_for(dir.path()), substitution("foo", "baz"))
            .run(&mut AcceptAll, None)
            .unwrap();

        assert_eq!(report.presented, 3);
        assert_eq!(report.accepted, 3);
        assert_eq!(report.pattern_counts, vec![3]);
        assert!(!report.aborted);
        assert_eq!(read(&dir, "a.txt"), "baz\nbar\nbaz\n");
        assert_eq!(read(&dir, "b.txt"), "baz\n");
    }

    #[test]
    fn test_count_reports_without_mutating() {
        let dir = write_tree(&[("a.txt", "foo\nfoo\n"), ("b.txt", "no match\n")]);
        let report = Query::new(config_for(dir.path()), substitution("foo", "bar"))
            .count()
            .unwrap();

        assert_eq!(report.presented, 2);
        assert_eq!(report.pattern_counts, vec![2]);
        assert_eq!(report.applied(), 0);
        assert_eq!(read(&dir, "a.txt"), "foo\nfoo\n");
    }

    #[test]
    fn test_queued_decisions_and_abort() {
        let dir = write_tree(&[("a.txt", "foo\nmid\nfoo\n"), ("b.txt", "foo\n")]);
        let mut decisions =
            QueuedDecisions::new([Decision::Reject, Decision::Accept, Decision::Abort]);
        let report = Query::new(config_for(dir.path()), substitution("foo", "baz"))
            .run(&mut decisions, None)
            .unwrap();

        assert_eq!(report.presented, 3);
        assert_eq!((report.rejected, report.accepted), (1, 1));
        assert!(report.aborted);
        assert!(report.last_position.unwrap().path.ends_with("b.txt"));
        assert_eq!(read(&dir, "a.txt"), "foo\nmid\nbaz\n");
        assert_eq!(read(&dir, "b.txt"), "foo\n");
    }

    #[test]
    fn test_skip_file_counts_and_moves_on() {
        let dir = write_tree(&[("a.txt", "foo\nfoo\n"), ("b.txt", "foo\n")]);
        let mut decisions = QueuedDecisions::new([Decision::SkipFile, Decision::Accept]);
        let report = Query::new(config_for(dir.path()), substitution("foo", "baz"))
            .run(&mut decisions, None)
            .unwrap();

        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.accepted, 1);
        assert_eq!(read(&dir, "a.txt"), "foo\nfoo\n");
        assert_eq!(read(&dir, "b.txt"), "baz\n");
    }

    #[test]
    fn test_edit_applies_editor_output() {
        let dir = write_tree(&[("a.txt", "foo\nafter\n")]);
        let mut editor = FakeEditor {
            replacement: vec!["EDITED".to_string()],
            calls: Vec::new(),
        };
        let mut decisions = QueuedDecisions::new([Decision::Edit]);
        let report = Query::new(config_for(dir.path()), substitution("foo", "bar"))
            .run(&mut decisions, Some(&mut editor))
            .unwrap();

        assert_eq!(report.edited, 1);
        assert_eq!(editor.calls.len(), 1);
        assert!(editor.calls[0].0.ends_with("a.txt"));
        assert_eq!((editor.calls[0].1, editor.calls[0].2), (1, 2));
        assert_eq!(read(&dir, "a.txt"), "EDITED\nafter\n");
    }

    #[test]
    fn test_edit_twice_reuses_the_editor() {
        let dir = write_tree(&[("a.txt", "foo\nmid\nfoo\n")]);
        let mut editor = FakeEditor {
            replacement: vec!["EDITED".to_string()],
            calls: Vec::new(),
        };
        let mut decisions = QueuedDecisions::new([Decision::Edit, Decision::Edit]);
        let report = Query::new(config_for(dir.path()), substitution("foo", "bar"))
            .run(&mut decisions, Some(&mut editor))
            .unwrap();

        assert_eq!(report.edited, 2);
        assert_eq!(editor.calls.len(), 2);
        assert_eq!((editor.calls[1].1, editor.calls[1].2), (3, 4));
        assert_eq!(read(&dir, "a.txt"), "EDITED\nmid\nEDITED\n");
    }

    #[test]
    fn test_edit_without_editor_degrades_to_reject() {
        let dir = write_tree(&[("a.txt", "foo\n")]);
        let mut decisions = QueuedDecisions::new([Decision::Edit]);
        let report = Query::new(config_for(dir.path()), substitution("foo", "bar"))
            .run(&mut decisions, None)
            .unwrap();

        assert_eq!((report.edited, report.rejected), (0, 1));
        assert_eq!(read(&dir, "a.txt"), "foo\n");
    }

    #[test]
    fn test_accept_without_suggestion_degrades_to_reject() {
        let dir = write_tree(&[("a.txt", "deprecated()\n")]);
        let matcher = Matcher::patterns(vec![PatternDef::new("deprecated")]).unwrap();
        let report = Query::new(config_for(dir.path()), matcher)
            .run(&mut AcceptAll, None)
            .unwrap();

        assert_eq!(report.presented, 1);
        assert_eq!((report.accepted, report.rejected), (0, 1));
        assert_eq!(read(&dir, "a.txt"), "deprecated()\n");
    }

    #[test]
    fn test_resume_from_position_matches_full_run_suffix() {
        let dir = write_tree(&[
            ("a.txt", "foo\nx\nfoo\n"),
            ("b.txt", "foo\n"),
            ("c.txt", "x\nfoo\n"),
        ]);
        let full = {
            let mut recording = Recording { seen: Vec::new() };
            Query::new(config_for(dir.path()), substitution("foo", "bar"))
                .run(&mut recording, None)
                .unwrap();
            recording.seen
        };
        assert_eq!(full.len(), 4);

        // Resuming at the third presented match replays exactly the suffix.
        let mut config = config_for(dir.path());
        config.start = Some(Bound::At(Position::new(dir.path().join("b.txt"), 1)));
        let mut recording = Recording { seen: Vec::new() };
        Query::new(config, substitution("foo", "bar"))
            .run(&mut recording, None)
            .unwrap();
        assert_eq!(recording.seen, full[2..].to_vec());
    }

    #[test]
    fn test_inverted_bounds_fail_fast() {
        let dir = write_tree(&[("a.txt", "foo\n"), ("b.txt", "foo\n")]);
        let mut config = config_for(dir.path());
        config.start = Some(Bound::At(Position::new(dir.path().join("b.txt"), 1)));
        config.end = Some(Bound::At(Position::new(dir.path().join("a.txt"), 1)));

        let err = Query::new(config, substitution("foo", "bar"))
            .count()
            .unwrap_err();
        assert!(matches!(err, MendError::ConfigError(_)));
    }

    #[test]
    fn test_percentage_start_bound() {
        let dir = write_tree(&[
            ("f0.txt", "foo\n"),
            ("f1.txt", "foo\n"),
            ("f2.txt", "foo\n"),
            ("f3.txt", "foo\n"),
        ]);
        let mut config = config_for(dir.path());
        config.start = Some(Bound::Percent(50));
        let report = Query::new(config, substitution("foo", "bar"))
            .count()
            .unwrap();

        // 50% of four files starts at the third.
        assert_eq!(report.presented, 2);
    }
}
