use anyhow::Result;
use rustmend::{
    AcceptAll, Bound, Decision, DecisionSource, EditorLauncher, Matcher, MendError, MendResult,
    Patch, PathFilter, PatternDef, Position, Query, QueuedDecisions, RunConfig, SourceFile,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
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

fn multiline(pattern: &str, template: &str) -> PatternDef {
    let mut def = PatternDef::new(pattern).with_template(template);
    def.multiline = true;
    def
}

/// Records every presented range and answers with a fixed decision.
struct RecordAnd {
    decision: Decision,
    seen: Vec<String>,
}

impl RecordAnd {
    fn new(decision: Decision) -> Self {
        Self {
            decision,
            seen: Vec::new(),
        }
    }
}

impl DecisionSource for RecordAnd {
    fn decide(&mut self, patch: &Patch) -> Decision {
        self.seen.push(patch.render_range());
        self.decision
    }
}

#[test]
fn test_rejecting_everything_changes_nothing() -> Result<()> {
    let dir = tempdir()?;
    let a = write_file(&dir, "a.txt", "foo one\nplain\nfoo two\n");
    let b = write_file(&dir, "b.txt", "foo\r\ncrlf line\r\n");

    let before = (fs::read(&a)?, fs::read(&b)?);
    let mut rejector = RecordAnd::new(Decision::Reject);
    let report = Query::new(config_for(dir.path()), substitution("foo", "bar"))
        .run(&mut rejector, None)?;

    assert_eq!(report.presented, 3);
    assert_eq!(report.applied(), 0);
    assert_eq!((fs::read(&a)?, fs::read(&b)?), before);
    Ok(())
}

#[test]
fn test_accepting_shifts_pending_ranges() -> Result<()> {
    let dir = tempdir()?;
    write_file(
        &dir,
        "f.txt",
        "l1\nl2\nopen(\n  arg)\nl5\nl6\nl7\nl8\nl9\nbegin\nfinish\nl12\n",
    );
    let matcher = Matcher::patterns(vec![
        multiline(r"open\(\n\s*arg\)", "open(arg)"),
        multiline(r"begin\nfinish", "done"),
    ])?;

    let mut acceptor = RecordAnd::new(Decision::Accept);
    let report = Query::new(config_for(dir.path()), matcher).run(&mut acceptor, None)?;

    // The first accept shrinks lines [3,5) to one line, so the pending
    // [10,12) match is presented as [9,11).
    assert_eq!(report.accepted, 2);
    assert!(acceptor.seen[0].ends_with(":3-4"));
    assert!(acceptor.seen[1].ends_with(":9-10"));
    assert_eq!(
        fs::read_to_string(dir.path().join("f.txt"))?,
        "l1\nl2\nopen(arg)\nl5\nl6\nl7\nl8\nl9\ndone\nl12\n"
    );
    Ok(())
}

#[test]
fn test_resume_replays_exact_suffix() -> Result<()> {
    let dir = tempdir()?;
    let path = write_file(&dir, "data.txt", "foo\nx\nfoo\nx\nfoo\n");

    let mut full = RecordAnd::new(Decision::Reject);
    Query::new(config_for(dir.path()), substitution("foo", "bar")).run(&mut full, None)?;
    assert_eq!(full.seen.len(), 3);

    let mut config = config_for(dir.path());
    config.start = Some(Bound::At(Position::new(&path, 3)));
    let mut resumed = RecordAnd::new(Decision::Reject);
    Query::new(config, substitution("foo", "bar")).run(&mut resumed, None)?;

    assert_eq!(resumed.seen, full.seen[1..].to_vec());
    Ok(())
}

#[test]
fn test_percentage_bound_resolves_by_file_index() -> Result<()> {
    let dir = tempdir()?;
    for i in 0..10 {
        write_file(&dir, &format!("f{}.txt", i), "foo\n");
    }

    let files = PathFilter::new(dir.path()).collect_files();
    assert_eq!(files.len(), 10);
    let resolved = Bound::Percent(50).resolve(&files).unwrap();
    assert!(resolved.path.ends_with("f5.txt"));
    assert_eq!(resolved.line_number(), Some(1));

    let mut config = config_for(dir.path());
    config.start = Some(Bound::Percent(50));
    let mut recorder = RecordAnd::new(Decision::Reject);
    Query::new(config, substitution("foo", "bar")).run(&mut recorder, None)?;

    assert_eq!(recorder.seen.len(), 5);
    assert!(recorder.seen[0].contains("f5.txt"));
    Ok(())
}

#[test]
fn test_count_matches_accept_all_total() -> Result<()> {
    let dir = tempdir()?;
    let a = write_file(&dir, "a.txt", "foo\nfoo\n");
    write_file(&dir, "b.txt", "also foo here\n");

    let counted = Query::new(config_for(dir.path()), substitution("foo", "bar")).count()?;
    assert_eq!(counted.presented, 3);
    assert_eq!(counted.pattern_counts, vec![3]);
    // Counting wrote nothing.
    assert_eq!(fs::read_to_string(&a)?, "foo\nfoo\n");

    let applied = Query::new(config_for(dir.path()), substitution("foo", "bar"))
        .run(&mut AcceptAll, None)?;
    assert_eq!(applied.applied(), counted.presented);
    Ok(())
}

#[test]
fn test_extensionless_candidates() -> Result<()> {
    let dir = tempdir()?;
    write_file(&dir, "a.php", "x\n");
    write_file(&dir, "b", "x\n");
    write_file(&dir, "c.txt", "x\n");

    let mut filter = PathFilter::new(dir.path());
    filter.extensions = Some(vec!["php".to_string()]);
    filter.include_extensionless = true;

    let names: Vec<String> = filter
        .collect_files()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.php", "b"]);
    Ok(())
}

#[test]
fn test_case_insensitive_pattern() -> Result<()> {
    let dir = tempdir()?;
    let path = write_file(&dir, "a.txt", "Foo bar\n");
    let mut def = PatternDef::new("FOO").with_template("baz");
    def.case_insensitive = true;

    let report = Query::new(config_for(dir.path()), Matcher::patterns(vec![def])?)
        .run(&mut AcceptAll, None)?;

    assert_eq!(report.accepted, 1);
    assert_eq!(fs::read_to_string(&path)?, "baz bar\n");
    Ok(())
}

#[test]
fn test_multiline_splice_preserves_line_boundaries() -> Result<()> {
    let dir = tempdir()?;
    let path = write_file(&dir, "a.txt", "aaXX\nYYbb\n");
    let matcher = Matcher::patterns(vec![multiline("XX\nYY", "")])?;

    let report = Query::new(config_for(dir.path()), matcher).run(&mut AcceptAll, None)?;

    assert_eq!(report.accepted, 1);
    assert_eq!(fs::read_to_string(&path)?, "aabb\n");
    Ok(())
}

#[test]
fn test_custom_matcher_rescans_between_accepts() -> Result<()> {
    let dir = tempdir()?;
    let path = write_file(&dir, "a.txt", "foo\nfoo\n");
    let matcher = Matcher::custom(|lines: &[String]| {
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.contains("foo"))
            .map(|(i, _)| {
                Patch::new(i + 1, i + 2, Some(vec!["X".to_string(), "Y".to_string()]))
            })
            .collect()
    });

    let report = Query::new(config_for(dir.path()), matcher).run(&mut AcceptAll, None)?;

    // Each accept doubles the replaced line; the re-scan keeps the cursor
    // at post-edit line numbers without re-presenting decided sites.
    assert_eq!(report.presented, 2);
    assert_eq!(report.accepted, 2);
    assert_eq!(fs::read_to_string(&path)?, "X\nY\nX\nY\n");
    Ok(())
}

#[test]
fn test_custom_insertion_and_follow_up() -> Result<()> {
    let dir = tempdir()?;
    let path = write_file(&dir, "a.txt", "a\nb\n");
    let matcher = Matcher::custom(|lines: &[String]| {
        let mut patches = Vec::new();
        if lines.first().is_some_and(|l| l != "HDR") {
            patches.push(Patch::new(1, 1, Some(vec!["HDR".to_string()])));
        }
        for (i, line) in lines.iter().enumerate() {
            if line == "b" {
                patches.push(Patch::new(i + 1, i + 2, Some(vec!["B2".to_string()])));
            }
        }
        patches
    });

    let report = Query::new(config_for(dir.path()), matcher).run(&mut AcceptAll, None)?;

    assert_eq!(report.accepted, 2);
    assert_eq!(fs::read_to_string(&path)?, "HDR\na\nB2\n");
    Ok(())
}

#[test]
fn test_failing_editor_rejects_and_continues() -> Result<()> {
    struct FailingEditor;

    impl EditorLauncher for FailingEditor {
        fn edit(
            &mut self,
            _file: &SourceFile,
            _start_line: usize,
            _end_line: usize,
        ) -> MendResult<Vec<String>> {
            Err(MendError::editor_error("editor exploded"))
        }
    }

    let dir = tempdir()?;
    let path = write_file(&dir, "a.txt", "foo\nfoo\n");
    let mut decisions = QueuedDecisions::new([Decision::Edit, Decision::Accept]);
    let mut editor = FailingEditor;
    let report = Query::new(config_for(dir.path()), substitution("foo", "bar"))
        .run(&mut decisions, Some(&mut editor))?;

    assert_eq!((report.rejected, report.accepted), (1, 1));
    assert_eq!(fs::read_to_string(&path)?, "foo\nbar\n");
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_skipped() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir()?;
    write_file(&dir, "a.txt", "foo\n");
    let blocked = write_file(&dir, "b.txt", "foo\n");
    fs::set_permissions(&blocked, fs::Permissions::from_mode(0o000))?;
    if fs::File::open(&blocked).is_ok() {
        // Privileged user; permission bits cannot make the file unreadable.
        return Ok(());
    }

    let report = Query::new(config_for(dir.path()), substitution("foo", "bar")).count()?;
    assert_eq!(report.presented, 1);
    Ok(())
}

#[test]
fn test_line_endings_survive_edits() -> Result<()> {
    let dir = tempdir()?;
    let crlf = write_file(&dir, "crlf.txt", "foo\r\nkeep\r\n");
    let bare = write_file(&dir, "bare.txt", "foo\nkeep");

    let report = Query::new(config_for(dir.path()), substitution("foo", "bar"))
        .run(&mut AcceptAll, None)?;

    assert_eq!(report.accepted, 2);
    assert_eq!(fs::read_to_string(&crlf)?, "bar\r\nkeep\r\n");
    // No trailing newline appears where none existed.
    assert_eq!(fs::read_to_string(&bare)?, "bar\nkeep");
    Ok(())
}
