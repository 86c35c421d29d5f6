use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rustmend::{
    AcceptAll, Bound, Decision, DecisionSource, Matcher, MendError, Patch, PatternDef, Query,
    RunConfig,
};

mod bookmark;
mod display;
mod editor;
mod prompt;

use editor::ExternalEditor;
use prompt::InteractivePrompt;

type Result<T> = std::result::Result<T, MendError>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Regular expression to search for
    #[arg(required_unless_present = "self_test")]
    pattern: Option<String>,

    /// Replacement text; capture groups are available as $1, $2, ...
    /// Omit it to only flag matches for manual editing
    substitution: Option<String>,

    /// Let the pattern match across line boundaries (. matches newlines)
    #[arg(short, long)]
    multiline: bool,

    /// Case-insensitive matching
    #[arg(short = 'i', long)]
    case_insensitive: bool,

    /// Root directory to walk
    #[arg(short = 'd', long, default_value = ".")]
    dir: PathBuf,

    /// Start at a path:line position or a percentage of the file list
    #[arg(long)]
    start: Option<Bound>,

    /// Stop at a path:line position or a percentage of the file list
    #[arg(long)]
    end: Option<Bound>,

    /// Comma-separated extension entries to admit; wildcards allowed,
    /// `*` admits every file (also the behavior when the flag is absent
    /// and no config file narrows it)
    #[arg(long)]
    extensions: Option<String>,

    /// Also admit files without an extension
    #[arg(long)]
    include_extensionless: bool,

    /// Glob patterns for paths to skip (comma-separated or repeated)
    #[arg(long, value_delimiter = ',')]
    exclude_dirs: Vec<String>,

    /// Apply every suggestion without prompting, printing diffs
    #[arg(long)]
    accept_all: bool,

    /// Make reject the default answer, and reject on unrecognized input
    #[arg(long)]
    default_no: bool,

    /// Editor command for manual edits (default: $EDITOR, then vim)
    #[arg(long)]
    editor: Option<String>,

    /// Print the number of matches and change nothing
    #[arg(short, long)]
    count: bool,

    /// Run a built-in end-to-end check against a throwaway tree
    #[arg(long)]
    self_test: bool,

    /// Explicit config file (layered over .rustmend.yaml and the global one)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    /// The CLI's view of the run configuration, merged over file values.
    /// An absent `--extensions` stays `None` so a config-file narrowing
    /// survives; a given one always overrides, with `*` widening back to
    /// the unrestricted empty list.
    fn overrides(&self) -> RunConfig {
        RunConfig {
            root_path: self.dir.clone(),
            extensions: self.extensions.as_deref().map(parse_extensions),
            include_extensionless: self.include_extensionless,
            exclude_patterns: self.exclude_dirs.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
            accept_all: self.accept_all,
            default_no: self.default_no,
            editor: self.editor.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

/// `*` means no extension restriction, expressed as the empty entry list;
/// anything else is a comma list.
fn parse_extensions(raw: &str) -> Vec<String> {
    if raw.trim() == "*" {
        return Vec::new();
    }
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn main() -> Result<()> {
    run()
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = RunConfig::load_from(cli.config.as_deref())?.merge_with_cli(cli.overrides());
    init_logging(&config.log_level);

    if cli.self_test {
        return self_test();
    }
    let Some(pattern) = cli.pattern.as_deref() else {
        return Err(MendError::config_error("a search pattern is required"));
    };

    let mut def = PatternDef::new(pattern);
    def.multiline = cli.multiline;
    def.case_insensitive = cli.case_insensitive;
    if let Some(template) = cli.substitution.as_deref() {
        def = def.with_template(template);
    }
    let matcher = Matcher::patterns(vec![def])?;

    let use_color = !cli.no_color;
    if cli.count {
        return run_count(Query::new(config, matcher));
    }
    if config.accept_all {
        return run_accept_all(Query::new(config, matcher), use_color);
    }
    run_interactive(config, matcher, use_color)
}

fn init_logging(level: &str) {
    // RUST_LOG wins when set. The library and this binary share the
    // `rustmend` target prefix.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rustmend={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_interactive(mut config: RunConfig, matcher: Matcher, use_color: bool) -> Result<()> {
    // An explicit start bound outranks a leftover bookmark.
    if config.start.is_none() {
        if let Some(position) = bookmark::load() {
            if prompt::confirm_resume(&position) {
                config.start = Some(Bound::At(position));
            }
        }
    }

    let mut source = InteractivePrompt::new(config.default_no, use_color);
    let mut editor = ExternalEditor::new(config.resolve_editor());

    println!("Searching for first instance...");
    let report = Query::new(config, matcher).run(&mut source, Some(&mut editor))?;

    if !report.aborted {
        bookmark::delete();
    }
    if source.accepted_rest() {
        display::print_accept_rest_warning();
    }
    display::print_summary(&report, use_color);
    Ok(())
}

/// Rejects every patch while ticking a live counter.
struct CountingRejects {
    progress: ProgressBar,
}

impl DecisionSource for CountingRejects {
    fn decide(&mut self, _patch: &Patch) -> Decision {
        self.progress.inc(1);
        Decision::Reject
    }
}

fn run_count(query: Query) -> Result<()> {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {pos} matches")
            .unwrap(),
    );

    let mut counting = CountingRejects {
        progress: progress.clone(),
    };
    let report = query.run(&mut counting, None)?;
    progress.finish_and_clear();

    println!("{} matches", report.presented);
    Ok(())
}

/// Accepts every patch, printing each one as a unified hunk first.
struct DiffingAcceptAll {
    use_color: bool,
}

impl DecisionSource for DiffingAcceptAll {
    fn decide(&mut self, patch: &Patch) -> Decision {
        display::print_patch_diff(patch, self.use_color);
        Decision::Accept
    }
}

fn run_accept_all(query: Query, use_color: bool) -> Result<()> {
    let report = query.run(&mut DiffingAcceptAll { use_color }, None)?;
    display::print_summary(&report, use_color);
    Ok(())
}

/// End-to-end check against a throwaway tree: count, rewrite per line with a
/// capture group, then join a multiline match.
fn self_test() -> Result<()> {
    println!("Running self-test...");
    let dir = tempfile::tempdir()?;
    let alpha = dir.path().join("alpha.php");
    let beta = dir.path().join("beta.php");
    fs::write(&alpha, "call_user_method(1)\nkeep this line\ncall_user_method(2)\n")?;
    fs::write(&beta, "open(\n  handle)\ntrailer\n")?;

    let config = RunConfig {
        root_path: dir.path().to_path_buf(),
        ..RunConfig::default()
    };

    let substitution = || -> Result<Matcher> {
        Matcher::patterns(vec![
            PatternDef::new(r"call_user_method\((\d+)\)").with_template("call_user_func($1)"),
        ])
    };

    let counted = Query::new(config.clone(), substitution()?).count()?;
    check(counted.presented == 2, "expected two matches before rewriting")?;

    let report = Query::new(config.clone(), substitution()?).run(&mut AcceptAll, None)?;
    check(report.applied() == 2, "expected two applied rewrites")?;
    check(
        fs::read_to_string(&alpha)? == "call_user_func(1)\nkeep this line\ncall_user_func(2)\n",
        "line rewrite produced the wrong content",
    )?;

    let mut join = PatternDef::new(r"open\(\n\s*handle\)").with_template("open(handle)");
    join.multiline = true;
    let report = Query::new(config, Matcher::patterns(vec![join])?).run(&mut AcceptAll, None)?;
    check(report.applied() == 1, "expected one multiline rewrite")?;
    check(
        fs::read_to_string(&beta)? == "open(handle)\ntrailer\n",
        "multiline rewrite produced the wrong content",
    )?;

    println!("Self-test passed.");
    Ok(())
}

fn check(ok: bool, what: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(MendError::config_error(format!(
            "self-test failed: {}",
            what
        )))
    }
}
