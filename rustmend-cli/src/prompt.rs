use std::io::{self, Write};

use tracing::warn;

use rustmend::{Decision, DecisionSource, Patch, Position};

use crate::bookmark;
use crate::display;

/// What one line of operator input means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Accept,
    Reject,
    Edit,
    SkipFile,
    AcceptRest,
    Abort,
}

impl Answer {
    fn into_decision(self) -> Decision {
        match self {
            Answer::Accept | Answer::AcceptRest => Decision::Accept,
            Answer::Reject => Decision::Reject,
            Answer::Edit => Decision::Edit,
            Answer::SkipFile => Decision::SkipFile,
            Answer::Abort => Decision::Abort,
        }
    }
}

/// Maps a trimmed input line to an answer. Suggestion-less patches take the
/// reduced key set.
fn parse_answer(input: &str, has_suggestion: bool) -> Option<Answer> {
    match (input, has_suggestion) {
        ("y", true) => Some(Answer::Accept),
        ("n", _) => Some(Answer::Reject),
        ("e", _) => Some(Answer::Edit),
        ("f", true) => Some(Answer::SkipFile),
        ("A", true) => Some(Answer::AcceptRest),
        ("q", _) => Some(Answer::Abort),
        _ => None,
    }
}

/// The answer a bare Enter stands for.
fn default_answer(has_suggestion: bool, default_no: bool) -> Answer {
    if !has_suggestion {
        Answer::Edit
    } else if default_no {
        Answer::Reject
    } else {
        Answer::Accept
    }
}

fn prompt_line(has_suggestion: bool, default_no: bool) -> &'static str {
    if !has_suggestion {
        "(e = edit [default], n = skip line, q = quit)? "
    } else if default_no {
        "Accept change (y = yes, n = no [default], e = edit, f = skip file, A = yes to all, q = quit)? "
    } else {
        "Accept change (y = yes [default], n = no, e = edit, f = skip file, A = yes to all, q = quit)? "
    }
}

/// Asks the operator about each patch on stdin/stdout: one line of input
/// per patch, a single letter or bare Enter for the default. Patches with
/// no suggested replacement offer only `e`, `n` and `q`, with edit as the
/// default. Unrecognized input asks again, unless reject is the configured
/// default, in which case it rejects.
pub struct InteractivePrompt {
    default_no: bool,
    use_color: bool,
    accept_rest: bool,
}

impl InteractivePrompt {
    pub fn new(default_no: bool, use_color: bool) -> Self {
        Self {
            default_no,
            use_color,
            accept_rest: false,
        }
    }

    /// True once the operator answered `A`; the closing warning should be
    /// shown after the run.
    pub fn accepted_rest(&self) -> bool {
        self.accept_rest
    }

    fn read_answer(&self, has_suggestion: bool) -> Answer {
        print!("{}", prompt_line(has_suggestion, self.default_no));
        let _ = io::stdout().flush();

        loop {
            let mut line = String::new();
            match io::stdin().read_line(&mut line) {
                // Closed stdin cannot answer anything else, so stop cleanly.
                Ok(0) | Err(_) => return Answer::Abort,
                Ok(_) => {}
            }
            let input = line.trim();
            let answer = if input.is_empty() {
                Some(default_answer(has_suggestion, self.default_no))
            } else {
                parse_answer(input, has_suggestion)
            };
            match answer {
                Some(answer) => return answer,
                None if self.default_no => return Answer::Reject,
                None => println!("Come again?"),
            }
        }
    }
}

impl DecisionSource for InteractivePrompt {
    fn decide(&mut self, patch: &Patch) -> Decision {
        // Recorded before every decision, prompted or not, so a run that
        // dies mid-way resumes at the patch it was working on.
        if let Err(e) = bookmark::save(&patch.start_position()) {
            warn!("could not save the bookmark: {}", e);
        }
        if self.accept_rest {
            return Decision::Accept;
        }

        display::show_patch(patch, self.use_color);
        let answer = self.read_answer(patch.has_suggestion());
        if answer == Answer::AcceptRest {
            self.accept_rest = true;
        }
        let decision = answer.into_decision();
        if decision != Decision::Abort {
            println!("Searching...");
        }
        decision
    }
}

/// Startup question when a bookmark from an earlier run exists.
pub fn confirm_resume(position: &Position) -> bool {
    print!("Resume where you left off, at {} (y/n)? ", position);
    let _ = io::stdout().flush();

    loop {
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }
        match line.trim() {
            "" | "y" => return true,
            "n" => return false,
            _ => println!("Come again?"),
        }
    }
}
