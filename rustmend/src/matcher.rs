use regex::{Regex, RegexBuilder};
use std::fmt;

use crate::errors::{MendError, MendResult};
use crate::patch::Patch;

/// One pattern plus how it should match and what it proposes.
///
/// Without a template the pattern only flags sites for manual editing.
/// Templates use `$1`/`${name}` for capture groups.
#[derive(Debug, Clone)]
pub struct PatternDef {
    pub pattern: String,
    pub template: Option<String>,
    pub multiline: bool,
    pub case_insensitive: bool,
}

impl PatternDef {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            template: None,
            multiline: false,
            case_insensitive: false,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }
}

#[derive(Debug)]
struct CompiledPattern {
    def: PatternDef,
    regex: Regex,
}

/// Compiled pattern definitions for one run.
#[derive(Debug)]
pub struct PatternMatcher {
    patterns: Vec<CompiledPattern>,
}

impl PatternMatcher {
    /// Compiles the definitions, failing fast on a bad regex or a template
    /// referencing capture groups the pattern does not have.
    pub fn new(defs: Vec<PatternDef>) -> MendResult<Self> {
        let mut patterns = Vec::with_capacity(defs.len());
        for def in defs {
            let regex = RegexBuilder::new(&def.pattern)
                .case_insensitive(def.case_insensitive)
                .dot_matches_new_line(def.multiline)
                .build()
                .map_err(|e| MendError::invalid_pattern(e.to_string()))?;
            if let Some(template) = &def.template {
                validate_capture_groups(&regex, template)?;
            }
            patterns.push(CompiledPattern { def, regex });
        }
        Ok(Self { patterns })
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// All proposals for one file, sorted by position.
    pub fn find_patches(&self, lines: &[String]) -> Vec<Patch> {
        let mut patches = Vec::new();
        for (index, compiled) in self.patterns.iter().enumerate() {
            let found = if compiled.def.multiline {
                multiline_patches(compiled, lines)
            } else {
                line_patches(compiled, lines)
            };
            patches.extend(found.into_iter().map(|mut p| {
                p.pattern_index = index;
                p
            }));
        }
        patches.sort_by_key(|p| (p.start_line, p.end_line, p.pattern_index));
        patches
    }
}

fn line_patches(compiled: &CompiledPattern, lines: &[String]) -> Vec<Patch> {
    let mut patches = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let line_number = i + 1;
        match &compiled.def.template {
            Some(template) => {
                let replaced = compiled.regex.replace_all(line, template.as_str());
                // Templates may contain newlines, growing one line into
                // several; empty replacement text deletes the line.
                let new_lines = split_into_lines(&replaced);
                let noop = new_lines.len() == 1 && new_lines[0] == *line;
                if !noop {
                    patches.push(Patch::new(line_number, line_number + 1, Some(new_lines)));
                }
            }
            None => {
                if compiled.regex.is_match(line) {
                    patches.push(Patch::new(line_number, line_number + 1, None));
                }
            }
        }
    }
    patches
}

fn multiline_patches(compiled: &CompiledPattern, lines: &[String]) -> Vec<Patch> {
    let content = lines.join("\n");
    let mut line_starts = Vec::with_capacity(lines.len());
    let mut offset = 0;
    for line in lines {
        line_starts.push(offset);
        offset += line.len() + 1;
    }

    let row_of = |pos: usize| line_starts.partition_point(|&start| start <= pos) - 1;

    let mut patches = Vec::new();
    for caps in compiled.regex.captures_iter(&content) {
        let m = caps.get(0).map(|m| (m.start(), m.end()));
        let Some((start, end)) = m else { continue };
        if start == end {
            continue;
        }

        let start_row = row_of(start);
        let end_row = row_of(end - 1);
        let start_col = start - line_starts[start_row];
        let end_col = (end - line_starts[end_row]).min(lines[end_row].len());

        let new_lines = compiled.def.template.as_ref().map(|template| {
            let mut expanded = String::new();
            caps.expand(template, &mut expanded);
            let new_text = format!(
                "{}{}{}",
                &lines[start_row][..start_col],
                expanded,
                &lines[end_row][end_col..]
            );
            split_into_lines(&new_text)
        });

        if let Some(replacement) = &new_lines {
            if replacement[..] == lines[start_row..=end_row] {
                continue;
            }
        }

        patches.push(Patch::new(start_row + 1, end_row + 2, new_lines));
    }
    patches
}

/// Splits replacement text into lines the way the patch model counts them:
/// a trailing newline does not add an empty line, and empty text is no
/// lines at all.
fn split_into_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    if lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

/// Rejects templates referencing capture groups the pattern lacks, by
/// number or by name. `$$` escapes a literal dollar and is skipped.
///
/// Follows the reference syntax of [`regex::Captures::expand`]: a bare
/// reference is the longest run of letters, digits and underscores, so
/// `$1a` names a group "1a" while `${1}a` is group 1 followed by text.
fn validate_capture_groups(regex: &Regex, template: &str) -> MendResult<()> {
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        if bytes.get(i + 1) == Some(&b'$') {
            i += 2;
            continue;
        }
        if bytes.get(i + 1) == Some(&b'{') {
            let name_start = i + 2;
            let Some(len) = bytes[name_start..].iter().position(|&b| b == b'}') else {
                return Err(MendError::invalid_pattern(format!(
                    "unclosed capture group reference in template '{}'",
                    template
                )));
            };
            check_group_reference(regex, &template[name_start..name_start + len])?;
            i = name_start + len + 1;
            continue;
        }
        let len = bytes[i + 1..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
            .count();
        if len > 0 {
            check_group_reference(regex, &template[i + 1..i + 1 + len])?;
        }
        i += 1 + len.max(1);
    }
    Ok(())
}

/// One reference out of a template, numeric or named, against what the
/// pattern defines.
fn check_group_reference(regex: &Regex, name: &str) -> MendResult<()> {
    if name.is_empty() {
        return Err(MendError::invalid_pattern(
            "empty capture group reference in template",
        ));
    }
    if name.bytes().all(|b| b.is_ascii_digit()) {
        let number: usize = name
            .parse()
            .map_err(|_| MendError::invalid_pattern("capture group reference overflow"))?;
        if number >= regex.captures_len() {
            return Err(MendError::invalid_pattern(format!(
                "capture group ${} does not exist",
                number
            )));
        }
    } else if !regex.capture_names().flatten().any(|n| n == name) {
        return Err(MendError::invalid_pattern(format!(
            "capture group ${{{}}} does not exist",
            name
        )));
    }
    Ok(())
}

/// A whole-file matcher function. Takes the file's current lines and
/// proposes patches; paths are filled in by the caller.
pub struct CustomMatcher {
    func: Box<dyn FnMut(&[String]) -> Vec<Patch>>,
}

impl CustomMatcher {
    pub fn new(func: impl FnMut(&[String]) -> Vec<Patch> + 'static) -> Self {
        Self {
            func: Box::new(func),
        }
    }

    pub fn find_patches(&mut self, lines: &[String]) -> Vec<Patch> {
        (self.func)(lines)
    }
}

impl fmt::Debug for CustomMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomMatcher")
    }
}

/// The pluggable match logic of a run: either a set of compiled pattern
/// definitions or an arbitrary function. Both produce the same shape, a
/// sorted list of [`Patch`] proposals for one file.
///
/// Patterns match per physical line by default; multiline definitions match
/// the whole joined content with dot matching newlines, and character
/// offsets are converted back to 1-based line ranges here so nothing
/// downstream thinks in bytes.
#[derive(Debug)]
pub enum Matcher {
    Patterns(PatternMatcher),
    Custom(CustomMatcher),
}

impl Matcher {
    pub fn patterns(defs: Vec<PatternDef>) -> MendResult<Self> {
        Ok(Matcher::Patterns(PatternMatcher::new(defs)?))
    }

    pub fn custom(func: impl FnMut(&[String]) -> Vec<Patch> + 'static) -> Self {
        Matcher::Custom(CustomMatcher::new(func))
    }

    /// How many pattern counters a run needs.
    pub fn pattern_count(&self) -> usize {
        match self {
            Matcher::Patterns(m) => m.pattern_count(),
            Matcher::Custom(_) => 1,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Matcher::Custom(_))
    }

    /// Whether an accepted edit invalidates this matcher's other proposals
    /// for the file, requiring a fresh scan instead of a line shift.
    pub fn rescans_after_apply(&self) -> bool {
        self.is_custom()
    }

    pub fn find_patches(&mut self, lines: &[String]) -> Vec<Patch> {
        match self {
            Matcher::Patterns(m) => m.find_patches(lines),
            Matcher::Custom(m) => m.find_patches(lines),
        }
    }
}
