//! Tab completion and syntax highlighting for the line editor.
//!
//! Both work from the command registry and the session's completion cache.
//! Neither talks to the server, and neither can fail: an unknown line yields
//! no candidates and plain text.

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow;

use crate::registry::Registry;
use crate::session::{CompletionCache, SharedCompletion};

/// Flags whose values are collection names.
const COLLECTION_FLAGS: &[&str] = &["--collection", "-c"];
/// Flags whose values are database names.
const DATABASE_FLAGS: &[&str] = &["--db", "-d", "--new_db", "--new-db"];

/// Candidates for the word ending at `pos`, with the offset it starts at.
#[must_use]
pub fn complete_line(
    registry: &Registry,
    cache: &CompletionCache,
    line: &str,
    pos: usize,
) -> (usize, Vec<String>) {
    let Some(before) = line.get(..pos) else {
        return (pos, Vec::new());
    };
    let words: Vec<&str> = before.split_whitespace().collect();
    let trailing_space = before.is_empty() || before.ends_with(char::is_whitespace);
    let (done, prefix): (&[&str], &str) = match words.split_last() {
        Some((last, rest)) if !trailing_space => (rest, last),
        _ => (&words, ""),
    };
    let start = pos - prefix.len();

    let candidates: Vec<String> = match done {
        [] => registry.verbs().iter().map(ToString::to_string).collect(),
        [verb] if !prefix.starts_with('-') && !registry.nouns(verb).is_empty() => {
            let mut nouns: Vec<String> =
                registry.nouns(verb).iter().map(ToString::to_string).collect();
            if *verb == "use" {
                nouns.clear();
                nouns.push("database".to_string());
            }
            nouns
        }
        [.., previous] if COLLECTION_FLAGS.contains(previous) => cache.collections.clone(),
        [.., previous] if DATABASE_FLAGS.contains(previous) => cache.databases.clone(),
        ["use", "database"] => cache.databases.clone(),
        [verb, rest @ ..] => {
            let noun = rest.first().copied();
            let command = noun
                .and_then(|n| registry.lookup(verb, Some(n)))
                .or_else(|| registry.lookup(verb, None));
            command.map(|c| c.flags()).unwrap_or_default()
        }
    };

    let mut matches: Vec<String> = candidates
        .into_iter()
        .filter(|c| c.starts_with(prefix))
        .collect();
    matches.dedup();
    (start, matches)
}

/// Splits a line into tokens and the whitespace between them, keeping
/// quoted strings and bracketed literals whole.
fn segments(line: &str) -> Vec<(bool, &str)> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut depth = 0_usize;
    for (i, c) in line.char_indices() {
        if in_token {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, '[' | '{') => depth += 1,
                (None, ']' | '}') => depth = depth.saturating_sub(1),
                (None, c) if c.is_whitespace() && depth == 0 => {
                    out.push((true, &line[start..i]));
                    start = i;
                    in_token = false;
                }
                _ => {}
            }
        } else if !c.is_whitespace() {
            if i > start {
                out.push((false, &line[start..i]));
            }
            start = i;
            in_token = true;
            match c {
                '"' | '\'' => quote = Some(c),
                '[' | '{' => depth = 1,
                _ => {}
            }
        }
    }
    if start < line.len() {
        out.push((in_token, &line[start..]));
    }
    out
}

/// Colors a line: verb, noun, flags and literals.
#[must_use]
pub fn highlight_line(registry: &Registry, line: &str) -> String {
    let mut out = String::with_capacity(line.len() * 2);
    let mut verb: Option<&str> = None;
    let mut index = 0;
    for (is_token, text) in segments(line) {
        if !is_token {
            out.push_str(text);
            continue;
        }
        let is_verb = !registry.nouns(text).is_empty() || registry.lookup(text, None).is_some();
        let painted = if index == 0 && is_verb {
            verb = Some(text);
            text.bold().cyan().to_string()
        } else if index == 1 && verb.is_some_and(|v| registry.nouns(v).contains(&text)) {
            text.green().to_string()
        } else if text.starts_with('-') {
            text.yellow().to_string()
        } else if text.starts_with(['"', '\'', '[', '{']) {
            text.magenta().to_string()
        } else {
            text.to_string()
        };
        out.push_str(&painted);
        index += 1;
    }
    out
}

/// Line editor helper.
pub struct ReplHelper {
    registry: Registry,
    cache: SharedCompletion,
}

impl ReplHelper {
    /// Creates a helper reading names from `cache`.
    #[must_use]
    pub fn new(registry: Registry, cache: SharedCompletion) -> Self {
        Self { registry, cache }
    }
}

impl Helper for ReplHelper {}
impl Validator for ReplHelper {}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.is_empty() {
            return Cow::Borrowed(line);
        }
        Cow::Owned(highlight_line(&self.registry, line))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let Ok(cache) = self.cache.try_borrow() else {
            return Ok((pos, Vec::new()));
        };
        let (start, words) = complete_line(&self.registry, &cache, line, pos);
        let candidates = words
            .into_iter()
            .map(|w| Pair {
                display: w.clone(),
                replacement: w,
            })
            .collect();
        Ok((start, candidates))
    }
}
