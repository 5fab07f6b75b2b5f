//! Command registry and dispatcher.
//!
//! Commands are data: a [`CommandDescriptor`] names the verb, the optional
//! noun, the parameters and the handler. The [`Registry`] tokenizes an input
//! line, picks the descriptor from the first one or two words, parses the
//! remaining words against the parameter list and runs the handler.

use std::collections::{BTreeMap, HashMap};

use crate::error::{CliError, Result};
use crate::output::View;
use crate::session::Session;

/// Command handler.
pub type Handler = fn(&mut Session, &Args) -> Result<View>;

/// How a parameter takes its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// One value; following words up to the next flag are joined with spaces.
    Value,
    /// Repeatable; every following word up to the next flag is one value.
    Multi,
    /// Boolean switch, takes no value.
    Switch,
    /// Positional word before any flag.
    Positional,
}

/// Declared parameter of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    /// Long name, e.g. `collection`.
    pub name: &'static str,
    /// Short name, e.g. `c`.
    pub short: Option<&'static str>,
    /// Value shape.
    pub kind: ParamKind,
    /// One line of help.
    pub help: &'static str,
}

impl ParamSpec {
    /// Single-value flag.
    #[must_use]
    pub const fn value(name: &'static str, short: &'static str, help: &'static str) -> Self {
        Self {
            name,
            short: Some(short),
            kind: ParamKind::Value,
            help,
        }
    }

    /// Repeatable flag.
    #[must_use]
    pub const fn multi(name: &'static str, short: &'static str, help: &'static str) -> Self {
        Self {
            name,
            short: Some(short),
            kind: ParamKind::Multi,
            help,
        }
    }

    /// Boolean switch.
    #[must_use]
    pub const fn switch(name: &'static str, short: &'static str, help: &'static str) -> Self {
        Self {
            name,
            short: Some(short),
            kind: ParamKind::Switch,
            help,
        }
    }

    /// Positional argument.
    #[must_use]
    pub const fn positional(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            short: None,
            kind: ParamKind::Positional,
            help,
        }
    }

    fn matches(&self, flag: &str) -> bool {
        let flag = flag.replace('_', "-");
        self.kind != ParamKind::Positional
            && (self.name.replace('_', "-") == flag || self.short == Some(flag.as_str()))
    }

    fn usage(&self) -> String {
        let short = self.short.map(|s| format!("|-{s}")).unwrap_or_default();
        match self.kind {
            ParamKind::Positional => format!("<{}>", self.name),
            ParamKind::Switch => format!("[--{}{short}]", self.name),
            ParamKind::Value => format!("[--{}{short} <{}>]", self.name, self.name),
            ParamKind::Multi => format!("[--{}{short} <{}>...]", self.name, self.name),
        }
    }
}

/// One registered command.
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    /// First word.
    pub verb: &'static str,
    /// Second word, if any.
    pub noun: Option<&'static str>,
    /// One line of help.
    pub about: &'static str,
    /// Declared parameters.
    pub params: Vec<ParamSpec>,
    /// Handler.
    pub handler: Handler,
}

impl CommandDescriptor {
    /// Creates a descriptor with no parameters.
    pub fn new(
        verb: &'static str,
        noun: Option<&'static str>,
        about: &'static str,
        handler: Handler,
    ) -> Self {
        Self {
            verb,
            noun,
            about,
            params: Vec::new(),
            handler,
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Full command name.
    #[must_use]
    pub fn name(&self) -> String {
        match self.noun {
            Some(noun) => format!("{} {noun}", self.verb),
            None => self.verb.to_string(),
        }
    }

    /// One-line usage.
    #[must_use]
    pub fn usage(&self) -> String {
        let mut parts = vec![self.name()];
        parts.extend(self.params.iter().map(ParamSpec::usage));
        parts.join(" ")
    }

    /// Flag spellings, for completion.
    #[must_use]
    pub fn flags(&self) -> Vec<String> {
        self.params
            .iter()
            .filter(|p| p.kind != ParamKind::Positional)
            .map(|p| format!("--{}", p.name))
            .collect()
    }

    fn parse_args(&self, tokens: &[String]) -> std::result::Result<Args, String> {
        let mut args = Args::default();
        let positionals: Vec<&ParamSpec> = self
            .params
            .iter()
            .filter(|p| p.kind == ParamKind::Positional)
            .collect();
        let mut next_positional = positionals.iter();
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            let Some(flag) = flag_name(token) else {
                let spec = next_positional
                    .next()
                    .ok_or_else(|| format!("unexpected argument '{token}'"))?;
                args.push(spec.name, unquote(token).to_string());
                i += 1;
                continue;
            };
            let spec = self
                .params
                .iter()
                .find(|p| p.matches(flag))
                .ok_or_else(|| format!("unknown flag '{token}'"))?;
            i += 1;
            let start = i;
            if spec.kind != ParamKind::Switch {
                while i < tokens.len() && flag_name(&tokens[i]).is_none() {
                    i += 1;
                }
            }
            match spec.kind {
                ParamKind::Switch => args.push(spec.name, "true".to_string()),
                ParamKind::Value if start == i => {
                    return Err(format!("flag '{token}' needs a value"));
                }
                ParamKind::Value if i - start == 1 => {
                    args.set(spec.name, unquote(&tokens[start]).to_string());
                }
                ParamKind::Value => args.set(spec.name, tokens[start..i].join(" ")),
                ParamKind::Multi => {
                    if start == i {
                        return Err(format!("flag '{token}' needs a value"));
                    }
                    for value in &tokens[start..i] {
                        args.push(spec.name, unquote(value).to_string());
                    }
                }
                ParamKind::Positional => {}
            }
        }
        Ok(args)
    }
}

/// Returns the flag name when `token` looks like `--name`, `-name` or `-n`.
fn flag_name(token: &str) -> Option<&str> {
    let name = token
        .strip_prefix("--")
        .or_else(|| token.strip_prefix('-'))?;
    name.chars()
        .next()
        .filter(char::is_ascii_alphabetic)
        .map(|_| name)
}

/// Parsed arguments of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    values: HashMap<&'static str, Vec<String>>,
}

impl Args {
    fn push(&mut self, name: &'static str, value: String) {
        self.values.entry(name).or_default().push(value);
    }

    fn set(&mut self, name: &'static str, value: String) {
        self.values.insert(name, vec![value]);
    }

    /// Builds arguments directly, for programmatic calls.
    #[must_use]
    pub fn from_pairs(pairs: &[(&'static str, &str)]) -> Self {
        let mut args = Self::default();
        for (name, value) in pairs {
            args.push(name, (*value).to_string());
        }
        args
    }

    /// Last value of a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|v| v.last())
            .map(String::as_str)
    }

    /// Every value of a repeatable parameter.
    #[must_use]
    pub fn all(&self, name: &str) -> &[String] {
        self.values.get(name).map_or(&[], Vec::as_slice)
    }

    /// Returns true when a switch was given.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Parses a value with `FromStr`.
    pub fn parsed<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.get(name)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|_| {
                    CliError::parameter(name, format!("'{raw}' is not a valid value"))
                })
            })
            .transpose()
    }
}

/// Splits a line on whitespace, keeping quoted strings and bracketed
/// literals together. Quotes are kept; see [`unquote`].
#[must_use]
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;

    for c in line.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                current.push(c);
            }
            None => match c {
                '"' | '\'' if !(c == '\'' && ends_in_word(&current)) => {
                    quote = Some(c);
                    current.push(c);
                }
                '[' | '{' | '(' => {
                    depth += 1;
                    current.push(c);
                }
                ']' | '}' | ')' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                c if c.is_whitespace() && depth == 0 => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                }
                c => current.push(c),
            },
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// An apostrophe right after a letter or digit is part of the word.
fn ends_in_word(current: &str) -> bool {
    current.chars().last().is_some_and(char::is_alphanumeric)
}

/// Removes one pair of matching surrounding quotes.
#[must_use]
pub fn unquote(token: &str) -> &str {
    for q in ['"', '\''] {
        if token.len() >= 2 && token.starts_with(q) && token.ends_with(q) {
            return &token[1..token.len() - 1];
        }
    }
    token
}

/// Result of dispatching one line.
#[derive(Debug)]
pub enum Dispatch {
    /// Blank line or comment.
    Empty,
    /// The handler succeeded.
    Done(View),
    /// The line does not name a command or its flags do not parse.
    Usage(String),
    /// The handler failed.
    Failed(CliError),
}

/// The static verb → noun tree.
#[derive(Debug, Default)]
pub struct Registry {
    commands: Vec<CommandDescriptor>,
    verb_aliases: BTreeMap<&'static str, &'static str>,
}

impl Registry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in command.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        crate::commands::register_all(&mut registry);
        registry
    }

    /// Adds a command.
    ///
    /// # Panics
    ///
    /// Panics when the (verb, noun) pair is already registered; the table is
    /// static so this is a programming error.
    pub fn register(&mut self, descriptor: CommandDescriptor) {
        assert!(
            self.lookup(descriptor.verb, descriptor.noun).is_none(),
            "command '{}' registered twice",
            descriptor.name()
        );
        let at = self
            .commands
            .partition_point(|c| (c.verb, c.noun) < (descriptor.verb, descriptor.noun));
        self.commands.insert(at, descriptor);
    }

    /// Makes `alias` an alternative spelling of `verb`.
    pub fn alias_verb(&mut self, alias: &'static str, verb: &'static str) {
        self.verb_aliases.insert(alias, verb);
    }

    fn canonical_verb<'a>(&self, verb: &'a str) -> &'a str {
        self.verb_aliases.get(verb).copied().unwrap_or(verb)
    }

    /// Looks up a command.
    #[must_use]
    pub fn lookup(&self, verb: &str, noun: Option<&str>) -> Option<&CommandDescriptor> {
        let verb = self.canonical_verb(verb);
        self.commands
            .iter()
            .find(|c| c.verb == verb && c.noun == noun)
    }

    /// Every registered command.
    pub fn commands(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.iter()
    }

    /// Verbs, aliases included, sorted.
    #[must_use]
    pub fn verbs(&self) -> Vec<&'static str> {
        let mut verbs: Vec<&'static str> = self.commands.iter().map(|c| c.verb).collect();
        verbs.extend(self.verb_aliases.keys().copied());
        verbs.sort_unstable();
        verbs.dedup();
        verbs
    }

    /// Nouns registered under a verb, sorted.
    #[must_use]
    pub fn nouns(&self, verb: &str) -> Vec<&'static str> {
        let verb = self.canonical_verb(verb);
        self.commands
            .iter()
            .filter(|c| c.verb == verb)
            .filter_map(|c| c.noun)
            .collect()
    }

    fn resolve_noun(&self, verb: &str, word: &str) -> Option<&CommandDescriptor> {
        let word = word.to_ascii_lowercase();
        let singular = word.strip_suffix('s');
        let plural = format!("{word}s");
        for noun in [Some(word.as_str()), singular, Some(plural.as_str())]
            .into_iter()
            .flatten()
        {
            if let Some(command) = self.lookup(verb, Some(noun)) {
                return Some(command);
            }
        }
        None
    }

    /// Finds the command a token list names; returns it with the argument tokens.
    pub fn resolve<'t>(
        &self,
        tokens: &'t [String],
    ) -> std::result::Result<(&CommandDescriptor, &'t [String]), String> {
        let Some(first) = tokens.first() else {
            return Err("empty command".to_string());
        };
        let verb_word = first.to_ascii_lowercase();
        let verb = self.canonical_verb(verb_word.as_str());
        let nouns = self.nouns(verb);
        if let Some(second) = tokens.get(1).filter(|t| flag_name(t).is_none()) {
            if let Some(command) = self.resolve_noun(verb, second) {
                return Ok((command, &tokens[2..]));
            }
        }
        if let Some(command) = self.lookup(verb, None) {
            return Ok((command, &tokens[1..]));
        }
        if nouns.is_empty() {
            Err(format!("Unknown command '{first}'. Type `help` for the list of commands."))
        } else {
            let given = tokens.get(1).map_or("nothing".to_string(), |t| format!("'{t}'"));
            Err(format!(
                "'{first}' expects one of [{}], got {given}",
                nouns.join(", ")
            ))
        }
    }

    /// Parses and runs one line.
    pub fn dispatch(&self, session: &mut Session, line: &str) -> Dispatch {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Dispatch::Empty;
        }
        let tokens = tokenize(trimmed);
        let (command, rest) = match self.resolve(&tokens) {
            Ok(found) => found,
            Err(message) => return Dispatch::Usage(message),
        };
        let args = match command.parse_args(rest) {
            Ok(args) => args,
            Err(message) => {
                return Dispatch::Usage(format!("{message}\nUsage: {}", command.usage()))
            }
        };
        match (command.handler)(session, &args) {
            Ok(view) => Dispatch::Done(view),
            Err(e) => Dispatch::Failed(e),
        }
    }

    /// Help text: every command, or the commands of one verb.
    #[must_use]
    pub fn help(&self, verb: Option<&str>) -> Vec<(String, String)> {
        let verb = verb.map(|v| self.canonical_verb(v).to_string());
        self.commands
            .iter()
            .filter(|c| verb.as_deref().map_or(true, |v| c.verb == v))
            .map(|c| (c.usage(), c.about.to_string()))
            .collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
