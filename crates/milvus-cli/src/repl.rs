//! Read-eval-print loop, plus the one-shot and script runners that share
//! its per-line execution.

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Editor;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::completion::ReplHelper;
use crate::error::{CliError, Result};
use crate::output::View;
use crate::registry::{Dispatch, Registry};
use crate::session::{Session, SharedCompletion};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What a read attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A line, without its terminator.
    Line(String),
    /// Ctrl-C.
    Interrupted,
    /// Closed input.
    Eof,
}

/// Source of input lines.
pub trait LineReader {
    /// Reads one line after showing `prompt`.
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    /// Records a non-blank line in the history.
    fn add_history(&mut self, _line: &str) {}
}

/// Line editor with completion, highlighting and a history file.
pub struct EditorReader {
    editor: Editor<ReplHelper, FileHistory>,
    history_path: Option<PathBuf>,
}

impl EditorReader {
    /// Creates the editor. A missing or unreadable history file starts an
    /// empty history.
    pub fn new(
        registry: Registry,
        completion: SharedCompletion,
        history_path: Option<PathBuf>,
    ) -> Result<Self> {
        let mut editor: Editor<ReplHelper, FileHistory> = Editor::new()
            .map_err(|e| CliError::Config(format!("cannot start the line editor: {e}")))?;
        editor.set_helper(Some(ReplHelper::new(registry, completion)));
        if let Some(path) = &history_path {
            if path.exists() {
                if let Err(e) = editor.load_history(path) {
                    warn!(path = %path.display(), error = %e, "history unreadable, starting empty");
                    editor.clear_history().ok();
                }
            }
        }
        Ok(Self {
            editor,
            history_path,
        })
    }
}

impl LineReader for EditorReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(ReadlineError::Io(e)) => Err(CliError::Io(e)),
            Err(e) => Err(CliError::Config(format!("line editor failed: {e}"))),
        }
    }

    fn add_history(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
        if let Some(path) = &self.history_path {
            if let Err(e) = self.editor.append_history(path) {
                debug!(path = %path.display(), error = %e, "history not saved");
            }
        }
    }
}

/// Reader over a fixed list of outcomes, for scripted sessions.
#[derive(Debug, Default)]
pub struct ScriptedReader {
    outcomes: VecDeque<ReadOutcome>,
    history: Vec<String>,
}

impl ScriptedReader {
    /// Reads `lines` in order, then reports end of input.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            outcomes: lines.into_iter().map(|l| ReadOutcome::Line(l.into())).collect(),
            history: Vec::new(),
        }
    }

    /// Queues an outcome.
    #[must_use]
    pub fn then(mut self, outcome: ReadOutcome) -> Self {
        self.outcomes.push_back(outcome);
        self
    }

    /// Lines recorded in the history.
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl LineReader for ScriptedReader {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome> {
        Ok(self.outcomes.pop_front().unwrap_or(ReadOutcome::Eof))
    }

    fn add_history(&mut self, line: &str) {
        self.history.push(line.to_string());
    }
}

/// Outcome of one executed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    /// Blank line or comment.
    Empty,
    /// The command succeeded.
    Ok,
    /// The user declined or aborted.
    Cancelled,
    /// Unknown command or malformed arguments.
    Usage,
    /// The command failed.
    Failed,
}

impl LineStatus {
    /// Process exit status for a one-shot run.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Empty | Self::Ok | Self::Cancelled => 0,
            Self::Failed => 1,
            Self::Usage => 2,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Runs one line against the session and prints its outcome. Never fails:
/// errors, and panics in handlers, are printed to the error stream.
pub fn run_line(registry: &Registry, session: &mut Session, line: &str) -> LineStatus {
    let outcome = catch_unwind(AssertUnwindSafe(|| registry.dispatch(session, line)));
    let status = match outcome {
        Err(payload) => {
            session.discard_footer();
            let message = panic_message(payload.as_ref());
            let _ = writeln!(session.err(), "{} internal error: {message}", "Error:".red().bold());
            LineStatus::Failed
        }
        Ok(Dispatch::Empty) => LineStatus::Empty,
        Ok(Dispatch::Usage(message)) => {
            session.warn(&message);
            LineStatus::Usage
        }
        Ok(Dispatch::Failed(err)) if err.is_cancelled() => {
            session.discard_footer();
            session.warn("Cancelled.");
            LineStatus::Cancelled
        }
        Ok(Dispatch::Failed(err)) => {
            session.discard_footer();
            session.report_error(&err);
            LineStatus::Failed
        }
        Ok(Dispatch::Done(view)) => {
            let silent = matches!(&view, View::Message(m) if m.is_empty());
            match if silent { Ok(()) } else { session.emit(&view) } {
                Ok(()) => {
                    session.flush_footer();
                    LineStatus::Ok
                }
                Err(err) => {
                    session.discard_footer();
                    session.report_error(&err);
                    LineStatus::Failed
                }
            }
        }
    };
    session.refresh_completion();
    status
}

/// Runs script lines in order. Blank lines and `#` comments are skipped.
/// Stops at the first failure unless `continue_on_error` is set, and after
/// `exit`. Returns the exit status of the worst line.
pub fn run_script<'a, I>(
    registry: &Registry,
    session: &mut Session,
    lines: I,
    continue_on_error: bool,
) -> i32
where
    I: IntoIterator<Item = &'a str>,
{
    let mut worst = 0;
    for line in lines {
        let status = run_line(registry, session, line);
        worst = worst.max(status.exit_code());
        if session.should_terminate() || (status.exit_code() != 0 && !continue_on_error) {
            break;
        }
    }
    worst
}

/// Joins shell words into one command line, quoting words with spaces.
#[must_use]
pub fn join_words<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(|w| {
            let w = w.as_ref();
            let literal = w.starts_with(['[', '{', '"', '\'']);
            if w.chars().any(char::is_whitespace) && !literal {
                if w.contains('"') {
                    format!("'{w}'")
                } else {
                    format!("\"{w}\"")
                }
            } else {
                w.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// States of the interactive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Created, banner not printed yet.
    Idle,
    /// Waiting for a line.
    AwaitingInput,
    /// Running a command.
    Dispatching,
    /// Finished; absorbing.
    Terminated,
}

/// Interactive loop over a [`LineReader`].
pub struct SessionLoop<R> {
    registry: Registry,
    reader: R,
    state: LoopState,
}

impl<R: LineReader> SessionLoop<R> {
    /// Creates an idle loop.
    pub fn new(registry: Registry, reader: R) -> Self {
        Self {
            registry,
            reader,
            state: LoopState::Idle,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// The reader, e.g. to inspect a scripted history.
    #[must_use]
    pub const fn reader(&self) -> &R {
        &self.reader
    }

    fn banner(session: &mut Session) {
        let out = session.out();
        let _ = writeln!(
            out,
            "\n{}",
            format!("Milvus CLI v{VERSION}").bold().cyan()
        );
        let _ = writeln!(
            out,
            "Type {} for commands, {} to quit\n",
            "help".yellow(),
            "exit".yellow()
        );
    }

    fn prompt(session: &Session) -> String {
        let label = match session.client() {
            Ok(client) => format!("milvus_cli ({})> ", client.current_database()),
            Err(_) => "milvus_cli > ".to_string(),
        };
        label.bold().blue().to_string()
    }

    /// Runs until `exit`, Ctrl-C or end of input.
    pub fn run(&mut self, session: &mut Session) {
        if self.state == LoopState::Terminated {
            return;
        }
        Self::banner(session);
        loop {
            self.state = LoopState::AwaitingInput;
            let line = match self.reader.read_line(&Self::prompt(session)) {
                Ok(ReadOutcome::Line(line)) => line,
                Ok(ReadOutcome::Interrupted | ReadOutcome::Eof) => break,
                Err(err) => {
                    session.report_error(&err);
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.reader.add_history(line);
            self.state = LoopState::Dispatching;
            run_line(&self.registry, session, line);
            if session.should_terminate() {
                break;
            }
        }
        self.state = LoopState::Terminated;
        let _ = writeln!(session.out(), "Goodbye!");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(LineStatus::Ok.exit_code(), 0);
        assert_eq!(LineStatus::Cancelled.exit_code(), 0);
        assert_eq!(LineStatus::Failed.exit_code(), 1);
        assert_eq!(LineStatus::Usage.exit_code(), 2);
    }

    #[test]
    fn test_join_words_quotes_spaces() {
        assert_eq!(join_words(&["list", "collections"]), "list collections");
        assert_eq!(
            join_words(&["query", "-e", "id > 3"]),
            "query -e \"id > 3\""
        );
        assert_eq!(
            join_words(&["query", "-e", "title == \"a b\""]),
            "query -e 'title == \"a b\"'"
        );
        assert_eq!(join_words(&["search", "-d", "[0.1, 0.2]"]), "search -d [0.1, 0.2]");
    }

    #[test]
    fn test_scripted_reader_ends_with_eof() {
        let mut reader = ScriptedReader::new(["version"]).then(ReadOutcome::Interrupted);
        assert_eq!(
            reader.read_line("> ").unwrap(),
            ReadOutcome::Line("version".to_string())
        );
        assert_eq!(reader.read_line("> ").unwrap(), ReadOutcome::Interrupted);
        assert_eq!(reader.read_line("> ").unwrap(), ReadOutcome::Eof);
    }

    #[test]
    fn test_panic_message_extracts_text() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
