//! Session state.
//!
//! One [`Session`] lives for the whole process. It owns the live connection
//! handle, the formatter, the prompter, the persisted connection history and
//! the completion cache. Commands receive it as `&mut Session`.

use colored::Colorize;
use milvus_client::{ConnectConfig, Connector, VectorService};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use tracing::{debug, info};

use crate::config::CliConfig;
use crate::error::{CliError, Result};
use crate::history::ConnectionHistory;
use crate::output::{Formatter, OutputFormat, View};
use crate::prompt::{NonInteractivePrompter, Prompter};

/// Entity names offered by tab completion.
///
/// Refreshed after commands that may change them; never fetched while the
/// user is typing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionCache {
    /// Collections of the current database.
    pub collections: Vec<String>,
    /// Databases.
    pub databases: Vec<String>,
    stale: bool,
}

impl CompletionCache {
    /// Marks the cache for refresh.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Returns true when a refresh is pending.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.stale
    }
}

/// Completion cache shared with the line editor.
pub type SharedCompletion = Rc<RefCell<CompletionCache>>;

/// In-memory writer whose contents can be read back, used to capture
/// session output.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Discards the contents.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// The single mutable record of a CLI process.
pub struct Session {
    connector: Box<dyn Connector>,
    client: Option<Box<dyn VectorService>>,
    formatter: Formatter,
    prompter: Box<dyn Prompter>,
    config: CliConfig,
    connections: ConnectionHistory,
    completion: SharedCompletion,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
    footer: Option<String>,
    terminate: bool,
}

impl Session {
    /// Creates a disconnected session writing to stdout/stderr.
    pub fn new(connector: Box<dyn Connector>, config: CliConfig) -> Self {
        let format = OutputFormat::parse(&config.output).unwrap_or_default();
        Self {
            connector,
            client: None,
            formatter: Formatter::new(format),
            prompter: Box::new(NonInteractivePrompter),
            config,
            connections: ConnectionHistory::in_memory(),
            completion: SharedCompletion::default(),
            out: Box::new(std::io::stdout()),
            err: Box::new(std::io::stderr()),
            footer: None,
            terminate: false,
        }
    }

    /// Replaces the prompter.
    #[must_use]
    pub fn with_prompter(mut self, prompter: Box<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    /// Replaces the connection history.
    #[must_use]
    pub fn with_connections(mut self, connections: ConnectionHistory) -> Self {
        self.connections = connections;
        self
    }

    /// Redirects rendered output and diagnostics.
    #[must_use]
    pub fn with_output(mut self, out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        self.out = out;
        self.err = err;
        self
    }

    // ------------------------------------------------------------ connection

    /// Live handle, or [`CliError::NotConnected`].
    pub fn client(&self) -> Result<&dyn VectorService> {
        self.client.as_deref().ok_or(CliError::NotConnected)
    }

    /// Mutable live handle, or [`CliError::NotConnected`].
    pub fn client_mut(&mut self) -> Result<&mut (dyn VectorService + 'static)> {
        self.client.as_deref_mut().ok_or(CliError::NotConnected)
    }

    /// Returns true when a handle is held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Opens a new handle, replacing the current one only on success.
    pub fn connect(&mut self, config: &ConnectConfig) -> Result<()> {
        debug!(uri = %config.uri, db = %config.db_name, "connecting");
        let client = self
            .connector
            .connect(config)
            .map_err(|e| CliError::remote("Connect", e))?;
        info!(endpoint = client.endpoint(), db = client.current_database(), "connected");
        self.client = Some(client);
        self.completion.borrow_mut().invalidate();
        Ok(())
    }

    /// Drops the handle; returns false when there was none.
    pub fn disconnect(&mut self) -> bool {
        let had = self.client.take().is_some();
        if had {
            info!("disconnected");
        }
        let mut cache = self.completion.borrow_mut();
        cache.collections.clear();
        cache.databases.clear();
        had
    }

    /// Switches the database of the live handle.
    pub fn use_database(&mut self, name: &str) -> Result<()> {
        let client = self.client.as_deref_mut().ok_or(CliError::NotConnected)?;
        client
            .use_database(name)
            .map_err(|e| CliError::remote("Use database", e))?;
        info!(db = name, "database switched");
        self.completion.borrow_mut().invalidate();
        Ok(())
    }

    // ---------------------------------------------------------------- state

    /// Settings loaded at startup.
    #[must_use]
    pub const fn config(&self) -> &CliConfig {
        &self.config
    }

    /// Current formatter.
    #[must_use]
    pub const fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    /// Mutable formatter, for `set output`.
    pub fn formatter_mut(&mut self) -> &mut Formatter {
        &mut self.formatter
    }

    /// Prompter for missing parameters and confirmations.
    pub fn prompter(&mut self) -> &mut dyn Prompter {
        self.prompter.as_mut()
    }

    /// Returns true when prompts reach a human.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.prompter.is_interactive()
    }

    /// Saved connections.
    #[must_use]
    pub const fn connections(&self) -> &ConnectionHistory {
        &self.connections
    }

    /// Mutable saved connections.
    pub fn connections_mut(&mut self) -> &mut ConnectionHistory {
        &mut self.connections
    }

    /// Completion cache shared with the line editor.
    #[must_use]
    pub fn completion(&self) -> SharedCompletion {
        Rc::clone(&self.completion)
    }

    /// Marks cached entity names stale.
    pub fn invalidate_completion(&self) {
        self.completion.borrow_mut().invalidate();
    }

    /// Refreshes stale completion names. Failures leave the lists empty.
    pub fn refresh_completion(&self) {
        if !self.completion.borrow().is_stale() {
            return;
        }
        let (collections, databases) = match self.client.as_deref() {
            Some(client) => (
                client.list_collections().unwrap_or_else(|e| {
                    debug!(error = %e, "completion refresh failed");
                    Vec::new()
                }),
                client.list_databases().unwrap_or_default(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        let mut cache = self.completion.borrow_mut();
        cache.collections = collections;
        cache.databases = databases;
        cache.stale = false;
    }

    /// Asks the loop to stop after the current command.
    pub fn request_exit(&mut self) {
        self.terminate = true;
    }

    /// Returns true once `exit` ran.
    #[must_use]
    pub const fn should_terminate(&self) -> bool {
        self.terminate
    }

    // --------------------------------------------------------------- output

    /// Renders a view with the current format and prints it.
    pub fn emit(&mut self, view: &View) -> Result<()> {
        let text = self.formatter.render(view)?;
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    /// Prints a secondary line (timings, notes) when rendering tables.
    pub fn note(&mut self, text: &str) {
        if self.formatter.format() == OutputFormat::Table {
            let _ = writeln!(self.out, "{}", text.dimmed());
        }
    }

    /// Queues a note printed after the command's rendered result.
    pub fn set_footer(&mut self, text: impl Into<String>) {
        self.footer = Some(text.into());
    }

    /// Prints the queued footer, if any.
    pub fn flush_footer(&mut self) {
        if let Some(text) = self.footer.take() {
            self.note(&text);
        }
    }

    /// Drops the queued footer of a command that failed.
    pub fn discard_footer(&mut self) {
        self.footer = None;
    }

    /// Prints an error line.
    pub fn report_error(&mut self, err: &CliError) {
        let _ = writeln!(self.err, "{} {err}", "Error:".red().bold());
    }

    /// Prints plain text to the error stream.
    pub fn warn(&mut self, text: &str) {
        let _ = writeln!(self.err, "{}", text.yellow());
    }

    /// Raw output stream, for progress output.
    pub fn out(&mut self) -> &mut dyn Write {
        self.out.as_mut()
    }

    /// Raw error stream.
    pub fn err(&mut self) -> &mut dyn Write {
        self.err.as_mut()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connected", &self.is_connected())
            .field("format", &self.formatter.format())
            .field("terminate", &self.terminate)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use milvus_client::memory::MemoryConnector;

    fn session() -> (Session, SharedBuffer) {
        let out = SharedBuffer::new();
        let session = Session::new(Box::new(MemoryConnector::new()), CliConfig::default())
            .with_output(Box::new(out.clone()), Box::new(SharedBuffer::new()));
        (session, out)
    }

    #[test]
    fn test_client_requires_connection() {
        let (session, _) = session();
        assert!(matches!(session.client(), Err(CliError::NotConnected)));
    }

    #[test]
    fn test_connect_and_disconnect() {
        let (mut session, _) = session();
        session
            .connect(&ConnectConfig::new("http://127.0.0.1:19530"))
            .unwrap();
        assert!(session.is_connected());
        session.refresh_completion();
        assert_eq!(session.completion().borrow().databases, vec!["default"]);
        assert!(session.disconnect());
        assert!(!session.disconnect());
        assert!(session.completion().borrow().databases.is_empty());
    }

    #[test]
    fn test_failed_connect_keeps_session_disconnected() {
        let out = SharedBuffer::new();
        let mut session = Session::new(Box::new(MemoryConnector::unreachable()), CliConfig::default())
            .with_output(Box::new(out), Box::new(SharedBuffer::new()));
        let err = session
            .connect(&ConnectConfig::new("http://10.0.0.1:19530"))
            .unwrap_err();
        assert_eq!(err.kind(), "ConnectionError");
        assert!(!session.is_connected());
    }

    #[test]
    fn test_emit_uses_current_format() {
        let (mut session, out) = session();
        session.formatter_mut().set_format("json").unwrap();
        session
            .emit(&View::list("Databases", vec!["default".into()]))
            .unwrap();
        assert!(out.contents().contains("\"default\""));
    }
}
