#![allow(clippy::doc_markdown)]
//! `milvus_cli` - interactive client for the Milvus vector database
//!
//! Usage:
//!   `milvus_cli`                                  start the REPL
//!   `milvus_cli --uri http://host:19530 list collections`
//!   `milvus_cli --script setup.milvus --continue-on-error`

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use milvus_cli::config::{CliConfig, Paths};
use milvus_cli::history::ConnectionHistory;
use milvus_cli::output::OutputFormat;
use milvus_cli::prompt::DialoguerPrompter;
use milvus_cli::registry::Registry;
use milvus_cli::repl::{join_words, run_line, run_script, EditorReader, SessionLoop};
use milvus_cli::session::Session;
use milvus_client::RestConnector;

#[derive(Parser)]
#[command(name = "milvus_cli")]
#[command(author, version, about = "Interactive command-line client for Milvus")]
struct Cli {
    /// Output format (table, json, csv)
    #[arg(long, value_parser = parse_format)]
    format: Option<OutputFormat>,

    /// Connect to this server before running
    #[arg(long, env = "MILVUS_URI")]
    uri: Option<String>,

    /// Token or user:password
    #[arg(long, env = "MILVUS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Database to use after connecting
    #[arg(long)]
    db: Option<String>,

    /// Run the commands of a file, one per line
    #[arg(long, conflicts_with = "command")]
    script: Option<PathBuf>,

    /// Keep running a script after a failed line
    #[arg(long, requires = "script")]
    continue_on_error: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Do not read or write the line history
    #[arg(long)]
    no_history: bool,

    /// One command to run, e.g. `list collections`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn parse_format(raw: &str) -> Result<OutputFormat, String> {
    OutputFormat::parse(raw).ok_or_else(|| format!("'{raw}' is not one of table, json, csv"))
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn auto_connect_line(cli: &Cli) -> Option<String> {
    let uri = cli.uri.as_deref()?;
    let mut words = vec!["connect", "--uri", uri];
    if let Some(token) = cli.token.as_deref() {
        words.extend(["--token", token]);
    }
    if let Some(db) = cli.db.as_deref() {
        words.extend(["--db", db]);
    }
    Some(join_words(&words))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let paths = Paths::from_env();
    if let Err(e) = paths.ensure_home() {
        warn!(error = %e, "cannot create the CLI home directory");
    }
    let config = CliConfig::load(&paths);
    let connections = ConnectionHistory::load(&paths.connections_file());
    let interactive = cli.script.is_none() && cli.command.is_empty();

    let mut session = Session::new(Box::new(RestConnector), config).with_connections(connections);
    if interactive {
        session = session.with_prompter(Box::new(DialoguerPrompter::new()));
    }
    if let Some(format) = cli.format {
        session.formatter_mut().set_format(format.as_str())?;
    }

    let registry = Registry::standard();
    if let Some(line) = auto_connect_line(&cli) {
        let status = run_line(&registry, &mut session, &line);
        if !interactive && status.exit_code() != 0 {
            std::process::exit(status.exit_code());
        }
    }

    if let Some(path) = &cli.script {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        let code = run_script(&registry, &mut session, text.lines(), cli.continue_on_error);
        std::process::exit(code);
    }

    if !cli.command.is_empty() {
        let status = run_line(&registry, &mut session, &join_words(&cli.command));
        std::process::exit(status.exit_code());
    }

    let history = (!cli.no_history).then(|| paths.history_file());
    let reader = EditorReader::new(Registry::standard(), session.completion(), history)?;
    SessionLoop::new(registry, reader).run(&mut session);
    Ok(())
}
