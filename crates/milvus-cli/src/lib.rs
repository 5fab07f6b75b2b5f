#![allow(clippy::doc_markdown)]
//! Interactive command-line client for the Milvus vector database.
//!
//! Every command is a row of the [`registry::Registry`]: a verb, an optional
//! noun, its parameters and a handler. Handlers gather parameters from flags
//! or prompts, check them with [`validate`], call the server through
//! [`ops`], and return a [`output::View`] that the [`output::Formatter`]
//! renders as a table, JSON or CSV. [`repl`] drives the interactive loop
//! and the one-shot and script modes.
//!
//! ```no_run
//! use milvus_cli::config::CliConfig;
//! use milvus_cli::registry::Registry;
//! use milvus_cli::repl::run_line;
//! use milvus_cli::session::Session;
//! use milvus_client::RestConnector;
//!
//! let registry = Registry::standard();
//! let mut session = Session::new(Box::new(RestConnector), CliConfig::default());
//! run_line(&registry, &mut session, "connect --uri http://127.0.0.1:19530");
//! run_line(&registry, &mut session, "list collections");
//! ```

pub mod commands;
pub mod completion;
pub mod config;
pub mod cursor;
pub mod error;
pub mod history;
pub mod import;
pub mod ops;
pub mod output;
pub mod prompt;
pub mod registry;
pub mod repl;
pub mod session;
pub mod validate;

pub use error::{CliError, Result};
