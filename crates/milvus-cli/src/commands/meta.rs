//! Session commands: connections, output format, help.

use chrono::Utc;
use milvus_client::{ConnectConfig, TlsMode};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::error::{CliError, Result};
use crate::history::SavedConnection;
use crate::output::{OutputFormat, View};
use crate::registry::{Args, CommandDescriptor, ParamSpec, Registry};
use crate::session::Session;
use crate::validate::validate_name;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub(super) fn register(registry: &mut Registry) {
    registry.register(
        CommandDescriptor::new("connect", None, "Connect to a server", connect)
            .param(ParamSpec::value("uri", "u", "Server URI, e.g. http://127.0.0.1:19530"))
            .param(ParamSpec::value("token", "t", "Token or user:password"))
            .param(ParamSpec::value("tls", "l", "TLS mode: 0 none, 1 one-way, 2 two-way"))
            .param(ParamSpec::value("cert", "e", "Server CA certificate (PEM)"))
            .param(ParamSpec::value("client_cert", "cc", "Client certificate for two-way TLS"))
            .param(ParamSpec::value("client_key", "ck", "Client key for two-way TLS"))
            .param(ParamSpec::value("db", "d", "Database to use"))
            .param(ParamSpec::value("alias", "a", "Saved connection to reuse"))
            .param(ParamSpec::value("save_as", "s", "Save this connection under a name")),
    );
    registry.register(CommandDescriptor::new(
        "disconnect",
        None,
        "Close the current connection",
        disconnect,
    ));
    registry.register(CommandDescriptor::new(
        "version",
        None,
        "Show the CLI version",
        version,
    ));
    registry.register(CommandDescriptor::new("exit", None, "Leave the shell", exit));
    registry.alias_verb("quit", "exit");
    registry.register(
        CommandDescriptor::new("help", None, "List commands, or the commands of a verb", help)
            .param(ParamSpec::positional("verb", "Verb to describe")),
    );
    registry.register(CommandDescriptor::new("clear", None, "Clear the screen", clear));
    registry.register(
        CommandDescriptor::new("set", Some("output"), "Set the output format", set_output)
            .param(ParamSpec::positional("format", "table, json or csv")),
    );
    registry.register(CommandDescriptor::new(
        "show",
        Some("output"),
        "Show the output format",
        show_output,
    ));
    registry.register(CommandDescriptor::new(
        "list",
        Some("connections"),
        "List saved connections",
        list_connections,
    ));
    registry.register(
        CommandDescriptor::new("show", Some("connection"), "Show a saved connection", show_connection)
            .param(ParamSpec::value("alias", "a", "Saved connection name")),
    );
    registry.register(
        CommandDescriptor::new(
            "delete",
            Some("connection"),
            "Forget a saved connection",
            delete_connection,
        )
        .param(ParamSpec::value("alias", "a", "Saved connection name")),
    );
}

fn saved_alias(session: &Session, alias: &str) -> Result<SavedConnection> {
    session
        .connections()
        .get(alias)
        .cloned()
        .ok_or_else(|| CliError::NotFound {
            kind: "Connection",
            name: alias.to_string(),
        })
}

fn save_connections(session: &mut Session) {
    if let Err(e) = session.connections().save() {
        warn!(error = %e, "cannot save connection history");
        session.warn(&format!("Connection history not saved: {e}"));
    }
}

fn connect(session: &mut Session, args: &Args) -> Result<View> {
    let saved = args
        .get("alias")
        .map(|alias| saved_alias(session, alias))
        .transpose()?;
    let defaults = session.config().clone();

    let uri = args
        .get("uri")
        .map(str::to_string)
        .or_else(|| saved.as_ref().map(|s| s.uri.clone()))
        .unwrap_or(defaults.uri);
    let token = args
        .get("token")
        .map(str::to_string)
        .or_else(|| saved.as_ref().and_then(|s| s.token.clone()))
        .or(defaults.token);
    let level = match args.parsed::<u8>("tls")? {
        Some(level) => level,
        None => saved.as_ref().map_or(0, |s| s.tls),
    };
    let tls = TlsMode::from_level(level)
        .ok_or_else(|| CliError::parameter("tls", format!("{level} is not one of [0, 1, 2]")))?;
    let cert_path = args
        .get("cert")
        .map(PathBuf::from)
        .or_else(|| saved.as_ref().and_then(|s| s.cert_path.clone()));
    let client_cert = args.get("client_cert").map(PathBuf::from);
    let client_key = args.get("client_key").map(PathBuf::from);
    if tls == TlsMode::TwoWay && (client_cert.is_none() || client_key.is_none()) {
        return Err(CliError::parameter(
            "tls",
            "two-way TLS needs --client-cert and --client-key",
        ));
    }
    let db_name = args
        .get("db")
        .map(str::to_string)
        .or_else(|| saved.as_ref().and_then(|s| s.db_name.clone()))
        .unwrap_or(defaults.db_name);

    let config = ConnectConfig {
        uri: uri.clone(),
        token: token.clone(),
        tls,
        cert_path: cert_path.clone(),
        client_cert,
        client_key,
        db_name: db_name.clone(),
        timeout: Duration::from_secs(defaults.timeout_secs),
    };
    session.connect(&config)?;

    if let Some(alias) = args.get("alias") {
        session.connections_mut().touch(alias);
        save_connections(session);
    }
    if let Some(name) = args.get("save_as") {
        validate_name("connection alias", name)?;
        session.connections_mut().record(
            name,
            SavedConnection {
                uri: uri.clone(),
                token,
                tls: tls.level(),
                cert_path,
                db_name: Some(db_name.clone()),
                last_used: Utc::now(),
            },
        );
        save_connections(session);
    }
    Ok(View::message(format!(
        "Connected to {uri} (database: {db_name})"
    )))
}

fn disconnect(session: &mut Session, _args: &Args) -> Result<View> {
    Ok(View::message(if session.disconnect() {
        "Disconnected."
    } else {
        "Not connected."
    }))
}

fn version(_session: &mut Session, _args: &Args) -> Result<View> {
    Ok(View::message(format!("milvus_cli v{VERSION}")))
}

fn exit(session: &mut Session, _args: &Args) -> Result<View> {
    session.request_exit();
    Ok(View::message(""))
}

fn help(_session: &mut Session, args: &Args) -> Result<View> {
    let registry = Registry::standard();
    let verb = args.get("verb");
    let entries = registry.help(verb);
    if entries.is_empty() {
        return Err(CliError::parameter(
            "verb",
            format!(
                "'{}' is not a command, try one of [{}]",
                verb.unwrap_or_default(),
                registry.verbs().join(", ")
            ),
        ));
    }
    let rows = entries
        .into_iter()
        .map(|(usage, about)| {
            let mut row = milvus_client::Row::new();
            row.insert("Command".to_string(), Value::from(usage));
            row.insert("Description".to_string(), Value::from(about));
            row
        })
        .collect();
    Ok(View::Rows {
        headers: vec!["Command".to_string(), "Description".to_string()],
        rows,
    })
}

fn clear(_session: &mut Session, _args: &Args) -> Result<View> {
    console::Term::stdout().clear_screen()?;
    Ok(View::message(""))
}

fn set_output(session: &mut Session, args: &Args) -> Result<View> {
    let names: Vec<&str> = OutputFormat::ALL.iter().map(|f| f.as_str()).collect();
    let name = match args.get("format") {
        Some(name) => name.to_string(),
        None if session.is_interactive() => {
            let index = session.prompter().select("Output format", &names, 0)?;
            names.get(index).copied().unwrap_or("table").to_string()
        }
        None => {
            return Err(CliError::parameter(
                "format",
                format!("is required, one of [{}]", names.join(", ")),
            ))
        }
    };
    let format = session.formatter_mut().set_format(&name)?;
    Ok(View::message(format!("Output format set to {format}.")))
}

fn show_output(session: &mut Session, _args: &Args) -> Result<View> {
    Ok(View::message(format!(
        "Output format: {}",
        session.formatter().format()
    )))
}

fn list_connections(session: &mut Session, _args: &Args) -> Result<View> {
    let rows = session
        .connections()
        .iter()
        .map(|(alias, saved)| {
            let mut row = milvus_client::Row::new();
            row.insert("Alias".to_string(), Value::from(alias.as_str()));
            row.insert("URI".to_string(), Value::from(saved.uri.as_str()));
            row.insert("TLS".to_string(), Value::from(saved.tls));
            row.insert(
                "Database".to_string(),
                Value::from(saved.db_name.clone().unwrap_or_default()),
            );
            row.insert(
                "Last Used".to_string(),
                Value::from(saved.last_used.to_rfc3339()),
            );
            row
        })
        .collect();
    Ok(View::rows(rows))
}

fn show_connection(session: &mut Session, args: &Args) -> Result<View> {
    let alias = super::ask(session, args, "alias", "Saved connection name")?;
    let saved = saved_alias(session, &alias)?;
    Ok(View::details(vec![
        ("Alias".to_string(), Value::from(alias)),
        ("URI".to_string(), Value::from(saved.uri)),
        (
            "Token".to_string(),
            Value::from(if saved.token.is_some() { "<set>" } else { "" }),
        ),
        ("TLS".to_string(), Value::from(saved.tls)),
        (
            "Certificate".to_string(),
            Value::from(
                saved
                    .cert_path
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
        ),
        (
            "Database".to_string(),
            Value::from(saved.db_name.unwrap_or_default()),
        ),
        ("Last Used".to_string(), Value::from(saved.last_used.to_rfc3339())),
    ]))
}

fn delete_connection(session: &mut Session, args: &Args) -> Result<View> {
    let alias = super::ask(session, args, "alias", "Saved connection name")?;
    if !session.connections_mut().remove(&alias) {
        return Err(CliError::NotFound {
            kind: "Connection",
            name: alias,
        });
    }
    save_connections(session);
    Ok(View::message(format!("Deleted saved connection {alias}.")))
}
