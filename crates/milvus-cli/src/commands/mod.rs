//! Built-in commands.
//!
//! Each submodule registers the commands of one area. Handlers read their
//! parameters from [`Args`]; a parameter that was not given is prompted for
//! when the session is interactive and is an error otherwise. Both paths end
//! in the same [`crate::ops`] call.

mod alias;
mod collection;
mod data;
mod database;
mod index;
mod meta;
mod partition;
mod rbac;
mod resource_group;

use instant::Instant;
use std::str::FromStr;

use crate::error::{CliError, Result};
use crate::registry::{Args, ParamSpec, Registry};
use crate::session::Session;

/// Registers every built-in command.
pub fn register_all(registry: &mut Registry) {
    meta::register(registry);
    database::register(registry);
    collection::register(registry);
    partition::register(registry);
    index::register(registry);
    alias::register(registry);
    rbac::register(registry);
    resource_group::register(registry);
    data::register(registry);
}

pub(crate) const YES: ParamSpec = ParamSpec::switch("yes", "y", "Skip the confirmation prompt");
pub(crate) const COLLECTION: ParamSpec = ParamSpec::value("collection", "c", "Collection name");
pub(crate) const PARTITION: ParamSpec = ParamSpec::value("partition", "p", "Partition name");

fn missing(name: &str) -> CliError {
    CliError::parameter(
        name,
        format!("is required, pass --{}", name.replace('_', "-")),
    )
}

/// Fails fast with [`CliError::NotConnected`] before any prompt is shown.
pub(crate) fn connected(session: &Session) -> Result<()> {
    session.client().map(|_| ())
}

/// Required text parameter.
pub(crate) fn ask(session: &mut Session, args: &Args, name: &str, prompt: &str) -> Result<String> {
    let value = match args.get(name) {
        Some(v) => v.to_string(),
        None if session.is_interactive() => session.prompter().input(prompt, None)?,
        None => return Err(missing(name)),
    };
    let value = value.trim();
    if value.is_empty() {
        return Err(missing(name));
    }
    Ok(value.to_string())
}

/// Text parameter with a default.
pub(crate) fn ask_or(
    session: &mut Session,
    args: &Args,
    name: &str,
    prompt: &str,
    default: &str,
) -> Result<String> {
    match args.get(name) {
        Some(v) => Ok(v.trim().to_string()),
        None if session.is_interactive() => Ok(session
            .prompter()
            .input(prompt, Some(default))?
            .trim()
            .to_string()),
        None => Ok(default.to_string()),
    }
}

/// Optional text parameter; an empty answer means absent.
pub(crate) fn ask_optional(
    session: &mut Session,
    args: &Args,
    name: &str,
    prompt: &str,
) -> Result<Option<String>> {
    let raw = ask_or(session, args, name, prompt, "")?;
    Ok(Some(raw).filter(|v| !v.is_empty()))
}

/// Parsed parameter with a default.
pub(crate) fn ask_parsed<T>(
    session: &mut Session,
    args: &Args,
    name: &str,
    prompt: &str,
    default: T,
) -> Result<T>
where
    T: FromStr + ToString,
{
    let raw = ask_or(session, args, name, prompt, &default.to_string())?;
    raw.parse::<T>()
        .map_err(|_| CliError::parameter(name, format!("'{raw}' is not a valid value")))
}

/// One value out of a closed set. `default` is used by non-interactive runs.
pub(crate) fn choose(
    session: &mut Session,
    args: &Args,
    name: &str,
    prompt: &str,
    items: &[&str],
    default: Option<usize>,
) -> Result<String> {
    if let Some(given) = args.get(name) {
        let given = given.trim();
        return items
            .iter()
            .find(|item| item.eq_ignore_ascii_case(given))
            .map(|item| (*item).to_string())
            .ok_or_else(|| {
                CliError::parameter(
                    name,
                    format!("'{given}' is not one of [{}]", items.join(", ")),
                )
            });
    }
    if !session.is_interactive() {
        return default
            .and_then(|i| items.get(i))
            .map(|item| (*item).to_string())
            .ok_or_else(|| missing(name));
    }
    let index = session
        .prompter()
        .select(prompt, items, default.unwrap_or(0))?;
    items
        .get(index)
        .map(|item| (*item).to_string())
        .ok_or_else(|| missing(name))
}

/// Repeated `key:value` parameter. Interactive sessions are asked for
/// pairs until an empty answer.
pub(crate) fn ask_pairs(
    session: &mut Session,
    args: &Args,
    name: &str,
    prompt: &str,
) -> Result<Vec<String>> {
    if !args.all(name).is_empty() || !session.is_interactive() {
        return Ok(args.all(name).to_vec());
    }
    let prompt = format!("{prompt} (empty to finish)");
    let mut pairs = Vec::new();
    loop {
        let raw = session.prompter().input(&prompt, Some(""))?;
        if raw.trim().is_empty() {
            return Ok(pairs);
        }
        pairs.push(raw.trim().to_string());
    }
}

/// Secret parameter, read without echo when prompted.
pub(crate) fn ask_password(
    session: &mut Session,
    args: &Args,
    name: &str,
    prompt: &str,
) -> Result<String> {
    match args.get(name) {
        Some(v) => Ok(v.to_string()),
        None if session.is_interactive() => session.prompter().password(prompt),
        None => Err(missing(name)),
    }
}

/// Yes/no parameter given as a switch, prompted otherwise.
pub(crate) fn ask_switch(
    session: &mut Session,
    args: &Args,
    name: &str,
    prompt: &str,
) -> Result<bool> {
    if args.flag(name) {
        return Ok(true);
    }
    if session.is_interactive() {
        session.prompter().confirm(prompt, false)
    } else {
        Ok(false)
    }
}

/// Confirmation gate of destructive commands. Declining cancels.
pub(crate) fn confirm(session: &mut Session, args: &Args, question: &str) -> Result<()> {
    if args.flag("yes") || !session.config().confirm_destructive {
        return Ok(());
    }
    if session.prompter().confirm(question, false)? {
        Ok(())
    } else {
        Err(CliError::Cancelled)
    }
}

/// Queues the row count and elapsed time under the result.
pub(crate) fn report_timing(session: &mut Session, rows: usize, start: Instant) {
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    session.set_footer(format!("{rows} rows ({elapsed_ms:.2}ms)"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliConfig;
    use crate::prompt::ScriptedPrompter;
    use crate::session::SharedBuffer;
    use milvus_client::memory::MemoryConnector;

    fn session(answers: &[&str]) -> Session {
        let session = Session::new(Box::new(MemoryConnector::new()), CliConfig::default())
            .with_output(Box::new(SharedBuffer::new()), Box::new(SharedBuffer::new()));
        if answers.is_empty() {
            session
        } else {
            session.with_prompter(Box::new(ScriptedPrompter::new(answers.to_vec())))
        }
    }

    #[test]
    fn test_ask_prefers_flag_then_prompt() {
        let mut s = session(&["prompted"]);
        let args = Args::from_pairs(&[("collection", " books ")]);
        assert_eq!(ask(&mut s, &args, "collection", "Collection").unwrap(), "books");
        assert_eq!(
            ask(&mut s, &Args::default(), "collection", "Collection").unwrap(),
            "prompted"
        );
    }

    #[test]
    fn test_missing_parameter_when_not_interactive() {
        let mut s = session(&[]);
        let err = ask(&mut s, &Args::default(), "index_name", "Index name").unwrap_err();
        assert_eq!(err.kind(), "ParameterError");
        assert!(err.to_string().contains("--index-name"));
        assert_eq!(
            ask_or(&mut s, &Args::default(), "limit", "Limit", "10").unwrap(),
            "10"
        );
    }

    #[test]
    fn test_choose_validates_given_value() {
        let mut s = session(&[]);
        let items = ["L2", "IP", "COSINE"];
        let args = Args::from_pairs(&[("metric", "ip")]);
        assert_eq!(choose(&mut s, &args, "metric", "Metric", &items, None).unwrap(), "IP");
        let args = Args::from_pairs(&[("metric", "dot")]);
        let err = choose(&mut s, &args, "metric", "Metric", &items, None).unwrap_err();
        assert!(err.to_string().contains("L2, IP, COSINE"));
        assert_eq!(
            choose(&mut s, &Args::default(), "metric", "Metric", &items, Some(2)).unwrap(),
            "COSINE"
        );
    }

    #[test]
    fn test_confirm_gate() {
        let mut s = session(&["n", "y"]);
        assert!(matches!(
            confirm(&mut s, &Args::default(), "Drop?"),
            Err(CliError::Cancelled)
        ));
        assert!(confirm(&mut s, &Args::default(), "Drop?").is_ok());
        let mut s = session(&[]);
        assert!(confirm(&mut s, &Args::from_pairs(&[("yes", "true")]), "Drop?").is_ok());
        assert!(confirm(&mut s, &Args::default(), "Drop?").unwrap_err().is_cancelled());
    }

    #[test]
    fn test_ask_parsed_rejects_garbage() {
        let mut s = session(&[]);
        let args = Args::from_pairs(&[("limit", "many")]);
        assert!(ask_parsed(&mut s, &args, "limit", "Limit", 10_u64).is_err());
        assert_eq!(
            ask_parsed(&mut s, &Args::default(), "limit", "Limit", 10_u64).unwrap(),
            10
        );
    }
}
