//! Tests for the registry and dispatcher.

use super::*;
use crate::config::CliConfig;
use crate::session::SharedBuffer;
use milvus_client::memory::MemoryConnector;

fn echo(_: &mut Session, args: &Args) -> Result<View> {
    let mut parts = Vec::new();
    for name in ["collection", "expr", "yes", "name"] {
        if let Some(v) = args.get(name) {
            parts.push(format!("{name}={v}"));
        }
    }
    for field in args.all("field") {
        parts.push(format!("field={field}"));
    }
    Ok(View::message(parts.join(";")))
}

fn fail(_: &mut Session, _: &Args) -> Result<View> {
    Err(CliError::NotConnected)
}

fn registry() -> Registry {
    let mut r = Registry::new();
    r.register(
        CommandDescriptor::new("show", Some("collection"), "Show a collection", echo)
            .param(ParamSpec::value("collection", "c", "Collection name")),
    );
    r.register(
        CommandDescriptor::new("create", Some("collection"), "Create a collection", echo)
            .param(ParamSpec::value("collection", "c", "Collection name"))
            .param(ParamSpec::multi("field", "f", "Field token"))
            .param(ParamSpec::switch("yes", "y", "Skip confirmation")),
    );
    r.register(
        CommandDescriptor::new("query", None, "Query", echo)
            .param(ParamSpec::value("collection", "c", "Collection name"))
            .param(ParamSpec::value("expr", "e", "Filter")),
    );
    r.register(
        CommandDescriptor::new("use", Some("database"), "Switch database", echo)
            .param(ParamSpec::positional("name", "Database name")),
    );
    r.register(CommandDescriptor::new("list", Some("collections"), "List", fail));
    r.register(CommandDescriptor::new("exit", None, "Exit", echo));
    r.alias_verb("quit", "exit");
    r
}

fn session() -> Session {
    Session::new(Box::new(MemoryConnector::new()), CliConfig::default())
        .with_output(Box::new(SharedBuffer::new()), Box::new(SharedBuffer::new()))
}

fn message(d: Dispatch) -> String {
    match d {
        Dispatch::Done(View::Message(m)) => m,
        other => panic!("unexpected dispatch: {other:?}"),
    }
}

// =========================================================================
// Tokenizer
// =========================================================================

#[test]
fn test_tokenize_keeps_brackets_and_quotes_together() {
    assert_eq!(
        tokenize("search --data [0.1, 0.2] --expr \"id in [1, 2]\""),
        vec!["search", "--data", "[0.1, 0.2]", "--expr", "\"id in [1, 2]\""]
    );
    assert_eq!(tokenize("  a   b  "), vec!["a", "b"]);
    assert_eq!(tokenize("x {1: 0.5, 2: 0.1}"), vec!["x", "{1: 0.5, 2: 0.1}"]);
}

#[test]
fn test_tokenize_apostrophe_inside_word_is_literal() {
    assert_eq!(
        tokenize("create --description it's new -e x"),
        vec!["create", "--description", "it's", "new", "-e", "x"]
    );
    assert_eq!(
        tokenize("query -e title=='a b' -c books"),
        vec!["query", "-e", "title=='a b'", "-c", "books"]
    );
}

#[test]
fn test_unquote() {
    assert_eq!(unquote("\"abc\""), "abc");
    assert_eq!(unquote("'a b'"), "a b");
    assert_eq!(unquote("'abc\""), "'abc\"");
    assert_eq!(unquote("\""), "\"");
}

// =========================================================================
// Flag parsing
// =========================================================================

#[test]
fn test_long_short_and_single_dash_flags() {
    let r = registry();
    let mut s = session();
    assert_eq!(message(r.dispatch(&mut s, "show collection --collection books")), "collection=books");
    assert_eq!(message(r.dispatch(&mut s, "show collection -c books")), "collection=books");
    assert_eq!(message(r.dispatch(&mut s, "show collection -collection books")), "collection=books");
}

#[test]
fn test_value_flag_joins_words_until_next_flag() {
    let r = registry();
    let mut s = session();
    let out = message(r.dispatch(&mut s, "query -c books --expr year > 2000 and id < 5"));
    assert_eq!(out, "collection=books;expr=year > 2000 and id < 5");

    let out = message(r.dispatch(&mut s, "query -c books -e \"title == 'x'\""));
    assert_eq!(out, "collection=books;expr=title == 'x'");

    let out = message(r.dispatch(&mut s, "query -e it's here -c books"));
    assert_eq!(out, "collection=books;expr=it's here");

    let out = message(r.dispatch(&mut s, "query -c books -e id > -1"));
    assert!(out.ends_with("expr=id > -1"));
}

#[test]
fn test_multi_and_switch() {
    let r = registry();
    let mut s = session();
    let out = message(r.dispatch(
        &mut s,
        "create collection -c books -f id:INT64:primary vec:FLOAT_VECTOR:4 --yes",
    ));
    assert_eq!(
        out,
        "collection=books;yes=true;field=id:INT64:primary;field=vec:FLOAT_VECTOR:4"
    );
}

#[test]
fn test_positional() {
    let r = registry();
    let mut s = session();
    assert_eq!(message(r.dispatch(&mut s, "use database analytics")), "name=analytics");
    assert!(matches!(
        r.dispatch(&mut s, "use database a b"),
        Dispatch::Usage(_)
    ));
}

#[test]
fn test_args_parsed_reports_parameter_error() {
    let args = Args::from_pairs(&[("limit", "ten")]);
    assert_eq!(
        args.parsed::<u64>("limit").unwrap_err().kind(),
        "ParameterError"
    );
    assert_eq!(Args::default().parsed::<u64>("limit").unwrap(), None);
}

// =========================================================================
// Dispatch
// =========================================================================

#[test]
fn test_blank_and_comment_lines() {
    let r = registry();
    let mut s = session();
    assert!(matches!(r.dispatch(&mut s, "   "), Dispatch::Empty));
    assert!(matches!(r.dispatch(&mut s, "# note"), Dispatch::Empty));
}

#[test]
fn test_unknown_verb_and_noun_are_usage() {
    let r = registry();
    let mut s = session();
    match r.dispatch(&mut s, "frobnicate") {
        Dispatch::Usage(m) => assert!(m.contains("Unknown command")),
        other => panic!("unexpected: {other:?}"),
    }
    match r.dispatch(&mut s, "show nothing") {
        Dispatch::Usage(m) => assert!(m.contains("collection")),
        other => panic!("unexpected: {other:?}"),
    }
    match r.dispatch(&mut s, "show collection --bogus 1") {
        Dispatch::Usage(m) => assert!(m.contains("Usage: show collection")),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_noun_plural_tolerance_and_verb_alias() {
    let r = registry();
    let mut s = session();
    assert!(matches!(
        r.dispatch(&mut s, "list collection"),
        Dispatch::Failed(CliError::NotConnected)
    ));
    assert!(matches!(r.dispatch(&mut s, "QUIT"), Dispatch::Done(_)));
    assert!(r.verbs().contains(&"quit"));
}

#[test]
fn test_nouns_and_help() {
    let r = registry();
    assert_eq!(r.nouns("create"), vec!["collection"]);
    let help = r.help(Some("show"));
    assert_eq!(help.len(), 1);
    assert!(help[0].0.starts_with("show collection [--collection|-c <collection>]"));
}

#[test]
#[should_panic(expected = "registered twice")]
fn test_duplicate_registration_panics() {
    let mut r = registry();
    r.register(CommandDescriptor::new("show", Some("collection"), "again", echo));
}
