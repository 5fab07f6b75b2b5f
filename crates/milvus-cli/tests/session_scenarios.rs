//! End-to-end sessions against the in-process server.
//!
//! Each scenario drives a [`Session`] through the same `run_line` path the
//! REPL, one-shot and script modes use, and reads back what was printed.

use milvus_cli::config::CliConfig;
use milvus_cli::prompt::ScriptedPrompter;
use milvus_cli::registry::Registry;
use milvus_cli::repl::{run_line, LineStatus, LoopState, ReadOutcome, ScriptedReader, SessionLoop};
use milvus_cli::session::{Session, SharedBuffer};
use milvus_client::memory::MemoryConnector;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

const CREATE_BOOKS: &str =
    "create collection -c books -f id:INT64:primary -f title:VARCHAR:64 -f vec:FLOAT_VECTOR:2";
const INDEX_BOOKS: &str =
    "create index -c books -f vec -t HNSW -m L2 -P M:8 -P efConstruction:64";
const INSERT_BOOKS: &str = r#"insert row -c books -d '[{"id": 1, "title": "dune", "vec": [1.0, 0.0]}, {"id": 2, "title": "emma", "vec": [0.0, 1.0]}, {"id": 3, "title": "ulysses", "vec": [0.7, 0.7]}]'"#;

struct Shell {
    registry: Registry,
    session: Session,
    out: SharedBuffer,
    err: SharedBuffer,
}

impl Shell {
    fn new(connector: &MemoryConnector) -> Self {
        Self::build(connector, None)
    }

    fn interactive(connector: &MemoryConnector, answers: &[&str]) -> Self {
        Self::build(connector, Some(ScriptedPrompter::new(answers.to_vec())))
    }

    fn build(connector: &MemoryConnector, prompter: Option<ScriptedPrompter>) -> Self {
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        let mut session = Session::new(Box::new(connector.clone()), CliConfig::default())
            .with_output(Box::new(out.clone()), Box::new(err.clone()));
        if let Some(prompter) = prompter {
            session = session.with_prompter(Box::new(prompter));
        }
        Self {
            registry: Registry::standard(),
            session,
            out,
            err,
        }
    }

    fn run(&mut self, line: &str) -> LineStatus {
        run_line(&self.registry, &mut self.session, line)
    }

    fn ok(&mut self, line: &str) {
        let status = self.run(line);
        assert_eq!(status, LineStatus::Ok, "`{line}` failed: {}", self.err.contents());
    }

    /// Runs `line` with a fresh output buffer and returns what it printed.
    fn capture(&mut self, line: &str) -> String {
        self.out.clear();
        self.ok(line);
        self.out.contents()
    }

    fn json(&mut self, line: &str) -> Value {
        serde_json::from_str(self.capture(line).trim()).unwrap()
    }

    fn json_list_after(&mut self, format: &str) -> Value {
        self.ok(&format!("set output {format}"));
        self.json("list collections")
    }
}

/// Connected shell holding a loaded `books` collection with three rows.
fn books(connector: &MemoryConnector) -> Shell {
    let mut shell = Shell::new(connector);
    shell.ok("connect --uri http://localhost:19530");
    shell.ok(CREATE_BOOKS);
    shell.ok(INDEX_BOOKS);
    shell.ok("load collection -c books");
    shell.ok(INSERT_BOOKS);
    shell
}

// =============================================================================
// Connection
// =============================================================================

#[test]
fn test_connect_reports_database() {
    let mut shell = Shell::new(&MemoryConnector::new());
    let out = shell.capture("connect --uri http://localhost:19530");
    assert!(out.contains("Connected to http://localhost:19530 (database: default)"));
    assert!(shell.session.is_connected());
}

#[test]
fn test_empty_server_lists_no_collections() {
    let mut shell = Shell::new(&MemoryConnector::new());
    shell.ok("connect -uri http://127.0.0.1:19530");
    let status = shell.run("list collections");
    assert_eq!(status, LineStatus::Ok);
    assert_eq!(status.exit_code(), 0);
    assert!(shell.out.contents().contains("No data."));
}

#[test]
fn test_list_databases_as_json() {
    let mut shell = Shell::new(&MemoryConnector::new());
    shell.ok("connect -uri http://127.0.0.1:19530");
    shell.ok("set output json");
    let databases = shell.json("list databases");
    assert!(databases
        .as_array()
        .unwrap()
        .contains(&json!("default")));
}

#[test]
fn test_commands_need_a_connection() {
    let mut shell = Shell::new(&MemoryConnector::new());
    assert_eq!(shell.run("list collections"), LineStatus::Failed);
    assert!(shell.err.contents().contains("Not connected. Run `connect` first."));
}

#[test]
fn test_unreachable_server() {
    let mut shell = Shell::new(&MemoryConnector::unreachable());
    assert_eq!(shell.run("connect --uri http://nowhere:19530"), LineStatus::Failed);
    assert!(shell.err.contents().contains("Connection error!"));
    assert!(!shell.session.is_connected());
}

// =============================================================================
// Collections and indexes
// =============================================================================

#[test]
fn test_create_collection_refreshes_completion() {
    let mut shell = Shell::new(&MemoryConnector::new());
    shell.ok("connect --uri http://localhost:19530");
    let out = shell.capture(CREATE_BOOKS);
    assert!(out.contains("Create collection books successfully!"));

    let cache = shell.session.completion();
    assert_eq!(cache.borrow().collections, vec!["books".to_string()]);
    assert!(!cache.borrow().is_stale());
}

#[test]
fn test_create_collection_twice_fails() {
    let mut shell = Shell::new(&MemoryConnector::new());
    shell.ok("connect --uri http://localhost:19530");
    shell.ok(CREATE_BOOKS);
    assert_eq!(shell.run(CREATE_BOOKS), LineStatus::Failed);
    assert!(shell.err.contents().contains("Create collection error!"));
}

#[test]
fn test_bad_field_token_is_schema_error() {
    let mut shell = Shell::new(&MemoryConnector::new());
    shell.ok("connect --uri http://localhost:19530");
    let status = shell.run("create collection -c broken -f id:INT64:primary -f vec:FLOAT_VECTOR");
    assert_eq!(status, LineStatus::Failed);
    assert!(shell.err.contents().contains("Schema error on field 'vec'"));
}

#[test]
fn test_index_rejects_unknown_build_param() {
    let mut shell = Shell::new(&MemoryConnector::new());
    shell.ok("connect --uri http://localhost:19530");
    shell.ok(CREATE_BOOKS);
    let status = shell.run("create index -c books -f vec -t HNSW -m L2 -P nlist:128");
    assert_eq!(status, LineStatus::Failed);
    let err = shell.err.contents();
    assert!(err.contains("Invalid index parameter 'nlist' for HNSW"));
    assert!(err.contains("efConstruction"));
}

#[test]
fn test_rename_collection_keeps_rows() {
    let mut shell = books(&MemoryConnector::new());
    let out = shell.capture("rename collection -c books -n novels");
    assert!(out.contains("Rename collection books to novels successfully!"));

    assert_eq!(shell.json_list_after("json"), json!(["novels"]));
    assert_eq!(shell.json("get -c novels -i [1, 2]").as_array().unwrap().len(), 2);
    assert_eq!(shell.run("get -c books -i [1]"), LineStatus::Failed);
}

#[test]
fn test_flush_and_compaction_state() {
    let mut shell = books(&MemoryConnector::new());
    assert!(shell
        .capture("flush -c books")
        .contains("Flush collection books successfully!"));

    let started = shell.capture("compact -c books");
    let job_id = started
        .split("job id ")
        .nth(1)
        .map(|rest| rest.trim().trim_end_matches('.').to_string())
        .unwrap();
    assert!(job_id.parse::<i64>().is_ok());

    shell.ok("set output json");
    let state = shell.json(&format!("show compaction_state -j {job_id}"));
    assert_eq!(state["Job ID"].to_string(), job_id);
    assert_eq!(state["State"], json!("Completed"));

    assert_eq!(shell.run("compact -c ghost"), LineStatus::Failed);
}

#[test]
fn test_drop_missing_collection_is_not_found() {
    let mut shell = Shell::new(&MemoryConnector::new());
    shell.ok("connect --uri http://localhost:19530");
    assert_eq!(shell.run("delete collection -c ghost --yes"), LineStatus::Failed);
    assert!(shell.err.contents().contains("Collection 'ghost' not found"));
}

// =============================================================================
// Data
// =============================================================================

#[test]
fn test_insert_then_query() {
    let mut shell = books(&MemoryConnector::new());
    shell.ok("set output json");
    let rows = shell.json("query -c books -e 'id in [1, 3]' -o title");
    assert_eq!(
        rows,
        json!([{"id": 1, "title": "dune"}, {"id": 3, "title": "ulysses"}])
    );
}

#[test]
fn test_insert_reports_count() {
    let mut shell = Shell::new(&MemoryConnector::new());
    shell.ok("connect --uri http://localhost:19530");
    shell.ok(CREATE_BOOKS);
    shell.ok("set output json");
    let details = shell.json(r#"insert row -c books -d '{"id": 9, "title": "odyssey", "vec": [0.1, 0.2]}'"#);
    assert_eq!(details["Collection"], json!("books"));
    assert_eq!(details["Insert Count"], json!(1));
}

#[test]
fn test_search_prints_timing_after_table() {
    let mut shell = books(&MemoryConnector::new());
    let out = shell.capture("search -c books -d [1.0, 0.0] -l 2 -o title");
    let table_end = out.find("dune").unwrap();
    let footer = out.find("2 rows (").unwrap();
    assert!(footer > table_end);
    assert!(out.contains("distance"));
}

#[test]
fn test_search_results_are_ranked() {
    let mut shell = books(&MemoryConnector::new());
    shell.ok("set output json");
    let hits = shell.json("search -c books -d [0.0, 1.0] -l 2 -o title");
    let titles: Vec<&str> = hits
        .as_array()
        .unwrap()
        .iter()
        .map(|hit| hit["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["emma", "ulysses"]);
}

#[test]
fn test_hybrid_search_with_equal_weights() {
    let mut shell = books(&MemoryConnector::new());
    shell.ok("set output json");
    let hits = shell.json(
        "hybrid_search -c books -f vec -f vec -d [1.0, 0.0] -d [0.0, 1.0] -k weighted -w 0.5,0.5 -o title",
    );
    let titles: Vec<&str> = hits
        .as_array()
        .unwrap()
        .iter()
        .map(|hit| hit["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles.len(), 3);
    assert_eq!(titles[0], "ulysses");
}

#[test]
fn test_hybrid_search_rrf_and_bad_weights() {
    let mut shell = books(&MemoryConnector::new());
    shell.ok("set output json");
    let hits = shell.json("hybrid_search -c books -f vec -f vec -d [1.0, 0.0] -d [0.0, 1.0] -k rrf -l 2");
    assert_eq!(hits.as_array().unwrap().len(), 2);

    let status = shell.run(
        "hybrid_search -c books -f vec -f vec -d [1.0, 0.0] -d [0.0, 1.0] -k weighted -w 0.5",
    );
    assert_eq!(status, LineStatus::Failed);
    assert!(shell.err.contents().contains("expected 2 weights, got 1"));
}

#[test]
fn test_search_iterator_pages_in_batches() {
    let mut shell = books(&MemoryConnector::new());
    shell.ok("set output json");
    let out = shell.capture("search_iterator -c books -d [1.0, 0.0] -b 2 -o title");
    assert!(out.contains("Fetched 3 rows in 2 batches."));
    let dune = out.find("dune").unwrap();
    let emma = out.find("emma").unwrap();
    assert!(dune < emma);
}

#[test]
fn test_search_before_load_fails() {
    let mut shell = Shell::new(&MemoryConnector::new());
    shell.ok("connect --uri http://localhost:19530");
    shell.ok(CREATE_BOOKS);
    shell.ok(INDEX_BOOKS);
    assert_eq!(shell.run("search -c books -d [1.0, 0.0]"), LineStatus::Failed);
    assert!(shell.err.contents().contains("not loaded"));
}

#[test]
fn test_declined_delete_is_cancelled() {
    let connector = MemoryConnector::new();
    let mut setup = books(&connector);

    let mut shell = Shell::interactive(&connector, &["n"]);
    shell.ok("connect --uri http://localhost:19530");
    let status = shell.run("delete entities -c books -e 'id == 1'");
    assert_eq!(status, LineStatus::Cancelled);
    assert_eq!(status.exit_code(), 0);
    assert!(shell.err.contents().contains("Cancelled."));

    setup.ok("set output json");
    assert_eq!(setup.json("get -c books -i [1]").as_array().unwrap().len(), 1);
}

#[test]
fn test_cancellation_is_reported_in_json_mode() {
    let mut shell = books(&MemoryConnector::new());
    shell.ok("set output json");
    shell.out.clear();
    assert_eq!(shell.run("delete collection -c books"), LineStatus::Cancelled);
    assert!(shell.err.contents().contains("Cancelled."));
    assert!(shell.out.contents().is_empty());
}

#[test]
fn test_delete_without_terminal_needs_yes() {
    let mut shell = books(&MemoryConnector::new());
    assert_eq!(shell.run("delete ids -c books -i [1, 2]"), LineStatus::Cancelled);

    shell.ok("set output json");
    let details = shell.json("delete ids -c books -i [1, 2] --yes");
    assert_eq!(details["Delete Count"], json!(2));
    let left = shell.json("query -c books -e 'id >= 0' -o title");
    assert_eq!(left, json!([{"id": 3, "title": "ulysses"}]));
}

#[test]
fn test_query_iterator_pages_in_batches() {
    let mut shell = books(&MemoryConnector::new());
    shell.ok("set output json");
    let out = shell.capture("query_iterator -c books -e 'id >= 0' -b 2");
    assert!(out.contains("Fetched 3 rows in 2 batches."));
    assert!(out.contains("\"id\": 1"));
    assert!(out.contains("\"id\": 3"));
}

#[test]
fn test_import_csv_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("books.csv");
    fs::write(
        &path,
        "id,title,vec\n10,iliad,\"[0.3, 0.4]\"\n11,aeneid,\"[0.5, 0.6]\"\n",
    )
    .unwrap();

    let mut shell = books(&MemoryConnector::new());
    shell.ok("set output json");
    let details = shell.json(&format!("insert file -c books -f {}", path.display()));
    assert_eq!(details["Imported"], json!(2));
    assert_eq!(details["Errors"], json!(0));
    assert_eq!(shell.json("get -c books -i [10, 11]").as_array().unwrap().len(), 2);
}

// =============================================================================
// Output formats and databases
// =============================================================================

#[test]
fn test_format_switch_applies_to_later_commands() {
    let mut shell = books(&MemoryConnector::new());
    assert_eq!(shell.json_list_after("json"), json!(["books"]));

    shell.ok("set output csv");
    let csv = shell.capture("query -c books -e 'id in [1, 2]' -o title");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("id") && lines[0].contains("title"));
    assert!(!csv.contains("ms)"));
}

#[test]
fn test_unknown_format_keeps_previous() {
    let mut shell = Shell::new(&MemoryConnector::new());
    shell.ok("set output json");
    assert_eq!(shell.run("set output xml"), LineStatus::Failed);
    assert!(shell.capture("show output").contains("Output format: json"));
}

#[test]
fn test_use_database_scopes_collections() {
    let mut shell = books(&MemoryConnector::new());
    shell.ok("create database --db analytics");
    let out = shell.capture("use database analytics");
    assert!(out.contains("Using database analytics."));
    assert_eq!(
        shell.session.client().unwrap().current_database(),
        "analytics"
    );
    assert_eq!(shell.json_list_after("json"), json!([]));

    assert_eq!(shell.run("use database nope"), LineStatus::Failed);
    assert!(shell.err.contents().contains("Database 'nope' not found"));
}

// =============================================================================
// Interactive loop
// =============================================================================

#[test]
fn test_loop_survives_errors_until_exit() {
    let connector = MemoryConnector::new();
    let mut shell = Shell::new(&connector);
    let reader = ScriptedReader::new(["frobnicate", "  ", "version", "exit", "version"]);
    let mut repl = SessionLoop::new(Registry::standard(), reader);
    repl.run(&mut shell.session);

    assert_eq!(repl.state(), LoopState::Terminated);
    assert_eq!(repl.reader().history(), ["frobnicate", "version", "exit"]);
    let out = shell.out.contents();
    assert_eq!(out.matches("milvus_cli v").count(), 1);
    assert!(out.contains("Goodbye!"));
    assert!(shell.err.contents().contains("Unknown command 'frobnicate'"));
}

#[test]
fn test_loop_stops_on_interrupt() {
    let mut shell = Shell::new(&MemoryConnector::new());
    let reader = ScriptedReader::new(["version"])
        .then(ReadOutcome::Interrupted)
        .then(ReadOutcome::Line("version".to_string()));
    let mut repl = SessionLoop::new(Registry::standard(), reader);
    repl.run(&mut shell.session);

    assert_eq!(repl.state(), LoopState::Terminated);
    assert_eq!(shell.out.contents().matches("milvus_cli v").count(), 1);
}

#[test]
fn test_interactive_schema_honors_switches() {
    let connector = MemoryConnector::new();
    let answers = [
        "id", "INT64", "y", "n", "",
        "vec", "FLOAT_VECTOR", "2", "",
        "",
        "",
    ];
    let mut shell = Shell::interactive(&connector, &answers);
    shell.ok("connect --uri http://localhost:19530");
    let out = shell.capture("create collection -c notes --dynamic");
    assert!(out.contains("Create collection notes successfully!"));

    shell.ok("set output json");
    let details = shell.json("show collection -c notes");
    assert_eq!(details["Dynamic Field"], json!(true));
    assert!(details["Fields"].to_string().contains("[primary]"));
}

#[test]
fn test_interactive_prompt_fills_missing_parameters() {
    let connector = MemoryConnector::new();
    let _setup = books(&connector);
    let mut shell = Shell::interactive(&connector, &["books", "id == 2", "title", "", ""]);
    shell.ok("connect --uri http://localhost:19530");
    shell.ok("set output json");
    let rows = shell.json("query");
    assert_eq!(rows, json!([{"id": 2, "title": "emma"}]));
}
