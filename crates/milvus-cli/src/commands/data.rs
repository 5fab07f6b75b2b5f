//! Data plane: writes, deletes, queries, searches and their cursors.

use instant::Instant;
use milvus_client::{
    CollectionInfo, FieldSchema, HybridSearchRequest, MutationResult, QueryRequest,
    Row, SearchRequest,
};
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;

use crate::cursor::Cursor;
use crate::error::{CliError, Result};
use crate::import::{import_csv, ImportConfig};
use crate::ops::{DataOps, IndexOps};
use crate::output::{view_from_value, View};
use crate::registry::{Args, CommandDescriptor, ParamSpec, Registry};
use crate::session::Session;
use crate::validate::{
    normalize_ann_request, normalize_query_request, normalize_search_request, parse_field_value,
    parse_ids, parse_ranker, QueryInput, SearchInput,
};

use super::{
    ask, ask_optional, ask_or, ask_pairs, ask_parsed, choose, confirm, connected, report_timing,
    COLLECTION, PARTITION, YES,
};

const EXPR: ParamSpec = ParamSpec::value("expr", "e", "Boolean filter expression");
const OUTPUT_FIELDS: ParamSpec =
    ParamSpec::value("output_fields", "o", "Comma separated fields to return");
const LIMIT: ParamSpec = ParamSpec::value("limit", "l", "Maximum number of results");
const OFFSET: ParamSpec = ParamSpec::value("offset", "s", "Results to skip");
const IDS: ParamSpec = ParamSpec::value("ids", "i", "Primary keys, e.g. [1, 2] or a,b");
const GUARANTEE_TS: ParamSpec =
    ParamSpec::value("guarantee_timestamp", "g", "Consistency timestamp");
const BATCH_SIZE: ParamSpec = ParamSpec::value("batch_size", "b", "Rows per batch");

const DEFAULT_SEARCH_LIMIT: u64 = 10;

pub(super) fn register(registry: &mut Registry) {
    for (verb, about, handler) in [
        ("insert", "Insert one row", insert_row as crate::registry::Handler),
        ("upsert", "Insert or replace one row", upsert_row),
    ] {
        registry.register(
            CommandDescriptor::new(verb, Some("row"), about, handler)
                .param(COLLECTION)
                .param(PARTITION)
                .param(ParamSpec::value("data", "d", "Row as a JSON object, or an array of them")),
        );
    }
    for (verb, about, handler) in [
        ("insert", "Insert the rows of a CSV file", insert_file as crate::registry::Handler),
        ("upsert", "Upsert the rows of a CSV file", upsert_file),
    ] {
        registry.register(
            CommandDescriptor::new(verb, Some("file"), about, handler)
                .param(COLLECTION)
                .param(PARTITION)
                .param(ParamSpec::value("file", "f", "CSV file with a header row"))
                .param(BATCH_SIZE),
        );
    }
    registry.register(
        CommandDescriptor::new(
            "delete",
            Some("entities"),
            "Delete entities matching a filter",
            delete_entities,
        )
        .param(COLLECTION)
        .param(PARTITION)
        .param(EXPR)
        .param(YES),
    );
    registry.register(
        CommandDescriptor::new("delete", Some("ids"), "Delete entities by primary key", delete_ids)
            .param(COLLECTION)
            .param(PARTITION)
            .param(IDS)
            .param(YES),
    );
    registry.register(
        CommandDescriptor::new("get", None, "Fetch entities by primary key", get)
            .param(COLLECTION)
            .param(IDS)
            .param(OUTPUT_FIELDS),
    );
    for (verb, about, handler) in [
        ("query", "Scalar query with a filter expression", query as crate::registry::Handler),
        ("query_iterator", "Page through a query in batches", query_iterator),
    ] {
        registry.register(
            CommandDescriptor::new(verb, None, about, handler)
                .param(COLLECTION)
                .param(EXPR)
                .param(OUTPUT_FIELDS)
                .param(ParamSpec::value("partition", "p", "Comma separated partitions"))
                .param(LIMIT)
                .param(OFFSET)
                .param(ParamSpec::value("timeout", "t", "Timeout in seconds"))
                .param(GUARANTEE_TS)
                .param(ParamSpec::value("graceful_time", "gt", "Graceful time in milliseconds"))
                .param(BATCH_SIZE),
        );
    }
    for (verb, about, handler) in [
        ("search", "Vector similarity search", search as crate::registry::Handler),
        ("search_iterator", "Page through a search in batches", search_iterator),
    ] {
        registry.register(
            CommandDescriptor::new(verb, None, about, handler)
                .param(COLLECTION)
                .param(ParamSpec::value("field", "f", "Vector field to search"))
                .param(ParamSpec::value("data", "d", "Query vector(s), e.g. [0.1, 0.2]"))
                .param(ParamSpec::value("metric", "m", "Metric type"))
                .param(ParamSpec::multi("param", "P", "Search parameter as key:value"))
                .param(LIMIT)
                .param(OFFSET)
                .param(EXPR)
                .param(OUTPUT_FIELDS)
                .param(ParamSpec::value("partition", "p", "Comma separated partitions"))
                .param(ParamSpec::value("round_decimal", "r", "Distance decimals, -1 for all"))
                .param(GUARANTEE_TS)
                .param(BATCH_SIZE),
        );
    }
    registry.register(
        CommandDescriptor::new(
            "hybrid_search",
            None,
            "Fuse several vector searches with a ranker",
            hybrid_search,
        )
        .param(COLLECTION)
        .param(ParamSpec::multi("field", "f", "Vector field of one sub-request"))
        .param(ParamSpec::multi("data", "d", "Query vector of one sub-request"))
        .param(ParamSpec::multi("metric", "m", "Metric of one sub-request"))
        .param(ParamSpec::multi("param", "P", "Search parameter for every sub-request"))
        .param(LIMIT)
        .param(EXPR)
        .param(ParamSpec::value("ranker", "k", "rrf or weighted"))
        .param(ParamSpec::value("ranker_params", "w", "RRF k, or one weight per sub-request"))
        .param(OUTPUT_FIELDS)
        .param(ParamSpec::value("partition", "p", "Comma separated partitions")),
    );
}

// ----------------------------------------------------------------- helpers

fn collection_name(session: &mut Session, args: &Args) -> Result<String> {
    ask(session, args, "collection", "Collection name")
}

fn describe(session: &Session, collection: &str) -> Result<CollectionInfo> {
    DataOps::new(session.client()?).describe(collection)
}

fn optional_number<T: FromStr>(name: &str, raw: Option<String>) -> Result<Option<T>> {
    raw.map(|raw| {
        raw.parse::<T>()
            .map_err(|_| CliError::parameter(name, format!("'{raw}' is not a valid value")))
    })
    .transpose()
}

fn ask_optional_number<T: FromStr>(
    session: &mut Session,
    args: &Args,
    name: &str,
    prompt: &str,
) -> Result<Option<T>> {
    let raw = ask_optional(session, args, name, prompt)?;
    optional_number(name, raw)
}

fn primary_field(info: &CollectionInfo) -> Result<&FieldSchema> {
    info.primary_field().ok_or_else(|| {
        CliError::schema(&info.name, "collection has no primary key field")
    })
}

fn mutation_view(verb: &str, collection: &str, result: &MutationResult) -> View {
    let mut entries = vec![
        ("Collection".to_string(), Value::from(collection)),
        (format!("{verb} Count"), Value::from(result.count)),
    ];
    if !result.ids.is_empty() {
        let ids: Vec<String> = result
            .ids
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        entries.push(("IDs".to_string(), Value::from(ids.join(", "))));
    }
    View::details(entries)
}

// ------------------------------------------------------------------ writes

fn rows_from_json(raw: &str) -> Result<Vec<Row>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| CliError::parameter("data", format!("invalid JSON: {e}")))?;
    let rows = match view_from_value(&value)? {
        View::KeyValue { entries, .. } => vec![entries.into_iter().collect::<Row>()],
        View::Rows { headers, rows } if headers.is_empty() => rows,
        _ => return Err(CliError::parameter("data", "every row must be a JSON object")),
    };
    if rows.is_empty() {
        return Err(CliError::parameter("data", "no row given"));
    }
    Ok(rows)
}

fn prompt_row(session: &mut Session, info: &CollectionInfo) -> Result<Row> {
    let mut row = Row::new();
    for field in &info.fields {
        if field.is_primary && field.auto_id {
            continue;
        }
        let optional = field.nullable || field.default_value.is_some();
        let prompt = format!(
            "{} ({}{})",
            field.name,
            field.data_type,
            if optional { ", empty to skip" } else { "" }
        );
        let raw = session
            .prompter()
            .input(&prompt, if optional { Some("") } else { None })?;
        if raw.trim().is_empty() {
            if field.nullable {
                row.insert(field.name.clone(), Value::Null);
            }
            if optional {
                continue;
            }
        }
        row.insert(field.name.clone(), parse_field_value(field, &raw)?);
    }
    Ok(row)
}

fn write_rows(session: &mut Session, args: &Args, upsert: bool) -> Result<View> {
    connected(session)?;
    let collection = collection_name(session, args)?;
    let partition = args.get("partition").map(str::to_string);
    let rows = match args.get("data") {
        Some(raw) => rows_from_json(raw)?,
        None if session.is_interactive() => {
            let info = describe(session, &collection)?;
            vec![prompt_row(session, &info)?]
        }
        None => return Err(CliError::parameter("data", "is required, pass --data")),
    };
    let ops = DataOps::new(session.client()?);
    let (verb, result) = if upsert {
        ("Upsert", ops.upsert(&collection, partition.as_deref(), &rows)?)
    } else {
        ("Insert", ops.insert(&collection, partition.as_deref(), &rows)?)
    };
    Ok(mutation_view(verb, &collection, &result))
}

fn insert_row(session: &mut Session, args: &Args) -> Result<View> {
    write_rows(session, args, false)
}

fn upsert_row(session: &mut Session, args: &Args) -> Result<View> {
    write_rows(session, args, true)
}

fn write_file(session: &mut Session, args: &Args, upsert: bool) -> Result<View> {
    connected(session)?;
    let collection = collection_name(session, args)?;
    let path = ask(session, args, "file", "CSV file path")?;
    let partition = args.get("partition").map(str::to_string);
    let config = ImportConfig {
        batch_size: ask_parsed(session, args, "batch_size", "Rows per batch", 1000_usize)?,
        show_progress: session.is_interactive(),
    };
    let info = describe(session, &collection)?;
    let ops = DataOps::new(session.client()?);
    let stats = import_csv(Path::new(&path), &info, &config, |batch| {
        if upsert {
            ops.upsert(&collection, partition.as_deref(), batch)?;
        } else {
            ops.insert(&collection, partition.as_deref(), batch)?;
        }
        Ok(())
    })?;
    Ok(View::details(vec![
        ("Collection".to_string(), Value::from(collection)),
        ("Rows".to_string(), Value::from(stats.total)),
        ("Imported".to_string(), Value::from(stats.imported)),
        ("Errors".to_string(), Value::from(stats.errors)),
        (
            "Rows/s".to_string(),
            Value::from(format!("{:.0}", stats.records_per_sec())),
        ),
    ]))
}

fn insert_file(session: &mut Session, args: &Args) -> Result<View> {
    write_file(session, args, false)
}

fn upsert_file(session: &mut Session, args: &Args) -> Result<View> {
    write_file(session, args, true)
}

// ----------------------------------------------------------------- deletes

fn delete_entities(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let collection = collection_name(session, args)?;
    let expr = ask(session, args, "expr", "Filter expression")?;
    confirm(
        session,
        args,
        &format!("Delete entities of {collection} matching `{expr}`?"),
    )?;
    let result = DataOps::new(session.client()?).delete_by_expr(
        &collection,
        args.get("partition"),
        &expr,
    )?;
    Ok(mutation_view("Delete", &collection, &MutationResult {
        ids: Vec::new(),
        ..result
    }))
}

fn delete_ids(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let collection = collection_name(session, args)?;
    let raw = ask(session, args, "ids", "Primary keys")?;
    let info = describe(session, &collection)?;
    let pk = primary_field(&info)?;
    let ids = parse_ids(&raw, pk.data_type)?;
    confirm(
        session,
        args,
        &format!("Delete {} entities of {collection}?", ids.len()),
    )?;
    let result = DataOps::new(session.client()?).delete_by_ids(
        &collection,
        args.get("partition"),
        &pk.name,
        &ids,
    )?;
    Ok(mutation_view("Delete", &collection, &MutationResult {
        ids: Vec::new(),
        ..result
    }))
}

// ----------------------------------------------------------------- queries

fn get(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let collection = collection_name(session, args)?;
    let raw = ask(session, args, "ids", "Primary keys")?;
    let output_fields = ask_optional(session, args, "output_fields", "Output fields")?;
    let start = Instant::now();
    let info = describe(session, &collection)?;
    let ids = parse_ids(&raw, primary_field(&info)?.data_type)?;
    let output_fields = output_fields
        .as_deref()
        .map(crate::validate::clean_output_fields)
        .unwrap_or_default();
    let rows = DataOps::new(session.client()?).get(&collection, &ids, &output_fields)?;
    report_timing(session, rows.len(), start);
    Ok(View::rows(rows))
}

fn query_input(session: &mut Session, args: &Args) -> Result<QueryInput> {
    let collection = collection_name(session, args)?;
    let expr = ask(session, args, "expr", "Filter expression")?;
    let output_fields = ask_optional(session, args, "output_fields", "Output fields")?;
    let partition_names = ask_optional(session, args, "partition", "Partitions")?;
    let limit = ask_optional_number(session, args, "limit", "Limit")?;
    Ok(QueryInput {
        collection,
        expr,
        output_fields,
        partition_names,
        limit,
        offset: args.parsed("offset")?,
        timeout: args.parsed("timeout")?,
        guarantee_timestamp: args.parsed("guarantee_timestamp")?,
        graceful_time: args.parsed("graceful_time")?,
    })
}

fn query(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let request = normalize_query_request(&query_input(session, args)?)?;
    let start = Instant::now();
    let rows = DataOps::new(session.client()?).query(&request)?;
    report_timing(session, rows.len(), start);
    Ok(View::rows(rows))
}

fn batch_size(session: &mut Session, args: &Args) -> Result<u64> {
    let default = session.config().query_batch_size;
    let size = ask_parsed(session, args, "batch_size", "Rows per batch", default)?;
    if size == 0 {
        return Err(CliError::parameter("batch_size", "must be at least 1"));
    }
    Ok(size)
}

/// Prints batches as they come and asks before fetching the next one.
fn page<F>(session: &mut Session, mut cursor: Cursor, mut fetch: F) -> Result<View>
where
    F: FnMut(&Session, u64, u64) -> Result<Vec<Row>>,
{
    let start = Instant::now();
    loop {
        let batch = cursor.next_batch(|offset, size| fetch(session, offset, size))?;
        let Some(batch) = batch else { break };
        session.emit(&View::rows(batch))?;
        if cursor.is_exhausted() {
            break;
        }
        if session.is_interactive()
            && !session.prompter().confirm("Continue to next batch?", true)?
        {
            break;
        }
    }
    let returned = usize::try_from(cursor.returned()).unwrap_or(usize::MAX);
    report_timing(session, returned, start);
    Ok(View::message(format!(
        "Fetched {returned} rows in {} batches.",
        cursor.batches()
    )))
}

fn query_iterator(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let input = query_input(session, args)?;
    let size = batch_size(session, args)?;
    let base = normalize_query_request(&QueryInput {
        limit: None,
        offset: None,
        ..input.clone()
    })?;
    let skip = input.offset.unwrap_or(0);
    page(session, Cursor::new(size, input.limit), |session, offset, size| {
        let request = QueryRequest {
            limit: Some(size),
            offset: Some(skip + offset),
            ..base.clone()
        };
        DataOps::new(session.client()?).query(&request)
    })
}

fn vector_field<'a>(
    session: &mut Session,
    args: &Args,
    info: &'a CollectionInfo,
    name: &str,
    default: usize,
) -> Result<&'a FieldSchema> {
    let names: Vec<&str> = info.vector_fields().map(|f| f.name.as_str()).collect();
    if names.is_empty() {
        return Err(CliError::schema(&info.name, "collection has no vector field"));
    }
    let chosen = match args.all(name).get(default) {
        Some(given) => given.trim().to_string(),
        None => {
            let default = default.min(names.len() - 1);
            choose(session, &Args::default(), name, "Vector field", &names, Some(default))?
        }
    };
    info.vector_fields()
        .find(|f| f.name == chosen)
        .ok_or_else(|| {
            CliError::parameter(
                name,
                format!("'{chosen}' is not one of [{}]", names.join(", ")),
            )
        })
}

fn search_input(session: &mut Session, args: &Args) -> Result<SearchInput> {
    let collection = collection_name(session, args)?;
    let info = describe(session, &collection)?;
    let field = vector_field(session, args, &info, "field", 0)?;
    let data = ask(session, args, "data", &format!("Query vector(s) for {}", field.name))?;
    let metric_type = ask_optional(session, args, "metric", "Metric type (empty for the index metric)")?;
    let params = ask_pairs(session, args, "param", "Search parameter key:value")?;
    let limit = ask_parsed(session, args, "limit", "Limit", DEFAULT_SEARCH_LIMIT)?;
    let expr = ask_optional(session, args, "expr", "Filter expression")?;
    let output_fields = ask_optional(session, args, "output_fields", "Output fields")?;
    let partition_names = ask_optional(session, args, "partition", "Partitions")?;
    let round_decimal = ask_parsed(session, args, "round_decimal", "Round decimal", -1_i32)?;
    let index = IndexOps::new(session.client()?).for_field(&collection, &field.name);
    Ok(SearchInput {
        anns_field: field.name.clone(),
        vector_type: field.data_type,
        dim: field.dim,
        collection,
        data,
        metric_type,
        params,
        limit,
        offset: args.parsed("offset")?.unwrap_or(0),
        expr,
        output_fields,
        partition_names,
        round_decimal,
        guarantee_timestamp: args.parsed("guarantee_timestamp")?,
        index,
    })
}

fn search(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let request = normalize_search_request(&search_input(session, args)?)?;
    let start = Instant::now();
    let outcome = DataOps::new(session.client()?).search(&request)?;
    report_timing(session, outcome.len(), start);
    Ok(View::rows(outcome.into_rows()))
}

fn search_iterator(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let input = search_input(session, args)?;
    let size = batch_size(session, args)?;
    let base: SearchRequest = normalize_search_request(&input)?;
    if base.data.len() != 1 {
        return Err(CliError::parameter(
            "data",
            "search_iterator takes exactly one query vector",
        ));
    }
    let limit = args.get("limit").map(|_| input.limit);
    let skip = input.offset;
    page(session, Cursor::new(size, limit), |session, offset, size| {
        let request = SearchRequest {
            limit: size,
            offset: skip + offset,
            ..base.clone()
        };
        Ok(DataOps::new(session.client()?).search(&request)?.into_rows())
    })
}

fn hybrid_search(session: &mut Session, args: &Args) -> Result<View> {
    connected(session)?;
    let collection = collection_name(session, args)?;
    let info = describe(session, &collection)?;
    let legs = if args.all("data").is_empty() {
        ask_parsed(session, args, "requests", "Number of sub-requests", 2_usize)?
    } else {
        args.all("data").len()
    };
    if legs < 2 {
        return Err(CliError::parameter(
            "data",
            "hybrid search needs at least two sub-requests",
        ));
    }
    let limit = ask_parsed(session, args, "limit", "Limit", DEFAULT_SEARCH_LIMIT)?;
    let expr = ask_optional(session, args, "expr", "Filter expression")?;
    let params = ask_pairs(session, args, "param", "Search parameter key:value")?;

    let mut requests = Vec::with_capacity(legs);
    for leg in 0..legs {
        let field = vector_field(session, args, &info, "field", leg)?;
        let data = match args.all("data").get(leg) {
            Some(raw) => raw.clone(),
            None => ask(
                session,
                &Args::default(),
                "data",
                &format!("Query vector for {}", field.name),
            )?,
        };
        let metric_type = args.all("metric").get(leg).cloned();
        let index = IndexOps::new(session.client()?).for_field(&collection, &field.name);
        requests.push(normalize_ann_request(&SearchInput {
            collection: collection.clone(),
            anns_field: field.name.clone(),
            vector_type: field.data_type,
            dim: field.dim,
            data,
            metric_type,
            params: params.clone(),
            limit,
            offset: 0,
            expr: expr.clone(),
            output_fields: None,
            partition_names: None,
            round_decimal: -1,
            guarantee_timestamp: None,
            index,
        })?);
    }

    let kind = choose(session, args, "ranker", "Ranker", &["rrf", "weighted"], Some(0))?;
    let ranker_params = if kind == "rrf" {
        ask_or(session, args, "ranker_params", "RRF k", "60")?
    } else {
        ask(session, args, "ranker_params", "Weights, one per sub-request")?
    };
    let ranker = parse_ranker(&kind, Some(&ranker_params), legs)?;
    let output_fields = ask_optional(session, args, "output_fields", "Output fields")?;
    let request = HybridSearchRequest {
        collection,
        requests,
        ranker,
        limit,
        output_fields: output_fields
            .as_deref()
            .map(crate::validate::clean_output_fields)
            .unwrap_or_default(),
        partition_names: args
            .get("partition")
            .map(crate::validate::clean_output_fields)
            .unwrap_or_default(),
    };
    let start = Instant::now();
    let outcome = DataOps::new(session.client()?).hybrid_search(&request)?;
    report_timing(session, outcome.len(), start);
    Ok(View::rows(outcome.into_rows()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_from_json_shapes() {
        assert_eq!(rows_from_json(r#"{"id": 1}"#).unwrap().len(), 1);
        assert_eq!(rows_from_json(r#"[{"id": 1}, {"id": 2}]"#).unwrap().len(), 2);
        assert!(rows_from_json("[1, 2]").is_err());
        assert!(rows_from_json("[]").is_err());
        assert!(rows_from_json("[[1, 2]]").is_err());
        assert_eq!(rows_from_json("42").unwrap_err().kind(), "FormatError");
        assert!(rows_from_json("{oops").is_err());
    }

    #[test]
    fn test_optional_number() {
        assert_eq!(optional_number::<u64>("limit", None).unwrap(), None);
        assert_eq!(
            optional_number::<u64>("limit", Some("5".to_string())).unwrap(),
            Some(5)
        );
        assert!(optional_number::<u64>("limit", Some("five".to_string())).is_err());
    }

    #[test]
    fn test_mutation_view_lists_ids() {
        let result = MutationResult {
            count: 2,
            ids: vec![Value::from(1), Value::from("b")],
        };
        let View::KeyValue { entries, .. } = mutation_view("Insert", "books", &result) else {
            panic!("expected details");
        };
        assert_eq!(entries[1], ("Insert Count".to_string(), Value::from(2)));
        assert_eq!(entries[2], ("IDs".to_string(), Value::from("1, b")));
    }
}
