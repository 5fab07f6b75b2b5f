//! In-process fake of a vector database server.
//!
//! [`InMemoryService`] keeps every database, collection and RBAC object in a
//! shared [`State`] so handles opened by one [`MemoryConnector`] observe each
//! other's writes. Filters support the subset `field <op> literal`,
//! `field [not] in [..]` and `and` conjunctions. Search is brute force.

use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::service::{Connector, VectorService};
use crate::types::{
    AliasInfo, CollectionInfo, CollectionSchema, CompactionState, ConnectConfig,
    CreateCollectionOptions, DataType, DatabaseInfo, DeleteRequest, FieldSchema,
    HybridSearchRequest, IndexInfo, IndexParams, LoadState, LoadStatus, MutationResult,
    PrivilegeGrant, PrivilegeGroupInfo, QueryRequest, Ranker, ResourceGroupConfig,
    ResourceGroupInfo, Row, SearchRequest, SearchVectors, UserInfo, DEFAULT_DATABASE,
    DEFAULT_PARTITION,
};

/// Resource group every server starts with.
pub const DEFAULT_RESOURCE_GROUP: &str = "__default_resource_group";

/// Password of the seeded `root` user.
pub const ROOT_PASSWORD: &str = "Milvus";

const CODE_COLLECTION_NOT_FOUND: i64 = 100;
const CODE_COLLECTION_NOT_LOADED: i64 = 101;
const CODE_PARTITION_NOT_FOUND: i64 = 200;
const CODE_INDEX_NOT_FOUND: i64 = 700;
const CODE_DATABASE_NOT_FOUND: i64 = 800;
const CODE_ILLEGAL_ARGUMENT: i64 = 1100;
const CODE_PRIVILEGE: i64 = 1300;
const CODE_RESOURCE_GROUP: i64 = 2001;

#[derive(Debug, Clone)]
struct Collection {
    id: i64,
    schema: CollectionSchema,
    consistency_level: String,
    shards_num: u32,
    partitions: BTreeMap<String, Vec<Row>>,
    indexes: BTreeMap<String, IndexParams>,
    loaded: bool,
    loaded_partitions: BTreeSet<String>,
    next_auto_id: i64,
    created: u64,
}

impl Collection {
    fn row_count(&self) -> u64 {
        self.partitions.values().map(|rows| rows.len() as u64).sum()
    }

    fn primary_name(&self) -> String {
        self.schema
            .primary_field()
            .map(|f| f.name.clone())
            .unwrap_or_default()
    }

    fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.schema.fields.iter().find(|f| f.name == name)
    }

    fn rows_in<'a>(&'a self, partitions: &'a [String]) -> impl Iterator<Item = &'a Row> + 'a {
        self.partitions
            .iter()
            .filter(move |(name, _)| partitions.is_empty() || partitions.contains(name))
            .flat_map(|(_, rows)| rows.iter())
    }
}

#[derive(Debug, Clone, Default)]
struct Database {
    id: i64,
    properties: Vec<(String, String)>,
    collections: BTreeMap<String, Collection>,
    aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct User {
    password: String,
    roles: BTreeSet<String>,
}

/// Whole-server state shared by every handle.
#[derive(Debug)]
struct State {
    databases: BTreeMap<String, Database>,
    users: BTreeMap<String, User>,
    roles: BTreeMap<String, Vec<PrivilegeGrant>>,
    privilege_groups: BTreeMap<String, Vec<String>>,
    resource_groups: BTreeMap<String, ResourceGroupConfig>,
    replicas: BTreeMap<String, (String, u32)>,
    compactions: BTreeSet<i64>,
    next_id: i64,
    clock: u64,
}

impl Default for State {
    fn default() -> Self {
        let mut databases = BTreeMap::new();
        databases.insert(
            DEFAULT_DATABASE.to_string(),
            Database {
                id: 1,
                ..Database::default()
            },
        );
        let mut users = BTreeMap::new();
        users.insert(
            "root".to_string(),
            User {
                password: ROOT_PASSWORD.to_string(),
                roles: BTreeSet::from(["admin".to_string()]),
            },
        );
        let mut roles = BTreeMap::new();
        roles.insert("admin".to_string(), Vec::new());
        roles.insert("public".to_string(), Vec::new());
        let mut resource_groups = BTreeMap::new();
        resource_groups.insert(
            DEFAULT_RESOURCE_GROUP.to_string(),
            ResourceGroupConfig {
                requests_node_num: 1,
                limits_node_num: 1,
            },
        );
        Self {
            databases,
            users,
            roles,
            privilege_groups: BTreeMap::new(),
            resource_groups,
            replicas: BTreeMap::new(),
            compactions: BTreeSet::new(),
            next_id: 100,
            clock: 1,
        }
    }
}

impl State {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

fn collection_not_found(db: &str, name: &str) -> Error {
    Error::server(
        CODE_COLLECTION_NOT_FOUND,
        format!("collection not found[database={db}][collection={name}]"),
    )
}

fn illegal(message: impl Into<String>) -> Error {
    Error::server(CODE_ILLEGAL_ARGUMENT, message)
}

// ============================================================================
// Service handle
// ============================================================================

/// A handle on an in-process server.
pub struct InMemoryService {
    state: Rc<RefCell<State>>,
    endpoint: String,
    db_name: String,
}

impl InMemoryService {
    /// Creates a handle on a fresh server.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(Rc::new(RefCell::new(State::default())), "memory://local")
    }

    fn with_state(state: Rc<RefCell<State>>, endpoint: &str) -> Self {
        Self {
            state,
            endpoint: endpoint.to_string(),
            db_name: DEFAULT_DATABASE.to_string(),
        }
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let state = self.state.borrow();
        let db = state.databases.get(&self.db_name).ok_or_else(|| {
            Error::server(
                CODE_DATABASE_NOT_FOUND,
                format!("database not found[database={}]", self.db_name),
            )
        })?;
        f(db)
    }

    fn with_db_mut<T>(&self, f: impl FnOnce(&mut Database, i64, u64) -> Result<T>) -> Result<T> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        let now = state.tick();
        let db = state.databases.get_mut(&self.db_name).ok_or_else(|| {
            Error::server(
                CODE_DATABASE_NOT_FOUND,
                format!("database not found[database={}]", self.db_name),
            )
        })?;
        f(db, id, now)
    }

    fn with_collection<T>(&self, name: &str, f: impl FnOnce(&Collection) -> Result<T>) -> Result<T> {
        self.with_db(|db| {
            let coll = db
                .collections
                .get(name)
                .ok_or_else(|| collection_not_found(&self.db_name, name))?;
            f(coll)
        })
    }

    fn with_collection_mut<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Collection) -> Result<T>,
    ) -> Result<T> {
        let db_name = self.db_name.clone();
        self.with_db_mut(|db, _, _| {
            let coll = db
                .collections
                .get_mut(name)
                .ok_or_else(|| collection_not_found(&db_name, name))?;
            f(coll)
        })
    }

    fn write_rows(
        &self,
        collection: &str,
        partition: Option<&str>,
        rows: &[Row],
        upsert: bool,
    ) -> Result<MutationResult> {
        self.with_collection_mut(collection, |coll| {
            let partition = partition.unwrap_or(DEFAULT_PARTITION).to_string();
            if !coll.partitions.contains_key(&partition) {
                return Err(Error::server(
                    CODE_PARTITION_NOT_FOUND,
                    format!("partition not found[partition={partition}]"),
                ));
            }
            let primary = coll.primary_name();
            let auto_id = coll.schema.auto_id
                || coll.schema.primary_field().is_some_and(|f| f.auto_id);
            let mut prepared = Vec::with_capacity(rows.len());
            let mut ids = Vec::with_capacity(rows.len());
            for row in rows {
                let mut row = row.clone();
                if auto_id && !upsert {
                    if row.contains_key(&primary) {
                        return Err(illegal(format!(
                            "the primary key field '{primary}' is auto generated, do not pass it"
                        )));
                    }
                    coll.next_auto_id += 1;
                    row.insert(primary.clone(), json!(coll.next_auto_id));
                }
                check_row(coll, &row)?;
                ids.push(row.get(&primary).cloned().unwrap_or(Value::Null));
                prepared.push(row);
            }
            if upsert {
                for rows in coll.partitions.values_mut() {
                    rows.retain(|r| !ids.contains(r.get(&primary).unwrap_or(&Value::Null)));
                }
            }
            let count = prepared.len() as u64;
            if let Some(target) = coll.partitions.get_mut(&partition) {
                target.extend(prepared);
            }
            Ok(MutationResult { count, ids })
        })
    }

    fn ensure_loaded(coll: &Collection, name: &str, partitions: &[String]) -> Result<()> {
        let loaded = coll.loaded
            || (!partitions.is_empty()
                && partitions.iter().all(|p| coll.loaded_partitions.contains(p)));
        if loaded {
            Ok(())
        } else {
            Err(Error::server(
                CODE_COLLECTION_NOT_LOADED,
                format!("collection not loaded[collection={name}]"),
            ))
        }
    }

    fn run_search(
        coll: &Collection,
        anns_field: &str,
        data: &SearchVectors,
        metric: &str,
        filter: Option<&str>,
        partitions: &[String],
    ) -> Result<Vec<Vec<(f32, Row)>>> {
        let field = coll
            .field(anns_field)
            .filter(|f| f.data_type.is_vector())
            .ok_or_else(|| illegal(format!("field {anns_field} is not a vector field")))?;
        let metric = Metric::parse(metric)?;
        let predicate = Predicate::parse(filter.unwrap_or_default())?;
        let candidates: Vec<&Row> = coll
            .rows_in(partitions)
            .filter(|row| predicate.matches(row))
            .collect();

        let queries: Vec<Value> = match data.to_json() {
            Value::Array(items) => items,
            _ => Vec::new(),
        };
        let mut results = Vec::with_capacity(queries.len());
        for query in &queries {
            if let (Some(dim), Some(q)) = (field.dim, query.as_array()) {
                if field.data_type != DataType::BinaryVector && q.len() != dim as usize {
                    return Err(illegal(format!(
                        "vector dimension mismatch, expected vector size(byte) {}, actual {}",
                        dim,
                        q.len()
                    )));
                }
            }
            let mut scored: Vec<(f32, Row)> = candidates
                .iter()
                .filter_map(|row| {
                    let stored = row.get(anns_field)?;
                    Some((metric.score(query, stored), (*row).clone()))
                })
                .collect();
            scored.sort_by(|a, b| metric.order(a.0, b.0));
            results.push(scored);
        }
        Ok(results)
    }
}

impl Default for InMemoryService {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates a row against the schema.
fn check_row(coll: &Collection, row: &Row) -> Result<()> {
    for field in &coll.schema.fields {
        match row.get(&field.name) {
            None | Some(Value::Null) => {
                if !field.nullable && field.default_value.is_none() {
                    return Err(illegal(format!(
                        "missing field '{}' in the inserted data",
                        field.name
                    )));
                }
            }
            Some(value) => {
                if let (Some(dim), Some(items)) = (field.dim, value.as_array()) {
                    let expected = if field.data_type == DataType::BinaryVector {
                        dim as usize / 8
                    } else {
                        dim as usize
                    };
                    if items.len() != expected {
                        return Err(illegal(format!(
                            "the dim ({}) of field data({}) is not equal to schema dim ({})",
                            items.len(),
                            field.name,
                            dim
                        )));
                    }
                }
            }
        }
    }
    if !coll.schema.enable_dynamic_field {
        if let Some(extra) = row.keys().find(|k| coll.field(k).is_none()) {
            return Err(illegal(format!(
                "field '{extra}' does not exist in the collection schema"
            )));
        }
    }
    Ok(())
}

/// Projects a row on the requested output fields; the primary key is always
/// kept and `*` selects everything.
fn project(row: &Row, primary: &str, output_fields: &[String]) -> Row {
    if output_fields.iter().any(|f| f == "*") {
        return row.clone();
    }
    let mut out = Map::new();
    if let Some(pk) = row.get(primary) {
        out.insert(primary.to_string(), pk.clone());
    }
    for field in output_fields {
        if let Some(value) = row.get(field) {
            out.insert(field.clone(), value.clone());
        }
    }
    out
}

// ============================================================================
// Metrics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    L2,
    Ip,
    Cosine,
    Hamming,
}

impl Metric {
    fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "L2" => Ok(Self::L2),
            "IP" | "BM25" => Ok(Self::Ip),
            "COSINE" => Ok(Self::Cosine),
            "HAMMING" | "JACCARD" => Ok(Self::Hamming),
            other => Err(illegal(format!("metric type {other} is not supported"))),
        }
    }

    /// Smaller is better for distances, larger for similarities.
    fn order(self, a: f32, b: f32) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            Self::L2 | Self::Hamming => ord,
            Self::Ip | Self::Cosine => ord.reverse(),
        }
    }

    /// Maps a raw score into [0, 1], higher is better, for weighted fusion.
    fn normalize(self, score: f32) -> f32 {
        match self {
            Self::L2 | Self::Hamming => 1.0 - 2.0 * score.atan() / std::f32::consts::PI,
            Self::Ip => 0.5 + score.atan() / std::f32::consts::PI,
            Self::Cosine => (1.0 + score) / 2.0,
        }
    }

    fn score(self, query: &Value, stored: &Value) -> f32 {
        if let (Value::Object(q), Value::Object(s)) = (query, stored) {
            return q
                .iter()
                .filter_map(|(k, v)| Some(v.as_f64()? as f32 * s.get(k)?.as_f64()? as f32))
                .sum();
        }
        let a = as_floats(query);
        let b = as_floats(stored);
        match self {
            Self::L2 => a.iter().zip(&b).map(|(x, y)| (x - y) * (x - y)).sum(),
            Self::Ip => a.iter().zip(&b).map(|(x, y)| x * y).sum(),
            Self::Cosine => {
                let dot: f32 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
                let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if na == 0.0 || nb == 0.0 {
                    0.0
                } else {
                    dot / (na * nb)
                }
            }
            Self::Hamming => a
                .iter()
                .zip(&b)
                .map(|(x, y)| ((*x as u8) ^ (*y as u8)).count_ones() as f32)
                .sum(),
        }
    }
}

fn as_floats(value: &Value) -> Vec<f32> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_f64).map(|v| v as f32).collect())
        .unwrap_or_default()
}

// ============================================================================
// Filters
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    All,
    Compare {
        field: String,
        op: &'static str,
        value: Value,
    },
    In {
        field: String,
        values: Vec<Value>,
        negate: bool,
    },
    And(Vec<Predicate>),
}

const OPERATORS: [&str; 6] = ["==", "!=", ">=", "<=", ">", "<"];

fn parse_literal(text: &str) -> Result<Value> {
    let text = text.trim();
    let normalized = if text.starts_with('\'') || text.contains("['") || text.contains(", '") {
        text.replace('\'', "\"")
    } else {
        text.to_string()
    };
    match normalized.as_str() {
        "true" | "True" => return Ok(Value::Bool(true)),
        "false" | "False" => return Ok(Value::Bool(false)),
        _ => {}
    }
    serde_json::from_str(&normalized)
        .map_err(|_| illegal(format!("cannot parse expression: invalid literal {text}")))
}

impl Predicate {
    fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Ok(Self::All);
        }
        let clauses: Vec<&str> = expr
            .split(" and ")
            .flat_map(|c| c.split(" && "))
            .collect();
        if clauses.len() > 1 {
            return clauses
                .into_iter()
                .map(Self::parse)
                .collect::<Result<Vec<_>>>()
                .map(Self::And);
        }
        let clause = expr.trim_start_matches('(').trim_end_matches(')').trim();

        for (keyword, negate) in [(" not in ", true), (" in ", false)] {
            if let Some((field, list)) = clause.split_once(keyword) {
                let values = match parse_literal(list)? {
                    Value::Array(items) => items,
                    _ => return Err(illegal(format!("cannot parse expression: {clause}"))),
                };
                return Ok(Self::In {
                    field: field.trim().to_string(),
                    values,
                    negate,
                });
            }
        }
        for op in OPERATORS {
            if let Some((field, literal)) = clause.split_once(op) {
                let field = field.trim();
                if field.is_empty() || field.contains(' ') {
                    break;
                }
                return Ok(Self::Compare {
                    field: field.to_string(),
                    op,
                    value: parse_literal(literal)?,
                });
            }
        }
        Err(illegal(format!("cannot parse expression: {clause}")))
    }

    fn matches(&self, row: &Row) -> bool {
        match self {
            Self::All => true,
            Self::And(parts) => parts.iter().all(|p| p.matches(row)),
            Self::In {
                field,
                values,
                negate,
            } => {
                let hit = row.get(field).is_some_and(|v| values.iter().any(|x| same(v, x)));
                hit != *negate
            }
            Self::Compare { field, op, value } => {
                let Some(actual) = row.get(field) else {
                    return false;
                };
                let ord = compare(actual, value);
                match *op {
                    "==" => same(actual, value),
                    "!=" => !same(actual, value),
                    ">" => ord == Some(Ordering::Greater),
                    ">=" => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
                    "<" => ord == Some(Ordering::Less),
                    "<=" => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
                    _ => false,
                }
            }
        }
    }
}

fn same(a: &Value, b: &Value) -> bool {
    compare(a, b) == Some(Ordering::Equal) || a == b
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

// ============================================================================
// VectorService
// ============================================================================

impl VectorService for InMemoryService {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn current_database(&self) -> &str {
        &self.db_name
    }

    fn use_database(&mut self, name: &str) -> Result<()> {
        if !self.state.borrow().databases.contains_key(name) {
            return Err(Error::server(
                CODE_DATABASE_NOT_FOUND,
                format!("database not found[database={name}]"),
            ));
        }
        self.db_name = name.to_string();
        Ok(())
    }

    fn list_databases(&self) -> Result<Vec<String>> {
        Ok(self.state.borrow().databases.keys().cloned().collect())
    }

    fn create_database(&self, name: &str, properties: &[(String, String)]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.databases.contains_key(name) {
            return Err(illegal(format!("database already exist: {name}")));
        }
        let id = state.allocate_id();
        state.databases.insert(
            name.to_string(),
            Database {
                id,
                properties: properties.to_vec(),
                ..Database::default()
            },
        );
        Ok(())
    }

    fn describe_database(&self, name: &str) -> Result<DatabaseInfo> {
        let state = self.state.borrow();
        let db = state.databases.get(name).ok_or_else(|| {
            Error::server(
                CODE_DATABASE_NOT_FOUND,
                format!("database not found[database={name}]"),
            )
        })?;
        Ok(DatabaseInfo {
            name: name.to_string(),
            db_id: db.id,
            properties: db.properties.clone(),
        })
    }

    fn drop_database(&self, name: &str) -> Result<()> {
        if name == DEFAULT_DATABASE {
            return Err(illegal("can not drop default database"));
        }
        let mut state = self.state.borrow_mut();
        match state.databases.get(name) {
            None => Err(Error::server(
                CODE_DATABASE_NOT_FOUND,
                format!("database not found[database={name}]"),
            )),
            Some(db) if !db.collections.is_empty() => Err(illegal(format!(
                "{name} not empty, must drop all collections before drop database"
            ))),
            Some(_) => {
                state.databases.remove(name);
                Ok(())
            }
        }
    }

    fn list_collections(&self) -> Result<Vec<String>> {
        self.with_db(|db| Ok(db.collections.keys().cloned().collect()))
    }

    fn has_collection(&self, name: &str) -> Result<bool> {
        self.with_db(|db| Ok(db.collections.contains_key(name)))
    }

    fn create_collection(
        &self,
        name: &str,
        schema: &CollectionSchema,
        options: &CreateCollectionOptions,
    ) -> Result<()> {
        if schema.primary_field().is_none() {
            return Err(illegal("schema does not contain primary key field"));
        }
        if schema.vector_fields().next().is_none() {
            return Err(illegal("schema does not contain vector field"));
        }
        self.with_db_mut(|db, id, now| {
            if db.collections.contains_key(name) || db.aliases.contains_key(name) {
                return Err(illegal(format!(
                    "collection already exists[collection={name}]"
                )));
            }
            let mut partitions = BTreeMap::new();
            partitions.insert(DEFAULT_PARTITION.to_string(), Vec::new());
            db.collections.insert(
                name.to_string(),
                Collection {
                    id,
                    schema: schema.clone(),
                    consistency_level: options
                        .consistency_level
                        .map_or("Bounded", |l| l.as_str())
                        .to_string(),
                    shards_num: options.shards_num.unwrap_or(1),
                    partitions,
                    indexes: BTreeMap::new(),
                    loaded: false,
                    loaded_partitions: BTreeSet::new(),
                    next_auto_id: 0,
                    created: now,
                },
            );
            Ok(())
        })
    }

    fn describe_collection(&self, name: &str) -> Result<CollectionInfo> {
        self.with_db(|db| {
            let coll = db
                .collections
                .get(name)
                .ok_or_else(|| collection_not_found(&self.db_name, name))?;
            let aliases = db
                .aliases
                .iter()
                .filter(|(_, target)| *target == name)
                .map(|(alias, _)| alias.clone())
                .collect();
            Ok(CollectionInfo {
                name: name.to_string(),
                collection_id: coll.id,
                description: coll.schema.description.clone(),
                fields: coll.schema.fields.clone(),
                auto_id: coll.schema.auto_id,
                enable_dynamic_field: coll.schema.enable_dynamic_field,
                consistency_level: coll.consistency_level.clone(),
                shards_num: coll.shards_num,
                partitions_num: u32::try_from(coll.partitions.len()).unwrap_or(u32::MAX),
                aliases,
                created_timestamp: coll.created,
            })
        })
    }

    fn drop_collection(&self, name: &str) -> Result<()> {
        let db_name = self.db_name.clone();
        self.with_db_mut(|db, _, _| {
            if !db.collections.contains_key(name) {
                return Err(collection_not_found(&db_name, name));
            }
            if db.aliases.values().any(|target| target == name) {
                return Err(illegal(format!(
                    "unable to drop the collection [{name}] because it has aliases"
                )));
            }
            db.collections.remove(name);
            Ok(())
        })?;
        self.state.borrow_mut().replicas.remove(name);
        Ok(())
    }

    fn rename_collection(
        &self,
        old_name: &str,
        new_name: &str,
        new_db: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let target_db = new_db.unwrap_or(&self.db_name).to_string();
        if !state.databases.contains_key(&target_db) {
            return Err(Error::server(
                CODE_DATABASE_NOT_FOUND,
                format!("database not found[database={target_db}]"),
            ));
        }
        if state.databases[&target_db].collections.contains_key(new_name) {
            return Err(illegal(format!(
                "duplicated new collection name {new_name} with other collection name or alias"
            )));
        }
        let coll = state
            .databases
            .get_mut(&self.db_name)
            .and_then(|db| db.collections.remove(old_name))
            .ok_or_else(|| collection_not_found(&self.db_name, old_name))?;
        if let Some(db) = state.databases.get_mut(&target_db) {
            db.collections.insert(new_name.to_string(), coll);
        }
        Ok(())
    }

    fn collection_row_count(&self, name: &str) -> Result<u64> {
        self.with_collection(name, |coll| Ok(coll.row_count()))
    }

    fn load_collection(&self, name: &str, replicas: Option<u32>) -> Result<()> {
        self.with_collection_mut(name, |coll| {
            let missing = coll
                .schema
                .vector_fields()
                .find(|f| !coll.indexes.values().any(|i| i.field_name == f.name))
                .map(|f| f.name.clone());
            if let Some(field) = missing {
                return Err(Error::server(
                    CODE_INDEX_NOT_FOUND,
                    format!("index not found[collection={name}][field={field}]"),
                ));
            }
            coll.loaded = true;
            coll.loaded_partitions = coll.partitions.keys().cloned().collect();
            Ok(())
        })?;
        self.state.borrow_mut().replicas.insert(
            name.to_string(),
            (DEFAULT_RESOURCE_GROUP.to_string(), replicas.unwrap_or(1)),
        );
        Ok(())
    }

    fn release_collection(&self, name: &str) -> Result<()> {
        self.with_collection_mut(name, |coll| {
            coll.loaded = false;
            coll.loaded_partitions.clear();
            Ok(())
        })?;
        self.state.borrow_mut().replicas.remove(name);
        Ok(())
    }

    fn load_state(&self, collection: &str, partition: Option<&str>) -> Result<LoadStatus> {
        self.with_collection(collection, |coll| {
            let state = match partition {
                Some(p) if !coll.partitions.contains_key(p) => LoadState::NotExist,
                Some(p) if coll.loaded_partitions.contains(p) => LoadState::Loaded,
                Some(_) => LoadState::NotLoad,
                None if coll.loaded => LoadState::Loaded,
                None => LoadState::NotLoad,
            };
            Ok(LoadStatus {
                state,
                progress: (state == LoadState::Loaded).then_some(100),
            })
        })
    }

    fn flush(&self, collection: &str) -> Result<()> {
        self.with_collection(collection, |_| Ok(()))
    }

    fn compact(&self, collection: &str) -> Result<i64> {
        self.with_collection(collection, |_| Ok(()))?;
        let mut state = self.state.borrow_mut();
        let job = state.allocate_id();
        state.compactions.insert(job);
        Ok(job)
    }

    fn compaction_state(&self, job_id: i64) -> Result<CompactionState> {
        let known = self.state.borrow().compactions.contains(&job_id);
        Ok(CompactionState {
            job_id,
            state: if known { "Completed" } else { "UndefiedState" }.to_string(),
            executing_plans: 0,
            completed_plans: u64::from(known),
            timeout_plans: 0,
        })
    }

    fn list_partitions(&self, collection: &str) -> Result<Vec<String>> {
        self.with_collection(collection, |coll| Ok(coll.partitions.keys().cloned().collect()))
    }

    fn has_partition(&self, collection: &str, partition: &str) -> Result<bool> {
        self.with_collection(collection, |coll| Ok(coll.partitions.contains_key(partition)))
    }

    fn create_partition(&self, collection: &str, partition: &str) -> Result<()> {
        self.with_collection_mut(collection, |coll| {
            if coll.partitions.contains_key(partition) {
                return Err(illegal(format!(
                    "partition already exists[partition={partition}]"
                )));
            }
            coll.partitions.insert(partition.to_string(), Vec::new());
            Ok(())
        })
    }

    fn drop_partition(&self, collection: &str, partition: &str) -> Result<()> {
        self.with_collection_mut(collection, |coll| {
            if partition == DEFAULT_PARTITION {
                return Err(illegal("default partition cannot be deleted"));
            }
            if !coll.partitions.contains_key(partition) {
                return Err(Error::server(
                    CODE_PARTITION_NOT_FOUND,
                    format!("partition not found[partition={partition}]"),
                ));
            }
            if coll.loaded_partitions.contains(partition) {
                return Err(illegal(
                    "partition cannot be dropped, partition is loaded, please release it first",
                ));
            }
            coll.partitions.remove(partition);
            Ok(())
        })
    }

    fn partition_row_count(&self, collection: &str, partition: &str) -> Result<u64> {
        self.with_collection(collection, |coll| {
            coll.partitions
                .get(partition)
                .map(|rows| rows.len() as u64)
                .ok_or_else(|| {
                    Error::server(
                        CODE_PARTITION_NOT_FOUND,
                        format!("partition not found[partition={partition}]"),
                    )
                })
        })
    }

    fn load_partitions(&self, collection: &str, partitions: &[String]) -> Result<()> {
        self.with_collection_mut(collection, |coll| {
            if let Some(missing) = partitions.iter().find(|p| !coll.partitions.contains_key(*p)) {
                return Err(Error::server(
                    CODE_PARTITION_NOT_FOUND,
                    format!("partition not found[partition={missing}]"),
                ));
            }
            if coll.schema.vector_fields().any(|f| !coll.indexes.values().any(|i| i.field_name == f.name)) {
                return Err(Error::server(
                    CODE_INDEX_NOT_FOUND,
                    format!("index not found[collection={collection}]"),
                ));
            }
            coll.loaded_partitions.extend(partitions.iter().cloned());
            Ok(())
        })
    }

    fn release_partitions(&self, collection: &str, partitions: &[String]) -> Result<()> {
        self.with_collection_mut(collection, |coll| {
            for p in partitions {
                coll.loaded_partitions.remove(p);
            }
            if coll.loaded_partitions.is_empty() {
                coll.loaded = false;
            }
            Ok(())
        })
    }

    fn list_indexes(&self, collection: &str) -> Result<Vec<String>> {
        self.with_collection(collection, |coll| Ok(coll.indexes.keys().cloned().collect()))
    }

    fn describe_index(&self, collection: &str, index_name: &str) -> Result<IndexInfo> {
        self.with_collection(collection, |coll| {
            let index = coll.indexes.get(index_name).ok_or_else(|| {
                Error::server(
                    CODE_INDEX_NOT_FOUND,
                    format!("index not found[indexName={index_name}]"),
                )
            })?;
            let rows = coll.row_count();
            Ok(IndexInfo {
                index_name: index_name.to_string(),
                field_name: index.field_name.clone(),
                index_type: index.index_type.clone(),
                metric_type: index.metric_type.clone().unwrap_or_default(),
                params: index.params.clone(),
                indexed_rows: rows,
                total_rows: rows,
                pending_rows: 0,
                state: "Finished".to_string(),
            })
        })
    }

    fn create_index(&self, collection: &str, params: &IndexParams) -> Result<()> {
        self.with_collection_mut(collection, |coll| {
            if coll.field(&params.field_name).is_none() {
                return Err(illegal(format!(
                    "cannot create index on non-exist field: {}",
                    params.field_name
                )));
            }
            let name = if params.index_name.is_empty() {
                params.field_name.clone()
            } else {
                params.index_name.clone()
            };
            if coll.indexes.contains_key(&name)
                || coll.indexes.values().any(|i| i.field_name == params.field_name)
            {
                return Err(illegal(format!(
                    "at most one distinct index is allowed per field[field={}]",
                    params.field_name
                )));
            }
            let mut stored = params.clone();
            stored.index_name = name.clone();
            coll.indexes.insert(name, stored);
            Ok(())
        })
    }

    fn drop_index(&self, collection: &str, index_name: &str) -> Result<()> {
        self.with_collection_mut(collection, |coll| {
            if !coll.indexes.contains_key(index_name) {
                return Err(Error::server(
                    CODE_INDEX_NOT_FOUND,
                    format!("index not found[indexName={index_name}]"),
                ));
            }
            if coll.loaded {
                return Err(illegal(format!(
                    "index cannot be dropped, collection is loaded, please release it first[collection={collection}]"
                )));
            }
            coll.indexes.remove(index_name);
            Ok(())
        })
    }

    fn list_aliases(&self, collection: Option<&str>) -> Result<Vec<String>> {
        self.with_db(|db| {
            Ok(db
                .aliases
                .iter()
                .filter(|(_, target)| collection.is_none_or(|c| c == target.as_str()))
                .map(|(alias, _)| alias.clone())
                .collect())
        })
    }

    fn describe_alias(&self, alias: &str) -> Result<AliasInfo> {
        self.with_db(|db| {
            let collection = db
                .aliases
                .get(alias)
                .ok_or_else(|| illegal(format!("alias not found[database={}][alias={alias}]", self.db_name)))?;
            Ok(AliasInfo {
                alias: alias.to_string(),
                collection: collection.clone(),
                db_name: self.db_name.clone(),
            })
        })
    }

    fn create_alias(&self, collection: &str, alias: &str) -> Result<()> {
        let db_name = self.db_name.clone();
        self.with_db_mut(|db, _, _| {
            if !db.collections.contains_key(collection) {
                return Err(collection_not_found(&db_name, collection));
            }
            if db.aliases.contains_key(alias) || db.collections.contains_key(alias) {
                return Err(illegal(format!(
                    "alias exists and already aliased to another collection, alias: {alias}"
                )));
            }
            db.aliases.insert(alias.to_string(), collection.to_string());
            Ok(())
        })
    }

    fn alter_alias(&self, collection: &str, alias: &str) -> Result<()> {
        let db_name = self.db_name.clone();
        self.with_db_mut(|db, _, _| {
            if !db.collections.contains_key(collection) {
                return Err(collection_not_found(&db_name, collection));
            }
            match db.aliases.get_mut(alias) {
                Some(target) => {
                    *target = collection.to_string();
                    Ok(())
                }
                None => Err(illegal(format!("alias not found[database={db_name}][alias={alias}]"))),
            }
        })
    }

    fn drop_alias(&self, alias: &str) -> Result<()> {
        let db_name = self.db_name.clone();
        self.with_db_mut(|db, _, _| {
            db.aliases
                .remove(alias)
                .map(drop)
                .ok_or_else(|| illegal(format!("alias not found[database={db_name}][alias={alias}]")))
        })
    }

    fn list_users(&self) -> Result<Vec<String>> {
        Ok(self.state.borrow().users.keys().cloned().collect())
    }

    fn describe_user(&self, name: &str) -> Result<UserInfo> {
        let state = self.state.borrow();
        let user = state
            .users
            .get(name)
            .ok_or_else(|| illegal(format!("user not found: {name}")))?;
        Ok(UserInfo {
            name: name.to_string(),
            roles: user.roles.iter().cloned().collect(),
        })
    }

    fn create_user(&self, name: &str, password: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.users.contains_key(name) {
            return Err(illegal(format!("user already exists: {name}")));
        }
        if password.len() < 6 {
            return Err(illegal(
                "invalid password length: the length of password must be between 6 and 256",
            ));
        }
        state.users.insert(
            name.to_string(),
            User {
                password: password.to_string(),
                roles: BTreeSet::from(["public".to_string()]),
            },
        );
        Ok(())
    }

    fn update_password(&self, name: &str, old_password: &str, new_password: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let user = state
            .users
            .get_mut(name)
            .ok_or_else(|| illegal(format!("user not found: {name}")))?;
        if user.password != old_password {
            return Err(illegal("old password not correct"));
        }
        user.password = new_password.to_string();
        Ok(())
    }

    fn drop_user(&self, name: &str) -> Result<()> {
        if name == "root" {
            return Err(illegal("root user cannot be deleted"));
        }
        self.state
            .borrow_mut()
            .users
            .remove(name)
            .map(drop)
            .ok_or_else(|| illegal(format!("user not found: {name}")))
    }

    fn grant_role(&self, user: &str, role: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.roles.contains_key(role) {
            return Err(illegal(format!("role not found: {role}")));
        }
        let entry = state
            .users
            .get_mut(user)
            .ok_or_else(|| illegal(format!("user not found: {user}")))?;
        entry.roles.insert(role.to_string());
        Ok(())
    }

    fn revoke_role(&self, user: &str, role: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .users
            .get_mut(user)
            .ok_or_else(|| illegal(format!("user not found: {user}")))?;
        entry.roles.remove(role);
        Ok(())
    }

    fn list_roles(&self) -> Result<Vec<String>> {
        Ok(self.state.borrow().roles.keys().cloned().collect())
    }

    fn describe_role(&self, name: &str) -> Result<Vec<PrivilegeGrant>> {
        self.state
            .borrow()
            .roles
            .get(name)
            .cloned()
            .ok_or_else(|| illegal(format!("role not found: {name}")))
    }

    fn create_role(&self, name: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.roles.contains_key(name) {
            return Err(illegal(format!("role already exists: {name}")));
        }
        state.roles.insert(name.to_string(), Vec::new());
        Ok(())
    }

    fn drop_role(&self, name: &str) -> Result<()> {
        if name == "admin" || name == "public" {
            return Err(illegal(format!("the role[{name}] is a default role, which can't be dropped")));
        }
        let mut state = self.state.borrow_mut();
        if state.users.values().any(|u| u.roles.contains(name)) {
            return Err(illegal(format!("role [{name}] is still granted to users")));
        }
        state
            .roles
            .remove(name)
            .map(drop)
            .ok_or_else(|| illegal(format!("role not found: {name}")))
    }

    fn grant_privilege(&self, role: &str, grant: &PrivilegeGrant) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let known = KNOWN_PRIVILEGES.contains(&grant.privilege.as_str())
            || state.privilege_groups.contains_key(&grant.privilege);
        if !known {
            return Err(Error::server(
                CODE_PRIVILEGE,
                format!("not found the privilege name[{}]", grant.privilege),
            ));
        }
        let grants = state
            .roles
            .get_mut(role)
            .ok_or_else(|| illegal(format!("role not found: {role}")))?;
        if !grants.contains(grant) {
            grants.push(grant.clone());
        }
        Ok(())
    }

    fn revoke_privilege(&self, role: &str, grant: &PrivilegeGrant) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let grants = state
            .roles
            .get_mut(role)
            .ok_or_else(|| illegal(format!("role not found: {role}")))?;
        grants.retain(|g| {
            g.object_type != grant.object_type
                || g.object_name != grant.object_name
                || g.privilege != grant.privilege
                || g.db_name != grant.db_name
        });
        Ok(())
    }

    fn list_privilege_groups(&self) -> Result<Vec<PrivilegeGroupInfo>> {
        Ok(self
            .state
            .borrow()
            .privilege_groups
            .iter()
            .map(|(name, privileges)| PrivilegeGroupInfo {
                name: name.clone(),
                privileges: privileges.clone(),
            })
            .collect())
    }

    fn create_privilege_group(&self, name: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.privilege_groups.contains_key(name) {
            return Err(illegal(format!("privilege group [{name}] already exists")));
        }
        state.privilege_groups.insert(name.to_string(), Vec::new());
        Ok(())
    }

    fn drop_privilege_group(&self, name: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let in_use = state
            .roles
            .values()
            .flatten()
            .any(|g| g.privilege == name);
        if in_use {
            return Err(illegal(format!(
                "privilege group [{name}] is granted to a role, revoke it first"
            )));
        }
        state
            .privilege_groups
            .remove(name)
            .map(drop)
            .ok_or_else(|| illegal(format!("privilege group [{name}] does not exist")))
    }

    fn add_privileges_to_group(&self, name: &str, privileges: &[String]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(bad) = privileges
            .iter()
            .find(|p| !KNOWN_PRIVILEGES.contains(&p.as_str()))
        {
            return Err(Error::server(
                CODE_PRIVILEGE,
                format!("not found the privilege name[{bad}]"),
            ));
        }
        let group = state
            .privilege_groups
            .get_mut(name)
            .ok_or_else(|| illegal(format!("privilege group [{name}] does not exist")))?;
        for p in privileges {
            if !group.contains(p) {
                group.push(p.clone());
            }
        }
        Ok(())
    }

    fn remove_privileges_from_group(&self, name: &str, privileges: &[String]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let group = state
            .privilege_groups
            .get_mut(name)
            .ok_or_else(|| illegal(format!("privilege group [{name}] does not exist")))?;
        group.retain(|p| !privileges.contains(p));
        Ok(())
    }

    fn list_resource_groups(&self) -> Result<Vec<String>> {
        Ok(self.state.borrow().resource_groups.keys().cloned().collect())
    }

    fn describe_resource_group(&self, name: &str) -> Result<ResourceGroupInfo> {
        let state = self.state.borrow();
        let config = state.resource_groups.get(name).ok_or_else(|| {
            Error::server(
                CODE_RESOURCE_GROUP,
                format!("resource group not found[rg={name}]"),
            )
        })?;
        let loaded_replicas = state
            .replicas
            .iter()
            .filter(|(_, (rg, _))| rg == name)
            .map(|(coll, (_, n))| (coll.clone(), *n))
            .collect();
        Ok(ResourceGroupInfo {
            name: name.to_string(),
            capacity: config.limits_node_num,
            available_nodes: u32::from(name == DEFAULT_RESOURCE_GROUP),
            config: *config,
            loaded_replicas,
        })
    }

    fn create_resource_group(&self, name: &str, config: &ResourceGroupConfig) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.resource_groups.contains_key(name) {
            return Err(Error::server(
                CODE_RESOURCE_GROUP,
                format!("resource group already exist[rg={name}]"),
            ));
        }
        state.resource_groups.insert(name.to_string(), *config);
        Ok(())
    }

    fn update_resource_group(&self, name: &str, config: &ResourceGroupConfig) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let entry = state.resource_groups.get_mut(name).ok_or_else(|| {
            Error::server(
                CODE_RESOURCE_GROUP,
                format!("resource group not found[rg={name}]"),
            )
        })?;
        *entry = *config;
        Ok(())
    }

    fn drop_resource_group(&self, name: &str) -> Result<()> {
        if name == DEFAULT_RESOURCE_GROUP {
            return Err(Error::server(
                CODE_RESOURCE_GROUP,
                "delete default rg is not permitted",
            ));
        }
        let mut state = self.state.borrow_mut();
        if state.replicas.values().any(|(rg, _)| rg == name) {
            return Err(Error::server(
                CODE_RESOURCE_GROUP,
                format!("some replicas still loaded in resource group[{name}]"),
            ));
        }
        state
            .resource_groups
            .remove(name)
            .map(drop)
            .ok_or_else(|| {
                Error::server(
                    CODE_RESOURCE_GROUP,
                    format!("resource group not found[rg={name}]"),
                )
            })
    }

    fn transfer_replica(
        &self,
        source: &str,
        target: &str,
        collection: &str,
        num_replicas: u32,
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        for rg in [source, target] {
            if !state.resource_groups.contains_key(rg) {
                return Err(Error::server(
                    CODE_RESOURCE_GROUP,
                    format!("resource group not found[rg={rg}]"),
                ));
            }
        }
        match state.replicas.get_mut(collection) {
            Some((rg, n)) if rg == source && *n >= num_replicas => {
                *rg = target.to_string();
                *n = num_replicas;
                Ok(())
            }
            Some(_) => Err(Error::server(
                CODE_RESOURCE_GROUP,
                format!("only found fewer replicas in source resource group[rg={source}]"),
            )),
            None => Err(Error::server(
                CODE_COLLECTION_NOT_LOADED,
                format!("collection not loaded[collection={collection}]"),
            )),
        }
    }

    fn insert(
        &self,
        collection: &str,
        partition: Option<&str>,
        rows: &[Row],
    ) -> Result<MutationResult> {
        self.write_rows(collection, partition, rows, false)
    }

    fn upsert(
        &self,
        collection: &str,
        partition: Option<&str>,
        rows: &[Row],
    ) -> Result<MutationResult> {
        self.write_rows(collection, partition, rows, true)
    }

    fn delete(&self, request: &DeleteRequest) -> Result<MutationResult> {
        let predicate = Predicate::parse(&request.filter)?;
        if predicate == Predicate::All {
            return Err(illegal("delete plan can't be empty or always true"));
        }
        self.with_collection_mut(&request.collection, |coll| {
            let primary = coll.primary_name();
            let mut ids = Vec::new();
            for (name, rows) in &mut coll.partitions {
                if request.partition.as_ref().is_some_and(|p| p != name) {
                    continue;
                }
                rows.retain(|row| {
                    if predicate.matches(row) {
                        ids.push(row.get(&primary).cloned().unwrap_or(Value::Null));
                        false
                    } else {
                        true
                    }
                });
            }
            Ok(MutationResult {
                count: ids.len() as u64,
                ids,
            })
        })
    }

    fn query(&self, request: &QueryRequest) -> Result<Vec<Row>> {
        let predicate = Predicate::parse(&request.filter)?;
        self.with_collection(&request.collection, |coll| {
            Self::ensure_loaded(coll, &request.collection, &request.partition_names)?;
            if predicate == Predicate::All && request.limit.is_none() {
                return Err(illegal(
                    "empty expression should be used with limit",
                ));
            }
            let primary = coll.primary_name();
            let offset = usize::try_from(request.offset.unwrap_or(0)).unwrap_or(usize::MAX);
            let limit = request
                .limit
                .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
            Ok(coll
                .rows_in(&request.partition_names)
                .filter(|row| predicate.matches(row))
                .skip(offset)
                .take(limit)
                .map(|row| project(row, &primary, &request.output_fields))
                .collect())
        })
    }

    fn get(&self, collection: &str, ids: &[Value], output_fields: &[String]) -> Result<Vec<Row>> {
        self.with_collection(collection, |coll| {
            Self::ensure_loaded(coll, collection, &[])?;
            let primary = coll.primary_name();
            Ok(coll
                .rows_in(&[])
                .filter(|row| row.get(&primary).is_some_and(|pk| ids.iter().any(|id| same(pk, id))))
                .map(|row| project(row, &primary, output_fields))
                .collect())
        })
    }

    fn search(&self, request: &SearchRequest) -> Result<Vec<Vec<Row>>> {
        self.with_collection(&request.collection, |coll| {
            Self::ensure_loaded(coll, &request.collection, &request.partition_names)?;
            let primary = coll.primary_name();
            let scored = Self::run_search(
                coll,
                &request.anns_field,
                &request.data,
                &request.metric_type,
                request.filter.as_deref(),
                &request.partition_names,
            )?;
            let offset = usize::try_from(request.offset).unwrap_or(usize::MAX);
            let limit = usize::try_from(request.limit).unwrap_or(usize::MAX);
            Ok(scored
                .into_iter()
                .map(|hits| {
                    hits.into_iter()
                        .skip(offset)
                        .take(limit)
                        .map(|(score, row)| {
                            let mut hit = project(&row, &primary, &request.output_fields);
                            hit.insert("distance".to_string(), json!(score));
                            hit
                        })
                        .collect()
                })
                .collect())
        })
    }

    fn hybrid_search(&self, request: &HybridSearchRequest) -> Result<Vec<Vec<Row>>> {
        if let Ranker::Weighted(weights) = &request.ranker {
            if weights.len() != request.requests.len() {
                return Err(illegal(format!(
                    "the length of weights param mismatch with ann search requests: {} vs {}",
                    weights.len(),
                    request.requests.len()
                )));
            }
        }
        self.with_collection(&request.collection, |coll| {
            Self::ensure_loaded(coll, &request.collection, &request.partition_names)?;
            let primary = coll.primary_name();
            let nq = request.requests.first().map_or(0, |leg| leg.data.len());
            let mut fused: Vec<BTreeMap<String, (f32, Row)>> = vec![BTreeMap::new(); nq];

            for (leg_idx, leg) in request.requests.iter().enumerate() {
                let metric = Metric::parse(&leg.metric_type)?;
                let per_query = Self::run_search(
                    coll,
                    &leg.anns_field,
                    &leg.data,
                    &leg.metric_type,
                    leg.filter.as_deref(),
                    &request.partition_names,
                )?;
                for (q, hits) in per_query.into_iter().enumerate().take(nq) {
                    let limit = usize::try_from(leg.limit).unwrap_or(usize::MAX);
                    for (rank, (score, row)) in hits.into_iter().take(limit).enumerate() {
                        let contribution = match &request.ranker {
                            Ranker::Rrf { k } => 1.0 / (*k as f32 + rank as f32 + 1.0),
                            Ranker::Weighted(weights) => weights[leg_idx] * metric.normalize(score),
                        };
                        let key = row.get(&primary).map(Value::to_string).unwrap_or_default();
                        let entry = fused[q].entry(key).or_insert((0.0, row));
                        entry.0 += contribution;
                    }
                }
            }

            let limit = usize::try_from(request.limit).unwrap_or(usize::MAX);
            Ok(fused
                .into_iter()
                .map(|by_pk| {
                    let mut hits: Vec<(f32, Row)> = by_pk.into_values().collect();
                    hits.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
                    hits.into_iter()
                        .take(limit)
                        .map(|(score, row)| {
                            let mut hit = project(&row, &primary, &request.output_fields);
                            hit.insert("distance".to_string(), json!(score));
                            hit
                        })
                        .collect()
                })
                .collect())
        })
    }
}

/// Built-in privilege names accepted by grants and privilege groups.
const KNOWN_PRIVILEGES: &[&str] = &[
    "CreateIndex",
    "DropIndex",
    "IndexDetail",
    "Load",
    "GetLoadingProgress",
    "GetLoadState",
    "Insert",
    "Delete",
    "Upsert",
    "Search",
    "Flush",
    "GetFlushState",
    "Query",
    "GetStatistics",
    "Compaction",
    "Import",
    "LoadBalance",
    "CreateAlias",
    "DropAlias",
    "DescribeAlias",
    "ListAliases",
    "CreatePartition",
    "DropPartition",
    "ShowPartitions",
    "HasPartition",
    "All",
    "CreateCollection",
    "DropCollection",
    "DescribeCollection",
    "ShowCollections",
    "RenameCollection",
    "FlushAll",
    "CreateOwnership",
    "DropOwnership",
    "SelectOwnership",
    "ManageOwnership",
    "CreateResourceGroup",
    "DropResourceGroup",
    "DescribeResourceGroup",
    "ListResourceGroups",
    "TransferNode",
    "TransferReplica",
    "CreateDatabase",
    "DropDatabase",
    "ListDatabases",
    "UpdateUser",
    "SelectUser",
    "*",
];

// ============================================================================
// Connector
// ============================================================================

/// Connector handing out handles on one shared in-process server.
#[derive(Clone)]
pub struct MemoryConnector {
    state: Rc<RefCell<State>>,
    reachable: bool,
}

impl MemoryConnector {
    /// Creates a connector on a fresh server.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(State::default())),
            reachable: true,
        }
    }

    /// A connector whose server refuses every connection.
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new()
        }
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, config: &ConnectConfig) -> Result<Box<dyn VectorService>> {
        if !self.reachable {
            return Err(Error::Connection(format!(
                "connection refused: {}",
                config.uri
            )));
        }
        if let Some((user, password)) = config.token.as_deref().and_then(|t| t.split_once(':')) {
            let state = self.state.borrow();
            let valid = state.users.get(user).is_some_and(|u| u.password == password);
            if !valid {
                return Err(Error::Authentication(
                    "incorrect username or password".to_string(),
                ));
            }
        }
        let mut service = InMemoryService::with_state(Rc::clone(&self.state), &config.uri);
        service.use_database(&config.db_name)?;
        Ok(Box::new(service))
    }
}
