//! Blocking client for the Milvus RESTful v2 API.
//!
//! Every operation is a `POST /v2/vectordb/<resource>/<action>` carrying a JSON
//! body. Responses share one envelope: `{"code": 0, "data": ...}` on success,
//! `{"code": <n>, "message": "..."}` on failure.

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Certificate, Identity};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::service::{Connector, VectorService};
use crate::types::{
    AliasInfo, CollectionInfo, CollectionSchema, CompactionState, ConnectConfig,
    CreateCollectionOptions, DataType, DatabaseInfo, DeleteRequest, FieldSchema,
    HybridSearchRequest, IndexInfo, IndexParams, LoadState, LoadStatus, MutationResult,
    PrivilegeGrant, PrivilegeGroupInfo, QueryRequest, Ranker, ResourceGroupConfig,
    ResourceGroupInfo, Row, SearchRequest, TlsMode, UserInfo,
};

/// Server code for a rejected credential.
const CODE_AUTH_FAILED: i64 = 1800;

/// Response envelope shared by all endpoints.
#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

/// REST transport implementing [`VectorService`].
pub struct RestClient {
    base_url: String,
    db_name: String,
    token: Option<String>,
    http: Client,
}

impl RestClient {
    /// Creates a client; no request is sent.
    pub fn new(config: &ConnectConfig) -> Result<Self> {
        let http = build_http_client(config)?;
        Ok(Self {
            base_url: normalize_base_url(&config.uri, config.tls),
            db_name: config.db_name.clone(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            http,
        })
    }

    fn build_request(&self, path: &str) -> RequestBuilder {
        let url = format!("{}/v2/vectordb/{}", self.base_url, path);
        let mut req = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Sends one request and unwraps the envelope.
    fn call(&self, path: &str, body: Value) -> Result<Value> {
        debug!(endpoint = path, db = %self.db_name, "POST");
        let response = self.build_request(path).json(&body).send()?;
        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            return Err(handle_http_error(status.as_u16(), &text));
        }
        decode_envelope(&text)
    }

    /// Adds `dbName` to a request body.
    fn scoped(&self, mut body: Value) -> Value {
        if let Value::Object(map) = &mut body {
            map.insert("dbName".to_string(), json!(self.db_name));
        }
        body
    }

    fn call_scoped(&self, path: &str, body: Value) -> Result<Value> {
        let body = self.scoped(body);
        self.call(path, body)
    }
}

/// Creates the HTTP client with timeout and TLS material.
fn build_http_client(config: &ConnectConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(config.timeout)
        .connect_timeout(Duration::from_secs(10));

    if config.tls != TlsMode::Disabled {
        if let Some(path) = &config.cert_path {
            let pem = std::fs::read(path)
                .map_err(|e| Error::Tls(format!("cannot read {}: {e}", path.display())))?;
            let cert = Certificate::from_pem(&pem).map_err(|e| Error::Tls(e.to_string()))?;
            builder = builder.add_root_certificate(cert);
        }
    }

    if config.tls == TlsMode::TwoWay {
        let (Some(cert_path), Some(key_path)) = (&config.client_cert, &config.client_key) else {
            return Err(Error::Tls(
                "two-way TLS requires a client certificate and a client key".to_string(),
            ));
        };
        let cert = std::fs::read(cert_path)
            .map_err(|e| Error::Tls(format!("cannot read {}: {e}", cert_path.display())))?;
        let key = std::fs::read(key_path)
            .map_err(|e| Error::Tls(format!("cannot read {}: {e}", key_path.display())))?;
        let identity =
            Identity::from_pkcs8_pem(&cert, &key).map_err(|e| Error::Tls(e.to_string()))?;
        builder = builder.identity(identity);
    }

    builder
        .build()
        .map_err(|e| Error::Tls(format!("cannot build http client: {e}")))
}

/// Adds a scheme when missing and upgrades to https when TLS is on.
pub(crate) fn normalize_base_url(uri: &str, tls: TlsMode) -> String {
    let uri = uri.trim().trim_end_matches('/');
    let with_scheme = if uri.contains("://") {
        uri.to_string()
    } else {
        format!("http://{uri}")
    };
    if tls == TlsMode::Disabled {
        return with_scheme;
    }
    match with_scheme.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => with_scheme.clone(),
    }
}

/// Maps non-2xx HTTP statuses.
pub(crate) fn handle_http_error(status_code: u16, body: &str) -> Error {
    match status_code {
        401 | 403 => Error::Authentication(body.to_string()),
        404 => Error::Unsupported(format!("endpoint not found: {body}")),
        _ => Error::Transport(format!("http {status_code}: {body}")),
    }
}

/// Unwraps the response envelope.
pub(crate) fn decode_envelope(text: &str) -> Result<Value> {
    let envelope: Envelope = serde_json::from_str(text)?;
    match envelope.code {
        0 | 200 => Ok(envelope.data),
        CODE_AUTH_FAILED => Err(Error::Authentication(
            envelope.message.unwrap_or_default(),
        )),
        code => Err(Error::server(
            code,
            envelope.message.unwrap_or_else(|| "unknown error".to_string()),
        )),
    }
}

// ============================================================================
// Request bodies
// ============================================================================

/// Serializes one field for `collections/create`.
pub(crate) fn field_body(field: &FieldSchema) -> Value {
    let mut map = Map::new();
    map.insert("fieldName".into(), json!(field.name));
    map.insert("dataType".into(), json!(field.data_type.wire_name()));
    if field.is_primary {
        map.insert("isPrimary".into(), json!(true));
    }
    if field.is_partition_key {
        map.insert("isPartitionKey".into(), json!(true));
    }
    if field.nullable {
        map.insert("nullable".into(), json!(true));
    }
    if let Some(default) = &field.default_value {
        map.insert("defaultValue".into(), default.clone());
    }
    if !field.description.is_empty() {
        map.insert("description".into(), json!(field.description));
    }
    if let Some(element) = field.element_type {
        map.insert("elementDataType".into(), json!(element.wire_name()));
    }

    let mut type_params = Map::new();
    if let Some(dim) = field.dim {
        type_params.insert("dim".into(), json!(dim.to_string()));
    }
    if let Some(max_length) = field.max_length {
        type_params.insert("max_length".into(), json!(max_length.to_string()));
    }
    if let Some(cap) = field.max_capacity {
        type_params.insert("max_capacity".into(), json!(cap.to_string()));
    }
    if !type_params.is_empty() {
        map.insert("elementTypeParams".into(), Value::Object(type_params));
    }
    Value::Object(map)
}

/// Serializes `collections/create`.
pub(crate) fn create_collection_body(
    name: &str,
    schema: &CollectionSchema,
    options: &CreateCollectionOptions,
) -> Value {
    let fields: Vec<Value> = schema.fields.iter().map(field_body).collect();
    let mut params = Map::new();
    if let Some(shards) = options.shards_num {
        params.insert("shardsNum".into(), json!(shards));
    }
    if let Some(level) = options.consistency_level {
        params.insert("consistencyLevel".into(), json!(level.as_str()));
    }
    if let Some(n) = options.num_partitions {
        params.insert("partitionsNum".into(), json!(n));
    }
    json!({
        "collectionName": name,
        "description": schema.description,
        "schema": {
            "autoId": schema.auto_id,
            "enableDynamicField": schema.enable_dynamic_field,
            "fields": fields,
        },
        "params": Value::Object(params),
    })
}

/// Serializes `indexes/create`.
pub(crate) fn create_index_body(collection: &str, params: &IndexParams) -> Value {
    let mut index_params = Map::new();
    index_params.insert("index_type".into(), json!(params.index_type));
    for (k, v) in &params.params {
        index_params.insert(k.clone(), v.clone());
    }
    let mut entry = Map::new();
    entry.insert("fieldName".into(), json!(params.field_name));
    entry.insert("indexName".into(), json!(params.index_name));
    if let Some(metric) = &params.metric_type {
        entry.insert("metricType".into(), json!(metric));
    }
    entry.insert("params".into(), Value::Object(index_params));
    json!({
        "collectionName": collection,
        "indexParams": [Value::Object(entry)],
    })
}

fn params_object(params: &[(String, Value)]) -> Value {
    Value::Object(params.iter().cloned().collect())
}

/// Serializes `entities/search`.
pub(crate) fn search_body(request: &SearchRequest) -> Value {
    let mut map = Map::new();
    map.insert("collectionName".into(), json!(request.collection));
    map.insert("data".into(), request.data.to_json());
    map.insert("annsField".into(), json!(request.anns_field));
    map.insert("limit".into(), json!(request.limit));
    if request.offset > 0 {
        map.insert("offset".into(), json!(request.offset));
    }
    if let Some(filter) = request.filter.as_ref().filter(|f| !f.is_empty()) {
        map.insert("filter".into(), json!(filter));
    }
    if !request.output_fields.is_empty() {
        map.insert("outputFields".into(), json!(request.output_fields));
    }
    if !request.partition_names.is_empty() {
        map.insert("partitionNames".into(), json!(request.partition_names));
    }
    map.insert(
        "searchParams".into(),
        json!({
            "metricType": request.metric_type,
            "params": params_object(&request.params),
        }),
    );
    if let Some(ts) = request.guarantee_timestamp {
        map.insert("guaranteeTimestamp".into(), json!(ts));
    }
    Value::Object(map)
}

/// Serializes `entities/query`.
pub(crate) fn query_body(request: &QueryRequest) -> Value {
    let mut map = Map::new();
    map.insert("collectionName".into(), json!(request.collection));
    map.insert("filter".into(), json!(request.filter));
    if !request.output_fields.is_empty() {
        map.insert("outputFields".into(), json!(request.output_fields));
    }
    if !request.partition_names.is_empty() {
        map.insert("partitionNames".into(), json!(request.partition_names));
    }
    if let Some(limit) = request.limit {
        map.insert("limit".into(), json!(limit));
    }
    if let Some(offset) = request.offset {
        map.insert("offset".into(), json!(offset));
    }
    if let Some(ts) = request.guarantee_timestamp {
        map.insert("guaranteeTimestamp".into(), json!(ts));
    }
    if let Some(ms) = request.graceful_time {
        map.insert("gracefulTime".into(), json!(ms));
    }
    Value::Object(map)
}

/// Serializes `entities/hybrid_search`.
pub(crate) fn hybrid_search_body(request: &HybridSearchRequest) -> Value {
    let legs: Vec<Value> = request
        .requests
        .iter()
        .map(|leg| {
            let mut map = Map::new();
            map.insert("data".into(), leg.data.to_json());
            map.insert("annsField".into(), json!(leg.anns_field));
            map.insert("limit".into(), json!(leg.limit));
            map.insert("metricType".into(), json!(leg.metric_type));
            map.insert("params".into(), params_object(&leg.params));
            if let Some(filter) = leg.filter.as_ref().filter(|f| !f.is_empty()) {
                map.insert("filter".into(), json!(filter));
            }
            Value::Object(map)
        })
        .collect();
    let rerank = match &request.ranker {
        Ranker::Rrf { k } => json!({"strategy": "rrf", "params": {"k": k}}),
        Ranker::Weighted(weights) => json!({"strategy": "weighted", "params": {"weights": weights}}),
    };
    let mut map = Map::new();
    map.insert("collectionName".into(), json!(request.collection));
    map.insert("search".into(), Value::Array(legs));
    map.insert("rerank".into(), rerank);
    map.insert("limit".into(), json!(request.limit));
    if !request.output_fields.is_empty() {
        map.insert("outputFields".into(), json!(request.output_fields));
    }
    if !request.partition_names.is_empty() {
        map.insert("partitionNames".into(), json!(request.partition_names));
    }
    Value::Object(map)
}

// ============================================================================
// Response decoding
// ============================================================================

fn str_at(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn u64_at(value: &Value, key: &str) -> u64 {
    value
        .get(key)
        .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or_default()
}

fn bool_at(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Decodes a JSON array of strings.
pub(crate) fn parse_string_list(data: &Value) -> Result<Vec<String>> {
    match data {
        Value::Array(items) => Ok(items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(Error::Decode(format!("expected a list of names, got {other}"))),
    }
}

/// Decodes a field description returned by `collections/describe`.
pub(crate) fn parse_field(value: &Value) -> Result<FieldSchema> {
    let type_name = str_at(value, "type");
    let data_type = DataType::from_wire_name(&type_name)
        .ok_or_else(|| Error::Decode(format!("unknown field type '{type_name}'")))?;
    let mut field = FieldSchema::new(str_at(value, "name"), data_type);
    field.is_primary = bool_at(value, "primaryKey");
    field.auto_id = bool_at(value, "autoId");
    field.is_partition_key = bool_at(value, "partitionKey");
    field.nullable = bool_at(value, "nullable");
    field.description = str_at(value, "description");
    field.default_value = value.get("defaultValue").cloned().filter(|v| !v.is_null());
    field.element_type = value
        .get("elementType")
        .and_then(Value::as_str)
        .and_then(DataType::from_wire_name);

    if let Some(Value::Array(params)) = value.get("params") {
        for param in params {
            let parsed = param
                .get("value")
                .and_then(|v| v.as_str().and_then(|s| s.parse::<u32>().ok()).or_else(|| {
                    v.as_u64().and_then(|n| u32::try_from(n).ok())
                }));
            match (param.get("key").and_then(Value::as_str), parsed) {
                (Some("dim"), Some(n)) => field.dim = Some(n),
                (Some("max_length"), Some(n)) => field.max_length = Some(n),
                (Some("max_capacity"), Some(n)) => field.max_capacity = Some(n),
                _ => {}
            }
        }
    }
    Ok(field)
}

/// Decodes `collections/describe`.
pub(crate) fn parse_collection_info(data: &Value) -> Result<CollectionInfo> {
    let fields = match data.get("fields") {
        Some(Value::Array(items)) => items.iter().map(parse_field).collect::<Result<_>>()?,
        _ => Vec::new(),
    };
    Ok(CollectionInfo {
        name: str_at(data, "collectionName"),
        collection_id: data
            .get("collectionID")
            .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .unwrap_or_default(),
        description: str_at(data, "description"),
        fields,
        auto_id: bool_at(data, "autoId"),
        enable_dynamic_field: bool_at(data, "enableDynamicField"),
        consistency_level: str_at(data, "consistencyLevel"),
        shards_num: u32::try_from(u64_at(data, "shardsNum")).unwrap_or(u32::MAX),
        partitions_num: u32::try_from(u64_at(data, "partitionsNum")).unwrap_or(u32::MAX),
        aliases: data
            .get("aliases")
            .map(parse_string_list)
            .transpose()?
            .unwrap_or_default(),
        created_timestamp: u64_at(data, "createTime"),
    })
}

/// Decodes one entry of `indexes/describe`.
pub(crate) fn parse_index_info(data: &Value) -> IndexInfo {
    let entry = match data {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
        other => other.clone(),
    };
    let params = match entry.get("params") {
        Some(Value::Object(map)) => map
            .iter()
            .filter(|(k, _)| k.as_str() != "index_type" && k.as_str() != "metric_type")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        _ => Vec::new(),
    };
    IndexInfo {
        index_name: str_at(&entry, "indexName"),
        field_name: str_at(&entry, "fieldName"),
        index_type: str_at(&entry, "indexType"),
        metric_type: str_at(&entry, "metricType"),
        params,
        indexed_rows: u64_at(&entry, "indexedRows"),
        total_rows: u64_at(&entry, "totalRows"),
        pending_rows: u64_at(&entry, "pendingRows"),
        state: str_at(&entry, "indexState"),
    }
}

/// Decodes `privilege_groups/list`, which answers either a bare list or a
/// `privilegeGroups` wrapper.
pub(crate) fn parse_privilege_groups(data: &Value) -> Vec<PrivilegeGroupInfo> {
    let items = match data {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get("privilegeGroups")
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice),
        _ => &[],
    };
    items
        .iter()
        .map(|item| {
            let privileges = match item.get("privileges") {
                Some(Value::Array(list)) => list
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                Some(Value::String(csv)) => csv
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
                _ => Vec::new(),
            };
            PrivilegeGroupInfo {
                name: str_at(item, "privilegeGroupName"),
                privileges,
            }
        })
        .collect()
}

/// Decodes `resource_groups/describe`.
pub(crate) fn parse_resource_group(data: &Value) -> ResourceGroupInfo {
    let group = data.get("resource_group").unwrap_or(data);
    let node_num = |section: &str| {
        group
            .get("config")
            .and_then(|c| c.get(section))
            .map(|s| u32::try_from(u64_at(s, "node_num")).unwrap_or(u32::MAX))
            .unwrap_or_default()
    };
    let mut loaded_replicas: Vec<(String, u32)> = match group.get("num_loaded_replica") {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| {
                let n = v.as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or(0);
                (k.clone(), n)
            })
            .collect(),
        _ => Vec::new(),
    };
    loaded_replicas.sort();
    ResourceGroupInfo {
        name: str_at(group, "name"),
        capacity: u32::try_from(u64_at(group, "capacity")).unwrap_or(u32::MAX),
        available_nodes: u32::try_from(u64_at(group, "num_available_node")).unwrap_or(u32::MAX),
        config: ResourceGroupConfig {
            requests_node_num: node_num("requests"),
            limits_node_num: node_num("limits"),
        },
        loaded_replicas,
    }
}

/// Decodes an object or an array of objects into rows.
pub(crate) fn parse_rows(data: Value) -> Result<Vec<Row>> {
    match data {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                other => Err(Error::Decode(format!("expected an entity object, got {other}"))),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(Error::Decode(format!("expected a list of entities, got {other}"))),
    }
}

/// Splits search hits per query vector.
///
/// The server answers a flat list; with several query vectors each group holds
/// at most `limit` hits, in query order.
pub(crate) fn split_hits(data: Value, nq: usize, limit: u64) -> Result<Vec<Vec<Row>>> {
    if let Value::Array(items) = &data {
        if items.iter().all(Value::is_array) && !items.is_empty() {
            return items.iter().cloned().map(parse_rows).collect();
        }
    }
    let rows = parse_rows(data)?;
    if nq <= 1 {
        return Ok(vec![rows]);
    }
    let chunk = usize::try_from(limit.max(1)).unwrap_or(usize::MAX);
    let mut groups: Vec<Vec<Row>> = rows.chunks(chunk).map(<[Row]>::to_vec).collect();
    groups.resize(nq.max(groups.len()), Vec::new());
    Ok(groups)
}

fn mutation_result(data: &Value, count_key: &str, ids_key: &str) -> MutationResult {
    MutationResult {
        count: u64_at(data, count_key),
        ids: data
            .get(ids_key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    }
}

fn grant_body(role: &str, grant: &PrivilegeGrant) -> Value {
    json!({
        "roleName": role,
        "objectType": grant.object_type,
        "objectName": grant.object_name,
        "privilege": grant.privilege,
        "dbName": grant.db_name,
    })
}

fn rg_config_body(config: &ResourceGroupConfig) -> Value {
    json!({
        "requests": {"node_num": config.requests_node_num},
        "limits": {"node_num": config.limits_node_num},
    })
}

// ============================================================================
// VectorService
// ============================================================================

impl VectorService for RestClient {
    fn endpoint(&self) -> &str {
        &self.base_url
    }

    fn current_database(&self) -> &str {
        &self.db_name
    }

    fn use_database(&mut self, name: &str) -> Result<()> {
        self.db_name = name.to_string();
        Ok(())
    }

    fn list_databases(&self) -> Result<Vec<String>> {
        parse_string_list(&self.call("databases/list", json!({}))?)
    }

    fn create_database(&self, name: &str, properties: &[(String, String)]) -> Result<()> {
        let props: Map<String, Value> = properties
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();
        self.call(
            "databases/create",
            json!({"dbName": name, "properties": Value::Object(props)}),
        )
        .map(drop)
    }

    fn describe_database(&self, name: &str) -> Result<DatabaseInfo> {
        let data = self.call("databases/describe", json!({"dbName": name}))?;
        let properties = match data.get("properties") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|p| (str_at(p, "key"), str_at(p, "value")))
                .collect(),
            _ => Vec::new(),
        };
        Ok(DatabaseInfo {
            name: str_at(&data, "dbName"),
            db_id: data.get("dbID").and_then(Value::as_i64).unwrap_or_default(),
            properties,
        })
    }

    fn drop_database(&self, name: &str) -> Result<()> {
        self.call("databases/drop", json!({"dbName": name})).map(drop)
    }

    fn list_collections(&self) -> Result<Vec<String>> {
        parse_string_list(&self.call_scoped("collections/list", json!({}))?)
    }

    fn has_collection(&self, name: &str) -> Result<bool> {
        let data = self.call_scoped("collections/has", json!({"collectionName": name}))?;
        Ok(bool_at(&data, "has"))
    }

    fn create_collection(
        &self,
        name: &str,
        schema: &CollectionSchema,
        options: &CreateCollectionOptions,
    ) -> Result<()> {
        self.call_scoped(
            "collections/create",
            create_collection_body(name, schema, options),
        )
        .map(drop)
    }

    fn describe_collection(&self, name: &str) -> Result<CollectionInfo> {
        let data = self.call_scoped("collections/describe", json!({"collectionName": name}))?;
        parse_collection_info(&data)
    }

    fn drop_collection(&self, name: &str) -> Result<()> {
        self.call_scoped("collections/drop", json!({"collectionName": name}))
            .map(drop)
    }

    fn rename_collection(
        &self,
        old_name: &str,
        new_name: &str,
        new_db: Option<&str>,
    ) -> Result<()> {
        let mut body = json!({"collectionName": old_name, "newCollectionName": new_name});
        if let (Some(db), Value::Object(map)) = (new_db, &mut body) {
            map.insert("newDbName".into(), json!(db));
        }
        self.call_scoped("collections/rename", body).map(drop)
    }

    fn collection_row_count(&self, name: &str) -> Result<u64> {
        let data = self.call_scoped("collections/get_stats", json!({"collectionName": name}))?;
        Ok(u64_at(&data, "rowCount"))
    }

    fn load_collection(&self, name: &str, replicas: Option<u32>) -> Result<()> {
        let mut body = json!({"collectionName": name});
        if let (Some(n), Value::Object(map)) = (replicas, &mut body) {
            map.insert("replicaNumber".into(), json!(n));
        }
        self.call_scoped("collections/load", body).map(drop)
    }

    fn release_collection(&self, name: &str) -> Result<()> {
        self.call_scoped("collections/release", json!({"collectionName": name}))
            .map(drop)
    }

    fn load_state(&self, collection: &str, partition: Option<&str>) -> Result<LoadStatus> {
        let mut body = json!({"collectionName": collection});
        if let (Some(p), Value::Object(map)) = (partition, &mut body) {
            map.insert("partitionNames".into(), json!([p]));
        }
        let data = self.call_scoped("collections/get_load_state", body)?;
        Ok(LoadStatus {
            state: LoadState::from_wire(&str_at(&data, "loadState")),
            progress: data
                .get("loadProgress")
                .and_then(Value::as_u64)
                .and_then(|p| u32::try_from(p).ok()),
        })
    }

    fn flush(&self, collection: &str) -> Result<()> {
        self.call_scoped("collections/flush", json!({"collectionName": collection}))
            .map(drop)
    }

    fn compact(&self, collection: &str) -> Result<i64> {
        let data = self.call_scoped("collections/compact", json!({"collectionName": collection}))?;
        Ok(data
            .get("compactionID")
            .and_then(Value::as_i64)
            .unwrap_or_default())
    }

    fn compaction_state(&self, job_id: i64) -> Result<CompactionState> {
        let data = self.call_scoped(
            "collections/get_compaction_state",
            json!({"compactionID": job_id}),
        )?;
        Ok(CompactionState {
            job_id,
            state: str_at(&data, "state"),
            executing_plans: u64_at(&data, "executingPlanNo"),
            completed_plans: u64_at(&data, "completedPlanNo"),
            timeout_plans: u64_at(&data, "timeoutPlanNo"),
        })
    }

    fn list_partitions(&self, collection: &str) -> Result<Vec<String>> {
        parse_string_list(
            &self.call_scoped("partitions/list", json!({"collectionName": collection}))?,
        )
    }

    fn has_partition(&self, collection: &str, partition: &str) -> Result<bool> {
        let data = self.call_scoped(
            "partitions/has",
            json!({"collectionName": collection, "partitionName": partition}),
        )?;
        Ok(bool_at(&data, "has"))
    }

    fn create_partition(&self, collection: &str, partition: &str) -> Result<()> {
        self.call_scoped(
            "partitions/create",
            json!({"collectionName": collection, "partitionName": partition}),
        )
        .map(drop)
    }

    fn drop_partition(&self, collection: &str, partition: &str) -> Result<()> {
        self.call_scoped(
            "partitions/drop",
            json!({"collectionName": collection, "partitionName": partition}),
        )
        .map(drop)
    }

    fn partition_row_count(&self, collection: &str, partition: &str) -> Result<u64> {
        let data = self.call_scoped(
            "partitions/get_stats",
            json!({"collectionName": collection, "partitionName": partition}),
        )?;
        Ok(u64_at(&data, "rowCount"))
    }

    fn load_partitions(&self, collection: &str, partitions: &[String]) -> Result<()> {
        self.call_scoped(
            "partitions/load",
            json!({"collectionName": collection, "partitionNames": partitions}),
        )
        .map(drop)
    }

    fn release_partitions(&self, collection: &str, partitions: &[String]) -> Result<()> {
        self.call_scoped(
            "partitions/release",
            json!({"collectionName": collection, "partitionNames": partitions}),
        )
        .map(drop)
    }

    fn list_indexes(&self, collection: &str) -> Result<Vec<String>> {
        parse_string_list(&self.call_scoped("indexes/list", json!({"collectionName": collection}))?)
    }

    fn describe_index(&self, collection: &str, index_name: &str) -> Result<IndexInfo> {
        let data = self.call_scoped(
            "indexes/describe",
            json!({"collectionName": collection, "indexName": index_name}),
        )?;
        Ok(parse_index_info(&data))
    }

    fn create_index(&self, collection: &str, params: &IndexParams) -> Result<()> {
        self.call_scoped("indexes/create", create_index_body(collection, params))
            .map(drop)
    }

    fn drop_index(&self, collection: &str, index_name: &str) -> Result<()> {
        self.call_scoped(
            "indexes/drop",
            json!({"collectionName": collection, "indexName": index_name}),
        )
        .map(drop)
    }

    fn list_aliases(&self, collection: Option<&str>) -> Result<Vec<String>> {
        let body = collection.map_or_else(|| json!({}), |c| json!({"collectionName": c}));
        parse_string_list(&self.call_scoped("aliases/list", body)?)
    }

    fn describe_alias(&self, alias: &str) -> Result<AliasInfo> {
        let data = self.call_scoped("aliases/describe", json!({"aliasName": alias}))?;
        Ok(AliasInfo {
            alias: str_at(&data, "aliasName"),
            collection: str_at(&data, "collectionName"),
            db_name: str_at(&data, "dbName"),
        })
    }

    fn create_alias(&self, collection: &str, alias: &str) -> Result<()> {
        self.call_scoped(
            "aliases/create",
            json!({"collectionName": collection, "aliasName": alias}),
        )
        .map(drop)
    }

    fn alter_alias(&self, collection: &str, alias: &str) -> Result<()> {
        self.call_scoped(
            "aliases/alter",
            json!({"collectionName": collection, "aliasName": alias}),
        )
        .map(drop)
    }

    fn drop_alias(&self, alias: &str) -> Result<()> {
        self.call_scoped("aliases/drop", json!({"aliasName": alias}))
            .map(drop)
    }

    fn list_users(&self) -> Result<Vec<String>> {
        parse_string_list(&self.call("users/list", json!({}))?)
    }

    fn describe_user(&self, name: &str) -> Result<UserInfo> {
        let data = self.call("users/describe", json!({"userName": name}))?;
        Ok(UserInfo {
            name: name.to_string(),
            roles: parse_string_list(&data)?,
        })
    }

    fn create_user(&self, name: &str, password: &str) -> Result<()> {
        self.call(
            "users/create",
            json!({"userName": name, "password": password}),
        )
        .map(drop)
    }

    fn update_password(&self, name: &str, old_password: &str, new_password: &str) -> Result<()> {
        self.call(
            "users/update_password",
            json!({"userName": name, "password": old_password, "newPassword": new_password}),
        )
        .map(drop)
    }

    fn drop_user(&self, name: &str) -> Result<()> {
        self.call("users/drop", json!({"userName": name})).map(drop)
    }

    fn grant_role(&self, user: &str, role: &str) -> Result<()> {
        self.call(
            "users/grant_role",
            json!({"userName": user, "roleName": role}),
        )
        .map(drop)
    }

    fn revoke_role(&self, user: &str, role: &str) -> Result<()> {
        self.call(
            "users/revoke_role",
            json!({"userName": user, "roleName": role}),
        )
        .map(drop)
    }

    fn list_roles(&self) -> Result<Vec<String>> {
        parse_string_list(&self.call("roles/list", json!({}))?)
    }

    fn describe_role(&self, name: &str) -> Result<Vec<PrivilegeGrant>> {
        let data = self.call("roles/describe", json!({"roleName": name}))?;
        let items = data.as_array().cloned().unwrap_or_default();
        Ok(items
            .iter()
            .map(|item| PrivilegeGrant {
                object_type: str_at(item, "objectType"),
                object_name: str_at(item, "objectName"),
                privilege: str_at(item, "privilege"),
                db_name: str_at(item, "dbName"),
                grantor: item
                    .get("grantor")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
            .collect())
    }

    fn create_role(&self, name: &str) -> Result<()> {
        self.call("roles/create", json!({"roleName": name})).map(drop)
    }

    fn drop_role(&self, name: &str) -> Result<()> {
        self.call("roles/drop", json!({"roleName": name})).map(drop)
    }

    fn grant_privilege(&self, role: &str, grant: &PrivilegeGrant) -> Result<()> {
        self.call("roles/grant_privilege", grant_body(role, grant))
            .map(drop)
    }

    fn revoke_privilege(&self, role: &str, grant: &PrivilegeGrant) -> Result<()> {
        self.call("roles/revoke_privilege", grant_body(role, grant))
            .map(drop)
    }

    fn list_privilege_groups(&self) -> Result<Vec<PrivilegeGroupInfo>> {
        Ok(parse_privilege_groups(
            &self.call("privilege_groups/list", json!({}))?,
        ))
    }

    fn create_privilege_group(&self, name: &str) -> Result<()> {
        self.call(
            "privilege_groups/create",
            json!({"privilegeGroupName": name}),
        )
        .map(drop)
    }

    fn drop_privilege_group(&self, name: &str) -> Result<()> {
        self.call("privilege_groups/drop", json!({"privilegeGroupName": name}))
            .map(drop)
    }

    fn add_privileges_to_group(&self, name: &str, privileges: &[String]) -> Result<()> {
        self.call(
            "privilege_groups/add_privileges_to_group",
            json!({"privilegeGroupName": name, "privileges": privileges}),
        )
        .map(drop)
    }

    fn remove_privileges_from_group(&self, name: &str, privileges: &[String]) -> Result<()> {
        self.call(
            "privilege_groups/remove_privileges_from_group",
            json!({"privilegeGroupName": name, "privileges": privileges}),
        )
        .map(drop)
    }

    fn list_resource_groups(&self) -> Result<Vec<String>> {
        parse_string_list(&self.call("resource_groups/list", json!({}))?)
    }

    fn describe_resource_group(&self, name: &str) -> Result<ResourceGroupInfo> {
        let data = self.call("resource_groups/describe", json!({"name": name}))?;
        Ok(parse_resource_group(&data))
    }

    fn create_resource_group(&self, name: &str, config: &ResourceGroupConfig) -> Result<()> {
        let mut body = rg_config_body(config);
        if let Value::Object(map) = &mut body {
            map.insert("name".into(), json!(name));
        }
        self.call("resource_groups/create", body).map(drop)
    }

    fn update_resource_group(&self, name: &str, config: &ResourceGroupConfig) -> Result<()> {
        let mut groups = Map::new();
        groups.insert(name.to_string(), rg_config_body(config));
        self.call(
            "resource_groups/alter",
            json!({"resource_groups": Value::Object(groups)}),
        )
        .map(drop)
    }

    fn drop_resource_group(&self, name: &str) -> Result<()> {
        self.call("resource_groups/drop", json!({"name": name}))
            .map(drop)
    }

    fn transfer_replica(
        &self,
        source: &str,
        target: &str,
        collection: &str,
        num_replicas: u32,
    ) -> Result<()> {
        self.call(
            "resource_groups/transfer_replica",
            json!({
                "sourceRgName": source,
                "targetRgName": target,
                "collectionName": collection,
                "replicaNum": num_replicas,
            }),
        )
        .map(drop)
    }

    fn insert(
        &self,
        collection: &str,
        partition: Option<&str>,
        rows: &[Row],
    ) -> Result<MutationResult> {
        let mut body = json!({"collectionName": collection, "data": rows});
        if let (Some(p), Value::Object(map)) = (partition, &mut body) {
            map.insert("partitionName".into(), json!(p));
        }
        let data = self.call_scoped("entities/insert", body)?;
        Ok(mutation_result(&data, "insertCount", "insertIds"))
    }

    fn upsert(
        &self,
        collection: &str,
        partition: Option<&str>,
        rows: &[Row],
    ) -> Result<MutationResult> {
        let mut body = json!({"collectionName": collection, "data": rows});
        if let (Some(p), Value::Object(map)) = (partition, &mut body) {
            map.insert("partitionName".into(), json!(p));
        }
        let data = self.call_scoped("entities/upsert", body)?;
        Ok(mutation_result(&data, "upsertCount", "upsertIds"))
    }

    fn delete(&self, request: &DeleteRequest) -> Result<MutationResult> {
        let mut body = json!({"collectionName": request.collection, "filter": request.filter});
        if let (Some(p), Value::Object(map)) = (&request.partition, &mut body) {
            map.insert("partitionName".into(), json!(p));
        }
        let data = self.call_scoped("entities/delete", body)?;
        Ok(mutation_result(&data, "deleteCount", "deleteIds"))
    }

    fn query(&self, request: &QueryRequest) -> Result<Vec<Row>> {
        parse_rows(self.call_scoped("entities/query", query_body(request))?)
    }

    fn get(&self, collection: &str, ids: &[Value], output_fields: &[String]) -> Result<Vec<Row>> {
        let mut body = json!({"collectionName": collection, "id": ids});
        if !output_fields.is_empty() {
            body["outputFields"] = json!(output_fields);
        }
        parse_rows(self.call_scoped("entities/get", body)?)
    }

    fn search(&self, request: &SearchRequest) -> Result<Vec<Vec<Row>>> {
        let data = self.call_scoped("entities/search", search_body(request))?;
        split_hits(data, request.data.len(), request.limit)
    }

    fn hybrid_search(&self, request: &HybridSearchRequest) -> Result<Vec<Vec<Row>>> {
        let nq = request.requests.first().map_or(1, |leg| leg.data.len());
        let data = self.call_scoped("entities/hybrid_search", hybrid_search_body(request))?;
        split_hits(data, nq, request.limit)
    }
}

/// Opens [`RestClient`] handles and checks the server answers.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestConnector;

impl Connector for RestConnector {
    fn connect(&self, config: &ConnectConfig) -> Result<Box<dyn VectorService>> {
        let client = RestClient::new(config)?;
        let databases = client.list_databases()?;
        if !databases.iter().any(|db| db == &config.db_name) {
            return Err(Error::server(
                800,
                format!("database not found[database={}]", config.db_name),
            ));
        }
        Ok(Box::new(client))
    }
}

#[cfg(test)]
#[path = "rest_tests.rs"]
mod tests;
