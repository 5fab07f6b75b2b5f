//! Parameter validation and normalization.
//!
//! Pure functions turning raw command line or prompt input into the typed
//! requests of [`milvus_client`]. Nothing here talks to the server; every
//! failure is a [`CliError`] naming the offending value.

use milvus_client::{
    AnnRequest, CollectionSchema, DataType, FieldSchema, QueryRequest, Ranker, SearchRequest,
    SearchVectors,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{CliError, Result};

/// Largest `limit` accepted by search and query.
pub const MAX_LIMIT: u64 = 16_384;

/// Metric used when neither the user nor an index names one.
pub const DEFAULT_METRIC: &str = "COSINE";

/// Smoothing constant of reciprocal rank fusion when none is given.
pub const DEFAULT_RRF_K: u32 = 60;

/// Build and search parameters accepted by one index algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexTypeSpec {
    /// Algorithm name.
    pub name: &'static str,
    /// Keys accepted at build time.
    pub build: &'static [&'static str],
    /// Keys accepted at search time.
    pub search: &'static [&'static str],
}

/// Every index algorithm the CLI can build.
pub const INDEX_TYPES: &[IndexTypeSpec] = &[
    IndexTypeSpec { name: "FLAT", build: &[], search: &["metric_type"] },
    IndexTypeSpec { name: "IVF_FLAT", build: &["nlist"], search: &["nprobe"] },
    IndexTypeSpec { name: "IVF_SQ8", build: &["nlist"], search: &["nprobe"] },
    IndexTypeSpec { name: "GPU_IVF_FLAT", build: &["nlist"], search: &["nprobe"] },
    IndexTypeSpec { name: "IVF_PQ", build: &["nlist", "m", "nbits"], search: &["nprobe"] },
    IndexTypeSpec { name: "GPU_IVF_PQ", build: &["nlist", "m", "nbits"], search: &["nprobe"] },
    IndexTypeSpec { name: "HNSW", build: &["M", "efConstruction"], search: &["ef"] },
    IndexTypeSpec { name: "ANNOY", build: &["n_trees"], search: &["search_k"] },
    IndexTypeSpec { name: "AUTOINDEX", build: &[], search: &[] },
    IndexTypeSpec { name: "DISKANN", build: &[], search: &[] },
    IndexTypeSpec { name: "INVERTED", build: &[], search: &[] },
    IndexTypeSpec { name: "STL_SORT", build: &[], search: &[] },
    IndexTypeSpec { name: "TRIE", build: &[], search: &[] },
    IndexTypeSpec { name: "BITMAP", build: &[], search: &[] },
    IndexTypeSpec {
        name: "SPARSE_INVERTED_INDEX",
        build: &["drop_ratio_build"],
        search: &["drop_ratio_search"],
    },
    IndexTypeSpec {
        name: "SPARSE_WAND",
        build: &["drop_ratio_build"],
        search: &["drop_ratio_search"],
    },
];

/// Index algorithms that only apply to scalar fields.
pub const SCALAR_INDEX_TYPES: &[&str] = &["INVERTED", "STL_SORT", "TRIE", "BITMAP"];

/// Metrics for float vectors.
pub const FLOAT_METRICS: &[&str] = &["L2", "IP", "COSINE"];

/// Metrics for binary vectors.
pub const BINARY_METRICS: &[&str] = &["HAMMING", "JACCARD"];

/// Metrics for sparse vectors.
pub const SPARSE_METRICS: &[&str] = &["IP"];

/// Looks up an index algorithm by name, case-insensitively.
#[must_use]
pub fn index_type_spec(name: &str) -> Option<&'static IndexTypeSpec> {
    INDEX_TYPES
        .iter()
        .find(|spec| spec.name.eq_ignore_ascii_case(name.trim()))
}

/// Names of every index algorithm.
#[must_use]
pub fn index_type_names() -> Vec<&'static str> {
    INDEX_TYPES.iter().map(|spec| spec.name).collect()
}

fn join(items: &[&str]) -> String {
    items.join(", ")
}

/// Parses a parameter value: integer, then float, then bare string.
#[must_use]
pub fn parse_scalar(raw: &str) -> Value {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    Value::String(raw.trim_matches(|c| c == '"' || c == '\'').to_string())
}

/// Splits `key:value` on the first colon.
pub fn split_key_value(token: &str) -> Result<(String, String)> {
    let token = token.trim();
    match token.split_once(':') {
        Some((k, v)) if !k.trim().is_empty() && !v.trim().is_empty() => {
            Ok((k.trim().to_string(), v.trim().to_string()))
        }
        _ => Err(CliError::parameter(
            token,
            "expected key:value",
        )),
    }
}

/// Validates build parameters for `index_type`.
///
/// Returns the parameters in input order with numeric values parsed.
pub fn normalize_index_params<S: AsRef<str>>(
    index_type: &str,
    raw_params: &[S],
) -> Result<Vec<(String, Value)>> {
    let spec = index_type_spec(index_type).ok_or_else(|| CliError::IndexParam {
        index_type: index_type.to_string(),
        key: "index_type".to_string(),
        accepted: join(&index_type_names()),
    })?;
    let mut params: Vec<(String, Value)> = Vec::with_capacity(raw_params.len());
    for raw in raw_params {
        let (key, value) = split_key_value(raw.as_ref())?;
        if !spec.build.contains(&key.as_str()) {
            return Err(CliError::IndexParam {
                index_type: spec.name.to_string(),
                key,
                accepted: join(spec.build),
            });
        }
        if params.iter().any(|(k, _)| *k == key) {
            return Err(CliError::parameter(key, "given more than once"));
        }
        params.push((key, parse_scalar(&value)));
    }
    Ok(params)
}

/// Validates search parameters against the index built on the searched field.
fn normalize_search_params(
    index_type: Option<&str>,
    raw_params: &[String],
) -> Result<Vec<(String, Value)>> {
    if raw_params.is_empty() {
        return Ok(Vec::new());
    }
    let Some(index_type) = index_type else {
        return Err(CliError::parameter(
            "params",
            "the searched field has no index; search parameters need one",
        ));
    };
    let spec = index_type_spec(index_type).ok_or_else(|| CliError::IndexParam {
        index_type: index_type.to_string(),
        key: "index_type".to_string(),
        accepted: join(&index_type_names()),
    })?;
    let mut params = Vec::with_capacity(raw_params.len());
    for raw in raw_params {
        let (key, value) = split_key_value(raw)?;
        if !spec.search.contains(&key.as_str()) {
            return Err(CliError::IndexParam {
                index_type: spec.name.to_string(),
                key,
                accepted: join(spec.search),
            });
        }
        params.push((key, parse_scalar(&value)));
    }
    Ok(params)
}

/// Upper-cases and checks a metric name for the given vector type.
pub fn normalize_metric(raw: &str, vector_type: DataType) -> Result<String> {
    let metric = raw.trim().to_ascii_uppercase();
    let accepted = match vector_type {
        DataType::BinaryVector => BINARY_METRICS,
        DataType::SparseFloatVector => SPARSE_METRICS,
        _ => FLOAT_METRICS,
    };
    if accepted.contains(&metric.as_str()) {
        Ok(metric)
    } else {
        Err(CliError::parameter(
            "metric_type",
            format!("'{raw}' is not one of [{}]", join(accepted)),
        ))
    }
}

// ============================================================================
// Names and lists
// ============================================================================

/// Checks an entity name: letters, digits and underscores, not starting with a digit.
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 255
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CliError::parameter(
            kind,
            format!(
                "'{name}' is invalid, use letters, digits and underscores and do not start with a digit"
            ),
        ))
    }
}

/// Splits a comma separated list, stripping brackets and quotes, dropping
/// empties and duplicates while keeping first-seen order.
#[must_use]
pub fn clean_output_fields(raw: &str) -> Vec<String> {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '\'' | '"'))
        .collect();
    let mut fields: Vec<String> = Vec::new();
    for token in stripped.split(',').map(str::trim) {
        if !token.is_empty() && !fields.iter().any(|f| f == token) {
            fields.push(token.to_string());
        }
    }
    fields
}

/// Parses `key:value` pairs for free-form string properties.
pub fn parse_properties<S: AsRef<str>>(raw: &[S]) -> Result<Vec<(String, String)>> {
    raw.iter().map(|r| split_key_value(r.as_ref())).collect()
}

// ============================================================================
// Literals
// ============================================================================

/// Parses a dense vector literal: `[0.1, 0.2]` or `0.1,0.2`.
pub fn parse_vector_literal(raw: &str) -> Result<Vec<f32>> {
    let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let mut values = Vec::new();
    for token in inner.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let value = token.parse::<f32>().map_err(|_| {
            CliError::parameter("data", format!("'{token}' is not a number"))
        })?;
        values.push(value);
    }
    if values.is_empty() {
        return Err(CliError::parameter(
            "data",
            format!("'{raw}' contains no numeric elements"),
        ));
    }
    Ok(values)
}

/// Parses one or several dense vectors: `[1,2]` or `[[1,2],[3,4]]`.
pub fn parse_dense_vectors(raw: &str) -> Result<Vec<Vec<f32>>> {
    let trimmed = raw.trim();
    if trimmed.starts_with("[[") {
        let parsed: Vec<Vec<f32>> = serde_json::from_str(trimmed).map_err(|e| {
            CliError::parameter("data", format!("cannot parse vector list: {e}"))
        })?;
        if parsed.is_empty() || parsed.iter().any(Vec::is_empty) {
            return Err(CliError::parameter(
                "data",
                format!("'{raw}' contains no numeric elements"),
            ));
        }
        return Ok(parsed);
    }
    Ok(vec![parse_vector_literal(trimmed)?])
}

/// Parses one sparse vector literal: `{1: 0.5, 7: 0.25}`.
pub fn parse_sparse_literal(raw: &str) -> Result<Vec<(u32, f32)>> {
    let inner = raw.trim().trim_start_matches('{').trim_end_matches('}');
    let mut pairs = Vec::new();
    for token in inner.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (k, v) = token.split_once(':').ok_or_else(|| {
            CliError::parameter("data", format!("'{token}' is not an index:value pair"))
        })?;
        let index = k
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .parse::<u32>()
            .map_err(|_| CliError::parameter("data", format!("'{k}' is not a sparse index")))?;
        let value = v
            .trim()
            .parse::<f32>()
            .map_err(|_| CliError::parameter("data", format!("'{v}' is not a number")))?;
        pairs.push((index, value));
    }
    if pairs.is_empty() {
        return Err(CliError::parameter(
            "data",
            format!("'{raw}' contains no numeric elements"),
        ));
    }
    pairs.sort_by_key(|(i, _)| *i);
    Ok(pairs)
}

/// Parses one or several sparse vectors: `{..}` or `[{..}, {..}]`.
pub fn parse_sparse_vectors(raw: &str) -> Result<Vec<Vec<(u32, f32)>>> {
    let mut vectors = Vec::new();
    let mut rest = raw;
    while let Some(start) = rest.find('{') {
        let end = rest[start..].find('}').ok_or_else(|| {
            CliError::parameter("data", format!("unbalanced braces in '{raw}'"))
        })?;
        vectors.push(parse_sparse_literal(&rest[start..=start + end])?);
        rest = &rest[start + end + 1..];
    }
    if vectors.is_empty() {
        return Err(CliError::parameter(
            "data",
            format!("'{raw}' contains no numeric elements"),
        ));
    }
    Ok(vectors)
}

/// Parses search payload for a vector field of `vector_type`, checking `dim`.
pub fn parse_search_data(raw: &str, vector_type: DataType, dim: Option<u32>) -> Result<SearchVectors> {
    if vector_type == DataType::SparseFloatVector {
        return parse_sparse_vectors(raw).map(SearchVectors::Sparse);
    }
    let vectors = parse_dense_vectors(raw)?;
    if let Some(dim) = dim {
        let expected = if vector_type == DataType::BinaryVector {
            dim as usize / 8
        } else {
            dim as usize
        };
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(CliError::parameter(
                "data",
                format!("expected {expected} elements per vector, got {}", bad.len()),
            ));
        }
    }
    Ok(SearchVectors::Dense(vectors))
}

fn integer_in_range(field: &FieldSchema, raw: &str, min: i64, max: i64) -> Result<Value> {
    let n = raw.trim().parse::<i64>().map_err(|_| {
        CliError::parameter(&field.name, format!("'{raw}' is not an integer"))
    })?;
    if n < min || n > max {
        return Err(CliError::parameter(
            &field.name,
            format!("{n} is out of range for {} [{min}, {max}]", field.data_type),
        ));
    }
    Ok(Value::from(n))
}

/// Converts a raw string to the JSON value stored in `field`.
pub fn parse_field_value(field: &FieldSchema, raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    match field.data_type {
        DataType::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(CliError::parameter(
                &field.name,
                format!("'{raw}' is not a boolean"),
            )),
        },
        DataType::Int8 => integer_in_range(field, trimmed, i64::from(i8::MIN), i64::from(i8::MAX)),
        DataType::Int16 => {
            integer_in_range(field, trimmed, i64::from(i16::MIN), i64::from(i16::MAX))
        }
        DataType::Int32 => {
            integer_in_range(field, trimmed, i64::from(i32::MIN), i64::from(i32::MAX))
        }
        DataType::Int64 => integer_in_range(field, trimmed, i64::MIN, i64::MAX),
        DataType::Float | DataType::Double => trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::from)
            .ok_or_else(|| CliError::parameter(&field.name, format!("'{raw}' is not a number"))),
        DataType::VarChar => {
            let text = trimmed.trim_matches(|c| c == '"' || c == '\'');
            if let Some(max) = field.max_length {
                if text.chars().count() > max as usize {
                    return Err(CliError::parameter(
                        &field.name,
                        format!("length {} exceeds max_length {max}", text.chars().count()),
                    ));
                }
            }
            Ok(Value::String(text.to_string()))
        }
        DataType::Json => serde_json::from_str(trimmed).map_err(|e| {
            CliError::parameter(&field.name, format!("invalid JSON: {e}"))
        }),
        DataType::Array => {
            let value: Value = serde_json::from_str(trimmed).map_err(|e| {
                CliError::parameter(&field.name, format!("invalid array: {e}"))
            })?;
            match &value {
                Value::Array(items) => {
                    if let Some(cap) = field.max_capacity {
                        if items.len() > cap as usize {
                            return Err(CliError::parameter(
                                &field.name,
                                format!("{} elements exceed max_capacity {cap}", items.len()),
                            ));
                        }
                    }
                    Ok(value)
                }
                _ => Err(CliError::parameter(&field.name, "expected a JSON array")),
            }
        }
        DataType::SparseFloatVector => {
            let pairs = parse_sparse_literal(trimmed)?;
            let map: Map<String, Value> = pairs
                .into_iter()
                .map(|(i, v)| (i.to_string(), Value::from(v)))
                .collect();
            Ok(Value::Object(map))
        }
        DataType::FloatVector
        | DataType::BinaryVector
        | DataType::Float16Vector
        | DataType::BFloat16Vector => {
            let values = parse_vector_literal(trimmed)?;
            if let Some(dim) = field.dim {
                let expected = if field.data_type == DataType::BinaryVector {
                    dim as usize / 8
                } else {
                    dim as usize
                };
                if values.len() != expected {
                    return Err(CliError::parameter(
                        &field.name,
                        format!("expected {expected} elements, got {}", values.len()),
                    ));
                }
            }
            Ok(Value::from(values))
        }
    }
}

/// Parses a primary key list: `[1, 2]`, `1,2` or `['a', 'b']`.
pub fn parse_ids(raw: &str, pk_type: DataType) -> Result<Vec<Value>> {
    let tokens = clean_output_fields(raw);
    if tokens.is_empty() {
        return Err(CliError::parameter("ids", "no primary key given"));
    }
    tokens
        .into_iter()
        .map(|t| match pk_type {
            DataType::VarChar => Ok(Value::String(t)),
            _ => t
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| CliError::parameter("ids", format!("'{t}' is not an INT64 key"))),
        })
        .collect()
}

/// Builds `pk in [..]` for deleting by primary key.
#[must_use]
pub fn ids_filter(pk_field: &str, ids: &[Value]) -> String {
    let items: Vec<String> = ids
        .iter()
        .map(|v| match v {
            Value::String(s) => format!("\"{}\"", s.replace('"', "\\\"")),
            other => other.to_string(),
        })
        .collect();
    format!("{pk_field} in [{}]", items.join(", "))
}

// ============================================================================
// Fields and schemas
// ============================================================================

/// Raw attributes of a field as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFieldAttributes {
    /// Vector dimension.
    pub dim: Option<String>,
    /// VARCHAR max length.
    pub max_length: Option<String>,
    /// ARRAY element type token.
    pub element_type: Option<String>,
    /// ARRAY max capacity.
    pub max_capacity: Option<String>,
    /// Default value literal.
    pub default_value: Option<String>,
    /// Nullable flag.
    pub nullable: bool,
    /// Primary key flag.
    pub is_primary: bool,
    /// Server generated keys.
    pub auto_id: bool,
    /// Partition key flag.
    pub is_partition_key: bool,
    /// Description.
    pub description: String,
}

fn positive(field: &str, attr: &str, raw: Option<&str>, max: u32) -> Result<u32> {
    let raw = raw
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| CliError::schema(field, format!("{attr} is required")))?;
    match raw.parse::<u32>() {
        Ok(n) if n > 0 && n <= max => Ok(n),
        _ => Err(CliError::schema(
            field,
            format!("{attr} must be an integer between 1 and {max}, got '{raw}'"),
        )),
    }
}

fn data_type_tokens() -> String {
    DataType::ALL
        .iter()
        .map(|t| t.token())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parses a data type token, case-insensitively.
pub fn parse_data_type(field: &str, raw: &str) -> Result<DataType> {
    let token = raw.trim().to_ascii_uppercase();
    DataType::from_token(&token).ok_or_else(|| {
        CliError::schema(
            field,
            format!("unknown data type '{raw}', accepted: [{}]", data_type_tokens()),
        )
    })
}

/// Validates one field and its type attributes.
pub fn normalize_field(name: &str, raw_type: &str, attrs: &RawFieldAttributes) -> Result<FieldSchema> {
    let name = name.trim();
    if validate_name("field", name).is_err() {
        return Err(CliError::schema(
            name,
            "field names use letters, digits and underscores and do not start with a digit",
        ));
    }
    let data_type = parse_data_type(name, raw_type)?;
    let mut field = FieldSchema::new(name, data_type);
    field.description = attrs.description.clone();

    if data_type.requires_dim() {
        let dim = positive(name, "dim", attrs.dim.as_deref(), 32_768)?;
        if data_type == DataType::BinaryVector && dim % 8 != 0 {
            return Err(CliError::schema(
                name,
                format!("dim of a BINARY_VECTOR must be a multiple of 8, got {dim}"),
            ));
        }
        field.dim = Some(dim);
    } else if attrs.dim.as_deref().is_some_and(|d| !d.trim().is_empty()) {
        return Err(CliError::schema(
            name,
            format!("{data_type} does not take a dimension"),
        ));
    }

    match data_type {
        DataType::VarChar => {
            field.max_length = Some(positive(name, "max_length", attrs.max_length.as_deref(), 65_535)?);
        }
        DataType::Array => {
            let raw_element = attrs
                .element_type
                .as_deref()
                .filter(|e| !e.trim().is_empty())
                .ok_or_else(|| CliError::schema(name, "element_type is required for ARRAY"))?;
            let element = parse_data_type(name, raw_element)?;
            if !element.can_be_element() {
                return Err(CliError::schema(
                    name,
                    format!("{element} cannot be an ARRAY element"),
                ));
            }
            field.element_type = Some(element);
            field.max_capacity = Some(positive(name, "max_capacity", attrs.max_capacity.as_deref(), 4_096)?);
            if element == DataType::VarChar {
                field.max_length =
                    Some(positive(name, "max_length", attrs.max_length.as_deref(), 65_535)?);
            }
        }
        _ => {}
    }

    if attrs.is_primary {
        if !data_type.can_be_primary() {
            return Err(CliError::schema(
                name,
                format!("primary key must be INT64 or VARCHAR, got {data_type}"),
            ));
        }
        if attrs.nullable {
            return Err(CliError::schema(name, "primary key cannot be nullable"));
        }
        field.is_primary = true;
        field.auto_id = attrs.auto_id;
    } else if attrs.auto_id {
        return Err(CliError::schema(name, "auto_id applies to the primary key only"));
    }

    if attrs.is_partition_key {
        if attrs.is_primary || !data_type.can_be_primary() {
            return Err(CliError::schema(
                name,
                "partition key must be a non-primary INT64 or VARCHAR field",
            ));
        }
        field.is_partition_key = true;
    }

    if data_type.is_vector() && (attrs.nullable || attrs.default_value.is_some()) {
        return Err(CliError::schema(
            name,
            "vector fields cannot be nullable or have a default value",
        ));
    }
    field.nullable = attrs.nullable;
    if let Some(raw_default) = attrs.default_value.as_deref() {
        let value = parse_field_value(&field, raw_default)
            .map_err(|e| CliError::schema(name, format!("invalid default value: {e}")))?;
        field.default_value = Some(value);
    }
    Ok(field)
}

/// Parses a compact field token `name:TYPE[:attr...][:flag...]`.
///
/// Positional attributes depend on the type: `dim` for dense vectors,
/// `max_length` for VARCHAR, `element_type:max_capacity[:max_length]` for
/// ARRAY. Flags are `primary`, `auto_id`, `nullable`, `partition_key` and
/// `default=<literal>`.
pub fn parse_field_token(token: &str) -> Result<FieldSchema> {
    let mut parts = token.trim().split(':');
    let name = parts.next().unwrap_or_default();
    let raw_type = parts
        .next()
        .ok_or_else(|| CliError::schema(name, "expected name:TYPE[:attributes]"))?;
    let data_type = parse_data_type(name, raw_type)?;

    let mut attrs = RawFieldAttributes::default();
    let mut positional: Vec<String> = Vec::new();
    for part in parts.map(str::trim).filter(|p| !p.is_empty()) {
        match part.to_ascii_lowercase().as_str() {
            "primary" | "pk" => attrs.is_primary = true,
            "auto_id" | "autoid" => attrs.auto_id = true,
            "nullable" => attrs.nullable = true,
            "partition_key" => attrs.is_partition_key = true,
            lower if lower.starts_with("default=") => {
                attrs.default_value = Some(part["default=".len()..].to_string());
            }
            _ => positional.push(part.to_string()),
        }
    }

    let mut positional = positional.into_iter();
    match data_type {
        t if t.requires_dim() => attrs.dim = positional.next(),
        DataType::VarChar => attrs.max_length = positional.next(),
        DataType::Array => {
            attrs.element_type = positional.next();
            attrs.max_capacity = positional.next();
            attrs.max_length = positional.next();
        }
        _ => {}
    }
    if let Some(extra) = positional.next() {
        return Err(CliError::schema(
            name,
            format!("unexpected attribute '{extra}' for {data_type}"),
        ));
    }
    normalize_field(name, raw_type, &attrs)
}

/// Checks the schema-level invariants and builds the schema.
pub fn normalize_schema(
    fields: Vec<FieldSchema>,
    description: &str,
    auto_id: bool,
    enable_dynamic_field: bool,
) -> Result<CollectionSchema> {
    let primaries: Vec<&str> = fields
        .iter()
        .filter(|f| f.is_primary)
        .map(|f| f.name.as_str())
        .collect();
    match primaries.as_slice() {
        [_] => {}
        [] => {
            return Err(CliError::schema(
                "<schema>",
                "exactly one primary key field is required, found none",
            ))
        }
        many => {
            return Err(CliError::schema(
                many.join(", "),
                "exactly one primary key field is required",
            ))
        }
    }
    for (i, field) in fields.iter().enumerate() {
        if fields[..i].iter().any(|f| f.name == field.name) {
            return Err(CliError::schema(&field.name, "duplicated field name"));
        }
    }
    if !fields.iter().any(|f| f.data_type.is_vector()) {
        return Err(CliError::schema(
            "<schema>",
            "at least one vector field is required",
        ));
    }
    let mut fields = fields;
    if auto_id {
        if let Some(pk) = fields.iter_mut().find(|f| f.is_primary) {
            pk.auto_id = true;
        }
    }
    let auto_id = fields.iter().any(|f| f.is_primary && f.auto_id);
    Ok(CollectionSchema {
        fields,
        description: description.to_string(),
        auto_id,
        enable_dynamic_field,
    })
}

#[derive(Debug, Deserialize)]
struct FieldDocument {
    name: String,
    #[serde(rename = "type")]
    data_type: String,
    #[serde(default)]
    dim: Option<Value>,
    #[serde(default)]
    max_length: Option<Value>,
    #[serde(default)]
    element_type: Option<String>,
    #[serde(default)]
    max_capacity: Option<Value>,
    #[serde(default)]
    nullable: bool,
    #[serde(default)]
    default_value: Option<Value>,
    #[serde(default)]
    is_primary: bool,
    #[serde(default)]
    auto_id: bool,
    #[serde(default)]
    is_partition_key: bool,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    description: String,
    #[serde(default)]
    auto_id: bool,
    #[serde(default)]
    enable_dynamic_field: bool,
    fields: Vec<FieldDocument>,
}

fn value_text(value: Option<Value>) -> Option<String> {
    value.map(|v| match v {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn schema_from_document(doc: SchemaDocument) -> Result<CollectionSchema> {
    let fields = doc
        .fields
        .into_iter()
        .map(|f| {
            let attrs = RawFieldAttributes {
                dim: value_text(f.dim),
                max_length: value_text(f.max_length),
                element_type: f.element_type,
                max_capacity: value_text(f.max_capacity),
                default_value: value_text(f.default_value),
                nullable: f.nullable,
                is_primary: f.is_primary,
                auto_id: f.auto_id,
                is_partition_key: f.is_partition_key,
                description: f.description,
            };
            normalize_field(&f.name, &f.data_type, &attrs)
        })
        .collect::<Result<Vec<_>>>()?;
    normalize_schema(fields, &doc.description, doc.auto_id, doc.enable_dynamic_field)
}

/// Parses a schema document held in `text`; `format` is `json` or `toml`.
pub fn parse_schema_text(text: &str, format: &str) -> Result<CollectionSchema> {
    let doc: SchemaDocument = match format {
        "json" => serde_json::from_str(text)
            .map_err(|e| CliError::parameter("schema-file", format!("invalid JSON: {e}")))?,
        "toml" => toml::from_str(text)
            .map_err(|e| CliError::parameter("schema-file", format!("invalid TOML: {e}")))?,
        other => {
            return Err(CliError::parameter(
                "schema-file",
                format!("unsupported format '{other}', use .json or .toml"),
            ))
        }
    };
    schema_from_document(doc)
}

/// Reads a `.json` or `.toml` schema document.
pub fn parse_schema_document(path: &Path) -> Result<CollectionSchema> {
    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let text = std::fs::read_to_string(path)?;
    parse_schema_text(&text, &format)
}

// ============================================================================
// Requests
// ============================================================================

/// Index facts relevant to search shaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    /// Algorithm name.
    pub index_type: String,
    /// Metric the index was built with.
    pub metric_type: String,
}

/// Raw search input, after the target field was resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchInput {
    /// Target collection.
    pub collection: String,
    /// Searched vector field.
    pub anns_field: String,
    /// Type of the searched field.
    pub vector_type: DataType,
    /// Dimension of the searched field.
    pub dim: Option<u32>,
    /// Vector literal(s).
    pub data: String,
    /// Metric; defaults to the index metric, then COSINE.
    pub metric_type: Option<String>,
    /// `key:value` search parameters.
    pub params: Vec<String>,
    /// Top-k.
    pub limit: u64,
    /// Results skipped.
    pub offset: u64,
    /// Filter expression.
    pub expr: Option<String>,
    /// Raw output field list.
    pub output_fields: Option<String>,
    /// Raw partition list.
    pub partition_names: Option<String>,
    /// Decimal places of returned distances, -1 for all.
    pub round_decimal: i32,
    /// Consistency timestamp.
    pub guarantee_timestamp: Option<u64>,
    /// Index on the searched field, if any.
    pub index: Option<IndexSummary>,
}

fn check_limit(name: &str, limit: u64) -> Result<()> {
    if (1..=MAX_LIMIT).contains(&limit) {
        Ok(())
    } else {
        Err(CliError::parameter(
            name,
            format!("{limit} is out of range [1, {MAX_LIMIT}]"),
        ))
    }
}

fn resolve_metric(input_metric: Option<&str>, index: Option<&IndexSummary>, vector_type: DataType) -> Result<String> {
    match input_metric.map(str::trim).filter(|m| !m.is_empty()) {
        Some(metric) => normalize_metric(metric, vector_type),
        None => Ok(index
            .map(|i| i.metric_type.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| match vector_type {
                DataType::BinaryVector => "HAMMING".to_string(),
                DataType::SparseFloatVector => "IP".to_string(),
                _ => DEFAULT_METRIC.to_string(),
            })),
    }
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Builds a search request.
pub fn normalize_search_request(input: &SearchInput) -> Result<SearchRequest> {
    let data = parse_search_data(&input.data, input.vector_type, input.dim)?;
    check_limit("limit", input.limit)?;
    if !(-1..=6).contains(&input.round_decimal) {
        return Err(CliError::parameter(
            "round_decimal",
            format!("{} is out of range [-1, 6]", input.round_decimal),
        ));
    }
    let index_type = input.index.as_ref().map(|i| i.index_type.as_str());
    let mut params = normalize_search_params(index_type, &input.params)?;
    let mut metric_override = None;
    params.retain(|(k, v)| {
        if k == "metric_type" {
            metric_override = v.as_str().map(str::to_string);
            false
        } else {
            true
        }
    });
    let metric_type = resolve_metric(
        metric_override.as_deref().or(input.metric_type.as_deref()),
        input.index.as_ref(),
        input.vector_type,
    )?;
    Ok(SearchRequest {
        collection: input.collection.clone(),
        anns_field: input.anns_field.clone(),
        data,
        metric_type,
        params,
        limit: input.limit,
        offset: input.offset,
        filter: non_blank(input.expr.as_deref()),
        output_fields: input
            .output_fields
            .as_deref()
            .map(clean_output_fields)
            .unwrap_or_default(),
        partition_names: input
            .partition_names
            .as_deref()
            .map(clean_output_fields)
            .unwrap_or_default(),
        round_decimal: input.round_decimal,
        guarantee_timestamp: input.guarantee_timestamp,
        timeout: None,
    })
}

/// Builds one leg of a hybrid search.
pub fn normalize_ann_request(input: &SearchInput) -> Result<AnnRequest> {
    let request = normalize_search_request(input)?;
    Ok(AnnRequest {
        anns_field: request.anns_field,
        data: request.data,
        metric_type: request.metric_type,
        params: request.params,
        limit: request.limit,
        filter: request.filter,
    })
}

/// Parses the fusion strategy: `rrf` with an optional `k`, or `weighted`
/// with one weight in `[0, 1]` per leg.
pub fn parse_ranker(kind: &str, raw_params: Option<&str>, legs: usize) -> Result<Ranker> {
    match kind.trim().to_ascii_lowercase().as_str() {
        "rrf" => {
            let k = match non_blank(raw_params) {
                None => DEFAULT_RRF_K,
                Some(raw) => match raw.parse::<u32>() {
                    Ok(k) if (1..16_384).contains(&k) => k,
                    _ => {
                        return Err(CliError::parameter(
                            "rrf_k",
                            format!("'{raw}' must be an integer in [1, 16384)"),
                        ))
                    }
                },
            };
            Ok(Ranker::Rrf { k })
        }
        "weighted" => {
            let raw = non_blank(raw_params)
                .ok_or_else(|| CliError::parameter("weights", "one weight per request is required"))?;
            let weights = raw
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .split(',')
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(|w| match w.parse::<f32>() {
                    Ok(v) if (0.0..=1.0).contains(&v) => Ok(v),
                    _ => Err(CliError::parameter(
                        "weights",
                        format!("'{w}' must be a number in [0, 1]"),
                    )),
                })
                .collect::<Result<Vec<_>>>()?;
            if weights.len() != legs {
                return Err(CliError::parameter(
                    "weights",
                    format!("expected {legs} weights, got {}", weights.len()),
                ));
            }
            Ok(Ranker::Weighted(weights))
        }
        other => Err(CliError::parameter(
            "ranker",
            format!("'{other}' is not one of [rrf, weighted]"),
        )),
    }
}

/// Raw query input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryInput {
    /// Target collection.
    pub collection: String,
    /// Filter expression, passed through verbatim.
    pub expr: String,
    /// Raw output field list.
    pub output_fields: Option<String>,
    /// Raw partition list.
    pub partition_names: Option<String>,
    /// Maximum rows.
    pub limit: Option<u64>,
    /// Rows skipped.
    pub offset: Option<u64>,
    /// Timeout in seconds.
    pub timeout: Option<f64>,
    /// Consistency timestamp.
    pub guarantee_timestamp: Option<u64>,
    /// Graceful time in milliseconds.
    pub graceful_time: Option<u64>,
}

/// Builds a query request.
pub fn normalize_query_request(input: &QueryInput) -> Result<QueryRequest> {
    if input.expr.trim().is_empty() {
        return Err(CliError::parameter("expr", "query expression must not be empty"));
    }
    if let Some(limit) = input.limit {
        check_limit("limit", limit)?;
    }
    if let Some(timeout) = input.timeout {
        if !(timeout.is_finite() && timeout > 0.0) {
            return Err(CliError::parameter(
                "timeout",
                format!("{timeout} must be a positive number of seconds"),
            ));
        }
    }
    Ok(QueryRequest {
        collection: input.collection.clone(),
        filter: input.expr.clone(),
        output_fields: input
            .output_fields
            .as_deref()
            .map(clean_output_fields)
            .unwrap_or_default(),
        partition_names: input
            .partition_names
            .as_deref()
            .map(clean_output_fields)
            .unwrap_or_default(),
        limit: input.limit,
        offset: input.offset,
        timeout: input.timeout,
        guarantee_timestamp: input.guarantee_timestamp,
        graceful_time: input.graceful_time,
    })
}

/// Rounds every `distance` value of the hits to `decimals` places.
pub fn round_distances(hits: &mut [Vec<milvus_client::Row>], decimals: i32) {
    if decimals < 0 {
        return;
    }
    let factor = 10f64.powi(decimals);
    for row in hits.iter_mut().flatten() {
        if let Some(d) = row.get("distance").and_then(Value::as_f64) {
            row.insert("distance".to_string(), Value::from((d * factor).round() / factor));
        }
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
