//! Typed request and response model shared by every backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// One entity as exchanged with the server: field name to value.
pub type Row = serde_json::Map<String, Value>;

/// Field data types understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean scalar.
    Bool,
    /// 8-bit integer.
    Int8,
    /// 16-bit integer.
    Int16,
    /// 32-bit integer.
    Int32,
    /// 64-bit integer.
    Int64,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Variable length string bounded by `max_length`.
    VarChar,
    /// JSON document.
    #[serde(rename = "JSON")]
    Json,
    /// Homogeneous array bounded by `max_capacity`.
    Array,
    /// Dense float32 vector.
    FloatVector,
    /// Packed binary vector.
    BinaryVector,
    /// Dense float16 vector.
    Float16Vector,
    /// Dense bfloat16 vector.
    #[serde(rename = "BFloat16Vector")]
    BFloat16Vector,
    /// Sparse float vector, no fixed dimension.
    SparseFloatVector,
}

impl DataType {
    /// Every data type, in the order offered by interactive prompts.
    pub const ALL: [Self; 15] = [
        Self::Bool,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Float,
        Self::Double,
        Self::VarChar,
        Self::Json,
        Self::Array,
        Self::FloatVector,
        Self::BinaryVector,
        Self::Float16Vector,
        Self::BFloat16Vector,
        Self::SparseFloatVector,
    ];

    /// Upper-case token used on the command line.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Bool => "BOOL",
            Self::Int8 => "INT8",
            Self::Int16 => "INT16",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::VarChar => "VARCHAR",
            Self::Json => "JSON",
            Self::Array => "ARRAY",
            Self::FloatVector => "FLOAT_VECTOR",
            Self::BinaryVector => "BINARY_VECTOR",
            Self::Float16Vector => "FLOAT16_VECTOR",
            Self::BFloat16Vector => "BFLOAT16_VECTOR",
            Self::SparseFloatVector => "SPARSE_FLOAT_VECTOR",
        }
    }

    /// Parses an upper-case command line token.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.token() == token)
    }

    /// Name used by the REST API.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Int8 => "Int8",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::VarChar => "VarChar",
            Self::Json => "JSON",
            Self::Array => "Array",
            Self::FloatVector => "FloatVector",
            Self::BinaryVector => "BinaryVector",
            Self::Float16Vector => "Float16Vector",
            Self::BFloat16Vector => "BFloat16Vector",
            Self::SparseFloatVector => "SparseFloatVector",
        }
    }

    /// Parses a REST API type name.
    #[must_use]
    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.wire_name() == name)
    }

    /// Returns true for every vector kind, sparse included.
    #[must_use]
    pub const fn is_vector(self) -> bool {
        matches!(
            self,
            Self::FloatVector
                | Self::BinaryVector
                | Self::Float16Vector
                | Self::BFloat16Vector
                | Self::SparseFloatVector
        )
    }

    /// Returns true for vector kinds that carry a fixed dimension.
    #[must_use]
    pub const fn requires_dim(self) -> bool {
        self.is_vector() && !matches!(self, Self::SparseFloatVector)
    }

    /// Returns true for types that can be the primary key.
    #[must_use]
    pub const fn can_be_primary(self) -> bool {
        matches!(self, Self::Int64 | Self::VarChar)
    }

    /// Returns true for types allowed as array elements.
    #[must_use]
    pub const fn can_be_element(self) -> bool {
        matches!(
            self,
            Self::Bool
                | Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Float
                | Self::Double
                | Self::VarChar
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// One column of a collection schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field name.
    pub name: String,
    /// Data type.
    pub data_type: DataType,
    /// Primary key flag.
    #[serde(default)]
    pub is_primary: bool,
    /// Server generated primary keys.
    #[serde(default)]
    pub auto_id: bool,
    /// Free text description.
    #[serde(default)]
    pub description: String,
    /// Vector dimension.
    #[serde(default)]
    pub dim: Option<u32>,
    /// Maximum string length (VARCHAR, or ARRAY of VARCHAR).
    #[serde(default)]
    pub max_length: Option<u32>,
    /// Element type for ARRAY fields.
    #[serde(default)]
    pub element_type: Option<DataType>,
    /// Maximum element count for ARRAY fields.
    #[serde(default)]
    pub max_capacity: Option<u32>,
    /// Whether null values are accepted.
    #[serde(default)]
    pub nullable: bool,
    /// Default value applied when the field is omitted.
    #[serde(default)]
    pub default_value: Option<Value>,
    /// Partition key flag.
    #[serde(default)]
    pub is_partition_key: bool,
}

impl FieldSchema {
    /// Creates a field with no type attributes.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_primary: false,
            auto_id: false,
            description: String::new(),
            dim: None,
            max_length: None,
            element_type: None,
            max_capacity: None,
            nullable: false,
            default_value: None,
            is_partition_key: false,
        }
    }

    /// Sets the vector dimension.
    #[must_use]
    pub fn with_dim(mut self, dim: u32) -> Self {
        self.dim = Some(dim);
        self
    }

    /// Sets the string max length.
    #[must_use]
    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Marks the field as primary key.
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }
}

/// A collection schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Fields, primary key included.
    pub fields: Vec<FieldSchema>,
    /// Collection description.
    #[serde(default)]
    pub description: String,
    /// Server generated primary keys.
    #[serde(default)]
    pub auto_id: bool,
    /// Accept fields not declared in the schema.
    #[serde(default)]
    pub enable_dynamic_field: bool,
}

impl CollectionSchema {
    /// Returns the primary key field.
    #[must_use]
    pub fn primary_field(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.is_primary)
    }

    /// Returns the vector fields in declaration order.
    pub fn vector_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.data_type.is_vector())
    }
}

/// Read consistency levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    /// Read your own writes across all nodes.
    Strong,
    /// Read your own writes within the session.
    Session,
    /// Bounded staleness (server default).
    Bounded,
    /// No freshness guarantee.
    Eventually,
}

impl ConsistencyLevel {
    /// Every level, in prompt order.
    pub const ALL: [Self; 4] = [Self::Strong, Self::Session, Self::Bounded, Self::Eventually];

    /// Name used on the wire and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strong => "Strong",
            Self::Session => "Session",
            Self::Bounded => "Bounded",
            Self::Eventually => "Eventually",
        }
    }

    /// Case-insensitive parse.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(value))
    }
}

/// Options applied at collection creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateCollectionOptions {
    /// Number of shards.
    pub shards_num: Option<u32>,
    /// Default consistency level.
    pub consistency_level: Option<ConsistencyLevel>,
    /// Partition count when a partition key is declared.
    pub num_partitions: Option<u32>,
}

/// Collection description as returned by the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: String,
    /// Collection id.
    pub collection_id: i64,
    /// Description text.
    pub description: String,
    /// Schema fields.
    pub fields: Vec<FieldSchema>,
    /// Server generated primary keys.
    pub auto_id: bool,
    /// Dynamic field enabled.
    pub enable_dynamic_field: bool,
    /// Default consistency level.
    pub consistency_level: String,
    /// Shard count.
    pub shards_num: u32,
    /// Partition count.
    pub partitions_num: u32,
    /// Aliases pointing at the collection.
    pub aliases: Vec<String>,
    /// Creation timestamp (hybrid timestamp).
    pub created_timestamp: u64,
}

impl CollectionInfo {
    /// Returns the primary key field.
    #[must_use]
    pub fn primary_field(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.is_primary)
    }

    /// Returns the vector fields in declaration order.
    pub fn vector_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.data_type.is_vector())
    }
}

/// Load state of a collection or partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// The entity does not exist.
    NotExist,
    /// Present but not loaded.
    NotLoad,
    /// Loading in progress.
    Loading,
    /// Loaded and searchable.
    Loaded,
}

impl LoadState {
    /// Parses the server's `LoadStateXxx` spelling.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value.trim_start_matches("LoadState") {
            "Loaded" => Self::Loaded,
            "Loading" => Self::Loading,
            "NotExist" => Self::NotExist,
            _ => Self::NotLoad,
        }
    }

    /// Wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotExist => "LoadStateNotExist",
            Self::NotLoad => "LoadStateNotLoad",
            Self::Loading => "LoadStateLoading",
            Self::Loaded => "LoadStateLoaded",
        }
    }
}

/// Load state with optional progress percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStatus {
    /// Current state.
    pub state: LoadState,
    /// Progress in percent while loading.
    pub progress: Option<u32>,
}

/// Index build request.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexParams {
    /// Indexed field.
    pub field_name: String,
    /// Index name (defaults to the field name server side when empty).
    pub index_name: String,
    /// Algorithm name, e.g. `HNSW`.
    pub index_type: String,
    /// Metric name for vector indexes.
    pub metric_type: Option<String>,
    /// Build parameters in insertion order.
    pub params: Vec<(String, Value)>,
}

/// Index description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexInfo {
    /// Index name.
    pub index_name: String,
    /// Indexed field.
    pub field_name: String,
    /// Algorithm name.
    pub index_type: String,
    /// Metric name.
    pub metric_type: String,
    /// Build parameters.
    pub params: Vec<(String, Value)>,
    /// Rows already indexed.
    pub indexed_rows: u64,
    /// Rows in the collection.
    pub total_rows: u64,
    /// Rows waiting for indexing.
    pub pending_rows: u64,
    /// Build state.
    pub state: String,
}

/// Alias description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasInfo {
    /// Alias name.
    pub alias: String,
    /// Target collection.
    pub collection: String,
    /// Database holding the collection.
    pub db_name: String,
}

/// Database description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseInfo {
    /// Database name.
    pub name: String,
    /// Database id.
    pub db_id: i64,
    /// Database properties.
    pub properties: Vec<(String, String)>,
}

/// User description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfo {
    /// User name.
    pub name: String,
    /// Roles granted to the user.
    pub roles: Vec<String>,
}

/// One privilege granted to a role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivilegeGrant {
    /// Object type, e.g. `Collection` or `Global`.
    pub object_type: String,
    /// Object name or `*`.
    pub object_name: String,
    /// Privilege or privilege group name.
    pub privilege: String,
    /// Database scope.
    pub db_name: String,
    /// Grantor user when known.
    pub grantor: Option<String>,
}

/// Privilege group description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivilegeGroupInfo {
    /// Group name.
    pub name: String,
    /// Privileges in the group.
    pub privileges: Vec<String>,
}

/// Node capacity settings for a resource group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceGroupConfig {
    /// Requested node count.
    pub requests_node_num: u32,
    /// Node count limit.
    pub limits_node_num: u32,
}

/// Resource group description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceGroupInfo {
    /// Group name.
    pub name: String,
    /// Configured capacity.
    pub capacity: u32,
    /// Nodes currently available.
    pub available_nodes: u32,
    /// Capacity settings.
    pub config: ResourceGroupConfig,
    /// Loaded replica count per collection.
    pub loaded_replicas: Vec<(String, u32)>,
}

/// Compaction job state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionState {
    /// Compaction job id.
    pub job_id: i64,
    /// `Executing`, `Completed` or `UndefiedState`.
    pub state: String,
    /// Plans running.
    pub executing_plans: u64,
    /// Plans completed.
    pub completed_plans: u64,
    /// Plans timed out.
    pub timeout_plans: u64,
}

/// Result of insert/upsert/delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationResult {
    /// Affected entity count.
    pub count: u64,
    /// Primary keys of inserted/upserted entities.
    pub ids: Vec<Value>,
}

/// Delete-by-filter request.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequest {
    /// Target collection.
    pub collection: String,
    /// Optional partition.
    pub partition: Option<String>,
    /// Boolean filter expression.
    pub filter: String,
}

/// Scalar query request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// Target collection.
    pub collection: String,
    /// Boolean filter expression, passed through verbatim.
    pub filter: String,
    /// Fields to return.
    pub output_fields: Vec<String>,
    /// Partition restriction.
    pub partition_names: Vec<String>,
    /// Maximum rows.
    pub limit: Option<u64>,
    /// Rows to skip.
    pub offset: Option<u64>,
    /// Request timeout in seconds.
    pub timeout: Option<f64>,
    /// Consistency timestamp.
    pub guarantee_timestamp: Option<u64>,
    /// Graceful time in milliseconds for bounded consistency.
    pub graceful_time: Option<u64>,
}

/// Query vectors for a search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchVectors {
    /// Dense float vectors.
    Dense(Vec<Vec<f32>>),
    /// Sparse vectors as (index, value) pairs.
    Sparse(Vec<Vec<(u32, f32)>>),
}

impl SearchVectors {
    /// Number of query vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Dense(v) => v.len(),
            Self::Sparse(v) => v.len(),
        }
    }

    /// Returns true when no query vector is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// JSON payload in the REST layout.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Dense(vectors) => serde_json::json!(vectors),
            Self::Sparse(vectors) => Value::Array(
                vectors
                    .iter()
                    .map(|pairs| {
                        let map: serde_json::Map<String, Value> = pairs
                            .iter()
                            .map(|(k, v)| (k.to_string(), serde_json::json!(v)))
                            .collect();
                        Value::Object(map)
                    })
                    .collect(),
            ),
        }
    }
}

/// Single ANN search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Target collection.
    pub collection: String,
    /// Vector field searched.
    pub anns_field: String,
    /// Query vectors.
    pub data: SearchVectors,
    /// Metric name.
    pub metric_type: String,
    /// Search parameters (`ef`, `nprobe`, ...).
    pub params: Vec<(String, Value)>,
    /// Top-k per query vector.
    pub limit: u64,
    /// Results to skip.
    pub offset: u64,
    /// Boolean filter expression.
    pub filter: Option<String>,
    /// Fields to return.
    pub output_fields: Vec<String>,
    /// Partition restriction.
    pub partition_names: Vec<String>,
    /// Decimal places for distances, `-1` keeps full precision.
    pub round_decimal: i32,
    /// Consistency timestamp.
    pub guarantee_timestamp: Option<u64>,
    /// Request timeout in seconds.
    pub timeout: Option<f64>,
}

/// One ANN leg of a hybrid search.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnRequest {
    /// Vector field searched.
    pub anns_field: String,
    /// Query vectors.
    pub data: SearchVectors,
    /// Metric name.
    pub metric_type: String,
    /// Search parameters.
    pub params: Vec<(String, Value)>,
    /// Top-k for this leg.
    pub limit: u64,
    /// Boolean filter expression.
    pub filter: Option<String>,
}

/// Result fusion strategy for hybrid search.
#[derive(Debug, Clone, PartialEq)]
pub enum Ranker {
    /// Reciprocal rank fusion with smoothing constant `k`.
    Rrf {
        /// Smoothing constant.
        k: u32,
    },
    /// Weighted score fusion, one weight per leg.
    Weighted(Vec<f32>),
}

/// Multi-vector search request.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridSearchRequest {
    /// Target collection.
    pub collection: String,
    /// ANN legs.
    pub requests: Vec<AnnRequest>,
    /// Fusion strategy.
    pub ranker: Ranker,
    /// Final top-k.
    pub limit: u64,
    /// Fields to return.
    pub output_fields: Vec<String>,
    /// Partition restriction.
    pub partition_names: Vec<String>,
}

/// TLS modes accepted by `connect`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlsMode {
    /// Plain HTTP.
    #[default]
    Disabled,
    /// Server authentication only.
    OneWay,
    /// Mutual authentication.
    TwoWay,
}

impl TlsMode {
    /// Maps the numeric `-tls` level.
    #[must_use]
    pub const fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Disabled),
            1 => Some(Self::OneWay),
            2 => Some(Self::TwoWay),
            _ => None,
        }
    }

    /// Numeric level.
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Disabled => 0,
            Self::OneWay => 1,
            Self::TwoWay => 2,
        }
    }
}

/// Connection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectConfig {
    /// Server URI, e.g. `http://127.0.0.1:19530`.
    pub uri: String,
    /// Bearer token or `user:password`.
    pub token: Option<String>,
    /// TLS mode.
    pub tls: TlsMode,
    /// Server CA certificate (PEM).
    pub cert_path: Option<PathBuf>,
    /// Client certificate for mutual TLS (PEM).
    pub client_cert: Option<PathBuf>,
    /// Client private key for mutual TLS (PKCS#8 PEM).
    pub client_key: Option<PathBuf>,
    /// Database used by requests.
    pub db_name: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ConnectConfig {
    /// Creates a config with defaults for everything but the URI.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            token: None,
            tls: TlsMode::Disabled,
            cert_path: None,
            client_cert: None,
            client_key: None,
            db_name: DEFAULT_DATABASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Name of the database every server starts with.
pub const DEFAULT_DATABASE: &str = "default";

/// Name of the partition every collection starts with.
pub const DEFAULT_PARTITION: &str = "_default";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_tokens_round_trip() {
        for t in DataType::ALL {
            assert_eq!(DataType::from_token(t.token()), Some(t));
            assert_eq!(DataType::from_wire_name(t.wire_name()), Some(t));
        }
        assert_eq!(DataType::from_token("float_vector"), None);
    }

    #[test]
    fn test_requires_dim_excludes_sparse() {
        assert!(DataType::FloatVector.requires_dim());
        assert!(DataType::BinaryVector.requires_dim());
        assert!(!DataType::SparseFloatVector.requires_dim());
        assert!(DataType::SparseFloatVector.is_vector());
        assert!(!DataType::VarChar.is_vector());
    }

    #[test]
    fn test_load_state_from_wire() {
        assert_eq!(LoadState::from_wire("LoadStateLoaded"), LoadState::Loaded);
        assert_eq!(LoadState::from_wire("LoadStateLoading"), LoadState::Loading);
        assert_eq!(LoadState::from_wire("LoadStateNotLoad"), LoadState::NotLoad);
        assert_eq!(LoadState::from_wire("garbage"), LoadState::NotLoad);
    }

    #[test]
    fn test_sparse_vectors_to_json() {
        let data = SearchVectors::Sparse(vec![vec![(1, 0.5), (7, 0.25)]]);
        assert_eq!(data.to_json(), serde_json::json!([{"1": 0.5, "7": 0.25}]));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_collection_info_field_lookups() {
        let info = CollectionInfo {
            name: "books".to_string(),
            fields: vec![
                FieldSchema::new("title", DataType::VarChar).with_max_length(64),
                FieldSchema::new("id", DataType::Int64).primary(),
                FieldSchema::new("vec", DataType::FloatVector).with_dim(2),
                FieldSchema::new("sv", DataType::SparseFloatVector),
            ],
            ..CollectionInfo::default()
        };
        assert_eq!(info.primary_field().map(|f| f.name.as_str()), Some("id"));
        let vectors: Vec<&str> = info.vector_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(vectors, vec!["vec", "sv"]);
        assert!(CollectionInfo::default().primary_field().is_none());
    }

    #[test]
    fn test_tls_levels() {
        assert_eq!(TlsMode::from_level(2), Some(TlsMode::TwoWay));
        assert_eq!(TlsMode::from_level(3), None);
        assert_eq!(TlsMode::OneWay.level(), 1);
    }

    #[test]
    fn test_consistency_parse_case_insensitive() {
        assert_eq!(
            ConsistencyLevel::parse("strong"),
            Some(ConsistencyLevel::Strong)
        );
        assert_eq!(ConsistencyLevel::parse("never"), None);
    }
}
