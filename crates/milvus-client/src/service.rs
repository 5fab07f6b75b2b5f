//! The remote service contract.
//!
//! [`VectorService`] is the only surface the CLI talks to. Every method may
//! fail with an implementation-defined [`Error`](crate::Error); callers wrap it
//! into their own taxonomy.

use serde_json::Value;

use crate::error::Result;
use crate::types::{
    AliasInfo, CollectionInfo, CollectionSchema, CompactionState, ConnectConfig,
    CreateCollectionOptions, DatabaseInfo, DeleteRequest, HybridSearchRequest, IndexInfo,
    IndexParams, LoadStatus, MutationResult, PrivilegeGrant, PrivilegeGroupInfo, QueryRequest,
    ResourceGroupConfig, ResourceGroupInfo, Row, SearchRequest, UserInfo,
};

/// Typed RPC surface of a vector database server.
///
/// Implement this trait to add a new transport. All calls are blocking and
/// scoped to the current database (see [`VectorService::use_database`]).
pub trait VectorService {
    /// Server endpoint this handle talks to.
    fn endpoint(&self) -> &str;

    /// Database requests are scoped to.
    fn current_database(&self) -> &str;

    /// Switches the database scope for subsequent requests.
    fn use_database(&mut self, name: &str) -> Result<()>;

    // ---------------------------------------------------------------- databases

    /// Lists database names.
    fn list_databases(&self) -> Result<Vec<String>>;
    /// Creates a database.
    fn create_database(&self, name: &str, properties: &[(String, String)]) -> Result<()>;
    /// Describes a database.
    fn describe_database(&self, name: &str) -> Result<DatabaseInfo>;
    /// Drops a database.
    fn drop_database(&self, name: &str) -> Result<()>;

    // -------------------------------------------------------------- collections

    /// Lists collection names.
    fn list_collections(&self) -> Result<Vec<String>>;
    /// Returns true when the collection exists.
    fn has_collection(&self, name: &str) -> Result<bool>;
    /// Creates a collection.
    fn create_collection(
        &self,
        name: &str,
        schema: &CollectionSchema,
        options: &CreateCollectionOptions,
    ) -> Result<()>;
    /// Describes a collection.
    fn describe_collection(&self, name: &str) -> Result<CollectionInfo>;
    /// Drops a collection.
    fn drop_collection(&self, name: &str) -> Result<()>;
    /// Renames a collection, optionally moving it to another database.
    fn rename_collection(&self, old_name: &str, new_name: &str, new_db: Option<&str>)
        -> Result<()>;
    /// Returns the row count.
    fn collection_row_count(&self, name: &str) -> Result<u64>;
    /// Loads a collection into memory.
    fn load_collection(&self, name: &str, replicas: Option<u32>) -> Result<()>;
    /// Releases a collection from memory.
    fn release_collection(&self, name: &str) -> Result<()>;
    /// Returns the load state of a collection or one of its partitions.
    fn load_state(&self, collection: &str, partition: Option<&str>) -> Result<LoadStatus>;
    /// Seals growing segments.
    fn flush(&self, collection: &str) -> Result<()>;
    /// Starts a compaction and returns the job id.
    fn compact(&self, collection: &str) -> Result<i64>;
    /// Returns the state of a compaction job.
    fn compaction_state(&self, job_id: i64) -> Result<CompactionState>;

    // --------------------------------------------------------------- partitions

    /// Lists partition names.
    fn list_partitions(&self, collection: &str) -> Result<Vec<String>>;
    /// Returns true when the partition exists.
    fn has_partition(&self, collection: &str, partition: &str) -> Result<bool>;
    /// Creates a partition.
    fn create_partition(&self, collection: &str, partition: &str) -> Result<()>;
    /// Drops a partition.
    fn drop_partition(&self, collection: &str, partition: &str) -> Result<()>;
    /// Returns the partition row count.
    fn partition_row_count(&self, collection: &str, partition: &str) -> Result<u64>;
    /// Loads partitions.
    fn load_partitions(&self, collection: &str, partitions: &[String]) -> Result<()>;
    /// Releases partitions.
    fn release_partitions(&self, collection: &str, partitions: &[String]) -> Result<()>;

    // ------------------------------------------------------------------ indexes

    /// Lists index names of a collection.
    fn list_indexes(&self, collection: &str) -> Result<Vec<String>>;
    /// Describes an index.
    fn describe_index(&self, collection: &str, index_name: &str) -> Result<IndexInfo>;
    /// Builds an index.
    fn create_index(&self, collection: &str, params: &IndexParams) -> Result<()>;
    /// Drops an index.
    fn drop_index(&self, collection: &str, index_name: &str) -> Result<()>;

    // ------------------------------------------------------------------ aliases

    /// Lists aliases, optionally restricted to one collection.
    fn list_aliases(&self, collection: Option<&str>) -> Result<Vec<String>>;
    /// Describes an alias.
    fn describe_alias(&self, alias: &str) -> Result<AliasInfo>;
    /// Creates an alias.
    fn create_alias(&self, collection: &str, alias: &str) -> Result<()>;
    /// Re-points an alias.
    fn alter_alias(&self, collection: &str, alias: &str) -> Result<()>;
    /// Drops an alias.
    fn drop_alias(&self, alias: &str) -> Result<()>;

    // -------------------------------------------------------------------- users

    /// Lists user names.
    fn list_users(&self) -> Result<Vec<String>>;
    /// Describes a user.
    fn describe_user(&self, name: &str) -> Result<UserInfo>;
    /// Creates a user.
    fn create_user(&self, name: &str, password: &str) -> Result<()>;
    /// Changes a password.
    fn update_password(&self, name: &str, old_password: &str, new_password: &str) -> Result<()>;
    /// Drops a user.
    fn drop_user(&self, name: &str) -> Result<()>;
    /// Grants a role to a user.
    fn grant_role(&self, user: &str, role: &str) -> Result<()>;
    /// Revokes a role from a user.
    fn revoke_role(&self, user: &str, role: &str) -> Result<()>;

    // -------------------------------------------------------------------- roles

    /// Lists role names.
    fn list_roles(&self) -> Result<Vec<String>>;
    /// Lists privileges granted to a role.
    fn describe_role(&self, name: &str) -> Result<Vec<PrivilegeGrant>>;
    /// Creates a role.
    fn create_role(&self, name: &str) -> Result<()>;
    /// Drops a role.
    fn drop_role(&self, name: &str) -> Result<()>;
    /// Grants a privilege to a role.
    fn grant_privilege(&self, role: &str, grant: &PrivilegeGrant) -> Result<()>;
    /// Revokes a privilege from a role.
    fn revoke_privilege(&self, role: &str, grant: &PrivilegeGrant) -> Result<()>;

    // --------------------------------------------------------- privilege groups

    /// Lists privilege groups with their members.
    fn list_privilege_groups(&self) -> Result<Vec<PrivilegeGroupInfo>>;
    /// Creates a privilege group.
    fn create_privilege_group(&self, name: &str) -> Result<()>;
    /// Drops a privilege group.
    fn drop_privilege_group(&self, name: &str) -> Result<()>;
    /// Adds privileges to a group.
    fn add_privileges_to_group(&self, name: &str, privileges: &[String]) -> Result<()>;
    /// Removes privileges from a group.
    fn remove_privileges_from_group(&self, name: &str, privileges: &[String]) -> Result<()>;

    // ---------------------------------------------------------- resource groups

    /// Lists resource group names.
    fn list_resource_groups(&self) -> Result<Vec<String>>;
    /// Describes a resource group.
    fn describe_resource_group(&self, name: &str) -> Result<ResourceGroupInfo>;
    /// Creates a resource group.
    fn create_resource_group(&self, name: &str, config: &ResourceGroupConfig) -> Result<()>;
    /// Updates a resource group.
    fn update_resource_group(&self, name: &str, config: &ResourceGroupConfig) -> Result<()>;
    /// Drops a resource group.
    fn drop_resource_group(&self, name: &str) -> Result<()>;
    /// Moves replicas of a collection between resource groups.
    fn transfer_replica(
        &self,
        source: &str,
        target: &str,
        collection: &str,
        num_replicas: u32,
    ) -> Result<()>;

    // --------------------------------------------------------------- data plane

    /// Inserts rows.
    fn insert(&self, collection: &str, partition: Option<&str>, rows: &[Row])
        -> Result<MutationResult>;
    /// Upserts rows.
    fn upsert(&self, collection: &str, partition: Option<&str>, rows: &[Row])
        -> Result<MutationResult>;
    /// Deletes rows matching a filter.
    fn delete(&self, request: &DeleteRequest) -> Result<MutationResult>;
    /// Scalar query.
    fn query(&self, request: &QueryRequest) -> Result<Vec<Row>>;
    /// Fetches rows by primary key.
    fn get(&self, collection: &str, ids: &[Value], output_fields: &[String]) -> Result<Vec<Row>>;
    /// ANN search; one hit list per query vector.
    fn search(&self, request: &SearchRequest) -> Result<Vec<Vec<Row>>>;
    /// Multi-vector search with result fusion.
    fn hybrid_search(&self, request: &HybridSearchRequest) -> Result<Vec<Vec<Row>>>;
}

/// Opens live [`VectorService`] handles.
///
/// The CLI holds one connector for the whole process and asks it for a new
/// handle on every `connect`.
pub trait Connector {
    /// Connects and verifies the server answers.
    fn connect(&self, config: &ConnectConfig) -> Result<Box<dyn VectorService>>;
}
