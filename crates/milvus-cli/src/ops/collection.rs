use milvus_client::{
    CollectionInfo, CollectionSchema, CompactionState, CreateCollectionOptions, LoadStatus,
    VectorService,
};
use serde_json::Value;

use super::{call, detail, ensure_exists, joined};
use crate::error::Result;

/// Collection administration.
pub struct CollectionOps<'a> {
    client: &'a dyn VectorService,
}

impl<'a> CollectionOps<'a> {
    /// Wraps a live handle.
    pub fn new(client: &'a dyn VectorService) -> Self {
        Self { client }
    }

    /// Collection names of the current database.
    pub fn list(&self) -> Result<Vec<String>> {
        call("List collections", "", || self.client.list_collections())
    }

    /// Existence check.
    pub fn has(&self, name: &str) -> Result<bool> {
        call("Has collection", name, || self.client.has_collection(name))
    }

    /// Creates a collection. A duplicate name is a remote error.
    pub fn create(
        &self,
        name: &str,
        schema: &CollectionSchema,
        options: &CreateCollectionOptions,
    ) -> Result<()> {
        call("Create collection", name, || {
            self.client.create_collection(name, schema, options)
        })
    }

    /// Raw description; [`crate::error::CliError::NotFound`] when absent.
    pub fn describe(&self, name: &str) -> Result<CollectionInfo> {
        ensure_exists("Collection", name, self.has(name)?)?;
        call("Describe collection", name, || {
            self.client.describe_collection(name)
        })
    }

    /// Flat description assembled from describe, stats, partitions, indexes
    /// and load state.
    pub fn details(&self, name: &str) -> Result<Vec<(String, Value)>> {
        let info = self.describe(name)?;
        let fields: Vec<String> = info
            .fields
            .iter()
            .map(|f| {
                let mut text = format!("{}: {}", f.name, f.data_type);
                if let Some(dim) = f.dim {
                    text.push_str(&format!("(dim={dim})"));
                }
                if let Some(len) = f.max_length {
                    text.push_str(&format!("(max_length={len})"));
                }
                if f.is_primary {
                    text.push_str(" [primary]");
                }
                text
            })
            .collect();

        let mut entries = vec![
            ("Name".to_string(), Value::from(info.name.clone())),
            ("Collection ID".to_string(), Value::from(info.collection_id)),
            ("Description".to_string(), Value::from(info.description.clone())),
            ("Fields".to_string(), joined(&fields)),
            ("Auto ID".to_string(), Value::from(info.auto_id)),
            ("Dynamic Field".to_string(), Value::from(info.enable_dynamic_field)),
            ("Consistency Level".to_string(), Value::from(info.consistency_level.clone())),
            ("Shards".to_string(), Value::from(info.shards_num)),
            ("Aliases".to_string(), joined(&info.aliases)),
        ];
        entries.push((
            "Row Count".to_string(),
            detail("row count", || self.client.collection_row_count(name), Value::from),
        ));
        entries.push((
            "Partitions".to_string(),
            detail("partitions", || self.client.list_partitions(name), |p| joined(&p)),
        ));
        entries.push((
            "Indexes".to_string(),
            detail("indexes", || self.client.list_indexes(name), |i| joined(&i)),
        ));
        entries.push((
            "Load State".to_string(),
            detail(
                "load state",
                || self.client.load_state(name, None),
                |s| Value::from(s.state.as_str()),
            ),
        ));
        Ok(entries)
    }

    /// Drops a collection; [`crate::error::CliError::NotFound`] when absent.
    pub fn drop(&self, name: &str) -> Result<()> {
        ensure_exists("Collection", name, self.has(name)?)?;
        call("Drop collection", name, || self.client.drop_collection(name))
    }

    /// Renames a collection, optionally into another database.
    pub fn rename(&self, old_name: &str, new_name: &str, new_db: Option<&str>) -> Result<()> {
        ensure_exists("Collection", old_name, self.has(old_name)?)?;
        call("Rename collection", old_name, || {
            self.client.rename_collection(old_name, new_name, new_db)
        })
    }

    /// Loads a collection.
    pub fn load(&self, name: &str, replicas: Option<u32>) -> Result<()> {
        ensure_exists("Collection", name, self.has(name)?)?;
        call("Load collection", name, || {
            self.client.load_collection(name, replicas)
        })
    }

    /// Releases a collection.
    pub fn release(&self, name: &str) -> Result<()> {
        ensure_exists("Collection", name, self.has(name)?)?;
        call("Release collection", name, || {
            self.client.release_collection(name)
        })
    }

    /// Load state of the collection or one partition.
    pub fn load_state(&self, name: &str, partition: Option<&str>) -> Result<LoadStatus> {
        ensure_exists("Collection", name, self.has(name)?)?;
        call("Get load state", name, || {
            self.client.load_state(name, partition)
        })
    }

    /// Row count.
    pub fn row_count(&self, name: &str) -> Result<u64> {
        call("Get collection stats", name, || {
            self.client.collection_row_count(name)
        })
    }

    /// Seals growing segments.
    pub fn flush(&self, name: &str) -> Result<()> {
        ensure_exists("Collection", name, self.has(name)?)?;
        call("Flush", name, || self.client.flush(name))
    }

    /// Starts a compaction; returns the job id.
    pub fn compact(&self, name: &str) -> Result<i64> {
        ensure_exists("Collection", name, self.has(name)?)?;
        call("Compact", name, || self.client.compact(name))
    }

    /// State of a compaction job.
    pub fn compaction_state(&self, job_id: i64) -> Result<CompactionState> {
        call("Get compaction state", &job_id.to_string(), || {
            self.client.compaction_state(job_id)
        })
    }
}
