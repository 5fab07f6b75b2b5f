use milvus_client::{LoadStatus, VectorService};
use serde_json::Value;

use super::{call, detail, ensure_exists};
use crate::error::Result;

/// Partition administration.
pub struct PartitionOps<'a> {
    client: &'a dyn VectorService,
}

impl<'a> PartitionOps<'a> {
    /// Wraps a live handle.
    pub fn new(client: &'a dyn VectorService) -> Self {
        Self { client }
    }

    fn ensure_collection(&self, collection: &str) -> Result<()> {
        let exists = call("Has collection", collection, || {
            self.client.has_collection(collection)
        })?;
        ensure_exists("Collection", collection, exists)
    }

    /// Partition names of a collection.
    pub fn list(&self, collection: &str) -> Result<Vec<String>> {
        self.ensure_collection(collection)?;
        call("List partitions", collection, || {
            self.client.list_partitions(collection)
        })
    }

    /// Existence check.
    pub fn has(&self, collection: &str, partition: &str) -> Result<bool> {
        call("Has partition", partition, || {
            self.client.has_partition(collection, partition)
        })
    }

    /// Creates a partition.
    pub fn create(&self, collection: &str, partition: &str) -> Result<()> {
        self.ensure_collection(collection)?;
        call("Create partition", partition, || {
            self.client.create_partition(collection, partition)
        })
    }

    /// Drops a partition; [`crate::error::CliError::NotFound`] when absent.
    pub fn drop(&self, collection: &str, partition: &str) -> Result<()> {
        self.ensure_collection(collection)?;
        ensure_exists("Partition", partition, self.has(collection, partition)?)?;
        call("Drop partition", partition, || {
            self.client.drop_partition(collection, partition)
        })
    }

    /// Name, collection, row count and load state.
    pub fn details(&self, collection: &str, partition: &str) -> Result<Vec<(String, Value)>> {
        self.ensure_collection(collection)?;
        ensure_exists("Partition", partition, self.has(collection, partition)?)?;
        Ok(vec![
            ("Partition".to_string(), Value::from(partition)),
            ("Collection".to_string(), Value::from(collection)),
            (
                "Row Count".to_string(),
                detail(
                    "partition row count",
                    || self.client.partition_row_count(collection, partition),
                    Value::from,
                ),
            ),
            (
                "Load State".to_string(),
                detail(
                    "partition load state",
                    || self.client.load_state(collection, Some(partition)),
                    |s: LoadStatus| Value::from(s.state.as_str()),
                ),
            ),
        ])
    }

    /// Loads partitions.
    pub fn load(&self, collection: &str, partitions: &[String]) -> Result<()> {
        self.ensure_collection(collection)?;
        for p in partitions {
            ensure_exists("Partition", p, self.has(collection, p)?)?;
        }
        call("Load partitions", collection, || {
            self.client.load_partitions(collection, partitions)
        })
    }

    /// Releases partitions.
    pub fn release(&self, collection: &str, partitions: &[String]) -> Result<()> {
        self.ensure_collection(collection)?;
        for p in partitions {
            ensure_exists("Partition", p, self.has(collection, p)?)?;
        }
        call("Release partitions", collection, || {
            self.client.release_partitions(collection, partitions)
        })
    }
}
