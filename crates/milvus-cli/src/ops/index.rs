use milvus_client::{IndexInfo, IndexParams, VectorService};
use serde_json::Value;

use super::{call, ensure_exists};
use crate::error::Result;
use crate::validate::IndexSummary;

/// Index administration.
pub struct IndexOps<'a> {
    client: &'a dyn VectorService,
}

impl<'a> IndexOps<'a> {
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

    /// Index names of a collection.
    pub fn list(&self, collection: &str) -> Result<Vec<String>> {
        self.ensure_collection(collection)?;
        call("List indexes", collection, || self.client.list_indexes(collection))
    }

    /// Existence check.
    pub fn has(&self, collection: &str, index_name: &str) -> Result<bool> {
        Ok(self.list(collection)?.iter().any(|i| i == index_name))
    }

    /// Builds an index from already validated parameters.
    pub fn create(&self, collection: &str, params: &IndexParams) -> Result<()> {
        self.ensure_collection(collection)?;
        call("Create index", &params.field_name, || {
            self.client.create_index(collection, params)
        })
    }

    /// Drops an index; [`crate::error::CliError::NotFound`] when absent.
    pub fn drop(&self, collection: &str, index_name: &str) -> Result<()> {
        ensure_exists("Index", index_name, self.has(collection, index_name)?)?;
        call("Drop index", index_name, || {
            self.client.drop_index(collection, index_name)
        })
    }

    /// Raw description.
    pub fn describe(&self, collection: &str, index_name: &str) -> Result<IndexInfo> {
        ensure_exists("Index", index_name, self.has(collection, index_name)?)?;
        call("Describe index", index_name, || {
            self.client.describe_index(collection, index_name)
        })
    }

    /// Flat description.
    pub fn details(&self, collection: &str, index_name: &str) -> Result<Vec<(String, Value)>> {
        let info = self.describe(collection, index_name)?;
        let params: Vec<String> = info
            .params
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect();
        Ok(vec![
            ("Index Name".to_string(), Value::from(info.index_name)),
            ("Field Name".to_string(), Value::from(info.field_name)),
            ("Index Type".to_string(), Value::from(info.index_type)),
            ("Metric Type".to_string(), Value::from(info.metric_type)),
            ("Params".to_string(), Value::from(params.join(", "))),
            ("Indexed Rows".to_string(), Value::from(info.indexed_rows)),
            ("Total Rows".to_string(), Value::from(info.total_rows)),
            ("Pending Rows".to_string(), Value::from(info.pending_rows)),
            ("State".to_string(), Value::from(info.state)),
        ])
    }

    /// Index built on `field`, if any. Lookup failures count as no index.
    pub fn for_field(&self, collection: &str, field: &str) -> Option<IndexSummary> {
        let names = self.client.list_indexes(collection).ok()?;
        names
            .iter()
            .filter_map(|n| self.client.describe_index(collection, n).ok())
            .find(|info| info.field_name == field)
            .map(|info| IndexSummary {
                index_type: info.index_type,
                metric_type: info.metric_type,
            })
    }
}
