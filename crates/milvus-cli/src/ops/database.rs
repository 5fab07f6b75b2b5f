use milvus_client::VectorService;
use serde_json::Value;

use super::{call, ensure_exists};
use crate::error::Result;

/// Database administration. Switching databases needs the mutable handle and
/// is done by the session.
pub struct DatabaseOps<'a> {
    client: &'a dyn VectorService,
}

impl<'a> DatabaseOps<'a> {
    /// Wraps a live handle.
    pub fn new(client: &'a dyn VectorService) -> Self {
        Self { client }
    }

    /// Database names.
    pub fn list(&self) -> Result<Vec<String>> {
        call("List databases", "", || self.client.list_databases())
    }

    /// Existence check.
    pub fn has(&self, name: &str) -> Result<bool> {
        Ok(self.list()?.iter().any(|d| d == name))
    }

    /// Creates a database.
    pub fn create(&self, name: &str, properties: &[(String, String)]) -> Result<()> {
        call("Create database", name, || {
            self.client.create_database(name, properties)
        })
    }

    /// Drops a database; [`crate::error::CliError::NotFound`] when absent.
    pub fn drop(&self, name: &str) -> Result<()> {
        ensure_exists("Database", name, self.has(name)?)?;
        call("Drop database", name, || self.client.drop_database(name))
    }

    /// Name, id and properties.
    pub fn details(&self, name: &str) -> Result<Vec<(String, Value)>> {
        ensure_exists("Database", name, self.has(name)?)?;
        let info = call("Describe database", name, || {
            self.client.describe_database(name)
        })?;
        let mut entries = vec![
            ("Name".to_string(), Value::from(info.name)),
            ("Database ID".to_string(), Value::from(info.db_id)),
        ];
        entries.extend(
            info.properties
                .into_iter()
                .map(|(k, v)| (k, Value::from(v))),
        );
        Ok(entries)
    }
}
