use milvus_client::VectorService;
use serde_json::Value;

use super::{call, ensure_exists};
use crate::error::Result;

/// Alias administration.
pub struct AliasOps<'a> {
    client: &'a dyn VectorService,
}

impl<'a> AliasOps<'a> {
    /// Wraps a live handle.
    pub fn new(client: &'a dyn VectorService) -> Self {
        Self { client }
    }

    /// Aliases, optionally of one collection.
    pub fn list(&self, collection: Option<&str>) -> Result<Vec<String>> {
        call("List aliases", collection.unwrap_or(""), || {
            self.client.list_aliases(collection)
        })
    }

    /// Existence check.
    pub fn has(&self, alias: &str) -> Result<bool> {
        Ok(self.list(None)?.iter().any(|a| a == alias))
    }

    /// Creates an alias for a collection.
    pub fn create(&self, collection: &str, alias: &str) -> Result<()> {
        call("Create alias", alias, || self.client.create_alias(collection, alias))
    }

    /// Re-points an alias; [`crate::error::CliError::NotFound`] when absent.
    pub fn alter(&self, collection: &str, alias: &str) -> Result<()> {
        ensure_exists("Alias", alias, self.has(alias)?)?;
        call("Alter alias", alias, || self.client.alter_alias(collection, alias))
    }

    /// Drops an alias; [`crate::error::CliError::NotFound`] when absent.
    pub fn drop(&self, alias: &str) -> Result<()> {
        ensure_exists("Alias", alias, self.has(alias)?)?;
        call("Drop alias", alias, || self.client.drop_alias(alias))
    }

    /// Alias, target collection and database.
    pub fn details(&self, alias: &str) -> Result<Vec<(String, Value)>> {
        ensure_exists("Alias", alias, self.has(alias)?)?;
        let info = call("Describe alias", alias, || self.client.describe_alias(alias))?;
        Ok(vec![
            ("Alias".to_string(), Value::from(info.alias)),
            ("Collection".to_string(), Value::from(info.collection)),
            ("Database".to_string(), Value::from(info.db_name)),
        ])
    }
}
