use milvus_client::{ResourceGroupConfig, VectorService};
use serde_json::Value;

use super::{call, ensure_exists};
use crate::error::Result;

/// Resource group administration.
pub struct ResourceGroupOps<'a> {
    client: &'a dyn VectorService,
}

impl<'a> ResourceGroupOps<'a> {
    /// Wraps a live handle.
    pub fn new(client: &'a dyn VectorService) -> Self {
        Self { client }
    }

    /// Group names.
    pub fn list(&self) -> Result<Vec<String>> {
        call("List resource groups", "", || self.client.list_resource_groups())
    }

    /// Existence check.
    pub fn has(&self, name: &str) -> Result<bool> {
        Ok(self.list()?.iter().any(|g| g == name))
    }

    /// Creates a group.
    pub fn create(&self, name: &str, config: &ResourceGroupConfig) -> Result<()> {
        call("Create resource group", name, || {
            self.client.create_resource_group(name, config)
        })
    }

    /// Updates node requests and limits.
    pub fn update(&self, name: &str, config: &ResourceGroupConfig) -> Result<()> {
        ensure_exists("Resource group", name, self.has(name)?)?;
        call("Update resource group", name, || {
            self.client.update_resource_group(name, config)
        })
    }

    /// Drops a group; [`crate::error::CliError::NotFound`] when absent.
    pub fn drop(&self, name: &str) -> Result<()> {
        ensure_exists("Resource group", name, self.has(name)?)?;
        call("Drop resource group", name, || {
            self.client.drop_resource_group(name)
        })
    }

    /// Capacity, nodes and loaded replicas.
    pub fn details(&self, name: &str) -> Result<Vec<(String, Value)>> {
        ensure_exists("Resource group", name, self.has(name)?)?;
        let info = call("Describe resource group", name, || {
            self.client.describe_resource_group(name)
        })?;
        let replicas: Vec<String> = info
            .loaded_replicas
            .iter()
            .map(|(c, n)| format!("{c}: {n}"))
            .collect();
        Ok(vec![
            ("Name".to_string(), Value::from(info.name)),
            ("Capacity".to_string(), Value::from(info.capacity)),
            ("Available Nodes".to_string(), Value::from(info.available_nodes)),
            ("Requests Node Num".to_string(), Value::from(info.config.requests_node_num)),
            ("Limits Node Num".to_string(), Value::from(info.config.limits_node_num)),
            ("Loaded Replicas".to_string(), Value::from(replicas.join(", "))),
        ])
    }

    /// Moves replicas of a collection between groups.
    pub fn transfer_replica(
        &self,
        source: &str,
        target: &str,
        collection: &str,
        num_replicas: u32,
    ) -> Result<()> {
        ensure_exists("Resource group", source, self.has(source)?)?;
        ensure_exists("Resource group", target, self.has(target)?)?;
        call("Transfer replica", collection, || {
            self.client
                .transfer_replica(source, target, collection, num_replicas)
        })
    }
}
