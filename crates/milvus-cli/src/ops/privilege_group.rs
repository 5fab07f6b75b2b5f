use milvus_client::{PrivilegeGroupInfo, VectorService};

use super::{call, ensure_exists};
use crate::error::Result;

/// Privilege group administration.
pub struct PrivilegeGroupOps<'a> {
    client: &'a dyn VectorService,
}

impl<'a> PrivilegeGroupOps<'a> {
    /// Wraps a live handle.
    pub fn new(client: &'a dyn VectorService) -> Self {
        Self { client }
    }

    /// Groups with their privileges.
    pub fn list(&self) -> Result<Vec<PrivilegeGroupInfo>> {
        call("List privilege groups", "", || {
            self.client.list_privilege_groups()
        })
    }

    /// Existence check.
    pub fn has(&self, name: &str) -> Result<bool> {
        Ok(self.list()?.iter().any(|g| g.name == name))
    }

    /// Creates an empty group.
    pub fn create(&self, name: &str) -> Result<()> {
        call("Create privilege group", name, || {
            self.client.create_privilege_group(name)
        })
    }

    /// Drops a group; [`crate::error::CliError::NotFound`] when absent.
    pub fn drop(&self, name: &str) -> Result<()> {
        ensure_exists("Privilege group", name, self.has(name)?)?;
        call("Drop privilege group", name, || {
            self.client.drop_privilege_group(name)
        })
    }

    /// Adds privileges to a group.
    pub fn add(&self, name: &str, privileges: &[String]) -> Result<()> {
        ensure_exists("Privilege group", name, self.has(name)?)?;
        call("Add privileges to group", name, || {
            self.client.add_privileges_to_group(name, privileges)
        })
    }

    /// Removes privileges from a group.
    pub fn remove(&self, name: &str, privileges: &[String]) -> Result<()> {
        ensure_exists("Privilege group", name, self.has(name)?)?;
        call("Remove privileges from group", name, || {
            self.client.remove_privileges_from_group(name, privileges)
        })
    }
}
