use milvus_client::{PrivilegeGrant, Row, VectorService};
use serde_json::Value;

use super::{call, ensure_exists};
use crate::error::Result;

/// Role administration.
pub struct RoleOps<'a> {
    client: &'a dyn VectorService,
}

impl<'a> RoleOps<'a> {
    /// Wraps a live handle.
    pub fn new(client: &'a dyn VectorService) -> Self {
        Self { client }
    }

    /// Role names.
    pub fn list(&self) -> Result<Vec<String>> {
        call("List roles", "", || self.client.list_roles())
    }

    /// Existence check.
    pub fn has(&self, name: &str) -> Result<bool> {
        Ok(self.list()?.iter().any(|r| r == name))
    }

    /// Creates a role.
    pub fn create(&self, name: &str) -> Result<()> {
        call("Create role", name, || self.client.create_role(name))
    }

    /// Drops a role; [`crate::error::CliError::NotFound`] when absent.
    pub fn drop(&self, name: &str) -> Result<()> {
        ensure_exists("Role", name, self.has(name)?)?;
        call("Drop role", name, || self.client.drop_role(name))
    }

    /// Privileges granted to the role, one row per grant.
    pub fn grants(&self, name: &str) -> Result<Vec<Row>> {
        ensure_exists("Role", name, self.has(name)?)?;
        let grants = call("Describe role", name, || self.client.describe_role(name))?;
        Ok(grants
            .into_iter()
            .map(|g| {
                let mut row = Row::new();
                row.insert("Object Type".to_string(), Value::from(g.object_type));
                row.insert("Object Name".to_string(), Value::from(g.object_name));
                row.insert("Privilege".to_string(), Value::from(g.privilege));
                row.insert("Database".to_string(), Value::from(g.db_name));
                row.insert(
                    "Grantor".to_string(),
                    g.grantor.map_or(Value::Null, Value::from),
                );
                row
            })
            .collect())
    }

    /// Grants a privilege or privilege group.
    pub fn grant(&self, role: &str, grant: &PrivilegeGrant) -> Result<()> {
        ensure_exists("Role", role, self.has(role)?)?;
        call("Grant privilege", role, || self.client.grant_privilege(role, grant))
    }

    /// Revokes a privilege or privilege group.
    pub fn revoke(&self, role: &str, grant: &PrivilegeGrant) -> Result<()> {
        ensure_exists("Role", role, self.has(role)?)?;
        call("Revoke privilege", role, || self.client.revoke_privilege(role, grant))
    }
}
