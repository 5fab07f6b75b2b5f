use milvus_client::VectorService;
use serde_json::Value;

use super::{call, ensure_exists, joined};
use crate::error::Result;

/// User administration.
pub struct UserOps<'a> {
    client: &'a dyn VectorService,
}

impl<'a> UserOps<'a> {
    /// Wraps a live handle.
    pub fn new(client: &'a dyn VectorService) -> Self {
        Self { client }
    }

    /// User names.
    pub fn list(&self) -> Result<Vec<String>> {
        call("List users", "", || self.client.list_users())
    }

    /// Existence check.
    pub fn has(&self, name: &str) -> Result<bool> {
        Ok(self.list()?.iter().any(|u| u == name))
    }

    /// Creates a user.
    pub fn create(&self, name: &str, password: &str) -> Result<()> {
        call("Create user", name, || self.client.create_user(name, password))
    }

    /// Drops a user; [`crate::error::CliError::NotFound`] when absent.
    pub fn drop(&self, name: &str) -> Result<()> {
        ensure_exists("User", name, self.has(name)?)?;
        call("Drop user", name, || self.client.drop_user(name))
    }

    /// Name and granted roles.
    pub fn details(&self, name: &str) -> Result<Vec<(String, Value)>> {
        ensure_exists("User", name, self.has(name)?)?;
        let info = call("Describe user", name, || self.client.describe_user(name))?;
        Ok(vec![
            ("User".to_string(), Value::from(info.name)),
            ("Roles".to_string(), joined(&info.roles)),
        ])
    }

    /// Changes a password.
    pub fn update_password(&self, name: &str, old_password: &str, new_password: &str) -> Result<()> {
        ensure_exists("User", name, self.has(name)?)?;
        call("Update password", name, || {
            self.client.update_password(name, old_password, new_password)
        })
    }

    /// Grants a role to a user.
    pub fn grant_role(&self, user: &str, role: &str) -> Result<()> {
        ensure_exists("User", user, self.has(user)?)?;
        call("Grant role", role, || self.client.grant_role(user, role))
    }

    /// Revokes a role from a user.
    pub fn revoke_role(&self, user: &str, role: &str) -> Result<()> {
        ensure_exists("User", user, self.has(user)?)?;
        call("Revoke role", role, || self.client.revoke_role(user, role))
    }
}
