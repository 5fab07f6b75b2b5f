//! Domain operation wrappers.
//!
//! One wrapper per noun. Each borrows the live [`VectorService`] handle,
//! exposes one method per verb and turns every client error into a
//! [`CliError`] named after the operation. List methods return plain names;
//! detail methods return flat key/value entries and degrade a failing
//! secondary lookup to [`UNKNOWN`].
//!
//! Dropping an absent entity is a [`CliError::NotFound`] for every noun,
//! detected with the matching `has_*` check before the remote call.
//!
//! [`VectorService`]: milvus_client::VectorService

mod alias;
mod collection;
mod data;
mod database;
mod index;
mod partition;
mod privilege_group;
mod resource_group;
mod role;
mod user;

pub use alias::AliasOps;
pub use collection::CollectionOps;
pub use data::{DataOps, SearchOutcome};
pub use database::DatabaseOps;
pub use index::IndexOps;
pub use partition::PartitionOps;
pub use privilege_group::PrivilegeGroupOps;
pub use resource_group::ResourceGroupOps;
pub use role::RoleOps;
pub use user::UserOps;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CliError, Result};

/// Placeholder for a detail the server could not provide.
pub const UNKNOWN: &str = "Unknown";

/// Runs one remote call, wrapping its error under `operation`.
pub(crate) fn call<T>(
    operation: &str,
    target: &str,
    f: impl FnOnce() -> milvus_client::Result<T>,
) -> Result<T> {
    debug!(operation, target, "remote request");
    f().map_err(|e| CliError::remote(operation, e))
}

/// Runs a secondary lookup of a detail view, degrading failures to [`UNKNOWN`].
pub(crate) fn detail<T>(
    what: &str,
    f: impl FnOnce() -> milvus_client::Result<T>,
    to_value: impl FnOnce(T) -> Value,
) -> Value {
    match f() {
        Ok(v) => to_value(v),
        Err(e) => {
            warn!(what, error = %e, "detail lookup failed");
            Value::String(UNKNOWN.to_string())
        }
    }
}

/// Fails with [`CliError::NotFound`] unless `exists`.
pub(crate) fn ensure_exists(kind: &'static str, name: &str, exists: bool) -> Result<()> {
    if exists {
        Ok(())
    } else {
        Err(CliError::NotFound {
            kind,
            name: name.to_string(),
        })
    }
}

/// Joins names for a single table cell.
pub(crate) fn joined(names: &[String]) -> Value {
    Value::String(names.join(", "))
}

#[cfg(test)]
mod tests;
