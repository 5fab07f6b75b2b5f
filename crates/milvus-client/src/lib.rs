#![allow(clippy::doc_markdown)]
//! Typed blocking client for a Milvus vector database server.
//!
//! The crate exposes one seam, [`VectorService`], with a method per remote
//! operation. [`RestClient`] implements it over the RESTful v2 API; with the
//! `memory` feature, [`memory::InMemoryService`] implements it in-process for
//! tests.
//!
//! ```no_run
//! use milvus_client::{ConnectConfig, Connector, RestConnector};
//!
//! let service = RestConnector.connect(&ConnectConfig::new("http://127.0.0.1:19530"))?;
//! for name in service.list_collections()? {
//!     println!("{name}");
//! }
//! # Ok::<(), milvus_client::Error>(())
//! ```

pub mod error;
pub mod rest;
pub mod service;
pub mod types;

#[cfg(any(test, feature = "memory"))]
pub mod memory;

pub use error::{Error, Result};
pub use rest::{RestClient, RestConnector};
pub use service::{Connector, VectorService};
pub use types::*;
