use milvus_client::{
    CollectionInfo, DeleteRequest, HybridSearchRequest, MutationResult, QueryRequest, Row,
    SearchRequest, VectorService,
};
use serde_json::Value;

use super::{call, ensure_exists};
use crate::error::{CliError, Result};
use crate::validate::{ids_filter, round_distances};

/// Hits of a search, one list per query vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    /// Hit lists in query order.
    pub hits: Vec<Vec<Row>>,
}

impl SearchOutcome {
    /// Total number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.iter().map(Vec::len).sum()
    }

    /// Returns true when nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One row per hit. With several query vectors, a leading `query` column
    /// holds the query index.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        let multi = self.hits.len() > 1;
        self.hits
            .into_iter()
            .enumerate()
            .flat_map(|(q, hits)| {
                hits.into_iter().map(move |hit| {
                    if multi {
                        let mut row = Row::new();
                        row.insert("query".to_string(), Value::from(q));
                        row.extend(hit);
                        row
                    } else {
                        hit
                    }
                })
            })
            .collect()
    }
}

/// Data plane: writes, deletes, queries and searches.
pub struct DataOps<'a> {
    client: &'a dyn VectorService,
}

impl<'a> DataOps<'a> {
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

    /// Collection description, for field types.
    pub fn describe(&self, collection: &str) -> Result<CollectionInfo> {
        self.ensure_collection(collection)?;
        call("Describe collection", collection, || {
            self.client.describe_collection(collection)
        })
    }

    /// Inserts rows.
    pub fn insert(&self, collection: &str, partition: Option<&str>, rows: &[Row]) -> Result<MutationResult> {
        self.ensure_collection(collection)?;
        call("Insert", collection, || {
            self.client.insert(collection, partition, rows)
        })
    }

    /// Upserts rows.
    pub fn upsert(&self, collection: &str, partition: Option<&str>, rows: &[Row]) -> Result<MutationResult> {
        self.ensure_collection(collection)?;
        call("Upsert", collection, || {
            self.client.upsert(collection, partition, rows)
        })
    }

    /// Deletes entities matching a filter.
    pub fn delete_by_expr(
        &self,
        collection: &str,
        partition: Option<&str>,
        expr: &str,
    ) -> Result<MutationResult> {
        if expr.trim().is_empty() {
            return Err(CliError::parameter("expr", "delete expression must not be empty"));
        }
        self.ensure_collection(collection)?;
        let request = DeleteRequest {
            collection: collection.to_string(),
            partition: partition.map(str::to_string),
            filter: expr.to_string(),
        };
        call("Delete entities", collection, || self.client.delete(&request))
    }

    /// Deletes entities by primary key.
    pub fn delete_by_ids(
        &self,
        collection: &str,
        partition: Option<&str>,
        pk_field: &str,
        ids: &[Value],
    ) -> Result<MutationResult> {
        self.delete_by_expr(collection, partition, &ids_filter(pk_field, ids))
    }

    /// Scalar query.
    pub fn query(&self, request: &QueryRequest) -> Result<Vec<Row>> {
        self.ensure_collection(&request.collection)?;
        call("Query", &request.collection, || self.client.query(request))
    }

    /// Rows by primary key.
    pub fn get(&self, collection: &str, ids: &[Value], output_fields: &[String]) -> Result<Vec<Row>> {
        self.ensure_collection(collection)?;
        call("Get", collection, || {
            self.client.get(collection, ids, output_fields)
        })
    }

    /// ANN search. Distances are rounded when `round_decimal` is set.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        self.ensure_collection(&request.collection)?;
        let mut hits = call("Search", &request.collection, || self.client.search(request))?;
        round_distances(&mut hits, request.round_decimal);
        Ok(SearchOutcome { hits })
    }

    /// Multi-vector search.
    pub fn hybrid_search(&self, request: &HybridSearchRequest) -> Result<SearchOutcome> {
        self.ensure_collection(&request.collection)?;
        let hits = call("Hybrid search", &request.collection, || {
            self.client.hybrid_search(request)
        })?;
        Ok(SearchOutcome { hits })
    }
}
