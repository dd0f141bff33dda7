// Forkful
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Execution of a parsed query against a collection of records.

use crate::db::{DbError, DbResult, Executor};
use crate::query::descriptor::{Filter, Projection, QueryDescriptor, QueryOptions, SortKey};
use crate::query::envelope::{Pagination, ResultEnvelope};
use async_trait::async_trait;
use log::warn;

/// A record returned by a collection, keyed by the field names exposed to clients.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Projection used by a `Find` that did not request any.
static DEFAULT_PROJECTION: Projection = Projection::Default;

/// Description of a read against a `Collection`.
///
/// Built as `Find::new(filters).select(projection).sort(keys).skip(n).limit(n)`.
#[derive(Debug)]
pub struct Find<'a> {
    /// Conditions that records must all satisfy.
    pub filters: &'a [Filter],

    /// Fields to return.
    pub projection: &'a Projection,

    /// Keys to order the results by, most significant first.
    pub sort: &'a [SortKey],

    /// Number of matching records to skip.
    pub skip: u64,

    /// Maximum number of records to return, if any.
    pub limit: Option<u64>,
}

impl<'a> Find<'a> {
    /// Starts describing a read of all records that match `filters`.
    pub fn new(filters: &'a [Filter]) -> Self {
        Self { filters, projection: &DEFAULT_PROJECTION, sort: &[], skip: 0, limit: None }
    }

    /// Sets the fields to return.
    pub fn select(mut self, projection: &'a Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Sets the keys to order the results by.
    pub fn sort(mut self, sort: &'a [SortKey]) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the number of matching records to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the maximum number of records to return.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Capabilities required from a data store to answer list queries.
#[async_trait]
pub trait Collection: Send + Sync {
    /// Returns the records described by `find`.
    async fn find(&self, ex: &mut Executor, find: &Find<'_>) -> DbResult<Vec<Document>>;

    /// Counts the records that match all `filters`.
    async fn count(&self, ex: &mut Executor, filters: &[Filter]) -> DbResult<u64>;
}

/// Collapses any failure of the data store into a single opaque error.
fn query_failed(e: DbError) -> DbError {
    warn!("List query failed: {}", e);
    DbError::BackendError("Query failed".to_owned())
}

/// Runs the parsed `query` against `collection`.
///
/// The total count and the page are fetched with two sequential reads through `ex`.  Callers
/// that need both reads to observe the same snapshot must pass an executor backed by a
/// transaction.
pub async fn execute(
    ex: &mut Executor,
    collection: &dyn Collection,
    query: &QueryDescriptor,
) -> DbResult<ResultEnvelope<Document>> {
    let skip = query.page.saturating_sub(1).saturating_mul(query.limit);

    let total = collection.count(ex, &query.filters).await.map_err(query_failed)?;

    let find = Find::new(&query.filters)
        .select(&query.projection)
        .sort(&query.sort)
        .skip(skip)
        .limit(query.limit);
    let data = collection.find(ex, &find).await.map_err(query_failed)?;

    Ok(ResultEnvelope::new(data, Pagination::new(query.page, query.limit, total)))
}

/// Parses the raw query `params` and runs them against `collection`.
pub async fn run_query(
    ex: &mut Executor,
    collection: &dyn Collection,
    params: &[(String, String)],
    opts: &QueryOptions,
) -> DbResult<ResultEnvelope<Document>> {
    let query = QueryDescriptor::parse(params, opts);
    execute(ex, collection, &query).await
}
