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

//! Parsing of raw query parameters into a structured query.

use crate::env::get_optional_var;
use crate::query::operator::{Operator, translate};

/// Name of the field used to sort results when the query does not ask for any order.
const DEFAULT_SORT_FIELD: &str = "createdAt";

/// Configuration of the query engine.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryOptions {
    /// Number of records per page when the query does not specify a valid `limit`.
    pub default_limit: u64,

    /// Maximum number of records per page.  Larger `limit` values are clamped to this.
    pub max_limit: u64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self { default_limit: 100, max_limit: 1000 }
    }
}

impl QueryOptions {
    /// Creates a new set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_QUERY_MAX_LIMIT`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let mut opts = Self::default();
        if let Some(max_limit) = get_optional_var::<u64>(prefix, "QUERY_MAX_LIMIT")? {
            if max_limit == 0 {
                return Err(format!("{}_QUERY_MAX_LIMIT must be positive", prefix));
            }
            opts.max_limit = max_limit;
        }
        Ok(opts)
    }
}

/// A single filtering condition.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    /// Name of the field to compare, as exposed to clients.
    pub field: String,

    /// Comparison to apply.
    pub op: Operator,

    /// Raw value to compare against.  Converted to the field's type by the collection.
    pub value: String,
}

impl Filter {
    /// Creates a new filter.
    pub fn new<F: Into<String>, V: Into<String>>(field: F, op: Operator, value: V) -> Self {
        Self { field: field.into(), op, value: value.into() }
    }
}

/// Set of fields to return for each record.
#[derive(Clone, Debug, PartialEq)]
pub enum Projection {
    /// All fields except those internal to the collection.
    Default,

    /// Only the given fields, plus the record identifier.
    Include(Vec<String>),

    /// All fields except the given ones.  The record identifier is always returned.
    Exclude(Vec<String>),
}

/// Direction of a sort key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Direction {
    /// Smallest values first.
    Ascending,

    /// Largest values first.
    Descending,
}

/// A field to order results by.
#[derive(Clone, Debug, PartialEq)]
pub struct SortKey {
    /// Name of the field, as exposed to clients.
    pub field: String,

    /// Ordering direction.
    pub direction: Direction,
}

impl SortKey {
    /// Creates a new sort key.
    pub fn new<F: Into<String>>(field: F, direction: Direction) -> Self {
        Self { field: field.into(), direction }
    }
}

/// A fully-parsed list query.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryDescriptor {
    /// Conditions that records must all satisfy.  No two filters share the same field and
    /// operator.
    pub filters: Vec<Filter>,

    /// Fields to return.
    pub projection: Projection,

    /// Keys to order the results by, most significant first.
    pub sort: Vec<SortKey>,

    /// 1-based page number to return.
    pub page: u64,

    /// Maximum number of records per page.
    pub limit: u64,
}

/// Parses `value` as a strictly positive integer.
fn parse_positive(value: &str) -> Option<u64> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Some(n),
        _ => None,
    }
}

/// Splits a comma-separated list, dropping empty items.
fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

impl QueryDescriptor {
    /// Parses the raw query `params`, as they appear in the URL, into a descriptor.
    ///
    /// Parsing never fails: malformed pagination values fall back to their defaults and keys
    /// that do not name a valid field or operator are kept as filters that will match nothing.
    /// If a field and operator pair appears more than once, the last value wins.
    pub fn parse(params: &[(String, String)], opts: &QueryOptions) -> Self {
        let mut select = None;
        let mut sort = None;
        let mut page = None;
        let mut limit = None;
        let mut filters: Vec<Filter> = vec![];
        for (key, value) in params {
            match key.as_str() {
                "select" => select = Some(value.as_str()),
                "sort" => sort = Some(value.as_str()),
                "page" => page = Some(value.as_str()),
                "limit" => limit = Some(value.as_str()),
                key => {
                    let (field, op) = translate(key);
                    match filters.iter_mut().find(|f| f.field == field && f.op == op) {
                        Some(existing) => existing.value = value.clone(),
                        None => filters.push(Filter { field, op, value: value.clone() }),
                    }
                }
            }
        }

        let projection = {
            let mut included: Vec<String> = vec![];
            let mut excluded: Vec<String> = vec![];
            for item in select.map(split_list).into_iter().flatten() {
                let (fields, field) = match item.strip_prefix('-') {
                    Some(field) => (&mut excluded, field.trim()),
                    None => (&mut included, item),
                };
                if !field.is_empty() && !fields.iter().any(|f| f == field) {
                    fields.push(field.to_owned());
                }
            }
            // Exclusions only apply when no field is explicitly requested.
            if !included.is_empty() {
                Projection::Include(included)
            } else if !excluded.is_empty() {
                Projection::Exclude(excluded)
            } else {
                Projection::Default
            }
        };

        let sort = {
            let mut keys: Vec<SortKey> = vec![];
            for item in sort.map(split_list).into_iter().flatten() {
                let key = match item.strip_prefix('-') {
                    Some(field) => SortKey::new(field.trim(), Direction::Descending),
                    None => SortKey::new(item, Direction::Ascending),
                };
                if !key.field.is_empty() && !keys.iter().any(|k| k.field == key.field) {
                    keys.push(key);
                }
            }
            if keys.is_empty() {
                keys.push(SortKey::new(DEFAULT_SORT_FIELD, Direction::Descending));
            }
            keys
        };

        let max_limit = opts.max_limit.max(1);
        let page = page.and_then(parse_positive).unwrap_or(1);
        let limit =
            limit.and_then(parse_positive).unwrap_or(opts.default_limit.max(1)).min(max_limit);

        Self { filters, projection, sort, page, limit }
    }

    /// Forces the records to have `value` in `field`, replacing any equality filter that the
    /// client may have supplied for the same field.
    pub fn restrict<F: Into<String>, V: Into<String>>(&mut self, field: F, value: V) {
        let field = field.into();
        let value = value.into();
        match self.filters.iter_mut().find(|f| f.field == field && f.op == Operator::Eq) {
            Some(existing) => existing.value = value,
            None => self.filters.push(Filter { field, op: Operator::Eq, value }),
        }
    }
}
