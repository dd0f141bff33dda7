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

//! Response shapes shared by all APIs.

use serde::{Deserialize, Serialize};

/// Value of the `status` field in successful responses.
const SUCCESS: &str = "success";

/// Location of a page of results.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct PageLink {
    /// 1-based page number.
    pub page: u64,

    /// Page size used to compute the page number.
    pub limit: u64,
}

/// Links to the pages around the returned one.  Absent links are omitted from the response.
#[derive(Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Pagination {
    /// The previous page, if the returned page is not the first one.
    #[serde(rename = "prev", default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<PageLink>,

    /// The next page, if there are more records after the returned page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
}

impl Pagination {
    /// Computes the links around `page` given the page size `limit` and the `total` number of
    /// records matched by the query.
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let skip = page.saturating_sub(1).saturating_mul(limit);
        let end = page.saturating_mul(limit);

        let previous = if skip > 0 { Some(PageLink { page: page - 1, limit }) } else { None };
        let next = if end < total { Some(PageLink { page: page + 1, limit }) } else { None };
        Self { previous, next }
    }
}

/// Response to a list query.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct ResultEnvelope<T> {
    /// Always `success`.
    pub status: String,

    /// Number of records in `data`.  This is the size of the page, not the total number of
    /// matching records.
    pub count: usize,

    /// Links to the neighboring pages.
    pub pagination: Pagination,

    /// The records in the page.
    pub data: Vec<T>,
}

impl<T> ResultEnvelope<T> {
    /// Wraps the records of a page and its `pagination` links.
    pub fn new(data: Vec<T>, pagination: Pagination) -> Self {
        Self { status: SUCCESS.to_owned(), count: data.len(), pagination, data }
    }

    /// Transforms the records in the page with `f`, keeping the rest of the envelope intact.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> ResultEnvelope<U> {
        ResultEnvelope {
            status: self.status,
            count: self.count,
            pagination: self.pagination,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}

/// Response carrying a single record.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct DataEnvelope<T> {
    /// Always `success`.
    pub status: String,

    /// The record.
    pub data: T,
}

impl<T> DataEnvelope<T> {
    /// Wraps a single record.
    pub fn new(data: T) -> Self {
        Self { status: SUCCESS.to_owned(), data }
    }
}
