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

//! Generic engine to answer list queries expressed as URL query strings.
//!
//! A list request carries its query in the URL, as in:
//!
//! ```text
//! ?cuisine=Thai&ratingsAverage[gte]=4&select=name,suburb&sort=-ratingsAverage,name&page=2&limit=10
//! ```
//!
//! The engine runs in four stages:
//!
//! 1.  `descriptor` parses the raw key/value pairs into a `QueryDescriptor`, removing the reserved
//!     `select`, `sort`, `page` and `limit` keys and keeping the rest as filters.
//! 1.  `operator` splits the bracketed suffix of a filter key into one of the allow-listed
//!     comparison operators.  Anything else stays part of the field name.
//! 1.  `executor` counts the records matched by the filters, fetches the requested page from a
//!     `Collection`, and computes the links to the neighboring pages.
//! 1.  `envelope` wraps all of the above into the `ResultEnvelope` returned to clients.
//!
//! `sql` provides the `Collection` implementation for database tables.

mod descriptor;
mod envelope;
mod executor;
mod operator;
mod sql;

pub use descriptor::{Direction, Filter, Projection, QueryDescriptor, QueryOptions, SortKey};
pub use envelope::{DataEnvelope, PageLink, Pagination, ResultEnvelope};
pub use executor::{Collection, Document, Find, execute, run_query};
pub use operator::Operator;
pub use sql::{Field, FieldKind, SqlCollection};
