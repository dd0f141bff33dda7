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

//! API to get a single review of one restaurant.

use crate::driver::Driver;
use crate::rest::httputils::{restaurant_id, review_id};
use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use forkful_core::query::DataEnvelope;
use forkful_core::rest::{EmptyBody, RestError};

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path((id, review)): Path<(String, String)>,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    let id = restaurant_id(&id)?;
    let review = review_id(&review)?;
    let review = driver.get_review(Some(id), review).await?;
    Ok(Json(DataEnvelope::new(review)))
}
