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

//! API to get rating statistics per cuisine.

use crate::driver::Driver;
use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use forkful_core::query::DataEnvelope;
use forkful_core::rest::{EmptyBody, RestError};

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    let stats = driver.cuisine_stats().await?;
    Ok(Json(DataEnvelope::new(stats)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CuisineStats, Role};
    use crate::rest::testutils::*;
    use axum::http;
    use forkful_core::rest::testutils::OneShotBuilder;
    use forkful_core::test_payload_must_be_empty;
    use serde_json::Value;

    fn route() -> (http::Method, String) {
        (http::Method::GET, format!("{}/stats/cuisines", API))
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;
        let owner = context.create_user("owner", Role::Owner).await;
        let diner = context.create_user("diner", Role::User).await;
        let pizza = context.create_restaurant(&owner, "Pizza One", "Carlton", "Italian").await;
        context.create_restaurant(&owner, "Pizza Two", "Carlton", "Italian").await;
        let curry = context.create_restaurant(&owner, "Curry Club", "Carlton", "Indian").await;
        context.create_review(&pizza, &diner, 4).await;
        context.create_review(&curry, &diner, 5).await;
        context.create_review(&curry, &diner, 4).await;

        let response = OneShotBuilder::new(context.into_app(), route())
            .send_empty()
            .await
            .expect_json::<DataEnvelope<Vec<CuisineStats>>>()
            .await;
        assert_eq!(
            vec![
                CuisineStats::new("Indian".to_owned(), 1, 4.5, 4.5, 4.5, 2),
                CuisineStats::new("Italian".to_owned(), 2, 2.5, 1.0, 4.0, 1),
            ],
            response.data
        );
    }

    #[tokio::test]
    async fn test_empty() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(context.into_app(), route())
            .send_empty()
            .await
            .expect_json::<Value>()
            .await;
        assert_eq!(serde_json::json!({"status": "success", "data": []}), response);
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route());
}
