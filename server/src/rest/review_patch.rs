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

//! API to modify an existing review.

use crate::driver::{Driver, ReviewPatch};
use crate::rest::httputils::{get_bearer_auth, review_id};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use forkful_core::query::DataEnvelope;
use forkful_core::rest::RestError;

/// PATCH handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ReviewPatch>,
) -> Result<impl IntoResponse, RestError> {
    let token = get_bearer_auth(&headers)?;
    let id = review_id(&id)?;
    let review = driver.update_review(token, None, id, request).await?;
    Ok(Json(DataEnvelope::new(review)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Review, ReviewId, Role};
    use crate::rest::testutils::*;
    use axum::http;
    use forkful_core::rest::testutils::OneShotBuilder;
    use forkful_core::test_payload_must_be_json;
    use serde_json::json;

    fn route(id: &str) -> (http::Method, String) {
        (http::Method::PATCH, format!("{}/reviews/{}", API, id))
    }

    #[tokio::test]
    async fn test_by_author() {
        let context = TestContext::setup().await;
        let owner = context.create_user("owner", Role::Owner).await;
        let (diner, token) = context.create_logged_in_user("diner", Role::User).await;
        let restaurant = context.create_restaurant(&owner, "First", "Carlton", "Thai").await;
        let review = context.create_review(&restaurant, &diner, 2).await;
        context.create_review(&restaurant, &diner, 3).await;

        let response = OneShotBuilder::new(context.app(), route(&review.id.to_string()))
            .with_bearer_auth(token.as_str())
            .send_json(json!({"rating": 5}))
            .await
            .expect_json::<DataEnvelope<Review>>()
            .await;
        assert_eq!(5, response.data.rating.as_i64());
        assert_eq!(review.review, response.data.review);

        let restaurant = context.get_restaurant(&restaurant).await.unwrap();
        assert_eq!(4.0, restaurant.ratings_average);
        assert_eq!(2, restaurant.ratings_quantity);
    }

    #[tokio::test]
    async fn test_by_other_user() {
        let context = TestContext::setup().await;
        let owner = context.create_user("owner", Role::Owner).await;
        let author = context.create_user("author", Role::User).await;
        let (_other, token) = context.create_logged_in_user("other", Role::User).await;
        let restaurant = context.create_restaurant(&owner, "First", "Carlton", "Thai").await;
        let review = context.create_review(&restaurant, &author, 2).await;

        OneShotBuilder::new(context.app(), route(&review.id.to_string()))
            .with_bearer_auth(token.as_str())
            .send_json(json!({"review": "Actually it was great"}))
            .await
            .expect_status(http::StatusCode::FORBIDDEN)
            .expect_error("not allowed to modify this review")
            .await;

        assert_eq!(Some(review.clone()), context.get_review(&review).await);
    }

    #[tokio::test]
    async fn test_invalid_rating() {
        let context = TestContext::setup().await;
        let owner = context.create_user("owner", Role::Owner).await;
        let (diner, token) = context.create_logged_in_user("diner", Role::User).await;
        let restaurant = context.create_restaurant(&owner, "First", "Carlton", "Thai").await;
        let review = context.create_review(&restaurant, &diner, 2).await;

        OneShotBuilder::new(context.into_app(), route(&review.id.to_string()))
            .with_bearer_auth(token.as_str())
            .send_json(json!({"rating": 0}))
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("rating between 1 and 5")
            .await;
    }

    #[tokio::test]
    async fn test_not_found() {
        let context = TestContext::setup().await;
        let (_diner, token) = context.create_logged_in_user("diner", Role::User).await;

        let id = ReviewId::generate();
        OneShotBuilder::new(context.into_app(), route(&id.to_string()))
            .with_bearer_auth(token.as_str())
            .send_json(json!({"rating": 3}))
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error(&format!("A review with the id of '{}' is not found", id))
            .await;
    }

    test_payload_must_be_json!(
        TestContext::setup().await.into_app(),
        route(&ReviewId::generate().to_string())
    );
}
