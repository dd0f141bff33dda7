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

//! API to delete a review of one restaurant.

use crate::driver::Driver;
use crate::rest::httputils::{get_bearer_auth, restaurant_id, review_id};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use forkful_core::query::DataEnvelope;
use forkful_core::rest::{EmptyBody, RestError};

/// DELETE handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path((id, review)): Path<(String, String)>,
    headers: HeaderMap,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    let token = get_bearer_auth(&headers)?;
    let id = restaurant_id(&id)?;
    let review = review_id(&review)?;
    let review = driver.delete_review(token, Some(id), review).await?;
    Ok(Json(DataEnvelope::new(review)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RestaurantId, Review, ReviewId, Role};
    use crate::rest::testutils::*;
    use axum::http;
    use forkful_core::rest::testutils::OneShotBuilder;
    use forkful_core::test_payload_must_be_empty;

    fn route(id: &str, review: &str) -> (http::Method, String) {
        (http::Method::DELETE, format!("{}/restaurants/{}/reviews/{}", API, id, review))
    }

    #[tokio::test]
    async fn test_by_author() {
        let context = TestContext::setup().await;
        let owner = context.create_user("owner", Role::Owner).await;
        let (diner, token) = context.create_logged_in_user("diner", Role::User).await;
        let restaurant = context.create_restaurant(&owner, "First", "Carlton", "Thai").await;
        let review = context.create_review(&restaurant, &diner, 2).await;

        let response = OneShotBuilder::new(
            context.app(),
            route(&restaurant.id.to_string(), &review.id.to_string()),
        )
        .with_bearer_auth(token.as_str())
        .send_empty()
        .await
        .expect_json::<DataEnvelope<Review>>()
        .await;
        assert_eq!(review, response.data);
        assert!(context.get_review(&review).await.is_none());
    }

    #[tokio::test]
    async fn test_review_of_other_restaurant() {
        let context = TestContext::setup().await;
        let owner = context.create_user("owner", Role::Owner).await;
        let (_admin, token) = context.create_logged_in_user("admin", Role::Admin).await;
        let diner = context.create_user("diner", Role::User).await;
        let restaurant1 = context.create_restaurant(&owner, "First", "Carlton", "Thai").await;
        let restaurant2 = context.create_restaurant(&owner, "Second", "Carlton", "Thai").await;
        let review = context.create_review(&restaurant1, &diner, 2).await;

        OneShotBuilder::new(
            context.app(),
            route(&restaurant2.id.to_string(), &review.id.to_string()),
        )
        .with_bearer_auth(token.as_str())
        .send_empty()
        .await
        .expect_status(http::StatusCode::BAD_REQUEST)
        .expect_error("doesn't belong to this restaurant")
        .await;

        assert!(context.get_review(&review).await.is_some());
    }

    #[tokio::test]
    async fn test_not_logged_in() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(
            context.into_app(),
            route(&RestaurantId::generate().to_string(), &ReviewId::generate().to_string()),
        )
        .send_empty()
        .await
        .expect_status(http::StatusCode::UNAUTHORIZED)
        .expect_error("Please log in to get access")
        .await;
    }

    test_payload_must_be_empty!(
        TestContext::setup().await.into_app(),
        route(&RestaurantId::generate().to_string(), &ReviewId::generate().to_string())
    );
}
