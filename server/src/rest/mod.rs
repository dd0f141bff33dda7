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

//! REST interface for the restaurant reviews service.

use crate::driver::Driver;
use crate::model::AccessToken;
use axum::Router;
#[cfg(test)]
use serde::Deserialize;
use serde::Serialize;

mod auth_login_post;
mod auth_logout_post;
mod auth_me_get;
mod auth_password_patch;
mod auth_signup_post;
mod httputils;
mod restaurant_delete;
mod restaurant_get;
mod restaurant_patch;
mod restaurant_review_delete;
mod restaurant_review_get;
mod restaurant_review_patch;
mod restaurant_reviews_get;
mod restaurant_reviews_post;
mod restaurants_get;
mod restaurants_post;
mod review_delete;
mod review_get;
mod review_patch;
mod reviews_get;
mod reviews_post;
mod stats_cuisines_get;
#[cfg(test)]
mod testutils;
mod user_delete;
mod user_get;
mod user_patch;
mod users_get;
mod users_post;

/// Response returned by the APIs that open a new session.
#[derive(Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub(crate) struct TokenResponse {
    /// Always `success`.
    pub(crate) status: String,

    /// Access token of the new session, to be sent back as a bearer token.
    pub(crate) token: AccessToken,
}

impl TokenResponse {
    /// Wraps an access `token` for a successful response.
    fn new(token: AccessToken) -> Self {
        Self { status: "success".to_owned(), token }
    }
}

/// Creates the router for the application.
pub(crate) fn app(driver: Driver) -> Router {
    use axum::routing::{get, patch, post};

    let auth_router = Router::new()
        .route("/login", post(auth_login_post::handler))
        .route("/logout", post(auth_logout_post::handler))
        .route("/me", get(auth_me_get::handler))
        .route("/password", patch(auth_password_patch::handler))
        .route("/signup", post(auth_signup_post::handler));

    let restaurants_router = Router::new()
        .route("/", get(restaurants_get::handler).post(restaurants_post::handler))
        .route(
            "/:id",
            get(restaurant_get::handler)
                .patch(restaurant_patch::handler)
                .delete(restaurant_delete::handler),
        )
        .route(
            "/:id/reviews",
            get(restaurant_reviews_get::handler).post(restaurant_reviews_post::handler),
        )
        .route(
            "/:id/reviews/:review_id",
            get(restaurant_review_get::handler)
                .patch(restaurant_review_patch::handler)
                .delete(restaurant_review_delete::handler),
        );

    let reviews_router = Router::new()
        .route("/", get(reviews_get::handler).post(reviews_post::handler))
        .route(
            "/:id",
            get(review_get::handler).patch(review_patch::handler).delete(review_delete::handler),
        );

    let users_router = Router::new()
        .route("/", get(users_get::handler).post(users_post::handler))
        .route(
            "/:id",
            get(user_get::handler).patch(user_patch::handler).delete(user_delete::handler),
        );

    let api = Router::new()
        .nest("/auth", auth_router)
        .nest("/restaurants", restaurants_router)
        .nest("/reviews", reviews_router)
        .route("/stats/cuisines", get(stats_cuisines_get::handler))
        .nest("/users", users_router)
        .with_state(driver);

    Router::new().nest("/api/v1", api)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::NewUser;
    use crate::model::{Restaurant, RestaurantPatch, Review, Role};
    use axum::http::{Method, StatusCode};
    use forkful_core::query::{DataEnvelope, ResultEnvelope};
    use forkful_core::rest::testutils::*;
    use serde_json::{Value, json};
    use super::testutils::*;

    #[tokio::test]
    async fn test_e2e_review_flow() {
        let context = TestContext::setup().await;

        let request = NewUser {
            name: Some("Olivia".to_owned()),
            email: Some("olivia@example.com".to_owned()),
            password: Some("olivia-password".to_owned()),
            role: Some("owner".to_owned()),
        };
        let route = (Method::POST, format!("{}/auth/signup", API));
        let owner_token = OneShotBuilder::new(context.app(), route)
            .send_json(request)
            .await
            .expect_status(StatusCode::CREATED)
            .expect_json::<TokenResponse>()
            .await
            .token;

        let request = RestaurantPatch {
            name: Some("the green fork".to_owned()),
            address: Some("12 High Street".to_owned()),
            suburb: Some("north end".to_owned()),
            cuisine: Some("vegan".to_owned()),
            ..Default::default()
        };
        let route = (Method::POST, format!("{}/restaurants", API));
        let restaurant = OneShotBuilder::new(context.app(), route)
            .with_bearer_auth(owner_token.as_str())
            .send_json(request)
            .await
            .expect_status(StatusCode::CREATED)
            .expect_json::<DataEnvelope<Restaurant>>()
            .await
            .data;
        assert_eq!("The Green Fork", restaurant.name);
        assert_eq!("the-green-fork", restaurant.slug);

        let (_user, user_token) = context.create_logged_in_user("ruby", Role::User).await;
        let route = format!("{}/restaurants/{}/reviews", API, restaurant.id);
        for rating in [4, 5] {
            OneShotBuilder::new(context.app(), (Method::POST, &route))
                .with_bearer_auth(user_token.as_str())
                .send_json(json!({"review": "Fresh and tasty", "rating": rating}))
                .await
                .expect_status(StatusCode::CREATED)
                .expect_json::<DataEnvelope<Review>>()
                .await;
        }

        OneShotBuilder::new(context.app(), (Method::POST, &route))
            .with_bearer_auth(owner_token.as_str())
            .send_json(json!({"review": "Best place ever", "rating": 5}))
            .await
            .expect_status(StatusCode::FORBIDDEN)
            .expect_error("role owner is not allowed")
            .await;

        let reviews = OneShotBuilder::new(context.app(), (Method::GET, &route))
            .send_empty()
            .await
            .expect_json::<ResultEnvelope<Value>>()
            .await;
        assert_eq!(2, reviews.count);

        let restaurant = OneShotBuilder::new(
            context.app(),
            (Method::GET, format!("{}/restaurants/{}", API, restaurant.id)),
        )
        .send_empty()
        .await
        .expect_json::<DataEnvelope<Restaurant>>()
        .await
        .data;
        assert_eq!(4.5, restaurant.ratings_average);
        assert_eq!(2, restaurant.ratings_quantity);

        OneShotBuilder::new(context.app(), (Method::POST, format!("{}/auth/logout", API)))
            .with_bearer_auth(user_token.as_str())
            .send_empty()
            .await
            .expect_empty()
            .await;
        assert!(!context.session_exists(&user_token).await);

        OneShotBuilder::new(context.app(), (Method::POST, &route))
            .with_bearer_auth(user_token.as_str())
            .send_json(json!({"review": "Coming back for more", "rating": 5}))
            .await
            .expect_status(StatusCode::UNAUTHORIZED)
            .expect_header("WWW-Authenticate", "Bearer")
            .expect_error("Invalid session")
            .await;
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.into_app(), (Method::GET, format!("{}/menus", API)))
            .send_empty()
            .await
            .expect_status(StatusCode::NOT_FOUND)
            .expect_empty()
            .await;
    }
}
