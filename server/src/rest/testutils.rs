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

//! Test utilities for the REST API.

use crate::driver::testutils::{self as driver_testutils, opts_no_session_caching};
use crate::model::{AccessToken, Restaurant, Review, Role, User};
use crate::rest::app;
use axum::Router;

/// Prefix of all API routes.
pub(crate) const API: &str = "/api/v1";

/// State of a running test.
pub(crate) struct TestContext {
    /// Driver-level test context backing the app.
    inner: driver_testutils::TestContext,

    /// The app under test.
    app: Router,
}

impl TestContext {
    /// Initializes the app using an in-memory database and no session caching, so that tests can
    /// tamper with sessions directly in the database.
    pub(crate) async fn setup() -> Self {
        let inner = driver_testutils::TestContext::setup(opts_no_session_caching()).await;
        let app = app(inner.driver());
        Self { inner, app }
    }

    /// Gets a clone of the app router.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and transforms it into the app router.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Creates a user called `name` with `role` directly in the database.
    pub(crate) async fn create_user(&self, name: &str, role: Role) -> User {
        self.inner.create_user(name, role).await
    }

    /// Creates a user called `name` with `role` and logs it in.
    pub(crate) async fn create_logged_in_user(
        &self,
        name: &str,
        role: Role,
    ) -> (User, AccessToken) {
        self.inner.create_logged_in_user(name, role).await
    }

    /// Creates a restaurant called `name` owned by `owner` directly in the database.
    pub(crate) async fn create_restaurant(
        &self,
        owner: &User,
        name: &str,
        suburb: &str,
        cuisine: &str,
    ) -> Restaurant {
        self.inner.create_restaurant(owner, name, suburb, cuisine).await
    }

    /// Creates a review of `restaurant` by `user` directly in the database.
    pub(crate) async fn create_review(
        &self,
        restaurant: &Restaurant,
        user: &User,
        rating: i64,
    ) -> Review {
        self.inner.create_review(restaurant, user, rating).await
    }

    /// Fetches the current state of `restaurant` from the database, if it still exists.
    pub(crate) async fn get_restaurant(&self, restaurant: &Restaurant) -> Option<Restaurant> {
        match crate::db::get_restaurant(&mut self.inner.ex().await, restaurant.id).await {
            Ok(restaurant) => Some(restaurant),
            Err(forkful_core::db::DbError::NotFound) => None,
            Err(e) => panic!("{:?}", e),
        }
    }

    /// Fetches the current state of `review` from the database, if it still exists.
    pub(crate) async fn get_review(&self, review: &Review) -> Option<Review> {
        match crate::db::get_review(&mut self.inner.ex().await, review.id).await {
            Ok(review) => Some(review),
            Err(forkful_core::db::DbError::NotFound) => None,
            Err(e) => panic!("{:?}", e),
        }
    }

    /// Fetches the current state of `user` from the database, if it still exists.
    pub(crate) async fn get_user(&self, user: &User) -> Option<User> {
        match crate::db::get_user(&mut self.inner.ex().await, user.id()).await {
            Ok(user) => Some(user),
            Err(forkful_core::db::DbError::NotFound) => None,
            Err(e) => panic!("{:?}", e),
        }
    }

    /// Checks if the session with `token` is still active by directly querying the database.
    pub(crate) async fn session_exists(&self, token: &AccessToken) -> bool {
        self.inner.session_exists(token).await
    }
}
