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

//! Test utilities for the business logic.

use crate::db;
use crate::driver::{Credentials, Driver, DriverOptions};
use crate::model::{
    AccessToken, Password, Rating, Restaurant, RestaurantId, RestaurantPatch, Review, ReviewId,
    ReviewText, Role, User, UserId,
};
use forkful_core::clocks::Clock;
use forkful_core::clocks::testutils::{MonotonicClock, utc_datetime};
use forkful_core::db::{Db, Executor};
use forkful_core::model::EmailAddress;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

/// Password given to all users created by the test utilities.
pub(crate) const TEST_PASSWORD: &str = "test0password";

/// Returns a set of options to disable session caching.
pub(crate) fn opts_no_session_caching() -> DriverOptions {
    DriverOptions { sessions_cache_ttl: Duration::ZERO, ..Default::default() }
}

/// Builds a user called `name` with `role` that only lives in memory.
pub(crate) fn test_user(name: &str, role: Role) -> User {
    User::new(
        UserId::generate(),
        name,
        EmailAddress::new(format!("{}@example.com", name)).unwrap(),
        role,
        Password::from(TEST_PASSWORD).validate_and_hash().unwrap(),
        utc_datetime(2023, 1, 1, 0, 0, 0),
    )
    .unwrap()
}

/// State of a running test.
pub(crate) struct TestContext {
    /// The clock used by the driver.
    clock: Arc<MonotonicClock>,

    /// The database used by the driver.
    db: Arc<dyn Db + Send + Sync>,

    /// The driver under test.
    driver: Driver,
}

impl TestContext {
    /// Initializes the driver using an in-memory database and a monotonic clock.
    pub(crate) async fn setup(opts: DriverOptions) -> Self {
        let db: Arc<dyn Db + Send + Sync> =
            Arc::from(forkful_core::db::sqlite::testutils::setup().await);
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let clock = Arc::from(MonotonicClock::new(1_700_000_000));
        let driver = Driver::new(db.clone(), clock.clone(), opts);
        Self { clock, db, driver }
    }

    /// Gets access to the database used by this test context.
    pub(crate) fn db(&self) -> &dyn Db {
        self.db.as_ref()
    }

    /// Gets a direct executor against the database.
    pub(crate) async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    /// Gets a copy of the driver in this test context.
    pub(crate) fn driver(&self) -> Driver {
        self.driver.clone()
    }

    /// Queries the clock of the driver.
    pub(crate) fn now(&self) -> OffsetDateTime {
        self.clock.now_utc()
    }

    /// Queries the clock of the driver and shifts the result by `secs`.
    pub(crate) fn now_delta(&self, secs: i64) -> OffsetDateTime {
        self.clock.now_utc() + time::Duration::seconds(secs)
    }

    /// Creates a user called `name` with `role` directly in the database.
    pub(crate) async fn create_user(&self, name: &str, role: Role) -> User {
        let user = test_user(name, role);
        db::create_user(&mut self.ex().await, &user).await.unwrap();
        user
    }

    /// Creates a user called `name` with `role` and logs it in.
    pub(crate) async fn create_logged_in_user(
        &self,
        name: &str,
        role: Role,
    ) -> (User, AccessToken) {
        let user = self.create_user(name, role).await;
        let session = self
            .driver()
            .login(Credentials {
                email: Some(user.email().as_str().to_owned()),
                password: Some(TEST_PASSWORD.to_owned()),
            })
            .await
            .unwrap();
        (user, session.take_access_token())
    }

    /// Creates a restaurant called `name` owned by `owner` directly in the database.
    pub(crate) async fn create_restaurant(
        &self,
        owner: &User,
        name: &str,
        suburb: &str,
        cuisine: &str,
    ) -> Restaurant {
        let restaurant = Restaurant::new(
            RestaurantId::generate(),
            owner.id(),
            self.now(),
            RestaurantPatch {
                name: Some(name.to_owned()),
                address: Some("1 Main Street".to_owned()),
                suburb: Some(suburb.to_owned()),
                cuisine: Some(cuisine.to_owned()),
                ..Default::default()
            },
        )
        .unwrap();
        db::create_restaurant(&mut self.ex().await, &restaurant).await.unwrap();
        restaurant
    }

    /// Creates a review of `restaurant` written by `user` directly in the database and refreshes
    /// the ratings of the restaurant.
    pub(crate) async fn create_review(
        &self,
        restaurant: &Restaurant,
        user: &User,
        rating: i64,
    ) -> Review {
        let review = Review {
            id: ReviewId::generate(),
            review: ReviewText::new(format!("Worth {} stars", rating)).unwrap(),
            rating: Rating::new(rating).unwrap(),
            created_at: self.now(),
            restaurant: restaurant.id,
            user: user.id(),
        };
        let mut ex = self.ex().await;
        db::create_review(&mut ex, &review).await.unwrap();
        db::update_restaurant_ratings(&mut ex, restaurant.id).await.unwrap();
        review
    }

    /// Checks if the session with `token` is still active by directly querying the database.
    pub(crate) async fn session_exists(&self, token: &AccessToken) -> bool {
        match db::get_session(&mut self.ex().await, token).await {
            Ok(_) => true,
            Err(forkful_core::db::DbError::NotFound) => false,
            Err(e) => panic!("{:?}", e),
        }
    }
}
