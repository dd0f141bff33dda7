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

//! Operations on restaurants.

use crate::db;
use crate::driver::{Driver, check_owner_or_admin, not_found};
use crate::model::{AccessToken, Restaurant, RestaurantId, RestaurantPatch, Role};
use forkful_core::db::DbError;
use forkful_core::driver::{DriverError, DriverResult};
use forkful_core::query::{Document, ResultEnvelope, run_query};

/// Roles allowed to manage restaurants.
const MANAGERS: &[Role] = &[Role::Owner, Role::Admin];

/// Formats the message returned when the restaurant `id` does not exist.
pub(super) fn restaurant_not_found(id: RestaurantId) -> String {
    format!("A restaurant with the id of '{}' is not found.", id)
}

/// Converts the error raised when storing `restaurant` clashes with another one.
fn duplicate_name(e: DbError, restaurant: &Restaurant) -> DriverError {
    match e {
        DbError::AlreadyExists => DriverError::AlreadyExists(format!(
            "A restaurant named '{}' already exists in {}",
            restaurant.name, restaurant.suburb
        )),
        e => e.into(),
    }
}

impl Driver {
    /// Lists the restaurants that match the raw query `params`.
    pub(crate) async fn list_restaurants(
        self,
        params: Vec<(String, String)>,
    ) -> DriverResult<ResultEnvelope<Document>> {
        let mut tx = self.db.begin().await?;
        let result = run_query(tx.ex(), &db::RESTAURANTS, &params, &self.opts.query).await?;
        tx.commit().await?;
        Ok(result)
    }

    /// Gets the restaurant identified by `id`.
    pub(crate) async fn get_restaurant(self, id: RestaurantId) -> DriverResult<Restaurant> {
        let mut tx = self.db.begin().await?;
        let restaurant = db::get_restaurant(tx.ex(), id)
            .await
            .map_err(|e| not_found(e, restaurant_not_found(id)))?;
        tx.commit().await?;
        Ok(restaurant)
    }

    /// Creates a new restaurant owned by the caller.
    pub(crate) async fn create_restaurant(
        self,
        token: AccessToken,
        patch: RestaurantPatch,
    ) -> DriverResult<Restaurant> {
        let mut tx = self.db.begin().await?;
        let user = self.authorize(&mut tx, &token, MANAGERS).await?;
        let now = self.clock.now_utc();

        let restaurant = Restaurant::new(RestaurantId::generate(), user.id(), now, patch)?;
        db::create_restaurant(tx.ex(), &restaurant)
            .await
            .map_err(|e| duplicate_name(e, &restaurant))?;

        tx.commit().await?;
        Ok(restaurant)
    }

    /// Modifies the restaurant identified by `id` with the values present in `patch`.
    pub(crate) async fn update_restaurant(
        self,
        token: AccessToken,
        id: RestaurantId,
        patch: RestaurantPatch,
    ) -> DriverResult<Restaurant> {
        let mut tx = self.db.begin().await?;
        let user = self.authorize(&mut tx, &token, MANAGERS).await?;

        let restaurant = db::get_restaurant(tx.ex(), id)
            .await
            .map_err(|e| not_found(e, restaurant_not_found(id)))?;
        check_owner_or_admin(&user, restaurant.user, "restaurant")?;

        let restaurant = restaurant.apply(patch)?;
        db::update_restaurant(tx.ex(), &restaurant)
            .await
            .map_err(|e| duplicate_name(e, &restaurant))?;

        tx.commit().await?;
        Ok(restaurant)
    }

    /// Deletes the restaurant identified by `id` together with its reviews.
    pub(crate) async fn delete_restaurant(
        self,
        token: AccessToken,
        id: RestaurantId,
    ) -> DriverResult<Restaurant> {
        let mut tx = self.db.begin().await?;
        let user = self.authorize(&mut tx, &token, MANAGERS).await?;

        let restaurant = db::get_restaurant(tx.ex(), id)
            .await
            .map_err(|e| not_found(e, restaurant_not_found(id)))?;
        check_owner_or_admin(&user, restaurant.user, "restaurant")?;
        db::delete_restaurant(tx.ex(), id).await?;

        tx.commit().await?;
        Ok(restaurant)
    }
}
