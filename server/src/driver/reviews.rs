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

//! Operations on reviews and the ratings they contribute to their restaurant.

use crate::db;
use crate::driver::restaurants::restaurant_not_found;
use crate::driver::{Driver, check_owner_or_admin, not_found};
use crate::model::{AccessToken, Rating, RestaurantId, Review, ReviewId, ReviewText, Role};
use forkful_core::db::TxExecutor;
use forkful_core::driver::{DriverError, DriverResult};
use forkful_core::query::{Document, QueryDescriptor, ResultEnvelope, execute, run_query};
use serde::Deserialize;
#[cfg(test)]
use serde::Serialize;

/// Roles allowed to write reviews.
const REVIEWERS: &[Role] = &[Role::User, Role::Admin];

/// Contents of a new review.
#[derive(Default, Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub(crate) struct NewReview {
    /// Text of the review.
    pub(crate) review: Option<String>,

    /// Rating between 1 and 5.
    pub(crate) rating: Option<i64>,

    /// Identifier of the reviewed restaurant.  Ignored when the restaurant comes from the URL.
    pub(crate) restaurant: Option<String>,
}

/// Modifications to an existing review.  Absent fields are left untouched.
#[derive(Default, Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub(crate) struct ReviewPatch {
    /// New text of the review.
    pub(crate) review: Option<String>,

    /// New rating between 1 and 5.
    pub(crate) rating: Option<i64>,
}

/// Formats the message returned when the review `id` does not exist.
fn review_not_found(id: ReviewId) -> String {
    format!("A review with the id of '{}' is not found.", id)
}

/// Fetches the review `id`, making sure that it belongs to `restaurant` if one is given.
async fn fetch_review(
    tx: &mut TxExecutor,
    restaurant: Option<RestaurantId>,
    id: ReviewId,
) -> DriverResult<Review> {
    if let Some(restaurant) = restaurant {
        db::get_restaurant(tx.ex(), restaurant)
            .await
            .map_err(|e| not_found(e, restaurant_not_found(restaurant)))?;
    }

    let review =
        db::get_review(tx.ex(), id).await.map_err(|e| not_found(e, review_not_found(id)))?;

    match restaurant {
        Some(restaurant) if review.restaurant != restaurant => {
            Err(DriverError::InvalidInput(format!(
                "A review with the id of '{}' doesn't belong to this restaurant.",
                id
            )))
        }
        _ => Ok(review),
    }
}

impl Driver {
    /// Lists the reviews that match the raw query `params`, optionally limited to the reviews of
    /// one `restaurant`.
    pub(crate) async fn list_reviews(
        self,
        restaurant: Option<RestaurantId>,
        params: Vec<(String, String)>,
    ) -> DriverResult<ResultEnvelope<Document>> {
        let mut tx = self.db.begin().await?;

        let result = match restaurant {
            Some(id) => {
                db::get_restaurant(tx.ex(), id)
                    .await
                    .map_err(|e| not_found(e, restaurant_not_found(id)))?;
                let mut query = QueryDescriptor::parse(&params, &self.opts.query);
                query.restrict("restaurant", id.to_string());
                execute(tx.ex(), &db::REVIEWS, &query).await?
            }
            None => run_query(tx.ex(), &db::REVIEWS, &params, &self.opts.query).await?,
        };

        tx.commit().await?;
        Ok(result)
    }

    /// Gets the review identified by `id`, optionally scoped to the reviews of `restaurant`.
    pub(crate) async fn get_review(
        self,
        restaurant: Option<RestaurantId>,
        id: ReviewId,
    ) -> DriverResult<Review> {
        let mut tx = self.db.begin().await?;
        let review = fetch_review(&mut tx, restaurant, id).await?;
        tx.commit().await?;
        Ok(review)
    }

    /// Creates a new review by the caller and refreshes the ratings of the reviewed restaurant.
    ///
    /// The reviewed restaurant is `restaurant` if given, or else the one named in the request.
    pub(crate) async fn create_review(
        self,
        token: AccessToken,
        restaurant: Option<RestaurantId>,
        request: NewReview,
    ) -> DriverResult<Review> {
        let mut tx = self.db.begin().await?;
        let user = self.authorize(&mut tx, &token, REVIEWERS).await?;
        let now = self.clock.now_utc();

        let restaurant = match (restaurant, request.restaurant) {
            (Some(id), _) => id,
            (None, Some(raw)) if !raw.is_empty() => RestaurantId::parse(&raw)?,
            (None, _) => {
                return Err(DriverError::InvalidInput(
                    "Please provide a restaurant the review belongs to".to_owned(),
                ));
            }
        };
        db::get_restaurant(tx.ex(), restaurant)
            .await
            .map_err(|e| not_found(e, restaurant_not_found(restaurant)))?;

        let review = Review {
            id: ReviewId::generate(),
            review: ReviewText::new(request.review.unwrap_or_default())?,
            rating: Rating::new(request.rating.unwrap_or_default())?,
            created_at: now,
            restaurant,
            user: user.id(),
        };
        db::create_review(tx.ex(), &review).await?;
        db::update_restaurant_ratings(tx.ex(), restaurant).await?;

        tx.commit().await?;
        Ok(review)
    }

    /// Modifies the review identified by `id` with the values present in `patch` and refreshes
    /// the ratings of its restaurant.  The review must belong to `restaurant` if one is given.
    pub(crate) async fn update_review(
        self,
        token: AccessToken,
        restaurant: Option<RestaurantId>,
        id: ReviewId,
        patch: ReviewPatch,
    ) -> DriverResult<Review> {
        let mut tx = self.db.begin().await?;
        let user = self.authorize(&mut tx, &token, REVIEWERS).await?;

        let mut review = fetch_review(&mut tx, restaurant, id).await?;
        check_owner_or_admin(&user, review.user, "review")?;

        if let Some(text) = patch.review {
            review.review = ReviewText::new(text)?;
        }
        if let Some(rating) = patch.rating {
            review.rating = Rating::new(rating)?;
        }
        db::update_review(tx.ex(), &review).await?;
        db::update_restaurant_ratings(tx.ex(), review.restaurant).await?;

        tx.commit().await?;
        Ok(review)
    }

    /// Deletes the review identified by `id` and refreshes the ratings of its restaurant.  The
    /// review must belong to `restaurant` if one is given.
    pub(crate) async fn delete_review(
        self,
        token: AccessToken,
        restaurant: Option<RestaurantId>,
        id: ReviewId,
    ) -> DriverResult<Review> {
        let mut tx = self.db.begin().await?;
        let user = self.authorize(&mut tx, &token, REVIEWERS).await?;

        let review = fetch_review(&mut tx, restaurant, id).await?;
        check_owner_or_admin(&user, review.user, "review")?;

        db::delete_review(tx.ex(), id).await?;
        db::update_restaurant_ratings(tx.ex(), review.restaurant).await?;

        tx.commit().await?;
        Ok(review)
    }
}
