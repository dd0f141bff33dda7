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

//! Aggregated ratings.

use crate::model::restaurant::DEFAULT_RATINGS_AVERAGE;
use serde::Serialize;

/// Rounds `value` to one decimal.
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Summary of the ratings of the reviews of a restaurant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct RatingsSummary {
    /// Average rating, rounded to one decimal.
    pub(crate) average: f64,

    /// Number of reviews.
    pub(crate) quantity: i64,
}

impl RatingsSummary {
    /// Builds a summary from the raw aggregates over the reviews of a restaurant.  The `average`
    /// is missing when there are no reviews.
    pub(crate) fn new(quantity: i64, average: Option<f64>) -> Self {
        match average {
            Some(average) if quantity > 0 => {
                Self { average: round_one_decimal(average), quantity }
            }
            _ => Self { average: DEFAULT_RATINGS_AVERAGE, quantity: 0 },
        }
    }
}

/// Statistics about the restaurants that serve a specific cuisine.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
pub(crate) struct CuisineStats {
    /// Name of the cuisine.
    pub(crate) cuisine: String,

    /// Number of restaurants that serve the cuisine.
    pub(crate) restaurants: i64,

    /// Average of the average ratings of the restaurants, rounded to one decimal.
    pub(crate) avg_rating: f64,

    /// Lowest average rating among the restaurants.
    pub(crate) min_rating: f64,

    /// Highest average rating among the restaurants.
    pub(crate) max_rating: f64,

    /// Total number of reviews across the restaurants.
    pub(crate) ratings_quantity: i64,
}

impl CuisineStats {
    /// Builds the statistics for a cuisine from raw aggregates.
    pub(crate) fn new(
        cuisine: String,
        restaurants: i64,
        avg_rating: f64,
        min_rating: f64,
        max_rating: f64,
        ratings_quantity: i64,
    ) -> Self {
        Self {
            cuisine,
            restaurants,
            avg_rating: round_one_decimal(avg_rating),
            min_rating,
            max_rating,
            ratings_quantity,
        }
    }
}
