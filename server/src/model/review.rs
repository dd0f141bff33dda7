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

//! The `Review` data type.

use crate::model::{RestaurantId, ReviewId, UserId};
use forkful_core::model::{ModelError, ModelResult};
#[cfg(test)]
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

/// Minimum number of characters in the text of a review.
const MIN_REVIEW_LENGTH: usize = 5;

/// The text of a review.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
#[serde(transparent)]
pub(crate) struct ReviewText(String);

impl ReviewText {
    /// Creates the text of a review from an untrusted string, which is trimmed.
    pub(crate) fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into().trim().to_owned();
        if s.is_empty() {
            return Err(ModelError("Please add a review".to_owned()));
        }
        if s.chars().count() < MIN_REVIEW_LENGTH {
            return Err(ModelError(format!(
                "Review must be at least {} characters long",
                MIN_REVIEW_LENGTH
            )));
        }
        Ok(Self(s))
    }

    /// Returns a string view of the text.
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

/// A rating between 1 and 5, both included.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
#[serde(transparent)]
pub(crate) struct Rating(u8);

impl Rating {
    /// Creates a rating from an untrusted number.
    pub(crate) fn new(rating: i64) -> ModelResult<Self> {
        match u8::try_from(rating) {
            Ok(rating) if (1..=5).contains(&rating) => Ok(Self(rating)),
            _ => Err(ModelError("Please add a rating between 1 and 5".to_owned())),
        }
    }

    /// Returns the rating as a number.
    pub(crate) fn as_i64(&self) -> i64 {
        i64::from(self.0)
    }
}

/// Represents a review of a restaurant written by a user.
///
/// The names of the serialized fields match the field names accepted by list queries.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
#[serde(rename_all = "camelCase")]
pub(crate) struct Review {
    /// Unique identifier.
    pub(crate) id: ReviewId,

    /// Text of the review.
    pub(crate) review: ReviewText,

    /// Rating given to the restaurant.
    pub(crate) rating: Rating,

    /// When the review was written.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,

    /// The reviewed restaurant.
    pub(crate) restaurant: RestaurantId,

    /// The author of the review.
    pub(crate) user: UserId,
}
