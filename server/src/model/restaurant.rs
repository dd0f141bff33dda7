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

//! The `Restaurant` data type and the normalization of its textual fields.

use crate::model::{RestaurantId, UserId};
use convert_case::{Case, Casing};
use forkful_core::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Maximum length of a restaurant name, after normalization.
const MAX_NAME_LENGTH: usize = 30;

/// Average rating of a restaurant that has no reviews.
pub(crate) const DEFAULT_RATINGS_AVERAGE: f64 = 1.0;

/// Converts `s` to Title Case: words separated by single spaces, each starting with an
/// uppercase letter.  Word boundaries include delimiters and `camelCase` transitions.
pub(crate) fn start_case(s: &str) -> String {
    s.split_whitespace().collect::<Vec<&str>>().join(" ").to_case(Case::Title)
}

/// Converts `s` to lowercase except for its first character, which is uppercased.
pub(crate) fn capitalize(s: &str) -> String {
    s.trim().to_lowercase().to_case(Case::Sentence)
}

/// Derives a URL-friendly identifier from `s`.  Apostrophes are dropped so that possessives
/// stay in one piece.
pub(crate) fn slugify(s: &str) -> String {
    slug::slugify(s.replace('\'', ""))
}

/// Trims `value` and makes sure it is not empty, failing with `message` otherwise.
fn required(value: String, message: &str) -> ModelResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ModelError(message.to_owned()));
    }
    Ok(value.to_owned())
}

/// Trims `value` and turns empty strings into nothing.
fn optional(value: String) -> Option<String> {
    let value = value.trim();
    if value.is_empty() { None } else { Some(value.to_owned()) }
}

/// Client-supplied values for the writable fields of a restaurant.
///
/// When creating a restaurant, the name, address, suburb and cuisine must be present.  When
/// updating one, absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
#[cfg_attr(test, derive(Clone, Serialize))]
#[serde(rename_all = "camelCase")]
pub(crate) struct RestaurantPatch {
    /// Name of the restaurant.
    pub(crate) name: Option<String>,

    /// Free-form description.
    pub(crate) description: Option<String>,

    /// URL of the restaurant's website.
    pub(crate) website: Option<String>,

    /// Contact phone number.
    pub(crate) phone: Option<String>,

    /// Street address.
    pub(crate) address: Option<String>,

    /// Suburb where the restaurant is located.
    pub(crate) suburb: Option<String>,

    /// Type of food served.
    pub(crate) cuisine: Option<String>,

    /// Whether the restaurant delivers.
    pub(crate) delivery: Option<bool>,

    /// Whether the restaurant offers takeaway.
    pub(crate) takeaway: Option<bool>,

    /// Whether the restaurant only accepts cash.
    pub(crate) cash_only: Option<bool>,

    /// Whether the restaurant is wheelchair accessible.
    pub(crate) wheelchair_accessible: Option<bool>,
}

/// Represents a restaurant.
///
/// The names of the serialized fields match the field names accepted by list queries.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
#[serde(rename_all = "camelCase")]
pub(crate) struct Restaurant {
    /// Unique identifier.
    pub(crate) id: RestaurantId,

    /// Name in Start Case.
    pub(crate) name: String,

    /// URL-friendly version of the name.
    pub(crate) slug: String,

    /// Free-form description.
    pub(crate) description: Option<String>,

    /// URL of the restaurant's website.
    pub(crate) website: Option<String>,

    /// Contact phone number.
    pub(crate) phone: Option<String>,

    /// Street address.
    pub(crate) address: String,

    /// Suburb in Start Case.
    pub(crate) suburb: String,

    /// Capitalized type of food served.
    pub(crate) cuisine: String,

    /// Average of the ratings of all reviews, rounded to one decimal.
    pub(crate) ratings_average: f64,

    /// Number of reviews.
    pub(crate) ratings_quantity: i64,

    /// Whether the restaurant delivers.
    pub(crate) delivery: bool,

    /// Whether the restaurant offers takeaway.
    pub(crate) takeaway: bool,

    /// Whether the restaurant only accepts cash.
    pub(crate) cash_only: bool,

    /// Whether the restaurant is wheelchair accessible.
    pub(crate) wheelchair_accessible: bool,

    /// When the restaurant was created.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,

    /// The user that created the restaurant.
    pub(crate) user: UserId,
}

impl Restaurant {
    /// Creates a new restaurant owned by `user` from the values in `patch`, which must provide
    /// all required fields.
    pub(crate) fn new(
        id: RestaurantId,
        user: UserId,
        created_at: OffsetDateTime,
        patch: RestaurantPatch,
    ) -> ModelResult<Self> {
        required(patch.name.clone().unwrap_or_default(), "Please add a name")?;
        required(patch.address.clone().unwrap_or_default(), "Please add an address")?;
        required(
            patch.suburb.clone().unwrap_or_default(),
            "Please add a suburb where a restaurant is located",
        )?;
        required(patch.cuisine.clone().unwrap_or_default(), "Please add a cuisine")?;

        let restaurant = Self {
            id,
            name: String::new(),
            slug: String::new(),
            description: None,
            website: None,
            phone: None,
            address: String::new(),
            suburb: String::new(),
            cuisine: String::new(),
            ratings_average: DEFAULT_RATINGS_AVERAGE,
            ratings_quantity: 0,
            delivery: false,
            takeaway: false,
            cash_only: false,
            wheelchair_accessible: false,
            created_at,
            user,
        };
        restaurant.apply(patch)
    }

    /// Updates the restaurant with the values present in `patch`, normalizing them.
    pub(crate) fn apply(mut self, patch: RestaurantPatch) -> ModelResult<Self> {
        if let Some(name) = patch.name {
            let name = start_case(&required(name, "Please add a name")?);
            let slug = slugify(&name);
            if slug.is_empty() {
                return Err(ModelError("Please add a name".to_owned()));
            }
            if name.chars().count() > MAX_NAME_LENGTH {
                return Err(ModelError(format!(
                    "Name can not be longer than {} characters",
                    MAX_NAME_LENGTH
                )));
            }
            self.slug = slug;
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = optional(description);
        }
        if let Some(website) = patch.website {
            self.website = optional(website);
        }
        if let Some(phone) = patch.phone {
            self.phone = optional(phone);
        }
        if let Some(address) = patch.address {
            self.address = required(address, "Please add an address")?;
        }
        if let Some(suburb) = patch.suburb {
            let suburb = required(suburb, "Please add a suburb where a restaurant is located")?;
            self.suburb = start_case(&suburb.to_lowercase());
        }
        if let Some(cuisine) = patch.cuisine {
            self.cuisine = capitalize(&required(cuisine, "Please add a cuisine")?);
        }
        if let Some(delivery) = patch.delivery {
            self.delivery = delivery;
        }
        if let Some(takeaway) = patch.takeaway {
            self.takeaway = takeaway;
        }
        if let Some(cash_only) = patch.cash_only {
            self.cash_only = cash_only;
        }
        if let Some(wheelchair_accessible) = patch.wheelchair_accessible {
            self.wheelchair_accessible = wheelchair_accessible;
        }
        Ok(self)
    }
}
