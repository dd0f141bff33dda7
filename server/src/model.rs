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

//! High-level data types of the restaurant reviews service.

mod accesstoken;
pub(crate) use accesstoken::AccessToken;
mod ids;
pub(crate) use ids::{RestaurantId, ReviewId, UserId};
mod passwords;
pub(crate) use passwords::{HashedPassword, Password};
mod restaurant;
pub(crate) use restaurant::{Restaurant, RestaurantPatch};
mod review;
pub(crate) use review::{Rating, Review, ReviewText};
mod role;
pub(crate) use role::Role;
mod session;
pub(crate) use session::Session;
mod stats;
pub(crate) use stats::{CuisineStats, RatingsSummary};
mod user;
pub(crate) use user::User;
