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

//! The `Role` data type.

use forkful_core::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// Role of a user, which determines the operations the user can perform.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    /// Regular user that can write reviews.
    #[default]
    User,

    /// Staff of a restaurant.
    Staff,

    /// Owner of restaurants, who can list them.
    Owner,

    /// Administrator of the service with access to everything.
    Admin,
}

impl Role {
    /// Parses a role from its textual representation.
    pub(crate) fn parse(s: &str) -> ModelResult<Self> {
        match s {
            "user" => Ok(Role::User),
            "staff" => Ok(Role::Staff),
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            _ => Err(ModelError(format!("Invalid role '{}'", s))),
        }
    }

    /// Returns the textual representation of the role.
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Staff => "staff",
            Role::Owner => "owner",
            Role::Admin => "admin",
        }
    }
}
