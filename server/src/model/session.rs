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

//! The `Session` data type.

use crate::model::{AccessToken, UserId};
use time::OffsetDateTime;

/// Represents a user session.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Session {
    /// The access token for the session, which acts as its identifier.
    access_token: AccessToken,

    /// The user that owns this session.
    user: UserId,

    /// Timestamp to represent when the session was initiated.
    login_time: OffsetDateTime,
}

impl Session {
    /// Creates a new session from its parts.
    pub(crate) fn new(access_token: AccessToken, user: UserId, login_time: OffsetDateTime) -> Self {
        Self { access_token, user, login_time }
    }

    /// Returns the session's access token.
    pub(crate) fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// Returns the identifier of the user that owns the session.
    pub(crate) fn user(&self) -> UserId {
        self.user
    }

    /// Returns the session's login time.
    pub(crate) fn login_time(&self) -> OffsetDateTime {
        self.login_time
    }

    /// Consumes the session and extracts its access token.
    pub(crate) fn take_access_token(self) -> AccessToken {
        self.access_token
    }
}
