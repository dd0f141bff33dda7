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

//! The `User` data type.

use crate::model::{HashedPassword, Role, UserId};
use forkful_core::model::{EmailAddress, ModelError, ModelResult};
use serde::Serialize;
use time::OffsetDateTime;

/// Maximum length of a user's display name.
const MAX_NAME_LENGTH: usize = 64;

/// Represents a user account.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct User {
    /// Unique identifier of the user.
    id: UserId,

    /// Display name of the user.
    name: String,

    /// Email address of the user, which is unique across accounts and serves as the login.
    email: EmailAddress,

    /// Role of the user.
    role: Role,

    /// Hash of the user's password.
    #[serde(skip)]
    password: HashedPassword,

    /// When the account was created.
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl User {
    /// Creates a new user from its parts, validating the untrusted `name`.
    pub(crate) fn new<S: Into<String>>(
        id: UserId,
        name: S,
        email: EmailAddress,
        role: Role,
        password: HashedPassword,
        created_at: OffsetDateTime,
    ) -> ModelResult<Self> {
        let name = Self::validate_name(name)?;
        Ok(Self { id, name, email, role, password, created_at })
    }

    /// Trims and validates a user's display `name`.
    fn validate_name<S: Into<String>>(name: S) -> ModelResult<String> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(ModelError("Please add a name".to_owned()));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(ModelError(format!(
                "Name can not be longer than {} characters",
                MAX_NAME_LENGTH
            )));
        }
        Ok(name)
    }

    /// Replaces the user's display name.
    pub(crate) fn with_name<S: Into<String>>(mut self, name: S) -> ModelResult<Self> {
        self.name = Self::validate_name(name)?;
        Ok(self)
    }

    /// Replaces the user's email address.
    pub(crate) fn with_email(mut self, email: EmailAddress) -> Self {
        self.email = email;
        self
    }

    /// Replaces the user's role.
    pub(crate) fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Replaces the user's password hash.
    pub(crate) fn with_password(mut self, password: HashedPassword) -> Self {
        self.password = password;
        self
    }

    /// Returns the user's identifier.
    pub(crate) fn id(&self) -> UserId {
        self.id
    }

    /// Returns the user's display name.
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Returns the user's email address.
    pub(crate) fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Returns the user's role.
    pub(crate) fn role(&self) -> Role {
        self.role
    }

    /// Returns the user's password hash.
    pub(crate) fn password(&self) -> &HashedPassword {
        &self.password
    }

    /// Returns when the user account was created.
    pub(crate) fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Returns true if the user has the administrator role.
    pub(crate) fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forkful_core::clocks::testutils::utc_datetime;
    use serde_json::json;
    use uuid::Uuid;

    fn test_user() -> User {
        User::new(
            UserId::from(Uuid::from_u128(5)),
            "  Jane Doe ",
            EmailAddress::from("jane@example.com"),
            Role::Owner,
            HashedPassword::new("the-hash"),
            utc_datetime(2023, 1, 2, 3, 4, 5),
        )
        .unwrap()
    }

    #[test]
    fn test_user_new_ok() {
        let user = test_user();
        assert_eq!("Jane Doe", user.name());
        assert_eq!(Role::Owner, user.role());
        assert!(!user.is_admin());
        assert_eq!("the-hash", user.password().as_str());
    }

    #[test]
    fn test_user_bad_name() {
        let user = test_user();
        assert_eq!(
            ModelError("Please add a name".to_owned()),
            user.clone().with_name("   ").unwrap_err()
        );
        assert!(user.with_name("x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_user_modifiers() {
        let user = test_user()
            .with_name("John")
            .unwrap()
            .with_email(EmailAddress::from("john@example.com"))
            .with_role(Role::Admin)
            .with_password(HashedPassword::new("other"));
        assert_eq!("John", user.name());
        assert_eq!("john@example.com", user.email().as_str());
        assert!(user.is_admin());
        assert_eq!("other", user.password().as_str());
    }

    #[test]
    fn test_user_serialize_hides_password() {
        assert_eq!(
            json!({
                "id": "00000000-0000-0000-0000-000000000005",
                "name": "Jane Doe",
                "email": "jane@example.com",
                "role": "owner",
                "createdAt": "2023-01-02T03:04:05Z",
            }),
            serde_json::to_value(test_user()).unwrap()
        );
    }
}
