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

//! Operations to sign up, log in and out, and manage one's own credentials.

use crate::db;
use crate::driver::Driver;
use crate::model::{AccessToken, Password, Role, Session, User, UserId};
use forkful_core::db::DbError;
use forkful_core::driver::{DriverError, DriverResult};
use forkful_core::model::EmailAddress;
use serde::Deserialize;
#[cfg(test)]
use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;

/// Details of a new account.
#[derive(Default, Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub(crate) struct NewUser {
    /// Display name of the user.
    pub(crate) name: Option<String>,

    /// Email address of the user, used to log in.
    pub(crate) email: Option<String>,

    /// Plain text password.
    pub(crate) password: Option<String>,

    /// Role to assign to the user.  Defaults to `user`.
    pub(crate) role: Option<String>,
}

/// Credentials to log in with.
#[derive(Default, Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub(crate) struct Credentials {
    /// Email address of the user.
    pub(crate) email: Option<String>,

    /// Plain text password of the user.
    pub(crate) password: Option<String>,
}

/// Request to replace the password of the authenticated user.
#[derive(Default, Deserialize)]
#[cfg_attr(test, derive(Serialize))]
#[serde(rename_all = "camelCase")]
pub(crate) struct PasswordChange {
    /// The password the user currently has.
    pub(crate) current_password: Option<String>,

    /// The desired password.
    pub(crate) new_password: Option<String>,

    /// Repetition of `new_password`.
    pub(crate) new_password_confirm: Option<String>,
}

/// Extracts a mandatory value from a request, failing with `message` if it is missing.
pub(super) fn required<T>(value: Option<T>, message: &str) -> DriverResult<T> {
    value.ok_or_else(|| DriverError::InvalidInput(message.to_owned()))
}

/// Error returned when an email address is already bound to an account.
pub(super) fn email_taken(e: DbError) -> DriverError {
    match e {
        DbError::AlreadyExists => {
            DriverError::AlreadyExists("Email address is already registered".to_owned())
        }
        e => e.into(),
    }
}

/// Validates the details of a new account and hashes its password.  Accounts of any role
/// can be built: callers must restrict who gets to be an administrator.
pub(super) fn build_user(request: NewUser, now: OffsetDateTime) -> DriverResult<User> {
    let email = EmailAddress::new(required(request.email, "Please add an email")?)?;
    let password = Password::new(required(request.password, "Please add a password")?)?;
    let role = match request.role {
        Some(role) => Role::parse(&role)?,
        None => Role::default(),
    };
    Ok(User::new(
        UserId::generate(),
        request.name.unwrap_or_default(),
        email,
        role,
        password.validate_and_hash()?,
        now,
    )?)
}

impl Driver {
    /// Creates a new account and logs it in.
    pub(crate) async fn signup(self, request: NewUser) -> DriverResult<Session> {
        let mut tx = self.db.begin().await?;
        let now = self.clock.now_utc();

        let user = build_user(request, now)?;
        if user.is_admin() {
            return Err(DriverError::InvalidInput(
                "Cannot sign up as an administrator".to_owned(),
            ));
        }
        db::create_user(tx.ex(), &user).await.map_err(email_taken)?;

        let session = Session::new(AccessToken::generate(), user.id(), now);
        db::put_session(tx.ex(), &session).await?;

        tx.commit().await?;
        Ok(session)
    }

    /// Logs a user in given its email address and password.
    pub(crate) async fn login(self, credentials: Credentials) -> DriverResult<Session> {
        let (email, password) = match (credentials.email, credentials.password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                (email, password)
            }
            _ => {
                return Err(DriverError::InvalidInput(
                    "Please provide an email and password".to_owned(),
                ));
            }
        };
        let incorrect = || DriverError::Unauthorized("Email or password is incorrect".to_owned());
        let email = EmailAddress::new(email).map_err(|_| incorrect())?;
        let password = Password::new(password).map_err(|_| incorrect())?;

        let mut tx = self.db.begin().await?;
        let now = self.clock.now_utc();

        let user = match db::get_user_by_email(tx.ex(), &email).await {
            Ok(user) => user,
            Err(DbError::NotFound) => return Err(incorrect()),
            Err(e) => return Err(e.into()),
        };
        if !password.verify(user.password())? {
            return Err(incorrect());
        }

        let session = Session::new(AccessToken::generate(), user.id(), now);
        db::put_session(tx.ex(), &session).await?;

        tx.commit().await?;
        Ok(session)
    }

    /// Terminates the session identified by `token`.
    pub(crate) async fn logout(self, token: AccessToken) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        let now = self.clock.now_utc();

        self.get_session(&mut tx, now, &token).await?;
        match db::delete_session(tx.ex(), &token, now).await {
            Ok(()) => (),
            Err(DbError::NotFound) => {
                return Err(DriverError::Unauthorized("Invalid session".to_owned()));
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        self.forget_session(&token).await;
        Ok(())
    }

    /// Returns the user that owns the session identified by `token`.
    pub(crate) async fn whoami(self, token: AccessToken) -> DriverResult<Arc<User>> {
        let mut tx = self.db.begin().await?;
        let now = self.clock.now_utc();

        let user = self.get_session(&mut tx, now, &token).await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Replaces the password of the user that owns the session identified by `token`.
    ///
    /// The session used to issue the change is terminated and a new one is returned.
    pub(crate) async fn update_password(
        self,
        token: AccessToken,
        request: PasswordChange,
    ) -> DriverResult<Session> {
        let mut tx = self.db.begin().await?;
        let now = self.clock.now_utc();

        let whoami = self.get_session(&mut tx, now, &token).await?;
        // The cached user may predate a previous password change.
        let user = db::get_user(tx.ex(), whoami.id()).await?;

        let current = Password::new(request.current_password.unwrap_or_default())?;
        if !current.verify(user.password())? {
            return Err(DriverError::Unauthorized(
                "Current password is incorrect. Please try again.".to_owned(),
            ));
        }

        let new_password = Password::new(required(request.new_password, "Please add a password")?)?;
        let confirm = Password::new(request.new_password_confirm.unwrap_or_default())?;
        if !new_password.matches(&confirm) {
            return Err(DriverError::InvalidInput("Please confirm new password again.".to_owned()));
        }

        let user = user.with_password(new_password.validate_and_hash()?);
        db::update_user(tx.ex(), &user).await?;

        db::delete_session(tx.ex(), &token, now).await?;
        let session = Session::new(AccessToken::generate(), user.id(), now);
        db::put_session(tx.ex(), &session).await?;

        tx.commit().await?;
        self.forget_session(&token).await;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DriverOptions;
    use crate::driver::testutils::*;

    fn signup_request(name: &str, role: Option<&str>) -> NewUser {
        NewUser {
            name: Some(name.to_owned()),
            email: Some(format!("{}@example.com", name)),
            password: Some("s3cret-password".to_owned()),
            role: role.map(str::to_owned),
        }
    }

    #[tokio::test]
    async fn test_signup_ok() {
        let context = TestContext::setup(DriverOptions::default()).await;

        let before = context.now();
        let session = context.driver().signup(signup_request("alice", None)).await.unwrap();
        let after = context.now();

        assert!(context.session_exists(session.access_token()).await);
        let user = db::get_user(&mut context.ex().await, session.user()).await.unwrap();
        assert_eq!("alice", user.name());
        assert_eq!("alice@example.com", user.email().as_str());
        assert_eq!(Role::User, user.role());
        assert!(user.created_at() > before && user.created_at() < after);
        assert!(Password::from("s3cret-password").verify(user.password()).unwrap());
    }

    #[tokio::test]
    async fn test_signup_with_role() {
        let context = TestContext::setup(DriverOptions::default()).await;

        let session =
            context.driver().signup(signup_request("owner", Some("owner"))).await.unwrap();

        let user = db::get_user(&mut context.ex().await, session.user()).await.unwrap();
        assert_eq!(Role::Owner, user.role());
    }

    #[tokio::test]
    async fn test_signup_admin_not_allowed() {
        let context = TestContext::setup(DriverOptions::default()).await;

        match context.driver().signup(signup_request("mallory", Some("admin"))).await {
            Err(DriverError::InvalidInput(msg)) => assert!(msg.contains("administrator")),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_signup_validation_errors() {
        let context = TestContext::setup(DriverOptions::default()).await;

        for (request, exp_error) in [
            (NewUser { email: None, ..signup_request("a", None) }, "Please add an email"),
            (NewUser { password: None, ..signup_request("a", None) }, "Please add a password"),
            (
                NewUser { password: Some("12345".to_owned()), ..signup_request("a", None) },
                "at least 6 characters",
            ),
            (NewUser { name: None, ..signup_request("a", None) }, "Please add a name"),
            (
                NewUser { role: Some("chef".to_owned()), ..signup_request("a", None) },
                "Invalid role",
            ),
        ] {
            match context.driver().signup(request).await {
                Err(DriverError::InvalidInput(msg)) => assert!(msg.contains(exp_error), "{}", msg),
                e => panic!("{:?}", e),
            }
        }
    }

    #[tokio::test]
    async fn test_signup_duplicate_email() {
        let context = TestContext::setup(DriverOptions::default()).await;

        context.driver().signup(signup_request("alice", None)).await.unwrap();
        match context.driver().signup(signup_request("alice", None)).await {
            Err(DriverError::AlreadyExists(msg)) => assert!(msg.contains("already registered")),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_login_ok() {
        let context = TestContext::setup(DriverOptions::default()).await;

        let user = context.create_user("alice", Role::User).await;
        let credentials = Credentials {
            email: Some("ALICE@example.com".to_owned()),
            password: Some(TEST_PASSWORD.to_owned()),
        };
        let session = context.driver().login(credentials).await.unwrap();

        assert_eq!(user.id(), session.user());
        assert!(context.session_exists(session.access_token()).await);
    }

    #[tokio::test]
    async fn test_login_missing_fields() {
        let context = TestContext::setup(DriverOptions::default()).await;

        let credentials = Credentials { email: Some("a@example.com".to_owned()), password: None };
        match context.driver().login(credentials).await {
            Err(DriverError::InvalidInput(msg)) => assert!(msg.contains("email and password")),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        let context = TestContext::setup(DriverOptions::default()).await;

        context.create_user("alice", Role::User).await;
        for (email, password) in
            [("alice@example.com", "wrong-password"), ("bob@example.com", TEST_PASSWORD)]
        {
            let credentials =
                Credentials { email: Some(email.to_owned()), password: Some(password.to_owned()) };
            match context.driver().login(credentials).await {
                Err(DriverError::Unauthorized(msg)) => assert!(msg.contains("incorrect")),
                e => panic!("{:?}", e),
            }
        }
    }

    #[tokio::test]
    async fn test_logout_ok() {
        let context = TestContext::setup(DriverOptions::default()).await;

        let (_user, token1) = context.create_logged_in_user("alice", Role::User).await;
        let session2 = context
            .driver()
            .login(Credentials {
                email: Some("alice@example.com".to_owned()),
                password: Some(TEST_PASSWORD.to_owned()),
            })
            .await
            .unwrap();

        context.driver().logout(token1.clone()).await.unwrap();
        assert!(!context.session_exists(&token1).await);
        assert!(context.session_exists(session2.access_token()).await);

        // The cache must not keep the terminated session alive.
        match context.driver().whoami(token1).await {
            Err(DriverError::Unauthorized(msg)) => assert!(msg.contains("Invalid session")),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_logout_invalid_session() {
        let context = TestContext::setup(DriverOptions::default()).await;

        match context.driver().logout(AccessToken::generate()).await {
            Err(DriverError::Unauthorized(msg)) => assert!(msg.contains("Invalid session")),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_whoami() {
        let context = TestContext::setup(DriverOptions::default()).await;

        let (user, token) = context.create_logged_in_user("alice", Role::Staff).await;
        assert_eq!(user, *context.driver().whoami(token).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_password_ok() {
        let context = TestContext::setup(DriverOptions::default()).await;

        let (user, token) = context.create_logged_in_user("alice", Role::User).await;
        let request = PasswordChange {
            current_password: Some(TEST_PASSWORD.to_owned()),
            new_password: Some("brand-new-password".to_owned()),
            new_password_confirm: Some("brand-new-password".to_owned()),
        };
        let session = context.driver().update_password(token.clone(), request).await.unwrap();

        assert!(!context.session_exists(&token).await);
        assert!(context.session_exists(session.access_token()).await);

        let user = db::get_user(&mut context.ex().await, user.id()).await.unwrap();
        assert!(Password::from("brand-new-password").verify(user.password()).unwrap());
        assert!(!Password::from(TEST_PASSWORD).verify(user.password()).unwrap());
    }

    #[tokio::test]
    async fn test_update_password_wrong_current() {
        let context = TestContext::setup(DriverOptions::default()).await;

        let (_user, token) = context.create_logged_in_user("alice", Role::User).await;
        let request = PasswordChange {
            current_password: Some("not-my-password".to_owned()),
            new_password: Some("brand-new-password".to_owned()),
            new_password_confirm: Some("brand-new-password".to_owned()),
        };
        match context.driver().update_password(token.clone(), request).await {
            Err(DriverError::Unauthorized(msg)) => assert!(msg.contains("Current password")),
            e => panic!("{:?}", e),
        }
        assert!(context.session_exists(&token).await);
    }

    #[tokio::test]
    async fn test_update_password_mismatch() {
        let context = TestContext::setup(DriverOptions::default()).await;

        let (_user, token) = context.create_logged_in_user("alice", Role::User).await;
        let request = PasswordChange {
            current_password: Some(TEST_PASSWORD.to_owned()),
            new_password: Some("brand-new-password".to_owned()),
            new_password_confirm: Some("other-new-password".to_owned()),
        };
        match context.driver().update_password(token, request).await {
            Err(DriverError::InvalidInput(msg)) => assert!(msg.contains("confirm")),
            e => panic!("{:?}", e),
        }
    }
}
