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

//! Administration of user accounts.

use crate::db;
use crate::driver::auth::{build_user, email_taken};
use crate::driver::{Driver, NewUser, not_found};
use crate::model::{AccessToken, Role, User, UserId};
use forkful_core::driver::DriverResult;
use forkful_core::model::EmailAddress;
use forkful_core::query::{Document, ResultEnvelope, run_query};
use serde::Deserialize;
#[cfg(test)]
use serde::Serialize;

/// Roles allowed to administer accounts.
const ADMINS: &[Role] = &[Role::Admin];

/// Modifications to an existing account.  Absent fields are left untouched.
#[derive(Default, Deserialize)]
#[cfg_attr(test, derive(Serialize))]
pub(crate) struct UserPatch {
    /// New display name.
    pub(crate) name: Option<String>,

    /// New email address.
    pub(crate) email: Option<String>,

    /// New role.
    pub(crate) role: Option<String>,
}

/// Formats the message returned when the user `id` does not exist.
fn user_not_found(id: UserId) -> String {
    format!("A user with the id of '{}' is not found.", id)
}

impl Driver {
    /// Lists the users that match the raw query `params`.
    pub(crate) async fn list_users(
        self,
        token: AccessToken,
        params: Vec<(String, String)>,
    ) -> DriverResult<ResultEnvelope<Document>> {
        let mut tx = self.db.begin().await?;
        self.authorize(&mut tx, &token, ADMINS).await?;

        let result = run_query(tx.ex(), &db::USERS, &params, &self.opts.query).await?;

        tx.commit().await?;
        Ok(result)
    }

    /// Gets the user identified by `id`.
    pub(crate) async fn get_user(self, token: AccessToken, id: UserId) -> DriverResult<User> {
        let mut tx = self.db.begin().await?;
        self.authorize(&mut tx, &token, ADMINS).await?;

        let user =
            db::get_user(tx.ex(), id).await.map_err(|e| not_found(e, user_not_found(id)))?;

        tx.commit().await?;
        Ok(user)
    }

    /// Creates a new account of any role.
    pub(crate) async fn create_user(
        self,
        token: AccessToken,
        request: NewUser,
    ) -> DriverResult<User> {
        let mut tx = self.db.begin().await?;
        self.authorize(&mut tx, &token, ADMINS).await?;
        let now = self.clock.now_utc();

        let user = build_user(request, now)?;
        db::create_user(tx.ex(), &user).await.map_err(email_taken)?;

        tx.commit().await?;
        Ok(user)
    }

    /// Modifies the user identified by `id` with the values present in `patch`.
    pub(crate) async fn update_user(
        self,
        token: AccessToken,
        id: UserId,
        patch: UserPatch,
    ) -> DriverResult<User> {
        let mut tx = self.db.begin().await?;
        self.authorize(&mut tx, &token, ADMINS).await?;

        let mut user =
            db::get_user(tx.ex(), id).await.map_err(|e| not_found(e, user_not_found(id)))?;
        if let Some(name) = patch.name {
            user = user.with_name(name)?;
        }
        if let Some(email) = patch.email {
            user = user.with_email(EmailAddress::new(email)?);
        }
        if let Some(role) = patch.role {
            user = user.with_role(Role::parse(&role)?);
        }
        db::update_user(tx.ex(), &user).await.map_err(email_taken)?;

        tx.commit().await?;
        Ok(user)
    }

    /// Deletes the user identified by `id` and terminates all of its sessions.  The
    /// restaurants and reviews the user created are kept.
    pub(crate) async fn delete_user(self, token: AccessToken, id: UserId) -> DriverResult<User> {
        let mut tx = self.db.begin().await?;
        self.authorize(&mut tx, &token, ADMINS).await?;

        let user =
            db::get_user(tx.ex(), id).await.map_err(|e| not_found(e, user_not_found(id)))?;
        db::delete_user(tx.ex(), id).await?;

        tx.commit().await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DriverOptions;
    use crate::driver::testutils::*;
    use forkful_core::db::DbError;
    use forkful_core::driver::DriverError;

    #[tokio::test]
    async fn test_non_admins_are_forbidden() {
        let context = TestContext::setup(DriverOptions::default()).await;

        let victim = context.create_user("victim", Role::User).await;
        for (name, role) in [("user", Role::User), ("staff", Role::Staff), ("owner", Role::Owner)] {
            let (_user, token) = context.create_logged_in_user(name, role).await;
            match context.driver().get_user(token, victim.id()).await {
                Err(DriverError::Forbidden(msg)) => assert!(msg.contains(role.as_str())),
                e => panic!("{:?}", e),
            }
        }
    }

    #[tokio::test]
    async fn test_list_users() {
        let context = TestContext::setup(DriverOptions::default()).await;

        let (_admin, token) = context.create_logged_in_user("admin", Role::Admin).await;
        context.create_user("alice", Role::Owner).await;
        context.create_user("bob", Role::User).await;

        let params = vec![("role".to_owned(), "owner".to_owned())];
        let result = context.driver().list_users(token, params).await.unwrap();
        assert_eq!(1, result.count);
        assert_eq!("alice", result.data[0]["name"].as_str().unwrap());
        assert!(!result.data[0].contains_key("password"));
    }

    #[tokio::test]
    async fn test_get_user() {
        let context = TestContext::setup(DriverOptions::default()).await;

        let (_admin, token) = context.create_logged_in_user("admin", Role::Admin).await;
        let alice = context.create_user("alice", Role::Owner).await;

        assert_eq!(alice, context.driver().get_user(token.clone(), alice.id()).await.unwrap());

        let missing = UserId::generate();
        match context.driver().get_user(token, missing).await {
            Err(DriverError::NotFound(msg)) => assert!(msg.contains(&missing.to_string())),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_create_user_may_be_admin() {
        let context = TestContext::setup(DriverOptions::default()).await;

        let (_admin, token) = context.create_logged_in_user("admin", Role::Admin).await;
        let request = NewUser {
            name: Some("Second Admin".to_owned()),
            email: Some("admin2@example.com".to_owned()),
            password: Some("admin-password".to_owned()),
            role: Some("admin".to_owned()),
        };
        let user = context.driver().create_user(token, request).await.unwrap();
        assert_eq!(Role::Admin, user.role());

        assert_eq!(user, db::get_user(&mut context.ex().await, user.id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_user() {
        let context = TestContext::setup(DriverOptions::default()).await;

        let (_admin, token) = context.create_logged_in_user("admin", Role::Admin).await;
        let alice = context.create_user("alice", Role::User).await;

        let patch = UserPatch { role: Some("staff".to_owned()), ..Default::default() };
        let user = context.driver().update_user(token.clone(), alice.id(), patch).await.unwrap();
        assert_eq!(Role::Staff, user.role());
        assert_eq!(alice.name(), user.name());
        assert_eq!(user, db::get_user(&mut context.ex().await, alice.id()).await.unwrap());

        let patch = UserPatch { email: Some("admin@example.com".to_owned()), ..Default::default() };
        match context.driver().update_user(token, alice.id(), patch).await {
            Err(DriverError::AlreadyExists(msg)) => assert!(msg.contains("already registered")),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_delete_user() {
        let context = TestContext::setup(opts_no_session_caching()).await;

        let (_admin, token) = context.create_logged_in_user("admin", Role::Admin).await;
        let (alice, alice_token) = context.create_logged_in_user("alice", Role::User).await;

        let deleted = context.driver().delete_user(token.clone(), alice.id()).await.unwrap();
        assert_eq!(alice, deleted);
        assert_eq!(
            DbError::NotFound,
            db::get_user(&mut context.ex().await, alice.id()).await.unwrap_err()
        );
        assert!(!context.session_exists(&alice_token).await);

        match context.driver().delete_user(token, alice.id()).await {
            Err(DriverError::NotFound(_)) => (),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_demoted_and_deleted_admins_lose_access() {
        let context = TestContext::setup(DriverOptions::default()).await;

        let (_root, root_token) = context.create_logged_in_user("root", Role::Admin).await;
        let (mallory, mallory_token) = context.create_logged_in_user("mallory", Role::Admin).await;

        context.driver().list_users(mallory_token.clone(), vec![]).await.unwrap();

        let patch = UserPatch { role: Some("user".to_owned()), ..Default::default() };
        context.driver().update_user(root_token.clone(), mallory.id(), patch).await.unwrap();
        match context.driver().list_users(mallory_token.clone(), vec![]).await {
            Err(DriverError::Forbidden(msg)) => assert!(msg.contains("role user")),
            e => panic!("{:?}", e),
        }

        context.driver().delete_user(root_token, mallory.id()).await.unwrap();
        match context.driver().list_users(mallory_token, vec![]).await {
            Err(DriverError::Unauthorized(_)) => (),
            e => panic!("{:?}", e),
        }
    }
}
