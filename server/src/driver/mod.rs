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

//! Business logic for the restaurant reviews service.

use crate::db;
use crate::model::{AccessToken, Role, Session, User};
use derivative::Derivative;
use futures::lock::Mutex;
use forkful_core::clocks::Clock;
use forkful_core::db::{Db, DbError, TxExecutor};
use forkful_core::driver::{DriverError, DriverResult};
use forkful_core::env::get_optional_var;
use forkful_core::query::QueryOptions;
use log::warn;
use lru_time_cache::LruCache;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

mod auth;
mod restaurants;
mod reviews;
mod stats;
#[cfg(test)]
pub(crate) mod testutils;
mod users;

pub(crate) use auth::{Credentials, NewUser, PasswordChange};
pub(crate) use reviews::{NewReview, ReviewPatch};
pub(crate) use users::UserPatch;

/// Default number of sessions to keep cached in memory.
const DEFAULT_SESSIONS_CACHE_CAPACITY: usize = 10 * 1024;

/// Default amount of time to keep cached sessions in memory.
const DEFAULT_SESSIONS_CACHE_TTL_SECONDS: u64 = 60;

/// Default value for the `SESSION_MAX_AGE` setting when not specified.
const DEFAULT_SESSION_MAX_AGE_SECONDS: u64 = 24 * 60 * 60;

/// Default value for the `SESSION_MAX_SKEW` setting when not specified.
const DEFAULT_SESSION_MAX_SKEW_SECONDS: u64 = 60 * 60;

/// Configuration options for the driver.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct DriverOptions {
    /// Limits applied to list queries.
    pub query: QueryOptions,

    /// The number of sessions to keep cached in memory.
    pub sessions_cache_capacity: usize,

    /// The amount of time to keep cached sessions in memory.
    pub sessions_cache_ttl: Duration,

    /// The amount of time we consider sessions valid for.
    pub session_max_age: Duration,

    /// The amount of time we tolerate in clock skew when validating sessions.
    pub session_max_skew: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            query: QueryOptions::default(),
            sessions_cache_capacity: DEFAULT_SESSIONS_CACHE_CAPACITY,
            sessions_cache_ttl: Duration::from_secs(DEFAULT_SESSIONS_CACHE_TTL_SECONDS),
            session_max_age: Duration::from_secs(DEFAULT_SESSION_MAX_AGE_SECONDS),
            session_max_skew: Duration::from_secs(DEFAULT_SESSION_MAX_SKEW_SECONDS),
        }
    }
}

impl DriverOptions {
    /// Creates a new set of options from environment variables whose names start with `prefix`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            query: QueryOptions::from_env(prefix)?,
            sessions_cache_capacity: get_optional_var::<usize>(prefix, "SESSIONS_CACHE_CAPACITY")?
                .unwrap_or(DEFAULT_SESSIONS_CACHE_CAPACITY),
            sessions_cache_ttl: get_optional_var::<Duration>(prefix, "SESSIONS_CACHE_TTL")?
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_SESSIONS_CACHE_TTL_SECONDS)),
            session_max_age: get_optional_var::<Duration>(prefix, "SESSION_MAX_AGE")?
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_SESSION_MAX_AGE_SECONDS)),
            session_max_skew: get_optional_var::<Duration>(prefix, "SESSION_MAX_SKEW")?
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_SESSION_MAX_SKEW_SECONDS)),
        })
    }
}

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub(crate) struct Driver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// Clock instance to obtain the current time.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Options for the driver.
    opts: DriverOptions,

    /// Cache of session lookups, keyed by their access token.
    sessions_cache: Arc<Mutex<LruCache<AccessToken, DriverResult<Session>>>>,
}

impl Driver {
    /// Creates a new driver backed by the given dependencies.
    pub(crate) fn new(
        db: Arc<dyn Db + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        opts: DriverOptions,
    ) -> Self {
        let sessions_cache = LruCache::with_expiry_duration_and_capacity(
            opts.sessions_cache_ttl,
            opts.sessions_cache_capacity,
        );
        let sessions_cache = Arc::from(Mutex::from(sessions_cache));

        Self { db, clock, opts, sessions_cache }
    }

    /// Obtains the current time from the driver.
    #[cfg(test)]
    pub(crate) fn now_utc(&self) -> OffsetDateTime {
        self.clock.now_utc()
    }

    /// Looks up the session identified by `token`, consulting the cache first.
    ///
    /// Both found and missing sessions are cached.  Only the session record is cached: the user
    /// that owns it is always read from the database so that role changes and account deletions
    /// take effect on the next request.
    async fn lookup_session(
        &self,
        tx: &mut TxExecutor,
        token: &AccessToken,
    ) -> DriverResult<Session> {
        {
            let mut cache = self.sessions_cache.lock().await;
            if let Some(result) = cache.get(token) {
                return result.clone();
            }
        }

        let result = match db::get_session(tx.ex(), token).await {
            Ok(session) => Ok(session),
            Err(DbError::NotFound) => Err(DriverError::Unauthorized("Invalid session".to_owned())),
            Err(e) => return Err(e.into()),
        };

        let mut cache = self.sessions_cache.lock().await;
        if let Some(old_result) = cache.insert(token.clone(), result.clone()) {
            if old_result != result {
                warn!(
                    "Cache insertion race detected with inconsistent values: {:?} != {:?}",
                    old_result, result
                );
            }
        }

        result
    }

    /// Validates the session identified by `token` at time `now` and returns the user that owns
    /// it.
    pub(crate) async fn get_session(
        &self,
        tx: &mut TxExecutor,
        now: OffsetDateTime,
        token: &AccessToken,
    ) -> DriverResult<Arc<User>> {
        let session = self.lookup_session(tx, token).await?;

        let login_time = session.login_time();
        let expired = login_time < (now - self.opts.session_max_age);
        let skew = login_time > (now + self.opts.session_max_skew);
        if expired || skew {
            return Err(DriverError::Unauthorized(
                "Session expired; please log in again".to_owned(),
            ));
        }

        match db::get_user(tx.ex(), session.user()).await {
            Ok(user) => Ok(Arc::from(user)),
            Err(DbError::NotFound) => Err(DriverError::Unauthorized(
                "The user belonging to this session no longer exists".to_owned(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Drops the cached result for the session identified by `token`, if any.
    async fn forget_session(&self, token: &AccessToken) {
        let mut cache = self.sessions_cache.lock().await;
        cache.remove(token);
    }

    /// Validates the session identified by `token` and checks that its owner holds one of the
    /// `allowed` roles.
    async fn authorize(
        &self,
        tx: &mut TxExecutor,
        token: &AccessToken,
        allowed: &[Role],
    ) -> DriverResult<Arc<User>> {
        let now = self.clock.now_utc();
        let user = self.get_session(tx, now, token).await?;
        if !allowed.contains(&user.role()) {
            return Err(DriverError::Forbidden(format!(
                "User role {} is not allowed to perform this operation",
                user.role().as_str()
            )));
        }
        Ok(user)
    }
}

/// Checks that `user` may modify an entity of kind `what` created by `owner`.
fn check_owner_or_admin(user: &User, owner: crate::model::UserId, what: &str) -> DriverResult<()> {
    if user.id() != owner && !user.is_admin() {
        return Err(DriverError::Forbidden(format!(
            "User {} is not allowed to modify this {}",
            user.id(),
            what
        )));
    }
    Ok(())
}

/// Replaces the generic message of a `NotFound` database error with `message`.
fn not_found(e: DbError, message: String) -> DriverError {
    match e {
        DbError::NotFound => DriverError::NotFound(message),
        e => e.into(),
    }
}
