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

//! PostgreSQL backend, used in production.

use crate::db::{Db, DbError, DbResult, Executor, TxExecutor, forward_sqlx_executor};
use crate::env::{get_optional_var, get_required_var};
use async_trait::async_trait;
use derivative::Derivative;
use futures::Future;
use log::warn;
use rand::Rng;
use sqlx::Transaction;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgDatabaseError, PgPool, PgPoolOptions, Postgres};
use std::time::Duration;

/// Number of times to retry taking a connection when the pool is exhausted, unless overridden.
const DEFAULT_MAX_RETRIES: u16 = 30;

/// Longest pause between two attempts to take a connection.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Classifies an `sqlx` error raised by PostgreSQL into a `DbError`.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::Database(e) => {
            let Some(pg) = e.try_downcast_ref::<PgDatabaseError>() else {
                return DbError::BackendError(e.to_string());
            };
            match pg.code() {
                "23503" /* foreign_key_violation */ => DbError::NotFound,
                "23505" /* unique_violation */ => DbError::AlreadyExists,
                "53300" /* too_many_connections */ => DbError::Unavailable,
                code => DbError::BackendError(format!("pgsql error {}: {}", code, e)),
            }
        }
        sqlx::Error::PoolTimedOut => DbError::Unavailable,
        sqlx::Error::RowNotFound => DbError::NotFound,
        e => DbError::BackendError(e.to_string()),
    }
}

/// Connection settings for a PostgreSQL server.
#[derive(Derivative)]
#[derivative(Debug, Default)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct PostgresOptions {
    /// Server hostname.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Name of the database to use.
    pub database: String,

    /// Role to log in as.
    pub username: String,

    /// Password for `username`.
    #[derivative(Debug = "ignore")]
    pub password: String,

    /// Connections the pool keeps open even when idle.
    pub min_connections: Option<u32>,

    /// Upper bound on open connections.
    pub max_connections: Option<u32>,

    /// How many times to retry taking a connection while the server reports being unavailable.
    pub max_retries: u16,
}

impl PostgresOptions {
    /// Reads the connection settings from the `<prefix>_*` environment variables.
    ///
    /// `HOST`, `PORT`, `DATABASE`, `USERNAME` and `PASSWORD` are required.  `MIN_CONNECTIONS`,
    /// `MAX_CONNECTIONS` and `MAX_RETRIES` are optional.
    pub fn from_env(prefix: &str) -> Result<PostgresOptions, String> {
        Ok(PostgresOptions {
            host: get_required_var::<String>(prefix, "HOST")?,
            port: get_required_var::<u16>(prefix, "PORT")?,
            database: get_required_var::<String>(prefix, "DATABASE")?,
            username: get_required_var::<String>(prefix, "USERNAME")?,
            password: get_required_var::<String>(prefix, "PASSWORD")?,
            min_connections: get_optional_var::<u32>(prefix, "MIN_CONNECTIONS")?,
            max_connections: get_optional_var::<u32>(prefix, "MAX_CONNECTIONS")?,
            max_retries: get_optional_var::<u16>(prefix, "MAX_RETRIES")?
                .unwrap_or(DEFAULT_MAX_RETRIES),
        })
    }
}

/// Executor for the PostgreSQL backend.
#[derive(Debug)]
pub enum PostgresExecutor {
    /// A connection taken from the pool.
    Conn(PoolConnection<Postgres>),

    /// An open transaction.
    Tx(Transaction<'static, Postgres>),
}

impl PostgresExecutor {
    /// Commits the wrapped transaction.
    pub(super) async fn commit(self) -> DbResult<()> {
        match self {
            PostgresExecutor::Conn(_) => {
                Err(DbError::BackendError("Cannot commit outside of a transaction".to_owned()))
            }
            PostgresExecutor::Tx(tx) => tx.commit().await.map_err(map_sqlx_error),
        }
    }
}

forward_sqlx_executor!(PostgresExecutor, Postgres);

/// Computes the pause to take before the next attempt, given the `previous` one.
fn next_retry_delay(previous: Duration) -> Duration {
    let jitter = Duration::from_millis(rand::rng().random_range(0..1000));
    (previous + jitter).min(MAX_RETRY_DELAY)
}

/// Runs `op` until it succeeds, fails with an error other than `Unavailable`, or `max_retries`
/// extra attempts have been made.
async fn with_retries<Op, OpFut, T>(op: Op, max_retries: u16) -> DbResult<T>
where
    Op: Fn() -> OpFut,
    OpFut: Future<Output = Result<T, sqlx::Error>>,
    T: Send + Sync,
{
    let mut delay = Duration::from_millis(rand::rng().random_range(100..1000));
    let mut attempts_left = max_retries;
    loop {
        match op().await.map_err(map_sqlx_error) {
            Err(DbError::Unavailable) if attempts_left > 0 => {
                attempts_left -= 1;
                warn!(
                    "PostgreSQL unavailable; retrying in {}ms ({} attempts left)",
                    delay.as_millis(),
                    attempts_left
                );
                tokio::time::sleep(delay).await;
                delay = next_retry_delay(delay);
            }
            result => return result,
        }
    }
}

/// Connection pool to a PostgreSQL database.
pub struct PostgresDb {
    /// Shared pool.  Cloning it is cheap and all clones hand out connections from the same set.
    pool: PgPool,

    /// Copy of `PostgresOptions::max_retries`.
    max_retries: u16,
}

impl Drop for PostgresDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("PostgreSQL pool dropped while still open; close() was not called");
        }
    }
}

impl PostgresDb {
    /// Prepares a pool with the given `opts`.  Connections are only opened on first use.
    pub fn connect(opts: PostgresOptions) -> DbResult<Self> {
        let mut pool_options = PgPoolOptions::new().acquire_timeout(Duration::from_secs(2));
        if let Some(n) = opts.min_connections {
            pool_options = pool_options.min_connections(n);
        }
        if let Some(n) = opts.max_connections {
            pool_options = pool_options.max_connections(n);
        }

        let connect_options = PgConnectOptions::new()
            .host(&opts.host)
            .port(opts.port)
            .database(&opts.database)
            .username(&opts.username)
            .password(&opts.password);

        Ok(Self {
            pool: pool_options.connect_lazy_with(connect_options),
            max_retries: opts.max_retries,
        })
    }

    /// Takes a connection from the pool without erasing the backend type.
    pub async fn typed_ex(&self) -> DbResult<PostgresExecutor> {
        let conn = with_retries(|| self.pool.acquire(), self.max_retries).await?;
        Ok(PostgresExecutor::Conn(conn))
    }
}

#[async_trait]
impl Db for PostgresDb {
    async fn ex(&self) -> DbResult<Executor> {
        Ok(Executor::Postgres(self.typed_ex().await?))
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = with_retries(|| self.pool.begin(), self.max_retries).await?;
        Ok(TxExecutor(Executor::Postgres(PostgresExecutor::Tx(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Runs all statements in `schema`.
pub async fn run_schema(e: &mut PostgresExecutor, schema: &str) -> DbResult<()> {
    sqlx::raw_sql(schema).execute(e).await.map_err(map_sqlx_error)?;
    Ok(())
}

/// Test utilities for the PostgreSQL backend.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Connects to the server configured in the `PGSQL_TEST_*` variables.
    ///
    /// Tables land in `pg_temp` so they vanish when the connection closes.  This only works if
    /// the pool holds exactly one connection for its whole life, so the pool is sized that way.
    pub async fn setup() -> PostgresDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();

        let mut opts = PostgresOptions::from_env("PGSQL_TEST").unwrap();
        opts.min_connections = Some(1);
        opts.max_connections = Some(1);
        let db = PostgresDb::connect(opts).unwrap();

        let mut ex = db.typed_ex().await.unwrap();
        sqlx::query("SET search_path TO pg_temp").execute(&mut ex).await.unwrap();
        db
    }
}
