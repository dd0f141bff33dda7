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

//! SQLite backend, used to run tests against a throwaway in-memory database.

use crate::db::{Db, DbError, DbResult, Executor, TxExecutor, forward_sqlx_executor};
use async_trait::async_trait;
use log::warn;
use sqlx::Transaction;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqlitePool};
use time::OffsetDateTime;

/// Classifies an `sqlx` error raised by SQLite into a `DbError`.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::RowNotFound => DbError::NotFound,
        e => {
            let message = e.to_string();
            if message.contains("FOREIGN KEY constraint failed") {
                DbError::NotFound
            } else if message.contains("UNIQUE constraint failed") {
                DbError::AlreadyExists
            } else {
                DbError::BackendError(message)
            }
        }
    }
}

/// Opens the database at `conn_str`, which can be `:memory:` for a private in-memory database.
pub async fn connect(conn_str: &str) -> DbResult<SqliteDb> {
    let pool = SqlitePool::connect(conn_str).await.map_err(map_sqlx_error)?;
    Ok(SqliteDb { pool })
}

/// Executor for the SQLite backend.
#[derive(Debug)]
pub enum SqliteExecutor {
    /// A connection taken from the pool.
    Conn(PoolConnection<Sqlite>),

    /// An open transaction.
    Tx(Transaction<'static, Sqlite>),
}

impl SqliteExecutor {
    /// Commits the wrapped transaction.
    pub(super) async fn commit(self) -> DbResult<()> {
        match self {
            SqliteExecutor::Conn(_) => {
                Err(DbError::BackendError("Cannot commit outside of a transaction".to_owned()))
            }
            SqliteExecutor::Tx(tx) => tx.commit().await.map_err(map_sqlx_error),
        }
    }
}

forward_sqlx_executor!(SqliteExecutor, Sqlite);

/// Connection pool to an SQLite database.
pub struct SqliteDb {
    /// Shared pool of connections to the same database.
    pool: SqlitePool,
}

impl SqliteDb {
    /// Takes a connection from the pool without erasing the backend type.
    pub async fn typed_ex(&self) -> DbResult<SqliteExecutor> {
        let conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        Ok(SqliteExecutor::Conn(conn))
    }
}

impl Drop for SqliteDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("SQLite pool dropped while still open; close() was not called");
        }
    }
}

#[async_trait]
impl Db for SqliteDb {
    async fn ex(&self) -> DbResult<Executor> {
        Ok(Executor::Sqlite(self.typed_ex().await?))
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(TxExecutor(Executor::Sqlite(SqliteExecutor::Tx(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Runs all statements in `schema`.
pub async fn run_schema(e: &mut SqliteExecutor, schema: &str) -> DbResult<()> {
    sqlx::raw_sql(schema).execute(e).await.map_err(map_sqlx_error)?;
    Ok(())
}

/// Converts a stored column of microseconds since the epoch into a timestamp.
///
/// SQLite only has signed integers but we never store instants before the epoch, as negative
/// values would not sort correctly against positive ones.  Negative inputs are thus corrupt data.
pub fn build_timestamp(timestamp_us: i64) -> DbResult<OffsetDateTime> {
    if timestamp_us < 0 {
        return Err(DbError::DataIntegrityError(format!(
            "Timestamp cannot be negative: {}",
            timestamp_us
        )));
    }

    OffsetDateTime::from_unix_timestamp_nanos(i128::from(timestamp_us) * 1000)
        .map_err(|e| DbError::DataIntegrityError(format!("Invalid timestamp: {}", e)))
}

/// Converts a timestamp into microseconds since the epoch for storage.
///
/// Sub-microsecond precision is discarded.  Our clocks never produce it anyway.  Instants before
/// the epoch are clamped to it.
pub fn unpack_timestamp(ts: OffsetDateTime) -> i64 {
    let micros = (ts.unix_timestamp_nanos() / 1000).max(0);
    i64::try_from(micros).unwrap_or(i64::MAX)
}

/// Test utilities for the SQLite backend.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Opens a fresh in-memory database.
    pub async fn setup() -> SqliteDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        connect(":memory:").await.unwrap()
    }
}
