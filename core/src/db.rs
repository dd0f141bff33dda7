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

//! Database access shared by all services.
//!
//! Callers interact with the database through the `Db` trait and receive an `Executor` that
//! wraps the connection for whichever backend is compiled in.  PostgreSQL serves production
//! traffic.  SQLite keeps unit tests self-contained and fast.

use crate::model::ModelError;
use async_trait::async_trait;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(any(feature = "sqlite", test))]
pub mod sqlite;

/// Errors raised by the storage layer.
///
/// Conditions that callers need to react to, such as unique key clashes, have their own variants.
/// Anything else ends up in `BackendError`.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DbError {
    /// A row with the same unique key is already stored.
    #[error("Already exists")]
    AlreadyExists,

    /// The database reported a failure we do not classify.
    #[error("Database error: {0}")]
    BackendError(String),

    /// A stored row could not be converted back into its in-memory form.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// The requested row does not exist or a referenced row is missing.
    #[error("Entity not found")]
    NotFound,

    /// The database cannot take more work right now.
    #[error("Unavailable")]
    Unavailable,
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::DataIntegrityError(e.to_string())
    }
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// Handle to issue queries against whichever backend is in use.
///
/// sqlx needs to know the concrete database type to build queries, so code that issues SQL must
/// match on this enum and provide one arm per backend.  The wrapped executor may be a plain pooled
/// connection or an open transaction.
pub enum Executor {
    /// Executor for the PostgreSQL backend.
    #[cfg(feature = "postgres")]
    Postgres(postgres::PostgresExecutor),

    /// Executor for the SQLite backend.
    #[cfg(any(feature = "sqlite", test))]
    Sqlite(sqlite::SqliteExecutor),
}

/// An `Executor` that runs inside a transaction.
///
/// Dropping this without calling `commit` rolls the transaction back.
pub struct TxExecutor(Executor);

impl TxExecutor {
    /// Gives access to the executor to run statements within the transaction.
    pub fn ex(&mut self) -> &mut Executor {
        &mut self.0
    }

    /// Commits all statements issued so far.
    pub async fn commit(self) -> DbResult<()> {
        match self.0 {
            #[cfg(feature = "postgres")]
            Executor::Postgres(e) => e.commit().await,

            #[cfg(any(feature = "sqlite", test))]
            Executor::Sqlite(e) => e.commit().await,

            #[allow(unreachable_patterns)]
            _ => Err(DbError::BackendError("No database backends enabled".to_owned())),
        }
    }
}

/// Entry point to a database connection pool.
#[async_trait]
pub trait Db {
    /// Takes a connection from the pool for statements that need no transaction.
    async fn ex(&self) -> DbResult<Executor>;

    /// Opens a new transaction.
    async fn begin(&self) -> DbResult<TxExecutor>;

    /// Shuts down the pool.  Must be called before dropping the database.
    async fn close(&self);
}

/// Implements `sqlx::Executor` for a backend-specific executor enum by forwarding every call to
/// the wrapped pooled connection (`Conn` variant) or transaction (`Tx` variant).
macro_rules! forward_sqlx_executor {
    ( $executor:ident, $database:ty ) => {
        impl<'c> sqlx::Executor<'c> for &'c mut $executor {
            type Database = $database;

            fn fetch_many<'e, 'q: 'e, E>(
                self,
                query: E,
            ) -> futures::stream::BoxStream<
                'e,
                Result<
                    sqlx::Either<
                        <$database as sqlx::Database>::QueryResult,
                        <$database as sqlx::Database>::Row,
                    >,
                    sqlx::Error,
                >,
            >
            where
                'c: 'e,
                E: 'q + sqlx::Execute<'q, $database>,
            {
                match self {
                    $executor::Conn(conn) => sqlx::Executor::fetch_many(&mut **conn, query),
                    $executor::Tx(tx) => sqlx::Executor::fetch_many(&mut **tx, query),
                }
            }

            fn fetch_optional<'e, 'q: 'e, E>(
                self,
                query: E,
            ) -> futures::future::BoxFuture<
                'e,
                Result<Option<<$database as sqlx::Database>::Row>, sqlx::Error>,
            >
            where
                'c: 'e,
                E: 'q + sqlx::Execute<'q, $database>,
            {
                match self {
                    $executor::Conn(conn) => sqlx::Executor::fetch_optional(&mut **conn, query),
                    $executor::Tx(tx) => sqlx::Executor::fetch_optional(&mut **tx, query),
                }
            }

            fn prepare_with<'e, 'q: 'e>(
                self,
                sql: &'q str,
                parameters: &'e [<$database as sqlx::Database>::TypeInfo],
            ) -> futures::future::BoxFuture<
                'e,
                Result<<$database as sqlx::Database>::Statement<'q>, sqlx::Error>,
            >
            where
                'c: 'e,
            {
                match self {
                    $executor::Conn(conn) => {
                        sqlx::Executor::prepare_with(&mut **conn, sql, parameters)
                    }
                    $executor::Tx(tx) => sqlx::Executor::prepare_with(&mut **tx, sql, parameters),
                }
            }

            fn describe<'e, 'q: 'e>(
                self,
                sql: &'q str,
            ) -> futures::future::BoxFuture<'e, Result<sqlx::Describe<$database>, sqlx::Error>>
            where
                'c: 'e,
            {
                match self {
                    $executor::Conn(conn) => sqlx::Executor::describe(&mut **conn, sql),
                    $executor::Tx(tx) => sqlx::Executor::describe(&mut **tx, sql),
                }
            }
        }
    };
}

#[cfg(any(feature = "postgres", feature = "sqlite", test))]
pub(crate) use forward_sqlx_executor;

/// Macros to run the same test suite against every database backend.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    pub use paste::paste;

    /// Defines test `name` that calls `module::name` with the database returned by `setup`,
    /// optionally tagged with the `extra` attribute.
    #[macro_export]
    macro_rules! generate_one_test [
        ( $name:ident, $setup:expr, $module:path $(, #[$extra:meta] )? ) => {
            #[tokio::test]
            $(#[$extra])?
            async fn $name() {
                $crate::db::testutils::paste! {
                    $module :: [< $name >]($setup).await;
                }
            }
        }
    ];

    pub use generate_one_test;

    /// Defines one test per `name` in `module`, each receiving the database returned by `setup`.
    ///
    /// `setup` must yield a database that already has whatever schema the tests expect.  When
    /// `extra` is given, every generated test carries that attribute.
    #[macro_export]
    macro_rules! generate_tests [
        ( #[$extra:meta], $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module, #[$extra]);
            )+
        };

        ( $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module);
            )+
        };
    ];

    pub use generate_tests;
}
