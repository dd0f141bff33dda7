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

//! Implementation of `Collection` for database tables.

use crate::db::{DbError, DbResult, Executor};
use crate::query::descriptor::{Direction, Filter, Projection, SortKey};
use crate::query::executor::{Collection, Document, Find};
use crate::query::operator::Operator;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Database, QueryBuilder};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// Name of the field that uniquely identifies every record.
const ID_FIELD: &str = "id";

/// Type of the values stored in a field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldKind {
    /// `true` or `false`.
    Boolean,

    /// 64-bit signed integer.
    Integer,

    /// 64-bit floating point number.
    Real,

    /// Free-form string.
    Text,

    /// Point in time, exchanged with clients in RFC 3339 format.
    Timestamp,

    /// UUID, exchanged with clients in its hyphenated form.
    Uuid,
}

/// Mapping of a field exposed to clients to a table column.
#[derive(Clone, Copy, Debug)]
pub struct Field {
    /// Name of the field in queries and in returned documents.
    pub name: &'static str,

    /// Name of the column in the table.
    pub column: &'static str,

    /// Type of the values in the column.
    pub kind: FieldKind,

    /// Whether the field is internal.  Internal fields cannot be filtered on, sorted by nor
    /// returned.
    pub hidden: bool,
}

impl Field {
    /// Maps the field `name` to `column`.
    pub const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { name, column, kind, hidden: false }
    }

    /// Marks the field as internal.
    pub const fn hidden(self) -> Self {
        Self { hidden: true, ..self }
    }
}

/// A value converted to the type of the field it is compared against.
#[derive(Debug, PartialEq)]
enum SqlValue {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(OffsetDateTime),
    Uuid(Uuid),
}

impl SqlValue {
    /// Converts the `raw` value supplied by a client to the type `kind`.
    fn parse(kind: FieldKind, raw: &str) -> Option<SqlValue> {
        match kind {
            FieldKind::Boolean => raw.parse::<bool>().ok().map(SqlValue::Boolean),
            FieldKind::Integer => raw.trim().parse::<i64>().ok().map(SqlValue::Integer),
            FieldKind::Real => match raw.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Some(SqlValue::Real(f)),
                _ => None,
            },
            FieldKind::Text => Some(SqlValue::Text(raw.to_owned())),
            FieldKind::Timestamp => {
                OffsetDateTime::parse(raw.trim(), &Rfc3339).ok().map(SqlValue::Timestamp)
            }
            FieldKind::Uuid => Uuid::parse_str(raw.trim()).ok().map(SqlValue::Uuid),
        }
    }
}

/// A condition of the `WHERE` clause.
#[derive(Debug, PartialEq)]
enum Condition {
    /// A condition that no record satisfies.
    Never,

    /// `column <op> value`, where `op` is the SQL comparison operator.
    Compare(&'static str, &'static str, SqlValue),

    /// `column <> value`, also satisfied by records without a value.
    NotEqual(&'static str, SqlValue),

    /// `column IN (values...)`.
    In(&'static str, Vec<SqlValue>),
}

/// A `SELECT` statement ready to be rendered for a specific database.
#[derive(Debug)]
struct Select {
    /// Fields to fetch.
    fields: Vec<&'static Field>,

    /// Conditions that must all hold.
    conditions: Vec<Condition>,

    /// Columns to order by.
    order: Vec<(&'static str, Direction)>,

    /// Number of rows to skip.
    skip: i64,

    /// Maximum number of rows to return.
    limit: i64,
}

/// Function that appends a placeholder for `value` to a query and binds the value to it.
type Binder<'args, DB> = fn(&mut QueryBuilder<'args, DB>, SqlValue);

/// Appends the `WHERE` clause for `conditions` to `qb`.
fn push_where<'args, DB: Database>(
    qb: &mut QueryBuilder<'args, DB>,
    conditions: Vec<Condition>,
    bind: Binder<'args, DB>,
) {
    for (i, condition) in conditions.into_iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        match condition {
            Condition::Never => {
                qb.push("1 = 0");
            }
            Condition::Compare(column, op, value) => {
                qb.push(column).push(" ").push(op).push(" ");
                bind(qb, value);
            }
            Condition::NotEqual(column, value) => {
                qb.push("(").push(column).push(" IS NULL OR ").push(column).push(" <> ");
                bind(qb, value);
                qb.push(")");
            }
            Condition::In(column, values) => {
                qb.push(column).push(" IN (");
                for (j, value) in values.into_iter().enumerate() {
                    if j > 0 {
                        qb.push(", ");
                    }
                    bind(qb, value);
                }
                qb.push(")");
            }
        }
    }
}

/// Appends the full `SELECT` statement described by `select` over `table` to `qb`.
fn push_select<'args, DB: Database>(
    qb: &mut QueryBuilder<'args, DB>,
    table: &str,
    select: Select,
    bind: Binder<'args, DB>,
) {
    qb.push("SELECT ");
    for (i, field) in select.fields.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(field.column);
    }
    qb.push(" FROM ").push(table);

    push_where(qb, select.conditions, bind);

    for (i, (column, direction)) in select.order.iter().enumerate() {
        qb.push(if i == 0 { " ORDER BY " } else { ", " });
        qb.push(column);
        match direction {
            Direction::Ascending => qb.push(" ASC NULLS FIRST"),
            Direction::Descending => qb.push(" DESC NULLS LAST"),
        };
    }

    qb.push(" LIMIT ");
    bind(qb, SqlValue::Integer(select.limit));
    qb.push(" OFFSET ");
    bind(qb, SqlValue::Integer(select.skip));
}

/// Appends a `SELECT COUNT(*)` statement over `table` restricted by `conditions` to `qb`.
fn push_count<'args, DB: Database>(
    qb: &mut QueryBuilder<'args, DB>,
    table: &str,
    conditions: Vec<Condition>,
    bind: Binder<'args, DB>,
) {
    qb.push("SELECT COUNT(*) FROM ").push(table);
    push_where(qb, conditions, bind);
}

/// Formats a timestamp for a returned document.
fn timestamp_to_json(ts: OffsetDateTime) -> DbResult<Value> {
    ts.format(&Rfc3339)
        .map(Value::String)
        .map_err(|e| DbError::DataIntegrityError(format!("Cannot format timestamp: {}", e)))
}

/// A collection backed by a database table whose columns are described by a static list of
/// fields.
///
/// The fields should include one named `id` holding a unique identifier: it is always returned
/// and it breaks ties when ordering records.
#[derive(Debug)]
pub struct SqlCollection {
    /// Name of the table.
    table: &'static str,

    /// Fields of the records in the table.
    fields: &'static [Field],
}

impl SqlCollection {
    /// Creates a new collection over `table`.
    pub const fn new(table: &'static str, fields: &'static [Field]) -> Self {
        Self { table, fields }
    }

    /// Returns the name of the table backing this collection.
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Looks up a field that clients are allowed to use.
    fn visible_field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.name == name && !f.hidden)
    }

    /// Converts a client-supplied `filter` into a condition.  Anything that cannot be applied as
    /// requested becomes a condition that matches nothing.
    fn condition(&self, filter: &Filter) -> Condition {
        let Some(field) = self.visible_field(&filter.field) else {
            return Condition::Never;
        };

        let parse = |raw: &str| SqlValue::parse(field.kind, raw);
        let op = match filter.op {
            Operator::In => {
                let mut values = vec![];
                for raw in filter.value.split(',').map(str::trim).filter(|v| !v.is_empty()) {
                    match parse(raw) {
                        Some(value) => values.push(value),
                        None => return Condition::Never,
                    }
                }
                if values.is_empty() {
                    return Condition::Never;
                }
                return Condition::In(field.column, values);
            }
            Operator::Ne => {
                return match parse(&filter.value) {
                    Some(value) => Condition::NotEqual(field.column, value),
                    None => Condition::Never,
                };
            }
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
        };
        match parse(&filter.value) {
            Some(value) => Condition::Compare(field.column, op, value),
            None => Condition::Never,
        }
    }

    /// Computes the set of fields to return for `projection`.
    fn fields_for(&self, projection: &Projection) -> Vec<&'static Field> {
        let visible = self.fields.iter().filter(|f| !f.hidden);
        let fields: Vec<&'static Field> = match projection {
            Projection::Default => visible.collect(),
            Projection::Include(names) => visible
                .filter(|f| f.name == ID_FIELD || names.iter().any(|name| name == f.name))
                .collect(),
            Projection::Exclude(names) => visible
                .filter(|f| f.name == ID_FIELD || !names.iter().any(|name| name == f.name))
                .collect(),
        };
        if fields.is_empty() { self.fields.iter().filter(|f| !f.hidden).collect() } else { fields }
    }

    /// Computes the ordering for `sort`, dropping unknown fields and appending the identifier
    /// as the final tie-breaker.
    fn order_for(&self, sort: &[SortKey]) -> Vec<(&'static str, Direction)> {
        let mut order: Vec<(&'static str, Direction)> = vec![];
        for key in sort {
            if let Some(field) = self.visible_field(&key.field) {
                if !order.iter().any(|(column, _)| *column == field.column) {
                    order.push((field.column, key.direction));
                }
            }
        }
        if let Some(id) = self.visible_field(ID_FIELD) {
            if !order.iter().any(|(column, _)| *column == id.column) {
                order.push((id.column, Direction::Ascending));
            }
        }
        order
    }

    /// Turns a `find` request into a statement.
    fn plan(&self, find: &Find<'_>) -> Select {
        Select {
            fields: self.fields_for(find.projection),
            conditions: find.filters.iter().map(|f| self.condition(f)).collect(),
            order: self.order_for(find.sort),
            skip: i64::try_from(find.skip).unwrap_or(i64::MAX),
            limit: find.limit.and_then(|n| i64::try_from(n).ok()).unwrap_or(i64::MAX),
        }
    }
}

#[async_trait]
impl Collection for SqlCollection {
    async fn find(&self, ex: &mut Executor, find: &Find<'_>) -> DbResult<Vec<Document>> {
        let select = self.plan(find);
        match ex {
            #[cfg(feature = "postgres")]
            Executor::Postgres(ex) => postgres::find(ex, self.table, select).await,

            #[cfg(any(feature = "sqlite", test))]
            Executor::Sqlite(ex) => sqlite::find(ex, self.table, select).await,

            #[allow(unreachable_patterns)]
            _ => unreachable!("No database backends enabled"),
        }
    }

    async fn count(&self, ex: &mut Executor, filters: &[Filter]) -> DbResult<u64> {
        let conditions: Vec<Condition> = filters.iter().map(|f| self.condition(f)).collect();
        let count = match ex {
            #[cfg(feature = "postgres")]
            Executor::Postgres(ex) => postgres::count(ex, self.table, conditions).await?,

            #[cfg(any(feature = "sqlite", test))]
            Executor::Sqlite(ex) => sqlite::count(ex, self.table, conditions).await?,

            #[allow(unreachable_patterns)]
            _ => unreachable!("No database backends enabled"),
        };
        u64::try_from(count)
            .map_err(|_| DbError::DataIntegrityError(format!("Invalid count {}", count)))
    }
}

/// Rendering and decoding for PostgreSQL.
#[cfg(feature = "postgres")]
mod postgres {
    use super::*;
    use crate::db::postgres::{PostgresExecutor, map_sqlx_error};
    use sqlx::Row;
    use sqlx::postgres::{PgRow, Postgres};

    fn bind(qb: &mut QueryBuilder<'_, Postgres>, value: SqlValue) {
        match value {
            SqlValue::Boolean(b) => qb.push_bind(b),
            SqlValue::Integer(i) => qb.push_bind(i),
            SqlValue::Real(f) => qb.push_bind(f),
            SqlValue::Text(s) => qb.push_bind(s),
            SqlValue::Timestamp(ts) => qb.push_bind(ts),
            SqlValue::Uuid(u) => qb.push_bind(u),
        };
    }

    fn decode(row: &PgRow, fields: &[&'static Field]) -> DbResult<Document> {
        let mut doc = Document::new();
        for field in fields {
            let column = field.column;
            let value = match field.kind {
                FieldKind::Boolean => {
                    row.try_get::<Option<bool>, _>(column).map_err(map_sqlx_error)?.map(Value::Bool)
                }
                FieldKind::Integer => {
                    row.try_get::<Option<i64>, _>(column).map_err(map_sqlx_error)?.map(Value::from)
                }
                FieldKind::Real => {
                    row.try_get::<Option<f64>, _>(column).map_err(map_sqlx_error)?.map(Value::from)
                }
                FieldKind::Text => row
                    .try_get::<Option<String>, _>(column)
                    .map_err(map_sqlx_error)?
                    .map(Value::String),
                FieldKind::Timestamp => {
                    let ts =
                        row.try_get::<Option<OffsetDateTime>, _>(column).map_err(map_sqlx_error)?;
                    match ts {
                        Some(ts) => Some(timestamp_to_json(ts)?),
                        None => None,
                    }
                }
                FieldKind::Uuid => row
                    .try_get::<Option<Uuid>, _>(column)
                    .map_err(map_sqlx_error)?
                    .map(|u| Value::String(u.to_string())),
            };
            doc.insert(field.name.to_owned(), value.unwrap_or(Value::Null));
        }
        Ok(doc)
    }

    pub(super) async fn find(
        ex: &mut PostgresExecutor,
        table: &str,
        select: Select,
    ) -> DbResult<Vec<Document>> {
        let fields = select.fields.clone();
        let mut qb = QueryBuilder::<Postgres>::new("");
        push_select(&mut qb, table, select, bind);
        let rows = qb.build().fetch_all(ex).await.map_err(map_sqlx_error)?;
        rows.iter().map(|row| decode(row, &fields)).collect()
    }

    pub(super) async fn count(
        ex: &mut PostgresExecutor,
        table: &str,
        conditions: Vec<Condition>,
    ) -> DbResult<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("");
        push_count(&mut qb, table, conditions, bind);
        qb.build_query_scalar::<i64>().fetch_one(ex).await.map_err(map_sqlx_error)
    }
}

/// Rendering and decoding for SQLite.
#[cfg(any(feature = "sqlite", test))]
mod sqlite {
    use super::*;
    use crate::db::sqlite::{SqliteExecutor, build_timestamp, map_sqlx_error};
    use sqlx::Row;
    use sqlx::sqlite::{Sqlite, SqliteRow};

    /// Converts a timestamp to the microseconds stored in the database.  Unlike the conversion
    /// used for writes, this accepts timestamps before the epoch as they can appear in filters.
    fn timestamp_micros(ts: OffsetDateTime) -> i64 {
        i64::try_from(ts.unix_timestamp_nanos().div_euclid(1000)).unwrap_or(i64::MAX)
    }

    fn bind(qb: &mut QueryBuilder<'_, Sqlite>, value: SqlValue) {
        match value {
            SqlValue::Boolean(b) => qb.push_bind(b),
            SqlValue::Integer(i) => qb.push_bind(i),
            SqlValue::Real(f) => qb.push_bind(f),
            SqlValue::Text(s) => qb.push_bind(s),
            SqlValue::Timestamp(ts) => qb.push_bind(timestamp_micros(ts)),
            SqlValue::Uuid(u) => qb.push_bind(u),
        };
    }

    fn decode(row: &SqliteRow, fields: &[&'static Field]) -> DbResult<Document> {
        let mut doc = Document::new();
        for field in fields {
            let column = field.column;
            let value = match field.kind {
                FieldKind::Boolean => {
                    row.try_get::<Option<bool>, _>(column).map_err(map_sqlx_error)?.map(Value::Bool)
                }
                FieldKind::Integer => {
                    row.try_get::<Option<i64>, _>(column).map_err(map_sqlx_error)?.map(Value::from)
                }
                FieldKind::Real => {
                    row.try_get::<Option<f64>, _>(column).map_err(map_sqlx_error)?.map(Value::from)
                }
                FieldKind::Text => row
                    .try_get::<Option<String>, _>(column)
                    .map_err(map_sqlx_error)?
                    .map(Value::String),
                FieldKind::Timestamp => {
                    match row.try_get::<Option<i64>, _>(column).map_err(map_sqlx_error)? {
                        Some(micros) => Some(timestamp_to_json(build_timestamp(micros)?)?),
                        None => None,
                    }
                }
                FieldKind::Uuid => row
                    .try_get::<Option<Uuid>, _>(column)
                    .map_err(map_sqlx_error)?
                    .map(|u| Value::String(u.to_string())),
            };
            doc.insert(field.name.to_owned(), value.unwrap_or(Value::Null));
        }
        Ok(doc)
    }

    pub(super) async fn find(
        ex: &mut SqliteExecutor,
        table: &str,
        select: Select,
    ) -> DbResult<Vec<Document>> {
        let fields = select.fields.clone();
        let mut qb = QueryBuilder::<Sqlite>::new("");
        push_select(&mut qb, table, select, bind);
        let rows = qb.build().fetch_all(ex).await.map_err(map_sqlx_error)?;
        rows.iter().map(|row| decode(row, &fields)).collect()
    }

    pub(super) async fn count(
        ex: &mut SqliteExecutor,
        table: &str,
        conditions: Vec<Condition>,
    ) -> DbResult<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("");
        push_count(&mut qb, table, conditions, bind);
        qb.build_query_scalar::<i64>().fetch_one(ex).await.map_err(map_sqlx_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;
    use crate::db::sqlite::testutils::setup;
    use crate::db::sqlite::{SqliteDb, run_schema, unpack_timestamp};
    use crate::query::descriptor::QueryOptions;
    use crate::query::envelope::{PageLink, Pagination, ResultEnvelope};
    use crate::query::executor::run_query;
    use serde_json::json;

    /// Fields of the `items` test table.
    static ITEM_FIELDS: &[Field] = &[
        Field::new("id", "id", FieldKind::Uuid),
        Field::new("name", "name", FieldKind::Text),
        Field::new("kind", "kind", FieldKind::Text),
        Field::new("rating", "rating", FieldKind::Real),
        Field::new("votes", "votes", FieldKind::Integer),
        Field::new("open", "open", FieldKind::Boolean),
        Field::new("secret", "secret", FieldKind::Text).hidden(),
        Field::new("createdAt", "created_at", FieldKind::Timestamp),
    ];

    /// Collection over the `items` test table.
    static ITEMS: SqlCollection = SqlCollection::new("items", ITEM_FIELDS);

    const SCHEMA: &str = "
        CREATE TABLE items (
            id BLOB PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            kind TEXT,
            rating REAL NOT NULL,
            votes INTEGER NOT NULL,
            open INTEGER NOT NULL,
            secret TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
    ";

    /// Properties of an item to insert into the test table.
    struct Item {
        id: u128,
        name: &'static str,
        kind: Option<&'static str>,
        rating: f64,
        votes: i64,
        open: bool,
        created_secs: i64,
    }

    impl Item {
        fn new(id: u128, name: &'static str) -> Self {
            Self {
                id,
                name,
                kind: None,
                rating: 1.0,
                votes: 0,
                open: false,
                created_secs: 1_000_000 + i64::try_from(id).unwrap(),
            }
        }
    }

    /// Creates the test table and inserts `items` into it.
    async fn setup_items(items: &[Item]) -> SqliteDb {
        let db = setup().await;
        let mut ex = db.typed_ex().await.unwrap();
        run_schema(&mut ex, SCHEMA).await.unwrap();
        for item in items {
            let created_at = OffsetDateTime::from_unix_timestamp(item.created_secs).unwrap();
            sqlx::query(
                "INSERT INTO items (id, name, kind, rating, votes, open, secret, created_at)
                VALUES (?, ?, ?, ?, ?, ?, 'shh', ?)",
            )
            .bind(Uuid::from_u128(item.id))
            .bind(item.name)
            .bind(item.kind)
            .bind(item.rating)
            .bind(item.votes)
            .bind(item.open)
            .bind(unpack_timestamp(created_at))
            .execute(&mut ex)
            .await
            .unwrap();
        }
        db
    }

    /// Runs a list query given as key/value `pairs` against the items in `db`.
    async fn query(db: &SqliteDb, pairs: &[(&str, &str)]) -> ResultEnvelope<Document> {
        let params: Vec<(String, String)> =
            pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        let mut tx = db.begin().await.unwrap();
        let envelope =
            run_query(tx.ex(), &ITEMS, &params, &QueryOptions::default()).await.unwrap();
        tx.commit().await.unwrap();
        envelope
    }

    /// Extracts the names of the documents in `envelope`, in order.
    fn names(envelope: &ResultEnvelope<Document>) -> Vec<&str> {
        envelope.data.iter().map(|doc| doc["name"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_condition_unknown_and_hidden_fields_match_nothing() {
        assert_eq!(Condition::Never, ITEMS.condition(&Filter::new("foo", Operator::Eq, "1")));
        assert_eq!(
            Condition::Never,
            ITEMS.condition(&Filter::new("foo[bogus]", Operator::Eq, "1"))
        );
        assert_eq!(Condition::Never, ITEMS.condition(&Filter::new("secret", Operator::Eq, "shh")));
    }

    #[test]
    fn test_condition_uncastable_values_match_nothing() {
        for (field, value) in [
            ("rating", "high"),
            ("votes", "4.5"),
            ("open", "yes"),
            ("createdAt", "yesterday"),
            ("id", "not-a-uuid"),
        ] {
            assert_eq!(
                Condition::Never,
                ITEMS.condition(&Filter::new(field, Operator::Eq, value)),
                "Field {} with value {}",
                field,
                value
            );
        }
        assert_eq!(Condition::Never, ITEMS.condition(&Filter::new("votes", Operator::In, "1,x")));
        assert_eq!(Condition::Never, ITEMS.condition(&Filter::new("votes", Operator::In, ",")));
        assert_eq!(Condition::Never, ITEMS.condition(&Filter::new("rating", Operator::Gt, "NaN")));
    }

    #[test]
    fn test_condition_conversions() {
        assert_eq!(
            Condition::Compare("rating", ">=", SqlValue::Real(4.0)),
            ITEMS.condition(&Filter::new("rating", Operator::Gte, "4"))
        );
        assert_eq!(
            Condition::NotEqual("kind", SqlValue::Text("Thai".to_owned())),
            ITEMS.condition(&Filter::new("kind", Operator::Ne, "Thai"))
        );
        assert_eq!(
            Condition::In("votes", vec![SqlValue::Integer(1), SqlValue::Integer(3)]),
            ITEMS.condition(&Filter::new("votes", Operator::In, "1, 3"))
        );
        assert_eq!(
            Condition::Compare("created_at", "<", SqlValue::Timestamp(
                OffsetDateTime::from_unix_timestamp(86400).unwrap()
            )),
            ITEMS.condition(&Filter::new("createdAt", Operator::Lt, "1970-01-02T00:00:00Z"))
        );
    }

    #[test]
    fn test_order_drops_unknown_and_appends_id() {
        assert_eq!(
            vec![("rating", Direction::Descending), ("id", Direction::Ascending)],
            ITEMS.order_for(&[
                SortKey::new("rating", Direction::Descending),
                SortKey::new("bogus", Direction::Ascending),
                SortKey::new("secret", Direction::Ascending),
            ])
        );
        assert_eq!(
            vec![("id", Direction::Descending)],
            ITEMS.order_for(&[SortKey::new("id", Direction::Descending)])
        );
    }

    #[tokio::test]
    async fn test_default_query_sorts_by_newest_and_hides_internal_fields() {
        let db = setup_items(&[Item::new(1, "first"), Item::new(2, "second")]).await;

        let envelope = query(&db, &[]).await;
        assert_eq!(vec!["second", "first"], names(&envelope));
        assert_eq!(
            json!({
                "id": "00000000-0000-0000-0000-000000000002",
                "name": "second",
                "kind": null,
                "rating": 1.0,
                "votes": 0,
                "open": false,
                "createdAt": "1970-01-12T13:46:42Z",
            }),
            serde_json::Value::Object(envelope.data[0].clone())
        );

        db.close().await;
    }

    #[tokio::test]
    async fn test_filters() {
        let mut items = vec![];
        for (i, (name, kind, rating, open)) in [
            ("a", Some("Thai"), 4.5, true),
            ("b", Some("Thai"), 3.0, false),
            ("c", Some("Italian"), 4.0, true),
            ("d", None, 5.0, false),
        ]
        .into_iter()
        .enumerate()
        {
            let mut item = Item::new(u128::try_from(i).unwrap() + 1, name);
            item.kind = kind;
            item.rating = rating;
            item.open = open;
            items.push(item);
        }
        let db = setup_items(&items).await;

        for (pairs, exp_names) in [
            (vec![("kind", "Thai")], vec!["a", "b"]),
            (vec![("rating[gte]", "4")], vec!["a", "c", "d"]),
            (vec![("rating[gt]", "4")], vec!["a", "d"]),
            (vec![("rating[lt]", "4")], vec!["b"]),
            (vec![("rating[lte]", "4")], vec!["b", "c"]),
            (vec![("rating[gte]", "4"), ("rating[lt]", "5")], vec!["a", "c"]),
            (vec![("kind[ne]", "Thai")], vec!["c", "d"]),
            (vec![("kind[in]", "Italian,Thai")], vec!["a", "b", "c"]),
            (vec![("open", "true")], vec!["a", "c"]),
            (vec![("kind", "Thai"), ("open", "false")], vec!["b"]),
            (vec![("id", "00000000-0000-0000-0000-000000000003")], vec!["c"]),
            (vec![("createdAt[gt]", "1970-01-12T13:46:42Z")], vec!["c", "d"]),
            (vec![("createdAt[gt]", "1960-01-01T00:00:00Z")], vec!["a", "b", "c", "d"]),
            (vec![("foo[bogus]", "1")], vec![]),
            (vec![("secret", "shh")], vec![]),
            (vec![("rating", "high")], vec![]),
        ] {
            let mut pairs = pairs.clone();
            pairs.push(("sort", "name"));
            let envelope = query(&db, &pairs).await;
            assert_eq!(exp_names, names(&envelope), "Query was {:?}", pairs);
            assert_eq!(exp_names.len(), envelope.count);
        }

        db.close().await;
    }

    #[tokio::test]
    async fn test_sort_with_tie_break() {
        let mut items = vec![];
        for (id, name, rating) in [(4, "x", 3.0), (2, "y", 5.0), (3, "z", 3.0), (1, "w", 3.0)] {
            let mut item = Item::new(id, name);
            item.rating = rating;
            items.push(item);
        }
        let db = setup_items(&items).await;

        let envelope = query(&db, &[("sort", "-rating")]).await;
        assert_eq!(vec!["y", "w", "z", "x"], names(&envelope));

        let envelope = query(&db, &[("sort", "rating,-name")]).await;
        assert_eq!(vec!["z", "x", "w", "y"], names(&envelope));

        let envelope = query(&db, &[("sort", "bogus")]).await;
        assert_eq!(vec!["w", "y", "z", "x"], names(&envelope));

        db.close().await;
    }

    #[tokio::test]
    async fn test_select() {
        let db = setup_items(&[Item::new(1, "first")]).await;

        let envelope = query(&db, &[("select", "name,votes,secret,bogus")]).await;
        assert_eq!(
            vec![json!({
                "id": "00000000-0000-0000-0000-000000000001",
                "name": "first",
                "votes": 0,
            })],
            envelope.data.into_iter().map(serde_json::Value::Object).collect::<Vec<_>>()
        );

        db.close().await;
    }

    #[tokio::test]
    async fn test_select_exclusions() {
        let db = setup_items(&[Item::new(1, "first")]).await;

        let envelope = query(&db, &[("select", "-kind,-rating,-createdAt,-id,-bogus")]).await;
        assert_eq!(
            vec![json!({
                "id": "00000000-0000-0000-0000-000000000001",
                "name": "first",
                "votes": 0,
                "open": false,
            })],
            envelope.data.into_iter().map(serde_json::Value::Object).collect::<Vec<_>>()
        );

        db.close().await;
    }

    #[tokio::test]
    async fn test_pagination_boundaries() {
        let items: Vec<Item> = (1..=25).map(|i| Item::new(i, "item")).collect();
        let db = setup_items(&items).await;

        let envelope = query(&db, &[("page", "3"), ("limit", "10"), ("sort", "votes")]).await;
        assert_eq!(5, envelope.count);
        assert_eq!(
            Pagination { previous: Some(PageLink { page: 2, limit: 10 }), next: None },
            envelope.pagination
        );
        assert_eq!(
            "00000000-0000-0000-0000-000000000015",
            envelope.data[0]["id"].as_str().unwrap()
        );

        let envelope = query(&db, &[("page", "1"), ("limit", "10")]).await;
        assert_eq!(10, envelope.count);
        assert_eq!(
            Pagination { previous: None, next: Some(PageLink { page: 2, limit: 10 }) },
            envelope.pagination
        );

        let envelope = query(&db, &[]).await;
        assert_eq!(25, envelope.count);
        assert_eq!(Pagination::default(), envelope.pagination);

        db.close().await;
    }

    #[tokio::test]
    async fn test_total_count_reflects_only_filters() {
        let mut items = vec![];
        for i in 1..=12 {
            let mut item = Item::new(i, "item");
            item.open = i % 2 == 0;
            items.push(item);
        }
        let db = setup_items(&items).await;

        let envelope =
            query(&db, &[("open", "true"), ("limit", "5"), ("select", "name"), ("sort", "-id")])
                .await;
        assert_eq!(5, envelope.count);
        assert_eq!(Some(PageLink { page: 2, limit: 5 }), envelope.pagination.next);

        let envelope = query(&db, &[("open", "true"), ("limit", "5"), ("page", "2")]).await;
        assert_eq!(1, envelope.count);
        assert_eq!(None, envelope.pagination.next);

        db.close().await;
    }

    #[tokio::test]
    async fn test_query_is_idempotent() {
        let items: Vec<Item> = (1..=7).map(|i| Item::new(i, "same")).collect();
        let db = setup_items(&items).await;

        let pairs = [("name", "same"), ("sort", "name"), ("limit", "3"), ("page", "2")];
        let first = query(&db, &pairs).await;
        let second = query(&db, &pairs).await;
        assert_eq!(first, second);

        db.close().await;
    }
}
