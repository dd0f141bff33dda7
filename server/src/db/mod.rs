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

//! Database abstraction to manipulate restaurants, reviews, users and sessions.

use crate::model::{
    AccessToken, CuisineStats, HashedPassword, Rating, RatingsSummary, Restaurant, RestaurantId,
    Review, ReviewId, ReviewText, Role, Session, User, UserId,
};
#[cfg(feature = "postgres")]
use forkful_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use forkful_core::db::sqlite::{self, build_timestamp, unpack_timestamp};
use forkful_core::db::{DbError, DbResult, Executor};
use forkful_core::model::EmailAddress;
use forkful_core::query::{Field, FieldKind, SqlCollection};
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;
use time::OffsetDateTime;
use uuid::Uuid;


/// Fields of restaurants that list queries can use.
static RESTAURANT_FIELDS: &[Field] = &[
    Field::new("id", "id", FieldKind::Uuid),
    Field::new("name", "name", FieldKind::Text),
    Field::new("slug", "slug", FieldKind::Text),
    Field::new("description", "description", FieldKind::Text),
    Field::new("website", "website", FieldKind::Text),
    Field::new("phone", "phone", FieldKind::Text),
    Field::new("address", "address", FieldKind::Text),
    Field::new("suburb", "suburb", FieldKind::Text),
    Field::new("cuisine", "cuisine", FieldKind::Text),
    Field::new("ratingsAverage", "ratings_average", FieldKind::Real),
    Field::new("ratingsQuantity", "ratings_quantity", FieldKind::Integer),
    Field::new("delivery", "delivery", FieldKind::Boolean),
    Field::new("takeaway", "takeaway", FieldKind::Boolean),
    Field::new("cashOnly", "cash_only", FieldKind::Boolean),
    Field::new("wheelchairAccessible", "wheelchair_accessible", FieldKind::Boolean),
    Field::new("createdAt", "created_at", FieldKind::Timestamp),
    Field::new("user", "user_id", FieldKind::Uuid),
];

/// Collection of all restaurants.
pub(crate) static RESTAURANTS: SqlCollection = SqlCollection::new("restaurants", RESTAURANT_FIELDS);

/// Fields of reviews that list queries can use.
static REVIEW_FIELDS: &[Field] = &[
    Field::new("id", "id", FieldKind::Uuid),
    Field::new("review", "review", FieldKind::Text),
    Field::new("rating", "rating", FieldKind::Integer),
    Field::new("createdAt", "created_at", FieldKind::Timestamp),
    Field::new("restaurant", "restaurant_id", FieldKind::Uuid),
    Field::new("user", "user_id", FieldKind::Uuid),
];

/// Collection of all reviews.
pub(crate) static REVIEWS: SqlCollection = SqlCollection::new("reviews", REVIEW_FIELDS);

/// Fields of users that list queries can use.  The password hash is never exposed.
static USER_FIELDS: &[Field] = &[
    Field::new("id", "id", FieldKind::Uuid),
    Field::new("name", "name", FieldKind::Text),
    Field::new("email", "email", FieldKind::Text),
    Field::new("role", "role", FieldKind::Text),
    Field::new("password", "password", FieldKind::Text).hidden(),
    Field::new("createdAt", "created_at", FieldKind::Timestamp),
];

/// Collection of all users.
pub(crate) static USERS: SqlCollection = SqlCollection::new("users", USER_FIELDS);

/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    }
}

/// Checks that a modification touched exactly one row.
fn expect_one_row(rows_affected: u64) -> DbResult<()> {
    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Operation affected more than one row".to_owned())),
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for User {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: Uuid = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(postgres::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(postgres::map_sqlx_error)?;
        let role: String = row.try_get("role").map_err(postgres::map_sqlx_error)?;
        let password: String = row.try_get("password").map_err(postgres::map_sqlx_error)?;
        let created_at: OffsetDateTime =
            row.try_get("created_at").map_err(postgres::map_sqlx_error)?;

        Ok(User::new(
            UserId::from(id),
            name,
            EmailAddress::new(email)?,
            Role::parse(&role)?,
            HashedPassword::new(password),
            created_at,
        )?)
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Session {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let access_token: String = row.try_get("access_token").map_err(postgres::map_sqlx_error)?;
        let user_id: Uuid = row.try_get("user_id").map_err(postgres::map_sqlx_error)?;
        let login_time: OffsetDateTime =
            row.try_get("login_time").map_err(postgres::map_sqlx_error)?;

        Ok(Session::new(AccessToken::new(access_token)?, UserId::from(user_id), login_time))
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Restaurant {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: Uuid = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let created_at: OffsetDateTime =
            row.try_get("created_at").map_err(postgres::map_sqlx_error)?;
        let user_id: Uuid = row.try_get("user_id").map_err(postgres::map_sqlx_error)?;

        Ok(Restaurant {
            id: RestaurantId::from(id),
            name: row.try_get("name").map_err(postgres::map_sqlx_error)?,
            slug: row.try_get("slug").map_err(postgres::map_sqlx_error)?,
            description: row.try_get("description").map_err(postgres::map_sqlx_error)?,
            website: row.try_get("website").map_err(postgres::map_sqlx_error)?,
            phone: row.try_get("phone").map_err(postgres::map_sqlx_error)?,
            address: row.try_get("address").map_err(postgres::map_sqlx_error)?,
            suburb: row.try_get("suburb").map_err(postgres::map_sqlx_error)?,
            cuisine: row.try_get("cuisine").map_err(postgres::map_sqlx_error)?,
            ratings_average: row.try_get("ratings_average").map_err(postgres::map_sqlx_error)?,
            ratings_quantity: row.try_get("ratings_quantity").map_err(postgres::map_sqlx_error)?,
            delivery: row.try_get("delivery").map_err(postgres::map_sqlx_error)?,
            takeaway: row.try_get("takeaway").map_err(postgres::map_sqlx_error)?,
            cash_only: row.try_get("cash_only").map_err(postgres::map_sqlx_error)?,
            wheelchair_accessible: row
                .try_get("wheelchair_accessible")
                .map_err(postgres::map_sqlx_error)?,
            created_at,
            user: UserId::from(user_id),
        })
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Review {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: Uuid = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let review: String = row.try_get("review").map_err(postgres::map_sqlx_error)?;
        let rating: i64 = row.try_get("rating").map_err(postgres::map_sqlx_error)?;
        let created_at: OffsetDateTime =
            row.try_get("created_at").map_err(postgres::map_sqlx_error)?;
        let restaurant_id: Uuid = row.try_get("restaurant_id").map_err(postgres::map_sqlx_error)?;
        let user_id: Uuid = row.try_get("user_id").map_err(postgres::map_sqlx_error)?;

        Ok(Review {
            id: ReviewId::from(id),
            review: ReviewText::new(review)?,
            rating: Rating::new(rating)?,
            created_at,
            restaurant: RestaurantId::from(restaurant_id),
            user: UserId::from(user_id),
        })
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for User {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: Uuid = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(sqlite::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(sqlite::map_sqlx_error)?;
        let role: String = row.try_get("role").map_err(sqlite::map_sqlx_error)?;
        let password: String = row.try_get("password").map_err(sqlite::map_sqlx_error)?;
        let created_at: i64 = row.try_get("created_at").map_err(sqlite::map_sqlx_error)?;

        Ok(User::new(
            UserId::from(id),
            name,
            EmailAddress::new(email)?,
            Role::parse(&role)?,
            HashedPassword::new(password),
            build_timestamp(created_at)?,
        )?)
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Session {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let access_token: String = row.try_get("access_token").map_err(sqlite::map_sqlx_error)?;
        let user_id: Uuid = row.try_get("user_id").map_err(sqlite::map_sqlx_error)?;
        let login_time: i64 = row.try_get("login_time").map_err(sqlite::map_sqlx_error)?;

        Ok(Session::new(
            AccessToken::new(access_token)?,
            UserId::from(user_id),
            build_timestamp(login_time)?,
        ))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Restaurant {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: Uuid = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let created_at: i64 = row.try_get("created_at").map_err(sqlite::map_sqlx_error)?;
        let user_id: Uuid = row.try_get("user_id").map_err(sqlite::map_sqlx_error)?;

        Ok(Restaurant {
            id: RestaurantId::from(id),
            name: row.try_get("name").map_err(sqlite::map_sqlx_error)?,
            slug: row.try_get("slug").map_err(sqlite::map_sqlx_error)?,
            description: row.try_get("description").map_err(sqlite::map_sqlx_error)?,
            website: row.try_get("website").map_err(sqlite::map_sqlx_error)?,
            phone: row.try_get("phone").map_err(sqlite::map_sqlx_error)?,
            address: row.try_get("address").map_err(sqlite::map_sqlx_error)?,
            suburb: row.try_get("suburb").map_err(sqlite::map_sqlx_error)?,
            cuisine: row.try_get("cuisine").map_err(sqlite::map_sqlx_error)?,
            ratings_average: row.try_get("ratings_average").map_err(sqlite::map_sqlx_error)?,
            ratings_quantity: row.try_get("ratings_quantity").map_err(sqlite::map_sqlx_error)?,
            delivery: row.try_get("delivery").map_err(sqlite::map_sqlx_error)?,
            takeaway: row.try_get("takeaway").map_err(sqlite::map_sqlx_error)?,
            cash_only: row.try_get("cash_only").map_err(sqlite::map_sqlx_error)?,
            wheelchair_accessible: row
                .try_get("wheelchair_accessible")
                .map_err(sqlite::map_sqlx_error)?,
            created_at: build_timestamp(created_at)?,
            user: UserId::from(user_id),
        })
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Review {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: Uuid = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let review: String = row.try_get("review").map_err(sqlite::map_sqlx_error)?;
        let rating: i64 = row.try_get("rating").map_err(sqlite::map_sqlx_error)?;
        let created_at: i64 = row.try_get("created_at").map_err(sqlite::map_sqlx_error)?;
        let restaurant_id: Uuid = row.try_get("restaurant_id").map_err(sqlite::map_sqlx_error)?;
        let user_id: Uuid = row.try_get("user_id").map_err(sqlite::map_sqlx_error)?;

        Ok(Review {
            id: ReviewId::from(id),
            review: ReviewText::new(review)?,
            rating: Rating::new(rating)?,
            created_at: build_timestamp(created_at)?,
            restaurant: RestaurantId::from(restaurant_id),
            user: UserId::from(user_id),
        })
    }
}

/// Creates a new `user`.  Fails with `AlreadyExists` if the email address is already taken.
pub(crate) async fn create_user(ex: &mut Executor, user: &User) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO users (id, name, email, role, password, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)";
            let done = sqlx::query(query_str)
                .bind(user.id().as_uuid())
                .bind(user.name())
                .bind(user.email().as_str())
                .bind(user.role().as_str())
                .bind(user.password().as_str())
                .bind(user.created_at())
                .execute(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO users (id, name, email, role, password, created_at)
                VALUES (?, ?, ?, ?, ?, ?)";
            let done = sqlx::query(query_str)
                .bind(user.id().as_uuid())
                .bind(user.name())
                .bind(user.email().as_str())
                .bind(user.role().as_str())
                .bind(user.password().as_str())
                .bind(unpack_timestamp(user.created_at()))
                .execute(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    };
    expect_one_row(rows_affected)
}

/// Gets the user identified by `id`.
pub(crate) async fn get_user(ex: &mut Executor, id: UserId) -> DbResult<User> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let raw_user = sqlx::query("SELECT * FROM users WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            User::try_from(raw_user)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let raw_user = sqlx::query("SELECT * FROM users WHERE id = ?")
                .bind(id.as_uuid())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            User::try_from(raw_user)
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    }
}

/// Gets the user whose email address is `email`.
pub(crate) async fn get_user_by_email(ex: &mut Executor, email: &EmailAddress) -> DbResult<User> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let raw_user = sqlx::query("SELECT * FROM users WHERE email = $1")
                .bind(email.as_str())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            User::try_from(raw_user)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let raw_user = sqlx::query("SELECT * FROM users WHERE email = ?")
                .bind(email.as_str())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            User::try_from(raw_user)
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    }
}

/// Stores the modifiable details of an existing `user`: name, email, role and password.
pub(crate) async fn update_user(ex: &mut Executor, user: &User) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE users SET name = $1, email = $2, role = $3, password = $4
                WHERE id = $5";
            let done = sqlx::query(query_str)
                .bind(user.name())
                .bind(user.email().as_str())
                .bind(user.role().as_str())
                .bind(user.password().as_str())
                .bind(user.id().as_uuid())
                .execute(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE users SET name = ?, email = ?, role = ?, password = ?
                WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(user.name())
                .bind(user.email().as_str())
                .bind(user.role().as_str())
                .bind(user.password().as_str())
                .bind(user.id().as_uuid())
                .execute(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    };
    expect_one_row(rows_affected)
}

/// Deletes the user identified by `id` along with all of its sessions.
pub(crate) async fn delete_user(ex: &mut Executor, id: UserId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            sqlx::query("DELETE FROM sessions WHERE user_id = $1")
                .bind(id.as_uuid())
                .execute(&mut *ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            let done = sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id.as_uuid())
                .execute(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            sqlx::query("DELETE FROM sessions WHERE user_id = ?")
                .bind(id.as_uuid())
                .execute(&mut *ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            let done = sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(id.as_uuid())
                .execute(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    };
    expect_one_row(rows_affected)
}

/// Saves a new `session`.
pub(crate) async fn put_session(ex: &mut Executor, session: &Session) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str =
                "INSERT INTO sessions (access_token, user_id, login_time) VALUES ($1, $2, $3)";
            let done = sqlx::query(query_str)
                .bind(session.access_token().as_str())
                .bind(session.user().as_uuid())
                .bind(session.login_time())
                .execute(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str =
                "INSERT INTO sessions (access_token, user_id, login_time) VALUES (?, ?, ?)";
            let done = sqlx::query(query_str)
                .bind(session.access_token().as_str())
                .bind(session.user().as_uuid())
                .bind(unpack_timestamp(session.login_time()))
                .execute(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    };
    expect_one_row(rows_affected)
}

/// Gets a session from its access token.  Sessions that have been terminated are ignored.
pub(crate) async fn get_session(
    ex: &mut Executor,
    access_token: &AccessToken,
) -> DbResult<Session> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT access_token, user_id, login_time
                FROM sessions
                WHERE access_token = $1 AND logout_time IS NULL";
            let raw_session = sqlx::query(query_str)
                .bind(access_token.as_str())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            Session::try_from(raw_session)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT access_token, user_id, login_time
                FROM sessions
                WHERE access_token = ? AND logout_time IS NULL";
            let raw_session = sqlx::query(query_str)
                .bind(access_token.as_str())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Session::try_from(raw_session)
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    }
}

/// Marks the session identified by `access_token` as terminated at `now`.
pub(crate) async fn delete_session(
    ex: &mut Executor,
    access_token: &AccessToken,
    now: OffsetDateTime,
) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE sessions SET logout_time = $1
                WHERE access_token = $2 AND logout_time IS NULL";
            let done = sqlx::query(query_str)
                .bind(now)
                .bind(access_token.as_str())
                .execute(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE sessions SET logout_time = ?
                WHERE access_token = ? AND logout_time IS NULL";
            let done = sqlx::query(query_str)
                .bind(unpack_timestamp(now))
                .bind(access_token.as_str())
                .execute(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    };
    expect_one_row(rows_affected)
}

/// Creates a new `restaurant`.  Fails with `AlreadyExists` if another restaurant with the same
/// name exists in the same suburb.
pub(crate) async fn create_restaurant(ex: &mut Executor, restaurant: &Restaurant) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO restaurants (
                    id, name, slug, description, website, phone, address, suburb, cuisine,
                    ratings_average, ratings_quantity,
                    delivery, takeaway, cash_only, wheelchair_accessible,
                    created_at, user_id
                ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17
                )";
            let done = sqlx::query(query_str)
                .bind(restaurant.id.as_uuid())
                .bind(&restaurant.name)
                .bind(&restaurant.slug)
                .bind(&restaurant.description)
                .bind(&restaurant.website)
                .bind(&restaurant.phone)
                .bind(&restaurant.address)
                .bind(&restaurant.suburb)
                .bind(&restaurant.cuisine)
                .bind(restaurant.ratings_average)
                .bind(restaurant.ratings_quantity)
                .bind(restaurant.delivery)
                .bind(restaurant.takeaway)
                .bind(restaurant.cash_only)
                .bind(restaurant.wheelchair_accessible)
                .bind(restaurant.created_at)
                .bind(restaurant.user.as_uuid())
                .execute(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO restaurants (
                    id, name, slug, description, website, phone, address, suburb, cuisine,
                    ratings_average, ratings_quantity,
                    delivery, takeaway, cash_only, wheelchair_accessible,
                    created_at, user_id
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
            let done = sqlx::query(query_str)
                .bind(restaurant.id.as_uuid())
                .bind(&restaurant.name)
                .bind(&restaurant.slug)
                .bind(&restaurant.description)
                .bind(&restaurant.website)
                .bind(&restaurant.phone)
                .bind(&restaurant.address)
                .bind(&restaurant.suburb)
                .bind(&restaurant.cuisine)
                .bind(restaurant.ratings_average)
                .bind(restaurant.ratings_quantity)
                .bind(restaurant.delivery)
                .bind(restaurant.takeaway)
                .bind(restaurant.cash_only)
                .bind(restaurant.wheelchair_accessible)
                .bind(unpack_timestamp(restaurant.created_at))
                .bind(restaurant.user.as_uuid())
                .execute(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    };
    expect_one_row(rows_affected)
}

/// Gets the restaurant identified by `id`.
pub(crate) async fn get_restaurant(ex: &mut Executor, id: RestaurantId) -> DbResult<Restaurant> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let raw_restaurant = sqlx::query("SELECT * FROM restaurants WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            Restaurant::try_from(raw_restaurant)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let raw_restaurant = sqlx::query("SELECT * FROM restaurants WHERE id = ?")
                .bind(id.as_uuid())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Restaurant::try_from(raw_restaurant)
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    }
}

/// Stores the client-modifiable details of an existing `restaurant`.  The ratings, the creation
/// time and the creator are left untouched.
pub(crate) async fn update_restaurant(ex: &mut Executor, restaurant: &Restaurant) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE restaurants SET
                    name = $1, slug = $2, description = $3, website = $4, phone = $5,
                    address = $6, suburb = $7, cuisine = $8,
                    delivery = $9, takeaway = $10, cash_only = $11, wheelchair_accessible = $12
                WHERE id = $13";
            let done = sqlx::query(query_str)
                .bind(&restaurant.name)
                .bind(&restaurant.slug)
                .bind(&restaurant.description)
                .bind(&restaurant.website)
                .bind(&restaurant.phone)
                .bind(&restaurant.address)
                .bind(&restaurant.suburb)
                .bind(&restaurant.cuisine)
                .bind(restaurant.delivery)
                .bind(restaurant.takeaway)
                .bind(restaurant.cash_only)
                .bind(restaurant.wheelchair_accessible)
                .bind(restaurant.id.as_uuid())
                .execute(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE restaurants SET
                    name = ?, slug = ?, description = ?, website = ?, phone = ?,
                    address = ?, suburb = ?, cuisine = ?,
                    delivery = ?, takeaway = ?, cash_only = ?, wheelchair_accessible = ?
                WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(&restaurant.name)
                .bind(&restaurant.slug)
                .bind(&restaurant.description)
                .bind(&restaurant.website)
                .bind(&restaurant.phone)
                .bind(&restaurant.address)
                .bind(&restaurant.suburb)
                .bind(&restaurant.cuisine)
                .bind(restaurant.delivery)
                .bind(restaurant.takeaway)
                .bind(restaurant.cash_only)
                .bind(restaurant.wheelchair_accessible)
                .bind(restaurant.id.as_uuid())
                .execute(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    };
    expect_one_row(rows_affected)
}

/// Deletes the restaurant identified by `id` and all of its reviews.
pub(crate) async fn delete_restaurant(ex: &mut Executor, id: RestaurantId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            sqlx::query("DELETE FROM reviews WHERE restaurant_id = $1")
                .bind(id.as_uuid())
                .execute(&mut *ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            let done = sqlx::query("DELETE FROM restaurants WHERE id = $1")
                .bind(id.as_uuid())
                .execute(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            sqlx::query("DELETE FROM reviews WHERE restaurant_id = ?")
                .bind(id.as_uuid())
                .execute(&mut *ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            let done = sqlx::query("DELETE FROM restaurants WHERE id = ?")
                .bind(id.as_uuid())
                .execute(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    };
    expect_one_row(rows_affected)
}

/// Recomputes the ratings of the restaurant identified by `id` from its reviews and stores them.
pub(crate) async fn update_restaurant_ratings(
    ex: &mut Executor,
    id: RestaurantId,
) -> DbResult<RatingsSummary> {
    let (summary, rows_affected) = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT COUNT(*) AS quantity, AVG(rating)::DOUBLE PRECISION AS average
                FROM reviews WHERE restaurant_id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_uuid())
                .fetch_one(&mut *ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            let quantity: i64 = row.try_get("quantity").map_err(postgres::map_sqlx_error)?;
            let average: Option<f64> = row.try_get("average").map_err(postgres::map_sqlx_error)?;
            let summary = RatingsSummary::new(quantity, average);

            let query_str = "
                UPDATE restaurants SET ratings_average = $1, ratings_quantity = $2
                WHERE id = $3";
            let done = sqlx::query(query_str)
                .bind(summary.average)
                .bind(summary.quantity)
                .bind(id.as_uuid())
                .execute(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            (summary, done.rows_affected())
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT COUNT(*) AS quantity, AVG(rating) AS average
                FROM reviews WHERE restaurant_id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_uuid())
                .fetch_one(&mut *ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            let quantity: i64 = row.try_get("quantity").map_err(sqlite::map_sqlx_error)?;
            let average: Option<f64> = row.try_get("average").map_err(sqlite::map_sqlx_error)?;
            let summary = RatingsSummary::new(quantity, average);

            let query_str = "
                UPDATE restaurants SET ratings_average = ?, ratings_quantity = ?
                WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(summary.average)
                .bind(summary.quantity)
                .bind(id.as_uuid())
                .execute(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            (summary, done.rows_affected())
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    };
    expect_one_row(rows_affected)?;
    Ok(summary)
}

/// Creates a new `review`.
pub(crate) async fn create_review(ex: &mut Executor, review: &Review) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO reviews (id, review, rating, created_at, restaurant_id, user_id)
                VALUES ($1, $2, $3, $4, $5, $6)";
            let done = sqlx::query(query_str)
                .bind(review.id.as_uuid())
                .bind(review.review.as_str())
                .bind(review.rating.as_i64())
                .bind(review.created_at)
                .bind(review.restaurant.as_uuid())
                .bind(review.user.as_uuid())
                .execute(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO reviews (id, review, rating, created_at, restaurant_id, user_id)
                VALUES (?, ?, ?, ?, ?, ?)";
            let done = sqlx::query(query_str)
                .bind(review.id.as_uuid())
                .bind(review.review.as_str())
                .bind(review.rating.as_i64())
                .bind(unpack_timestamp(review.created_at))
                .bind(review.restaurant.as_uuid())
                .bind(review.user.as_uuid())
                .execute(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    };
    expect_one_row(rows_affected)
}

/// Gets the review identified by `id`.
pub(crate) async fn get_review(ex: &mut Executor, id: ReviewId) -> DbResult<Review> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let raw_review = sqlx::query("SELECT * FROM reviews WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            Review::try_from(raw_review)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let raw_review = sqlx::query("SELECT * FROM reviews WHERE id = ?")
                .bind(id.as_uuid())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Review::try_from(raw_review)
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    }
}

/// Stores the text and the rating of an existing `review`.
pub(crate) async fn update_review(ex: &mut Executor, review: &Review) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let done = sqlx::query("UPDATE reviews SET review = $1, rating = $2 WHERE id = $3")
                .bind(review.review.as_str())
                .bind(review.rating.as_i64())
                .bind(review.id.as_uuid())
                .execute(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let done = sqlx::query("UPDATE reviews SET review = ?, rating = ? WHERE id = ?")
                .bind(review.review.as_str())
                .bind(review.rating.as_i64())
                .bind(review.id.as_uuid())
                .execute(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    };
    expect_one_row(rows_affected)
}

/// Deletes the review identified by `id`.
pub(crate) async fn delete_review(ex: &mut Executor, id: ReviewId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let done = sqlx::query("DELETE FROM reviews WHERE id = $1")
                .bind(id.as_uuid())
                .execute(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let done = sqlx::query("DELETE FROM reviews WHERE id = ?")
                .bind(id.as_uuid())
                .execute(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    };
    expect_one_row(rows_affected)
}

/// Computes rating statistics for every cuisine, best rated first.
pub(crate) async fn get_cuisine_stats(ex: &mut Executor) -> DbResult<Vec<CuisineStats>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT
                    cuisine,
                    COUNT(*) AS restaurants,
                    AVG(ratings_average) AS avg_rating,
                    MIN(ratings_average) AS min_rating,
                    MAX(ratings_average) AS max_rating,
                    SUM(ratings_quantity)::BIGINT AS ratings_quantity
                FROM restaurants
                GROUP BY cuisine
                ORDER BY avg_rating DESC, cuisine ASC";
            let rows =
                sqlx::query(query_str).fetch_all(ex).await.map_err(postgres::map_sqlx_error)?;
            let mut stats = Vec::with_capacity(rows.len());
            for row in rows {
                stats.push(CuisineStats::new(
                    row.try_get("cuisine").map_err(postgres::map_sqlx_error)?,
                    row.try_get("restaurants").map_err(postgres::map_sqlx_error)?,
                    row.try_get("avg_rating").map_err(postgres::map_sqlx_error)?,
                    row.try_get("min_rating").map_err(postgres::map_sqlx_error)?,
                    row.try_get("max_rating").map_err(postgres::map_sqlx_error)?,
                    row.try_get("ratings_quantity").map_err(postgres::map_sqlx_error)?,
                ));
            }
            Ok(stats)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT
                    cuisine,
                    COUNT(*) AS restaurants,
                    AVG(ratings_average) AS avg_rating,
                    MIN(ratings_average) AS min_rating,
                    MAX(ratings_average) AS max_rating,
                    SUM(ratings_quantity) AS ratings_quantity
                FROM restaurants
                GROUP BY cuisine
                ORDER BY avg_rating DESC, cuisine ASC";
            let rows = sqlx::query(query_str).fetch_all(ex).await.map_err(sqlite::map_sqlx_error)?;
            let mut stats = Vec::with_capacity(rows.len());
            for row in rows {
                stats.push(CuisineStats::new(
                    row.try_get("cuisine").map_err(sqlite::map_sqlx_error)?,
                    row.try_get("restaurants").map_err(sqlite::map_sqlx_error)?,
                    row.try_get("avg_rating").map_err(sqlite::map_sqlx_error)?,
                    row.try_get("min_rating").map_err(sqlite::map_sqlx_error)?,
                    row.try_get("max_rating").map_err(sqlite::map_sqlx_error)?,
                    row.try_get("ratings_quantity").map_err(sqlite::map_sqlx_error)?,
                ));
            }
            Ok(stats)
        }

        #[allow(unreachable_patterns)]
        _ => unreachable!("No database backends enabled"),
    }
}
