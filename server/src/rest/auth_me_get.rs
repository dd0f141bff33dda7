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

//! API to get the details of the caller.

use crate::driver::Driver;
use crate::rest::httputils::get_bearer_auth;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use forkful_core::query::DataEnvelope;
use forkful_core::rest::{EmptyBody, RestError};

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    headers: HeaderMap,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    let token = get_bearer_auth(&headers)?;
    let user = driver.whoami(token).await?;
    Ok(Json(DataEnvelope::new(user.as_ref().clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::rest::testutils::*;
    use axum::http;
    use forkful_core::rest::testutils::OneShotBuilder;
    use forkful_core::test_payload_must_be_empty;
    use serde_json::{Value, json};

    fn route() -> (http::Method, String) {
        (http::Method::GET, format!("{}/auth/me", API))
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;
        let (user, token) = context.create_logged_in_user("kim", Role::Owner).await;

        let response = OneShotBuilder::new(context.into_app(), route())
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_json::<DataEnvelope<Value>>()
            .await;
        assert_eq!("success", response.status);
        assert_eq!(json!(user.id().to_string()), response.data["id"]);
        assert_eq!(json!("kim"), response.data["name"]);
        assert_eq!(json!("owner"), response.data["role"]);
        assert!(response.data.get("password").is_none());
    }

    #[tokio::test]
    async fn test_not_logged_in() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.into_app(), route())
            .send_empty()
            .await
            .expect_status(http::StatusCode::UNAUTHORIZED)
            .expect_error("Please log in to get access")
            .await;
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route());
}
