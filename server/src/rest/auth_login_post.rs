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

//! API to log into an existing account.

use crate::driver::{Credentials, Driver};
use crate::rest::TokenResponse;
use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use forkful_core::rest::RestError;

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse, RestError> {
    let session = driver.login(credentials).await?;
    Ok(Json(TokenResponse::new(session.take_access_token())))
}
