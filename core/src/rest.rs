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

//! Building blocks shared by the REST layer of every service.
//!
//! A service exposes its HTTP surface through an `app` function in its `rest` module that
//! returns the `Router` for the whole API.  Each endpoint lives in a file named after the entity
//! it acts on and the HTTP method it serves (`<entity>_<method>.rs`), and that file's `tests`
//! module covers only that endpoint.  A `route` helper in those tests names the method and path
//! under test once.
//!
//! Failures are returned as `RestError`, which renders as a JSON `ErrorResponse` with the
//! matching status code.

use crate::driver::DriverError;
use crate::model::ModelError;
use async_trait::async_trait;
use axum::Json;
use axum::body::HttpBody;
use axum::extract::{FromRequest, Request};
use axum::http::header::AsHeaderName;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

/// Errors reported to API clients.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RestError {
    /// Indicates an authorization problem.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Catch-all error type for all unexpected errors.
    #[error("{0}")]
    InternalError(String),

    /// Indicates an error in the contents of the request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Indicates that a requested entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Indicates that a request that should have empty content did not.
    #[error("Content should be empty")]
    PayloadNotEmpty,

    /// Indicates an authentication problem.  Clients should retry with a bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl RestError {
    /// Returns the HTTP status code that represents this error.
    fn status(&self) -> StatusCode {
        match self {
            RestError::Forbidden(_) => StatusCode::FORBIDDEN,
            RestError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RestError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RestError::NotFound(_) => StatusCode::NOT_FOUND,
            RestError::PayloadNotEmpty => StatusCode::PAYLOAD_TOO_LARGE,
            RestError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<DriverError> for RestError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::AlreadyExists(_) => RestError::InvalidRequest(e.to_string()),
            DriverError::BackendError(_) => RestError::InternalError(e.to_string()),
            DriverError::Forbidden(_) => RestError::Forbidden(e.to_string()),
            DriverError::InvalidInput(_) => RestError::InvalidRequest(e.to_string()),
            DriverError::NotFound(_) => RestError::NotFound(e.to_string()),
            DriverError::Unauthorized(_) => RestError::Unauthorized(e.to_string()),
        }
    }
}

impl From<ModelError> for RestError {
    fn from(e: ModelError) -> Self {
        RestError::InvalidRequest(e.to_string())
    }
}

impl From<serde_json::Error> for RestError {
    fn from(e: serde_json::Error) -> Self {
        RestError::InvalidRequest(e.to_string())
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        let mut headers = HeaderMap::new();
        if let RestError::Unauthorized(_) = self {
            headers.insert(http::header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        let response = ErrorResponse {
            status: if status.is_client_error() { "fail" } else { "error" }.to_owned(),
            message: self.to_string(),
        };

        (status, headers, Json(response)).into_response()
    }
}

/// Result type for this module.
pub type RestResult<T> = Result<T, RestError>;

/// Representation of the details of an error response.
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    /// Either `fail` for errors caused by the client or `error` for errors caused by the server.
    pub status: String,

    /// Textual representation of the error message.
    pub message: String,
}

/// Extractor for endpoints that take no request body.  Rejects any request that carries one.
pub struct EmptyBody {}

#[async_trait]
impl<S> FromRequest<S> for EmptyBody
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        if req.into_body().is_end_stream() {
            Ok(EmptyBody {})
        } else {
            Err(RestError::PayloadNotEmpty)
        }
    }
}

/// Looks up header `name`, failing if the request carries it more than once.
pub fn get_unique_header<K: AsHeaderName + Copy>(
    headers: &HeaderMap,
    name: K,
) -> RestResult<Option<&HeaderValue>> {
    let mut iter = headers.get_all(name).iter();
    let value = iter.next();
    if iter.next().is_some() {
        return Err(RestError::InvalidRequest(format!(
            "Header {} cannot have more than one value",
            name.as_str()
        )));
    }
    Ok(value)
}

/// Helpers to drive an app in tests without opening a socket.
#[cfg(feature = "testutils")]
pub mod testutils {
    use super::*;
    use axum::Router;
    use axum::http::{self, HeaderName};
    use serde::de::DeserializeOwned;
    use std::fmt;
    use tower::util::ServiceExt;

    /// Maximum body size for testing purposes.  Large enough to hold a full page of results.
    const MAX_BODY_SIZE: usize = 64 * 1024;

    /// Builds one request and sends it straight to a `Router`.
    #[must_use]
    pub struct OneShotBuilder {
        /// The router for the app being tested.
        app: Router,

        /// Builder for the request that will be sent to the app.
        builder: axum::http::request::Builder,
    }

    impl OneShotBuilder {
        /// Starts a `method` request to `uri` that will be served by `app`.
        pub fn new<U: AsRef<str>>(app: Router, (method, uri): (http::Method, U)) -> Self {
            let builder = Request::builder().method(method).uri(uri.as_ref());
            Self { app, builder }
        }

        /// Appends `query`, a sequence of key/value pairs, to the request URI.
        ///
        /// Keys may repeat and may carry bracketed operators such as `rating[gte]`.
        pub fn with_query<Q: Serialize>(mut self, query: Q) -> Self {
            let uri = self.builder.uri_ref().unwrap().to_string();
            assert!(!uri.contains('?'), "URI already contains a query: {}", uri);
            self.builder = self.builder.uri(format!(
                "{}?{}",
                uri,
                serde_urlencoded::to_string(query).unwrap()
            ));
            self
        }

        /// Adds bearer authentication to the request.
        pub fn with_bearer_auth<T>(mut self, token: T) -> Self
        where
            T: fmt::Display,
        {
            let value = format!("Bearer {}", token);
            self.builder = self.builder.header(http::header::AUTHORIZATION, value);
            self
        }

        /// Sets the header `name` to `value` in the outgoing request.
        pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
        where
            HeaderName: TryFrom<K>,
            <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
            HeaderValue: TryFrom<V>,
            <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
        {
            self.builder = self.builder.header(name, value);
            self
        }

        /// Attaches `body`, tagged with `content_type` if any, and sends the request.
        async fn send(
            mut self,
            body: axum::body::Body,
            content_type: Option<&mime::Mime>,
        ) -> ResponseChecker {
            if let Some(content_type) = content_type {
                let content_type = content_type.as_ref();
                self.builder = self.builder.header(http::header::CONTENT_TYPE, content_type);
            }
            let request = self.builder.body(body).unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }

        /// Sends the request without a body.
        pub async fn send_empty(self) -> ResponseChecker {
            self.send(axum::body::Body::empty(), None).await
        }

        /// Sends the request with a `text/plain` body.
        pub async fn send_text<T: Into<String>>(self, text: T) -> ResponseChecker {
            self.send(axum::body::Body::from(text.into()), Some(&mime::TEXT_PLAIN)).await
        }

        /// Sends the request with `request` serialized as its JSON body.
        pub async fn send_json<T: Serialize>(self, request: T) -> ResponseChecker {
            let body = serde_json::to_vec(&request).unwrap();
            self.send(axum::body::Body::from(body), Some(&mime::APPLICATION_JSON)).await
        }
    }

    /// Response produced by `Router::oneshot`.
    type HttpResponse = hyper::Response<axum::body::Body>;

    /// Assertions over the response to a `OneShotBuilder` request.
    #[must_use]
    pub struct ResponseChecker {
        /// Actual response that we received from the app.
        response: HttpResponse,

        /// Expected HTTP status code in the response above.
        exp_status: http::StatusCode,
    }

    impl From<HttpResponse> for ResponseChecker {
        fn from(response: HttpResponse) -> Self {
            Self { response, exp_status: http::StatusCode::OK }
        }
    }

    impl ResponseChecker {
        /// Overrides the expected status code, which is `200 OK` by default.
        pub fn expect_status(mut self, status: http::StatusCode) -> Self {
            self.exp_status = status;
            self
        }

        /// Expects header `name` to be present once with exactly `exp_value`.
        pub fn expect_header(self, name: &str, exp_value: &str) -> Self {
            let value = get_unique_header(self.response.headers(), name)
                .unwrap()
                .unwrap_or_else(|| panic!("Header {} not present", name));
            assert_eq!(exp_value.as_bytes(), value.as_bytes());
            self
        }

        /// Checks the status code and returns the body as a string.
        async fn body_text(self) -> String {
            assert_eq!(self.exp_status, self.response.status());
            let body = self.response.into_body();
            let body = axum::body::to_bytes(body, MAX_BODY_SIZE).await.unwrap();
            String::from_utf8(body.to_vec()).unwrap()
        }

        /// Expects the response body to be empty.
        pub async fn expect_empty(self) {
            let body = self.body_text().await;
            assert!(body.is_empty(), "Body not empty; got {}", body);
        }

        /// Expects the response body to be an `ErrorResponse` whose message matches `exp_re`.
        ///
        /// The `status` field must say `error` for server errors and `fail` for anything else.
        pub async fn expect_error(self, exp_re: &str) {
            let exp_kind = if self.exp_status.is_server_error() { "error" } else { "fail" };
            let response: ErrorResponse = self.expect_json().await;
            assert_eq!(exp_kind, response.status);
            let re = regex::Regex::new(exp_re).unwrap();
            assert!(
                re.is_match(&response.message),
                "Error message '{}' does not match re '{}'",
                response.message,
                exp_re
            );
        }

        /// Expects the response body to be a JSON document that deserializes into `T`.
        pub async fn expect_json<T: DeserializeOwned>(self) -> T {
            let body = self.body_text().await;
            match serde_json::from_str::<T>(&body) {
                Ok(value) => value,
                Err(e) => panic!("Invalid JSON response due to {}; content was {}", e, body),
            }
        }

        /// Expects the response body to be plain text matching `exp_re`.
        ///
        /// Bodies produced by `RestError` are JSON and must be checked with `expect_error`.
        pub async fn expect_text(self, exp_re: &str) {
            assert!(!exp_re.is_empty(), "Use expect_empty to validate empty responses");
            let body = self.body_text().await;
            assert!(
                serde_json::from_str::<ErrorResponse>(&body).is_err(),
                "Use expect_error to validate errors wrapped in an ErrorResponse"
            );
            let re = regex::Regex::new(exp_re).unwrap();
            assert!(re.is_match(&body), "Body content '{}' does not match re '{}'", body, exp_re);
        }
    }

    /// Defines a test checking that the endpoint at `route` rejects bodies that are not JSON.
    ///
    /// axum rejects these requests before they reach our handlers, so the bodies are plain text.
    #[macro_export]
    macro_rules! test_payload_must_be_json {
        ( $app:expr, $route:expr ) => {
            #[tokio::test]
            async fn test_payload_must_be_json() {
                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .send_text("this is not json")
                    .await
                    .expect_status(axum::http::StatusCode::UNSUPPORTED_MEDIA_TYPE)
                    .expect_text("Content-Type")
                    .await;

                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .with_header(axum::http::header::CONTENT_TYPE, "application/json")
                    .send_text("this is not json")
                    .await
                    .expect_status(axum::http::StatusCode::BAD_REQUEST)
                    .expect_text("expected ident")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_json;

    /// Defines a test checking that the endpoint at `route` rejects requests that carry a body.
    #[macro_export]
    macro_rules! test_payload_must_be_empty {
        ( $app:expr, $route:expr ) => {
            #[tokio::test]
            async fn test_payload_must_be_empty() {
                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .send_text("should not be here")
                    .await
                    .expect_status(axum::http::StatusCode::PAYLOAD_TOO_LARGE)
                    .expect_error("should be empty")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_empty;
}
