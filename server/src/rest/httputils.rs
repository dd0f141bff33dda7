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

//! Helpers to extract details from requests.

use crate::model::{AccessToken, RestaurantId, ReviewId, UserId};
use axum::http::HeaderMap;
use forkful_core::model::ModelResult;
use forkful_core::rest::{RestError, RestResult, get_unique_header};

/// Extracts the access token from the bearer credentials in the `Authorization` header.
pub(crate) fn get_bearer_auth(headers: &HeaderMap) -> RestResult<AccessToken> {
    let authz = match get_unique_header(headers, "Authorization") {
        Ok(Some(value)) => value,
        Ok(None) => return Err(RestError::Unauthorized("Please log in to get access".to_owned())),
        Err(e) => return Err(RestError::Unauthorized(e.to_string())),
    };

    let authz = match authz.to_str() {
        Ok(value) => value,
        Err(e) => {
            return Err(RestError::Unauthorized(format!(
                "Bad encoding in Authorization header: {}",
                e
            )));
        }
    };

    let mut fields = authz.splitn(2, ' ');
    let scheme = match fields.next() {
        Some(s) if !s.is_empty() => s,
        _ => {
            return Err(RestError::Unauthorized(
                "Bad Authorization header: missing scheme".to_owned(),
            ));
        }
    };
    let payload = match fields.next() {
        Some(s) => s,
        None => {
            return Err(RestError::Unauthorized(
                "Bad Authorization header: missing payload".to_owned(),
            ));
        }
    };

    if scheme != "Bearer" {
        return Err(RestError::Unauthorized("Unsupported scheme".to_owned()));
    }

    AccessToken::new(payload).map_err(|e| RestError::Unauthorized(e.0))
}

/// Parses the path component `raw` as the identifier of an entity of kind `what`.
///
/// A malformed identifier cannot name any stored entity, so it is reported as missing.
fn parse_id<T>(raw: &str, what: &str, parse: fn(&str) -> ModelResult<T>) -> RestResult<T> {
    parse(raw).map_err(|_| {
        RestError::NotFound(format!("A {} with the id of '{}' is not found.", what, raw))
    })
}

/// Parses the path component `raw` as a restaurant identifier.
pub(crate) fn restaurant_id(raw: &str) -> RestResult<RestaurantId> {
    parse_id(raw, "restaurant", RestaurantId::parse)
}

/// Parses the path component `raw` as a review identifier.
pub(crate) fn review_id(raw: &str) -> RestResult<ReviewId> {
    parse_id(raw, "review", ReviewId::parse)
}

/// Parses the path component `raw` as a user identifier.
pub(crate) fn user_id(raw: &str) -> RestResult<UserId> {
    parse_id(raw, "user", UserId::parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_bearer_auth_ok() {
        let token = AccessToken::generate();

        let mut headers = HeaderMap::new();
        headers.append("Authorization", format!("Bearer {}", token.as_str()).parse().unwrap());
        assert_eq!(token, get_bearer_auth(&headers).unwrap());
    }

    /// Runs `get_bearer_auth` with an invalid set of header `values` and ensures that the call
    /// fails with an `Unauthorized` error that contains `exp_error` in the failure message.
    fn do_get_bearer_auth_error_test(exp_error: &str, values: &[&[u8]]) {
        let mut headers = HeaderMap::new();
        for value in values {
            headers.append("Authorization", HeaderValue::from_bytes(value).unwrap());
        }
        match get_bearer_auth(&headers) {
            Err(RestError::Unauthorized(message)) => assert!(
                message.contains(exp_error),
                "message '{}' does not contain '{}'",
                message,
                exp_error
            ),
            e => panic!("{:?}", e),
        }
    }

    #[test]
    fn test_get_bearer_auth_missing() {
        do_get_bearer_auth_error_test("Please log in", &[]);
    }

    #[test]
    fn test_get_bearer_auth_duplicate() {
        do_get_bearer_auth_error_test("cannot have more than one value", &[b"abc", b"def"]);
    }

    #[test]
    fn test_get_bearer_auth_invalid_encoding() {
        do_get_bearer_auth_error_test("Bad encoding in Authorization", &[b"bad \xc5 bytes"]);
    }

    #[test]
    fn test_get_bearer_auth_missing_scheme() {
        do_get_bearer_auth_error_test("missing scheme", &[b""]);
    }

    #[test]
    fn test_get_bearer_auth_missing_payload() {
        do_get_bearer_auth_error_test("missing payload", &[b"Bearer"]);
    }

    #[test]
    fn test_get_bearer_auth_unsupported_scheme() {
        do_get_bearer_auth_error_test("Unsupported scheme", &[b"Basic 123"]);
    }

    #[test]
    fn test_get_bearer_auth_invalid_token() {
        do_get_bearer_auth_error_test("Invalid access token", &[b"Bearer xxx"]);
    }

    #[test]
    fn test_parse_ids() {
        let id = RestaurantId::generate();
        assert_eq!(id, restaurant_id(&id.to_string()).unwrap());

        assert_eq!(
            RestError::NotFound("A review with the id of 'abc' is not found.".to_owned()),
            review_id("abc").unwrap_err()
        );
        assert_eq!(
            RestError::NotFound("A user with the id of '' is not found.".to_owned()),
            user_id("").unwrap_err()
        );
    }
}
