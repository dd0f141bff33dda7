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

//! The `AccessToken` data type.

use forkful_core::model::{ModelError, ModelResult};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the access tokens, in characters.
const TOKEN_LENGTH: usize = 64;

/// An opaque type representing the access token of a session.
///
/// Access tokens are random alphanumeric sequences of a fixed size.  Clients present them as
/// bearer credentials.
#[derive(Clone, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub(crate) struct AccessToken(String);

impl AccessToken {
    /// Creates a new access token from an untrusted string.
    pub(crate) fn new<S: Into<String>>(token: S) -> ModelResult<Self> {
        let token = token.into();
        if token.len() != TOKEN_LENGTH || !token.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(ModelError("Invalid access token".to_owned()));
        }
        Ok(Self(token))
    }

    /// Generates a new random access token.
    pub(crate) fn generate() -> Self {
        let token: String =
            rand::rng().sample_iter(&Alphanumeric).take(TOKEN_LENGTH).map(char::from).collect();
        debug_assert_eq!(TOKEN_LENGTH, token.len());
        Self(token)
    }

    /// Returns the string representation of the token.
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed access token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_accesstoken_ok() {
        let raw_token = "aB3".repeat(TOKEN_LENGTH / 3) + &"x".repeat(TOKEN_LENGTH % 3);
        let token = AccessToken::new(&raw_token).unwrap();
        assert_eq!(&raw_token, token.as_str());
    }

    #[test]
    fn test_accesstoken_error_bad_length() {
        AccessToken::new("abcde").unwrap_err();
        AccessToken::new("b".repeat(TOKEN_LENGTH + 1)).unwrap_err();
    }

    #[test]
    fn test_accesstoken_error_invalid_character() {
        AccessToken::new("!".repeat(TOKEN_LENGTH)).unwrap_err();
        AccessToken::new("a".repeat(TOKEN_LENGTH - 1) + " ").unwrap_err();
    }

    #[test]
    fn test_accesstoken_generate_valid_and_unique() {
        let mut raw_tokens = HashSet::<String>::default();
        for _ in 0..1000 {
            let token = AccessToken::generate();
            AccessToken::new(token.as_str()).unwrap();
            raw_tokens.insert(token.as_str().to_owned());
        }
        assert_eq!(1000, raw_tokens.len());
    }

    #[test]
    fn test_accesstoken_debug_is_scrubbed() {
        let token = AccessToken::generate();
        assert_eq!("scrubbed access token", format!("{:?}", token));
    }
}
