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

//! Email addresses, which double as login identifiers.

use crate::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// Longest address the schemas can store.
const MAX_EMAIL_LENGTH: usize = 64;

/// A plausible email address in canonical form.
///
/// Addresses are trimmed and lowercased so that two accounts cannot differ only in the case of
/// their login.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

/// Checks that `s`, already trimmed and lowercased, has the shape `local@domain.tld`.
fn looks_like_email(s: &str) -> bool {
    if s.contains(char::is_whitespace) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

impl EmailAddress {
    /// Validates and canonicalizes the untrusted address `s`.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into().trim().to_lowercase();
        if s.is_empty() {
            Err(ModelError("Email address cannot be empty".to_owned()))
        } else if s.len() > MAX_EMAIL_LENGTH {
            Err(ModelError("Email address is too long".to_owned()))
        } else if !looks_like_email(&s) {
            Err(ModelError(format!("Email does not look like a valid address '{}'", s)))
        } else {
            Ok(Self(s))
        }
    }

    /// Returns the canonical form of the address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = ModelError;

    fn try_from(s: String) -> ModelResult<Self> {
        Self::new(s)
    }
}

impl From<EmailAddress> for String {
    fn from(email: EmailAddress) -> Self {
        email.0
    }
}

#[cfg(any(test, feature = "testutils"))]
impl From<&str> for EmailAddress {
    fn from(raw_email: &str) -> Self {
        Self::new(raw_email).expect("Hardcoded email addresses for testing must be valid")
    }
}
