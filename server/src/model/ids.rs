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

//! Identifiers of the entities stored by the service.

use forkful_core::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Defines a newtype over `Uuid` to identify entities of a given kind.
macro_rules! entity_id [
    ( $name:ident, $what:expr ) => {
        #[doc = concat!("Unique identifier of a ", $what, ".")]
        #[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
        #[serde(transparent)]
        pub(crate) struct $name(Uuid);

        impl $name {
            /// Generates a new random identifier.
            pub(crate) fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parses an identifier supplied by a client.
            pub(crate) fn parse(s: &str) -> ModelResult<Self> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| ModelError(format!("Invalid {} id: {}", $what, s)))
            }

            /// Returns the raw UUID.
            pub(crate) fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }
    }
];

entity_id!(RestaurantId, "restaurant");
entity_id!(ReviewId, "review");
entity_id!(UserId, "user");

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{Configure, Token, assert_tokens};

    #[test]
    fn test_parse_ok() {
        let id = RestaurantId::parse(" 67e55044-10b1-426f-9247-bb680e5fe0c8 ").unwrap();
        assert_eq!("67e55044-10b1-426f-9247-bb680e5fe0c8", id.to_string());
        assert_eq!(&Uuid::from_u128(0x67e5504410b1426f9247bb680e5fe0c8), id.as_uuid());
    }

    #[test]
    fn test_parse_error() {
        assert_eq!(
            ModelError("Invalid review id: abc".to_owned()),
            ReviewId::parse("abc").unwrap_err()
        );
    }

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(UserId::generate(), UserId::generate());
    }

    #[test]
    fn test_ser_de() {
        let id = UserId::from(Uuid::from_u128(1));
        assert_tokens(&id.readable(), &[Token::Str("00000000-0000-0000-0000-000000000001")]);
    }
}
