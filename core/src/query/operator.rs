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

//! Comparison operators that clients can attach to filter keys.

use std::fmt;

/// A comparison operator applied by a filter.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operator {
    /// Implicit equality, used when the key has no recognized operator suffix.
    Eq,

    /// Strictly greater than.
    Gt,

    /// Greater than or equal to.
    Gte,

    /// Strictly less than.
    Lt,

    /// Less than or equal to.
    Lte,

    /// Not equal to.  Records without a value for the field also match.
    Ne,

    /// Equal to any of the comma-separated values.
    In,
}

impl Operator {
    /// Maps a keyword from the allow-list to its operator.  Returns `None` for anything that is
    /// not exactly one of the known keywords.
    pub fn from_keyword(keyword: &str) -> Option<Operator> {
        match keyword {
            "gt" => Some(Operator::Gt),
            "gte" => Some(Operator::Gte),
            "lt" => Some(Operator::Lt),
            "lte" => Some(Operator::Lte),
            "ne" => Some(Operator::Ne),
            "in" => Some(Operator::In),
            _ => None,
        }
    }

    /// Returns the keyword that selects this operator, or `None` for implicit equality.
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Operator::Eq => None,
            Operator::Gt => Some("gt"),
            Operator::Gte => Some("gte"),
            Operator::Lt => Some("lt"),
            Operator::Lte => Some("lte"),
            Operator::Ne => Some("ne"),
            Operator::In => Some("in"),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword().unwrap_or("eq"))
    }
}

/// Splits a raw filter `key` into its field name and operator.
///
/// Only a trailing `[keyword]` whose keyword is on the allow-list is recognized.  Any other key,
/// including one with an unknown bracketed suffix like `foo[bogus]`, is returned whole as the
/// name of a field compared for equality.
pub fn translate(key: &str) -> (String, Operator) {
    if let Some(rest) = key.strip_suffix(']') {
        if let Some(open) = rest.rfind('[') {
            let field = &rest[..open];
            if !field.is_empty() {
                if let Some(op) = Operator::from_keyword(&rest[open + 1..]) {
                    return (field.to_owned(), op);
                }
            }
        }
    }
    (key.to_owned(), Operator::Eq)
}
