//! Strongly-typed identifiers for queue entities.
//!
//! The queue addresses tasks and task groups by "slug ids": 22 character
//! URL-safe base64 encodings of a v4 UUID. Generated slugs have the top bit
//! cleared so they never begin with `-`, which keeps them safe to pass on a
//! command line.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Length of an encoded slug id.
pub const SLUG_LEN: usize = 22;

/// Generate a fresh slug that does not start with `-`.
pub fn nice_slug() -> String {
    let mut bytes = *Uuid::new_v4().as_bytes();
    bytes[0] &= 0x7f;
    URL_SAFE_NO_PAD.encode(bytes)
}

fn is_valid_slug(s: &str) -> bool {
    s.len() == SLUG_LEN
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSlug(pub String);

impl fmt::Display for InvalidSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid slug id: {:?}", self.0)
    }
}

impl std::error::Error for InvalidSlug {}

macro_rules! define_slug_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(nice_slug())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidSlug;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                if is_valid_slug(s) {
                    Ok(Self(s.to_string()))
                } else {
                    Err(InvalidSlug(s.to_string()))
                }
            }
        }
    };
}

define_slug_id!(TaskId);
define_slug_id!(TaskGroupId);

impl From<TaskId> for TaskGroupId {
    /// A decision task's own id doubles as the id of the group it creates.
    fn from(id: TaskId) -> Self {
        Self(id.0)
    }
}
