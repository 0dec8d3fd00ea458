//! Identifier types for conversations and turns.
//!
//! Both ids are the decimal string of a millisecond timestamp, which is the
//! shape the durable record has always used. Generation never reuses a value
//! already taken in the same scope: when two ids are requested within one
//! millisecond the second one is bumped past the first.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pick a millisecond value that is at least `now` and above every taken one.
#[must_use]
pub fn next_millis<I>(now: DateTime<Utc>, taken: I) -> u64
where
    I: IntoIterator<Item = Option<u64>>,
{
    let now_ms = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    let floor = taken
        .into_iter()
        .flatten()
        .max()
        .map_or(0, |max| max.saturating_add(1));
    now_ms.max(floor)
}

/// Declare a timestamp-string id newtype with a consistent API.
macro_rules! define_time_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Build an id from a millisecond timestamp.
            #[must_use]
            pub fn from_millis(millis: u64) -> Self {
                Self(millis.to_string())
            }

            /// Millisecond value, if the id is numeric.
            #[must_use]
            pub fn millis(&self) -> Option<u64> {
                self.0.parse().ok()
            }

            /// Borrow the id text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = core::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().to_string()))
            }
        }
    };
}

define_time_id!(
    /// Identifier of a conversation, unique across the session state.
    ConversationId
);

define_time_id!(
    /// Identifier of a turn, unique within its conversation.
    TurnId
);
