//! Type-safe identifier wrappers.
//!
//! Contest and entity identifiers arrive from the upstream feeds as opaque
//! strings (`"0022400061"`, `"203999"`, `"BOS"`), so they are kept as
//! strings behind distinct newtypes to prevent accidental mixing at compile
//! time. Event identifiers are UUID v5 values derived from the contest and
//! sequence number, so re-ingesting the same log reproduces the same IDs.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Namespace for deterministic event identifiers.
const EVENT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6b1f_3c2e_9d4a_4f0b_8e71_52c0_a9d3_e418);

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from its source string.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner [`String`].
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_id! {
    /// Identifier for one scheduled game between two teams.
    ContestId
}

define_id! {
    /// Identifier for a player or team (the subject of cumulative statistics).
    EntityId
}

/// Deterministic identifier for an event in a contest's log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventId(pub Uuid);

impl EventId {
    /// Derive the identifier for `sequence_number` within `contest_id`.
    ///
    /// The same inputs always produce the same identifier.
    pub fn for_event(contest_id: &ContestId, sequence_number: u64) -> Self {
        let name = format!("{}:{sequence_number}", contest_id.as_str());
        Self(Uuid::new_v5(&EVENT_ID_NAMESPACE, name.as_bytes()))
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl core::fmt::Display for EventId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
