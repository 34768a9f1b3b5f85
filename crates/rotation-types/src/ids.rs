//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Subscribers and channels get strongly-typed IDs so they cannot be mixed
//! up in logs or registries. All IDs use UUID v7 (time-ordered), which
//! keeps registration order visible when IDs are sorted.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_id! {
    /// Unique identifier for a subscriber registered with a fan-out channel.
    SubscriberId
}

define_id! {
    /// Unique identifier for a fan-out channel instance.
    ///
    /// Several channels (one per queue or per game server) can coexist;
    /// the ID keeps their log lines apart.
    ChannelId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = SubscriberId::new();
        let b = SubscriberId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn display_matches_uuid() {
        let id = ChannelId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
