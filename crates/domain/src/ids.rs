use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifiers are assigned by the relational store, so they wrap the
/// numeric row id rather than generating one client-side.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

// Accounts
define_id!(UserId);

// Catalog
define_id!(QuestId);
define_id!(TaskId);
define_id!(BranchId);

// Co-op
define_id!(SharedQuestId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_i64() {
        let id = QuestId::new(42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(QuestId::from(42), id);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn ids_serialize_as_bare_numbers() {
        let json = serde_json::to_string(&UserId::new(7)).expect("serialize");
        assert_eq!(json, "7");
    }
}
