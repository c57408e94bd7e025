//! # Identifier Newtypes
//!
//! Domain-primitive newtypes for the numeric identifiers used by the
//! dispatch core. Each identifier is a distinct type: you cannot pass a
//! [`BranchId`] where a [`PartnerId`] is expected.
//!
//! Catalog references ([`CategoryId`], [`ServiceId`], [`PickupOptionId`])
//! are opaque to the core: they are carried on a request but never
//! interpreted.

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw numeric identifier.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// The underlying numeric value.
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a service request.
    RequestId
);
numeric_id!(
    /// Identifier of a service partner (the tenant that owns branches).
    PartnerId
);
numeric_id!(
    /// Identifier of a partner branch (a physical service point).
    BranchId
);
numeric_id!(
    /// Reference to an external service category.
    CategoryId
);
numeric_id!(
    /// Reference to an external service within a category.
    ServiceId
);
numeric_id!(
    /// Reference to an external pickup option.
    PickupOptionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_numerically() {
        assert!(BranchId::new(2) < BranchId::new(10));
        assert_eq!(BranchId::new(7).get(), 7);
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&RequestId::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: PartnerId = serde_json::from_str("9").unwrap();
        assert_eq!(back, PartnerId::new(9));
    }

    #[test]
    fn display_is_raw_value() {
        assert_eq!(format!("{}", PartnerId::new(15)), "15");
    }
}
