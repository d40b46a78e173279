//! Identifier newtypes shared across the runtime.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from any string-like value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// View the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id! {
    /// Exchange or broker identifier (e.g. `exchange_a`).
    VenueId
}

string_id! {
    /// Venue account identifier.
    AccountId
}

string_id! {
    /// Product symbol on a venue (e.g. `btc_usd`).
    ProductSymbol
}

string_id! {
    /// Locally generated opaque order identifier.
    ClientId
}

string_id! {
    /// Venue-assigned order identifier, known after submit acceptance.
    ServerId
}

impl ClientId {
    /// Generate a fresh client id (36-character hyphenated UUID).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// A tradable product: one symbol on one venue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Product {
    /// Venue the product trades on.
    pub venue_id: VenueId,
    /// Symbol on that venue.
    pub symbol: ProductSymbol,
}

impl Product {
    /// Create a new product.
    #[must_use]
    pub fn new(venue_id: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            venue_id: VenueId::new(venue_id),
            symbol: ProductSymbol::new(symbol),
        }
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.venue_id, self.symbol)
    }
}
