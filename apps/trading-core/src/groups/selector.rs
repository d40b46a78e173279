//! Product selector expressions.
//!
//! Grammar: space-separated tokens, unioned.
//! `*` matches all products, `venue` every product on a venue,
//! `venue.symbol` a single product. The empty expression matches
//! nothing.

use crate::models::{Product, ProductSymbol, VenueId};

/// One token of a selector expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorToken {
    /// `*`: every product.
    All,
    /// `venue`: every product on the venue.
    Venue(VenueId),
    /// `venue.symbol`: a single product.
    Product {
        /// Venue part.
        venue_id: VenueId,
        /// Symbol part.
        symbol: ProductSymbol,
    },
}

impl SelectorToken {
    fn matches(&self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::Venue(venue_id) => product.venue_id == *venue_id,
            Self::Product { venue_id, symbol } => {
                product.venue_id == *venue_id && product.symbol == *symbol
            }
        }
    }
}

/// A parsed selector expression.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductSelector {
    tokens: Vec<SelectorToken>,
}

impl ProductSelector {
    /// Parse an expression. Parsing never fails: every token is either
    /// `*`, a venue, or a `venue.symbol` pair.
    #[must_use]
    pub fn parse(expression: &str) -> Self {
        let tokens = expression
            .split_whitespace()
            .map(|token| match token {
                "*" => SelectorToken::All,
                _ => match token.split_once('.') {
                    Some((venue, symbol)) => SelectorToken::Product {
                        venue_id: VenueId::new(venue),
                        symbol: ProductSymbol::new(symbol),
                    },
                    None => SelectorToken::Venue(VenueId::new(token)),
                },
            })
            .collect();
        Self { tokens }
    }

    /// Whether any token matches the product.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.tokens.iter().any(|token| token.matches(product))
    }

    /// Filter a product universe, preserving its order.
    #[must_use]
    pub fn filter(&self, products: &[Product]) -> Vec<Product> {
        products
            .iter()
            .filter(|product| self.matches(product))
            .cloned()
            .collect()
    }

    /// Whether the expression has no tokens (matches nothing).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
