//! Inside-quote query port over the order-book store.
//!
//! The snapshot/diff store itself lives outside the runtime; advisors
//! only ever ask it for the current inside. `InMemoryOrderBook` is the
//! bundled implementation used by tests and the demo wiring.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{
    MarketQuote, OrderBookChanges, OrderBookSnapshot, PriceLevel, ProductSymbol, VenueId,
};

/// Errors surfaced by inside-quote queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    /// No book is tracked for the product.
    #[error("no order book for {venue_id}.{product_symbol}")]
    UnknownBook {
        /// Venue coordinate.
        venue_id: VenueId,
        /// Symbol coordinate.
        product_symbol: ProductSymbol,
    },
    /// The book has no resting levels on one side.
    #[error("order book for {venue_id}.{product_symbol} has an empty side")]
    EmptySide {
        /// Venue coordinate.
        venue_id: VenueId,
        /// Symbol coordinate.
        product_symbol: ProductSymbol,
    },
}

/// Query port for the best bid/ask of a product.
#[async_trait]
pub trait InsideQuoteSource: Send + Sync {
    /// Current inside quote for a product.
    ///
    /// # Errors
    ///
    /// Returns `QuoteError` when the product has no usable book.
    async fn inside_quote(
        &self,
        venue_id: &VenueId,
        product_symbol: &ProductSymbol,
    ) -> Result<MarketQuote, QuoteError>;
}

#[derive(Debug, Default)]
struct Book {
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
}

impl Book {
    fn apply_side(side: &mut BTreeMap<Decimal, Decimal>, deltas: &[PriceLevel]) {
        for level in deltas {
            if level.size.is_zero() {
                side.remove(&level.price);
            } else {
                side.insert(level.price, level.size);
            }
        }
    }
}

/// In-memory order-book store keyed by product.
#[derive(Debug, Default)]
pub struct InMemoryOrderBook {
    books: RwLock<HashMap<(VenueId, ProductSymbol), Book>>,
}

impl InMemoryOrderBook {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a product's book with a snapshot.
    pub fn apply_snapshot(
        &self,
        venue_id: &VenueId,
        product_symbol: &ProductSymbol,
        snapshot: &OrderBookSnapshot,
    ) {
        let mut book = Book::default();
        Book::apply_side(&mut book.bids, &snapshot.bids);
        Book::apply_side(&mut book.asks, &snapshot.asks);
        self.books
            .write()
            .insert((venue_id.clone(), product_symbol.clone()), book);
    }

    /// Apply a delta set to a product's book. Zero-size deltas remove
    /// the level.
    pub fn apply_changes(
        &self,
        venue_id: &VenueId,
        product_symbol: &ProductSymbol,
        changes: &OrderBookChanges,
    ) {
        let mut books = self.books.write();
        let book = books
            .entry((venue_id.clone(), product_symbol.clone()))
            .or_default();
        Book::apply_side(&mut book.bids, &changes.bids);
        Book::apply_side(&mut book.asks, &changes.asks);
    }
}

#[async_trait]
impl InsideQuoteSource for InMemoryOrderBook {
    async fn inside_quote(
        &self,
        venue_id: &VenueId,
        product_symbol: &ProductSymbol,
    ) -> Result<MarketQuote, QuoteError> {
        let books = self.books.read();
        let book = books
            .get(&(venue_id.clone(), product_symbol.clone()))
            .ok_or_else(|| QuoteError::UnknownBook {
                venue_id: venue_id.clone(),
                product_symbol: product_symbol.clone(),
            })?;

        let best_bid = book.bids.iter().next_back();
        let best_ask = book.asks.iter().next();
        match (best_bid, best_ask) {
            (Some((&bid_price, &bid_size)), Some((&ask_price, &ask_size))) => {
                Ok(MarketQuote::new(
                    venue_id.clone(),
                    product_symbol.clone(),
                    PriceLevel::new(bid_price, bid_size),
                    PriceLevel::new(ask_price, ask_size),
                ))
            }
            _ => Err(QuoteError::EmptySide {
                venue_id: venue_id.clone(),
                product_symbol: product_symbol.clone(),
            }),
        }
    }
}
