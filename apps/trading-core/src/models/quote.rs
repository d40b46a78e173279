//! Market quote and order-book change types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{ProductSymbol, VenueId};

/// A single price level: price and resting size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Level price.
    pub price: Decimal,
    /// Size resting at the level.
    pub size: Decimal,
}

impl PriceLevel {
    /// Create a new price level.
    #[must_use]
    pub const fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Best bid/ask pair for a product. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketQuote {
    /// Venue the quote belongs to.
    pub venue_id: VenueId,
    /// Product symbol the quote belongs to.
    pub product_symbol: ProductSymbol,
    /// Best bid.
    pub bid: PriceLevel,
    /// Best ask.
    pub ask: PriceLevel,
    /// Time the quote was taken.
    pub timestamp: DateTime<Utc>,
}

impl MarketQuote {
    /// Create a new quote stamped with the current time.
    #[must_use]
    pub fn new(
        venue_id: VenueId,
        product_symbol: ProductSymbol,
        bid: PriceLevel,
        ask: PriceLevel,
    ) -> Self {
        Self {
            venue_id,
            product_symbol,
            bid,
            ask,
            timestamp: Utc::now(),
        }
    }

    /// Whether two quotes carry the same inside prices and sizes.
    ///
    /// Timestamps are ignored: two snapshots of an unchanged book are
    /// the same inside.
    #[must_use]
    pub fn same_inside(&self, other: &Self) -> bool {
        self.bid == other.bid && self.ask == other.ask
    }
}

/// Full order-book snapshot payload: every resting level per side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Bid levels, best first.
    pub bids: Vec<PriceLevel>,
    /// Ask levels, best first.
    pub asks: Vec<PriceLevel>,
}

/// Ordered bid/ask delta sequences from an order-book change event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookChanges {
    /// Bid-side deltas, in event order.
    pub bids: Vec<PriceLevel>,
    /// Ask-side deltas, in event order.
    pub asks: Vec<PriceLevel>,
}

impl OrderBookChanges {
    /// Create a change set from bid and ask deltas.
    #[must_use]
    pub fn new(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> Self {
        Self { bids, asks }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn quote(bid_price: Decimal, bid_size: Decimal) -> MarketQuote {
        MarketQuote::new(
            VenueId::new("exchange_a"),
            ProductSymbol::new("btc_usd"),
            PriceLevel::new(bid_price, bid_size),
            PriceLevel::new(dec!(101), dec!(2)),
        )
    }

    #[test]
    fn same_inside_ignores_timestamp() {
        let a = quote(dec!(100), dec!(1));
        let mut b = quote(dec!(100), dec!(1));
        b.timestamp = a.timestamp + chrono::Duration::seconds(5);
        assert!(a.same_inside(&b));
    }

    #[test]
    fn same_inside_detects_size_change() {
        let a = quote(dec!(100), dec!(1));
        let b = quote(dec!(100), dec!(3));
        assert!(!a.same_inside(&b));
    }
}
