//! Per-advisor inside-quote cache and the staleness predicate.

use std::collections::BTreeMap;

use crate::models::{MarketQuote, OrderBookChanges, PriceLevel, ProductSymbol, VenueId};

/// Latest inside quote per product, held privately by each advisor.
/// No cross-advisor sharing.
#[derive(Debug, Clone, Default)]
pub struct MarketQuoteCache {
    quotes: BTreeMap<(VenueId, ProductSymbol), MarketQuote>,
}

impl MarketQuoteCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached quote for a product, if any.
    #[must_use]
    pub fn quote_for(
        &self,
        venue_id: &VenueId,
        product_symbol: &ProductSymbol,
    ) -> Option<&MarketQuote> {
        self.quotes
            .get(&(venue_id.clone(), product_symbol.clone()))
    }

    /// Store a quote under its own product coordinates.
    pub fn put(&mut self, quote: MarketQuote) {
        self.quotes.insert(
            (quote.venue_id.clone(), quote.product_symbol.clone()),
            quote,
        );
    }

    /// Number of cached products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// Whether a cached inside quote is stale relative to a change set.
///
/// A delta at the inside price with a new size is stale; a delta at or
/// beyond the inside is stale; a delta strictly outside the inside on
/// the passive side is fresh. An absent previous quote is always
/// stale. The equality arm looks redundant next to the inequality but
/// carries the size-only case at the inside price.
#[must_use]
pub fn is_stale(previous: Option<&MarketQuote>, changes: &OrderBookChanges) -> bool {
    bids_stale(previous, &changes.bids) || asks_stale(previous, &changes.asks)
}

fn bids_stale(previous: Option<&MarketQuote>, bids: &[PriceLevel]) -> bool {
    let Some(previous) = previous else {
        return true;
    };
    bids.iter().any(|level| {
        level.price >= previous.bid.price
            || (level.price == previous.bid.price && level.size != previous.bid.size)
    })
}

fn asks_stale(previous: Option<&MarketQuote>, asks: &[PriceLevel]) -> bool {
    let Some(previous) = previous else {
        return true;
    };
    asks.iter().any(|level| {
        level.price <= previous.ask.price
            || (level.price == previous.ask.price && level.size != previous.ask.size)
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    use super::*;

    fn cached() -> MarketQuote {
        MarketQuote::new(
            VenueId::new("exchange_a"),
            ProductSymbol::new("btc_usd"),
            PriceLevel::new(dec!(100), dec!(1)),
            PriceLevel::new(dec!(101), dec!(2)),
        )
    }

    fn bid_delta(price: Decimal, size: Decimal) -> OrderBookChanges {
        OrderBookChanges::new(vec![PriceLevel::new(price, size)], vec![])
    }

    fn ask_delta(price: Decimal, size: Decimal) -> OrderBookChanges {
        OrderBookChanges::new(vec![], vec![PriceLevel::new(price, size)])
    }

    #[test]
    fn absent_previous_quote_is_stale() {
        assert!(is_stale(None, &OrderBookChanges::default()));
    }

    #[test_case(dec!(100.5), dec!(1), true; "bid above the inside")]
    #[test_case(dec!(100), dec!(1), true; "bid at the inside same size")]
    #[test_case(dec!(100), dec!(3), true; "bid at the inside new size")]
    #[test_case(dec!(99.5), dec!(9), false; "bid strictly below the inside")]
    fn bid_deltas(price: Decimal, size: Decimal, stale: bool) {
        let quote = cached();
        assert_eq!(is_stale(Some(&quote), &bid_delta(price, size)), stale);
    }

    #[test_case(dec!(100.5), dec!(1), true; "ask below the inside")]
    #[test_case(dec!(101), dec!(2), true; "ask at the inside same size")]
    #[test_case(dec!(101), dec!(7), true; "ask at the inside new size")]
    #[test_case(dec!(101.5), dec!(9), false; "ask strictly above the inside")]
    fn ask_deltas(price: Decimal, size: Decimal, stale: bool) {
        let quote = cached();
        assert_eq!(is_stale(Some(&quote), &ask_delta(price, size)), stale);
    }

    #[test]
    fn passive_deltas_on_both_sides_are_fresh() {
        let quote = cached();
        let changes = OrderBookChanges::new(
            vec![PriceLevel::new(dec!(99), dec!(4))],
            vec![PriceLevel::new(dec!(102), dec!(4))],
        );
        assert!(!is_stale(Some(&quote), &changes));
    }

    #[test]
    fn empty_change_set_is_fresh_when_cached() {
        let quote = cached();
        assert!(!is_stale(Some(&quote), &OrderBookChanges::default()));
    }

    #[test]
    fn cache_put_and_lookup() {
        let mut cache = MarketQuoteCache::new();
        assert!(cache.is_empty());

        cache.put(cached());
        assert_eq!(cache.len(), 1);

        let quote = cache
            .quote_for(&VenueId::new("exchange_a"), &ProductSymbol::new("btc_usd"))
            .unwrap();
        assert_eq!(quote.bid.price, dec!(100));

        assert!(cache
            .quote_for(&VenueId::new("exchange_b"), &ProductSymbol::new("btc_usd"))
            .is_none());
    }

    #[test]
    fn cache_replaces_per_product() {
        let mut cache = MarketQuoteCache::new();
        cache.put(cached());

        let mut tighter = cached();
        tighter.bid = PriceLevel::new(dec!(100.5), dec!(1));
        cache.put(tighter);

        assert_eq!(cache.len(), 1);
        let quote = cache
            .quote_for(&VenueId::new("exchange_a"), &ProductSymbol::new("btc_usd"))
            .unwrap();
        assert_eq!(quote.bid.price, dec!(100.5));
    }
}
