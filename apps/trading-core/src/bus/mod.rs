//! In-process event bus: topic grammar and delivery contract.
//!
//! Topics are `(kind, venue, symbol)` triples. Delivery is
//! at-least-once within the process and preserves publication order
//! per topic for each subscriber. The bus owns no entities; it conveys
//! clones.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::{MarketQuote, OrderBookChanges, OrderBookSnapshot, ProductSymbol, VenueId};

/// Kind of market-data topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    /// Full order-book snapshots.
    OrderBookSnapshot,
    /// Order-book delta sets.
    OrderBookChanges,
    /// Inside-quote events published by venue feeds.
    MarketQuote,
}

/// A subscription topic: one data kind for one product on one venue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    /// Data kind.
    pub kind: TopicKind,
    /// Venue coordinate.
    pub venue_id: VenueId,
    /// Symbol coordinate.
    pub product_symbol: ProductSymbol,
}

impl Topic {
    /// Snapshot topic for a product.
    #[must_use]
    pub fn order_book_snapshot(venue_id: VenueId, product_symbol: ProductSymbol) -> Self {
        Self {
            kind: TopicKind::OrderBookSnapshot,
            venue_id,
            product_symbol,
        }
    }

    /// Changes topic for a product.
    #[must_use]
    pub fn order_book_changes(venue_id: VenueId, product_symbol: ProductSymbol) -> Self {
        Self {
            kind: TopicKind::OrderBookChanges,
            venue_id,
            product_symbol,
        }
    }

    /// Market-quote topic for a product.
    #[must_use]
    pub fn market_quote(venue_id: VenueId, product_symbol: ProductSymbol) -> Self {
        Self {
            kind: TopicKind::MarketQuote,
            venue_id,
            product_symbol,
        }
    }
}

/// A published market-data event.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    /// A full book snapshot for a product.
    OrderBookSnapshot {
        /// Venue coordinate.
        venue_id: VenueId,
        /// Symbol coordinate.
        product_symbol: ProductSymbol,
        /// Snapshot payload.
        book: OrderBookSnapshot,
    },
    /// A book delta set for a product.
    OrderBookChanges {
        /// Venue coordinate.
        venue_id: VenueId,
        /// Symbol coordinate.
        product_symbol: ProductSymbol,
        /// Delta payload.
        changes: OrderBookChanges,
    },
    /// An inside quote published by a venue feed.
    MarketQuote(MarketQuote),
}

impl MarketEvent {
    /// The topic this event is published on.
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            Self::OrderBookSnapshot {
                venue_id,
                product_symbol,
                ..
            } => Topic::order_book_snapshot(venue_id.clone(), product_symbol.clone()),
            Self::OrderBookChanges {
                venue_id,
                product_symbol,
                ..
            } => Topic::order_book_changes(venue_id.clone(), product_symbol.clone()),
            Self::MarketQuote(quote) => {
                Topic::market_quote(quote.venue_id.clone(), quote.product_symbol.clone())
            }
        }
    }
}

/// Delivery target registered with [`EventBus::subscribe`].
///
/// `deliver` returns `false` once the sink is closed; the bus prunes
/// such subscribers on the next publish to the topic.
pub trait EventSink: Send + Sync {
    /// Deliver one event. Returns `false` when the sink is gone.
    fn deliver(&self, event: MarketEvent) -> bool;

    /// Whether the sink can still accept deliveries.
    fn is_open(&self) -> bool {
        true
    }
}

/// Publish/subscribe surface the runtime depends on.
pub trait EventBus: Send + Sync {
    /// Register a sink for a topic.
    fn subscribe(&self, topic: Topic, sink: Arc<dyn EventSink>);

    /// Publish an event to every live subscriber of its topic.
    fn publish(&self, event: MarketEvent);
}

/// Single-process bus over per-topic subscriber lists.
#[derive(Default)]
pub struct InProcessBus {
    topics: RwLock<HashMap<Topic, Vec<Arc<dyn EventSink>>>>,
}

impl InProcessBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscribers for a topic.
    #[must_use]
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }
}

impl EventBus for InProcessBus {
    fn subscribe(&self, topic: Topic, sink: Arc<dyn EventSink>) {
        self.topics.write().entry(topic).or_default().push(sink);
    }

    fn publish(&self, event: MarketEvent) {
        let topic = event.topic();
        let mut closed = false;
        {
            let topics = self.topics.read();
            let Some(sinks) = topics.get(&topic) else {
                return;
            };
            for sink in sinks {
                if !sink.deliver(event.clone()) {
                    closed = true;
                }
            }
        }

        if closed {
            let mut topics = self.topics.write();
            if let Some(sinks) = topics.get_mut(&topic) {
                sinks.retain(|sink| sink.is_open());
                if sinks.is_empty() {
                    topics.remove(&topic);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::PriceLevel;

    struct RecordingSink {
        events: Mutex<Vec<MarketEvent>>,
        open: bool,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
                open: true,
            })
        }
    }

    impl EventSink for RecordingSink {
        fn deliver(&self, event: MarketEvent) -> bool {
            if !self.open {
                return false;
            }
            self.events.lock().unwrap().push(event);
            true
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    fn quote_event(venue: &str, symbol: &str) -> MarketEvent {
        MarketEvent::MarketQuote(MarketQuote::new(
            VenueId::new(venue),
            ProductSymbol::new(symbol),
            PriceLevel::new(dec!(100), dec!(1)),
            PriceLevel::new(dec!(101), dec!(2)),
        ))
    }

    #[test]
    fn publishes_only_to_matching_topic() {
        let bus = InProcessBus::new();
        let sink = RecordingSink::new();
        bus.subscribe(
            Topic::market_quote(VenueId::new("exchange_a"), ProductSymbol::new("btc_usd")),
            sink.clone(),
        );

        bus.publish(quote_event("exchange_a", "btc_usd"));
        bus.publish(quote_event("exchange_a", "eth_usd"));
        bus.publish(quote_event("exchange_b", "btc_usd"));

        assert_eq!(sink.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn preserves_publication_order_per_topic() {
        let bus = InProcessBus::new();
        let sink = RecordingSink::new();
        let topic = Topic::order_book_changes(
            VenueId::new("exchange_a"),
            ProductSymbol::new("btc_usd"),
        );
        bus.subscribe(topic, sink.clone());

        for i in 1..=5 {
            bus.publish(MarketEvent::OrderBookChanges {
                venue_id: VenueId::new("exchange_a"),
                product_symbol: ProductSymbol::new("btc_usd"),
                changes: OrderBookChanges::new(
                    vec![PriceLevel::new(Decimal::from(i), dec!(1))],
                    vec![],
                ),
            });
        }

        let events = sink.events.lock().unwrap();
        let prices: Vec<Decimal> = events
            .iter()
            .map(|event| match event {
                MarketEvent::OrderBookChanges { changes, .. } => changes.bids[0].price,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            prices,
            (1..=5).map(Decimal::from).collect::<Vec<_>>()
        );
    }

    #[test]
    fn fanout_reaches_every_subscriber() {
        let bus = InProcessBus::new();
        let topic = Topic::market_quote(VenueId::new("exchange_a"), ProductSymbol::new("btc_usd"));
        let first = RecordingSink::new();
        let second = RecordingSink::new();
        bus.subscribe(topic.clone(), first.clone());
        bus.subscribe(topic.clone(), second.clone());

        bus.publish(quote_event("exchange_a", "btc_usd"));

        assert_eq!(first.events.lock().unwrap().len(), 1);
        assert_eq!(second.events.lock().unwrap().len(), 1);
        assert_eq!(bus.subscriber_count(&topic), 2);
    }

    #[test]
    fn prunes_closed_sinks() {
        let bus = InProcessBus::new();
        let topic = Topic::market_quote(VenueId::new("exchange_a"), ProductSymbol::new("btc_usd"));
        let closed = Arc::new(RecordingSink {
            events: Mutex::new(Vec::new()),
            open: false,
        });
        bus.subscribe(topic.clone(), closed);
        assert_eq!(bus.subscriber_count(&topic), 1);

        bus.publish(quote_event("exchange_a", "btc_usd"));
        assert_eq!(bus.subscriber_count(&topic), 0);
    }
}
