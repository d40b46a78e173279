//! Advisor mailbox and message envelope.
//!
//! Everything an advisor reacts to arrives through one unbounded FIFO
//! mailbox: bus deliveries, order update callbacks, and the stop
//! signal. The mailbox handle doubles as the bus sink and the order
//! update sink, so both sources interleave only at message boundaries.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::bus::{EventSink, MarketEvent};
use crate::models::{OrderUpdateSink, OrderUpdated, UpdateCallback};

/// One message in an advisor's mailbox.
#[derive(Debug, Clone)]
pub enum AdvisorMessage {
    /// A market-data event delivered by the bus.
    Market(MarketEvent),
    /// An order status transition fired by the pipeline.
    OrderUpdated(OrderUpdated),
    /// Stop the actor after the current message.
    Stop,
}

/// Cloneable sending half of an advisor's mailbox.
#[derive(Debug, Clone)]
pub struct AdvisorMailbox {
    tx: mpsc::UnboundedSender<AdvisorMessage>,
}

impl AdvisorMailbox {
    /// Create a mailbox pair.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AdvisorMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue one message. Returns `false` once the actor is gone.
    pub fn send(&self, message: AdvisorMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    /// Whether the actor is still receiving.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// An update callback delivering transitions to this mailbox.
    #[must_use]
    pub fn update_callback(&self) -> UpdateCallback {
        UpdateCallback::new(Arc::new(self.clone()))
    }

    /// An update callback with captured opts.
    #[must_use]
    pub fn update_callback_with_opts(&self, opts: serde_json::Value) -> UpdateCallback {
        UpdateCallback::with_opts(Arc::new(self.clone()), opts)
    }
}

impl EventSink for AdvisorMailbox {
    fn deliver(&self, event: MarketEvent) -> bool {
        self.send(AdvisorMessage::Market(event))
    }

    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl OrderUpdateSink for AdvisorMailbox {
    fn order_updated(&self, update: OrderUpdated) {
        let _ = self.send(AdvisorMessage::OrderUpdated(update));
    }
}
