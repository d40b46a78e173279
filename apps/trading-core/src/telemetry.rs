//! Warning events emitted by the runtime.
//!
//! Every demoted fault ends up here: callback crashes, invalid callback
//! returns, and venue cancels that failed after intent was recorded.
//! Events are traced and fanned out on a broadcast channel so tests and
//! operators can observe them.

use tokio::sync::broadcast;

use crate::models::ClientId;

/// Broadcast channel capacity for telemetry subscribers.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// A warning event. Nothing in the runtime is silently swallowed;
/// every demoted fault produces exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// `handle_inside_quote` panicked.
    AdvisorHandleInsideQuoteError {
        /// Owning group.
        group_id: String,
        /// Owning advisor.
        advisor_id: String,
        /// Panic payload or error rendering.
        error: String,
        /// Offending inputs, rendered for debugging.
        payload: String,
    },
    /// `handle_inside_quote` returned an error instead of a new store.
    AdvisorHandleInsideQuoteInvalidReturn {
        /// Owning group.
        group_id: String,
        /// Owning advisor.
        advisor_id: String,
        /// The returned error.
        error: String,
    },
    /// `handle_event` panicked.
    AdvisorHandleEventError {
        /// Owning group.
        group_id: String,
        /// Owning advisor.
        advisor_id: String,
        /// Panic payload or error rendering.
        error: String,
        /// Offending inputs, rendered for debugging.
        payload: String,
    },
    /// `handle_event` returned an error instead of a new store.
    AdvisorHandleEventInvalidReturn {
        /// Owning group.
        group_id: String,
        /// Owning advisor.
        advisor_id: String,
        /// The returned error.
        error: String,
    },
    /// `handle_order_updated` panicked or returned an error.
    AdvisorOrderUpdatedError {
        /// Owning group.
        group_id: String,
        /// Owning advisor.
        advisor_id: String,
        /// Panic payload or error rendering.
        error: String,
        /// Client id of the order the update belonged to.
        client_id: ClientId,
    },
    /// A venue cancel failed after cancel intent was recorded; the
    /// order stays in `canceling` and is not retried.
    OrderCancelFailed {
        /// Client id of the order.
        client_id: ClientId,
        /// Venue-supplied reason.
        reason: String,
    },
}

/// Fan-out hub for warning events.
#[derive(Debug)]
pub struct TelemetryHub {
    tx: broadcast::Sender<TelemetryEvent>,
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryHub {
    /// Create a hub with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tx: broadcast::channel(EVENT_CHANNEL_CAPACITY).0,
        }
    }

    /// Get a new receiver for warning events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.tx.subscribe()
    }

    /// Trace and fan out one warning event.
    pub fn warn(&self, event: TelemetryEvent) {
        tracing::warn!(event = ?event, "runtime warning");
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events() {
        let hub = TelemetryHub::new();
        let mut rx = hub.subscribe();

        hub.warn(TelemetryEvent::OrderCancelFailed {
            client_id: ClientId::new("abc"),
            reason: "timeout".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            TelemetryEvent::OrderCancelFailed {
                client_id: ClientId::new("abc"),
                reason: "timeout".to_string(),
            }
        );
    }

    #[test]
    fn warn_without_subscribers_is_fine() {
        let hub = TelemetryHub::new();
        hub.warn(TelemetryEvent::OrderCancelFailed {
            client_id: ClientId::new("abc"),
            reason: "timeout".to_string(),
        });
    }
}
