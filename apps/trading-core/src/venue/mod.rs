//! Venue adapter port and routing.
//!
//! Adapters own the network codecs and remote accounts; the runtime
//! only depends on this trait. Adapter calls run in detached tasks so
//! a slow venue never blocks an advisor.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

mod mock;

pub use mock::MockVenueAdapter;

use crate::models::{AmendAttrs, Order, ServerId, VenueId};

/// Errors surfaced by venue adapters. The reason string of each
/// variant is stored verbatim as the order's `error_reason`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VenueError {
    /// The venue rejected the request.
    #[error("{reason}")]
    Rejected {
        /// Venue-supplied rejection reason.
        reason: String,
    },
    /// The request timed out at the adapter.
    #[error("timeout")]
    Timeout,
    /// The venue does not know the order.
    #[error("not_found")]
    NotFound,
    /// No adapter is registered for the venue.
    #[error("unknown_venue")]
    UnknownVenue,
    /// Transport-level failure.
    #[error("unavailable: {message}")]
    Unavailable {
        /// Adapter-supplied detail.
        message: String,
    },
}

impl VenueError {
    /// Reason stored into `order.error_reason`.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Rejected { reason } => reason.clone(),
            Self::Timeout => "timeout".to_string(),
            Self::NotFound => "not_found".to_string(),
            Self::UnknownVenue => "unknown_venue".to_string(),
            Self::Unavailable { message } => format!("unavailable: {message}"),
        }
    }
}

/// Acknowledgment of a single amend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmendAck {
    /// Venue order id the amend applied to.
    pub server_id: ServerId,
}

/// One order of a bulk amend batch.
#[derive(Debug, Clone)]
pub struct AmendRequest {
    /// Order to amend (carries venue, account, and server id).
    pub order: Order,
    /// Requested field changes.
    pub attrs: AmendAttrs,
}

/// Remote venue surface consumed by the order pipeline.
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    /// Submit a new order. Returns the venue-assigned id on acceptance.
    ///
    /// # Errors
    ///
    /// Returns `VenueError` when the venue rejects or the transport
    /// fails; the pipeline moves the order to `error`.
    async fn create_order(&self, order: &Order) -> Result<ServerId, VenueError>;

    /// Amend a live order.
    ///
    /// # Errors
    ///
    /// Returns `VenueError` when the amend is rejected.
    async fn amend_order(&self, order: &Order, attrs: &AmendAttrs)
        -> Result<AmendAck, VenueError>;

    /// Amend a batch of orders. The response carries one outcome per
    /// request, in request order.
    async fn amend_orders(&self, requests: &[AmendRequest]) -> Vec<Result<AmendAck, VenueError>> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            outcomes.push(self.amend_order(&request.order, &request.attrs).await);
        }
        outcomes
    }

    /// Cancel a live order. Returns the venue order id on success.
    ///
    /// # Errors
    ///
    /// Returns `VenueError` when the cancel is rejected; the pipeline
    /// leaves the order in `canceling` and emits a warning event.
    async fn cancel_order(&self, order: &Order) -> Result<ServerId, VenueError>;

    /// Venue name for logging.
    fn venue_name(&self) -> &str;
}

/// Maps venue ids to their adapters.
#[derive(Default, Clone)]
pub struct VenueRouter {
    adapters: HashMap<VenueId, Arc<dyn VenueAdapter>>,
}

impl VenueRouter {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter for a venue. Replaces any previous one.
    #[must_use]
    pub fn with_adapter(mut self, venue_id: VenueId, adapter: Arc<dyn VenueAdapter>) -> Self {
        self.adapters.insert(venue_id, adapter);
        self
    }

    /// Look up the adapter for a venue.
    ///
    /// # Errors
    ///
    /// Returns `VenueError::UnknownVenue` when none is registered.
    pub fn adapter(&self, venue_id: &VenueId) -> Result<Arc<dyn VenueAdapter>, VenueError> {
        self.adapters
            .get(venue_id)
            .cloned()
            .ok_or(VenueError::UnknownVenue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_misses_unregistered_venue() {
        let router = VenueRouter::new();
        let result = router.adapter(&VenueId::new("exchange_a"));
        assert!(matches!(result, Err(VenueError::UnknownVenue)));
    }

    #[test]
    fn error_reasons_are_stable() {
        assert_eq!(
            VenueError::Rejected {
                reason: "unknown_error".to_string()
            }
            .reason(),
            "unknown_error"
        );
        assert_eq!(VenueError::Timeout.reason(), "timeout");
        assert_eq!(VenueError::UnknownVenue.reason(), "unknown_venue");
    }
}
