//! Mock venue adapter for tests and demo wiring.
//!
//! Accepts everything by default; individual calls can be scripted to
//! fail. Received calls are recorded for assertions.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::models::{AmendAttrs, ClientId, Order, ServerId};

use super::{AmendAck, VenueAdapter, VenueError};

/// One call received by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `create_order` was called.
    Create {
        /// Client id of the submitted order.
        client_id: ClientId,
    },
    /// `amend_order` was called.
    Amend {
        /// Client id of the amended order.
        client_id: ClientId,
        /// Requested changes.
        attrs: AmendAttrs,
    },
    /// `cancel_order` was called.
    Cancel {
        /// Client id of the canceled order.
        client_id: ClientId,
    },
}

/// Scriptable in-process venue adapter.
#[derive(Debug, Default)]
pub struct MockVenueAdapter {
    server_counter: AtomicU64,
    create_failures: Mutex<VecDeque<VenueError>>,
    amend_failures: Mutex<VecDeque<VenueError>>,
    cancel_failures: Mutex<VecDeque<VenueError>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockVenueAdapter {
    /// Create a mock that accepts every call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next `create_order` call to fail.
    pub fn fail_next_create(&self, error: VenueError) {
        self.create_failures.lock().push_back(error);
    }

    /// Script the next `amend_order` call to fail.
    pub fn fail_next_amend(&self, error: VenueError) {
        self.amend_failures.lock().push_back(error);
    }

    /// Script the next `cancel_order` call to fail.
    pub fn fail_next_cancel(&self, error: VenueError) {
        self.cancel_failures.lock().push_back(error);
    }

    /// Calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    fn next_server_id(&self) -> ServerId {
        let n = self.server_counter.fetch_add(1, Ordering::SeqCst) + 1;
        ServerId::new(format!("srv-{n}"))
    }
}

#[async_trait]
impl VenueAdapter for MockVenueAdapter {
    async fn create_order(&self, order: &Order) -> Result<ServerId, VenueError> {
        self.calls.lock().push(MockCall::Create {
            client_id: order.client_id.clone(),
        });
        if let Some(error) = self.create_failures.lock().pop_front() {
            return Err(error);
        }
        Ok(self.next_server_id())
    }

    async fn amend_order(
        &self,
        order: &Order,
        attrs: &AmendAttrs,
    ) -> Result<AmendAck, VenueError> {
        self.calls.lock().push(MockCall::Amend {
            client_id: order.client_id.clone(),
            attrs: *attrs,
        });
        if let Some(error) = self.amend_failures.lock().pop_front() {
            return Err(error);
        }
        let server_id = order.server_id.clone().ok_or(VenueError::NotFound)?;
        Ok(AmendAck { server_id })
    }

    async fn cancel_order(&self, order: &Order) -> Result<ServerId, VenueError> {
        self.calls.lock().push(MockCall::Cancel {
            client_id: order.client_id.clone(),
        });
        if let Some(error) = self.cancel_failures.lock().pop_front() {
            return Err(error);
        }
        order.server_id.clone().ok_or(VenueError::NotFound)
    }

    fn venue_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{
        AccountId, OrderRequest, OrderSide, ProductSymbol, TimeInForce, VenueId,
    };

    fn order() -> Order {
        Order::enqueued_limit(
            OrderSide::Buy,
            OrderRequest {
                venue_id: VenueId::new("exchange_a"),
                account_id: AccountId::new("main"),
                product_symbol: ProductSymbol::new("btc_usd"),
                price: dec!(100),
                size: dec!(1),
                time_in_force: TimeInForce::Gtc,
                update_callback: None,
            },
        )
    }

    #[tokio::test]
    async fn accepts_by_default_with_sequential_ids() {
        let adapter = MockVenueAdapter::new();
        let first = adapter.create_order(&order()).await.unwrap();
        let second = adapter.create_order(&order()).await.unwrap();
        assert_eq!(first, ServerId::new("srv-1"));
        assert_eq!(second, ServerId::new("srv-2"));
    }

    #[tokio::test]
    async fn scripted_failure_applies_once() {
        let adapter = MockVenueAdapter::new();
        adapter.fail_next_create(VenueError::Rejected {
            reason: "unknown_error".to_string(),
        });

        assert!(adapter.create_order(&order()).await.is_err());
        assert!(adapter.create_order(&order()).await.is_ok());
    }

    #[tokio::test]
    async fn records_calls_in_order() {
        let adapter = MockVenueAdapter::new();
        let mut submitted = order();
        submitted.server_id = Some(ServerId::new("srv-9"));

        let _ = adapter.create_order(&submitted).await;
        let _ = adapter.cancel_order(&submitted).await;

        let calls = adapter.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], MockCall::Create { .. }));
        assert!(matches!(calls[1], MockCall::Cancel { .. }));
    }
}
