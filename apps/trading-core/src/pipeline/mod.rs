//! Order pipeline: enqueue, submit, amend, and cancel.
//!
//! The pipeline drives the order status state machine. Every status
//! transition is a predicate-gated store update, logs exactly one
//! canonical order line, and fires the order's update callback exactly
//! once. Venue adapter calls run in detached tasks; their results come
//! back as further predicate-gated transitions, so a lost race (e.g. a
//! cancel landing while a submit is in flight) resolves in the store,
//! not in the tasks.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::models::{
    AccountId, AmendAttrs, ClientId, Order, OrderRequest, OrderSide, OrderStatus, VenueId,
};
use crate::store::{OrderPredicate, OrderStore, OrderUpdates, StoreError};
use crate::telemetry::{TelemetryEvent, TelemetryHub};
use crate::venue::{AmendRequest, VenueError, VenueRouter};

/// Errors returned synchronously by pipeline operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// No order exists for the client id.
    #[error("order not found")]
    NotFound,
    /// The order exists but is not in a state the operation accepts.
    #[error("order status must be pending, was {actual}")]
    OrderStatusMustBePending {
        /// The status the order was actually in.
        actual: OrderStatus,
    },
    /// Store-level failure (duplicate client id on enqueue).
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Order lifecycle engine.
///
/// Cheap to clone; clones share the store, router, and telemetry hub.
/// Operations must run within a tokio runtime: adapter calls are
/// dispatched on spawned tasks.
#[derive(Clone)]
pub struct OrderPipeline {
    store: Arc<OrderStore>,
    router: VenueRouter,
    telemetry: Arc<TelemetryHub>,
}

impl OrderPipeline {
    /// Create a pipeline over a store, venue router, and telemetry hub.
    #[must_use]
    pub fn new(store: Arc<OrderStore>, router: VenueRouter, telemetry: Arc<TelemetryHub>) -> Self {
        Self {
            store,
            router,
            telemetry,
        }
    }

    /// The shared order store.
    #[must_use]
    pub fn store(&self) -> &Arc<OrderStore> {
        &self.store
    }

    /// Enqueue a buy limit order and submit it to the venue.
    ///
    /// Returns the enqueued snapshot immediately; acceptance or
    /// rejection arrives later through the update callback.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Store` when the generated client id
    /// collides (practically unreachable).
    pub fn buy_limit(&self, request: OrderRequest) -> Result<Order, PipelineError> {
        self.enqueue(OrderSide::Buy, request)
    }

    /// Enqueue a sell limit order and submit it to the venue.
    ///
    /// # Errors
    ///
    /// See [`OrderPipeline::buy_limit`].
    pub fn sell_limit(&self, request: OrderRequest) -> Result<Order, PipelineError> {
        self.enqueue(OrderSide::Sell, request)
    }

    fn enqueue(&self, side: OrderSide, request: OrderRequest) -> Result<Order, PipelineError> {
        let order = self.store.add(Order::enqueued_limit(side, request))?;

        tracing::info!("{}", order.log_line());
        if let Some(callback) = &order.update_callback {
            callback.fire(None, &order);
        }

        let pipeline = self.clone();
        let submitted = order.clone();
        tokio::spawn(async move {
            pipeline.submit(submitted).await;
        });

        Ok(order)
    }

    async fn submit(&self, order: Order) {
        let result = match self.router.adapter(&order.venue_id) {
            Ok(adapter) => adapter.create_order(&order).await,
            Err(error) => Err(error),
        };

        let predicate = OrderPredicate::new()
            .client_id(order.client_id.clone())
            .status(OrderStatus::Enqueued);
        match result {
            Ok(server_id) => {
                self.apply_transition(
                    &predicate,
                    &OrderUpdates::new()
                        .status(OrderStatus::Pending)
                        .server_id(server_id),
                );
            }
            Err(error) => {
                self.apply_transition(
                    &predicate,
                    &OrderUpdates::new()
                        .status(OrderStatus::Error)
                        .error_reason(error.reason()),
                );
            }
        }
    }

    /// Request an amend of a pending order's price and/or size.
    ///
    /// Gates `pending -> amending` and dispatches the venue call; the
    /// amended fields land on the `amending -> pending` transition.
    ///
    /// # Errors
    ///
    /// `OrderStatusMustBePending` when the order exists in another
    /// state, `NotFound` when it does not exist.
    pub fn amend(&self, client_id: &ClientId, attrs: AmendAttrs) -> Result<Order, PipelineError> {
        let order = self.gate_pending(client_id, OrderStatus::Amending)?;

        let pipeline = self.clone();
        let amending = order.clone();
        tokio::spawn(async move {
            pipeline.do_amend(amending, attrs).await;
        });

        Ok(order)
    }

    /// Amend a batch of orders in one venue round trip per
    /// `(venue, account)` group.
    ///
    /// The returned sequence carries one outcome per request, in
    /// request order: the `amending` snapshot for orders that passed
    /// the gate, the gate error otherwise.
    pub fn amend_bulk(
        &self,
        requests: Vec<(ClientId, AmendAttrs)>,
    ) -> Vec<Result<Order, PipelineError>> {
        let mut outcomes = Vec::with_capacity(requests.len());
        let mut batches: HashMap<(VenueId, AccountId), Vec<AmendRequest>> = HashMap::new();

        for (client_id, attrs) in requests {
            match self.gate_pending(&client_id, OrderStatus::Amending) {
                Ok(order) => {
                    batches
                        .entry((order.venue_id.clone(), order.account_id.clone()))
                        .or_default()
                        .push(AmendRequest {
                            order: order.clone(),
                            attrs,
                        });
                    outcomes.push(Ok(order));
                }
                Err(error) => outcomes.push(Err(error)),
            }
        }

        for batch in batches.into_values() {
            let pipeline = self.clone();
            tokio::spawn(async move {
                pipeline.do_amend_batch(batch).await;
            });
        }

        outcomes
    }

    async fn do_amend(&self, order: Order, attrs: AmendAttrs) {
        let result = match self.router.adapter(&order.venue_id) {
            Ok(adapter) => adapter.amend_order(&order, &attrs).await,
            Err(error) => Err(error),
        };
        self.finish_amend(&order, attrs, result.map(|_| ()));
    }

    async fn do_amend_batch(&self, batch: Vec<AmendRequest>) {
        debug_assert!(!batch.is_empty());
        let Some(first) = batch.first() else {
            return;
        };

        let outcomes = match self.router.adapter(&first.order.venue_id) {
            Ok(adapter) => adapter.amend_orders(&batch).await,
            Err(error) => batch.iter().map(|_| Err(error.clone())).collect(),
        };

        for (request, outcome) in batch.iter().zip(outcomes) {
            self.finish_amend(&request.order, request.attrs, outcome.map(|_| ()));
        }
    }

    fn finish_amend(&self, order: &Order, attrs: AmendAttrs, result: Result<(), VenueError>) {
        let predicate = OrderPredicate::new()
            .client_id(order.client_id.clone())
            .status(OrderStatus::Amending);
        match result {
            Ok(()) => {
                let mut updates = OrderUpdates::new().status(OrderStatus::Pending);
                if let Some(price) = attrs.price {
                    updates = updates.price(price);
                }
                if let Some(size) = attrs.size {
                    updates = updates.size(size);
                }
                self.apply_transition(&predicate, &updates);
            }
            Err(error) => {
                self.apply_transition(
                    &predicate,
                    &OrderUpdates::new()
                        .status(OrderStatus::Error)
                        .error_reason(error.reason()),
                );
            }
        }
    }

    /// Request cancellation of a pending order.
    ///
    /// Gates `pending -> canceling` and dispatches the venue call.
    /// A venue-side failure leaves the order in `canceling` and emits
    /// an [`TelemetryEvent::OrderCancelFailed`] warning; the strategy
    /// decides whether to retry.
    ///
    /// # Errors
    ///
    /// `OrderStatusMustBePending` when the order exists in another
    /// state, `NotFound` when it does not exist.
    pub fn cancel(&self, client_id: &ClientId) -> Result<Order, PipelineError> {
        let order = self.gate_pending(client_id, OrderStatus::Canceling)?;

        let pipeline = self.clone();
        let canceling = order.clone();
        tokio::spawn(async move {
            pipeline.do_cancel(canceling).await;
        });

        Ok(order)
    }

    async fn do_cancel(&self, order: Order) {
        let result = match self.router.adapter(&order.venue_id) {
            Ok(adapter) => adapter.cancel_order(&order).await,
            Err(error) => Err(error),
        };

        match result {
            Ok(_server_id) => {
                self.apply_transition(
                    &OrderPredicate::new()
                        .client_id(order.client_id.clone())
                        .status(OrderStatus::Canceling),
                    &OrderUpdates::new().status(OrderStatus::Canceled),
                );
            }
            Err(error) => {
                self.telemetry.warn(TelemetryEvent::OrderCancelFailed {
                    client_id: order.client_id.clone(),
                    reason: error.reason(),
                });
            }
        }
    }

    /// Gate `pending -> next` for one order, logging and firing the
    /// callback on success.
    fn gate_pending(
        &self,
        client_id: &ClientId,
        next: OrderStatus,
    ) -> Result<Order, PipelineError> {
        let predicate = OrderPredicate::new()
            .client_id(client_id.clone())
            .status(OrderStatus::Pending);
        match self.apply_transition(&predicate, &OrderUpdates::new().status(next)) {
            Some((_, order)) => Ok(order),
            None => match self.store.find(client_id) {
                Ok(order) => {
                    tracing::warn!(
                        client_id = %client_id,
                        status = %order.status,
                        "order status must be pending"
                    );
                    Err(PipelineError::OrderStatusMustBePending {
                        actual: order.status,
                    })
                }
                Err(StoreError::NotFound) => Err(PipelineError::NotFound),
                Err(error) => Err(error.into()),
            },
        }
    }

    /// Apply one predicate-gated transition: update the store, log the
    /// canonical line, fire the update callback once.
    fn apply_transition(
        &self,
        predicate: &OrderPredicate,
        updates: &OrderUpdates,
    ) -> Option<(Order, Order)> {
        match self.store.find_by_and_update(predicate, updates) {
            Ok((old, new)) => {
                tracing::info!("{}", new.log_line());
                if let Some(callback) = &new.update_callback {
                    callback.fire(Some(&old), &new);
                }
                Some((old, new))
            }
            Err(StoreError::NotFound) => None,
            Err(error) => {
                tracing::warn!(error = %error, "transition skipped");
                None
            }
        }
    }
}
