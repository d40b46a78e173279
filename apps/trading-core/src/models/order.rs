//! Order types and the order status state machine.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{AccountId, ClientId, ProductSymbol, ServerId, VenueId};

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    /// Buy order.
    Buy,
    /// Sell order.
    Sell,
}

impl OrderSide {
    /// Wire/display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Limit order - execute at the given price or better.
    Limit,
}

impl OrderType {
    /// Wire/display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Limit => "limit",
        }
    }
}

/// Time in force for orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInForce {
    /// Good-til-canceled.
    Gtc,
    /// Fill-or-kill.
    Fok,
    /// Immediate-or-cancel.
    Ioc,
}

impl TimeInForce {
    /// Wire/display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gtc => "gtc",
            Self::Fok => "fok",
            Self::Ioc => "ioc",
        }
    }
}

/// Order status in the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepted locally, not yet acknowledged by the venue.
    Enqueued,
    /// Live at the venue. Steady state of a working order.
    Pending,
    /// Amend request in flight.
    Amending,
    /// Cancel request in flight.
    Canceling,
    /// Canceled at the venue.
    Canceled,
    /// Rejected or failed; see `error_reason`.
    Error,
}

impl OrderStatus {
    /// Wire/display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::Pending => "pending",
            Self::Amending => "amending",
            Self::Canceling => "canceling",
            Self::Canceled => "canceled",
            Self::Error => "error",
        }
    }

    /// Returns true if the order can no longer change state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Canceled | Self::Error)
    }

    /// Check if a state transition is valid.
    #[must_use]
    pub fn can_transition(from: Self, to: Self) -> bool {
        matches!(
            (from, to),
            // From Enqueued
            (Self::Enqueued, Self::Pending)
                | (Self::Enqueued, Self::Error)
                // From Pending
                | (Self::Pending, Self::Amending)
                | (Self::Pending, Self::Canceling)
                // From Amending
                | (Self::Amending, Self::Pending)
                | (Self::Amending, Self::Canceling)
                | (Self::Amending, Self::Error)
                // From Canceling
                | (Self::Canceling, Self::Canceled)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested field changes for an amend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendAttrs {
    /// New limit price, when amending price.
    pub price: Option<Decimal>,
    /// New size, when amending size.
    pub size: Option<Decimal>,
}

impl AmendAttrs {
    /// Amend the limit price only.
    #[must_use]
    pub const fn price(price: Decimal) -> Self {
        Self {
            price: Some(price),
            size: None,
        }
    }

    /// Amend the size only.
    #[must_use]
    pub const fn size(size: Decimal) -> Self {
        Self {
            price: None,
            size: Some(size),
        }
    }
}

/// Message delivered to an update-callback owner for one status transition.
#[derive(Debug, Clone)]
pub struct OrderUpdated {
    /// Snapshot before the transition. `None` for the enqueue fire.
    pub old: Option<Order>,
    /// Snapshot after the transition.
    pub new: Order,
    /// Opts captured when the callback was registered.
    pub opts: Option<serde_json::Value>,
}

/// Delivery target for order update callbacks.
///
/// The pipeline never executes user code inline: firing a callback
/// enqueues an [`OrderUpdated`] message with the owner, which runs the
/// user handler on its own task.
pub trait OrderUpdateSink: Send + Sync {
    /// Deliver one update message to the owner.
    fn order_updated(&self, update: OrderUpdated);
}

/// User-supplied callback fired on each status transition of an order.
///
/// A cloneable handle over the owner's delivery sink plus optional
/// captured opts.
#[derive(Clone)]
pub struct UpdateCallback {
    sink: Arc<dyn OrderUpdateSink>,
    opts: Option<serde_json::Value>,
}

impl UpdateCallback {
    /// Create a callback without opts.
    pub fn new(sink: Arc<dyn OrderUpdateSink>) -> Self {
        Self { sink, opts: None }
    }

    /// Create a callback with captured opts.
    pub fn with_opts(sink: Arc<dyn OrderUpdateSink>, opts: serde_json::Value) -> Self {
        Self {
            sink,
            opts: Some(opts),
        }
    }

    /// Fire the callback for one transition.
    pub fn fire(&self, old: Option<&Order>, new: &Order) {
        self.sink.order_updated(OrderUpdated {
            old: old.cloned(),
            new: new.clone(),
            opts: self.opts.clone(),
        });
    }
}

impl std::fmt::Debug for UpdateCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateCallback")
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

/// A single order tracked by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Locally generated unique identifier.
    pub client_id: ClientId,
    /// Venue the order targets.
    pub venue_id: VenueId,
    /// Venue account the order belongs to.
    pub account_id: AccountId,
    /// Product symbol.
    pub product_symbol: ProductSymbol,
    /// Buy or sell.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Time in force.
    pub time_in_force: TimeInForce,
    /// Limit price.
    pub price: Decimal,
    /// Order size.
    pub size: Decimal,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Venue-assigned id, populated after acceptance.
    pub server_id: Option<ServerId>,
    /// Failure reason, populated when status is `error`.
    pub error_reason: Option<String>,
    /// Callback fired on each status transition.
    #[serde(skip)]
    pub update_callback: Option<UpdateCallback>,
}

/// Parameters for a new limit order.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Venue the order targets.
    pub venue_id: VenueId,
    /// Venue account.
    pub account_id: AccountId,
    /// Product symbol.
    pub product_symbol: ProductSymbol,
    /// Limit price.
    pub price: Decimal,
    /// Order size.
    pub size: Decimal,
    /// Time in force.
    pub time_in_force: TimeInForce,
    /// Optional update callback.
    pub update_callback: Option<UpdateCallback>,
}

impl Order {
    /// Construct a freshly enqueued limit order with a generated client id.
    #[must_use]
    pub fn enqueued_limit(side: OrderSide, request: OrderRequest) -> Self {
        Self {
            client_id: ClientId::generate(),
            venue_id: request.venue_id,
            account_id: request.account_id,
            product_symbol: request.product_symbol,
            side,
            order_type: OrderType::Limit,
            time_in_force: request.time_in_force,
            price: request.price,
            size: request.size,
            status: OrderStatus::Enqueued,
            server_id: None,
            error_reason: None,
            update_callback: request.update_callback,
        }
    }

    /// Canonical order log line. One line per status transition.
    ///
    /// `error_reason` is appended only when present (status `error`).
    #[must_use]
    pub fn log_line(&self) -> String {
        let error_suffix = self
            .error_reason
            .as_ref()
            .map(|reason| format!(",{reason}"))
            .unwrap_or_default();

        format!(
            "[order:{},{},{},{},{},{},{},{},{},{}{}]",
            self.client_id,
            self.status,
            self.venue_id,
            self.account_id,
            self.product_symbol,
            self.side.as_str(),
            self.order_type.as_str(),
            self.time_in_force.as_str(),
            self.price,
            self.size,
            error_suffix,
        )
    }
}
