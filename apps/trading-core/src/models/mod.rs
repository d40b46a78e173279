//! Core data model: identifiers, orders, and market quotes.

mod ids;
mod order;
mod quote;

pub use ids::{AccountId, ClientId, Product, ProductSymbol, ServerId, VenueId};
pub use order::{
    AmendAttrs, Order, OrderRequest, OrderSide, OrderStatus, OrderType, OrderUpdateSink,
    OrderUpdated, TimeInForce, UpdateCallback,
};
pub use quote::{MarketQuote, OrderBookChanges, OrderBookSnapshot, PriceLevel};
