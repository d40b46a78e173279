// Allow unwrap/expect and looser patterns in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Trading Core - Rust Core Library
//!
//! The core trading runtime of the platform:
//!
//! - **Advisor runtime**: long-lived per-strategy actors fed from
//!   venue order-book and quote streams, with cached inside quotes
//!   and hard fault isolation around user callbacks.
//! - **Order pipeline**: the order lifecycle engine driving enqueue,
//!   submit, amend, and cancel through remote venue adapters, with a
//!   predicate-gated status state machine and update callbacks.
//! - **Advisor group registry**: declarative group config expanded
//!   through product selectors and pluggable factories into a fleet
//!   of advisor specs, started and stopped by the supervisor.
//!
//! Venue adapters, the order-book store, and external pub/sub
//! infrastructure stay behind the ports in [`venue`], [`orderbook`],
//! and [`bus`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod advisor;
pub mod bus;
pub mod cli;
pub mod groups;
pub mod models;
pub mod orderbook;
pub mod pipeline;
pub mod settings;
pub mod store;
pub mod supervisor;
pub mod telemetry;
pub mod venue;

pub use advisor::{
    Advisor, AdvisorDeps, AdvisorHandle, AdvisorState, AdvisorStore, BookChange, MarketQuoteCache,
};
pub use bus::{EventBus, InProcessBus, MarketEvent, Topic};
pub use groups::{AdvisorGroup, AdvisorSpec, GroupRegistry, ProductSelector, parse_config};
pub use models::{
    AmendAttrs, MarketQuote, Order, OrderRequest, OrderSide, OrderStatus, Product, UpdateCallback,
};
pub use orderbook::{InMemoryOrderBook, InsideQuoteSource};
pub use pipeline::{OrderPipeline, PipelineError};
pub use settings::RuntimeSettings;
pub use store::OrderStore;
pub use supervisor::{AdvisorsSupervisor, StartSummary};
pub use telemetry::{TelemetryEvent, TelemetryHub};
pub use venue::{MockVenueAdapter, VenueAdapter, VenueRouter};
