//! Advisor runtime: the strategy capability contract, per-advisor
//! state, and the actor that hosts them.
//!
//! An advisor is user code reacting to market events. The runtime
//! keeps it honest: one message at a time, all mutable strategy state
//! flowing through the opaque store, and every fault demoted to a
//! warning event while the actor keeps running.

use async_trait::async_trait;

mod message;
mod quotes;
mod runtime;

pub use message::{AdvisorMailbox, AdvisorMessage};
pub use quotes::{MarketQuoteCache, is_stale};
pub use runtime::{AdvisorDeps, AdvisorHandle, advisor_address, spawn_advisor};

use crate::models::{MarketQuote, OrderBookChanges, OrderUpdated, Product};

/// Opaque user state carried between callbacks.
pub type AdvisorStore = serde_json::Map<String, serde_json::Value>;

/// Result of one advisor callback: the next store on success.
pub type CallbackResult = Result<AdvisorStore, anyhow::Error>;

/// How the inside quote came to be refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookChange {
    /// A full snapshot arrived; the refresh was unconditional.
    Snapshot,
    /// A delta set arrived and was judged stale against the cache.
    Changes(OrderBookChanges),
}

/// State held privately by each advisor actor.
#[derive(Debug, Clone)]
pub struct AdvisorState {
    /// This actor's own mailbox: the delivery target for update
    /// callbacks on orders the advisor places.
    pub mailbox: AdvisorMailbox,
    /// Owning group id.
    pub group_id: String,
    /// Advisor id within the group.
    pub advisor_id: String,
    /// Products the advisor watches.
    pub products: Vec<Product>,
    /// Latest inside quote per product.
    pub market_quotes: MarketQuoteCache,
    /// Opaque per-group configuration.
    pub config: AdvisorStore,
    /// Opaque user state, replaced by callback returns.
    pub store: AdvisorStore,
    /// Opaque trade history carried for the strategy.
    pub trades: Vec<serde_json::Value>,
}

/// The strategy capability contract.
///
/// Every method defaults to a no-op that keeps the current store, so
/// implementations override only what they react to. Callbacks take
/// `&self`: all mutable strategy state lives in `state.store`, which
/// is how the runtime can roll back to the pre-callback state when a
/// callback fails.
#[async_trait]
pub trait Advisor: Send + Sync + 'static {
    /// Runs once when the actor starts, before any subscription.
    /// The returned store replaces the spec's initial store.
    async fn after_start(&self, state: &AdvisorState) -> CallbackResult {
        Ok(state.store.clone())
    }

    /// The inside quote of a watched product changed meaningfully.
    async fn handle_inside_quote(
        &self,
        quote: &MarketQuote,
        change: &BookChange,
        state: &AdvisorState,
    ) -> CallbackResult {
        let _ = (quote, change);
        Ok(state.store.clone())
    }

    /// A market-quote event arrived from a venue feed.
    async fn handle_event(&self, quote: &MarketQuote, state: &AdvisorState) -> CallbackResult {
        let _ = quote;
        Ok(state.store.clone())
    }

    /// An order owned by this advisor transitioned status.
    async fn handle_order_updated(
        &self,
        update: &OrderUpdated,
        state: &AdvisorState,
    ) -> CallbackResult {
        let _ = update;
        Ok(state.store.clone())
    }
}

/// An advisor that reacts to nothing. Useful as a placeholder and in
/// tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpAdvisor;

#[async_trait]
impl Advisor for NoOpAdvisor {}
