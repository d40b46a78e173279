//! The advisor actor: subscription, dispatch, and fault isolation.

use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::bus::{EventBus, EventSink, MarketEvent, Topic};
use crate::groups::AdvisorSpec;
use crate::models::{MarketQuote, OrderBookChanges, OrderUpdated, ProductSymbol, VenueId};
use crate::orderbook::InsideQuoteSource;
use crate::telemetry::{TelemetryEvent, TelemetryHub};

use super::message::{AdvisorMailbox, AdvisorMessage};
use super::quotes::{MarketQuoteCache, is_stale};
use super::{Advisor, AdvisorState, BookChange};

/// Shared collaborators handed to every advisor actor.
#[derive(Clone)]
pub struct AdvisorDeps {
    /// Market-data bus.
    pub bus: Arc<dyn EventBus>,
    /// Inside-quote query port.
    pub books: Arc<dyn InsideQuoteSource>,
    /// Warning event hub.
    pub telemetry: Arc<TelemetryHub>,
}

/// Actor address: `advisor_{group_id}_{advisor_id}`.
#[must_use]
pub fn advisor_address(group_id: &str, advisor_id: &str) -> String {
    format!("advisor_{group_id}_{advisor_id}")
}

/// Handle to a running advisor actor.
#[derive(Debug)]
pub struct AdvisorHandle {
    address: String,
    mailbox: AdvisorMailbox,
    join: JoinHandle<()>,
}

impl AdvisorHandle {
    /// The actor's address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The actor's mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &AdvisorMailbox {
        &self.mailbox
    }

    /// Whether the actor task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the actor and wait for it to drain the current message.
    pub async fn stop(self) {
        if self.mailbox.send(AdvisorMessage::Stop) {
            let _ = self.join.await;
        } else {
            self.join.abort();
        }
    }
}

/// Start an advisor actor for a spec.
///
/// The actor runs `after_start`, subscribes to the snapshot, changes,
/// and market-quote topics of every configured order book, then
/// processes its mailbox one message at a time until stopped.
#[must_use]
pub fn spawn_advisor(
    spec: &AdvisorSpec,
    advisor: Box<dyn Advisor>,
    deps: AdvisorDeps,
) -> AdvisorHandle {
    let (mailbox, rx) = AdvisorMailbox::channel();
    let address = advisor_address(&spec.group_id, &spec.advisor_id);

    let state = AdvisorState {
        mailbox: mailbox.clone(),
        group_id: spec.group_id.clone(),
        advisor_id: spec.advisor_id.clone(),
        products: spec.products.clone(),
        market_quotes: MarketQuoteCache::new(),
        config: spec.config.clone(),
        store: spec.store.clone(),
        trades: spec.trades.clone(),
    };

    let subscriptions: Vec<(VenueId, ProductSymbol)> = spec
        .order_books
        .iter()
        .flat_map(|(venue_id, symbols)| {
            symbols
                .iter()
                .map(|symbol| (venue_id.clone(), symbol.clone()))
        })
        .collect();

    let actor = Actor {
        advisor,
        state,
        deps,
    };
    let join = tokio::spawn(actor.run(rx, mailbox.clone(), subscriptions));

    AdvisorHandle {
        address,
        mailbox,
        join,
    }
}

struct Actor {
    advisor: Box<dyn Advisor>,
    state: AdvisorState,
    deps: AdvisorDeps,
}

impl Actor {
    async fn run(
        mut self,
        mut rx: tokio::sync::mpsc::UnboundedReceiver<AdvisorMessage>,
        mailbox: AdvisorMailbox,
        subscriptions: Vec<(VenueId, ProductSymbol)>,
    ) {
        self.after_start().await;

        for (venue_id, symbol) in subscriptions {
            let sink: Arc<dyn EventSink> = Arc::new(mailbox.clone());
            self.deps.bus.subscribe(
                Topic::order_book_snapshot(venue_id.clone(), symbol.clone()),
                Arc::clone(&sink),
            );
            self.deps.bus.subscribe(
                Topic::order_book_changes(venue_id.clone(), symbol.clone()),
                Arc::clone(&sink),
            );
            self.deps
                .bus
                .subscribe(Topic::market_quote(venue_id, symbol), sink);
        }

        while let Some(message) = rx.recv().await {
            match message {
                AdvisorMessage::Stop => break,
                AdvisorMessage::Market(MarketEvent::OrderBookSnapshot {
                    venue_id,
                    product_symbol,
                    ..
                }) => self.on_snapshot(venue_id, product_symbol).await,
                AdvisorMessage::Market(MarketEvent::OrderBookChanges {
                    venue_id,
                    product_symbol,
                    changes,
                }) => self.on_changes(venue_id, product_symbol, changes).await,
                AdvisorMessage::Market(MarketEvent::MarketQuote(quote)) => {
                    self.on_quote(quote).await;
                }
                AdvisorMessage::OrderUpdated(update) => self.on_order_updated(update).await,
            }
        }
    }

    async fn after_start(&mut self) {
        let outcome =
            std::panic::AssertUnwindSafe(self.advisor.after_start(&self.state))
                .catch_unwind()
                .await;
        match outcome {
            Ok(Ok(store)) => self.state.store = store,
            Ok(Err(error)) => tracing::warn!(
                group_id = %self.state.group_id,
                advisor_id = %self.state.advisor_id,
                error = %error,
                "after_start failed, keeping initial store"
            ),
            Err(panic) => tracing::warn!(
                group_id = %self.state.group_id,
                advisor_id = %self.state.advisor_id,
                error = %panic_message(&panic),
                "after_start panicked, keeping initial store"
            ),
        }
    }

    /// A snapshot landed: refresh unconditionally.
    async fn on_snapshot(&mut self, venue_id: VenueId, product_symbol: ProductSymbol) {
        match self.deps.books.inside_quote(&venue_id, &product_symbol).await {
            Ok(quote) => {
                self.state.market_quotes.put(quote.clone());
                self.invoke_inside_quote(quote, BookChange::Snapshot).await;
            }
            Err(error) => tracing::warn!(
                venue_id = %venue_id,
                product_symbol = %product_symbol,
                error = %error,
                "inside quote refresh failed"
            ),
        }
    }

    /// A delta set landed: refresh only when it can move the inside,
    /// invoke only when the refreshed inside actually differs.
    async fn on_changes(
        &mut self,
        venue_id: VenueId,
        product_symbol: ProductSymbol,
        changes: OrderBookChanges,
    ) {
        let previous = self
            .state
            .market_quotes
            .quote_for(&venue_id, &product_symbol)
            .cloned();
        if !is_stale(previous.as_ref(), &changes) {
            return;
        }

        match self.deps.books.inside_quote(&venue_id, &product_symbol).await {
            Ok(quote) => {
                let differs = previous
                    .as_ref()
                    .is_none_or(|cached| !cached.same_inside(&quote));
                self.state.market_quotes.put(quote.clone());
                if differs {
                    self.invoke_inside_quote(quote, BookChange::Changes(changes))
                        .await;
                }
            }
            Err(error) => tracing::warn!(
                venue_id = %venue_id,
                product_symbol = %product_symbol,
                error = %error,
                "inside quote refresh failed"
            ),
        }
    }

    async fn on_quote(&mut self, quote: MarketQuote) {
        self.state.market_quotes.put(quote.clone());

        let outcome = std::panic::AssertUnwindSafe(
            self.advisor.handle_event(&quote, &self.state),
        )
        .catch_unwind()
        .await;
        match outcome {
            Ok(Ok(store)) => self.state.store = store,
            Ok(Err(error)) => {
                self.deps
                    .telemetry
                    .warn(TelemetryEvent::AdvisorHandleEventInvalidReturn {
                        group_id: self.state.group_id.clone(),
                        advisor_id: self.state.advisor_id.clone(),
                        error: error.to_string(),
                    });
            }
            Err(panic) => {
                self.deps
                    .telemetry
                    .warn(TelemetryEvent::AdvisorHandleEventError {
                        group_id: self.state.group_id.clone(),
                        advisor_id: self.state.advisor_id.clone(),
                        error: panic_message(&panic),
                        payload: format!("{quote:?}"),
                    });
            }
        }
    }

    async fn invoke_inside_quote(&mut self, quote: MarketQuote, change: BookChange) {
        let outcome = std::panic::AssertUnwindSafe(self.advisor.handle_inside_quote(
            &quote,
            &change,
            &self.state,
        ))
        .catch_unwind()
        .await;
        match outcome {
            Ok(Ok(store)) => self.state.store = store,
            Ok(Err(error)) => {
                self.deps
                    .telemetry
                    .warn(TelemetryEvent::AdvisorHandleInsideQuoteInvalidReturn {
                        group_id: self.state.group_id.clone(),
                        advisor_id: self.state.advisor_id.clone(),
                        error: error.to_string(),
                    });
            }
            Err(panic) => {
                self.deps
                    .telemetry
                    .warn(TelemetryEvent::AdvisorHandleInsideQuoteError {
                        group_id: self.state.group_id.clone(),
                        advisor_id: self.state.advisor_id.clone(),
                        error: panic_message(&panic),
                        payload: format!("{quote:?} {change:?}"),
                    });
            }
        }
    }

    async fn on_order_updated(&mut self, update: OrderUpdated) {
        let outcome = std::panic::AssertUnwindSafe(
            self.advisor.handle_order_updated(&update, &self.state),
        )
        .catch_unwind()
        .await;
        match outcome {
            Ok(Ok(store)) => self.state.store = store,
            Ok(Err(error)) => {
                self.deps
                    .telemetry
                    .warn(TelemetryEvent::AdvisorOrderUpdatedError {
                        group_id: self.state.group_id.clone(),
                        advisor_id: self.state.advisor_id.clone(),
                        error: error.to_string(),
                        client_id: update.new.client_id.clone(),
                    });
            }
            Err(panic) => {
                self.deps
                    .telemetry
                    .warn(TelemetryEvent::AdvisorOrderUpdatedError {
                        group_id: self.state.group_id.clone(),
                        advisor_id: self.state.advisor_id.clone(),
                        error: panic_message(&panic),
                        client_id: update.new.client_id.clone(),
                    });
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
