//! In-memory order registry with atomic find-and-update.
//!
//! The store is the only shared mutable state in the runtime. Status
//! transitions are expressed as predicate-gated updates: a caller that
//! loses the race on an overlapping predicate observes `NotFound` and
//! can re-read the order to report its actual state.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{ClientId, Order, OrderStatus, ServerId};

/// Number of shards. Client-id hashed; each shard has its own lock.
const SHARD_COUNT: usize = 16;

/// Errors surfaced by the order store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No order matched the lookup or predicate.
    #[error("no order matched")]
    NotFound,
    /// An order with the same client id is already stored.
    #[error("order {client_id} already exists")]
    Duplicate {
        /// Offending client id.
        client_id: ClientId,
    },
}

/// Field-set an order must match for `find_by_and_update`.
#[derive(Debug, Clone, Default)]
pub struct OrderPredicate {
    client_id: Option<ClientId>,
    server_id: Option<ServerId>,
    status: Option<OrderStatus>,
}

impl OrderPredicate {
    /// Start an empty predicate (matches any order).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a client id.
    #[must_use]
    pub fn client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Require a server id.
    #[must_use]
    pub fn server_id(mut self, server_id: ServerId) -> Self {
        self.server_id = Some(server_id);
        self
    }

    /// Require a status.
    #[must_use]
    pub const fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    fn matches(&self, order: &Order) -> bool {
        self.client_id
            .as_ref()
            .is_none_or(|id| order.client_id == *id)
            && self
                .server_id
                .as_ref()
                .is_none_or(|id| order.server_id.as_ref() == Some(id))
            && self.status.is_none_or(|status| order.status == status)
    }
}

/// Field-set applied by `find_by_and_update`.
#[derive(Debug, Clone, Default)]
pub struct OrderUpdates {
    status: Option<OrderStatus>,
    server_id: Option<ServerId>,
    error_reason: Option<String>,
    price: Option<Decimal>,
    size: Option<Decimal>,
}

impl OrderUpdates {
    /// Start an empty update set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status.
    #[must_use]
    pub const fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the server id.
    #[must_use]
    pub fn server_id(mut self, server_id: ServerId) -> Self {
        self.server_id = Some(server_id);
        self
    }

    /// Set the error reason.
    #[must_use]
    pub fn error_reason(mut self, reason: impl Into<String>) -> Self {
        self.error_reason = Some(reason.into());
        self
    }

    /// Set the limit price.
    #[must_use]
    pub const fn price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the size.
    #[must_use]
    pub const fn size(mut self, size: Decimal) -> Self {
        self.size = Some(size);
        self
    }

    fn apply(&self, order: &mut Order) {
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(server_id) = &self.server_id {
            order.server_id = Some(server_id.clone());
        }
        if let Some(reason) = &self.error_reason {
            order.error_reason = Some(reason.clone());
        }
        if let Some(price) = self.price {
            order.price = price;
        }
        if let Some(size) = self.size {
            order.size = size;
        }
    }
}

/// Sharded in-memory registry of orders keyed by client id.
pub struct OrderStore {
    shards: Vec<Mutex<HashMap<ClientId, Order>>>,
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT)
                .map(|_| Mutex::new(HashMap::new()))
                .collect(),
        }
    }

    fn shard_for(&self, client_id: &ClientId) -> &Mutex<HashMap<ClientId, Order>> {
        let mut hasher = std::hash::DefaultHasher::new();
        client_id.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.shards.len();
        &self.shards[index]
    }

    /// Insert a freshly constructed order. Returns the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` when the client id is taken.
    pub fn add(&self, order: Order) -> Result<Order, StoreError> {
        let mut shard = self.shard_for(&order.client_id).lock();
        if shard.contains_key(&order.client_id) {
            return Err(StoreError::Duplicate {
                client_id: order.client_id.clone(),
            });
        }
        shard.insert(order.client_id.clone(), order.clone());
        Ok(order)
    }

    /// Look up an order by client id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` when no order has the id.
    pub fn find(&self, client_id: &ClientId) -> Result<Order, StoreError> {
        self.shard_for(client_id)
            .lock()
            .get(client_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    /// Atomically locate one order matching the predicate, apply the
    /// updates, and return the prior and updated snapshots.
    ///
    /// The match-and-update happens under the owning shard lock, so
    /// concurrent callers with overlapping predicates serialize and at
    /// most one succeeds per transition.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` when no order matches. The caller
    /// may then `find` by client id to report the actual state.
    pub fn find_by_and_update(
        &self,
        predicate: &OrderPredicate,
        updates: &OrderUpdates,
    ) -> Result<(Order, Order), StoreError> {
        // A client-id predicate pins the shard; otherwise scan.
        if let Some(client_id) = predicate.client_id.clone() {
            let mut shard = self.shard_for(&client_id).lock();
            let order = shard.get_mut(&client_id).ok_or(StoreError::NotFound)?;
            if !predicate.matches(order) {
                return Err(StoreError::NotFound);
            }
            let old = order.clone();
            updates.apply(order);
            return Ok((old, order.clone()));
        }

        for shard in &self.shards {
            let mut shard = shard.lock();
            if let Some(order) = shard.values_mut().find(|order| predicate.matches(order)) {
                let old = order.clone();
                updates.apply(order);
                return Ok((old, order.clone()));
            }
        }
        Err(StoreError::NotFound)
    }

    /// Snapshot every stored order.
    #[must_use]
    pub fn all(&self) -> Vec<Order> {
        self.shards
            .iter()
            .flat_map(|shard| shard.lock().values().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Number of stored orders.
    #[must_use]
    pub fn count(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    /// Remove all orders. Test hook.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.lock().clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{AccountId, OrderRequest, OrderSide, ProductSymbol, TimeInForce, VenueId};

    fn order() -> Order {
        Order::enqueued_limit(
            OrderSide::Buy,
            OrderRequest {
                venue_id: VenueId::new("exchange_a"),
                account_id: AccountId::new("main"),
                product_symbol: ProductSymbol::new("btc_usd"),
                price: dec!(100.1),
                size: dec!(0.1),
                time_in_force: TimeInForce::Gtc,
                update_callback: None,
            },
        )
    }

    #[test]
    fn add_and_find() {
        let store = OrderStore::new();
        let added = store.add(order()).unwrap();

        let found = store.find(&added.client_id).unwrap();
        assert_eq!(found.client_id, added.client_id);
        assert_eq!(found.status, OrderStatus::Enqueued);
    }

    #[test]
    fn add_rejects_duplicate_client_id() {
        let store = OrderStore::new();
        let added = store.add(order()).unwrap();

        let duplicate = added.clone();
        assert!(matches!(
            store.add(duplicate),
            Err(StoreError::Duplicate { client_id }) if client_id == added.client_id
        ));
    }

    #[test]
    fn find_unknown_is_not_found() {
        let store = OrderStore::new();
        assert!(matches!(
            store.find(&ClientId::new("missing")),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn find_by_and_update_applies_fields() {
        let store = OrderStore::new();
        let added = store.add(order()).unwrap();

        let (old, new) = store
            .find_by_and_update(
                &OrderPredicate::new()
                    .client_id(added.client_id.clone())
                    .status(OrderStatus::Enqueued),
                &OrderUpdates::new()
                    .status(OrderStatus::Pending)
                    .server_id(ServerId::new("srv-1")),
            )
            .unwrap();

        assert_eq!(old.status, OrderStatus::Enqueued);
        assert_eq!(new.status, OrderStatus::Pending);
        assert_eq!(new.server_id, Some(ServerId::new("srv-1")));
        assert_eq!(store.find(&added.client_id).unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn find_by_and_update_misses_on_status() {
        let store = OrderStore::new();
        let added = store.add(order()).unwrap();

        let result = store.find_by_and_update(
            &OrderPredicate::new()
                .client_id(added.client_id.clone())
                .status(OrderStatus::Pending),
            &OrderUpdates::new().status(OrderStatus::Canceling),
        );

        assert!(matches!(result, Err(StoreError::NotFound)));
        // Order untouched.
        assert_eq!(store.find(&added.client_id).unwrap().status, OrderStatus::Enqueued);
    }

    #[test]
    fn find_by_and_update_without_client_id_scans() {
        let store = OrderStore::new();
        let added = store.add(order()).unwrap();

        let (_, new) = store
            .find_by_and_update(
                &OrderPredicate::new().status(OrderStatus::Enqueued),
                &OrderUpdates::new().status(OrderStatus::Pending),
            )
            .unwrap();
        assert_eq!(new.client_id, added.client_id);
    }

    #[test]
    fn overlapping_predicates_admit_exactly_one_winner() {
        let store = Arc::new(OrderStore::new());
        let added = store.add(order()).unwrap();
        store
            .find_by_and_update(
                &OrderPredicate::new().client_id(added.client_id.clone()),
                &OrderUpdates::new().status(OrderStatus::Pending),
            )
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let client_id = added.client_id.clone();
            handles.push(std::thread::spawn(move || {
                store
                    .find_by_and_update(
                        &OrderPredicate::new()
                            .client_id(client_id)
                            .status(OrderStatus::Pending),
                        &OrderUpdates::new().status(OrderStatus::Canceling),
                    )
                    .is_ok()
            }));
        }

        let winners = handles
            .into_iter()
            .map(|handle| matches!(handle.join(), Ok(true)))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn clear_removes_everything() {
        let store = OrderStore::new();
        store.add(order()).unwrap();
        store.add(order()).unwrap();
        assert_eq!(store.count(), 2);

        store.clear();
        assert_eq!(store.count(), 0);
        assert!(store.all().is_empty());
    }
}
