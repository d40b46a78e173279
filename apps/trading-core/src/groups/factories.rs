//! Spec factories: how a group's filtered products become advisors.
//!
//! The selector decides which products a group sees; the factory
//! decides how many advisors to mint over them and which order books
//! each one watches.

use std::collections::BTreeMap;

use crate::models::{Product, ProductSymbol, VenueId};

use super::{AdvisorGroup, AdvisorSpec};

/// Materialises advisor specs for one group.
pub trait SpecFactory: Send + Sync {
    /// Build the group's specs over its filtered products.
    fn build(&self, group: &AdvisorGroup, products: &[Product]) -> Vec<AdvisorSpec>;
}

fn order_books_by_venue(products: &[Product]) -> BTreeMap<VenueId, Vec<ProductSymbol>> {
    let mut books: BTreeMap<VenueId, Vec<ProductSymbol>> = BTreeMap::new();
    for product in products {
        books
            .entry(product.venue_id.clone())
            .or_default()
            .push(product.symbol.clone());
    }
    books
}

/// One advisor per product, addressed as `{venue}_{symbol}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OnePerProduct;

impl SpecFactory for OnePerProduct {
    fn build(&self, group: &AdvisorGroup, products: &[Product]) -> Vec<AdvisorSpec> {
        products
            .iter()
            .map(|product| AdvisorSpec {
                module: group.advisor.clone(),
                group_id: group.id.clone(),
                advisor_id: format!("{}_{}", product.venue_id, product.symbol),
                products: vec![product.clone()],
                order_books: order_books_by_venue(std::slice::from_ref(product)),
                config: group.config.clone(),
                store: serde_json::Map::new(),
                trades: Vec::new(),
            })
            .collect()
    }
}

/// One advisor for the whole group, watching every filtered product.
#[derive(Debug, Default, Clone, Copy)]
pub struct OnePerGroup;

impl SpecFactory for OnePerGroup {
    fn build(&self, group: &AdvisorGroup, products: &[Product]) -> Vec<AdvisorSpec> {
        if products.is_empty() {
            return Vec::new();
        }
        vec![AdvisorSpec {
            module: group.advisor.clone(),
            group_id: group.id.clone(),
            advisor_id: "main".to_string(),
            products: products.to_vec(),
            order_books: order_books_by_venue(products),
            config: group.config.clone(),
            store: serde_json::Map::new(),
            trades: Vec::new(),
        }]
    }
}
