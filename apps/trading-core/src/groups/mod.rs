//! Advisor group registry: declarative config in, advisor specs out.
//!
//! A group entry names an advisor implementation, a spec factory, a
//! product selector, and an opaque config map. The registry validates
//! entries, filters the product universe through each group's
//! selector, and delegates to the factory to mint concrete specs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod factories;
mod selector;

pub use factories::{OnePerGroup, OnePerProduct, SpecFactory};
pub use selector::{ProductSelector, SelectorToken};

use crate::advisor::AdvisorStore;
use crate::models::{Product, ProductSymbol, VenueId};

/// A validated advisor group.
#[derive(Debug, Clone)]
pub struct AdvisorGroup {
    /// Group id (the key of the config entry).
    pub id: String,
    /// Advisor implementation name, resolved by the builder registry.
    pub advisor: String,
    /// Spec factory name, resolved by this registry.
    pub factory: String,
    /// Product selector expression.
    pub products: ProductSelector,
    /// Opaque config handed to every advisor of the group.
    pub config: AdvisorStore,
}

/// A concrete advisor to start.
#[derive(Debug, Clone)]
pub struct AdvisorSpec {
    /// Advisor implementation name.
    pub module: String,
    /// Owning group id.
    pub group_id: String,
    /// Advisor id within the group.
    pub advisor_id: String,
    /// Products the advisor watches.
    pub products: Vec<Product>,
    /// Order-book subscriptions, by venue.
    pub order_books: BTreeMap<VenueId, Vec<ProductSymbol>>,
    /// Opaque group config.
    pub config: AdvisorStore,
    /// Initial opaque user state.
    pub store: AdvisorStore,
    /// Opaque trade history.
    pub trades: Vec<serde_json::Value>,
}

/// A raw group entry as written in the config file. All fields are
/// optional here; validation reports what is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawGroup {
    /// Advisor implementation name.
    pub advisor: Option<String>,
    /// Spec factory name.
    pub factory: Option<String>,
    /// Product selector expression.
    pub products: Option<String>,
    /// Opaque config map; defaults to empty.
    #[serde(default)]
    pub config: AdvisorStore,
}

/// Raw group entries keyed by group id.
pub type RawGroupsConfig = BTreeMap<String, RawGroup>;

/// One validation failure for one field of a group entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Offending field name.
    pub field: String,
    /// Why it was rejected.
    pub message: String,
}

impl FieldError {
    fn must_be_present(field: &str) -> Self {
        Self {
            field: field.to_string(),
            message: "must be present".to_string(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Config validation failure: every invalid group with its field
/// errors, collected across the whole config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid advisor group config: {groups:?}")]
pub struct ConfigError {
    /// Field errors keyed by group id.
    pub groups: BTreeMap<String, Vec<FieldError>>,
}

/// Validate raw group entries into [`AdvisorGroup`]s.
///
/// `advisor`, `factory`, and `products` are required; `config`
/// defaults to the empty map. Errors from all groups are returned
/// together.
///
/// # Errors
///
/// Returns [`ConfigError`] listing every invalid group.
pub fn parse_config(raw: &RawGroupsConfig) -> Result<Vec<AdvisorGroup>, ConfigError> {
    let mut groups = Vec::new();
    let mut errors: BTreeMap<String, Vec<FieldError>> = BTreeMap::new();

    for (group_id, entry) in raw {
        let mut group_errors = Vec::new();
        if entry.advisor.is_none() {
            group_errors.push(FieldError::must_be_present("advisor"));
        }
        if entry.factory.is_none() {
            group_errors.push(FieldError::must_be_present("factory"));
        }
        if entry.products.is_none() {
            group_errors.push(FieldError::must_be_present("products"));
        }

        if group_errors.is_empty() {
            // Presence checked above.
            let (Some(advisor), Some(factory), Some(products)) =
                (&entry.advisor, &entry.factory, &entry.products)
            else {
                continue;
            };
            groups.push(AdvisorGroup {
                id: group_id.clone(),
                advisor: advisor.clone(),
                factory: factory.clone(),
                products: ProductSelector::parse(products),
                config: entry.config.clone(),
            });
        } else {
            errors.insert(group_id.clone(), group_errors);
        }
    }

    if errors.is_empty() {
        Ok(groups)
    } else {
        Err(ConfigError { groups: errors })
    }
}

/// Registry of named spec factories.
pub struct GroupRegistry {
    factories: HashMap<String, Arc<dyn SpecFactory>>,
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupRegistry {
    /// Registry with the built-in factories `one_per_product` and
    /// `one_per_group`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
        .with_factory("one_per_product", Arc::new(OnePerProduct))
        .with_factory("one_per_group", Arc::new(OnePerGroup))
    }

    /// Register a factory under a name. Replaces any previous one.
    #[must_use]
    pub fn with_factory(mut self, name: &str, factory: Arc<dyn SpecFactory>) -> Self {
        self.factories.insert(name.to_string(), factory);
        self
    }

    /// Build every group's specs over a product universe.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails or a group names
    /// an unknown factory.
    pub fn build_specs(
        &self,
        raw: &RawGroupsConfig,
        products: &[Product],
    ) -> Result<Vec<AdvisorSpec>, ConfigError> {
        let groups = parse_config(raw)?;

        let mut specs = Vec::new();
        let mut errors: BTreeMap<String, Vec<FieldError>> = BTreeMap::new();
        for group in groups {
            match self.factories.get(&group.factory) {
                Some(factory) => {
                    let filtered = group.products.filter(products);
                    specs.extend(factory.build(&group, &filtered));
                }
                None => {
                    errors.insert(
                        group.id.clone(),
                        vec![FieldError {
                            field: "factory".to_string(),
                            message: format!("unknown factory {}", group.factory),
                        }],
                    );
                }
            }
        }

        if errors.is_empty() {
            Ok(specs)
        } else {
            Err(ConfigError { groups: errors })
        }
    }

    /// Build specs for a single group.
    ///
    /// # Errors
    ///
    /// See [`GroupRegistry::build_specs`].
    pub fn build_specs_for_group(
        &self,
        raw: &RawGroupsConfig,
        products: &[Product],
        group_id: &str,
    ) -> Result<Vec<AdvisorSpec>, ConfigError> {
        Ok(self
            .build_specs(raw, products)?
            .into_iter()
            .filter(|spec| spec.group_id == group_id)
            .collect())
    }

    /// Build the spec for a single advisor of a group.
    ///
    /// # Errors
    ///
    /// See [`GroupRegistry::build_specs`].
    pub fn build_specs_for_advisor(
        &self,
        raw: &RawGroupsConfig,
        products: &[Product],
        group_id: &str,
        advisor_id: &str,
    ) -> Result<Vec<AdvisorSpec>, ConfigError> {
        Ok(self
            .build_specs(raw, products)?
            .into_iter()
            .filter(|spec| spec.group_id == group_id && spec.advisor_id == advisor_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_group(advisor: &str, factory: &str, products: &str) -> RawGroup {
        RawGroup {
            advisor: Some(advisor.to_string()),
            factory: Some(factory.to_string()),
            products: Some(products.to_string()),
            config: serde_json::Map::new(),
        }
    }

    fn universe() -> Vec<Product> {
        vec![
            Product::new("exchange_a", "btc_usd"),
            Product::new("exchange_a", "eth_usd"),
            Product::new("exchange_b", "btc_usd"),
            Product::new("exchange_b", "ltc_usd"),
        ]
    }

    #[test]
    fn parses_two_groups_with_defaulted_config() {
        let mut raw = RawGroupsConfig::new();
        let mut with_config = raw_group("spread_capture", "one_per_product", "*");
        with_config.config.insert(
            "min_profit".to_string(),
            serde_json::json!(0.1),
        );
        raw.insert("group_a".to_string(), with_config);
        raw.insert(
            "group_b".to_string(),
            raw_group("spread_capture", "one_per_product", "exchange_a.btc_usd"),
        );

        let groups = parse_config(&raw).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, "group_a");
        assert_eq!(
            groups[0].config.get("min_profit"),
            Some(&serde_json::json!(0.1))
        );
        assert!(groups[1].config.is_empty());
    }

    #[test]
    fn missing_advisor_is_reported_per_group() {
        let mut raw = RawGroupsConfig::new();
        let mut entry = raw_group("x", "one_per_product", "*");
        entry.advisor = None;
        raw.insert("group_a".to_string(), entry);

        let error = parse_config(&raw).unwrap_err();
        assert_eq!(
            error.groups.get("group_a"),
            Some(&vec![FieldError {
                field: "advisor".to_string(),
                message: "must be present".to_string(),
            }])
        );
    }

    #[test]
    fn all_missing_fields_are_listed_together() {
        let mut raw = RawGroupsConfig::new();
        raw.insert("group_a".to_string(), RawGroup::default());
        let mut entry = raw_group("x", "one_per_product", "*");
        entry.factory = None;
        raw.insert("group_b".to_string(), entry);

        let error = parse_config(&raw).unwrap_err();
        assert_eq!(error.groups.len(), 2);
        assert_eq!(error.groups.get("group_a").map(Vec::len), Some(3));
        assert_eq!(
            error.groups.get("group_b"),
            Some(&vec![FieldError::must_be_present("factory")])
        );
    }

    #[test]
    fn build_specs_filters_through_the_selector() {
        let mut raw = RawGroupsConfig::new();
        raw.insert(
            "group_a".to_string(),
            raw_group(
                "spread_capture",
                "one_per_product",
                "exchange_a exchange_b.ltc_usd",
            ),
        );

        let specs = GroupRegistry::new()
            .build_specs(&raw, &universe())
            .unwrap();

        let minted: Vec<String> = specs
            .iter()
            .map(|spec| spec.advisor_id.clone())
            .collect();
        assert_eq!(
            minted,
            vec![
                "exchange_a_btc_usd",
                "exchange_a_eth_usd",
                "exchange_b_ltc_usd",
            ]
        );
    }

    #[test]
    fn build_specs_for_group_narrows() {
        let mut raw = RawGroupsConfig::new();
        raw.insert(
            "group_a".to_string(),
            raw_group("spread_capture", "one_per_product", "exchange_a"),
        );
        raw.insert(
            "group_b".to_string(),
            raw_group("spread_capture", "one_per_group", "*"),
        );

        let registry = GroupRegistry::new();
        let group_b = registry
            .build_specs_for_group(&raw, &universe(), "group_b")
            .unwrap();
        assert_eq!(group_b.len(), 1);
        assert_eq!(group_b[0].group_id, "group_b");

        let advisor = registry
            .build_specs_for_advisor(&raw, &universe(), "group_a", "exchange_a_eth_usd")
            .unwrap();
        assert_eq!(advisor.len(), 1);
        assert_eq!(advisor[0].products, vec![Product::new("exchange_a", "eth_usd")]);
    }

    #[test]
    fn unknown_factory_is_a_config_error() {
        let mut raw = RawGroupsConfig::new();
        raw.insert(
            "group_a".to_string(),
            raw_group("spread_capture", "bespoke", "*"),
        );

        let error = GroupRegistry::new()
            .build_specs(&raw, &universe())
            .unwrap_err();
        assert!(error.groups.contains_key("group_a"));
    }

    #[test]
    fn empty_selector_mints_no_specs() {
        let mut raw = RawGroupsConfig::new();
        raw.insert(
            "group_a".to_string(),
            raw_group("spread_capture", "one_per_product", ""),
        );

        let specs = GroupRegistry::new()
            .build_specs(&raw, &universe())
            .unwrap();
        assert!(specs.is_empty());
    }
}
