//! # Product registry.
//!
//! [`ProductRegistry`] lists every product stream a job can hold. Sources and
//! modules register their streams while the job is built; the registry is then
//! frozen and shared read-only (behind an `Arc`) with every principal.
//!
//! ## Rules
//! - Append-only: a [`BranchKey`] is registered at most once.
//! - Product ids are assigned in registration order, starting at 1.
//! - After [`freeze`](ProductRegistry::freeze) every mutation is a logic error.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::identity::{BranchDescription, BranchKey, BranchType, ParameterSetID, ProductID};

/// Append-only, freezable catalog of product streams.
#[derive(Debug, Default)]
pub struct ProductRegistry {
    products: BTreeMap<BranchKey, BranchDescription>,
    by_id: HashMap<ProductID, BranchKey>,
    next_id: u32,
    frozen: bool,
}

impl ProductRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a stream and returns its id.
    pub fn add_product(
        &mut self,
        branch_type: BranchType,
        key: BranchKey,
        module_type: impl Into<String>,
        parameter_set_id: ParameterSetID,
    ) -> Result<ProductID> {
        self.check_mutable("add_product")?;
        if self.products.contains_key(&key) {
            return Err(Error::Logic(format!("product {key} is registered twice")));
        }
        self.next_id += 1;
        let product_id = ProductID::new(self.next_id);
        self.by_id.insert(product_id, key.clone());
        self.products.insert(
            key.clone(),
            BranchDescription {
                branch_type,
                key,
                product_id,
                module_type: module_type.into(),
                parameter_set_id,
                on_demand: false,
            },
        );
        Ok(product_id)
    }

    /// Marks every event product of `module_label` as produced on demand.
    ///
    /// Returns how many streams were marked.
    pub fn set_on_demand(&mut self, module_label: &str) -> Result<usize> {
        self.check_mutable("set_on_demand")?;
        let mut marked = 0;
        for desc in self.products.values_mut() {
            if desc.branch_type == BranchType::Event && desc.key.module_label == module_label {
                desc.on_demand = true;
                marked += 1;
            }
        }
        Ok(marked)
    }

    /// Ends the registration phase.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn get(&self, key: &BranchKey) -> Option<&BranchDescription> {
        self.products.get(key)
    }

    pub fn by_id(&self, id: ProductID) -> Option<&BranchDescription> {
        self.by_id.get(&id).and_then(|k| self.products.get(k))
    }

    /// All streams, in key order.
    pub fn products(&self) -> impl Iterator<Item = &BranchDescription> {
        self.products.values()
    }

    /// Streams living in records of `branch_type`.
    pub fn products_of(&self, branch_type: BranchType) -> impl Iterator<Item = &BranchDescription> {
        self.products.values().filter(move |d| d.branch_type == branch_type)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    fn check_mutable(&self, op: &str) -> Result<()> {
        if self.frozen {
            Err(Error::Logic(format!("{op} called on a frozen product registry")))
        } else {
            Ok(())
        }
    }
}
