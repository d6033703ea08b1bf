//! # Group: one product slot inside a principal.
//!
//! A group pairs a [`BranchDescription`] with the slot's [`Provenance`] and,
//! once materialized, the product itself.
//!
//! ## Invariants
//! - The product is `Some` only if the provenance status is `Present`.
//! - A group goes from empty to filled at most once; filling a filled group
//!   is an [`Error::InsertFailure`].

use parking_lot::Mutex;

use super::reader::OwnedProduct;
use crate::error::{Error, Result};
use crate::identity::{BranchDescription, BranchKey, ProductID};
use crate::provenance::{Parentage, ProductStatus, Provenance};

#[derive(Debug)]
struct Slot {
    product: Option<OwnedProduct>,
    provenance: Provenance,
}

/// One (branch, slot) pair of a principal.
#[derive(Debug)]
pub struct Group {
    description: BranchDescription,
    on_demand: bool,
    slot: Mutex<Slot>,
}

impl Group {
    /// Empty slot whose product will come from the delayed reader or an
    /// on-demand producer (see [`BranchDescription::on_demand`]).
    pub fn placeholder(description: BranchDescription) -> Self {
        let provenance = Provenance::new(
            description.key.clone(),
            description.product_id,
            ProductStatus::NeverCreated,
            Parentage::default(),
        );
        Self {
            on_demand: description.on_demand,
            description,
            slot: Mutex::new(Slot {
                product: None,
                provenance,
            }),
        }
    }

    /// Filled slot.
    pub fn with_product(description: BranchDescription, product: OwnedProduct, parentage: Parentage) -> Self {
        let provenance = Provenance::new(
            description.key.clone(),
            description.product_id,
            ProductStatus::Present,
            parentage,
        );
        Self {
            on_demand: description.on_demand,
            description,
            slot: Mutex::new(Slot {
                product: Some(product),
                provenance,
            }),
        }
    }

    pub fn description(&self) -> &BranchDescription {
        &self.description
    }

    pub fn key(&self) -> &BranchKey {
        &self.description.key
    }

    pub fn product_id(&self) -> ProductID {
        self.description.product_id
    }

    pub fn on_demand(&self) -> bool {
        self.on_demand
    }

    pub fn product(&self) -> Option<OwnedProduct> {
        self.slot.lock().product.clone()
    }

    pub fn is_materialized(&self) -> bool {
        self.slot.lock().product.is_some()
    }

    pub fn provenance(&self) -> Provenance {
        self.slot.lock().provenance.clone()
    }

    /// Fills an empty slot. Fails if the slot already holds a product.
    pub fn fill(&self, product: OwnedProduct, parentage: Parentage) -> Result<()> {
        let mut slot = self.slot.lock();
        if slot.product.is_some() {
            return Err(Error::InsertFailure(format!(
                "product {} is already present",
                self.description.key
            )));
        }
        slot.product = Some(product);
        slot.provenance.status = ProductStatus::Present;
        slot.provenance.parentage = parentage;
        Ok(())
    }

    /// Moves the product (if any) of `other` into this slot.
    pub(crate) fn absorb(&self, other: Group) -> Result<()> {
        let Slot { product, provenance } = other.slot.into_inner();
        match product {
            Some(p) => self.fill(p, provenance.parentage),
            None if self.is_materialized() => Err(Error::InsertFailure(format!(
                "product {} is already present",
                self.description.key
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{BranchType, ParameterSetID};
    use std::sync::Arc;

    fn desc() -> BranchDescription {
        BranchDescription {
            branch_type: BranchType::Event,
            key: BranchKey::of::<i32>("modA", "", "P1"),
            product_id: ProductID::new(1),
            module_type: "IntProducer".into(),
            parameter_set_id: ParameterSetID::default(),
            on_demand: false,
        }
    }

    #[test]
    fn test_fill_once() {
        let g = Group::placeholder(desc());
        assert!(!g.is_materialized());
        assert_eq!(g.provenance().status, ProductStatus::NeverCreated);

        g.fill(Arc::new(7i32), Parentage::default()).unwrap();
        assert!(g.provenance().is_present());

        let err = g.fill(Arc::new(8i32), Parentage::default()).unwrap_err();
        assert!(matches!(err, Error::InsertFailure(_)));
        let v = g.product().unwrap().downcast::<i32>().unwrap();
        assert_eq!(*v, 7);
    }

    #[test]
    fn test_absorb_into_placeholder() {
        let g = Group::placeholder(desc());
        let parent = Parentage::new(vec![ProductID::new(9)]);
        g.absorb(Group::with_product(desc(), Arc::new(1i32), parent.clone())).unwrap();
        assert_eq!(g.provenance().parentage, parent);
        assert!(g.absorb(Group::with_product(desc(), Arc::new(2i32), Parentage::default())).is_err());
    }
}
