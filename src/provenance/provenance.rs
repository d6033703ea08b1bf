//! Per-product lineage: [`ProductStatus`], [`Parentage`], [`Provenance`].

use serde::{Deserialize, Serialize};

use crate::identity::{BranchKey, Hasher, ParentageID, ProductID};

/// Whether a product slot holds data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductStatus {
    Present,
    NeverCreated,
    Dropped,
}

/// Ordered list of the products consumed to create a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parentage {
    parents: Vec<ProductID>,
}

impl Parentage {
    pub fn new(parents: Vec<ProductID>) -> Self {
        Self { parents }
    }

    pub fn parents(&self) -> &[ProductID] {
        &self.parents
    }

    pub fn id(&self) -> ParentageID {
        let mut h = Hasher::new();
        for p in &self.parents {
            h.field(p.value().to_le_bytes());
        }
        ParentageID::from_bytes(h.finish())
    }
}

/// Lineage record of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub key: BranchKey,
    pub product_id: ProductID,
    pub status: ProductStatus,
    pub parentage: Parentage,
}

impl Provenance {
    pub fn new(key: BranchKey, product_id: ProductID, status: ProductStatus, parentage: Parentage) -> Self {
        Self {
            key,
            product_id,
            status,
            parentage,
        }
    }

    pub fn parentage_id(&self) -> ParentageID {
        self.parentage.id()
    }

    pub fn is_present(&self) -> bool {
        self.status == ProductStatus::Present
    }
}
