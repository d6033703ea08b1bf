//! Typed view of a resolved product.

use std::ops::Deref;
use std::sync::Arc;

use super::group::Group;
use super::principal::Principal;
use crate::error::{Error, Result};
use crate::identity::ProductID;
use crate::provenance::Provenance;

/// A resolved product of type `T` plus its provenance.
#[derive(Debug)]
pub struct Handle<T> {
    product: Arc<T>,
    provenance: Provenance,
}

impl<T: Send + Sync + 'static> Handle<T> {
    pub(crate) fn from_group(principal: &Principal, group: &Group) -> Result<Self> {
        let product = principal.resolve(group)?;
        let product = product.downcast::<T>().map_err(|_| {
            Error::Logic(format!(
                "product {} cannot be viewed as {}",
                group.key(),
                std::any::type_name::<T>()
            ))
        })?;
        Ok(Self {
            product,
            provenance: group.provenance(),
        })
    }

    pub fn product(&self) -> &Arc<T> {
        &self.product
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn id(&self) -> ProductID {
        self.provenance.product_id
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            product: Arc::clone(&self.product),
            provenance: self.provenance.clone(),
        }
    }
}

impl<T> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.product
    }
}
