//! Collaborator seams used by principals to materialize products lazily.
//!
//! - [`DelayedReader`] fetches a product from storage on first access.
//! - [`UnscheduledHandler`] runs a producer on demand when its output is read.

use std::any::Any;
use std::sync::Arc;

use super::principal::Principal;
use crate::error::{ReadError, Result};
use crate::identity::BranchKey;

/// A materialized product, shared between the record and its readers.
pub type OwnedProduct = Arc<dyn Any + Send + Sync>;

/// Storage collaborator that materializes products on first access.
///
/// Must be safe to call arbitrarily long after the record was opened, as long
/// as the principal is alive.
pub trait DelayedReader: Send + Sync {
    fn fetch(&self, key: &BranchKey, principal: &Principal) -> Result<OwnedProduct, ReadError>;
}

/// Reader used when a job has no storage backend: every fetch misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelayedReader;

impl DelayedReader for NoDelayedReader {
    fn fetch(&self, key: &BranchKey, _principal: &Principal) -> Result<OwnedProduct, ReadError> {
        Err(ReadError::Missing {
            branch: key.to_string(),
        })
    }
}

/// Runs the producer of an on-demand product.
pub trait UnscheduledHandler: Send + Sync {
    /// Runs module `module_label` against the record owning `principal`.
    ///
    /// Returns `false` if no on-demand module has that label.
    fn try_to_fill(&self, module_label: &str, principal: &Principal) -> Result<bool>;
}
