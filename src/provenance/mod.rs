//! Lineage and catalogs: provenance records, the product registry and the
//! process-wide deduplicating stores.

mod product_registry;
#[allow(clippy::module_inception)]
mod provenance;
mod store;

pub use product_registry::ProductRegistry;
pub use provenance::{Parentage, ProductStatus, Provenance};
pub use store::{
    JobRegistries, ParameterSetRegistry, ParentageRegistry, ProcessHistoryRegistry,
    ThreadSafeRegistry,
};
