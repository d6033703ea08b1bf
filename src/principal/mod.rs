//! Per-record data custody: groups, principals and lazy product resolution.
//!
//! ## Ownership
//! ```text
//! Arc<RunPrincipal> ◄── Arc<LumiPrincipal> ◄── EventPrincipal
//!        │                     │                     │
//!        └──── Principal ──────┴──── Principal ──────┴── Principal
//!                 │
//!                 ├─ GroupIndex (slots, key/id/type indexes)
//!                 ├─ ProcessHistory (input history + current process)
//!                 ├─ PrincipalContext (frozen registry, stores, DelayedReader)
//!                 └─ UnscheduledHandler (installed per event by the schedule)
//! ```

mod context;
mod group;
mod handle;
#[allow(clippy::module_inception)]
mod principal;
mod reader;
mod records;
mod selector;

pub use context::PrincipalContext;
pub use group::Group;
pub use handle::Handle;
pub use principal::Principal;
pub use reader::{DelayedReader, NoDelayedReader, OwnedProduct, UnscheduledHandler};
pub use records::{
    EventAuxiliary, EventPrincipal, LumiAuxiliary, LumiPrincipal, RunAuxiliary, RunPrincipal,
};
pub use selector::Selector;
