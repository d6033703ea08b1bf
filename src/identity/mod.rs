//! Identity primitives: record ids, product stream keys, process histories
//! and the hash-addressed ids used to deduplicate them.
//!
//! Nothing in here depends on the rest of the crate except [`Error`](crate::Error).

mod branch;
mod digest;
mod ids;
mod process;

pub use branch::{
    BranchDescription, BranchKey, BranchType, ProductID, friendly_name_of, friendly_type_name,
};
pub(crate) use digest::Hasher;
pub use digest::{ParameterSetID, ParentageID, ProcessHistoryID};
pub use ids::{EventID, EventNumber, LumiID, LumiNumber, RunID, RunNumber, Timestamp};
pub use process::{ProcessConfiguration, ProcessHistory};
