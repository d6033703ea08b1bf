//! Error types used by the eventvisor engine and by user modules.
//!
//! This module defines:
//!
//! - [`Category`] the failure taxonomy the [`ActionTable`](crate::ActionTable) is keyed on.
//! - [`Error`] errors raised by the engine itself and by modules it runs.
//! - [`ReadError`] errors raised by a [`DelayedReader`](crate::DelayedReader).
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! Wrapping variants ([`Error::Module`], [`Error::ScheduleExecution`]) keep the
//! original failure as their source; [`Error::root_category`] walks that chain so
//! the policy lookup always sees the root cause.

use std::fmt;

use thiserror::Error;

/// Failure category.
///
/// The category, not the concrete variant, decides what the schedule does with
/// a failure (see [`ActionTable`](crate::ActionTable)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Configuration,
    LogicError,
    ProductNotFound,
    InsertFailure,
    InvalidReference,
    NotFound,
    NoProductSpecified,
    ScheduleExecutionFailure,
    EventProcessorFailure,
    Unknown,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 10] = [
        Category::Configuration,
        Category::LogicError,
        Category::ProductNotFound,
        Category::InsertFailure,
        Category::InvalidReference,
        Category::NotFound,
        Category::NoProductSpecified,
        Category::ScheduleExecutionFailure,
        Category::EventProcessorFailure,
        Category::Unknown,
    ];

    /// Canonical category name, as used in the `options` parameter set.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Configuration => "Configuration",
            Category::LogicError => "LogicError",
            Category::ProductNotFound => "ProductNotFound",
            Category::InsertFailure => "InsertFailure",
            Category::InvalidReference => "InvalidReference",
            Category::NotFound => "NotFound",
            Category::NoProductSpecified => "NoProductSpecified",
            Category::ScheduleExecutionFailure => "ScheduleExecutionFailure",
            Category::EventProcessorFailure => "EventProcessorFailure",
            Category::Unknown => "Unknown",
        }
    }

    /// Parses a canonical category name.
    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Errors raised by a [`DelayedReader`](crate::DelayedReader).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// The storage layer has no bytes for this product stream in this record.
    #[error("no stored product for branch {branch}")]
    Missing {
        /// Rendered branch key.
        branch: String,
    },

    /// Bytes were found but could not be turned into a product.
    #[error("cannot materialize branch {branch}: {reason}")]
    Corrupt {
        /// Rendered branch key.
        branch: String,
        /// Decoder message.
        reason: String,
    },

    /// The storage backend itself failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl ReadError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ReadError::Missing { .. } => "read_missing",
            ReadError::Corrupt { .. } => "read_corrupt",
            ReadError::Storage(_) => "read_storage",
        }
    }
}

/// # Errors produced by the engine and by modules.
///
/// Modules return these from their hooks; the engine raises them for
/// lookup failures, invariant violations and bad state transitions.
/// Every variant belongs to exactly one [`Category`].
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Malformed or inconsistent job configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A programming error: an operation was used the wrong way.
    #[error("logic error: {0}")]
    Logic(String),

    /// A lookup matched no product, or the product could not be materialized.
    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// A lookup that requires exactly one match found several.
    #[error("too many products match {criteria}: found {count}")]
    TooManyMatches {
        /// Rendered lookup criteria.
        criteria: String,
        /// Number of matching products.
        count: usize,
    },

    /// A product could not be inserted into a record.
    #[error("insert failure: {0}")]
    InsertFailure(String),

    /// A reference to a product points nowhere.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// A named entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A lookup was attempted without naming what to look up.
    #[error("no product specified: {0}")]
    NoProductSpecified(String),

    /// A process name appears twice in one process history.
    #[error("duplicate process '{0}' in process history")]
    DuplicateProcess(String),

    /// A job-level operation was called in a state that does not accept it.
    #[error("bad transition from {state} using message {message}")]
    BadState {
        /// Name of the state the processor was in.
        state: &'static str,
        /// Name of the rejected message.
        message: &'static str,
    },

    /// Failure of the event processor itself (async run failure, lost core).
    #[error("event processor failure: {0}")]
    Processor(String),

    /// A module failed; the source keeps the original failure.
    #[error("module '{label}' failed: {source}")]
    Module {
        /// Label of the failing module.
        label: String,
        /// What the module raised.
        #[source]
        source: Box<Error>,
    },

    /// Processing of a path (or end path) stopped because of a failure.
    #[error("processing stopped in {kind} '{name}': {source}")]
    ScheduleExecution {
        /// `"path"` or `"endpath"`.
        kind: &'static str,
        /// Path name.
        name: String,
        /// The failure that stopped the path.
        #[source]
        source: Box<Error>,
    },

    /// Several failures collected while finishing the job.
    #[error("{} failure(s) while ending the job: {}", .0.len(), join_messages(.0))]
    EndJob(Vec<Error>),

    /// A [`DelayedReader`](crate::DelayedReader) failed.
    #[error("read failure: {0}")]
    Read(#[from] ReadError),

    /// Anything that does not fit a known category.
    #[error("{0}")]
    Unknown(String),
}

fn join_messages(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// The category of this error, without looking through wrappers.
    pub fn category(&self) -> Category {
        match self {
            Error::Configuration(_) | Error::DuplicateProcess(_) => Category::Configuration,
            Error::Logic(_) => Category::LogicError,
            Error::ProductNotFound(_) | Error::TooManyMatches { .. } | Error::Read(_) => {
                Category::ProductNotFound
            }
            Error::InsertFailure(_) => Category::InsertFailure,
            Error::InvalidReference(_) => Category::InvalidReference,
            Error::NotFound(_) => Category::NotFound,
            Error::NoProductSpecified(_) => Category::NoProductSpecified,
            Error::Module { .. } | Error::ScheduleExecution { .. } => {
                Category::ScheduleExecutionFailure
            }
            Error::BadState { .. } | Error::Processor(_) => Category::EventProcessorFailure,
            Error::EndJob(_) | Error::Unknown(_) => Category::Unknown,
        }
    }

    /// The category of the root cause (looks through module/path wrappers).
    ///
    /// # Example
    /// ```
    /// use eventvisor::{Category, Error};
    ///
    /// let err = Error::Module {
    ///     label: "tracks".into(),
    ///     source: Box::new(Error::ProductNotFound("hits".into())),
    /// };
    /// assert_eq!(err.category(), Category::ScheduleExecutionFailure);
    /// assert_eq!(err.root_category(), Category::ProductNotFound);
    /// ```
    pub fn root_category(&self) -> Category {
        self.root().category()
    }

    /// The innermost error of a module/path wrapper chain.
    pub fn root(&self) -> &Error {
        match self {
            Error::Module { source, .. } | Error::ScheduleExecution { source, .. } => source.root(),
            other => other,
        }
    }

    /// Wraps `self` as a failure of module `label`.
    pub(crate) fn in_module(self, label: &str) -> Error {
        match self {
            already @ Error::Module { .. } => already,
            other => Error::Module {
                label: label.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventvisor::Error;
    ///
    /// let err = Error::BadState { state: "Init", message: "EndJob" };
    /// assert_eq!(err.as_label(), "bad_state");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::Logic(_) => "logic_error",
            Error::ProductNotFound(_) => "product_not_found",
            Error::TooManyMatches { .. } => "too_many_matches",
            Error::InsertFailure(_) => "insert_failure",
            Error::InvalidReference(_) => "invalid_reference",
            Error::NotFound(_) => "not_found",
            Error::NoProductSpecified(_) => "no_product_specified",
            Error::DuplicateProcess(_) => "duplicate_process",
            Error::BadState { .. } => "bad_state",
            Error::Processor(_) => "processor_failure",
            Error::Module { .. } => "module_failure",
            Error::ScheduleExecution { .. } => "schedule_execution_failure",
            Error::EndJob(_) => "end_job_failure",
            Error::Read(e) => e.as_label(),
            Error::Unknown(_) => "unknown",
        }
    }

    /// Returns a human-readable message naming the category and the root cause.
    pub fn as_message(&self) -> String {
        let root = self.root();
        if std::ptr::eq(root, self) {
            format!("[{}] {self}", self.category())
        } else {
            format!("[{}] {self} (root cause [{}] {root})", self.category(), root.category())
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
