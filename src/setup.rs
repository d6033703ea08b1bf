//! Record validity: [`SyncValue`] and the [`EventSetup`] modules read from.
//!
//! The processor advances the setup to each record's sync value before the
//! schedule runs; modules receive it read-only.

use crate::identity::{EventID, Timestamp};

/// Position of a record on the (id, time) axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyncValue {
    pub event_id: EventID,
    pub time: Timestamp,
}

impl SyncValue {
    pub fn new(event_id: EventID, time: Timestamp) -> Self {
        Self { event_id, time }
    }

    pub fn begin_of_time() -> Self {
        Self::new(EventID::new(0, 0, 0), Timestamp::begin_of_time())
    }

    pub fn end_of_time() -> Self {
        Self::new(EventID::new(u32::MAX, u32::MAX, u32::MAX), Timestamp::end_of_time())
    }
}

/// Conditions snapshot valid for the record being processed.
#[derive(Debug, Clone)]
pub struct EventSetup {
    sync: SyncValue,
    process_name: String,
}

impl EventSetup {
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            sync: SyncValue::begin_of_time(),
            process_name: process_name.into(),
        }
    }

    /// Moves the setup to `sync`; returns `true` if it changed.
    pub fn advance(&mut self, sync: SyncValue) -> bool {
        if self.sync == sync {
            return false;
        }
        self.sync = sync;
        true
    }

    pub fn sync_value(&self) -> SyncValue {
        self.sync
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }
}
