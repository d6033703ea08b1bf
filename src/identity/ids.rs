//! Record identifiers: run, luminosity block and event numbers.
//!
//! `RunID ⊂ LumiID ⊂ EventID`: each id carries its parents' numbers, and the
//! derived ordering sorts by run, then lumi block, then event.
//! Number `0` is never a valid record number.

use std::fmt;

use serde::{Deserialize, Serialize};

pub type RunNumber = u32;
pub type LumiNumber = u32;
pub type EventNumber = u32;

/// Identifies one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct RunID {
    run: RunNumber,
}

impl RunID {
    pub fn new(run: RunNumber) -> Self {
        Self { run }
    }

    pub fn run(&self) -> RunNumber {
        self.run
    }

    pub fn is_valid(&self) -> bool {
        self.run != 0
    }

    pub fn next(&self) -> Self {
        Self::new(self.run.saturating_add(1))
    }

    pub fn previous(&self) -> Self {
        Self::new(self.run.saturating_sub(1))
    }
}

/// Identifies one luminosity block inside a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct LumiID {
    run: RunNumber,
    lumi: LumiNumber,
}

impl LumiID {
    pub fn new(run: RunNumber, lumi: LumiNumber) -> Self {
        Self { run, lumi }
    }

    pub fn run(&self) -> RunNumber {
        self.run
    }

    pub fn lumi(&self) -> LumiNumber {
        self.lumi
    }

    pub fn run_id(&self) -> RunID {
        RunID::new(self.run)
    }

    pub fn is_valid(&self) -> bool {
        self.run != 0 && self.lumi != 0
    }
}

/// Identifies one event inside a luminosity block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EventID {
    run: RunNumber,
    lumi: LumiNumber,
    event: EventNumber,
}

impl EventID {
    pub fn new(run: RunNumber, lumi: LumiNumber, event: EventNumber) -> Self {
        Self { run, lumi, event }
    }

    pub fn run(&self) -> RunNumber {
        self.run
    }

    pub fn lumi(&self) -> LumiNumber {
        self.lumi
    }

    pub fn event(&self) -> EventNumber {
        self.event
    }

    pub fn run_id(&self) -> RunID {
        RunID::new(self.run)
    }

    pub fn lumi_id(&self) -> LumiID {
        LumiID::new(self.run, self.lumi)
    }

    pub fn is_valid(&self) -> bool {
        self.run != 0 && self.event != 0
    }

    /// The next event of the same lumi block.
    pub fn next(&self) -> Self {
        Self::new(self.run, self.lumi, self.event.saturating_add(1))
    }

    /// The previous event of the same lumi block (saturates at 0, which is invalid).
    pub fn previous(&self) -> Self {
        Self::new(self.run, self.lumi, self.event.saturating_sub(1))
    }

    /// First event of the first lumi block of the following run.
    pub fn next_run_first_event(&self) -> Self {
        Self::new(self.run.saturating_add(1), 1, 1)
    }
}

impl fmt::Display for RunID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Run {}", self.run)
    }
}

impl fmt::Display for LumiID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Run {}, LuminosityBlock {}", self.run, self.lumi)
    }
}

impl fmt::Display for EventID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Run {}, LuminosityBlock {}, Event {}", self.run, self.lumi, self.event)
    }
}

/// Record time stamp in nanoseconds; `0` means "not set".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn new(nanos: u64) -> Self {
        Self(nanos)
    }

    pub const fn invalid() -> Self {
        Self(0)
    }

    pub const fn begin_of_time() -> Self {
        Self(1)
    }

    pub const fn end_of_time() -> Self {
        Self(u64::MAX)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }

    pub fn advanced_by(&self, nanos: u64) -> Self {
        Self(self.0.saturating_add(nanos))
    }
}
