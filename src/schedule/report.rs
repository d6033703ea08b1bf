//! Job counters and the trigger report.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::path::{InPathCounters, PathCounters, PathKind};
use super::worker::WorkerCounters;

/// Job-wide event counters.
///
/// Shared between the schedule and the processor so totals stay readable
/// while an asynchronous run owns the schedule.
#[derive(Debug, Default)]
pub struct EventTotals {
    events: AtomicU64,
    passed: AtomicU64,
    skipped: AtomicU64,
}

impl EventTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_event(&self) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_passed(&self) {
        self.passed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    pub fn passed(&self) -> u64 {
        self.passed.load(Ordering::Relaxed)
    }

    /// Events not accepted by any trigger path, skipped events included.
    pub fn failed(&self) -> u64 {
        self.events().saturating_sub(self.passed())
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.events.store(0, Ordering::Relaxed);
        self.passed.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
    }

    pub fn summary(&self) -> EventSummary {
        EventSummary {
            total: self.events(),
            passed: self.passed(),
            failed: self.failed(),
            skipped: self.skipped(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleInPathSummary {
    pub label: String,
    pub counters: InPathCounters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSummary {
    pub name: String,
    pub kind: PathKind,
    pub bit_position: usize,
    pub counters: PathCounters,
    pub modules: Vec<ModuleInPathSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    pub label: String,
    pub type_name: String,
    pub counters: WorkerCounters,
}

/// Snapshot of every counter the schedule keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerReport {
    pub event: EventSummary,
    pub paths: Vec<PathSummary>,
    pub end_paths: Vec<PathSummary>,
    pub workers: Vec<WorkerSummary>,
}

impl TriggerReport {
    pub fn path(&self, name: &str) -> Option<&PathSummary> {
        self.paths.iter().chain(&self.end_paths).find(|p| p.name == name)
    }

    pub fn worker(&self, label: &str) -> Option<&WorkerSummary> {
        self.workers.iter().find(|w| w.label == label)
    }
}

impl fmt::Display for TriggerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = &self.event;
        writeln!(f, "TrigReport ---------- Event  Summary ------------")?;
        writeln!(
            f,
            "TrigReport Events total = {} passed = {} failed = {} skipped = {}",
            e.total, e.passed, e.failed, e.skipped
        )?;
        for (title, paths) in [("Path", &self.paths), ("EndPath", &self.end_paths)] {
            writeln!(f, "TrigReport ---------- {title}   Summary ------------")?;
            writeln!(f, "TrigReport  Bit#        Run     Passed     Failed      Error Name")?;
            for p in paths.iter() {
                let c = p.counters;
                writeln!(
                    f,
                    "TrigReport {:5} {:10} {:10} {:10} {:10} {}",
                    p.bit_position, c.run, c.passed, c.failed, c.except, p.name
                )?;
            }
        }
        writeln!(f, "TrigReport ---------- Module Summary ------------")?;
        writeln!(f, "TrigReport    Visited        Run     Passed     Failed      Error Name")?;
        for w in &self.workers {
            let c = w.counters;
            writeln!(
                f,
                "TrigReport {:10} {:10} {:10} {:10} {:10} {}",
                c.visited, c.run, c.passed, c.failed, c.except, w.label
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_failed_is_derived() {
        let t = EventTotals::new();
        t.record_event();
        t.record_event();
        t.record_passed();
        t.record_skipped();
        assert_eq!(t.summary(), EventSummary { total: 2, passed: 1, failed: 1, skipped: 1 });
        t.clear();
        assert_eq!(t.events(), 0);
    }
}
