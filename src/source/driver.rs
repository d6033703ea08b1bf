//! # Input driver: event limit, record nesting and read reports.
//!
//! ```text
//! read_event()
//!   remaining == 0 ─► release open records, None
//!   loop:
//!     PreSource, next_item_type, PostSource(kind)
//!     Stop  ─► release open records, None
//!     Run   ─► open run (closes the lumi)
//!     Lumi  ─► open lumi under the open run     (no run  ─► logic error)
//!     Event ─► read under the open lumi          (no lumi ─► logic error)
//!              read_count += 1, remaining -= 1, info! report
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use super::factory::SourceDescription;
use super::input::{InputSource, ItemType};
use crate::config::ParameterSet;
use crate::error::{Error, Result};
use crate::events::{Activity, ActivityBus, ActivityKind};
use crate::identity::{EventID, RunNumber};
use crate::principal::{EventPrincipal, LumiPrincipal, PrincipalContext, RunPrincipal};

/// Source parameter overriding the job-level limit (only when that is unlimited).
const LEGACY_MAX_EVENTS: &str = "maxEvents";

/// Resolves the event limit from the job setting and the source's own legacy parameter.
pub fn resolve_max_events(job_limit: i64, source_pset: &ParameterSet) -> Result<i64> {
    if !source_pset.contains(LEGACY_MAX_EVENTS) {
        return Ok(job_limit);
    }
    let legacy: i32 = source_pset.untracked_or(LEGACY_MAX_EVENTS, -1)?;
    if job_limit < 0 {
        warn!(
            "source parameter 'maxEvents' is deprecated; use 'untracked PSet maxEvents = {{untracked int32 input = {legacy}}}'"
        );
        Ok(i64::from(legacy))
    } else {
        warn!(
            "source parameter 'maxEvents' is deprecated and overridden by 'maxEvents.input = {job_limit}'"
        );
        Ok(job_limit)
    }
}

/// Wraps an [`InputSource`] with the job's event limit and open-record cache.
pub struct InputDriver {
    source: Box<dyn InputSource>,
    description: SourceDescription,
    ctx: PrincipalContext,
    bus: ActivityBus,
    remaining: Option<u64>,
    read_count: u64,
    run: Option<Arc<RunPrincipal>>,
    lumi: Option<Arc<LumiPrincipal>>,
}

impl InputDriver {
    pub fn new(
        source: Box<dyn InputSource>,
        description: SourceDescription,
        ctx: PrincipalContext,
        bus: ActivityBus,
    ) -> Self {
        let remaining = description.event_limit();
        Self {
            source,
            description,
            ctx,
            bus,
            remaining,
            read_count: 0,
            run: None,
            lumi: None,
        }
    }

    pub fn description(&self) -> &SourceDescription {
        &self.description
    }

    /// Events delivered since the start (or the last rewind).
    pub fn read_count(&self) -> u64 {
        self.read_count
    }

    /// Events still allowed; `None` when unlimited.
    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    pub fn begin_job(&mut self) -> Result<()> {
        self.source.begin_job()
    }

    pub fn end_job(&mut self) -> Result<()> {
        self.release();
        self.source.end_job()
    }

    /// Drops the cached run and lumi records.
    pub fn release(&mut self) {
        self.lumi = None;
        self.run = None;
    }

    /// Reads up to the next event; `None` when the source or the limit is exhausted.
    pub fn read_event(&mut self) -> Result<Option<EventPrincipal>> {
        if self.remaining == Some(0) {
            self.release();
            return Ok(None);
        }
        loop {
            self.bus.publish(Activity::new(ActivityKind::PreSource));
            let item = self.source.next_item_type()?;
            self.bus
                .publish(Activity::new(ActivityKind::PostSource).with_reason(item.as_str()));
            match item {
                ItemType::Stop => {
                    self.release();
                    return Ok(None);
                }
                ItemType::Run => {
                    let run = self.source.read_run(&self.ctx)?;
                    self.lumi = None;
                    self.run = Some(Arc::new(run));
                }
                ItemType::Lumi => {
                    let run = self.run.clone().ok_or_else(|| {
                        Error::Logic("input source delivered a lumi before any run".into())
                    })?;
                    self.lumi = Some(Arc::new(self.source.read_lumi(&self.ctx, run)?));
                }
                ItemType::Event => {
                    let lumi = self.lumi.clone().ok_or_else(|| {
                        Error::Logic("input source delivered an event before any lumi".into())
                    })?;
                    let event = self.source.read_event(&self.ctx, lumi)?;
                    self.delivered(event.id());
                    return Ok(Some(event));
                }
            }
        }
    }

    /// Reads event `id`.
    pub fn read_event_at(&mut self, id: EventID) -> Result<Option<EventPrincipal>> {
        self.source.seek(id)?;
        self.read_event()
    }

    fn delivered(&mut self, id: EventID) {
        self.read_count += 1;
        if let Some(n) = self.remaining.as_mut() {
            *n = n.saturating_sub(1);
        }
        info!(
            "Begin processing the {}th record. Run {}, Event {}",
            self.read_count,
            id.run(),
            id.event()
        );
    }

    pub fn skip(&mut self, offset: i64) -> Result<()> {
        self.source.skip(offset)
    }

    pub fn set_run(&mut self, run: RunNumber) -> Result<()> {
        self.source.set_run(run)
    }

    /// Returns the source to its first record and restores the event limit.
    pub fn rewind(&mut self) -> Result<()> {
        self.source.rewind()?;
        self.release();
        self.remaining = self.description.event_limit();
        self.read_count = 0;
        Ok(())
    }
}

impl std::fmt::Debug for InputDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputDriver")
            .field("source", &self.description.module.type_name)
            .field("read_count", &self.read_count)
            .field("remaining", &self.remaining)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Category;
    use crate::testing::{self, ScriptedSource};

    fn driver(source: ScriptedSource, max_events: i64) -> InputDriver {
        let fx = testing::Fixture::new(&[]);
        InputDriver::new(
            Box::new(source),
            testing::source_description(max_events),
            fx.context(),
            ActivityBus::default(),
        )
    }

    #[test]
    fn test_reads_nested_records() {
        let ids = vec![EventID::new(1, 1, 1), EventID::new(1, 1, 2), EventID::new(1, 2, 3), EventID::new(2, 1, 1)];
        let mut d = driver(ScriptedSource::new(ids), -1);

        let e1 = d.read_event().unwrap().unwrap();
        let e2 = d.read_event().unwrap().unwrap();
        let e3 = d.read_event().unwrap().unwrap();
        let e4 = d.read_event().unwrap().unwrap();
        assert!(Arc::ptr_eq(e1.lumi(), e2.lumi()));
        assert!(!Arc::ptr_eq(e2.lumi(), e3.lumi()));
        assert!(Arc::ptr_eq(e2.run(), e3.run()));
        assert!(!Arc::ptr_eq(e3.run(), e4.run()));
        assert!(d.read_event().unwrap().is_none());
        assert_eq!(d.read_count(), 4);
    }

    #[test]
    fn test_limit_stops_reading() {
        let ids = (1..=5).map(|e| EventID::new(1, 1, e)).collect();
        let mut d = driver(ScriptedSource::new(ids), 2);
        assert!(d.read_event().unwrap().is_some());
        assert!(d.read_event().unwrap().is_some());
        assert!(d.read_event().unwrap().is_none());
        assert_eq!(d.remaining(), Some(0));
    }

    #[test]
    fn test_event_without_lumi_is_logic_error() {
        let mut d = driver(ScriptedSource::events_only(vec![EventID::new(1, 1, 1)]), -1);
        let err = d.read_event().unwrap_err();
        assert_eq!(err.category(), Category::LogicError);
    }

    #[test]
    fn test_random_access_unsupported_by_default() {
        let mut d = driver(ScriptedSource::new(vec![]), -1);
        assert!(d.skip(1).unwrap_err().to_string().contains("Random access is not implemented"));
        assert!(d.rewind().unwrap_err().to_string().contains("Rewind is not implemented"));
        assert!(d.set_run(3).unwrap_err().to_string().contains("Run number cannot be modified"));
        assert_eq!(d.read_event_at(EventID::new(1, 1, 1)).unwrap_err().category(), Category::LogicError);
    }

    #[test]
    fn test_legacy_limit_applies_only_when_unlimited() {
        let pset = ParameterSet::new().with_untracked("maxEvents", 3i32);
        assert_eq!(resolve_max_events(-1, &pset).unwrap(), 3);
        assert_eq!(resolve_max_events(5, &pset).unwrap(), 5);
        assert_eq!(resolve_max_events(-1, &ParameterSet::new()).unwrap(), -1);
    }
}
