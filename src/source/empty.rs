//! # EmptySource: generates records carrying ids and times only.
//!
//! Untracked parameters:
//!
//! | Name                            | Default     | Meaning                          |
//! |---------------------------------|-------------|----------------------------------|
//! | `firstRun`                      | 1           | run of the first event (0 stops) |
//! | `firstLuminosityBlock`          | 1           | lumi of the first event          |
//! | `firstEvent`                    | 1           | number of the first event        |
//! | `numberEventsInRun`             | 0           | events per run (0 = unlimited)   |
//! | `numberEventsInLuminosityBlock` | 0           | events per lumi (0 = unlimited)  |
//! | `firstTime`                     | 0           | time of the first event (ns)     |
//! | `timeBetweenEvents`             | 5 000 000   | time step (ns)                   |

use std::sync::Arc;

use super::input::{InputSource, ItemType};
use crate::config::ParameterSet;
use crate::error::Result;
use crate::identity::{EventID, LumiID, RunNumber, Timestamp};
use crate::principal::{
    EventAuxiliary, EventPrincipal, LumiAuxiliary, LumiPrincipal, PrincipalContext, RunAuxiliary, RunPrincipal,
};

const DEFAULT_TIME_BETWEEN_EVENTS: u64 = 1_000_000_000 / 200;

/// Endless generator of empty records.
#[derive(Debug, Clone)]
pub struct EmptySource {
    first: EventID,
    first_time: Timestamp,
    events_in_run: u32,
    events_in_lumi: u32,
    time_between: u64,

    next: EventID,
    time: Timestamp,
    in_run: u32,
    in_lumi: u32,
    new_run: bool,
    new_lumi: bool,
}

impl EmptySource {
    pub fn new(first: EventID, first_time: Timestamp) -> Self {
        Self {
            first,
            first_time,
            events_in_run: 0,
            events_in_lumi: 0,
            time_between: DEFAULT_TIME_BETWEEN_EVENTS,
            next: first,
            time: first_time,
            in_run: 0,
            in_lumi: 0,
            new_run: true,
            new_lumi: true,
        }
    }

    pub fn from_pset(pset: &ParameterSet) -> Result<Self> {
        let first = EventID::new(
            pset.untracked_or("firstRun", 1u32)?,
            pset.untracked_or("firstLuminosityBlock", 1u32)?,
            pset.untracked_or("firstEvent", 1u32)?,
        );
        let mut source = Self::new(first, Timestamp::new(pset.untracked_or("firstTime", 0u64)?));
        source.events_in_run = pset.untracked_or("numberEventsInRun", 0u32)?;
        source.events_in_lumi = pset.untracked_or("numberEventsInLuminosityBlock", 0u32)?;
        source.time_between = pset.untracked_or("timeBetweenEvents", DEFAULT_TIME_BETWEEN_EVENTS)?;
        Ok(source)
    }

    pub fn with_events_in_run(mut self, n: u32) -> Self {
        self.events_in_run = n;
        self
    }

    pub fn with_events_in_lumi(mut self, n: u32) -> Self {
        self.events_in_lumi = n;
        self
    }

    pub fn with_time_between_events(mut self, nanos: u64) -> Self {
        self.time_between = nanos;
        self
    }

    /// Id the next event will carry.
    pub fn next_event_id(&self) -> EventID {
        self.next
    }

    fn restart_at(&mut self, id: EventID) {
        self.next = id;
        self.in_run = 0;
        self.in_lumi = 0;
        self.new_run = true;
        self.new_lumi = true;
    }

    fn advance(&mut self) {
        self.in_run += 1;
        self.in_lumi += 1;
        self.time = self.time.advanced_by(self.time_between);

        if self.events_in_run > 0 && self.in_run >= self.events_in_run {
            let run = self.next.run().saturating_add(1);
            self.restart_at(EventID::new(run, self.first.lumi(), 1));
            return;
        }
        let mut lumi = self.next.lumi();
        if self.events_in_lumi > 0 && self.in_lumi >= self.events_in_lumi {
            lumi = lumi.saturating_add(1);
            self.in_lumi = 0;
            self.new_lumi = true;
        }
        self.next = EventID::new(self.next.run(), lumi, self.next.event().saturating_add(1));
    }
}

impl InputSource for EmptySource {
    fn next_item_type(&mut self) -> Result<ItemType> {
        Ok(if self.next.run() == 0 {
            ItemType::Stop
        } else if self.new_run {
            ItemType::Run
        } else if self.new_lumi {
            ItemType::Lumi
        } else {
            ItemType::Event
        })
    }

    fn read_run(&mut self, ctx: &PrincipalContext) -> Result<RunPrincipal> {
        self.new_run = false;
        self.new_lumi = true;
        ctx.run_principal(RunAuxiliary::new(self.next.run_id(), self.time))
    }

    fn read_lumi(&mut self, ctx: &PrincipalContext, run: Arc<RunPrincipal>) -> Result<LumiPrincipal> {
        self.new_lumi = false;
        let id = LumiID::new(self.next.run(), self.next.lumi());
        ctx.lumi_principal(LumiAuxiliary::new(id, self.time), run)
    }

    fn read_event(&mut self, ctx: &PrincipalContext, lumi: Arc<LumiPrincipal>) -> Result<EventPrincipal> {
        let event = ctx.event_principal(EventAuxiliary::new(self.next, self.time), lumi)?;
        self.advance();
        Ok(event)
    }

    /// Moves the event number; never below 1.
    fn skip(&mut self, offset: i64) -> Result<()> {
        let n = i64::from(self.next.event()).saturating_add(offset).clamp(1, i64::from(u32::MAX));
        let event = u32::try_from(n).unwrap_or(u32::MAX);
        self.next = EventID::new(self.next.run(), self.next.lumi(), event);
        Ok(())
    }

    fn seek(&mut self, id: EventID) -> Result<()> {
        self.restart_at(id);
        Ok(())
    }

    fn rewind(&mut self) -> Result<()> {
        self.time = self.first_time;
        self.restart_at(self.first);
        Ok(())
    }

    fn set_run(&mut self, run: RunNumber) -> Result<()> {
        if run != self.next.run() {
            self.restart_at(EventID::new(run, self.first.lumi(), self.first.event()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    fn drain(source: &mut EmptySource, fx: &Fixture, n: usize) -> Vec<(ItemType, Option<EventID>)> {
        let ctx = fx.context();
        let mut run = None;
        let mut lumi = None;
        let mut out = Vec::new();
        while out.len() < n {
            let item = source.next_item_type().unwrap();
            match item {
                ItemType::Stop => {
                    out.push((item, None));
                    break;
                }
                ItemType::Run => run = Some(Arc::new(source.read_run(&ctx).unwrap())),
                ItemType::Lumi => lumi = Some(Arc::new(source.read_lumi(&ctx, run.clone().unwrap()).unwrap())),
                ItemType::Event => {
                    let ev = source.read_event(&ctx, lumi.clone().unwrap()).unwrap();
                    out.push((item, Some(ev.id())));
                    continue;
                }
            }
            out.push((item, None));
        }
        out
    }

    fn ids(items: &[(ItemType, Option<EventID>)]) -> Vec<EventID> {
        items.iter().filter_map(|(_, id)| *id).collect()
    }

    #[test]
    fn test_run_and_lumi_boundaries() {
        let fx = Fixture::new(&[]);
        let mut source = EmptySource::new(EventID::new(1, 1, 1), Timestamp::new(0))
            .with_events_in_run(4)
            .with_events_in_lumi(2);
        let items = drain(&mut source, &fx, 10);
        let kinds: Vec<_> = items.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                ItemType::Run,
                ItemType::Lumi,
                ItemType::Event,
                ItemType::Event,
                ItemType::Lumi,
                ItemType::Event,
                ItemType::Event,
                ItemType::Run,
                ItemType::Lumi,
                ItemType::Event,
            ]
        );
        assert_eq!(
            ids(&items),
            vec![
                EventID::new(1, 1, 1),
                EventID::new(1, 1, 2),
                EventID::new(1, 2, 3),
                EventID::new(1, 2, 4),
                EventID::new(2, 1, 1),
            ]
        );
    }

    #[test]
    fn test_time_advances() {
        let fx = Fixture::new(&[]);
        let mut source = EmptySource::new(EventID::new(1, 1, 1), Timestamp::new(100)).with_time_between_events(10);
        let ctx = fx.context();
        assert_eq!(source.next_item_type().unwrap(), ItemType::Run);
        let run = Arc::new(source.read_run(&ctx).unwrap());
        let lumi = Arc::new(source.read_lumi(&ctx, run).unwrap());
        let a = source.read_event(&ctx, Arc::clone(&lumi)).unwrap();
        let b = source.read_event(&ctx, lumi).unwrap();
        assert_eq!(a.time(), Timestamp::new(100));
        assert_eq!(b.time(), Timestamp::new(110));
    }

    #[test]
    fn test_zero_run_stops() {
        let mut source = EmptySource::from_pset(&ParameterSet::new().with_untracked("firstRun", 0u32)).unwrap();
        assert_eq!(source.next_item_type().unwrap(), ItemType::Stop);
    }

    #[test]
    fn test_skip_rewind_and_set_run() {
        let fx = Fixture::new(&[]);
        let mut source = EmptySource::new(EventID::new(1, 1, 1), Timestamp::new(0));
        source.skip(4).unwrap();
        assert_eq!(source.next_event_id(), EventID::new(1, 1, 5));
        source.skip(-10).unwrap();
        assert_eq!(source.next_event_id().event(), 1);

        drain(&mut source, &fx, 4);
        source.set_run(7).unwrap();
        assert_eq!(source.next_item_type().unwrap(), ItemType::Run);
        assert_eq!(source.next_event_id(), EventID::new(7, 1, 1));

        source.rewind().unwrap();
        assert_eq!(source.next_event_id(), EventID::new(1, 1, 1));
        assert_eq!(source.next_item_type().unwrap(), ItemType::Run);
    }

    #[test]
    fn test_set_same_run_is_noop() {
        let fx = Fixture::new(&[]);
        let mut source = EmptySource::new(EventID::new(1, 1, 1), Timestamp::new(0));
        drain(&mut source, &fx, 3);
        source.set_run(1).unwrap();
        assert_eq!(source.next_item_type().unwrap(), ItemType::Event);
    }
}
