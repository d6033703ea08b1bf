//! On-demand execution of modules that sit on no path.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::worker::Worker;
use crate::error::{Error, Result};
use crate::principal::{EventPrincipal, Principal, UnscheduledHandler};
use crate::setup::EventSetup;

pub(crate) type OnDemandWorkers = Arc<HashMap<String, Arc<Mutex<Worker>>>>;

/// Handler installed on one event while the schedule runs it.
///
/// Holds the event weakly; the event owns the handler.
pub(crate) struct UnscheduledCallProducer {
    workers: OnDemandWorkers,
    event: Weak<EventPrincipal>,
    setup: EventSetup,
}

impl UnscheduledCallProducer {
    pub(crate) fn new(workers: OnDemandWorkers, event: &Arc<EventPrincipal>, setup: &EventSetup) -> Self {
        Self {
            workers,
            event: Arc::downgrade(event),
            setup: setup.clone(),
        }
    }
}

impl UnscheduledHandler for UnscheduledCallProducer {
    fn try_to_fill(&self, module_label: &str, _principal: &Principal) -> Result<bool> {
        let Some(worker) = self.workers.get(module_label) else {
            return Ok(false);
        };
        let event = self
            .event
            .upgrade()
            .ok_or_else(|| Error::Logic(format!("event released while running on-demand module '{module_label}'")))?;
        // A held lock means the module is already running further up this stack.
        let mut worker = worker.try_lock().ok_or_else(|| {
            Error::Logic(format!("circular on-demand dependency through module '{module_label}'"))
        })?;
        worker.run_event(&event, &self.setup)?;
        Ok(true)
    }
}
