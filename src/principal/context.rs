//! Shared job state every principal is built from.

use std::sync::Arc;

use super::reader::DelayedReader;
use crate::identity::{ProcessConfiguration, ProcessHistory};
use crate::provenance::{JobRegistries, ProductRegistry};
use crate::error::Result;

use super::records::{EventAuxiliary, EventPrincipal, LumiAuxiliary, LumiPrincipal, RunAuxiliary, RunPrincipal};

/// Frozen registry, current process, job stores and the storage reader.
///
/// Cheap to clone; handed to input sources so they can open records.
#[derive(Clone)]
pub struct PrincipalContext {
    registry: Arc<ProductRegistry>,
    process: Arc<ProcessConfiguration>,
    registries: Arc<JobRegistries>,
    reader: Arc<dyn DelayedReader>,
}

impl PrincipalContext {
    pub fn new(
        registry: Arc<ProductRegistry>,
        process: Arc<ProcessConfiguration>,
        registries: Arc<JobRegistries>,
        reader: Arc<dyn DelayedReader>,
    ) -> Self {
        Self {
            registry,
            process,
            registries,
            reader,
        }
    }

    pub fn registry(&self) -> &ProductRegistry {
        &self.registry
    }

    pub fn process(&self) -> &ProcessConfiguration {
        &self.process
    }

    pub fn registries(&self) -> &JobRegistries {
        &self.registries
    }

    pub fn reader(&self) -> &dyn DelayedReader {
        self.reader.as_ref()
    }

    /// Opens a run record produced by this process only.
    pub fn run_principal(&self, aux: RunAuxiliary) -> Result<RunPrincipal> {
        RunPrincipal::new(aux, self.clone(), ProcessHistory::new())
    }

    /// Opens a lumi record produced by this process only.
    pub fn lumi_principal(&self, aux: LumiAuxiliary, run: Arc<RunPrincipal>) -> Result<LumiPrincipal> {
        LumiPrincipal::new(aux, run, self.clone(), ProcessHistory::new())
    }

    /// Opens an event record produced by this process only.
    pub fn event_principal(&self, aux: EventAuxiliary, lumi: Arc<LumiPrincipal>) -> Result<EventPrincipal> {
        EventPrincipal::new(aux, lumi, self.clone(), ProcessHistory::new())
    }
}
