//! # Input source contract.
//!
//! A source hands out a nested stream of items:
//!
//! ```text
//! Run ─► Lumi ─► Event ─► Event ─► Lumi ─► Event ─► Run ─► ... ─► Stop
//! ```
//!
//! [`next_item_type`](InputSource::next_item_type) peeks at what comes next
//! without consuming it; the matching `read_*` call consumes the item. The
//! [`InputDriver`](super::InputDriver) keeps the open run and lumi records and
//! rejects an event that arrives without an open lumi (or a lumi without a run).
//!
//! Random access (`skip`, `seek`, `rewind`, `set_run`) is optional; the default
//! bodies fail with a logic error.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::identity::{EventID, RunNumber};
use crate::principal::{EventPrincipal, LumiPrincipal, PrincipalContext, RunPrincipal};

/// What the source will deliver next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Stop,
    Run,
    Lumi,
    Event,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Stop => "stop",
            ItemType::Run => "run",
            ItemType::Lumi => "lumi",
            ItemType::Event => "event",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A producer of run, lumi and event records.
pub trait InputSource: Send {
    /// Type of the next item; does not consume it.
    fn next_item_type(&mut self) -> Result<ItemType>;

    /// Consumes a [`ItemType::Run`] item.
    fn read_run(&mut self, ctx: &PrincipalContext) -> Result<RunPrincipal>;

    /// Consumes a [`ItemType::Lumi`] item belonging to `run`.
    fn read_lumi(&mut self, ctx: &PrincipalContext, run: Arc<RunPrincipal>) -> Result<LumiPrincipal>;

    /// Consumes a [`ItemType::Event`] item belonging to `lumi`.
    fn read_event(&mut self, ctx: &PrincipalContext, lumi: Arc<LumiPrincipal>) -> Result<EventPrincipal>;

    fn begin_job(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_job(&mut self) -> Result<()> {
        Ok(())
    }

    /// Moves `offset` events forward (negative: backward).
    fn skip(&mut self, _offset: i64) -> Result<()> {
        Err(Error::Logic(
            "Random access is not implemented for this type of input source".into(),
        ))
    }

    /// Positions the source so the next event read is `id`.
    fn seek(&mut self, _id: EventID) -> Result<()> {
        Err(Error::Logic(
            "Random access is not implemented for this type of input source".into(),
        ))
    }

    /// Returns to the first record.
    fn rewind(&mut self) -> Result<()> {
        Err(Error::Logic("Rewind is not implemented for this type of input source".into()))
    }

    /// Continues with run `run`.
    fn set_run(&mut self, _run: RunNumber) -> Result<()> {
        Err(Error::Logic(
            "Run number cannot be modified for this type of input source".into(),
        ))
    }
}
