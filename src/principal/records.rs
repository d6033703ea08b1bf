//! The three record kinds: run, luminosity block, event.
//!
//! Each child holds an `Arc` to its parent; parents never reference children.

use std::ops::Deref;
use std::sync::Arc;

use super::context::PrincipalContext;
use super::principal::Principal;
use crate::error::Result;
use crate::identity::{BranchType, EventID, LumiID, ProcessHistory, RunID, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunAuxiliary {
    pub id: RunID,
    pub begin_time: Timestamp,
    pub end_time: Timestamp,
}

impl RunAuxiliary {
    pub fn new(id: RunID, begin_time: Timestamp) -> Self {
        Self {
            id,
            begin_time,
            end_time: Timestamp::invalid(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LumiAuxiliary {
    pub id: LumiID,
    pub begin_time: Timestamp,
    pub end_time: Timestamp,
}

impl LumiAuxiliary {
    pub fn new(id: LumiID, begin_time: Timestamp) -> Self {
        Self {
            id,
            begin_time,
            end_time: Timestamp::invalid(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventAuxiliary {
    pub id: EventID,
    pub time: Timestamp,
}

impl EventAuxiliary {
    pub fn new(id: EventID, time: Timestamp) -> Self {
        Self { id, time }
    }
}

#[derive(Debug)]
pub struct RunPrincipal {
    aux: RunAuxiliary,
    principal: Principal,
}

impl RunPrincipal {
    pub fn new(aux: RunAuxiliary, ctx: PrincipalContext, history: ProcessHistory) -> Result<Self> {
        Ok(Self {
            aux,
            principal: Principal::new(BranchType::Run, ctx, history)?,
        })
    }

    pub fn aux(&self) -> &RunAuxiliary {
        &self.aux
    }

    pub fn id(&self) -> RunID {
        self.aux.id
    }
}

impl Deref for RunPrincipal {
    type Target = Principal;

    fn deref(&self) -> &Principal {
        &self.principal
    }
}

#[derive(Debug)]
pub struct LumiPrincipal {
    aux: LumiAuxiliary,
    run: Arc<RunPrincipal>,
    principal: Principal,
}

impl LumiPrincipal {
    pub fn new(
        aux: LumiAuxiliary,
        run: Arc<RunPrincipal>,
        ctx: PrincipalContext,
        history: ProcessHistory,
    ) -> Result<Self> {
        Ok(Self {
            aux,
            run,
            principal: Principal::new(BranchType::Lumi, ctx, history)?,
        })
    }

    pub fn aux(&self) -> &LumiAuxiliary {
        &self.aux
    }

    pub fn id(&self) -> LumiID {
        self.aux.id
    }

    pub fn run(&self) -> &Arc<RunPrincipal> {
        &self.run
    }
}

impl Deref for LumiPrincipal {
    type Target = Principal;

    fn deref(&self) -> &Principal {
        &self.principal
    }
}

#[derive(Debug)]
pub struct EventPrincipal {
    aux: EventAuxiliary,
    lumi: Arc<LumiPrincipal>,
    principal: Principal,
}

impl EventPrincipal {
    pub fn new(
        aux: EventAuxiliary,
        lumi: Arc<LumiPrincipal>,
        ctx: PrincipalContext,
        history: ProcessHistory,
    ) -> Result<Self> {
        Ok(Self {
            aux,
            lumi,
            principal: Principal::new(BranchType::Event, ctx, history)?,
        })
    }

    pub fn aux(&self) -> &EventAuxiliary {
        &self.aux
    }

    pub fn id(&self) -> EventID {
        self.aux.id
    }

    pub fn time(&self) -> Timestamp {
        self.aux.time
    }

    pub fn lumi(&self) -> &Arc<LumiPrincipal> {
        &self.lumi
    }

    pub fn run(&self) -> &Arc<RunPrincipal> {
        self.lumi.run()
    }

    /// True if `other` belongs to the same luminosity block.
    pub fn same_lumi(&self, other: &EventPrincipal) -> bool {
        self.aux.id.lumi_id() == other.aux.id.lumi_id()
    }
}

impl Deref for EventPrincipal {
    type Target = Principal;

    fn deref(&self) -> &Principal {
        &self.principal
    }
}
