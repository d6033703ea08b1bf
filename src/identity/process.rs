//! Which pipeline produced a product: [`ProcessConfiguration`] and [`ProcessHistory`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::digest::{Hasher, ParameterSetID, ProcessHistoryID};
use crate::error::{Error, Result};

/// One execution of one pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessConfiguration {
    pub process_name: String,
    pub release_version: String,
    pub pass_id: String,
    pub parameter_set_id: ParameterSetID,
}

impl ProcessConfiguration {
    pub fn new(
        process_name: impl Into<String>,
        release_version: impl Into<String>,
        pass_id: impl Into<String>,
        parameter_set_id: ParameterSetID,
    ) -> Self {
        Self {
            process_name: process_name.into(),
            release_version: release_version.into(),
            pass_id: pass_id.into(),
            parameter_set_id,
        }
    }
}

impl fmt::Display for ProcessConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' '{}' {}",
            self.process_name, self.release_version, self.pass_id, self.parameter_set_id
        )
    }
}

/// Append-only ordered list of the processes a record went through.
///
/// A process name appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessHistory {
    data: Vec<ProcessConfiguration>,
}

impl ProcessHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `pc`; fails with [`Error::DuplicateProcess`] if its name is already present.
    pub fn push(&mut self, pc: ProcessConfiguration) -> Result<()> {
        if self.contains_process(&pc.process_name) {
            return Err(Error::DuplicateProcess(pc.process_name));
        }
        self.data.push(pc);
        Ok(())
    }

    pub fn contains_process(&self, name: &str) -> bool {
        self.data.iter().any(|pc| pc.process_name == name)
    }

    /// Position of process `name`, oldest first.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.data.iter().position(|pc| pc.process_name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProcessConfiguration> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn last(&self) -> Option<&ProcessConfiguration> {
        self.data.last()
    }

    pub fn id(&self) -> ProcessHistoryID {
        let mut h = Hasher::new();
        for pc in &self.data {
            h.field(&pc.process_name)
                .field(&pc.release_version)
                .field(&pc.pass_id)
                .field(pc.parameter_set_id.as_bytes());
        }
        ProcessHistoryID::from_bytes(h.finish())
    }
}

impl<'a> IntoIterator for &'a ProcessHistory {
    type Item = &'a ProcessConfiguration;
    type IntoIter = std::slice::Iter<'a, ProcessConfiguration>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}
