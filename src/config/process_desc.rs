//! # Job description.
//!
//! [`ProcessDesc`] is the blob an external configuration front-end produces:
//! process name, input source, module instances, paths and end paths, plus the
//! untracked `options` and `maxEvents` parameter sets.
//!
//! Path entries are module labels, optionally prefixed:
//! - `!label` inverts the module's filter decision
//! - `-label` ignores the module's filter decision

use serde::{Deserialize, Serialize};

use super::pset::ParameterSet;
use crate::error::{Error, Result};
use crate::identity::{Hasher, ParameterSetID};

/// The input source of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDesc {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub pset: ParameterSet,
}

/// One module instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDesc {
    pub label: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub pset: ParameterSet,
}

/// One named, ordered list of module labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDesc {
    pub name: String,
    pub modules: Vec<String>,
}

/// Complete description of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDesc {
    pub process_name: String,
    #[serde(default)]
    pub release_version: String,
    #[serde(default)]
    pub pass_id: String,
    pub source: SourceDesc,
    #[serde(default)]
    pub modules: Vec<ModuleDesc>,
    #[serde(default)]
    pub paths: Vec<PathDesc>,
    #[serde(default)]
    pub end_paths: Vec<PathDesc>,
    #[serde(default)]
    pub options: ParameterSet,
    #[serde(default)]
    pub max_events: ParameterSet,
}

impl ProcessDesc {
    pub fn new(process_name: impl Into<String>, source_type: impl Into<String>, source: ParameterSet) -> Self {
        Self {
            process_name: process_name.into(),
            release_version: String::new(),
            pass_id: String::new(),
            source: SourceDesc {
                type_name: source_type.into(),
                pset: source,
            },
            modules: Vec::new(),
            paths: Vec::new(),
            end_paths: Vec::new(),
            options: ParameterSet::new(),
            max_events: ParameterSet::new(),
        }
    }

    /// Parses a JSON job description and validates it.
    pub fn from_json(text: &str) -> Result<Self> {
        let desc: ProcessDesc = serde_json::from_str(text)
            .map_err(|e| Error::Configuration(format!("cannot parse process description: {e}")))?;
        desc.validate()?;
        Ok(desc)
    }

    #[must_use]
    pub fn with_module(mut self, label: impl Into<String>, type_name: impl Into<String>, pset: ParameterSet) -> Self {
        self.modules.push(ModuleDesc {
            label: label.into(),
            type_name: type_name.into(),
            pset,
        });
        self
    }

    #[must_use]
    pub fn with_path<S: Into<String>>(mut self, name: impl Into<String>, modules: impl IntoIterator<Item = S>) -> Self {
        self.paths.push(PathDesc {
            name: name.into(),
            modules: modules.into_iter().map(Into::into).collect(),
        });
        self
    }

    #[must_use]
    pub fn with_end_path<S: Into<String>>(mut self, name: impl Into<String>, modules: impl IntoIterator<Item = S>) -> Self {
        self.end_paths.push(PathDesc {
            name: name.into(),
            modules: modules.into_iter().map(Into::into).collect(),
        });
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ParameterSet) -> Self {
        self.options = options;
        self
    }

    /// Sets `maxEvents.input`.
    #[must_use]
    pub fn with_max_events(mut self, n: i32) -> Self {
        self.max_events.add_untracked("input", n);
        self
    }

    pub fn module(&self, label: &str) -> Option<&ModuleDesc> {
        self.modules.iter().find(|m| m.label == label)
    }

    /// Checks structural consistency: non-empty unique names, no empty labels.
    ///
    /// Unknown labels inside paths are reported later, when the schedule is built.
    pub fn validate(&self) -> Result<()> {
        if self.process_name.is_empty() {
            return Err(Error::Configuration("process name must not be empty".into()));
        }
        let mut labels = std::collections::HashSet::new();
        for m in &self.modules {
            if m.label.is_empty() {
                return Err(Error::Configuration(format!(
                    "module of type '{}' has an empty label",
                    m.type_name
                )));
            }
            if !labels.insert(m.label.as_str()) {
                return Err(Error::Configuration(format!("module label '{}' is defined twice", m.label)));
            }
        }
        let mut names = std::collections::HashSet::new();
        for p in self.paths.iter().chain(&self.end_paths) {
            if !names.insert(p.name.as_str()) {
                return Err(Error::Configuration(format!("path name '{}' is defined twice", p.name)));
            }
        }
        Ok(())
    }

    /// Identity of the whole job configuration.
    pub fn id(&self) -> ParameterSetID {
        let mut h = Hasher::new();
        h.field(&self.process_name);
        h.field(&self.source.type_name).field(self.source.pset.id().as_bytes());
        for m in &self.modules {
            h.field(&m.label).field(&m.type_name).field(m.pset.id().as_bytes());
        }
        for p in self.paths.iter().chain(&self.end_paths) {
            h.field(&p.name);
            for m in &p.modules {
                h.field(m);
            }
        }
        ParameterSetID::from_bytes(h.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"{
        "process_name": "TEST",
        "source": { "type": "EmptySource", "pset": { "numberEventsInRun": { "value": { "UInt32": 3 }, "tracked": false } } },
        "modules": [ { "label": "pre", "type": "Prescaler", "pset": { "prescaleFactor": { "value": { "Int32": 2 } } } } ],
        "paths": [ { "name": "p1", "modules": ["pre"] } ],
        "max_events": { "input": { "value": { "Int32": 10 }, "tracked": false } }
    }"#;

    #[test]
    fn test_from_json() {
        let desc = ProcessDesc::from_json(JOB).unwrap();
        assert_eq!(desc.process_name, "TEST");
        assert_eq!(desc.source.type_name, "EmptySource");
        assert_eq!(desc.module("pre").unwrap().type_name, "Prescaler");
        assert_eq!(desc.paths[0].modules, vec!["pre"]);
        assert_eq!(desc.max_events.untracked_or("input", -1i32).unwrap(), 10);
    }

    #[test]
    fn test_malformed_json_is_configuration_error() {
        let err = ProcessDesc::from_json("{ nope").unwrap_err();
        assert_eq!(err.category(), crate::Category::Configuration);
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let desc = ProcessDesc::new("P", "EmptySource", ParameterSet::new())
            .with_module("a", "X", ParameterSet::new())
            .with_module("a", "Y", ParameterSet::new());
        assert!(desc.validate().is_err());
    }

    #[test]
    fn test_id_tracks_paths() {
        let a = ProcessDesc::new("P", "EmptySource", ParameterSet::new()).with_path("p", ["x"]);
        let b = ProcessDesc::new("P", "EmptySource", ParameterSet::new()).with_path("p", ["y"]);
        assert_ne!(a.id(), b.id());
    }
}
