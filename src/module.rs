//! Module records and the attribute model they expose.

use std::collections::BTreeMap;

/// A top-level value bound by an executed module body.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    /// A reference to another loaded module, by fully-qualified name.
    Module(String),
}

/// Attributes of a module: its public top-level bindings.
pub type AttrMap = BTreeMap<String, Value>;

/// Which phase of the lifecycle a failed module died in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Compile,
    Execute,
}

/// Lifecycle of a cached module.
///
/// A record is inserted `Pending` before its body runs, so a body that
/// imports itself (directly or through a cycle) observes the in-progress
/// record instead of recursing. There is no transition out of `Ready` or
/// `Failed` short of an explicit reload, which discards the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Pending,
    Executing,
    Ready,
    Failed(FailureKind),
}

/// The cached representation of a loaded (or loading, or failed) module.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    full_name: String,
    url: String,
    source: String,
    attributes: AttrMap,
    state: ModuleState,
    failure: Option<String>,
}

impl ModuleRecord {
    pub(crate) fn new(full_name: String, url: String, source: String) -> Self {
        Self {
            full_name,
            url,
            source,
            attributes: AttrMap::new(),
            state: ModuleState::Pending,
            failure: None,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The URL of the artifact backing this module, used as its identifying
    /// location in diagnostics.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub fn attributes(&self) -> &AttrMap {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// The recorded failure message, if this module is `Failed`.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub(crate) fn begin_execution(&mut self) {
        self.state = ModuleState::Executing;
    }

    pub(crate) fn finish(&mut self, attributes: AttrMap) {
        self.attributes = attributes;
        self.state = ModuleState::Ready;
    }

    /// Record a failure. Attributes bound before the error are kept visible
    /// rather than rolled back.
    pub(crate) fn fail(&mut self, kind: FailureKind, message: String, attributes: AttrMap) {
        self.attributes = attributes;
        self.state = ModuleState::Failed(kind);
        self.failure = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_starts_pending_and_empty() {
        let record = ModuleRecord::new("a.b".into(), "mem://h/a/b.py".into(), String::new());
        assert_eq!(record.state(), ModuleState::Pending);
        assert!(record.attributes().is_empty());
        assert!(record.failure().is_none());
    }

    #[test]
    fn failure_keeps_partial_attributes() {
        let mut record = ModuleRecord::new("a".into(), "mem://h/a.py".into(), String::new());
        record.begin_execution();
        let mut attrs = AttrMap::new();
        attrs.insert("x".into(), Value::Int(1));
        record.fail(FailureKind::Execute, "boom".into(), attrs);
        assert_eq!(record.state(), ModuleState::Failed(FailureKind::Execute));
        assert_eq!(record.attribute("x"), Some(&Value::Int(1)));
        assert_eq!(record.failure(), Some("boom"));
    }
}
