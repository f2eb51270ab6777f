//! Serde model of the patch-graph JSON document.
//!
//! ```json
//! {
//!   "modules": [{"id": "osc1", "type": "oscillator", "params": {"frequency": 440}}],
//!   "connections": [{"from": {"moduleId": "osc1", "portId": "out"},
//!                    "to":   {"moduleId": "vca",  "portId": "in"},
//!                    "kind": "audio"}]
//! }
//! ```
//!
//! The model is purely structural. Whether ids, ports and kinds line up is
//! checked by [`crate::resolve`].

use std::collections::BTreeMap;

use patchwire_core::PortKind;
use serde::{Deserialize, Serialize};

use crate::error::GraphLoadError;

/// A whole patch: modules plus the connections between their ports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchGraph {
    /// Module instances, in declaration order.
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
    /// Directed port-to-port connections.
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl PatchGraph {
    /// Parses a patch from JSON text.
    pub fn from_json(json: &str) -> Result<Self, GraphLoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the patch back to pretty JSON.
    pub fn to_json(&self) -> Result<String, GraphLoadError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Module with id `id`.
    pub fn module(&self, id: &str) -> Option<&ModuleSpec> {
        self.modules.iter().find(|m| m.id == id)
    }
}

/// One module instance in a patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Unique id within the patch.
    pub id: String,
    /// Registry type tag, e.g. `"oscillator"`.
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Initial parameter values keyed by parameter name.
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl ModuleSpec {
    /// A module with no parameters set.
    pub fn new(id: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_tag: type_tag.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter assignment.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A scalar parameter value as it appears in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// `true` / `false`, read as 1 / 0.
    Bool(bool),
    /// Any JSON number.
    Number(f64),
    /// A string, routed to the unit's string-parameter path.
    Text(String),
}

impl ParamValue {
    /// Numeric reading of the value; `None` for text.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            ParamValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ParamValue::Number(n) => Some(*n as f32),
            ParamValue::Text(_) => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Number(f64::from(v))
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_owned())
    }
}

/// A directed edge from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Source (must be an output port).
    pub from: Endpoint,
    /// Destination (must be an input port).
    pub to: Endpoint,
    /// Signal kind; must match both ports.
    pub kind: PortKind,
}

impl Connection {
    /// Connection `from_module.from_port -> to_module.to_port`.
    pub fn new(
        from_module: &str,
        from_port: &str,
        to_module: &str,
        to_port: &str,
        kind: PortKind,
    ) -> Self {
        Self {
            from: Endpoint::new(from_module, from_port),
            to: Endpoint::new(to_module, to_port),
            kind,
        }
    }
}

/// A `(module, port)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Module id.
    pub module_id: String,
    /// Port id on that module.
    pub port_id: String,
}

impl Endpoint {
    /// Builds an endpoint.
    pub fn new(module_id: impl Into<String>, port_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            port_id: port_id.into(),
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.module_id, self.port_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_documented_shape() {
        let json = r#"{
            "modules": [
                {"id": "osc1", "type": "oscillator", "params": {"frequency": 440, "waveform": "saw"}},
                {"id": "vca", "type": "gain", "params": {"gain": 0.5}},
                {"id": "env", "type": "envelope", "params": {"retrigger": true}}
            ],
            "connections": [
                {"from": {"moduleId": "osc1", "portId": "out"},
                 "to": {"moduleId": "vca", "portId": "in"},
                 "kind": "audio"}
            ]
        }"#;
        let patch = PatchGraph::from_json(json).unwrap();
        assert_eq!(patch.modules.len(), 3);
        let osc = patch.module("osc1").unwrap();
        assert_eq!(osc.type_tag, "oscillator");
        assert_eq!(osc.params["frequency"].as_number(), Some(440.0));
        assert_eq!(osc.params["waveform"], ParamValue::Text("saw".into()));
        assert_eq!(
            patch.module("env").unwrap().params["retrigger"].as_number(),
            Some(1.0)
        );
        assert_eq!(patch.connections[0].kind, PortKind::Audio);
        assert_eq!(patch.connections[0].to.to_string(), "vca.in");
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let patch = PatchGraph::from_json("{}").unwrap();
        assert!(patch.modules.is_empty());
        assert!(patch.connections.is_empty());
    }

    #[test]
    fn rejects_unknown_kind() {
        let json = r#"{"connections": [{"from": {"moduleId": "a", "portId": "out"},
                       "to": {"moduleId": "b", "portId": "in"}, "kind": "midi"}]}"#;
        assert!(matches!(
            PatchGraph::from_json(json),
            Err(GraphLoadError::Json(_))
        ));
    }

    #[test]
    fn builder_survives_json() {
        let patch = PatchGraph {
            modules: vec![
                ModuleSpec::new("osc", "oscillator").with_param("frequency", 220.0),
                ModuleSpec::new("out", "output"),
            ],
            connections: vec![Connection::new("osc", "out", "out", "in", PortKind::Audio)],
        };
        let text = patch.to_json().unwrap();
        assert!(text.contains("\"moduleId\""));
        assert_eq!(PatchGraph::from_json(&text).unwrap(), patch);
    }
}
