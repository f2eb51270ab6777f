//! Validation of a [`PatchGraph`] against a [`UnitRegistry`].
//!
//! Resolution turns string ids into indices once, off the audio thread:
//! module types become [`UnitDescriptor`]s, endpoints become per-direction
//! port indices, and the module list gets a topological processing order.
//!
//! ## Design Decisions
//!
//! - **Cycles are rejected**: there is no implicit one-block delay, so a
//!   feedback loop has no defined evaluation order.
//! - **Kahn's algorithm** gives the order and detects cycles in one pass.
//!   Ties are broken by declaration order so the schedule is reproducible.
//! - **Parameters are checked against the descriptor**: unknown keys fail the
//!   load rather than being silently dropped.

use std::collections::HashMap;

use patchwire_core::{PortDirection, PortKind, PortSpec, input_index, output_index};
use patchwire_units::{UnitDescriptor, UnitRegistry};

use crate::error::GraphLoadError;
use crate::model::{Endpoint, ModuleSpec, ParamValue, PatchGraph};

/// Type tag of the main output node.
pub const OUTPUT_TYPE: &str = "output";

/// Type tag of the external input node.
pub const INPUT_TYPE: &str = "input";

/// Initial parameter assignment of a resolved module.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedParam {
    /// Value for the lane at `index` of the descriptor's parameter table.
    Numeric {
        /// Lane index.
        index: usize,
        /// Raw value; clamped when written to the lane.
        value: f32,
    },
    /// String value for a key the unit accepts as text.
    Text {
        /// Parameter key.
        key: String,
        /// Raw string.
        value: String,
    },
}

/// A module whose type tag was found in the registry.
#[derive(Debug, Clone)]
pub struct ResolvedModule {
    /// Module id from the patch.
    pub id: String,
    /// Registry entry for the module's type.
    pub descriptor: UnitDescriptor,
    /// Parameters in key order.
    pub params: Vec<ResolvedParam>,
}

/// A connection with ids replaced by indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedConnection {
    /// Source module index.
    pub from_module: usize,
    /// Source port index among the source's outputs.
    pub from_port: usize,
    /// Destination module index.
    pub to_module: usize,
    /// Destination port index among the destination's inputs.
    pub to_port: usize,
    /// Signal kind.
    pub kind: PortKind,
}

/// A validated patch ready to be instantiated.
#[derive(Debug, Clone)]
pub struct ResolvedPatch {
    /// Modules in declaration order.
    pub modules: Vec<ResolvedModule>,
    /// Connections in declaration order.
    pub connections: Vec<ResolvedConnection>,
    /// Module indices in processing order.
    pub order: Vec<usize>,
}

impl ResolvedPatch {
    /// Index of module `id`.
    pub fn module_index(&self, id: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.id == id)
    }

    /// Index of the `output` module, if the patch has one.
    pub fn output_module(&self) -> Option<usize> {
        self.first_of_type(OUTPUT_TYPE)
    }

    /// Index of the first `input` module, if any.
    pub fn input_module(&self) -> Option<usize> {
        self.first_of_type(INPUT_TYPE)
    }

    fn first_of_type(&self, type_tag: &str) -> Option<usize> {
        self.modules
            .iter()
            .position(|m| m.descriptor.id == type_tag)
    }
}

/// Parses and resolves a patch in one step.
pub fn load(json: &str, registry: &UnitRegistry) -> Result<ResolvedPatch, GraphLoadError> {
    resolve(&PatchGraph::from_json(json)?, registry)
}

/// Validates `patch` and computes its processing order.
///
/// # Errors
///
/// The first [`GraphLoadError`] found, checking modules, then connections,
/// then acyclicity.
pub fn resolve(
    patch: &PatchGraph,
    registry: &UnitRegistry,
) -> Result<ResolvedPatch, GraphLoadError> {
    let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(patch.modules.len());
    let mut modules = Vec::with_capacity(patch.modules.len());
    let mut output_id: Option<&str> = None;

    for spec in &patch.modules {
        if index_of.insert(spec.id.as_str(), modules.len()).is_some() {
            return Err(GraphLoadError::DuplicateModule(spec.id.clone()));
        }
        let descriptor = *registry
            .descriptor(&spec.type_tag)
            .ok_or_else(|| GraphLoadError::UnknownType {
                module: spec.id.clone(),
                type_tag: spec.type_tag.clone(),
            })?;
        if descriptor.id == OUTPUT_TYPE {
            if let Some(first) = output_id {
                return Err(GraphLoadError::MultipleOutputs {
                    first: first.to_owned(),
                    second: spec.id.clone(),
                });
            }
            output_id = Some(spec.id.as_str());
        }
        let params = resolve_params(spec, &descriptor)?;
        modules.push(ResolvedModule {
            id: spec.id.clone(),
            descriptor,
            params,
        });
    }

    let mut connections = Vec::with_capacity(patch.connections.len());
    for conn in &patch.connections {
        let (from_module, from_spec) = find_port(&index_of, &modules, &conn.from)?;
        let (to_module, to_spec) = find_port(&index_of, &modules, &conn.to)?;

        if from_spec.direction != PortDirection::Output {
            return Err(direction_error(&conn.from, "source"));
        }
        if to_spec.direction != PortDirection::Input {
            return Err(direction_error(&conn.to, "destination"));
        }
        for (endpoint, spec) in [(&conn.from, from_spec), (&conn.to, to_spec)] {
            if spec.kind != conn.kind {
                return Err(GraphLoadError::KindMismatch {
                    from: conn.from.to_string(),
                    to: conn.to.to_string(),
                    declared: conn.kind,
                    port: endpoint.to_string(),
                    actual: spec.kind,
                });
            }
        }

        // Both lookups succeeded above, so the per-direction indices exist.
        let from_port = output_index(modules[from_module].descriptor.ports, &conn.from.port_id)
            .unwrap_or_default();
        let to_port =
            input_index(modules[to_module].descriptor.ports, &conn.to.port_id).unwrap_or_default();

        connections.push(ResolvedConnection {
            from_module,
            from_port,
            to_module,
            to_port,
            kind: conn.kind,
        });
    }

    let order = kahn_sort(modules.len(), &connections)
        .map_err(|stuck| GraphLoadError::Cycle(modules[stuck].id.clone()))?;

    tracing::debug!(
        "graph_resolve: {} modules, {} connections, order {:?}",
        modules.len(),
        connections.len(),
        order.iter().map(|&i| modules[i].id.as_str()).collect::<Vec<_>>()
    );

    Ok(ResolvedPatch {
        modules,
        connections,
        order,
    })
}

fn resolve_params(
    spec: &ModuleSpec,
    descriptor: &UnitDescriptor,
) -> Result<Vec<ResolvedParam>, GraphLoadError> {
    let mut params = Vec::with_capacity(spec.params.len());
    for (key, value) in &spec.params {
        let numeric = descriptor.params.iter().position(|p| p.key == key.as_str());
        let textual = descriptor.string_params.contains(&key.as_str());
        let resolved = match (value, numeric) {
            (ParamValue::Text(text), _) if textual => ResolvedParam::Text {
                key: key.clone(),
                value: text.clone(),
            },
            (ParamValue::Text(_), Some(_)) => {
                return Err(GraphLoadError::invalid_param(
                    &spec.id,
                    key,
                    "expected a number",
                ));
            }
            (value, Some(index)) => {
                let value = value.as_number().unwrap_or_default();
                if !value.is_finite() {
                    return Err(GraphLoadError::invalid_param(&spec.id, key, "not finite"));
                }
                ResolvedParam::Numeric { index, value }
            }
            (_, None) if textual => {
                return Err(GraphLoadError::invalid_param(
                    &spec.id,
                    key,
                    "expected a string",
                ));
            }
            _ => {
                return Err(GraphLoadError::UnknownParam {
                    module: spec.id.clone(),
                    param: key.clone(),
                });
            }
        };
        params.push(resolved);
    }
    Ok(params)
}

fn find_port<'d>(
    index_of: &HashMap<&str, usize>,
    modules: &'d [ResolvedModule],
    endpoint: &Endpoint,
) -> Result<(usize, &'d PortSpec), GraphLoadError> {
    let &module = index_of
        .get(endpoint.module_id.as_str())
        .ok_or_else(|| GraphLoadError::UnknownModule(endpoint.module_id.clone()))?;
    let port = modules[module]
        .descriptor
        .ports
        .iter()
        .find(|p| p.id == endpoint.port_id)
        .ok_or_else(|| GraphLoadError::UnknownPort {
            module: endpoint.module_id.clone(),
            port: endpoint.port_id.clone(),
        })?;
    Ok((module, port))
}

fn direction_error(endpoint: &Endpoint, end: &'static str) -> GraphLoadError {
    GraphLoadError::DirectionMismatch {
        module: endpoint.module_id.clone(),
        port: endpoint.port_id.clone(),
        end,
    }
}

/// Kahn's algorithm over `n` modules.
///
/// Returns the processing order, or the index of a module left on a cycle.
fn kahn_sort(n: usize, connections: &[ResolvedConnection]) -> Result<Vec<usize>, usize> {
    let mut in_degree = vec![0u32; n];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
    for conn in connections {
        in_degree[conn.to_module] += 1;
        outgoing[conn.from_module].push(conn.to_module);
    }

    // Seeded in reverse so `pop` yields declaration order among ready modules.
    let mut queue: Vec<usize> = (0..n).rev().filter(|&i| in_degree[i] == 0).collect();
    let mut sorted = Vec::with_capacity(n);

    while let Some(idx) = queue.pop() {
        sorted.push(idx);
        let mut ready = Vec::new();
        for &to in &outgoing[idx] {
            in_degree[to] -= 1;
            if in_degree[to] == 0 {
                ready.push(to);
            }
        }
        ready.sort_unstable_by(|a, b| b.cmp(a));
        queue.extend(ready);
    }

    if sorted.len() != n {
        let stuck = (0..n).find(|&i| in_degree[i] > 0).unwrap_or_default();
        return Err(stuck);
    }
    Ok(sorted)
}
