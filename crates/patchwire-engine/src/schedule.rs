//! Compiled processing schedule.
//!
//! A [`CompiledSchedule`] is a flat list of [`ProcessStep`] instructions built
//! once per graph load. The render path walks it front to back; it never
//! looks at connections or ids.
//!
//! Every port owns one buffer slot. Input slots and output slots live in two
//! separate pools so a unit can read its inputs while writing its outputs.
//!
//! ## Design Decisions
//!
//! - **Fan-in by accumulation**: the first connection into an input is a
//!   copy, later ones add on top. No clear step is needed and an input with
//!   one connection costs a single copy.
//! - **Steps are plain indices**: every variant is `Copy`, so executing the
//!   schedule touches no heap.

use patchwire_core::{input_count, output_count};
use patchwire_patch::ResolvedPatch;

/// A single instruction in the compiled schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStep {
    /// Overwrite an input slot with an output slot.
    CopyBuffer {
        /// Output slot to read.
        source: usize,
        /// Input slot to write.
        dest: usize,
    },
    /// Add an output slot into an input slot.
    AccumulateBuffer {
        /// Output slot to read.
        source: usize,
        /// Input slot to add into.
        dest: usize,
    },
    /// Render one module.
    Process {
        /// Module index.
        module: usize,
    },
}

/// Where each module's port buffers start in the slot pools.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotLayout {
    /// First input slot of each module.
    pub input_base: Vec<usize>,
    /// Number of input slots of each module.
    pub input_len: Vec<usize>,
    /// First output slot of each module.
    pub output_base: Vec<usize>,
    /// Number of output slots of each module.
    pub output_len: Vec<usize>,
    /// Total input slots.
    pub input_slots: usize,
    /// Total output slots.
    pub output_slots: usize,
}

impl SlotLayout {
    /// Assigns consecutive slots to every module's ports.
    pub fn for_patch(patch: &ResolvedPatch) -> Self {
        let mut layout = Self::default();
        for module in &patch.modules {
            let ins = input_count(module.descriptor.ports);
            let outs = output_count(module.descriptor.ports);
            layout.input_base.push(layout.input_slots);
            layout.input_len.push(ins);
            layout.output_base.push(layout.output_slots);
            layout.output_len.push(outs);
            layout.input_slots += ins;
            layout.output_slots += outs;
        }
        layout
    }
}

/// Immutable step list for one graph.
#[derive(Debug, Clone, Default)]
pub struct CompiledSchedule {
    /// Instructions in execution order.
    pub steps: Vec<ProcessStep>,
    /// Input slots that receive at least one connection.
    pub connected: Vec<bool>,
}

/// Emits the step list for `patch`.
///
/// For every module in processing order: gather each incoming connection into
/// its input slot, then render the module.
pub fn compile(patch: &ResolvedPatch, layout: &SlotLayout) -> CompiledSchedule {
    let mut steps = Vec::with_capacity(patch.connections.len() + patch.modules.len());
    let mut connected = vec![false; layout.input_slots];

    for &module in &patch.order {
        for conn in patch.connections.iter().filter(|c| c.to_module == module) {
            let source = layout.output_base[conn.from_module] + conn.from_port;
            let dest = layout.input_base[module] + conn.to_port;
            if connected[dest] {
                steps.push(ProcessStep::AccumulateBuffer { source, dest });
            } else {
                connected[dest] = true;
                steps.push(ProcessStep::CopyBuffer { source, dest });
            }
        }
        steps.push(ProcessStep::Process { module });
    }

    tracing::debug!(
        "graph_compile: {} steps for {} modules",
        steps.len(),
        patch.modules.len()
    );
    for (i, step) in steps.iter().enumerate() {
        tracing::debug!("  step[{}]: {:?}", i, step);
    }

    CompiledSchedule { steps, connected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwire_core::PortKind;
    use patchwire_patch::{Connection, ModuleSpec, PatchGraph, resolve};
    use patchwire_units::UnitRegistry;

    #[test]
    fn fan_in_copies_then_accumulates() {
        let patch = PatchGraph {
            modules: vec![
                ModuleSpec::new("a", "oscillator"),
                ModuleSpec::new("b", "oscillator"),
                ModuleSpec::new("vca", "gain"),
            ],
            connections: vec![
                Connection::new("a", "out", "vca", "in", PortKind::Audio),
                Connection::new("b", "out", "vca", "in", PortKind::Audio),
            ],
        };
        let resolved = resolve(&patch, &UnitRegistry::new()).unwrap();
        let layout = SlotLayout::for_patch(&resolved);
        // oscillator: 4 inputs, 1 output; gain: 2 inputs, 1 output
        assert_eq!(layout.input_base, vec![0, 4, 8]);
        assert_eq!(layout.output_base, vec![0, 1, 2]);
        assert_eq!(layout.input_slots, 10);

        let schedule = compile(&resolved, &layout);
        assert_eq!(
            schedule.steps,
            vec![
                ProcessStep::Process { module: 0 },
                ProcessStep::Process { module: 1 },
                ProcessStep::CopyBuffer { source: 0, dest: 8 },
                ProcessStep::AccumulateBuffer { source: 1, dest: 8 },
                ProcessStep::Process { module: 2 },
            ]
        );
        assert!(schedule.connected[8]);
        assert!(!schedule.connected[9]);
    }
}
