//! Instantiated patch: units, parameter lanes, port buffers and schedule.
//!
//! A [`Rack`] is built on the control side from a [`ResolvedPatch`], with
//! every buffer sized for the engine's block capacity and channel count. The
//! render path only executes it.

use std::collections::HashMap;

use patchwire_core::{ParamLane, RenderContext, SignalBuffer, Unit, UnitIo, default_lanes};
use patchwire_patch::{GraphLoadError, ResolvedParam, ResolvedPatch};
use patchwire_units::UnitInstance;

use crate::context::EngineContext;
use crate::schedule::{CompiledSchedule, ProcessStep, SlotLayout, compile};

/// Type tag of monitor nodes.
const MONITOR_TYPE: &str = "monitor";

/// One unit plus its parameter lanes.
#[derive(Debug)]
pub struct RackModule {
    id: String,
    unit: UnitInstance,
    lanes: Vec<ParamLane>,
}

impl RackModule {
    /// Module id from the patch.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The unit.
    pub fn unit(&self) -> &UnitInstance {
        &self.unit
    }

    /// Mutable access to the unit, for lane and transport commands.
    pub fn unit_mut(&mut self) -> &mut UnitInstance {
        &mut self.unit
    }

    /// Current base value of parameter `key`.
    pub fn param(&self, key: &str) -> Option<f32> {
        let index = self.param_index(key)?;
        self.lanes.get(index).map(ParamLane::base)
    }

    /// Sets parameter `key`, clamped to its range. False for unknown keys.
    pub fn set_param(&mut self, key: &str, value: f32) -> bool {
        patchwire_core::set_lane(self.unit.params(), &mut self.lanes, key, value)
    }

    /// Applies a string parameter. False when the unit rejects it.
    pub fn set_param_string(&mut self, key: &str, value: &str) -> bool {
        self.unit.set_param_string(key, value, &mut self.lanes)
    }

    /// Lane of parameter `key`.
    pub fn lane_mut(&mut self, key: &str) -> Option<&mut ParamLane> {
        let index = self.param_index(key)?;
        self.lanes.get_mut(index)
    }

    fn param_index(&self, key: &str) -> Option<usize> {
        patchwire_core::param_index(self.unit.params(), key)
    }
}

/// A runnable graph.
pub struct Rack {
    modules: Vec<RackModule>,
    input_slots: Vec<SignalBuffer>,
    output_slots: Vec<SignalBuffer>,
    layout: SlotLayout,
    schedule: CompiledSchedule,
    index_of: HashMap<String, usize>,
    input_module: Option<usize>,
    output_module: Option<usize>,
    channels: usize,
    capacity: usize,
}

impl std::fmt::Debug for Rack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rack")
            .field("modules", &self.module_ids().collect::<Vec<_>>())
            .field("steps", &self.schedule.steps.len())
            .field("channels", &self.channels)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Rack {
    /// A rack with no modules; renders silence.
    pub fn empty(ctx: &EngineContext) -> Self {
        Self {
            modules: Vec::new(),
            input_slots: Vec::new(),
            output_slots: Vec::new(),
            layout: SlotLayout::default(),
            schedule: CompiledSchedule::default(),
            index_of: HashMap::new(),
            input_module: None,
            output_module: None,
            channels: ctx.channels(),
            capacity: ctx.max_block_frames(),
        }
    }

    /// Builds units, lanes and buffers for `patch`.
    ///
    /// # Errors
    ///
    /// [`GraphLoadError::UnknownType`] if the registry cannot build a module,
    /// [`GraphLoadError::InvalidParam`] if a unit rejects a string parameter.
    pub fn instantiate(
        patch: &ResolvedPatch,
        ctx: &EngineContext,
    ) -> Result<Self, GraphLoadError> {
        let channels = ctx.channels();
        let capacity = ctx.max_block_frames();
        let mut modules = Vec::with_capacity(patch.modules.len());

        for resolved in &patch.modules {
            let mut unit = ctx
                .registry()
                .create(resolved.descriptor.id, ctx.sample_rate())
                .ok_or_else(|| GraphLoadError::UnknownType {
                    module: resolved.id.clone(),
                    type_tag: resolved.descriptor.id.to_owned(),
                })?;
            let specs = resolved.descriptor.params;
            let mut lanes = default_lanes(specs, capacity);
            for param in &resolved.params {
                match param {
                    ResolvedParam::Numeric { index, value } => {
                        if let (Some(spec), Some(lane)) = (specs.get(*index), lanes.get_mut(*index))
                        {
                            lane.set_base(spec.clamp(*value));
                        }
                    }
                    ResolvedParam::Text { key, value } => {
                        if !unit.set_param_string(key, value, &mut lanes) {
                            return Err(GraphLoadError::invalid_param(
                                &resolved.id,
                                key,
                                format!("'{value}' is not understood"),
                            ));
                        }
                    }
                }
            }
            modules.push(RackModule {
                id: resolved.id.clone(),
                unit,
                lanes,
            });
        }

        let layout = SlotLayout::for_patch(patch);
        let schedule = compile(patch, &layout);
        let index_of = modules
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.clone(), i))
            .collect();

        Ok(Self {
            modules,
            input_slots: (0..layout.input_slots)
                .map(|_| SignalBuffer::new(channels, capacity))
                .collect(),
            output_slots: (0..layout.output_slots)
                .map(|_| SignalBuffer::new(channels, capacity))
                .collect(),
            layout,
            schedule,
            index_of,
            input_module: patch.input_module(),
            output_module: patch.output_module(),
            channels,
            capacity,
        })
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// True for a rack with no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Channel count of every buffer.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frame capacity of every buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Module ids in declaration order.
    pub fn module_ids(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.id.as_str())
    }

    /// Module `id`.
    pub fn module(&self, id: &str) -> Option<&RackModule> {
        self.index_of.get(id).map(|&i| &self.modules[i])
    }

    /// Mutable module `id`.
    pub fn module_mut(&mut self, id: &str) -> Option<&mut RackModule> {
        let &index = self.index_of.get(id)?;
        self.modules.get_mut(index)
    }

    /// All modules in declaration order.
    pub fn modules(&self) -> &[RackModule] {
        &self.modules
    }

    /// Drops every host override installed for the previous block.
    pub fn clear_overrides(&mut self) {
        for module in &mut self.modules {
            for lane in &mut module.lanes {
                lane.clear_override();
            }
        }
    }

    /// Folds the host input into the `input` node.
    ///
    /// Missing channels repeat the last provided one, extra channels are
    /// dropped, short channels are zero-padded. `None` (or no channels)
    /// clears the node.
    pub fn write_input(&mut self, input: Option<&[&[f32]]>, frames: usize) {
        let Some(module) = self.input_module else {
            return;
        };
        let Some(slot) = self
            .layout
            .output_base
            .get(module)
            .and_then(|&base| self.output_slots.get_mut(base))
        else {
            return;
        };
        let frames = frames.min(slot.capacity());
        let channels = input.unwrap_or_default();
        if channels.is_empty() {
            slot.clear_frames(frames);
            return;
        }
        for (c, dest) in slot.channels_mut().enumerate() {
            let src = channels[c.min(channels.len() - 1)];
            let n = src.len().min(frames);
            dest[..n].copy_from_slice(&src[..n]);
            dest[n..frames].fill(0.0);
        }
    }

    /// Runs the schedule for `frames` frames.
    pub fn process(&mut self, frames: usize, ctx: &RenderContext) {
        let frames = frames.min(self.capacity);
        let Self {
            modules,
            input_slots,
            output_slots,
            layout,
            schedule,
            ..
        } = self;

        for step in &schedule.steps {
            match *step {
                ProcessStep::CopyBuffer { source, dest } => {
                    input_slots[dest].copy_from(&output_slots[source], frames);
                }
                ProcessStep::AccumulateBuffer { source, dest } => {
                    input_slots[dest].accumulate_from(&output_slots[source], frames);
                }
                ProcessStep::Process { module } => {
                    let ins = layout.input_base[module]
                        ..layout.input_base[module] + layout.input_len[module];
                    let outs = layout.output_base[module]
                        ..layout.output_base[module] + layout.output_len[module];
                    let m = &mut modules[module];
                    m.unit.render(
                        UnitIo {
                            frames,
                            inputs: &input_slots[ins.clone()],
                            connected: &schedule.connected[ins],
                            outputs: &mut output_slots[outs],
                            params: &m.lanes,
                        },
                        ctx,
                    );
                }
            }
        }
    }

    /// Buffer feeding the `output` node, if the graph has one.
    pub fn output(&self) -> Option<&SignalBuffer> {
        self.sink_buffer(self.output_module?)
    }

    /// Last block seen by monitor `id`.
    pub fn monitor(&self, id: &str) -> Option<&SignalBuffer> {
        let &index = self.index_of.get(id)?;
        if self.modules[index].unit.type_tag() != MONITOR_TYPE {
            return None;
        }
        self.sink_buffer(index)
    }

    /// Peak the `output` node metered over its last block.
    pub fn output_peak(&self) -> Option<f32> {
        self.modules.get(self.output_module?)?.unit.last_peak()
    }

    /// Peak monitor `id` metered over its last block.
    pub fn monitor_peak(&self, id: &str) -> Option<f32> {
        let module = &self.modules[*self.index_of.get(id)?];
        if module.unit.type_tag() != MONITOR_TYPE {
            return None;
        }
        module.unit.last_peak()
    }

    /// Returns every unit to its initial state. Parameter lanes are kept.
    pub fn reset(&mut self) {
        for module in &mut self.modules {
            module.unit.reset();
        }
    }

    fn sink_buffer(&self, module: usize) -> Option<&SignalBuffer> {
        self.input_slots.get(*self.layout.input_base.get(module)?)
    }
}
