//! The processing-unit contract and its per-block view of the rack.
//!
//! A [`Unit`] is a stateful node of the patch graph. Once per block the rack
//! hands it a [`UnitIo`]: read access to its input buffers and parameter
//! lanes, write access to its output buffers. Buffers are laid out in the
//! order of the unit's [`PortSpec`] table, split by direction.
//!
//! ## Design Decisions
//!
//! - **No allocation in `render`**: all state is sized at construction.
//! - **Parameters live outside the unit**: the rack owns one [`ParamLane`] per
//!   parameter, so numeric parameter changes and host automation never touch
//!   unit state directly.
//! - **Unconnected inputs are visible**: [`UnitIo::input`] returns `None` for
//!   an input with no incoming connection, letting a unit pick a default
//!   (e.g. gain treats a missing `cv` as 1).

use crate::automation::{Automation, ParamLane};
use crate::buffer::SignalBuffer;
use crate::param::{ParamSpec, param_index};
use crate::port::PortSpec;

/// Engine-wide values a unit may need while rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Channel count of every port buffer.
    pub channels: usize,
    /// Index of the block being rendered, counted from engine start.
    pub block: u64,
}

impl RenderContext {
    /// Context for block 0.
    pub fn new(sample_rate: f32, channels: usize) -> Self {
        Self {
            sample_rate,
            channels,
            block: 0,
        }
    }
}

/// One unit's slice of the rack for a single block.
pub struct UnitIo<'a> {
    /// Frames to render; never more than any buffer's capacity.
    pub frames: usize,
    /// Input buffers, one per input port.
    pub inputs: &'a [SignalBuffer],
    /// Whether each input port has at least one incoming connection.
    pub connected: &'a [bool],
    /// Output buffers, one per output port.
    pub outputs: &'a mut [SignalBuffer],
    /// Parameter lanes, one per entry of the unit's parameter table.
    pub params: &'a [ParamLane],
}

impl<'a> UnitIo<'a> {
    /// The buffer of input `index` when it is connected.
    ///
    /// The borrow is tied to the rack, not to `self`, so a unit can hold it
    /// while writing its outputs.
    #[inline]
    pub fn input(&self, index: usize) -> Option<&'a SignalBuffer> {
        let inputs: &'a [SignalBuffer] = self.inputs;
        if self.connected.get(index).copied().unwrap_or(false) {
            inputs.get(index)
        } else {
            None
        }
    }

    /// Channel `channel` of input `index`, truncated to the block, when
    /// connected.
    #[inline]
    pub fn channel_input(&self, index: usize, channel: usize) -> Option<&'a [f32]> {
        let frames = self.frames;
        self.input(index)
            .and_then(|b| b.channel(channel))
            .map(|c| &c[..frames.min(c.len())])
    }

    /// Channel 0 of input `index`, for units with a single control path.
    #[inline]
    pub fn control_input(&self, index: usize) -> Option<&'a [f32]> {
        self.channel_input(index, 0)
    }

    /// Current value of parameter `index`; missing lanes read as 0.
    #[inline]
    pub fn param(&self, index: usize) -> Automation<'a> {
        let params: &'a [ParamLane] = self.params;
        params
            .get(index)
            .map(ParamLane::automation)
            .unwrap_or_default()
    }
}

/// A node of the patch graph.
///
/// Implementors are plain state machines: they never allocate, lock or log
/// inside [`Unit::render`].
pub trait Unit {
    /// Port table. Input and output buffers follow this order per direction.
    fn ports(&self) -> &'static [PortSpec];

    /// Parameter table. Lane `i` of [`UnitIo::params`] holds `params()[i]`.
    fn params(&self) -> &'static [ParamSpec];

    /// Renders `io.frames` frames into the output buffers.
    fn render(&mut self, io: UnitIo<'_>, ctx: &RenderContext);

    /// Applies a string parameter.
    ///
    /// Numeric interpretations (e.g. a waveform name) are written into
    /// `lanes`. Returns false when the key is not a string parameter of this
    /// unit or the value is not understood.
    fn set_param_string(&mut self, key: &str, value: &str, lanes: &mut [ParamLane]) -> bool {
        let _ = (key, value, lanes);
        false
    }

    /// Clears internal state back to power-on.
    fn reset(&mut self) {}
}

/// Writes `value` into the lane of `key` after clamping it to the table range.
///
/// Returns false for unknown keys.
pub fn set_lane(specs: &[ParamSpec], lanes: &mut [ParamLane], key: &str, value: f32) -> bool {
    match (param_index(specs, key), specs.iter().find(|s| s.key == key)) {
        (Some(index), Some(spec)) if index < lanes.len() => {
            lanes[index].set_base(spec.clamp(value));
            true
        }
        _ => false,
    }
}

/// Builds one lane per parameter, holding each default.
pub fn default_lanes(specs: &[ParamSpec], capacity: usize) -> Vec<ParamLane> {
    specs
        .iter()
        .map(|s| ParamLane::new(s.default, capacity))
        .collect()
}
