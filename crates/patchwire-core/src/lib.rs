//! Patchwire Core - building blocks for modular synthesis units
//!
//! This crate holds everything a processing unit needs to know about the
//! rack it lives in, without depending on any concrete unit or on the engine.
//!
//! # Core Abstractions
//!
//! ## Units
//!
//! - [`Unit`] - Trait implemented by every node of a patch graph
//! - [`UnitIo`] - Per-block view of a unit's buffers and parameter lanes
//! - [`RenderContext`] - Sample rate, channel count and block index
//!
//! ## Signals
//!
//! - [`SignalBuffer`] - Fixed-capacity multi-channel block
//! - [`PortSpec`] / [`PortKind`] - Port tables and signal classes
//!
//! ## Parameters
//!
//! - [`Automation`] - Block-constant or per-sample parameter value
//! - [`ParamLane`] - Persistent base value plus per-block host override
//! - [`ParamSpec`] - Static parameter descriptor (key, range, default)
//! - [`SmoothedParam`] - One-pole smoothing toward a target
//!
//! ## Delay Lines
//!
//! - [`StereoDelayLine`] - Two circular buffers with a shared cursor
//!
//! # Example
//!
//! ```rust
//! use patchwire_core::{Automation, ParamLane};
//!
//! let mut lane = ParamLane::new(440.0, 128);
//! assert_eq!(lane.automation(), Automation::Constant(440.0));
//!
//! lane.apply_override(Automation::Constant(220.0));
//! assert_eq!(lane.automation().first(), 220.0);
//! ```

pub mod automation;
pub mod buffer;
pub mod delay;
pub mod math;
pub mod param;
pub mod port;
pub mod unit;

pub use automation::{Automation, ParamLane};
pub use buffer::{MAX_CHANNELS, SignalBuffer};
pub use delay::StereoDelayLine;
pub use math::{
    EDGE_THRESHOLD, falling_edge, flush_denormal, rising_edge, sanitize_frequency, wet_dry_mix,
};
pub use param::{ParamSpec, ParamUnit, SmoothedParam, param_index};
pub use port::{
    PortDirection, PortKind, PortSpec, input_count, input_index, output_count, output_index,
};
pub use unit::{RenderContext, Unit, UnitIo, default_lanes, set_lane};
