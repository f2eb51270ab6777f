//! Host boundary nodes: external input, main output and monitor taps.
//!
//! These units do no processing of their own. The rack writes the host's
//! input block into [`InputNode`]'s output buffer before the schedule runs
//! and reads [`OutputNode`]'s and [`MonitorNode`]'s input buffers after it.
//! During render they only meter the block that passes through.

use patchwire_core::{ParamSpec, PortKind, PortSpec, RenderContext, Unit, UnitIo};

/// Source of the host's external input.
#[derive(Debug, Clone, Default)]
pub struct InputNode;

impl InputNode {
    /// Port table: `out`.
    pub const PORTS: &'static [PortSpec] = &[PortSpec::output("out", PortKind::Audio)];

    /// Creates an input node.
    pub fn new() -> Self {
        Self
    }
}

impl Unit for InputNode {
    fn ports(&self) -> &'static [PortSpec] {
        Self::PORTS
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[]
    }

    fn render(&mut self, _io: UnitIo<'_>, _ctx: &RenderContext) {}
}

/// Peak level of the last block seen by a sink node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Meter {
    peak: f32,
}

impl Meter {
    fn measure(&mut self, io: &UnitIo<'_>) {
        self.peak = io.input(0).map_or(0.0, |b| b.peak(io.frames));
    }
}

/// The main output bus. A graph holds at most one.
#[derive(Debug, Clone, Default)]
pub struct OutputNode {
    meter: Meter,
}

impl OutputNode {
    /// Port table: `in`.
    pub const PORTS: &'static [PortSpec] = &[PortSpec::input("in", PortKind::Audio)];

    /// Creates an output node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Peak absolute sample of the last rendered block.
    pub fn last_peak(&self) -> f32 {
        self.meter.peak
    }
}

impl Unit for OutputNode {
    fn ports(&self) -> &'static [PortSpec] {
        Self::PORTS
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[]
    }

    fn render(&mut self, io: UnitIo<'_>, _ctx: &RenderContext) {
        self.meter.measure(&io);
    }

    fn reset(&mut self) {
        self.meter = Meter::default();
    }
}

/// A tap whose last block stays readable by the host.
#[derive(Debug, Clone, Default)]
pub struct MonitorNode {
    meter: Meter,
}

impl MonitorNode {
    /// Port table: `in`.
    pub const PORTS: &'static [PortSpec] = &[PortSpec::input("in", PortKind::Audio)];

    /// Creates a monitor node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Peak absolute sample of the last rendered block.
    pub fn last_peak(&self) -> f32 {
        self.meter.peak
    }
}

impl Unit for MonitorNode {
    fn ports(&self) -> &'static [PortSpec] {
        Self::PORTS
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[]
    }

    fn render(&mut self, io: UnitIo<'_>, _ctx: &RenderContext) {
        self.meter.measure(&io);
    }

    fn reset(&mut self) {
        self.meter = Meter::default();
    }
}
