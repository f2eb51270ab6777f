//! Voltage-controlled amplifier.

use patchwire_core::{ParamSpec, ParamUnit, PortKind, PortSpec, RenderContext, Unit, UnitIo};

/// Stateless VCA: `out = in · gain · max(0, cv)`.
///
/// An unconnected `cv` input acts as a multiplier of 1, an unconnected `in`
/// produces silence. Both inputs are read per channel.
///
/// ## Parameters
///
/// | Index | Key | Range | Default |
/// |-------|-----|-------|---------|
/// | 0 | `gain` | 0.0–16.0 | 1.0 |
#[derive(Debug, Clone, Default)]
pub struct Gain;

impl Gain {
    /// Port table: `in`, `cv` → `out`.
    pub const PORTS: &'static [PortSpec] = &[
        PortSpec::input("in", PortKind::Audio),
        PortSpec::input("cv", PortKind::Cv),
        PortSpec::output("out", PortKind::Audio),
    ];

    /// Parameter table.
    pub const PARAMS: &'static [ParamSpec] =
        &[ParamSpec::new("gain", 0.0, 16.0, 1.0, ParamUnit::None)];

    const IN: usize = 0;
    const CV: usize = 1;

    /// Creates a gain unit.
    pub fn new() -> Self {
        Self
    }
}

impl Unit for Gain {
    fn ports(&self) -> &'static [PortSpec] {
        Self::PORTS
    }

    fn params(&self) -> &'static [ParamSpec] {
        Self::PARAMS
    }

    fn render(&mut self, mut io: UnitIo<'_>, _ctx: &RenderContext) {
        let frames = io.frames;
        let gain = io.param(0);
        let input = io.input(Self::IN);
        let cv = io.input(Self::CV);

        for (c, out) in io.outputs[0].channels_mut().enumerate() {
            let out = &mut out[..frames];
            let Some(x) = input.and_then(|b| b.channel(c)) else {
                out.fill(0.0);
                continue;
            };
            for (i, y) in out.iter_mut().enumerate() {
                let m = cv.map_or(1.0, |b| b.sample(c, i).max(0.0));
                *y = x[i] * gain.value_at(i) * m;
            }
        }
    }
}
