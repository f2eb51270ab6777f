//! Host-driven control lanes: polyphonic voices and plain channel values.
//!
//! Lane values change only through control commands applied at the start of a
//! block; render turns the current lane state into per-channel signals.

use libm::roundf;
use patchwire_core::{
    MAX_CHANNELS, ParamSpec, ParamUnit, PortKind, PortSpec, RenderContext, SmoothedParam, Unit,
    UnitIo,
};

/// Largest number of voices a `voices` unit tracks.
pub const MAX_VOICES: usize = 16;

/// Length of a triggered gate pulse, in seconds.
const TRIGGER_GATE_SECONDS: f32 = 0.001;

/// State of one voice lane.
#[derive(Debug, Clone)]
struct Voice {
    cv: SmoothedParam,
    gate: f32,
    velocity: f32,
    gate_hold: u32,
    sync_pending: bool,
}

impl Voice {
    fn new(sample_rate: f32) -> Self {
        let mut cv = SmoothedParam::new(0.0);
        cv.set_sample_rate(sample_rate);
        Self {
            cv,
            gate: 0.0,
            velocity: 0.0,
            gate_hold: 0,
            sync_pending: false,
        }
    }

    /// Gate level for the next sample, counting down a triggered pulse.
    #[inline]
    fn next_gate(&mut self) -> f32 {
        if self.gate_hold > 0 {
            self.gate_hold -= 1;
            1.0
        } else {
            self.gate
        }
    }

    /// Sync level for the next sample; a pending pulse lasts one sample.
    #[inline]
    fn next_sync(&mut self) -> f32 {
        if self.sync_pending {
            self.sync_pending = false;
            1.0
        } else {
            0.0
        }
    }
}

/// Polyphonic voice lanes.
///
/// Voice `i` drives channel `i` of each output. Voices beyond the engine's
/// channel count keep their state but are not routed.
///
/// ## Parameters
///
/// | Index | Key | Range | Default |
/// |-------|-----|-------|---------|
/// | 0 | `voices` | 1–16 | 16 |
#[derive(Debug, Clone)]
pub struct VoiceLanes {
    voices: Vec<Voice>,
    sample_rate: f32,
}

impl VoiceLanes {
    /// Port table: `cv`, `gate`, `velocity`, `sync`.
    pub const PORTS: &'static [PortSpec] = &[
        PortSpec::output("cv", PortKind::Cv),
        PortSpec::output("gate", PortKind::Gate),
        PortSpec::output("velocity", PortKind::Cv),
        PortSpec::output("sync", PortKind::Sync),
    ];

    /// Parameter table.
    pub const PARAMS: &'static [ParamSpec] = &[ParamSpec::new(
        "voices",
        1.0,
        MAX_VOICES as f32,
        MAX_VOICES as f32,
        ParamUnit::Selector,
    )];

    /// Creates [`MAX_VOICES`] silent voices.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            voices: (0..MAX_VOICES).map(|_| Voice::new(sample_rate)).collect(),
            sample_rate,
        }
    }

    /// Sets the pitch cv of `voice`, gliding over `slew_seconds` when given.
    ///
    /// Returns false when `voice` is out of range.
    pub fn set_cv(&mut self, voice: usize, value: f32, slew_seconds: Option<f32>) -> bool {
        let Some(v) = self.voices.get_mut(voice) else {
            return false;
        };
        match slew_seconds {
            Some(slew) if slew.is_finite() && slew > 0.0 => {
                v.cv.set_smoothing_time_ms(slew * 1000.0);
                v.cv.set_target(value);
            }
            _ => v.cv.set_immediate(value),
        }
        true
    }

    /// Sets the held gate level of `voice`, cancelling any triggered pulse.
    pub fn set_gate(&mut self, voice: usize, value: f32) -> bool {
        let Some(v) = self.voices.get_mut(voice) else {
            return false;
        };
        v.gate = value;
        v.gate_hold = 0;
        true
    }

    /// Sets the velocity of `voice`.
    pub fn set_velocity(&mut self, voice: usize, value: f32) -> bool {
        let Some(v) = self.voices.get_mut(voice) else {
            return false;
        };
        v.velocity = value;
        true
    }

    /// Opens the gate of `voice` for 1 ms, then closes it.
    pub fn trigger_gate(&mut self, voice: usize) -> bool {
        let samples = roundf(TRIGGER_GATE_SECONDS * self.sample_rate).max(1.0) as u32;
        let Some(v) = self.voices.get_mut(voice) else {
            return false;
        };
        v.gate = 0.0;
        v.gate_hold = samples;
        true
    }

    /// Emits a one-sample sync pulse on `voice`.
    pub fn trigger_sync(&mut self, voice: usize) -> bool {
        let Some(v) = self.voices.get_mut(voice) else {
            return false;
        };
        v.sync_pending = true;
        true
    }

    /// Current (smoothed) cv of `voice`.
    pub fn cv(&self, voice: usize) -> Option<f32> {
        self.voices.get(voice).map(|v| v.cv.get())
    }
}

impl Unit for VoiceLanes {
    fn ports(&self) -> &'static [PortSpec] {
        Self::PORTS
    }

    fn params(&self) -> &'static [ParamSpec] {
        Self::PARAMS
    }

    fn render(&mut self, io: UnitIo<'_>, _ctx: &RenderContext) {
        let frames = io.frames;
        let active = (roundf(io.param(0).first()) as usize).clamp(1, MAX_VOICES);
        let [cv_out, gate_out, velocity_out, sync_out] = io.outputs else {
            return;
        };
        let routed = cv_out.channel_count();

        for (index, voice) in self.voices.iter_mut().enumerate() {
            if index >= active {
                if index < routed {
                    for buf in [&mut *cv_out, &mut *gate_out, &mut *velocity_out, &mut *sync_out] {
                        if let Some(ch) = buf.channel_mut(index) {
                            ch[..frames].fill(0.0);
                        }
                    }
                }
                continue;
            }
            for i in 0..frames {
                let cv = voice.cv.advance();
                let gate = voice.next_gate();
                let sync = voice.next_sync();
                if index < routed {
                    write(cv_out.channel_mut(index), i, cv);
                    write(gate_out.channel_mut(index), i, gate);
                    write(velocity_out.channel_mut(index), i, voice.velocity);
                    write(sync_out.channel_mut(index), i, sync);
                }
            }
        }
    }

    fn reset(&mut self) {
        let sample_rate = self.sample_rate;
        for voice in &mut self.voices {
            *voice = Voice::new(sample_rate);
        }
    }
}

#[inline]
fn write(channel: Option<&mut [f32]>, frame: usize, value: f32) {
    if let Some(slot) = channel.and_then(|c| c.get_mut(frame)) {
        *slot = value;
    }
}

/// Per-channel cv and gate values set directly by the host.
#[derive(Debug, Clone, Default)]
pub struct ControlLanes {
    cv: [f32; MAX_CHANNELS],
    gate: [f32; MAX_CHANNELS],
}

impl ControlLanes {
    /// Port table: `cv`, `gate`.
    pub const PORTS: &'static [PortSpec] = &[
        PortSpec::output("cv", PortKind::Cv),
        PortSpec::output("gate", PortKind::Gate),
    ];

    /// Creates lanes at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cv of `channel`. Returns false when out of range.
    pub fn set_cv(&mut self, channel: usize, value: f32) -> bool {
        match self.cv.get_mut(channel) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Sets the gate of `channel`. Returns false when out of range.
    pub fn set_gate(&mut self, channel: usize, value: f32) -> bool {
        match self.gate.get_mut(channel) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl Unit for ControlLanes {
    fn ports(&self) -> &'static [PortSpec] {
        Self::PORTS
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[]
    }

    fn render(&mut self, io: UnitIo<'_>, _ctx: &RenderContext) {
        let frames = io.frames;
        let [cv_out, gate_out] = io.outputs else {
            return;
        };
        for (c, ch) in cv_out.channels_mut().enumerate() {
            ch[..frames].fill(self.cv.get(c).copied().unwrap_or(0.0));
        }
        for (c, ch) in gate_out.channels_mut().enumerate() {
            ch[..frames].fill(self.gate.get(c).copied().unwrap_or(0.0));
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwire_core::{ParamLane, SignalBuffer, default_lanes};

    const SR: f32 = 48000.0;

    fn render_voices(
        lanes: &mut VoiceLanes,
        params: &[ParamLane],
        frames: usize,
    ) -> Vec<SignalBuffer> {
        let mut outputs: Vec<SignalBuffer> = (0..4).map(|_| SignalBuffer::new(2, frames)).collect();
        lanes.render(
            UnitIo {
                frames,
                inputs: &[],
                connected: &[],
                outputs: &mut outputs,
                params,
            },
            &RenderContext::new(SR, 2),
        );
        outputs
    }

    #[test]
    fn voice_maps_to_channel() {
        let mut voices = VoiceLanes::new(SR);
        let params = default_lanes(VoiceLanes::PARAMS, 64);
        assert!(voices.set_cv(1, 0.5, None));
        assert!(voices.set_gate(1, 1.0));
        assert!(voices.set_velocity(0, 0.8));
        assert!(!voices.set_gate(MAX_VOICES, 1.0));

        let out = render_voices(&mut voices, &params, 64);
        assert_eq!(out[0].sample(1, 10), 0.5);
        assert_eq!(out[1].sample(1, 10), 1.0);
        assert_eq!(out[1].sample(0, 10), 0.0);
        assert_eq!(out[2].sample(0, 10), 0.8);
    }

    #[test]
    fn triggered_gate_lasts_one_millisecond() {
        let mut voices = VoiceLanes::new(SR);
        let params = default_lanes(VoiceLanes::PARAMS, 64);
        voices.trigger_gate(0);

        let out = render_voices(&mut voices, &params, 64);
        assert_eq!(out[1].sample(0, 0), 1.0);
        assert_eq!(out[1].sample(0, 47), 1.0);
        assert_eq!(out[1].sample(0, 48), 0.0);
    }

    #[test]
    fn sync_is_one_sample() {
        let mut voices = VoiceLanes::new(SR);
        let params = default_lanes(VoiceLanes::PARAMS, 8);
        voices.trigger_sync(1);
        let out = render_voices(&mut voices, &params, 8);
        assert_eq!(out[3].sample(1, 0), 1.0);
        assert_eq!(out[3].sample(1, 1), 0.0);
    }

    #[test]
    fn cv_slew_glides() {
        let mut voices = VoiceLanes::new(SR);
        let params = default_lanes(VoiceLanes::PARAMS, 64);
        voices.set_cv(0, 1.0, Some(0.01));
        render_voices(&mut voices, &params, 64);
        let cv = voices.cv(0).unwrap();
        assert!(cv > 0.0 && cv < 1.0);
    }

    #[test]
    fn control_lanes_fill_channels() {
        let mut lanes = ControlLanes::new();
        lanes.set_cv(0, 0.25);
        lanes.set_gate(1, 1.0);
        assert!(!lanes.set_cv(MAX_CHANNELS, 1.0));
        let mut outputs = [SignalBuffer::new(2, 4), SignalBuffer::new(2, 4)];
        lanes.render(
            UnitIo {
                frames: 4,
                inputs: &[],
                connected: &[],
                outputs: &mut outputs,
                params: &[],
            },
            &RenderContext::new(SR, 2),
        );
        assert_eq!(outputs[0].sample(0, 3), 0.25);
        assert_eq!(outputs[1].sample(1, 3), 1.0);
        assert_eq!(outputs[1].sample(0, 3), 0.0);
    }
}
