//! Stereo chorus over a modulated delay line.

use core::f32::consts::{PI, TAU};

use libm::{floorf, sinf};
use patchwire_core::{
    ParamSpec, ParamUnit, PortKind, PortSpec, RenderContext, StereoDelayLine, Unit, UnitIo,
    flush_denormal, wet_dry_mix,
};

/// Longest delay the buffers hold, in milliseconds.
pub const MAX_DELAY_MS: f32 = 50.0;

/// Upper bound applied to the feedback parameter.
pub const MAX_FEEDBACK: f32 = 0.4;

/// Stereo chorus.
///
/// One sine LFO drives both sides; the right side reads it `spread · 0.9π`
/// ahead. Each sample the delay is `(delay + depth · lfo)` milliseconds,
/// clamped to the buffer, read with linear interpolation before the input
/// plus feedback is written back.
///
/// Input channel 0 is left and channel 1 right (a mono input feeds both).
/// Output channels alternate left, right.
///
/// ## Parameters
///
/// | Index | Key | Range | Default |
/// |-------|-----|-------|---------|
/// | 0 | `rate` | 0–20 Hz | 0.8 |
/// | 1 | `depth` | 0–25 ms | 3 |
/// | 2 | `delay` | 0–50 ms | 15 |
/// | 3 | `mix` | 0–1 | 0.5 |
/// | 4 | `feedback` | 0–1 (used up to 0.4) | 0 |
/// | 5 | `spread` | 0–1 | 0.5 |
#[derive(Debug, Clone)]
pub struct Chorus {
    line: StereoDelayLine,
    lfo_phase: f32,
}

impl Chorus {
    /// Port table: `in` → `out`.
    pub const PORTS: &'static [PortSpec] = &[
        PortSpec::input("in", PortKind::Audio),
        PortSpec::output("out", PortKind::Audio),
    ];

    /// Parameter table.
    pub const PARAMS: &'static [ParamSpec] = &[
        ParamSpec::new("rate", 0.0, 20.0, 0.8, ParamUnit::Hertz),
        ParamSpec::new("depth", 0.0, 25.0, 3.0, ParamUnit::Milliseconds),
        ParamSpec::new("delay", 0.0, MAX_DELAY_MS, 15.0, ParamUnit::Milliseconds),
        ParamSpec::new("mix", 0.0, 1.0, 0.5, ParamUnit::Normalized),
        ParamSpec::new("feedback", 0.0, 1.0, 0.0, ParamUnit::Normalized),
        ParamSpec::new("spread", 0.0, 1.0, 0.5, ParamUnit::Normalized),
    ];

    /// Creates a chorus with buffers sized for [`MAX_DELAY_MS`] at `sample_rate`.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            line: StereoDelayLine::from_time(sample_rate, MAX_DELAY_MS),
            lfo_phase: 0.0,
        }
    }

    /// Current LFO phase in radians, in [0, 2π).
    pub fn lfo_phase(&self) -> f32 {
        self.lfo_phase
    }

    /// Delay buffer length per side.
    pub fn capacity(&self) -> usize {
        self.line.capacity()
    }
}

impl Unit for Chorus {
    fn ports(&self) -> &'static [PortSpec] {
        Self::PORTS
    }

    fn params(&self) -> &'static [ParamSpec] {
        Self::PARAMS
    }

    fn render(&mut self, mut io: UnitIo<'_>, ctx: &RenderContext) {
        let sr = ctx.sample_rate.max(1.0);
        let input = io.input(0);
        let rate = io.param(0);
        let depth = io.param(1);
        let delay = io.param(2);
        let mix = io.param(3);
        let feedback = io.param(4);
        let spread = io.param(5);
        let ms_to_samples = sr / 1000.0;
        let max_delay = self.line.max_delay();
        let out = &mut io.outputs[0];

        for i in 0..io.frames {
            let (dry_l, dry_r) = match input {
                Some(buf) if buf.channel_count() > 1 => (buf.sample(0, i), buf.sample(1, i)),
                Some(buf) => {
                    let x = buf.sample(0, i);
                    (x, x)
                }
                None => (0.0, 0.0),
            };

            let base = delay.value_at(i).clamp(0.0, MAX_DELAY_MS);
            let swing = depth.value_at(i).clamp(0.0, MAX_DELAY_MS);
            let fb = feedback.value_at(i).clamp(0.0, MAX_FEEDBACK);
            let wet = mix.value_at(i).clamp(0.0, 1.0);

            let lfo_l = sinf(self.lfo_phase);
            let lfo_r = sinf(self.lfo_phase + spread.value_at(i) * 0.9 * PI);
            let delay_l = ((base + swing * lfo_l) * ms_to_samples).clamp(1.0, max_delay);
            let delay_r = ((base + swing * lfo_r) * ms_to_samples).clamp(1.0, max_delay);

            let wet_l = self.line.read_left(delay_l);
            let wet_r = self.line.read_right(delay_r);
            self.line.write(
                flush_denormal(dry_l + fb * wet_l),
                flush_denormal(dry_r + fb * wet_r),
            );

            let left = wet_dry_mix(dry_l, wet_l, wet);
            let right = wet_dry_mix(dry_r, wet_r, wet);
            for (c, channel) in out.channels_mut().enumerate() {
                channel[i] = if c % 2 == 0 { left } else { right };
            }

            self.lfo_phase += TAU * rate.value_at(i).max(0.0) / sr;
            if self.lfo_phase >= TAU {
                self.lfo_phase -= TAU * floorf(self.lfo_phase / TAU);
            }
        }
    }

    fn reset(&mut self) {
        self.line.clear();
        self.lfo_phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwire_core::{ParamLane, SignalBuffer, default_lanes, set_lane};

    const SR: f32 = 48000.0;

    fn process(chorus: &mut Chorus, lanes: &[ParamLane], input: &SignalBuffer) -> SignalBuffer {
        let frames = input.capacity();
        let inputs = [input.clone()];
        let mut outputs = [SignalBuffer::new(2, frames)];
        chorus.render(
            UnitIo {
                frames,
                inputs: &inputs,
                connected: &[true],
                outputs: &mut outputs,
                params: lanes,
            },
            &RenderContext::new(SR, 2),
        );
        let [out] = outputs;
        out
    }

    #[test]
    fn static_delay_is_plain_blend() {
        let mut chorus = Chorus::new(SR);
        let mut lanes = default_lanes(Chorus::PARAMS, 512);
        set_lane(Chorus::PARAMS, &mut lanes, "depth", 0.0);
        set_lane(Chorus::PARAMS, &mut lanes, "delay", 2.0);
        set_lane(Chorus::PARAMS, &mut lanes, "mix", 0.25);

        let mut input = SignalBuffer::new(1, 512);
        for i in 0..512 {
            input.write_all_channels(i, ((i * 7919) % 101) as f32 / 101.0 - 0.5);
        }
        let out = process(&mut chorus, &lanes, &input);

        let d = 96; // 2 ms at 48 kHz
        for i in 0..512 {
            let dry = input.sample(0, i);
            let delayed = if i >= d { input.sample(0, i - d) } else { 0.0 };
            let expected = 0.75 * dry + 0.25 * delayed;
            assert!((out.sample(0, i) - expected).abs() < 1e-5, "frame {i}");
            assert!((out.sample(1, i) - expected).abs() < 1e-5, "frame {i}");
        }
    }

    #[test]
    fn feedback_is_capped() {
        let mut chorus = Chorus::new(SR);
        let mut lanes = default_lanes(Chorus::PARAMS, 256);
        set_lane(Chorus::PARAMS, &mut lanes, "feedback", 1.0);
        set_lane(Chorus::PARAMS, &mut lanes, "mix", 1.0);
        let mut input = SignalBuffer::new(2, 256);
        for i in 0..256 {
            input.write_all_channels(i, 1.0);
        }
        for _ in 0..2000 {
            let out = process(&mut chorus, &lanes, &input);
            assert!(out.peak(256) <= 1.0 / (1.0 - MAX_FEEDBACK) + 1e-3);
        }
    }

    #[test]
    fn lfo_phase_wraps() {
        let mut chorus = Chorus::new(SR);
        let mut lanes = default_lanes(Chorus::PARAMS, 256);
        set_lane(Chorus::PARAMS, &mut lanes, "rate", 20.0);
        let input = SignalBuffer::new(2, 256);
        for _ in 0..100 {
            process(&mut chorus, &lanes, &input);
            assert!((0.0..TAU).contains(&chorus.lfo_phase()));
        }
    }
}
