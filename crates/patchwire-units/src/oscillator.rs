//! Unison oscillator with exponential/linear FM, pulse-width modulation and
//! hard sync.

use core::f32::consts::TAU;

use libm::{exp2f, fabsf, floorf, roundf, sinf};
use patchwire_core::{
    MAX_CHANNELS, ParamLane, ParamSpec, ParamUnit, PortKind, PortSpec, RenderContext,
    SmoothedParam, Unit, UnitIo, param_index, rising_edge, sanitize_frequency,
};

/// Largest supported unison voice count.
pub const MAX_UNISON: usize = 4;

/// Time constant of the pulse-width smoother.
const PULSE_WIDTH_SMOOTHING_MS: f32 = 4.0;

/// Oscillator waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    /// `sin(2πφ)`
    #[default]
    Sine,
    /// Symmetric triangle.
    Triangle,
    /// Rising ramp from -1 to 1.
    Saw,
    /// +1 while `φ < width`, -1 after.
    Pulse,
}

impl Waveform {
    /// Maps the numeric selector to a shape, rounding at the midpoints.
    pub fn from_selector(value: f32) -> Self {
        if value < 0.5 {
            Waveform::Sine
        } else if value < 1.5 {
            Waveform::Triangle
        } else if value < 2.5 {
            Waveform::Saw
        } else {
            Waveform::Pulse
        }
    }

    /// Parses a shape name (`"sine"`, `"tri"`, `"sawtooth"`, `"square"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sine" | "sin" => Some(Waveform::Sine),
            "triangle" | "tri" => Some(Waveform::Triangle),
            "saw" | "sawtooth" | "ramp" => Some(Waveform::Saw),
            "pulse" | "square" | "rect" => Some(Waveform::Pulse),
            _ => None,
        }
    }

    /// Selector value of this shape.
    pub const fn selector(self) -> f32 {
        match self {
            Waveform::Sine => 0.0,
            Waveform::Triangle => 1.0,
            Waveform::Saw => 2.0,
            Waveform::Pulse => 3.0,
        }
    }

    /// Evaluates the shape at phase `phase` ∈ [0, 1).
    #[inline]
    pub fn evaluate(self, phase: f32, pulse_width: f32) -> f32 {
        match self {
            Waveform::Sine => sinf(TAU * phase),
            Waveform::Triangle => 2.0 * fabsf(2.0 * (phase - floorf(phase + 0.5))) - 1.0,
            Waveform::Saw => 2.0 * (phase - 0.5),
            Waveform::Pulse => {
                if phase < pulse_width {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

/// Evenly spaced unison offset of voice `index` among `count` voices, in [-1, 1].
#[inline]
pub fn unison_offset(index: usize, count: usize) -> f32 {
    if count <= 1 {
        0.0
    } else {
        -1.0 + 2.0 * index as f32 / (count - 1) as f32
    }
}

/// Phase, pulse-width and sync history of one channel.
#[derive(Debug, Clone)]
struct ChannelState {
    phases: [f32; MAX_UNISON],
    pulse_width: SmoothedParam,
    last_sync: f32,
}

impl ChannelState {
    fn new(sample_rate: f32) -> Self {
        Self {
            phases: [0.0; MAX_UNISON],
            pulse_width: SmoothedParam::with_config(0.5, sample_rate, PULSE_WIDTH_SMOOTHING_MS),
            last_sync: 0.0,
        }
    }
}

/// Control signals of one channel for the current block.
#[derive(Clone, Copy)]
struct ChannelInputs<'a> {
    pitch: Option<&'a [f32]>,
    fm: Option<&'a [f32]>,
    pwm: Option<&'a [f32]>,
    sync: Option<&'a [f32]>,
}

/// Audio oscillator unit.
///
/// Frequency per sample is `base · 2^(pitch + fm · expFmDepth) + fm · fmDepth`;
/// non-finite or negative results become 0 Hz. Each unison voice runs its own
/// phase accumulator, detuned by `detune · offset` cents, and the output is
/// the mean of the active voices.
///
/// Every channel is an independent oscillator driven by the same channel of
/// the `pitch`, `fm`, `pwm` and `sync` inputs, so voice `c` of a `voices`
/// unit plays on channel `c`. With mono control signals all channels stay
/// identical.
///
/// ## Parameters
///
/// | Index | Key | Range | Default |
/// |-------|-----|-------|---------|
/// | 0 | `frequency` | 0–20000 Hz | 440 |
/// | 1 | `waveform` | 0–3 | 0 (sine) |
/// | 2 | `pulseWidth` | 0–1 | 0.5 |
/// | 3 | `fmDepth` | -20000–20000 Hz | 0 |
/// | 4 | `expFmDepth` | -10–10 oct | 0 |
/// | 5 | `unison` | 1–4 | 1 |
/// | 6 | `detune` | 0–1200 ct | 0 |
///
/// `waveform` also accepts a shape name through the string-parameter path.
#[derive(Debug, Clone)]
pub struct Oscillator {
    channels: [ChannelState; MAX_CHANNELS],
}

impl Oscillator {
    /// Port table: `pitch`, `fm`, `pwm`, `sync` → `out`.
    pub const PORTS: &'static [PortSpec] = &[
        PortSpec::input("pitch", PortKind::Cv),
        PortSpec::input("fm", PortKind::Audio),
        PortSpec::input("pwm", PortKind::Cv),
        PortSpec::input("sync", PortKind::Sync),
        PortSpec::output("out", PortKind::Audio),
    ];

    /// Parameter table.
    pub const PARAMS: &'static [ParamSpec] = &[
        ParamSpec::new("frequency", 0.0, 20000.0, 440.0, ParamUnit::Hertz),
        ParamSpec::new("waveform", 0.0, 3.0, 0.0, ParamUnit::Selector),
        ParamSpec::new("pulseWidth", 0.0, 1.0, 0.5, ParamUnit::Normalized),
        ParamSpec::new("fmDepth", -20000.0, 20000.0, 0.0, ParamUnit::Hertz),
        ParamSpec::new("expFmDepth", -10.0, 10.0, 0.0, ParamUnit::Octaves),
        ParamSpec::new("unison", 1.0, 4.0, 1.0, ParamUnit::Selector),
        ParamSpec::new("detune", 0.0, 1200.0, 0.0, ParamUnit::Cents),
    ];

    const PITCH: usize = 0;
    const FM: usize = 1;
    const PWM: usize = 2;
    const SYNC: usize = 3;

    const P_FREQUENCY: usize = 0;
    const P_WAVEFORM: usize = 1;
    const P_PULSE_WIDTH: usize = 2;
    const P_FM_DEPTH: usize = 3;
    const P_EXP_FM_DEPTH: usize = 4;
    const P_UNISON: usize = 5;
    const P_DETUNE: usize = 6;

    /// Creates an oscillator at phase 0 on every channel.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            channels: core::array::from_fn(|_| ChannelState::new(sample_rate)),
        }
    }

    /// Phase of unison voice `voice` on channel 0.
    pub fn phase(&self, voice: usize) -> f32 {
        self.channel_phase(0, voice)
    }

    /// Phase of unison voice `voice` on `channel`.
    pub fn channel_phase(&self, channel: usize, voice: usize) -> f32 {
        self.channels
            .get(channel)
            .and_then(|c| c.phases.get(voice))
            .copied()
            .unwrap_or(0.0)
    }

    /// Current smoothed pulse width on channel 0.
    pub fn pulse_width(&self) -> f32 {
        self.channels[0].pulse_width.get()
    }
}

impl Unit for Oscillator {
    fn ports(&self) -> &'static [PortSpec] {
        Self::PORTS
    }

    fn params(&self) -> &'static [ParamSpec] {
        Self::PARAMS
    }

    fn render(&mut self, mut io: UnitIo<'_>, ctx: &RenderContext) {
        let frames = io.frames;
        let sr = ctx.sample_rate.max(1.0);

        let frequency = io.param(Self::P_FREQUENCY);
        let waveform = io.param(Self::P_WAVEFORM);
        let width = io.param(Self::P_PULSE_WIDTH);
        let fm_depth = io.param(Self::P_FM_DEPTH);
        let exp_fm_depth = io.param(Self::P_EXP_FM_DEPTH);
        let unison = io.param(Self::P_UNISON);
        let detune = io.param(Self::P_DETUNE);

        let inputs: [ChannelInputs<'_>; MAX_CHANNELS] = core::array::from_fn(|c| ChannelInputs {
            pitch: io.channel_input(Self::PITCH, c),
            fm: io.channel_input(Self::FM, c),
            pwm: io.channel_input(Self::PWM, c),
            sync: io.channel_input(Self::SYNC, c),
        });

        for ((state, input), out) in self
            .channels
            .iter_mut()
            .zip(inputs)
            .zip(io.outputs[0].channels_mut())
        {
            for i in 0..frames {
                let voices = (roundf(unison.value_at(i)) as usize).clamp(1, MAX_UNISON);

                if let Some(sync) = input.sync {
                    let current = sync[i];
                    if rising_edge(state.last_sync, current) {
                        state.phases[..voices].fill(0.0);
                    }
                    state.last_sync = current;
                }

                let pitch_cv = input.pitch.map_or(0.0, |p| p[i]);
                let fm_in = input.fm.map_or(0.0, |f| f[i]);
                let pwm_in = input.pwm.map_or(0.0, |p| p[i]);

                let f = frequency.value_at(i)
                    * exp2f(pitch_cv + fm_in * exp_fm_depth.value_at(i))
                    + fm_in * fm_depth.value_at(i);
                let f = sanitize_frequency(f);

                state
                    .pulse_width
                    .set_target((width.value_at(i) + pwm_in * 0.5).clamp(0.05, 0.95));
                let pw = state.pulse_width.advance();

                let shape = Waveform::from_selector(waveform.value_at(i));
                let cents = detune.value_at(i);

                let mut sum = 0.0;
                for (v, phase) in state.phases[..voices].iter_mut().enumerate() {
                    sum += shape.evaluate(*phase, pw);
                    let voice_freq = f * exp2f(cents * unison_offset(v, voices) / 1200.0);
                    *phase += voice_freq / sr;
                    *phase -= floorf(*phase);
                }

                out[i] = sum / voices as f32;
            }
        }
    }

    fn set_param_string(&mut self, key: &str, value: &str, lanes: &mut [ParamLane]) -> bool {
        if key != "waveform" {
            return false;
        }
        let selector = match Waveform::from_name(value) {
            Some(shape) => shape.selector(),
            None => match value.trim().parse::<f32>() {
                Ok(v) => v,
                Err(_) => return false,
            },
        };
        match param_index(Self::PARAMS, key).and_then(|i| lanes.get_mut(i)) {
            Some(lane) => {
                lane.set_base(Self::PARAMS[Self::P_WAVEFORM].clamp(selector));
                true
            }
            None => false,
        }
    }

    fn reset(&mut self) {
        for state in &mut self.channels {
            state.phases = [0.0; MAX_UNISON];
            state.pulse_width.snap_to_target();
            state.last_sync = 0.0;
        }
    }
}
