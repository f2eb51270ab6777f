//! Gate-driven ADSR envelope generator.
//!
//! The state machine lives in [`AdsrMachine`], which steps one sample at a
//! time and can be driven without a rack. [`Envelope`] is the unit wrapper
//! that feeds it from the `gate` input and the parameter lanes.
//!
//! ```text
//!        Attack  Decay   Sustain        Release
//!          /\
//!         /  \_____________________
//!        /                         \
//!       /                           \
//!  ____/                             \____
//!      ^gate on                  ^gate off
//! ```

use patchwire_core::{
    MAX_CHANNELS, ParamSpec, ParamUnit, PortKind, PortSpec, RenderContext, Unit, UnitIo,
    falling_edge, rising_edge,
};

/// Shortest stage time, in seconds.
const MIN_STAGE_SECONDS: f32 = 0.001;

/// Envelope stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeStage {
    /// Output 0, waiting for a gate.
    #[default]
    Idle,
    /// Rising linearly to 1.
    Attack,
    /// Falling linearly to the sustain level.
    Decay,
    /// Holding the sustain level while the gate is high.
    Sustain,
    /// Falling linearly to 0 after the gate closed.
    Release,
}

/// Stage times and sustain level for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrTimes {
    /// Attack time in seconds.
    pub attack: f32,
    /// Decay time in seconds.
    pub decay: f32,
    /// Sustain level, 0–1.
    pub sustain: f32,
    /// Release time in seconds.
    pub release: f32,
}

/// Per-sample ADSR state machine.
///
/// Transitions are evaluated before integration on every sample:
///
/// - a rising gate edge enters Attack from any stage, keeping the current value;
/// - a falling gate edge in Attack, Decay or Sustain enters Release when the
///   value is above 0 and Idle otherwise.
///
/// Attack ramps linearly from the value it started at to 1 in `attack`
/// seconds, so a retrigger during Release continues from the current level.
#[derive(Debug, Clone, Default)]
pub struct AdsrMachine {
    stage: EnvelopeStage,
    value: f32,
    attack_start: f32,
    release_step: f32,
    last_gate: f32,
}

impl AdsrMachine {
    /// Creates an idle machine at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stage.
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Current output value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Advances one sample with gate level `gate` and returns the new value.
    pub fn step(&mut self, gate: f32, times: AdsrTimes, sample_rate: f32) -> f32 {
        let sr = sample_rate.max(1.0);
        let sustain = if times.sustain.is_finite() {
            times.sustain.clamp(0.0, 1.0)
        } else {
            0.0
        };

        if rising_edge(self.last_gate, gate) {
            self.stage = EnvelopeStage::Attack;
            self.attack_start = self.value;
        } else if falling_edge(self.last_gate, gate)
            && matches!(
                self.stage,
                EnvelopeStage::Attack | EnvelopeStage::Decay | EnvelopeStage::Sustain
            )
        {
            if self.value > 0.0 {
                self.stage = EnvelopeStage::Release;
                self.release_step = self.value / (stage_seconds(times.release) * sr);
            } else {
                self.stage = EnvelopeStage::Idle;
            }
        }
        self.last_gate = gate;

        match self.stage {
            EnvelopeStage::Idle => {
                self.value = 0.0;
            }
            EnvelopeStage::Attack => {
                let increment = (1.0 - self.attack_start) / (stage_seconds(times.attack) * sr);
                self.value += increment;
                if self.value >= 1.0 || increment <= 0.0 {
                    self.value = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }
            EnvelopeStage::Decay => {
                self.value -= (1.0 - sustain) / (stage_seconds(times.decay) * sr);
                if self.value <= sustain {
                    self.value = sustain;
                    self.stage = EnvelopeStage::Sustain;
                }
            }
            EnvelopeStage::Sustain => {
                self.value = sustain;
            }
            EnvelopeStage::Release => {
                if self.release_step <= 0.0 {
                    self.value = 0.0;
                    self.stage = EnvelopeStage::Idle;
                } else {
                    self.value -= self.release_step;
                    if self.value <= 0.0 {
                        self.value = 0.0;
                        self.stage = EnvelopeStage::Idle;
                    }
                }
            }
        }

        self.value
    }

    /// Returns to Idle at 0.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[inline]
fn stage_seconds(seconds: f32) -> f32 {
    if seconds.is_finite() {
        seconds.max(MIN_STAGE_SECONDS)
    } else {
        MIN_STAGE_SECONDS
    }
}

/// ADSR unit: `gate` → `out` (cv).
///
/// Each channel runs its own [`AdsrMachine`] on the same channel of the
/// `gate` input, so voice `c` of a `voices` unit shapes channel `c`. A mono
/// gate keeps all channels identical.
///
/// ## Parameters
///
/// | Index | Key | Range | Default |
/// |-------|-----|-------|---------|
/// | 0 | `attack` | 0–30 s | 0.01 |
/// | 1 | `decay` | 0–30 s | 0.1 |
/// | 2 | `sustain` | 0–1 | 0.7 |
/// | 3 | `release` | 0–30 s | 0.3 |
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    machines: [AdsrMachine; MAX_CHANNELS],
}

impl Envelope {
    /// Port table: `gate` → `out`.
    pub const PORTS: &'static [PortSpec] = &[
        PortSpec::input("gate", PortKind::Gate),
        PortSpec::output("out", PortKind::Cv),
    ];

    /// Parameter table.
    pub const PARAMS: &'static [ParamSpec] = &[
        ParamSpec::new("attack", 0.0, 30.0, 0.01, ParamUnit::Seconds),
        ParamSpec::new("decay", 0.0, 30.0, 0.1, ParamUnit::Seconds),
        ParamSpec::new("sustain", 0.0, 1.0, 0.7, ParamUnit::Normalized),
        ParamSpec::new("release", 0.0, 30.0, 0.3, ParamUnit::Seconds),
    ];

    /// Creates an idle envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// State machine of channel 0.
    pub fn machine(&self) -> &AdsrMachine {
        &self.machines[0]
    }

    /// State machine of `channel`.
    pub fn channel_machine(&self, channel: usize) -> Option<&AdsrMachine> {
        self.machines.get(channel)
    }
}

impl Unit for Envelope {
    fn ports(&self) -> &'static [PortSpec] {
        Self::PORTS
    }

    fn params(&self) -> &'static [ParamSpec] {
        Self::PARAMS
    }

    fn render(&mut self, mut io: UnitIo<'_>, ctx: &RenderContext) {
        let frames = io.frames;
        let gates: [Option<&[f32]>; MAX_CHANNELS] =
            core::array::from_fn(|c| io.channel_input(0, c));
        let attack = io.param(0);
        let decay = io.param(1);
        let sustain = io.param(2);
        let release = io.param(3);

        for ((machine, gate), out) in self
            .machines
            .iter_mut()
            .zip(gates)
            .zip(io.outputs[0].channels_mut())
        {
            for i in 0..frames {
                let times = AdsrTimes {
                    attack: attack.value_at(i),
                    decay: decay.value_at(i),
                    sustain: sustain.value_at(i),
                    release: release.value_at(i),
                };
                let level = gate.map_or(0.0, |g| g[i]);
                out[i] = machine.step(level, times, ctx.sample_rate);
            }
        }
    }

    fn reset(&mut self) {
        for machine in &mut self.machines {
            machine.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 1000.0;

    fn times(attack: f32, decay: f32, sustain: f32, release: f32) -> AdsrTimes {
        AdsrTimes {
            attack,
            decay,
            sustain,
            release,
        }
    }

    #[test]
    fn reaches_sustain_and_holds() {
        let t = times(0.01, 0.02, 0.5, 0.05);
        let mut env = AdsrMachine::new();
        for _ in 0..10 {
            env.step(1.0, t, SR);
        }
        assert!((env.value() - 1.0).abs() < 1e-5);
        for _ in 0..25 {
            env.step(1.0, t, SR);
        }
        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        for _ in 0..500 {
            assert_eq!(env.step(1.0, t, SR), 0.5);
        }
    }

    #[test]
    fn release_takes_release_time() {
        let t = times(0.001, 0.001, 0.8, 0.1);
        let mut env = AdsrMachine::new();
        for _ in 0..50 {
            env.step(1.0, t, SR);
        }
        let mut samples = 0;
        loop {
            samples += 1;
            if env.step(0.0, t, SR) == 0.0 {
                break;
            }
            assert!(samples < 1000);
        }
        assert!((samples as i32 - 100).abs() <= 1, "released in {samples} samples");
        assert_eq!(env.stage(), EnvelopeStage::Idle);
    }

    #[test]
    fn retrigger_in_release_keeps_value() {
        let t = times(0.01, 0.01, 1.0, 0.1);
        let mut env = AdsrMachine::new();
        for _ in 0..30 {
            env.step(1.0, t, SR);
        }
        for _ in 0..50 {
            env.step(0.0, t, SR);
        }
        let held = env.value();
        assert!(held > 0.0 && held < 1.0);

        let next = env.step(1.0, t, SR);
        assert_eq!(env.stage(), EnvelopeStage::Attack);
        assert!(next > held);
        assert!(next - held < 0.1);
    }

    #[test]
    fn single_sample_gate_is_valid() {
        let t = times(0.5, 0.5, 0.5, 0.5);
        let mut env = AdsrMachine::new();
        env.step(1.0, t, SR);
        let v = env.step(0.0, t, SR);
        assert!(v.is_finite() && v >= 0.0);
        assert!(matches!(
            env.stage(),
            EnvelopeStage::Release | EnvelopeStage::Idle
        ));
    }

    #[test]
    fn zero_times_use_minimum() {
        let t = times(0.0, 0.0, 0.3, 0.0);
        let mut env = AdsrMachine::new();
        assert_eq!(env.step(1.0, t, SR), 1.0);
        assert_eq!(env.step(1.0, t, SR), 0.3);
        assert_eq!(env.step(0.0, t, SR), 0.0);
    }
}
