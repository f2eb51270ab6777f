//! Step sequencer with an internal or external clock and a transport queue.
//!
//! The sequencer advances one step per rising edge on `clock`, or on its own
//! sixteenth-note clock derived from `bpm` when `clock` is unconnected. The
//! engine polls [`Sequencer::position`] for the host and drains
//! [`TransportEvent`]s from the module selected for transport watching.

use std::collections::VecDeque;

use libm::roundf;
use patchwire_core::{
    ParamLane, ParamSpec, ParamUnit, PortKind, PortSpec, RenderContext, Unit, UnitIo,
    param_index, rising_edge,
};

/// Largest pattern length.
pub const MAX_STEPS: usize = 16;

/// Capacity of the transport event queue. Events past it are dropped.
pub const TRANSPORT_QUEUE_CAPACITY: usize = 64;

/// Internal clock steps per beat.
const STEPS_PER_BEAT: f32 = 4.0;

/// Something the transport did during a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// The sequencer moved to `step`.
    StepChanged {
        /// New step index.
        step: u32,
    },
    /// The pattern wrapped from its last step back to step 0.
    Wrapped,
    /// The position was set by a seek or a reset edge.
    Seeked {
        /// Step index after the seek.
        step: u32,
    },
}

macro_rules! step_params {
    ($($key:literal),* $(,)?) => {
        [
            ParamSpec::new("steps", 1.0, MAX_STEPS as f32, 8.0, ParamUnit::Selector),
            ParamSpec::new("bpm", 1.0, 999.0, 120.0, ParamUnit::Bpm),
            ParamSpec::new("gateLength", 0.0, 1.0, 0.5, ParamUnit::Normalized),
            $(ParamSpec::new($key, -10.0, 10.0, 0.0, ParamUnit::None),)*
        ]
    };
}

const SEQUENCER_PARAMS: [ParamSpec; 3 + MAX_STEPS] = step_params!(
    "step1", "step2", "step3", "step4", "step5", "step6", "step7", "step8", "step9", "step10",
    "step11", "step12", "step13", "step14", "step15", "step16",
);

/// Step sequencer unit.
///
/// ## Parameters
///
/// | Index | Key | Range | Default |
/// |-------|-----|-------|---------|
/// | 0 | `steps` | 1–16 | 8 |
/// | 1 | `bpm` | 1–999 | 120 |
/// | 2 | `gateLength` | 0–1 of a step | 0.5 |
/// | 3–18 | `step1`–`step16` | -10–10 | 0 |
///
/// The string parameter `pattern` takes whitespace- or comma-separated step
/// values and sets both the step lanes and `steps`.
#[derive(Debug, Clone)]
pub struct Sequencer {
    position: u32,
    steps: u32,
    samples_in_step: u32,
    step_samples: f32,
    clock_phase: f32,
    last_clock: f32,
    last_reset: f32,
    events: VecDeque<TransportEvent>,
}

impl Sequencer {
    /// Port table: `clock`, `reset` → `cv`, `gate`.
    pub const PORTS: &'static [PortSpec] = &[
        PortSpec::input("clock", PortKind::Gate),
        PortSpec::input("reset", PortKind::Gate),
        PortSpec::output("cv", PortKind::Cv),
        PortSpec::output("gate", PortKind::Gate),
    ];

    /// Parameter table.
    pub const PARAMS: &'static [ParamSpec] = &SEQUENCER_PARAMS;

    const P_STEPS: usize = 0;
    const P_BPM: usize = 1;
    const P_GATE_LENGTH: usize = 2;
    const P_FIRST_STEP: usize = 3;

    /// Creates a sequencer at step 0.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            position: 0,
            steps: 8,
            samples_in_step: 0,
            step_samples: internal_step_samples(120.0, sample_rate),
            clock_phase: 0.0,
            last_clock: 0.0,
            last_reset: 0.0,
            events: VecDeque::with_capacity(TRANSPORT_QUEUE_CAPACITY),
        }
    }

    /// Current step index.
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Jumps to `position`, wrapped by the current pattern length.
    pub fn seek(&mut self, position: u32) {
        self.position = position % self.steps.max(1);
        self.samples_in_step = 0;
        self.clock_phase = 0.0;
        self.push_event(TransportEvent::Seeked {
            step: self.position,
        });
    }

    /// Moves all queued transport events into `out`.
    pub fn drain_events(&mut self, out: &mut Vec<TransportEvent>) {
        out.extend(self.events.drain(..));
    }

    /// True when transport events are queued.
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    fn push_event(&mut self, event: TransportEvent) {
        if self.events.len() < TRANSPORT_QUEUE_CAPACITY {
            self.events.push_back(event);
        }
    }

    fn advance(&mut self, steps: u32) {
        let next = (self.position + 1) % steps;
        if next == 0 {
            self.push_event(TransportEvent::Wrapped);
        }
        self.position = next;
        self.push_event(TransportEvent::StepChanged { step: next });
    }

    /// Parses a pattern string into step values.
    pub fn parse_pattern(pattern: &str) -> Option<Vec<f32>> {
        let values: Vec<f32> = pattern
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(str::parse::<f32>)
            .collect::<Result<_, _>>()
            .ok()?;
        if values.is_empty() || values.len() > MAX_STEPS {
            None
        } else {
            Some(values)
        }
    }
}

fn internal_step_samples(bpm: f32, sample_rate: f32) -> f32 {
    sample_rate.max(1.0) * 60.0 / (bpm.max(1.0) * STEPS_PER_BEAT)
}

impl Unit for Sequencer {
    fn ports(&self) -> &'static [PortSpec] {
        Self::PORTS
    }

    fn params(&self) -> &'static [ParamSpec] {
        Self::PARAMS
    }

    fn render(&mut self, mut io: UnitIo<'_>, ctx: &RenderContext) {
        let frames = io.frames;
        let clock = io.control_input(0);
        let reset = io.control_input(1);
        let steps_param = io.param(Self::P_STEPS);
        let bpm = io.param(Self::P_BPM);
        let gate_length = io.param(Self::P_GATE_LENGTH);
        let step_values: [_; MAX_STEPS] =
            core::array::from_fn(|s| io.param(Self::P_FIRST_STEP + s));

        for i in 0..frames {
            let steps = (roundf(steps_param.value_at(i)) as u32).clamp(1, MAX_STEPS as u32);
            self.steps = steps;
            if self.position >= steps {
                self.position %= steps;
            }

            if let Some(reset) = reset {
                let level = reset[i];
                if rising_edge(self.last_reset, level) {
                    self.seek(0);
                }
                self.last_reset = level;
            }

            match clock {
                Some(clock) => {
                    let level = clock[i];
                    if rising_edge(self.last_clock, level) {
                        if self.samples_in_step > 0 {
                            self.step_samples = self.samples_in_step as f32;
                        }
                        self.samples_in_step = 0;
                        self.advance(steps);
                    }
                    self.last_clock = level;
                }
                None => {
                    self.step_samples = internal_step_samples(bpm.value_at(i), ctx.sample_rate);
                    self.clock_phase += 1.0 / self.step_samples;
                    if self.clock_phase >= 1.0 {
                        self.clock_phase -= 1.0;
                        self.samples_in_step = 0;
                        self.advance(steps);
                    }
                }
            }

            let cv = step_values[self.position as usize].value_at(i);
            let open = (self.samples_in_step as f32)
                < gate_length.value_at(i).clamp(0.0, 1.0) * self.step_samples;
            let gate = if open { 1.0 } else { 0.0 };
            self.samples_in_step = self.samples_in_step.saturating_add(1);

            io.outputs[0].write_all_channels(i, cv);
            io.outputs[1].write_all_channels(i, gate);
        }
    }

    fn set_param_string(&mut self, key: &str, value: &str, lanes: &mut [ParamLane]) -> bool {
        if key != "pattern" {
            return false;
        }
        let Some(values) = Self::parse_pattern(value) else {
            return false;
        };
        let spec = &Self::PARAMS[Self::P_FIRST_STEP];
        for (s, &v) in values.iter().enumerate() {
            if let Some(lane) = lanes.get_mut(Self::P_FIRST_STEP + s) {
                lane.set_base(spec.clamp(v));
            }
        }
        if let Some(lane) = param_index(Self::PARAMS, "steps").and_then(|i| lanes.get_mut(i)) {
            lane.set_base(values.len() as f32);
        }
        true
    }

    fn reset(&mut self) {
        self.position = 0;
        self.samples_in_step = 0;
        self.clock_phase = 0.0;
        self.last_clock = 0.0;
        self.last_reset = 0.0;
        self.events.clear();
    }
}
