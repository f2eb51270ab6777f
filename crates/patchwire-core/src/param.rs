//! Parameter descriptors and one-pole smoothing.
//!
//! [`ParamSpec`] is the static description of a unit parameter: its patch key,
//! range, default, and unit. Units publish a `&'static [ParamSpec]` table and
//! address parameters by their index in that table.
//!
//! [`SmoothedParam`] is a one-pole lowpass toward a target value, used where a
//! unit must glide rather than jump (oscillator pulse width, lane slew).
//!
//! ```rust
//! use patchwire_core::SmoothedParam;
//!
//! let mut width = SmoothedParam::with_config(0.5, 48000.0, 4.0);
//! width.set_target(0.9);
//! let first = width.advance();
//! assert!(first > 0.5 && first < 0.9);
//! ```

use libm::expf;

/// Display unit of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamUnit {
    /// Frequency in Hz.
    Hertz,
    /// Time in seconds.
    Seconds,
    /// Time in milliseconds.
    Milliseconds,
    /// Pitch offset in cents.
    Cents,
    /// Pitch offset in octaves.
    Octaves,
    /// Tempo in beats per minute.
    Bpm,
    /// Normalized 0–1 value (level, mix, width).
    Normalized,
    /// Discrete choice, rounded to the nearest integer.
    Selector,
    /// Plain number with no unit.
    None,
}

impl ParamUnit {
    /// Suffix used when printing values.
    pub const fn suffix(&self) -> &'static str {
        match self {
            ParamUnit::Hertz => " Hz",
            ParamUnit::Seconds => " s",
            ParamUnit::Milliseconds => " ms",
            ParamUnit::Cents => " ct",
            ParamUnit::Octaves => " oct",
            ParamUnit::Bpm => " bpm",
            ParamUnit::Normalized | ParamUnit::Selector | ParamUnit::None => "",
        }
    }
}

/// Static description of one unit parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Key used in patch JSON and control commands (e.g. `"frequency"`).
    pub key: &'static str,
    /// Lowest accepted value.
    pub min: f32,
    /// Highest accepted value.
    pub max: f32,
    /// Value a fresh instance starts with.
    pub default: f32,
    /// Display unit.
    pub unit: ParamUnit,
}

impl ParamSpec {
    /// Creates a descriptor.
    pub const fn new(key: &'static str, min: f32, max: f32, default: f32, unit: ParamUnit) -> Self {
        Self {
            key,
            min,
            max,
            default,
            unit,
        }
    }

    /// Clamps `value` into the parameter range. NaN maps to the default.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

/// Finds the index of `key` in a parameter table.
pub fn param_index(specs: &[ParamSpec], key: &str) -> Option<usize> {
    specs.iter().position(|p| p.key == key)
}

/// A value that follows its target through a one-pole lowpass.
///
/// `y[n] = y[n-1] + coeff * (target - y[n-1])` with
/// `coeff = 1 - exp(-1 / (tau * sample_rate))`.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
    sample_rate: f32,
    smoothing_time_ms: f32,
}

impl SmoothedParam {
    /// Creates a parameter that jumps instantly until configured.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate: 48000.0,
            smoothing_time_ms: 0.0,
        }
    }

    /// Creates a parameter with a time constant of `smoothing_time_ms`.
    pub fn with_config(initial: f32, sample_rate: f32, smoothing_time_ms: f32) -> Self {
        let mut param = Self::new(initial);
        param.sample_rate = sample_rate;
        param.smoothing_time_ms = smoothing_time_ms;
        param.recalculate_coeff();
        param
    }

    /// Sets the value the parameter glides toward.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Sets target and current value at once.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Changes the time constant.
    pub fn set_smoothing_time_ms(&mut self, time_ms: f32) {
        self.smoothing_time_ms = time_ms;
        self.recalculate_coeff();
    }

    /// Changes the sample rate, keeping the time constant.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    /// Advances one sample and returns the new value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Per-sample smoothing coefficient.
    #[inline]
    pub fn coefficient(&self) -> f32 {
        self.coeff
    }

    /// Jumps to the target.
    #[inline]
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    fn recalculate_coeff(&mut self) {
        if self.smoothing_time_ms <= 0.0 || self.sample_rate <= 0.0 {
            self.coeff = 1.0;
        } else {
            let samples = self.smoothing_time_ms / 1000.0 * self.sample_rate;
            self.coeff = 1.0 - expf(-1.0 / samples);
        }
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}
