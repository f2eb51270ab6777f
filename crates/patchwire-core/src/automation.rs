//! Block-constant and per-sample parameter values.
//!
//! A parameter arrives at a unit either as one value for the whole block
//! ("k-rate") or as one value per frame ("a-rate"). [`Automation`] makes the
//! distinction explicit and hides it behind [`Automation::value_at`], so a unit
//! reads both shapes with the same loop.
//!
//! ```rust
//! use patchwire_core::Automation;
//!
//! let ramp = [0.0, 0.25, 0.5, 0.75];
//! let a_rate = Automation::from_slice(&ramp, 4).unwrap();
//! let k_rate = Automation::Constant(0.5);
//!
//! assert_eq!(a_rate.value_at(2), 0.5);
//! assert_eq!(k_rate.value_at(2), 0.5);
//! ```

/// A parameter value for one render block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Automation<'a> {
    /// One value for every frame of the block.
    Constant(f32),
    /// One value per frame; the slice length equals the block length.
    PerSample(&'a [f32]),
}

impl<'a> Automation<'a> {
    /// Interprets a host-supplied slice for a block of `frames` frames.
    ///
    /// A single-element slice is block-constant, a slice of exactly `frames`
    /// elements is per-sample. Any other length is rejected with `None`.
    pub fn from_slice(values: &'a [f32], frames: usize) -> Option<Self> {
        match values.len() {
            1 => Some(Self::Constant(values[0])),
            n if n == frames && n > 0 => Some(Self::PerSample(values)),
            _ => None,
        }
    }

    /// Returns the value for frame `index`.
    ///
    /// Indices past the end of a per-sample slice hold the last value.
    #[inline]
    pub fn value_at(&self, index: usize) -> f32 {
        match *self {
            Self::Constant(value) => value,
            Self::PerSample(values) => match values.get(index) {
                Some(&v) => v,
                None => values.last().copied().unwrap_or(0.0),
            },
        }
    }

    /// Returns the value of the first frame.
    #[inline]
    pub fn first(&self) -> f32 {
        self.value_at(0)
    }

    /// Returns true for block-constant values.
    #[inline]
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }
}

impl Default for Automation<'_> {
    fn default() -> Self {
        Self::Constant(0.0)
    }
}

/// Storage for one unit parameter across a block.
///
/// Holds the persistent base value set by control commands plus an optional
/// per-block host override. The override buffer is allocated once at the
/// block capacity and reused, so applying an override never allocates.
#[derive(Debug, Clone)]
pub struct ParamLane {
    base: f32,
    override_values: Vec<f32>,
    override_len: usize,
}

impl ParamLane {
    /// Creates a lane with `base` and room for `capacity` per-sample values.
    pub fn new(base: f32, capacity: usize) -> Self {
        Self {
            base,
            override_values: vec![0.0; capacity.max(1)],
            override_len: 0,
        }
    }

    /// Persistent value applied when no override is present.
    pub fn base(&self) -> f32 {
        self.base
    }

    /// Sets the persistent value.
    pub fn set_base(&mut self, value: f32) {
        self.base = value;
    }

    /// Installs a host override for the current block.
    ///
    /// Returns false, leaving the lane untouched, when `automation` is
    /// per-sample and longer than the lane capacity.
    pub fn apply_override(&mut self, automation: Automation<'_>) -> bool {
        match automation {
            Automation::Constant(value) => {
                self.override_values[0] = value;
                self.override_len = 1;
                true
            }
            Automation::PerSample(values) => {
                if values.len() > self.override_values.len() {
                    return false;
                }
                self.override_values[..values.len()].copy_from_slice(values);
                self.override_len = values.len();
                true
            }
        }
    }

    /// Drops the block override.
    pub fn clear_override(&mut self) {
        self.override_len = 0;
    }

    /// Current value of the lane as an [`Automation`].
    #[inline]
    pub fn automation(&self) -> Automation<'_> {
        match self.override_len {
            0 => Automation::Constant(self.base),
            1 => Automation::Constant(self.override_values[0]),
            n => Automation::PerSample(&self.override_values[..n]),
        }
    }
}
