//! Circular delay lines with fractional, linearly interpolated reads.
//!
//! [`StereoDelayLine`] keeps a left and a right buffer behind one shared write
//! cursor. Reads happen before the write of the same sample, so a delay of `d`
//! samples returns what was written `d` samples ago.
//!
//! ```rust
//! use patchwire_core::StereoDelayLine;
//!
//! let mut line = StereoDelayLine::new(16);
//! line.write(1.0, -1.0);
//! line.write(0.0, 0.0);
//! assert_eq!(line.read_left(2.0), 1.0);
//! assert_eq!(line.read_right(1.5), -0.5);
//! ```

/// Two circular buffers sharing one write cursor.
///
/// The buffers are allocated once at construction and never reallocate.
#[derive(Debug, Clone)]
pub struct StereoDelayLine {
    left: Vec<f32>,
    right: Vec<f32>,
    cursor: usize,
}

impl StereoDelayLine {
    /// Creates a line holding `capacity` samples per side (at least 4).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(4);
        Self {
            left: vec![0.0; capacity],
            right: vec![0.0; capacity],
            cursor: 0,
        }
    }

    /// Creates a line long enough for `max_ms` milliseconds plus a guard.
    pub fn from_time(sample_rate: f32, max_ms: f32) -> Self {
        let samples = (sample_rate.max(1.0) * max_ms.max(0.0) / 1000.0) as usize;
        Self::new(samples + 4)
    }

    /// Samples per side.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.left.len()
    }

    /// Longest delay, in samples, a read accepts without clamping.
    #[inline]
    pub fn max_delay(&self) -> f32 {
        (self.capacity() - 2) as f32
    }

    /// Current write position.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Reads the left buffer `delay_samples` behind the cursor.
    #[inline]
    pub fn read_left(&self, delay_samples: f32) -> f32 {
        read_interpolated(&self.left, self.cursor, delay_samples)
    }

    /// Reads the right buffer `delay_samples` behind the cursor.
    #[inline]
    pub fn read_right(&self, delay_samples: f32) -> f32 {
        read_interpolated(&self.right, self.cursor, delay_samples)
    }

    /// Stores one sample per side at the cursor and advances it.
    #[inline]
    pub fn write(&mut self, left: f32, right: f32) {
        self.left[self.cursor] = left;
        self.right[self.cursor] = right;
        self.cursor = (self.cursor + 1) % self.left.len();
    }

    /// Zeroes both buffers and rewinds the cursor.
    pub fn clear(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
        self.cursor = 0;
    }
}

/// Linear interpolation between the two integer positions bracketing
/// `cursor - delay`, wrapped modulo the buffer length.
#[inline]
fn read_interpolated(buffer: &[f32], cursor: usize, delay_samples: f32) -> f32 {
    let len = buffer.len();
    let delay = delay_samples.clamp(1.0, (len - 2) as f32);
    let whole = delay as usize;
    let frac = delay - whole as f32;

    // Newer sample of the pair sits `whole` behind the cursor, older one a step further.
    let newer = (cursor + len - whole) % len;
    let older = (newer + len - 1) % len;
    let a = buffer[newer];
    let b = buffer[older];
    a + (b - a) * frac
}
