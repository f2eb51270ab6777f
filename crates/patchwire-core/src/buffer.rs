//! Multi-channel signal buffers carried by unit ports.
//!
//! Every port in a rack owns one [`SignalBuffer`] with the engine-wide channel
//! count and a fixed frame capacity. Buffers are allocated when a rack is
//! instantiated and reused for every block afterwards; a block may use fewer
//! frames than the capacity, never more.

/// Upper bound on the engine-wide channel count.
pub const MAX_CHANNELS: usize = 8;

/// A fixed-capacity, multi-channel block of samples.
#[derive(Debug, Clone)]
pub struct SignalBuffer {
    channels: Vec<Vec<f32>>,
    capacity: usize,
}

impl SignalBuffer {
    /// Creates a zeroed buffer with `channels` channels of `capacity` frames.
    ///
    /// The channel count is clamped to `1..=MAX_CHANNELS`.
    pub fn new(channels: usize, capacity: usize) -> Self {
        let channels = channels.clamp(1, MAX_CHANNELS);
        Self {
            channels: (0..channels).map(|_| vec![0.0; capacity]).collect(),
            capacity,
        }
    }

    /// Number of channels.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frame capacity of every channel.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read access to one channel, or `None` if `index` is out of range.
    #[inline]
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Write access to one channel, or `None` if `index` is out of range.
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        self.channels.get_mut(index).map(Vec::as_mut_slice)
    }

    /// Sample at `(channel, frame)`, or 0.0 when either index is out of range.
    #[inline]
    pub fn sample(&self, channel: usize, frame: usize) -> f32 {
        self.channels
            .get(channel)
            .and_then(|c| c.get(frame))
            .copied()
            .unwrap_or(0.0)
    }

    /// Iterates mutably over all channels.
    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut Vec<f32>> {
        self.channels.iter_mut()
    }

    /// Zeroes every channel.
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    /// Zeroes the first `frames` frames of every channel.
    pub fn clear_frames(&mut self, frames: usize) {
        let frames = frames.min(self.capacity);
        for channel in &mut self.channels {
            channel[..frames].fill(0.0);
        }
    }

    /// Copies the first `frames` frames of `other`, channel for channel.
    pub fn copy_from(&mut self, other: &SignalBuffer, frames: usize) {
        let frames = frames.min(self.capacity).min(other.capacity);
        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            dst[..frames].copy_from_slice(&src[..frames]);
        }
    }

    /// Adds the first `frames` frames of `other` into this buffer (fan-in).
    pub fn accumulate_from(&mut self, other: &SignalBuffer, frames: usize) {
        let frames = frames.min(self.capacity).min(other.capacity);
        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            for (d, s) in dst[..frames].iter_mut().zip(src[..frames].iter()) {
                *d += *s;
            }
        }
    }

    /// Writes `value` into frame `frame` of every channel.
    #[inline]
    pub fn write_all_channels(&mut self, frame: usize, value: f32) {
        for channel in &mut self.channels {
            if let Some(slot) = channel.get_mut(frame) {
                *slot = value;
            }
        }
    }

    /// Largest absolute sample over the first `frames` frames.
    pub fn peak(&self, frames: usize) -> f32 {
        let frames = frames.min(self.capacity);
        self.channels
            .iter()
            .flat_map(|c| c[..frames].iter())
            .fold(0.0_f32, |acc, &s| acc.max(s.abs()))
    }
}
