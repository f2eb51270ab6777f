//! Small math helpers shared by the units.

/// Threshold above which a gate or sync signal counts as high.
pub const EDGE_THRESHOLD: f32 = 0.5;

/// True when a signal crosses [`EDGE_THRESHOLD`] upwards between two samples.
#[inline]
pub fn rising_edge(previous: f32, current: f32) -> bool {
    previous <= EDGE_THRESHOLD && current > EDGE_THRESHOLD
}

/// True when a signal crosses [`EDGE_THRESHOLD`] downwards between two samples.
#[inline]
pub fn falling_edge(previous: f32, current: f32) -> bool {
    previous > EDGE_THRESHOLD && current <= EDGE_THRESHOLD
}

/// Crossfade between dry and wet signals: `dry + (wet - dry) * mix`.
#[inline]
pub fn wet_dry_mix(dry: f32, wet: f32, mix: f32) -> f32 {
    dry + (wet - dry) * mix
}

/// Replaces values near the subnormal range with zero.
///
/// Used in feedback paths where a signal decays toward zero indefinitely.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Maps non-finite or negative frequencies to 0 Hz.
#[inline]
pub fn sanitize_frequency(hz: f32) -> f32 {
    if hz.is_finite() && hz > 0.0 { hz } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges() {
        assert!(rising_edge(0.0, 1.0));
        assert!(rising_edge(0.5, 0.51));
        assert!(!rising_edge(0.6, 1.0));
        assert!(falling_edge(1.0, 0.0));
        assert!(!falling_edge(0.4, 0.0));
    }

    #[test]
    fn frequency_sanitizing() {
        assert_eq!(sanitize_frequency(f32::NAN), 0.0);
        assert_eq!(sanitize_frequency(f32::INFINITY), 0.0);
        assert_eq!(sanitize_frequency(-3.0), 0.0);
        assert_eq!(sanitize_frequency(440.0), 440.0);
    }

    #[test]
    fn mix_endpoints() {
        assert_eq!(wet_dry_mix(0.2, 0.8, 0.0), 0.2);
        assert_eq!(wet_dry_mix(0.2, 0.8, 1.0), 0.8);
    }
}
