//! Property-based tests for patchwire-core primitives.
//!
//! Covers automation slice acceptance, parameter convergence and delay line
//! bounds using proptest for randomized input generation.

use proptest::prelude::*;
use patchwire_core::{Automation, ParamLane, SignalBuffer, SmoothedParam, StereoDelayLine};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Only slices of length 1 or exactly the block size are accepted.
    #[test]
    fn automation_accepts_only_valid_lengths(
        len in 0usize..300,
        frames in 1usize..256,
    ) {
        let values = vec![0.5f32; len];
        let accepted = Automation::from_slice(&values, frames).is_some();
        prop_assert_eq!(accepted, len == 1 || len == frames);
    }

    /// A lane reports its override for the block and its base afterwards.
    #[test]
    fn lane_override_then_base(
        base in -10.0f32..10.0,
        values in prop::collection::vec(-1.0f32..1.0, 2..64),
    ) {
        let mut lane = ParamLane::new(base, 64);
        prop_assert!(lane.apply_override(Automation::PerSample(&values)));
        for (i, &v) in values.iter().enumerate() {
            prop_assert_eq!(lane.automation().value_at(i), v);
        }
        lane.clear_override();
        prop_assert_eq!(lane.automation(), Automation::Constant(base));
    }

    /// SmoothedParam converges toward its target and never overshoots.
    #[test]
    fn smoothed_param_converges(
        start in -1.0f32..1.0,
        target in -1.0f32..1.0,
        time_ms in 0.5f32..20.0,
    ) {
        let mut param = SmoothedParam::with_config(start, 48000.0, time_ms);
        param.set_target(target);
        let lo = start.min(target) - 1e-6;
        let hi = start.max(target) + 1e-6;
        for _ in 0..48000 {
            let v = param.advance();
            prop_assert!(v >= lo && v <= hi, "value {} left [{}, {}]", v, lo, hi);
        }
        prop_assert!((param.get() - target).abs() < 1e-3);
    }

    /// Interpolated reads stay within the range of the written signal for
    /// any delay, including out-of-range requests.
    #[test]
    fn delay_reads_are_bounded(
        input in prop::collection::vec(-1.0f32..=1.0, 64..256),
        delay in -10.0f32..500.0,
        capacity in 8usize..128,
    ) {
        let mut line = StereoDelayLine::new(capacity);
        for &x in &input {
            let left = line.read_left(delay);
            let right = line.read_right(delay);
            prop_assert!(left.is_finite() && left.abs() <= 1.0 + 1e-6);
            prop_assert!(right.is_finite() && right.abs() <= 1.0 + 1e-6);
            line.write(x, -x);
        }
    }

    /// Fan-in accumulation is a plain per-sample sum.
    #[test]
    fn accumulate_is_sum(
        a in prop::collection::vec(-1.0f32..1.0, 16),
        b in prop::collection::vec(-1.0f32..1.0, 16),
    ) {
        let mut dst = SignalBuffer::new(1, 16);
        let mut src = SignalBuffer::new(1, 16);
        dst.channel_mut(0).unwrap().copy_from_slice(&a);
        src.channel_mut(0).unwrap().copy_from_slice(&b);
        dst.accumulate_from(&src, 16);
        for i in 0..16 {
            prop_assert_eq!(dst.sample(0, i), a[i] + b[i]);
        }
    }
}
