//! Integration tests for patchwire-units.
//!
//! Drives units through the `Unit` contract the way a rack does: input
//! buffers plus connection flags in, parameter lanes, output buffers out.

use patchwire_core::{
    ParamLane, RenderContext, SignalBuffer, Unit, UnitIo, default_lanes, set_lane,
};
use patchwire_units::{
    AdsrMachine, AdsrTimes, Chorus, Envelope, EnvelopeStage, Gain, Oscillator, UnitRegistry,
};
use proptest::prelude::*;

const SR: f32 = 48000.0;

/// Renders one block. `inputs[i]` is `None` for an unconnected port.
fn render<U: Unit>(
    unit: &mut U,
    inputs: Vec<Option<SignalBuffer>>,
    lanes: &[ParamLane],
    frames: usize,
    channels: usize,
) -> Vec<SignalBuffer> {
    let connected: Vec<bool> = inputs.iter().map(Option::is_some).collect();
    let inputs: Vec<SignalBuffer> = inputs
        .into_iter()
        .map(|b| b.unwrap_or_else(|| SignalBuffer::new(channels, frames)))
        .collect();
    let outputs_count = patchwire_core::output_count(unit.ports());
    let mut outputs: Vec<SignalBuffer> = (0..outputs_count)
        .map(|_| SignalBuffer::new(channels, frames))
        .collect();
    unit.render(
        UnitIo {
            frames,
            inputs: &inputs,
            connected: &connected,
            outputs: &mut outputs,
            params: lanes,
        },
        &RenderContext::new(SR, channels),
    );
    outputs
}

fn constant(channels: usize, frames: usize, value: f32) -> SignalBuffer {
    let mut buf = SignalBuffer::new(channels, frames);
    for i in 0..frames {
        buf.write_all_channels(i, value);
    }
    buf
}

// ---------------------------------------------------------------------------
// 1. Oscillator
// ---------------------------------------------------------------------------

#[test]
fn sine_period_is_dc_free_with_two_zero_crossings() {
    let mut osc = Oscillator::new(SR);
    let mut lanes = default_lanes(Oscillator::PARAMS, 480);
    // 100 Hz at 48 kHz: exactly 480 samples per period
    set_lane(Oscillator::PARAMS, &mut lanes, "frequency", 100.0);

    let out = render(&mut osc, vec![None, None, None, None], &lanes, 480, 2);
    let period = out[0].channel(0).unwrap();

    let sum: f32 = period.iter().sum();
    assert!(sum.abs() < 1e-2, "period sum {sum}");

    assert_eq!(period[0], 0.0);
    assert!(period[1..240].iter().all(|&s| s > 0.0));
    assert!(period[240].abs() < 1e-3);
    assert!(period[241..480].iter().all(|&s| s < 0.0));

    assert_eq!(out[0].channel(0), out[0].channel(1));
}

#[test]
fn sync_edge_mid_block_restarts_phase() {
    let mut osc = Oscillator::new(SR);
    let mut lanes = default_lanes(Oscillator::PARAMS, 128);
    set_lane(Oscillator::PARAMS, &mut lanes, "frequency", 333.0);

    let mut sync = SignalBuffer::new(1, 128);
    sync.write_all_channels(77, 1.0);
    sync.write_all_channels(78, 1.0);

    let out = render(&mut osc, vec![None, None, None, Some(sync)], &lanes, 128, 1);
    let out = out[0].channel(0).unwrap();

    let step = core::f32::consts::TAU * 333.0 / SR;
    assert!(out[76].abs() > 0.1);
    assert_eq!(out[77], 0.0);
    assert!((out[78] - step.sin()).abs() < 1e-4);
    assert!((out[79] - (2.0 * step).sin()).abs() < 1e-4);
}

#[test]
fn pitch_cv_is_exponential() {
    let mut osc = Oscillator::new(SR);
    let mut lanes = default_lanes(Oscillator::PARAMS, 48);
    set_lane(Oscillator::PARAMS, &mut lanes, "frequency", 100.0);
    set_lane(Oscillator::PARAMS, &mut lanes, "waveform", 2.0);

    // +1 octave: 200 Hz saw advances 200/48000 per sample
    let pitch = constant(1, 48, 1.0);
    render(&mut osc, vec![Some(pitch), None, None, None], &lanes, 48, 1);
    assert!((osc.phase(0) - 48.0 * 200.0 / SR).abs() < 1e-5);
}

// ---------------------------------------------------------------------------
// 2. Envelope
// ---------------------------------------------------------------------------

#[test]
fn envelope_unit_follows_gate_input() {
    let mut env = Envelope::new();
    let mut lanes = default_lanes(Envelope::PARAMS, 480);
    set_lane(Envelope::PARAMS, &mut lanes, "attack", 0.001);
    set_lane(Envelope::PARAMS, &mut lanes, "decay", 0.001);
    set_lane(Envelope::PARAMS, &mut lanes, "sustain", 0.6);

    let gate = constant(2, 480, 1.0);
    let out = render(&mut env, vec![Some(gate)], &lanes, 480, 2);
    assert_eq!(out[0].sample(0, 479), 0.6);
    assert_eq!(out[0].sample(1, 479), 0.6);
    assert_eq!(env.machine().stage(), EnvelopeStage::Sustain);

    let out = render(&mut env, vec![None], &lanes, 480, 2);
    assert!(out[0].sample(0, 0) < 0.6);
    assert_eq!(env.machine().stage(), EnvelopeStage::Release);
}

#[test]
fn envelope_channels_gate_independently() {
    let mut env = Envelope::new();
    let mut lanes = default_lanes(Envelope::PARAMS, 480);
    set_lane(Envelope::PARAMS, &mut lanes, "attack", 0.001);
    set_lane(Envelope::PARAMS, &mut lanes, "decay", 0.001);
    set_lane(Envelope::PARAMS, &mut lanes, "sustain", 0.6);

    let mut gate = SignalBuffer::new(2, 480);
    gate.channel_mut(1).unwrap().fill(1.0);
    let out = render(&mut env, vec![Some(gate)], &lanes, 480, 2);

    assert_eq!(out[0].sample(0, 479), 0.0);
    assert_eq!(out[0].sample(1, 479), 0.6);
    assert_eq!(env.machine().stage(), EnvelopeStage::Idle);
    assert_eq!(
        env.channel_machine(1).map(AdsrMachine::stage),
        Some(EnvelopeStage::Sustain)
    );
}

#[test]
fn envelope_sub_sample_gate_never_goes_invalid() {
    let mut env = Envelope::new();
    let lanes = default_lanes(Envelope::PARAMS, 64);
    let mut gate = SignalBuffer::new(1, 64);
    gate.write_all_channels(10, 1.0);

    let out = render(&mut env, vec![Some(gate)], &lanes, 64, 1);
    for &v in &out[0].channel(0).unwrap()[..64] {
        assert!(v.is_finite() && (0.0..=1.0).contains(&v));
    }
    assert!(matches!(
        env.machine().stage(),
        EnvelopeStage::Release | EnvelopeStage::Idle
    ));
}

// ---------------------------------------------------------------------------
// 3. Gain
// ---------------------------------------------------------------------------

#[test]
fn gain_halves_oscillator_peak() {
    let mut osc = Oscillator::new(SR);
    let osc_lanes = default_lanes(Oscillator::PARAMS, 256);
    let mut gain = Gain::new();
    let mut gain_lanes = default_lanes(Gain::PARAMS, 256);
    set_lane(Gain::PARAMS, &mut gain_lanes, "gain", 0.5);

    let tone = render(&mut osc, vec![None, None, None, None], &osc_lanes, 256, 2);
    let [tone] = <[SignalBuffer; 1]>::try_from(tone).unwrap();
    let unscaled = tone.peak(256);
    let out = render(&mut gain, vec![Some(tone), None], &gain_lanes, 256, 2);
    assert!((out[0].peak(256) - 0.5 * unscaled).abs() < 1e-6);
}

// ---------------------------------------------------------------------------
// 4. Registry round trip
// ---------------------------------------------------------------------------

#[test]
fn registry_instances_render_silence_without_input() {
    let registry = UnitRegistry::new();
    for id in ["gain", "chorus", "output", "monitor"] {
        let mut unit = registry.create(id, SR).unwrap();
        let desc = registry.descriptor(id).unwrap();
        let lanes = default_lanes(desc.params, 64);
        let inputs = (0..patchwire_core::input_count(desc.ports))
            .map(|_| None)
            .collect();
        for out in render(&mut unit, inputs, &lanes, 64, 2) {
            assert_eq!(out.peak(64), 0.0, "{id}");
        }
    }
}

// ---------------------------------------------------------------------------
// 5. Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Full-scale input for two seconds at any supported setting stays bounded.
    #[test]
    fn chorus_stays_bounded(
        rate in 0.0f32..20.0,
        depth in 0.0f32..25.0,
        delay in 0.0f32..50.0,
        mix in 0.0f32..1.0,
        feedback in 0.0f32..1.0,
        spread in 0.0f32..1.0,
    ) {
        let mut chorus = Chorus::new(SR);
        let mut lanes = default_lanes(Chorus::PARAMS, 512);
        for (key, value) in [
            ("rate", rate),
            ("depth", depth),
            ("delay", delay),
            ("mix", mix),
            ("feedback", feedback),
            ("spread", spread),
        ] {
            set_lane(Chorus::PARAMS, &mut lanes, key, value);
        }
        let mut input = SignalBuffer::new(2, 512);
        for i in 0..512 {
            input.write_all_channels(i, if (i / 37) % 2 == 0 { 1.0 } else { -1.0 });
        }
        for _ in 0..(2 * 48000 / 512) {
            let out = render(&mut chorus, vec![Some(input.clone())], &lanes, 512, 2);
            let peak = out[0].peak(512);
            prop_assert!(peak.is_finite());
            prop_assert!(peak <= 1.0 / (1.0 - 0.4) + 1e-3, "peak {}", peak);
        }
    }

    /// Random gate streams keep the envelope inside [0, 1].
    #[test]
    fn envelope_value_in_unit_range(
        gates in prop::collection::vec(prop::bool::ANY, 1..400),
        attack in 0.0f32..0.01,
        decay in 0.0f32..0.01,
        sustain in 0.0f32..1.0,
        release in 0.0f32..0.01,
    ) {
        let times = AdsrTimes { attack, decay, sustain, release };
        let mut env = AdsrMachine::new();
        for g in gates {
            let v = env.step(if g { 1.0 } else { 0.0 }, times, SR);
            prop_assert!(v.is_finite() && (0.0..=1.0).contains(&v), "value {}", v);
        }
    }
}
