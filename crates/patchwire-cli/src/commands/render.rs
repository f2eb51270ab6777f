//! Offline render command.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use patchwire_engine::{Engine, EngineConfig, Report};
use patchwire_patch::{ParamValue, PatchGraph};

use super::common::{GateSpan, parse_gate, parse_key_val, split_param_target};
use crate::wav::write_interleaved;

#[derive(Args)]
pub struct RenderArgs {
    /// Patch graph (JSON)
    patch: PathBuf,

    /// Output WAV file
    output: PathBuf,

    /// Length of the render in seconds
    #[arg(short, long, default_value = "2.0")]
    seconds: f32,

    /// Engine config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the sample rate
    #[arg(long)]
    sample_rate: Option<f32>,

    /// Override the block size
    #[arg(long)]
    block_size: Option<usize>,

    /// Override the channel count
    #[arg(long)]
    channels: Option<usize>,

    /// Parameter overrides (module.param=value)
    #[arg(long, value_parser = parse_key_val, number_of_values = 1)]
    param: Vec<(String, String)>,

    /// Voice gates (module:voice@on-off, seconds)
    #[arg(long, value_parser = parse_gate, number_of_values = 1)]
    gate: Vec<GateSpan>,

    /// Output bit depth (16, 24, or 32 for float)
    #[arg(long, default_value = "24")]
    bit_depth: u16,
}

/// A gate change at a sample position.
#[derive(Debug, Clone, PartialEq)]
struct GateEvent {
    frame: u64,
    module: String,
    voice: usize,
    open: bool,
}

fn gate_events(gates: &[GateSpan], sample_rate: f32) -> Vec<GateEvent> {
    let to_frame = |seconds: f32| (seconds * sample_rate).round() as u64;
    let mut events: Vec<GateEvent> = gates
        .iter()
        .flat_map(|g| {
            let on = GateEvent {
                frame: to_frame(g.on),
                module: g.module.clone(),
                voice: g.voice,
                open: true,
            };
            let off = g.off.map(|off| GateEvent {
                frame: to_frame(off),
                module: g.module.clone(),
                voice: g.voice,
                open: false,
            });
            std::iter::once(on).chain(off)
        })
        .collect();
    events.sort_by_key(|e| e.frame);
    events
}

fn apply_param_overrides(
    graph: &mut PatchGraph,
    overrides: &[(String, String)],
) -> anyhow::Result<()> {
    for (target, value) in overrides {
        let (module_id, param) = split_param_target(target).map_err(anyhow::Error::msg)?;
        let module = graph
            .modules
            .iter_mut()
            .find(|m| m.id == module_id)
            .ok_or_else(|| anyhow::anyhow!("Unknown module in --param: {}", module_id))?;
        let value = match value.parse::<f64>() {
            Ok(number) => ParamValue::Number(number),
            Err(_) => ParamValue::Text(value.clone()),
        };
        module.params.insert(param.to_string(), value);
    }
    Ok(())
}

fn load_config(args: &RenderArgs) -> anyhow::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(sr) = args.sample_rate {
        config.sample_rate = sr;
    }
    if let Some(block) = args.block_size {
        config.max_block_frames = block;
    }
    if let Some(channels) = args.channels {
        config.channels = channels;
    }
    config.validate()?;
    Ok(config)
}

fn log_report(report: &Report) {
    match report {
        Report::SequencerSteps(steps) => tracing::debug!(?steps, "sequencer steps"),
        Report::Debug(snapshot) => tracing::debug!(?snapshot, "engine snapshot"),
        Report::TransportEvents { module_id, events } => {
            tracing::debug!(module = %module_id, count = events.len(), "transport events")
        }
    }
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    if !args.seconds.is_finite() || args.seconds <= 0.0 {
        anyhow::bail!("--seconds must be positive, got {}", args.seconds);
    }
    if !matches!(args.bit_depth, 16 | 24 | 32) {
        anyhow::bail!("--bit-depth must be 16, 24 or 32, got {}", args.bit_depth);
    }
    let config = load_config(&args)?;

    let json = std::fs::read_to_string(&args.patch)
        .with_context(|| format!("Failed to read patch {}", args.patch.display()))?;
    let mut graph = PatchGraph::from_json(&json)?;
    apply_param_overrides(&mut graph, &args.param)?;

    let sample_rate = config.sample_rate;
    let channels = config.channels;
    let block_size = config.max_block_frames;

    let (mut engine, control, reports) = Engine::new(config)?;
    control
        .set_patch(&graph)
        .with_context(|| format!("Invalid patch {}", args.patch.display()))?;
    engine.initialize();

    tracing::info!(
        patch = %args.patch.display(),
        modules = graph.modules.len(),
        seconds = args.seconds,
        sample_rate,
        channels,
        "rendering"
    );

    let events = gate_events(&args.gate, sample_rate);
    let mut next_event = 0;

    let total_frames = (args.seconds * sample_rate).round() as u64;
    let mut blocks: Vec<Vec<f32>> = vec![vec![0.0; block_size]; channels];
    let mut interleaved = Vec::with_capacity(total_frames as usize * channels);

    let progress = ProgressBar::new(total_frames);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let mut position = 0u64;
    while position < total_frames {
        while let Some(event) = events.get(next_event)
            && event.frame <= position
        {
            if event.open {
                control.set_voice_velocity(&event.module, event.voice, 1.0);
                control.set_voice_gate(&event.module, event.voice, 1.0);
            } else {
                control.set_voice_gate(&event.module, event.voice, 0.0);
            }
            next_event += 1;
        }

        let frames = (total_frames - position).min(block_size as u64) as usize;
        let mut outputs: Vec<&mut [f32]> = blocks.iter_mut().map(|c| &mut c[..frames]).collect();
        engine.render(None, &mut outputs, &[]);

        for i in 0..frames {
            for channel in &blocks {
                interleaved.push(channel[i]);
            }
        }

        while let Ok(report) = reports.try_recv() {
            log_report(&report);
        }

        position += frames as u64;
        progress.set_position(position);
    }
    progress.finish_and_clear();

    let faults = control.render_faults();
    if faults > 0 {
        tracing::warn!(faults, "render faults occurred");
    }
    control.collect_garbage();

    write_interleaved(
        &args.output,
        &interleaved,
        channels as u16,
        sample_rate.round() as u32,
        args.bit_depth,
    )
    .with_context(|| format!("Failed to write {}", args.output.display()))?;

    let peak = interleaved.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    println!(
        "Rendered {:.2}s ({} frames, {} ch) to {} (peak {:.3})",
        args.seconds,
        total_frames,
        channels,
        args.output.display(),
        peak
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_events_are_ordered_by_frame() {
        let gates = vec![
            parse_gate("v:1@0.5-1.0").unwrap(),
            parse_gate("v:0@0.0-0.25").unwrap(),
            parse_gate("v:2@0.75").unwrap(),
        ];
        let events = gate_events(&gates, 1000.0);
        let frames: Vec<u64> = events.iter().map(|e| e.frame).collect();
        assert_eq!(frames, vec![0, 250, 500, 750, 1000]);
        assert!(events[0].open);
        assert!(!events[1].open);
        assert_eq!(events[3].voice, 2);
    }

    #[test]
    fn param_overrides_pick_number_or_text() {
        let mut graph = PatchGraph::from_json(
            r#"{"modules": [{"id": "osc", "type": "oscillator"}], "connections": []}"#,
        )
        .unwrap();
        apply_param_overrides(
            &mut graph,
            &[
                ("osc.frequency".into(), "220".into()),
                ("osc.waveform".into(), "saw".into()),
            ],
        )
        .unwrap();
        let osc = graph.module("osc").unwrap();
        assert_eq!(osc.params["frequency"], ParamValue::Number(220.0));
        assert_eq!(osc.params["waveform"], ParamValue::Text("saw".into()));

        assert!(apply_param_overrides(&mut graph, &[("lfo.rate".into(), "1".into())]).is_err());
    }
}
