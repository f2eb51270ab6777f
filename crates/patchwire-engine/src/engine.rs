//! The render engine.
//!
//! [`Engine::render`] is the only entry point on the audio thread. Per call it:
//!
//! 1. drains the command queue, in order;
//! 2. installs host automation for this block;
//! 3. folds the host input into the graph's `input` node;
//! 4. executes the compiled schedule;
//! 5. copies the `output` node to the host buffers;
//! 6. emits reports at their sub-rates.
//!
//! ## Design Decisions
//!
//! - **Unready → Ready**: until [`Engine::initialize`] the engine renders
//!   silence, keeps only the newest graph in a single pending slot and drops
//!   every other command.
//! - **Shape mismatches are not errors**: an oversized block or a host channel
//!   of the wrong length renders silence, increments a fault counter and
//!   warns once per streak of faulty blocks.
//! - **No deallocation of racks here**: a replaced rack is sent back to the
//!   control side over the retire channel.
//! - **Reports own their payloads**: a report crosses to another thread, so
//!   building one allocates. That happens only on blocks that emit a report,
//!   and each payload is bounded by the transport queue capacity or the
//!   watch list length. Blocks with nothing to report allocate nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use patchwire_core::{Automation, SignalBuffer, Unit};
use patchwire_units::TRANSPORT_QUEUE_CAPACITY;

use crate::command::{AutomationInput, Command};
use crate::config::{ConfigError, EngineConfig};
use crate::context::EngineContext;
use crate::control::{ControlHandle, WatchState};
use crate::rack::Rack;
use crate::report::{EngineSnapshot, Report};

/// Counters and flags shared between the engine and its control handles.
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    pub(crate) ready: AtomicBool,
    pub(crate) dropped_reports: AtomicU64,
    pub(crate) render_faults: AtomicU64,
}

/// Owns the running rack and executes it block by block.
pub struct Engine {
    context: Arc<EngineContext>,
    rack: Box<Rack>,
    pending: Option<Box<Rack>>,
    commands: Receiver<Command>,
    watch: Arc<ArcSwap<WatchState>>,
    reports: Sender<Report>,
    retire: Sender<Box<Rack>>,
    shared: Arc<SharedState>,
    block: u64,
    blocks_since_poll: u32,
    polls: u64,
    last_steps: Vec<(String, u32)>,
    in_fault: bool,
    ignored_commands: u64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("rack", &self.rack)
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Builds an unready engine with an empty graph.
    ///
    /// Returns the engine (move it to the audio thread), a control handle and
    /// the report receiver.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if `config` fails validation.
    #[allow(clippy::type_complexity)]
    pub fn new(
        config: EngineConfig,
    ) -> Result<(Self, ControlHandle, Receiver<Report>), ConfigError> {
        let context = EngineContext::new(config)?;
        let (command_tx, command_rx) = unbounded();
        let (report_tx, report_rx) = bounded(context.config().report_capacity);
        let (retire_tx, retire_rx) = unbounded();
        let watch = Arc::new(ArcSwap::from_pointee(WatchState::default()));
        let shared = Arc::new(SharedState::default());

        let handle = ControlHandle::new(
            Arc::clone(&context),
            command_tx,
            Arc::clone(&watch),
            Arc::clone(&shared),
            retire_rx,
        );

        tracing::info!(
            sample_rate = context.sample_rate(),
            channels = context.channels(),
            max_block_frames = context.max_block_frames(),
            "engine created"
        );

        let engine = Self {
            rack: Box::new(Rack::empty(&context)),
            context,
            pending: None,
            commands: command_rx,
            watch,
            reports: report_tx,
            retire: retire_tx,
            shared,
            block: 0,
            blocks_since_poll: 0,
            polls: 0,
            last_steps: Vec::new(),
            in_fault: false,
            ignored_commands: 0,
        };
        Ok((engine, handle, report_rx))
    }

    /// Moves the engine from Unready to Ready.
    ///
    /// Commands queued before this call are processed under Unready rules
    /// first, then the pending graph, if any, is swapped in. Calling it again
    /// does nothing.
    pub fn initialize(&mut self) {
        if self.is_ready() {
            return;
        }
        self.drain_commands();
        self.shared.ready.store(true, Ordering::Release);
        if let Some(rack) = self.pending.take() {
            self.swap_rack(rack);
        }
        tracing::info!(modules = self.rack.len(), "engine ready");
    }

    /// Whether [`initialize`](Self::initialize) has run.
    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }

    /// Shared engine context.
    pub fn context(&self) -> &Arc<EngineContext> {
        &self.context
    }

    /// The rack currently rendering.
    pub fn rack(&self) -> &Rack {
        &self.rack
    }

    /// Last block received by monitor node `id`.
    pub fn monitor(&self, id: &str) -> Option<&SignalBuffer> {
        self.rack.monitor(id)
    }

    /// Peak monitor `id` metered over the last block.
    pub fn monitor_peak(&self, id: &str) -> Option<f32> {
        self.rack.monitor_peak(id)
    }

    /// Current engine state.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            block: self.block,
            ready: self.is_ready(),
            modules: self.rack.len(),
            pending_graph: self.pending.is_some(),
            render_faults: self.shared.render_faults.load(Ordering::Relaxed),
            dropped_reports: self.shared.dropped_reports.load(Ordering::Relaxed),
            ignored_commands: self.ignored_commands,
            output_peak: self.rack.output_peak().unwrap_or(0.0),
        }
    }

    /// Renders one block.
    ///
    /// The block length is the length of the output channels. `input` holds
    /// one slice per host input channel; `automation` overrides parameters
    /// for this block only. Never panics on mismatched shapes: affected
    /// channels are written as silence.
    pub fn render(
        &mut self,
        input: Option<&[&[f32]]>,
        output: &mut [&mut [f32]],
        automation: &[AutomationInput<'_>],
    ) {
        self.drain_commands();

        if !self.is_ready() {
            silence(output);
            return;
        }

        let frames = output.first().map_or(0, |c| c.len());
        if frames > self.rack.capacity() {
            silence(output);
            self.record_fault(true, frames);
            self.block += 1;
            return;
        }

        self.apply_automation(automation, frames);
        self.rack.write_input(input, frames);
        let ctx = self.context.render_context(self.block);
        self.rack.process(frames, &ctx);

        let mut faulty = false;
        let rack_channels = self.rack.channels();
        let source = self.rack.output();
        for (c, dest) in output.iter_mut().enumerate() {
            let channel = source.and_then(|b| b.channel(c));
            match channel {
                Some(src) if dest.len() == frames && c < rack_channels => {
                    dest.copy_from_slice(&src[..frames]);
                }
                _ => {
                    if dest.len() != frames || c >= rack_channels {
                        faulty = true;
                    }
                    dest.fill(0.0);
                }
            }
        }
        self.record_fault(faulty, frames);

        self.report();
        self.block += 1;
    }

    fn record_fault(&mut self, faulty: bool, frames: usize) {
        if faulty {
            self.shared.render_faults.fetch_add(1, Ordering::Relaxed);
            if !self.in_fault {
                tracing::warn!(
                    frames,
                    capacity = self.rack.capacity(),
                    channels = self.rack.channels(),
                    "render shape mismatch, writing silence"
                );
            }
        }
        self.in_fault = faulty;
    }

    fn apply_automation(&mut self, automation: &[AutomationInput<'_>], frames: usize) {
        self.rack.clear_overrides();
        let mut warned = false;
        for entry in automation {
            let applied = Automation::from_slice(entry.values, frames).is_some_and(|a| {
                self.rack
                    .module_mut(entry.module)
                    .and_then(|m| m.lane_mut(entry.param))
                    .is_some_and(|lane| lane.apply_override(a))
            });
            if !applied && !warned {
                warned = true;
                tracing::warn!(
                    module = entry.module,
                    param = entry.param,
                    len = entry.values.len(),
                    frames,
                    "automation ignored for this block"
                );
            }
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: Command) {
        if let Command::SetGraph(rack) = command {
            if self.is_ready() {
                self.swap_rack(rack);
            } else {
                tracing::debug!(
                    modules = rack.len(),
                    "engine not ready, graph held as pending"
                );
                if let Some(old) = self.pending.replace(rack) {
                    self.retire(old);
                }
            }
            return;
        }

        if !self.is_ready() {
            tracing::debug!(command = command.name(), "engine not ready, command dropped");
            return;
        }

        let name = command.name();
        let applied = match &command {
            Command::SetParam {
                module,
                param,
                value,
            } => self
                .rack
                .module_mut(module)
                .is_some_and(|m| m.set_param(param, *value)),
            Command::SetParamString {
                module,
                param,
                value,
            } => self
                .rack
                .module_mut(module)
                .is_some_and(|m| m.set_param_string(param, value)),
            Command::SetVoiceCv {
                module,
                voice,
                value,
                slew_seconds,
            } => self.with_unit(module, |u| u.set_voice_cv(*voice, *value, *slew_seconds)),
            Command::SetVoiceGate {
                module,
                voice,
                value,
            } => self.with_unit(module, |u| u.set_voice_gate(*voice, *value)),
            Command::SetVoiceVelocity {
                module,
                voice,
                value,
            } => self.with_unit(module, |u| u.set_voice_velocity(*voice, *value)),
            Command::TriggerVoiceGate { module, voice } => {
                self.with_unit(module, |u| u.trigger_voice_gate(*voice))
            }
            Command::TriggerVoiceSync { module, voice } => {
                self.with_unit(module, |u| u.trigger_voice_sync(*voice))
            }
            Command::SetChannelCv {
                module,
                channel,
                value,
            } => self.with_unit(module, |u| u.set_channel_cv(*channel, *value)),
            Command::SetChannelGate {
                module,
                channel,
                value,
            } => self.with_unit(module, |u| u.set_channel_gate(*channel, *value)),
            Command::Seek { module, position } => self.with_unit(module, |u| u.seek(*position)),
            Command::Reset { module: Some(module) } => self.with_unit(module, |u| {
                u.reset();
                true
            }),
            Command::Reset { module: None } => {
                self.rack.reset();
                true
            }
            Command::SetGraph(_) => true,
        };

        if !applied {
            self.ignored_commands += 1;
            tracing::warn!(command = name, "command target not found, ignored");
        }
    }

    fn with_unit(
        &mut self,
        module: &str,
        f: impl FnOnce(&mut patchwire_units::UnitInstance) -> bool,
    ) -> bool {
        self.rack
            .module_mut(module)
            .is_some_and(|m| f(m.unit_mut()))
    }

    fn swap_rack(&mut self, rack: Box<Rack>) {
        let old = std::mem::replace(&mut self.rack, rack);
        self.last_steps.clear();
        tracing::debug!(
            old = old.len(),
            new = self.rack.len(),
            block = self.block,
            "graph swapped"
        );
        self.retire(old);
    }

    fn retire(&self, rack: Box<Rack>) {
        // Receiver gone means no control handle is left; dropping here is all
        // that remains.
        let _ = self.retire.send(rack);
    }

    fn send_report(&self, report: Report) {
        match self.reports.try_send(report) {
            Ok(()) => {}
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.shared.dropped_reports.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn report(&mut self) {
        let watch = self.watch.load_full();

        if let Some(id) = &watch.transport {
            if let Some(module) = self.rack.module_mut(id) {
                if module.unit().has_transport_events() {
                    let mut events = Vec::with_capacity(TRANSPORT_QUEUE_CAPACITY);
                    module.unit_mut().drain_transport_events(&mut events);
                    self.send_report(Report::TransportEvents {
                        module_id: id.clone(),
                        events,
                    });
                }
            }
        }

        self.blocks_since_poll += 1;
        if self.blocks_since_poll < self.context.config().poll_interval_blocks {
            return;
        }
        self.blocks_since_poll = 0;
        self.polls += 1;

        self.last_steps
            .retain(|(id, _)| watch.sequencers.iter().any(|w| w == id));
        let mut changed = Vec::new();
        for id in &watch.sequencers {
            let Some(position) = self
                .rack
                .module(id)
                .and_then(|m| m.unit().transport_position())
            else {
                continue;
            };
            match self.last_steps.iter_mut().find(|(known, _)| known == id) {
                Some((_, last)) if *last == position => {}
                Some((_, last)) => {
                    *last = position;
                    changed.push((id.clone(), position));
                }
                None => {
                    self.last_steps.push((id.clone(), position));
                    changed.push((id.clone(), position));
                }
            }
        }
        if !changed.is_empty() {
            self.send_report(Report::SequencerSteps(changed));
        }

        if self.polls % u64::from(self.context.config().debug_snapshot_polls) == 0 {
            self.send_report(Report::Debug(self.snapshot()));
        }
    }
}

fn silence(output: &mut [&mut [f32]]) {
    for channel in output.iter_mut() {
        channel.fill(0.0);
    }
}
