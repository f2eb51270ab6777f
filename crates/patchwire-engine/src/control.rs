//! Control-side handle to a running engine.
//!
//! Two kinds of requests flow through a [`ControlHandle`]:
//!
//! - **Bookkeeping** ([`WatchCommand`]) is stored immediately in a lock-free
//!   [`ArcSwap`] that the render path reads at its reporting point.
//! - **Everything else** ([`Command`]) is queued on a FIFO channel and
//!   applied, in order, at the start of the next block.
//!
//! `set_graph` does the expensive part here, on the caller's thread: parse,
//! validate and instantiate. Only the finished rack crosses to the render
//! path. Racks the engine replaces come back over a retire channel and are
//! dropped by [`ControlHandle::collect_garbage`].

use std::sync::Arc;
use std::sync::atomic::Ordering;

use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender};
use patchwire_patch::{GraphLoadError, PatchGraph, load, resolve};

use crate::command::{Command, WatchCommand};
use crate::context::EngineContext;
use crate::engine::SharedState;
use crate::rack::Rack;

/// Which modules the render path reports on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchState {
    /// Sequencers whose positions are polled.
    pub sequencers: Vec<String>,
    /// Module whose transport events are drained every block.
    pub transport: Option<String>,
}

/// Cloneable sender side of an engine.
#[derive(Clone)]
pub struct ControlHandle {
    context: Arc<EngineContext>,
    commands: Sender<Command>,
    watch: Arc<ArcSwap<WatchState>>,
    shared: Arc<SharedState>,
    retired: Receiver<Box<Rack>>,
}

impl std::fmt::Debug for ControlHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlHandle")
            .field("queued", &self.commands.len())
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

impl ControlHandle {
    pub(crate) fn new(
        context: Arc<EngineContext>,
        commands: Sender<Command>,
        watch: Arc<ArcSwap<WatchState>>,
        shared: Arc<SharedState>,
        retired: Receiver<Box<Rack>>,
    ) -> Self {
        Self {
            context,
            commands,
            watch,
            shared,
            retired,
        }
    }

    /// Loads a patch from JSON and queues it for the engine.
    ///
    /// # Errors
    ///
    /// Any [`GraphLoadError`]; nothing is queued and the current graph keeps
    /// rendering.
    pub fn set_graph(&self, json: &str) -> Result<(), GraphLoadError> {
        let patch = load(json, self.context.registry())?;
        self.queue_rack(Rack::instantiate(&patch, &self.context)?);
        Ok(())
    }

    /// Like [`set_graph`](Self::set_graph) for an already parsed patch.
    pub fn set_patch(&self, patch: &PatchGraph) -> Result<(), GraphLoadError> {
        let resolved = resolve(patch, self.context.registry())?;
        self.queue_rack(Rack::instantiate(&resolved, &self.context)?);
        Ok(())
    }

    fn queue_rack(&self, rack: Rack) {
        self.collect_garbage();
        tracing::debug!(modules = rack.len(), "graph instantiated, queueing swap");
        self.submit(Command::SetGraph(Box::new(rack)));
    }

    /// Queues a command for the next block.
    pub fn submit(&self, command: Command) {
        let name = command.name();
        if self.commands.send(command).is_err() {
            tracing::warn!(command = name, "engine dropped, command discarded");
        }
    }

    /// Applies a bookkeeping command to the watch state now.
    pub fn watch(&self, command: WatchCommand) {
        tracing::debug!(command = command.name(), "watch state updated");
        match command {
            WatchCommand::Sequencers(ids) => {
                self.watch.rcu(|state| WatchState {
                    sequencers: ids.clone(),
                    transport: state.transport.clone(),
                });
            }
            WatchCommand::Transport(id) => {
                self.watch.rcu(|state| WatchState {
                    sequencers: state.sequencers.clone(),
                    transport: id.clone(),
                });
            }
        }
    }

    /// Sets a numeric parameter.
    pub fn set_param(&self, module: &str, param: &str, value: f32) {
        self.submit(Command::SetParam {
            module: module.to_owned(),
            param: param.to_owned(),
            value,
        });
    }

    /// Sets a string parameter.
    pub fn set_param_string(&self, module: &str, param: &str, value: &str) {
        self.submit(Command::SetParamString {
            module: module.to_owned(),
            param: param.to_owned(),
            value: value.to_owned(),
        });
    }

    /// Sets a voice's pitch cv, gliding over `slew_seconds` when given.
    pub fn set_voice_cv(&self, module: &str, voice: usize, value: f32, slew_seconds: Option<f32>) {
        self.submit(Command::SetVoiceCv {
            module: module.to_owned(),
            voice,
            value,
            slew_seconds,
        });
    }

    /// Sets a voice's gate.
    pub fn set_voice_gate(&self, module: &str, voice: usize, value: f32) {
        self.submit(Command::SetVoiceGate {
            module: module.to_owned(),
            voice,
            value,
        });
    }

    /// Sets a voice's velocity.
    pub fn set_voice_velocity(&self, module: &str, voice: usize, value: f32) {
        self.submit(Command::SetVoiceVelocity {
            module: module.to_owned(),
            voice,
            value,
        });
    }

    /// Opens a voice's gate for 1 ms.
    pub fn trigger_voice_gate(&self, module: &str, voice: usize) {
        self.submit(Command::TriggerVoiceGate {
            module: module.to_owned(),
            voice,
        });
    }

    /// Emits a one-sample sync pulse on a voice.
    pub fn trigger_voice_sync(&self, module: &str, voice: usize) {
        self.submit(Command::TriggerVoiceSync {
            module: module.to_owned(),
            voice,
        });
    }

    /// Sets a channel cv on a controls module.
    pub fn set_channel_cv(&self, module: &str, channel: usize, value: f32) {
        self.submit(Command::SetChannelCv {
            module: module.to_owned(),
            channel,
            value,
        });
    }

    /// Sets a channel gate on a controls module.
    pub fn set_channel_gate(&self, module: &str, channel: usize, value: f32) {
        self.submit(Command::SetChannelGate {
            module: module.to_owned(),
            channel,
            value,
        });
    }

    /// Replaces the set of sequencers whose steps are reported.
    pub fn watch_sequencers<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watch(WatchCommand::Sequencers(
            ids.into_iter().map(Into::into).collect(),
        ));
    }

    /// Selects the module whose transport events are reported.
    pub fn watch_transport(&self, module: Option<&str>) {
        self.watch(WatchCommand::Transport(module.map(str::to_owned)));
    }

    /// Moves a module's transport to `position`.
    pub fn seek(&self, module: &str, position: u32) {
        self.submit(Command::Seek {
            module: module.to_owned(),
            position,
        });
    }

    /// Returns `module`, or every module when `None`, to its initial state
    /// at the next block. Parameters are kept.
    pub fn reset(&self, module: Option<&str>) {
        self.submit(Command::Reset {
            module: module.map(str::to_owned),
        });
    }

    /// Current watch state.
    pub fn watch_state(&self) -> WatchState {
        self.watch.load().as_ref().clone()
    }

    /// Whether the engine has been initialized.
    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }

    /// Reports dropped because the report channel was full.
    pub fn dropped_reports(&self) -> u64 {
        self.shared.dropped_reports.load(Ordering::Relaxed)
    }

    /// Render faults counted so far.
    pub fn render_faults(&self) -> u64 {
        self.shared.render_faults.load(Ordering::Relaxed)
    }

    /// Commands waiting for the next block.
    pub fn queued(&self) -> usize {
        self.commands.len()
    }

    /// Drops racks the engine has replaced. Returns how many were freed.
    pub fn collect_garbage(&self) -> usize {
        let mut freed = 0;
        while let Ok(rack) = self.retired.try_recv() {
            tracing::debug!(modules = rack.len(), "retired rack freed");
            drop(rack);
            freed += 1;
        }
        freed
    }

    /// Shared engine context.
    pub fn context(&self) -> &Arc<EngineContext> {
        &self.context
    }
}
