//! Control commands and per-block host automation.

use crate::rack::Rack;

/// An order-sensitive control request, queued and applied in submission
/// order at the start of the next block.
#[derive(Debug)]
pub enum Command {
    /// Swap in an already validated and instantiated rack.
    SetGraph(Box<Rack>),
    /// Sets a numeric parameter, clamped to its range.
    SetParam {
        /// Module id.
        module: String,
        /// Parameter key.
        param: String,
        /// New value.
        value: f32,
    },
    /// Sets a string parameter (e.g. a waveform name or step pattern).
    SetParamString {
        /// Module id.
        module: String,
        /// Parameter key.
        param: String,
        /// New value.
        value: String,
    },
    /// Sets a voice's pitch cv, optionally gliding over `slew_seconds`.
    SetVoiceCv {
        /// Voices module id.
        module: String,
        /// Voice index.
        voice: usize,
        /// Target cv.
        value: f32,
        /// Glide time constant.
        slew_seconds: Option<f32>,
    },
    /// Sets a voice's held gate level.
    SetVoiceGate {
        /// Voices module id.
        module: String,
        /// Voice index.
        voice: usize,
        /// Gate level.
        value: f32,
    },
    /// Sets a voice's velocity.
    SetVoiceVelocity {
        /// Voices module id.
        module: String,
        /// Voice index.
        voice: usize,
        /// Velocity.
        value: f32,
    },
    /// Opens a voice's gate for 1 ms.
    TriggerVoiceGate {
        /// Voices module id.
        module: String,
        /// Voice index.
        voice: usize,
    },
    /// Emits a one-sample sync pulse on a voice.
    TriggerVoiceSync {
        /// Voices module id.
        module: String,
        /// Voice index.
        voice: usize,
    },
    /// Sets one channel of a controls module's cv output.
    SetChannelCv {
        /// Controls module id.
        module: String,
        /// Channel index.
        channel: usize,
        /// Value.
        value: f32,
    },
    /// Sets one channel of a controls module's gate output.
    SetChannelGate {
        /// Controls module id.
        module: String,
        /// Channel index.
        channel: usize,
        /// Value.
        value: f32,
    },
    /// Moves a module's transport.
    Seek {
        /// Module id.
        module: String,
        /// Target step.
        position: u32,
    },
    /// Returns one module, or every module when `None`, to its initial
    /// state. Parameters are kept.
    Reset {
        /// Module id.
        module: Option<String>,
    },
}

impl Command {
    /// Variant name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetGraph(_) => "set_graph",
            Command::SetParam { .. } => "set_param",
            Command::SetParamString { .. } => "set_param_string",
            Command::SetVoiceCv { .. } => "set_voice_cv",
            Command::SetVoiceGate { .. } => "set_voice_gate",
            Command::SetVoiceVelocity { .. } => "set_voice_velocity",
            Command::TriggerVoiceGate { .. } => "trigger_voice_gate",
            Command::TriggerVoiceSync { .. } => "trigger_voice_sync",
            Command::SetChannelCv { .. } => "set_channel_cv",
            Command::SetChannelGate { .. } => "set_channel_gate",
            Command::Seek { .. } => "seek",
            Command::Reset { .. } => "reset",
        }
    }
}

/// Reporting bookkeeping. Never queued: applied to the shared watch state
/// as soon as it is submitted, whether or not the engine is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    /// Replaces the set of sequencers whose positions are reported.
    Sequencers(Vec<String>),
    /// Selects the module whose transport events are reported.
    Transport(Option<String>),
}

impl WatchCommand {
    /// Variant name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            WatchCommand::Sequencers(_) => "watch_sequencers",
            WatchCommand::Transport(_) => "watch_transport",
        }
    }
}

/// Host automation for one parameter during one render call.
///
/// `values` holds either a single value for the whole block or exactly one
/// value per frame. Any other length is ignored for that block.
#[derive(Debug, Clone, Copy)]
pub struct AutomationInput<'a> {
    /// Module id.
    pub module: &'a str,
    /// Parameter key.
    pub param: &'a str,
    /// One value, or one per frame.
    pub values: &'a [f32],
}

impl<'a> AutomationInput<'a> {
    /// Builds an automation entry.
    pub fn new(module: &'a str, param: &'a str, values: &'a [f32]) -> Self {
        Self {
            module,
            param,
            values,
        }
    }
}
