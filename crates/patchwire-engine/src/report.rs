//! Asynchronous reports sent from the render path to the control side.

use patchwire_units::TransportEvent;

/// A report emitted by [`Engine::render`](crate::Engine::render).
///
/// Reports travel over a bounded channel. When the channel is full the report
/// is dropped and counted in [`EngineSnapshot::dropped_reports`].
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// Watched sequencers whose step changed since the last poll.
    SequencerSteps(Vec<(String, u32)>),
    /// Periodic engine state.
    Debug(EngineSnapshot),
    /// Events drained from the watched transport module.
    TransportEvents {
        /// Module the events came from.
        module_id: String,
        /// Events in emission order.
        events: Vec<TransportEvent>,
    },
}

/// Point-in-time engine state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineSnapshot {
    /// Blocks rendered since construction.
    pub block: u64,
    /// Whether the engine has been initialized.
    pub ready: bool,
    /// Modules in the current graph.
    pub modules: usize,
    /// Whether a graph is waiting for initialization.
    pub pending_graph: bool,
    /// Blocks (or channels) rendered as silence because of a shape mismatch.
    pub render_faults: u64,
    /// Reports dropped because the channel was full.
    pub dropped_reports: u64,
    /// Commands ignored because their target did not exist.
    pub ignored_commands: u64,
    /// Peak of the last output block.
    pub output_peak: f32,
}
