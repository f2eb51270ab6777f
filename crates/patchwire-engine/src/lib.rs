//! Real-time render engine and control plane for patchwire.
//!
//! An [`Engine`] owns the running graph and is driven block by block from the
//! audio callback. A cloneable [`ControlHandle`] feeds it commands from any
//! other thread; [`Report`]s come back over a bounded channel.
//!
//! ```rust
//! use patchwire_engine::{Engine, EngineConfig};
//!
//! let (mut engine, control, _reports) = Engine::new(EngineConfig::default()).unwrap();
//! control
//!     .set_graph(
//!         r#"{
//!           "modules": [
//!             {"id": "osc", "type": "oscillator", "params": {"frequency": 440}},
//!             {"id": "out", "type": "output"}
//!           ],
//!           "connections": [
//!             {"from": {"moduleId": "osc", "portId": "out"},
//!              "to": {"moduleId": "out", "portId": "in"}, "kind": "audio"}
//!           ]
//!         }"#,
//!     )
//!     .unwrap();
//! engine.initialize();
//!
//! let mut left = [0.0f32; 128];
//! let mut right = [0.0f32; 128];
//! engine.render(None, &mut [&mut left, &mut right], &[]);
//! assert!(left.iter().any(|&s| s != 0.0));
//! ```
//!
//! ## Threading
//!
//! | Channel | Direction | Kind |
//! |---------|-----------|------|
//! | commands | control → render | unbounded FIFO, drained once per block |
//! | watch state | control → render | `ArcSwap`, read at the reporting point |
//! | reports | render → control | bounded, `try_send`, drops counted |
//! | retired racks | render → control | unbounded, freed by `collect_garbage` |

pub mod command;
pub mod config;
pub mod context;
pub mod control;
pub mod engine;
pub mod rack;
pub mod report;
pub mod schedule;

pub use command::{AutomationInput, Command, WatchCommand};
pub use config::{ConfigError, EngineConfig};
pub use context::EngineContext;
pub use control::{ControlHandle, WatchState};
pub use engine::Engine;
pub use rack::{Rack, RackModule};
pub use report::{EngineSnapshot, Report};
pub use schedule::{CompiledSchedule, ProcessStep, SlotLayout};
