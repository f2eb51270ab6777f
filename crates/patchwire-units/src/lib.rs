//! Processing units for patchwire.
//!
//! Every unit implements [`patchwire_core::Unit`] and is reachable through the
//! closed [`UnitInstance`] enum, built by type tag from a [`UnitRegistry`].
//!
//! # Units
//!
//! | Tag | Type | Ports |
//! |-----|------|-------|
//! | `oscillator` | [`Oscillator`] | pitch, fm, pwm, sync → out |
//! | `envelope` | [`Envelope`] | gate → out |
//! | `chorus` | [`Chorus`] | in → out |
//! | `gain` | [`Gain`] | in, cv → out |
//! | `sequencer` | [`Sequencer`] | clock, reset → cv, gate |
//! | `voices` | [`VoiceLanes`] | → cv, gate, velocity, sync |
//! | `controls` | [`ControlLanes`] | → cv, gate |
//! | `input` | [`InputNode`] | → out |
//! | `output` | [`OutputNode`] | in → |
//! | `monitor` | [`MonitorNode`] | in → |

pub mod chorus;
pub mod envelope;
pub mod gain;
pub mod instance;
pub mod io;
pub mod lanes;
pub mod oscillator;
pub mod registry;
pub mod sequencer;

pub use chorus::Chorus;
pub use envelope::{AdsrMachine, AdsrTimes, Envelope, EnvelopeStage};
pub use gain::Gain;
pub use instance::UnitInstance;
pub use io::{InputNode, MonitorNode, OutputNode};
pub use lanes::{ControlLanes, MAX_VOICES, VoiceLanes};
pub use oscillator::{MAX_UNISON, Oscillator, Waveform};
pub use registry::{UnitCategory, UnitDescriptor, UnitRegistry};
pub use sequencer::{MAX_STEPS, Sequencer, TRANSPORT_QUEUE_CAPACITY, TransportEvent};
