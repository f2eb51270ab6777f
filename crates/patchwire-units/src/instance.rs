//! Closed set of unit kinds a rack can hold.
//!
//! [`UnitInstance`] dispatches the [`Unit`] contract by `match`, and exposes
//! the kind-specific commands (voice lanes, channel lanes, transport) as
//! methods that return `false`/`None` for kinds that do not support them.

use patchwire_core::{ParamLane, ParamSpec, PortSpec, RenderContext, Unit, UnitIo};

use crate::chorus::Chorus;
use crate::envelope::Envelope;
use crate::gain::Gain;
use crate::io::{InputNode, MonitorNode, OutputNode};
use crate::lanes::{ControlLanes, VoiceLanes};
use crate::oscillator::Oscillator;
use crate::sequencer::{Sequencer, TransportEvent};

/// One instantiated unit.
#[derive(Debug, Clone)]
pub enum UnitInstance {
    /// Voltage-controlled amplifier.
    Gain(Gain),
    /// Unison oscillator.
    Oscillator(Oscillator),
    /// ADSR envelope generator.
    Envelope(Envelope),
    /// Stereo chorus.
    Chorus(Chorus),
    /// Host input source.
    Input(InputNode),
    /// Main output bus.
    Output(OutputNode),
    /// Monitor tap.
    Monitor(MonitorNode),
    /// Polyphonic voice lanes.
    Voices(VoiceLanes),
    /// Per-channel control lanes.
    Controls(ControlLanes),
    /// Step sequencer.
    Sequencer(Sequencer),
}

macro_rules! dispatch {
    ($self:expr, $unit:ident => $body:expr) => {
        match $self {
            UnitInstance::Gain($unit) => $body,
            UnitInstance::Oscillator($unit) => $body,
            UnitInstance::Envelope($unit) => $body,
            UnitInstance::Chorus($unit) => $body,
            UnitInstance::Input($unit) => $body,
            UnitInstance::Output($unit) => $body,
            UnitInstance::Monitor($unit) => $body,
            UnitInstance::Voices($unit) => $body,
            UnitInstance::Controls($unit) => $body,
            UnitInstance::Sequencer($unit) => $body,
        }
    };
}

impl UnitInstance {
    /// Type tag as used in patch JSON.
    pub const fn type_tag(&self) -> &'static str {
        match self {
            UnitInstance::Gain(_) => "gain",
            UnitInstance::Oscillator(_) => "oscillator",
            UnitInstance::Envelope(_) => "envelope",
            UnitInstance::Chorus(_) => "chorus",
            UnitInstance::Input(_) => "input",
            UnitInstance::Output(_) => "output",
            UnitInstance::Monitor(_) => "monitor",
            UnitInstance::Voices(_) => "voices",
            UnitInstance::Controls(_) => "controls",
            UnitInstance::Sequencer(_) => "sequencer",
        }
    }

    /// Sets the pitch cv of a voice. False unless this is a voices unit.
    pub fn set_voice_cv(&mut self, voice: usize, value: f32, slew_seconds: Option<f32>) -> bool {
        match self {
            UnitInstance::Voices(v) => v.set_cv(voice, value, slew_seconds),
            _ => false,
        }
    }

    /// Sets the gate of a voice. False unless this is a voices unit.
    pub fn set_voice_gate(&mut self, voice: usize, value: f32) -> bool {
        match self {
            UnitInstance::Voices(v) => v.set_gate(voice, value),
            _ => false,
        }
    }

    /// Sets the velocity of a voice. False unless this is a voices unit.
    pub fn set_voice_velocity(&mut self, voice: usize, value: f32) -> bool {
        match self {
            UnitInstance::Voices(v) => v.set_velocity(voice, value),
            _ => false,
        }
    }

    /// Fires a 1 ms gate on a voice. False unless this is a voices unit.
    pub fn trigger_voice_gate(&mut self, voice: usize) -> bool {
        match self {
            UnitInstance::Voices(v) => v.trigger_gate(voice),
            _ => false,
        }
    }

    /// Fires a one-sample sync on a voice. False unless this is a voices unit.
    pub fn trigger_voice_sync(&mut self, voice: usize) -> bool {
        match self {
            UnitInstance::Voices(v) => v.trigger_sync(voice),
            _ => false,
        }
    }

    /// Sets a channel cv. False unless this is a controls unit.
    pub fn set_channel_cv(&mut self, channel: usize, value: f32) -> bool {
        match self {
            UnitInstance::Controls(c) => c.set_cv(channel, value),
            _ => false,
        }
    }

    /// Sets a channel gate. False unless this is a controls unit.
    pub fn set_channel_gate(&mut self, channel: usize, value: f32) -> bool {
        match self {
            UnitInstance::Controls(c) => c.set_gate(channel, value),
            _ => false,
        }
    }

    /// Current transport position, for units with a transport.
    pub fn transport_position(&self) -> Option<u32> {
        match self {
            UnitInstance::Sequencer(s) => Some(s.position()),
            _ => None,
        }
    }

    /// Moves the transport. False for units without one.
    pub fn seek(&mut self, position: u32) -> bool {
        match self {
            UnitInstance::Sequencer(s) => {
                s.seek(position);
                true
            }
            _ => false,
        }
    }

    /// True when the unit has queued transport events.
    pub fn has_transport_events(&self) -> bool {
        match self {
            UnitInstance::Sequencer(s) => s.has_events(),
            _ => false,
        }
    }

    /// Moves queued transport events into `out`.
    pub fn drain_transport_events(&mut self, out: &mut Vec<TransportEvent>) {
        if let UnitInstance::Sequencer(s) = self {
            s.drain_events(out);
        }
    }

    /// Peak level of the last block for sink nodes.
    pub fn last_peak(&self) -> Option<f32> {
        match self {
            UnitInstance::Output(o) => Some(o.last_peak()),
            UnitInstance::Monitor(m) => Some(m.last_peak()),
            _ => None,
        }
    }
}

impl Unit for UnitInstance {
    fn ports(&self) -> &'static [PortSpec] {
        dispatch!(self, unit => unit.ports())
    }

    fn params(&self) -> &'static [ParamSpec] {
        dispatch!(self, unit => unit.params())
    }

    #[inline]
    fn render(&mut self, io: UnitIo<'_>, ctx: &RenderContext) {
        dispatch!(self, unit => unit.render(io, ctx))
    }

    fn set_param_string(&mut self, key: &str, value: &str, lanes: &mut [ParamLane]) -> bool {
        dispatch!(self, unit => unit.set_param_string(key, value, lanes))
    }

    fn reset(&mut self) {
        dispatch!(self, unit => unit.reset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_specific_commands_are_refused_elsewhere() {
        let mut gain = UnitInstance::Gain(Gain::new());
        assert!(!gain.set_voice_gate(0, 1.0));
        assert!(!gain.set_channel_cv(0, 1.0));
        assert!(!gain.seek(3));
        assert_eq!(gain.transport_position(), None);

        let mut seq = UnitInstance::Sequencer(Sequencer::new(48000.0));
        assert!(seq.seek(3));
        assert_eq!(seq.transport_position(), Some(3));
        assert!(seq.has_transport_events());
    }

    #[test]
    fn dispatch_reaches_inner_tables() {
        let osc = UnitInstance::Oscillator(Oscillator::new(48000.0));
        assert_eq!(osc.ports(), Oscillator::PORTS);
        assert_eq!(osc.params().len(), Oscillator::PARAMS.len());
        assert_eq!(osc.type_tag(), "oscillator");
    }
}
