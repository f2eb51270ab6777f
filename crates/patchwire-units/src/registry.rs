//! Unit registry and factory.
//!
//! Maps a patch type tag to a [`UnitDescriptor`] (metadata, port and parameter
//! tables) and a factory that builds the matching [`UnitInstance`]. Tags are
//! resolved once when a graph is loaded; render never looks anything up here.
//!
//! ```rust
//! use patchwire_units::{UnitCategory, UnitRegistry};
//!
//! let registry = UnitRegistry::new();
//! let osc = registry.create("oscillator", 48000.0).unwrap();
//! assert_eq!(osc.type_tag(), "oscillator");
//!
//! for unit in registry.units_in_category(UnitCategory::Source) {
//!     println!("{}: {}", unit.id, unit.description);
//! }
//! ```

use patchwire_core::{ParamSpec, PortSpec};

use crate::chorus::Chorus;
use crate::envelope::Envelope;
use crate::gain::Gain;
use crate::instance::UnitInstance;
use crate::io::{InputNode, MonitorNode, OutputNode};
use crate::lanes::{ControlLanes, VoiceLanes};
use crate::oscillator::Oscillator;
use crate::sequencer::Sequencer;

/// Category of unit for listing and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitCategory {
    /// Audio generators.
    Source,
    /// Control-signal generators (envelopes, sequencers).
    Modulation,
    /// Audio processors (gain, chorus).
    Processor,
    /// Host-driven control lanes.
    Control,
    /// Host input, output and monitor nodes.
    Routing,
}

impl UnitCategory {
    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            UnitCategory::Source => "Source",
            UnitCategory::Modulation => "Modulation",
            UnitCategory::Processor => "Processor",
            UnitCategory::Control => "Control",
            UnitCategory::Routing => "Routing",
        }
    }
}

/// Describes one unit type.
#[derive(Debug, Clone, Copy)]
pub struct UnitDescriptor {
    /// Type tag used in patch JSON (lowercase, no spaces).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description.
    pub description: &'static str,
    /// Category.
    pub category: UnitCategory,
    /// Port table.
    pub ports: &'static [PortSpec],
    /// Parameter table.
    pub params: &'static [ParamSpec],
    /// String parameters accepted besides the numeric table.
    pub string_params: &'static [&'static str],
}

/// Factory function type: sample rate → fresh instance.
type UnitFactory = fn(f32) -> UnitInstance;

struct RegistryEntry {
    descriptor: UnitDescriptor,
    factory: UnitFactory,
}

/// Registry of all available unit types.
pub struct UnitRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitRegistry {
    /// Creates a registry with every built-in unit registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(10),
        };
        registry.register_builtin_units();
        registry
    }

    fn register_builtin_units(&mut self) {
        self.register(
            UnitDescriptor {
                id: "oscillator",
                name: "Oscillator",
                description: "Unison oscillator with FM, PWM and hard sync",
                category: UnitCategory::Source,
                ports: Oscillator::PORTS,
                params: Oscillator::PARAMS,
                string_params: &["waveform"],
            },
            |sr| UnitInstance::Oscillator(Oscillator::new(sr)),
        );

        self.register(
            UnitDescriptor {
                id: "envelope",
                name: "Envelope",
                description: "Gate-driven linear ADSR",
                category: UnitCategory::Modulation,
                ports: Envelope::PORTS,
                params: Envelope::PARAMS,
                string_params: &[],
            },
            |_| UnitInstance::Envelope(Envelope::new()),
        );

        self.register(
            UnitDescriptor {
                id: "sequencer",
                name: "Sequencer",
                description: "16-step cv/gate sequencer with transport",
                category: UnitCategory::Modulation,
                ports: Sequencer::PORTS,
                params: Sequencer::PARAMS,
                string_params: &["pattern"],
            },
            |sr| UnitInstance::Sequencer(Sequencer::new(sr)),
        );

        self.register(
            UnitDescriptor {
                id: "gain",
                name: "Gain",
                description: "Voltage-controlled amplifier",
                category: UnitCategory::Processor,
                ports: Gain::PORTS,
                params: Gain::PARAMS,
                string_params: &[],
            },
            |_| UnitInstance::Gain(Gain::new()),
        );

        self.register(
            UnitDescriptor {
                id: "chorus",
                name: "Chorus",
                description: "Stereo modulated-delay chorus",
                category: UnitCategory::Processor,
                ports: Chorus::PORTS,
                params: Chorus::PARAMS,
                string_params: &[],
            },
            |sr| UnitInstance::Chorus(Chorus::new(sr)),
        );

        self.register(
            UnitDescriptor {
                id: "voices",
                name: "Voices",
                description: "Polyphonic cv/gate/velocity/sync lanes",
                category: UnitCategory::Control,
                ports: VoiceLanes::PORTS,
                params: VoiceLanes::PARAMS,
                string_params: &[],
            },
            |sr| UnitInstance::Voices(VoiceLanes::new(sr)),
        );

        self.register(
            UnitDescriptor {
                id: "controls",
                name: "Controls",
                description: "Per-channel cv and gate lanes",
                category: UnitCategory::Control,
                ports: ControlLanes::PORTS,
                params: &[],
                string_params: &[],
            },
            |_| UnitInstance::Controls(ControlLanes::new()),
        );

        self.register(
            UnitDescriptor {
                id: "input",
                name: "Input",
                description: "External audio input",
                category: UnitCategory::Routing,
                ports: InputNode::PORTS,
                params: &[],
                string_params: &[],
            },
            |_| UnitInstance::Input(InputNode::new()),
        );

        self.register(
            UnitDescriptor {
                id: "output",
                name: "Output",
                description: "Main output bus",
                category: UnitCategory::Routing,
                ports: OutputNode::PORTS,
                params: &[],
                string_params: &[],
            },
            |_| UnitInstance::Output(OutputNode::new()),
        );

        self.register(
            UnitDescriptor {
                id: "monitor",
                name: "Monitor",
                description: "Tap whose last block is readable by the host",
                category: UnitCategory::Routing,
                ports: MonitorNode::PORTS,
                params: &[],
                string_params: &[],
            },
            |_| UnitInstance::Monitor(MonitorNode::new()),
        );
    }

    /// Registers a unit type.
    fn register(&mut self, descriptor: UnitDescriptor, factory: UnitFactory) {
        self.entries.push(RegistryEntry {
            descriptor,
            factory,
        });
    }

    /// Every registered unit, in registration order.
    pub fn all_units(&self) -> impl Iterator<Item = &UnitDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Units in `category`.
    pub fn units_in_category(
        &self,
        category: UnitCategory,
    ) -> impl Iterator<Item = &UnitDescriptor> {
        self.all_units().filter(move |d| d.category == category)
    }

    /// Descriptor for type tag `id`.
    pub fn descriptor(&self, id: &str) -> Option<&UnitDescriptor> {
        self.all_units().find(|d| d.id == id)
    }

    /// Builds a fresh instance of type tag `id`.
    pub fn create(&self, id: &str, sample_rate: f32) -> Option<UnitInstance> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| (e.factory)(sample_rate))
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwire_core::Unit;

    #[test]
    fn every_descriptor_matches_its_instance() {
        let registry = UnitRegistry::new();
        assert_eq!(registry.len(), 10);
        for desc in registry.all_units() {
            let unit = registry.create(desc.id, 48000.0).unwrap();
            assert_eq!(unit.type_tag(), desc.id);
            assert_eq!(unit.ports(), desc.ports);
            assert_eq!(unit.params().len(), desc.params.len());
        }
    }

    #[test]
    fn unknown_tag() {
        let registry = UnitRegistry::new();
        assert!(registry.create("wavetable", 48000.0).is_none());
        assert!(registry.descriptor("wavetable").is_none());
    }

    #[test]
    fn categories_partition_registry() {
        let registry = UnitRegistry::new();
        let total: usize = [
            UnitCategory::Source,
            UnitCategory::Modulation,
            UnitCategory::Processor,
            UnitCategory::Control,
            UnitCategory::Routing,
        ]
        .iter()
        .map(|&c| registry.units_in_category(c).count())
        .sum();
        assert_eq!(total, registry.len());
    }
}
