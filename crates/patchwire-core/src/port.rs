//! Port descriptors for unit inputs and outputs.

use core::fmt;

/// Signal class of a port. A connection is only valid between ports of the
/// same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PortKind {
    /// Audio-rate program material.
    Audio,
    /// Control voltage (pitch, modulation, levels).
    Cv,
    /// Binary note-on/note-off signal (high above 0.5).
    Gate,
    /// Edge-triggered phase reset.
    Sync,
}

impl PortKind {
    /// Lowercase name as used in patch JSON.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PortKind::Audio => "audio",
            PortKind::Cv => "cv",
            PortKind::Gate => "gate",
            PortKind::Sync => "sync",
        }
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a port consumes or produces a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    /// Read by the unit.
    Input,
    /// Written by the unit.
    Output,
}

/// Static description of one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    /// Port id used in patch connections (e.g. `"out"`, `"gate"`).
    pub id: &'static str,
    /// Signal class.
    pub kind: PortKind,
    /// Input or output.
    pub direction: PortDirection,
}

impl PortSpec {
    /// Declares an input port.
    pub const fn input(id: &'static str, kind: PortKind) -> Self {
        Self {
            id,
            kind,
            direction: PortDirection::Input,
        }
    }

    /// Declares an output port.
    pub const fn output(id: &'static str, kind: PortKind) -> Self {
        Self {
            id,
            kind,
            direction: PortDirection::Output,
        }
    }
}

/// Index of input port `id` among the inputs of `ports`.
///
/// Units address their inputs and outputs by position within each direction,
/// which is the order the rack lays out their buffers in.
pub fn input_index(ports: &[PortSpec], id: &str) -> Option<usize> {
    ports
        .iter()
        .filter(|p| p.direction == PortDirection::Input)
        .position(|p| p.id == id)
}

/// Index of output port `id` among the outputs of `ports`.
pub fn output_index(ports: &[PortSpec], id: &str) -> Option<usize> {
    ports
        .iter()
        .filter(|p| p.direction == PortDirection::Output)
        .position(|p| p.id == id)
}

/// Number of input ports in `ports`.
pub fn input_count(ports: &[PortSpec]) -> usize {
    ports
        .iter()
        .filter(|p| p.direction == PortDirection::Input)
        .count()
}

/// Number of output ports in `ports`.
pub fn output_count(ports: &[PortSpec]) -> usize {
    ports
        .iter()
        .filter(|p| p.direction == PortDirection::Output)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORTS: &[PortSpec] = &[
        PortSpec::input("in", PortKind::Audio),
        PortSpec::output("out", PortKind::Audio),
        PortSpec::input("cv", PortKind::Cv),
    ];

    #[test]
    fn indices_are_per_direction() {
        assert_eq!(input_index(PORTS, "in"), Some(0));
        assert_eq!(input_index(PORTS, "cv"), Some(1));
        assert_eq!(output_index(PORTS, "out"), Some(0));
        assert_eq!(output_index(PORTS, "in"), None);
        assert_eq!(input_count(PORTS), 2);
        assert_eq!(output_count(PORTS), 1);
    }

    #[test]
    fn kind_names() {
        assert_eq!(PortKind::Gate.to_string(), "gate");
        assert_eq!(PortKind::Sync.as_str(), "sync");
    }
}
