//! Errors raised while loading a patch graph.

use patchwire_core::PortKind;
use thiserror::Error;

/// Why a patch graph was rejected.
///
/// A rejected graph never replaces the one currently rendering.
#[derive(Debug, Error)]
pub enum GraphLoadError {
    /// The document is not valid patch JSON.
    #[error("malformed patch JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Two modules share an id.
    #[error("duplicate module id '{0}'")]
    DuplicateModule(String),

    /// A module names a type the registry does not know.
    #[error("module '{module}' has unknown type '{type_tag}'")]
    UnknownType {
        /// Module id.
        module: String,
        /// Offending type tag.
        type_tag: String,
    },

    /// A connection references a module id that does not exist.
    #[error("connection references unknown module '{0}'")]
    UnknownModule(String),

    /// A connection references a port the module does not have.
    #[error("module '{module}' has no port '{port}'")]
    UnknownPort {
        /// Module id.
        module: String,
        /// Port id.
        port: String,
    },

    /// A connection starts at an input or ends at an output.
    #[error("port '{module}.{port}' cannot be used as a connection {end}")]
    DirectionMismatch {
        /// Module id.
        module: String,
        /// Port id.
        port: String,
        /// `"source"` or `"destination"`.
        end: &'static str,
    },

    /// The declared connection kind differs from a port's kind.
    #[error("connection {from} -> {to} declared {declared} but port '{port}' is {actual}")]
    KindMismatch {
        /// Source endpoint as `module.port`.
        from: String,
        /// Destination endpoint as `module.port`.
        to: String,
        /// Kind stated on the connection.
        declared: PortKind,
        /// Endpoint whose kind disagrees, as `module.port`.
        port: String,
        /// Kind of that port.
        actual: PortKind,
    },

    /// More than one `output` module.
    #[error("graph has more than one output module ('{first}' and '{second}')")]
    MultipleOutputs {
        /// First output module id.
        first: String,
        /// Second output module id.
        second: String,
    },

    /// A parameter key the module type does not declare.
    #[error("module '{module}' has no parameter '{param}'")]
    UnknownParam {
        /// Module id.
        module: String,
        /// Parameter key.
        param: String,
    },

    /// A known parameter with a value of the wrong shape.
    #[error("invalid value for parameter '{param}' of module '{module}': {reason}")]
    InvalidParam {
        /// Module id.
        module: String,
        /// Parameter key.
        param: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// The connections form a cycle.
    #[error("graph contains a cycle through module '{0}'")]
    Cycle(String),
}

impl GraphLoadError {
    /// Shorthand for [`GraphLoadError::InvalidParam`].
    pub fn invalid_param(
        module: impl Into<String>,
        param: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        GraphLoadError::InvalidParam {
            module: module.into(),
            param: param.into(),
            reason: reason.into(),
        }
    }
}
