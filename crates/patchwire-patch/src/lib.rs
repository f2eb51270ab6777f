//! Patch graph model and validation for patchwire.
//!
//! A patch arrives as JSON ([`PatchGraph`]), is checked against the unit
//! registry and turned into a [`ResolvedPatch`] whose modules, ports and
//! processing order are plain indices. Anything wrong with the document is a
//! [`GraphLoadError`].
//!
//! ```rust
//! use patchwire_patch::load;
//! use patchwire_units::UnitRegistry;
//!
//! let json = r#"{
//!   "modules": [
//!     {"id": "osc", "type": "oscillator", "params": {"frequency": 440}},
//!     {"id": "out", "type": "output"}
//!   ],
//!   "connections": [
//!     {"from": {"moduleId": "osc", "portId": "out"},
//!      "to": {"moduleId": "out", "portId": "in"}, "kind": "audio"}
//!   ]
//! }"#;
//!
//! let patch = load(json, &UnitRegistry::new()).unwrap();
//! assert_eq!(patch.order, vec![0, 1]);
//! ```

pub mod error;
pub mod model;
pub mod resolve;

pub use error::GraphLoadError;
pub use model::{Connection, Endpoint, ModuleSpec, ParamValue, PatchGraph};
pub use resolve::{
    INPUT_TYPE, OUTPUT_TYPE, ResolvedConnection, ResolvedModule, ResolvedPatch, ResolvedParam,
    load, resolve,
};
