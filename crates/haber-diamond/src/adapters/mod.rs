//! # Adapters Layer (Outer Hexagon)
//!
//! Concrete implementations of the driven ports.
//!
//! - `deployments`: facet code lookup (`FacetResolver`)
//! - `event_log`: notification sinks (`EventSink`)
//! - `store`: snapshot persistence (`DiamondStore`)

pub mod deployments;
pub mod event_log;
pub mod store;

pub use deployments::*;
pub use event_log::*;
pub use store::*;
