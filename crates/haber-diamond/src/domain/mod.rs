//! # Domain Layer (Inner Hexagon)
//!
//! Pure business logic for the diamond proxy.
//! NO I/O, NO async.
//!
//! - `ownership`: two-phase ownership state machine
//! - `registry`: selector table and staged cuts
//! - `authorizer`: owner gate in front of the registry
//! - `storage`: persistent storage and the per-call write overlay

pub mod authorizer;
pub mod builtins;
pub mod entities;
pub mod invariants;
pub mod ownership;
pub mod registry;
pub mod services;
pub mod storage;
pub mod value_objects;

pub use authorizer::*;
pub use builtins::*;
pub use entities::*;
pub use invariants::*;
pub use ownership::*;
pub use registry::*;
pub use services::*;
pub use storage::*;
pub use value_objects::*;
