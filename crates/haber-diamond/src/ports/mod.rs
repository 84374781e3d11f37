//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions between the diamond and the outside world.
//!
//! - **Driving Ports (Inbound)**: `DiamondApi`
//! - **Driven Ports (Outbound)**: `Facet`, `FacetResolver`, `EventSink`, `DiamondStore`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
