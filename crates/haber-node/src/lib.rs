//! # Haber Node Library
//!
//! Runtime pieces of the Haber diamond node, exposed for testing. The entry
//! point is the `haber-node` binary.
//!
//! ## Modules
//!
//! - `config/` - Node configuration and environment overrides
//! - `deploy/` - First-start deployment plan
//! - `facets/` - Facets deployed with the diamond
//! - `store/` - Snapshot backend selection
//! - `node/` - The runtime owning the diamond

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod deploy;
pub mod facets;
pub mod node;
pub mod store;

pub use config::{load_config, ConfigError, NodeConfig};
pub use node::{HaberNode, NodeDiamond};
