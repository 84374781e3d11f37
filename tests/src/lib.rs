//! # Haber Test Suite
//!
//! Cross-crate tests for the diamond and the node that runs it.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/   # Diamond + node facets + adapters together
//! └── benches/           # Criterion benchmarks for dispatch and cuts
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p haber-tests
//! cargo bench -p haber-tests
//! ```

pub mod integration;
