//! Stress test suite for tplserve
//!
//! Hammers the wrapper cache from many threads to surface races in
//! single-flight creation, compilation and reloading. These tests take longer
//! than the integration suite and are **not executed in CI**.
//!
//! # Running Stress Tests
//!
//! ```bash
//! cargo test --test stress
//! cargo test --test stress --release -- --nocapture
//! ```
//!
//! Throughput is printed rather than asserted; correctness is asserted through
//! compile and creation counts, which must be exact regardless of timing.
//!
//! # Test Organization
//!
//! - **first_access**: many threads racing to create and compile the same identities
//! - **reload**: recompilation under concurrent load in development mode

mod first_access;
mod reload;
