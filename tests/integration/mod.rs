//! Integration test suite for tplserve
//!
//! End-to-end tests running the real Tera compiler against temporary document
//! roots, plus CLI tests driving the built binary. These run quickly and are
//! executed in CI on every commit.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! RUST_LOG=dispatch=trace cargo test --test integration -- --nocapture
//! ```
//!
//! # Test Organization
//!
//! - **dispatch**: identity resolution, precompile requests and error responses
//! - **reload**: development-mode recompilation and reload counters
//! - **lifecycle**: teardown and shutdown behavior
//! - **cli**: the `tplserve` binary

mod cli;
mod dispatch;
mod lifecycle;
mod reload;
