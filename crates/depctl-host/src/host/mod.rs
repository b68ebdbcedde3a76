//! Host trait definitions and implementations.
//!
//! `LocalHost` runs real commands; `FakeHost` records them and replays scripted
//! output for tests.

pub mod fake_host;
pub mod local_host;
pub mod process_ops;

pub use fake_host::{CommandRecord, FakeHost, FakeResponse};
pub use local_host::LocalHost;
pub use process_ops::ProcessOps;
