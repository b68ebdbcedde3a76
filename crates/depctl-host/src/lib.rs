//! depctl host layer.
//!
//! Every package-manager invocation is "world-touching" and goes through
//! [`ProcessOps`] so the policy engine can be exercised without spawning real
//! processes.

pub mod host;
pub mod path;

pub use depctl_error::{HostError, HostResult};
pub use host::{CommandRecord, FakeHost, FakeResponse, LocalHost, ProcessOps};
