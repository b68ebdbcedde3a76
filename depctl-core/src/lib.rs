//! depctl core: requirement loading, version policy, package-manager
//! backends, the install orchestrator and package snapshots.

pub mod backends;
pub mod brew;
pub mod cli;
pub mod environment;
pub mod installer;
pub mod logging;
pub mod orchestrator;
pub mod policy;
pub mod pypi;
pub mod report;
pub mod requirements;
pub mod settings;
pub mod snapshot;
pub mod version;
pub mod versions;

pub use depctl_error::{DepctlError, DepctlResult};
