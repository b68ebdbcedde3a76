//! Process execution helpers.

use crate::HostResult;
use std::process::Output;
use std::time::Duration;

/// External command runner.
///
/// `command_output` returns the raw output whatever the exit status; callers
/// decide what a non-zero exit means. `command_status` treats a non-zero exit
/// as [`crate::HostError::CommandFailed`].
pub trait ProcessOps {
    fn command_output(&self, program: &str, args: &[&str], timeout: Duration) -> HostResult<Output>;

    fn command_status(&self, program: &str, args: &[&str], timeout: Duration) -> HostResult<()>;

    /// Runs a query and returns trimmed stdout, or `None` on any failure.
    fn query_stdout(&self, program: &str, args: &[&str], timeout: Duration) -> Option<String> {
        match self.command_output(program, args, timeout) {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Ok(output) => {
                log::debug!(
                    "{} {} exited with {:?}",
                    program,
                    args.join(" "),
                    output.status.code()
                );
                None
            }
            Err(err) => {
                log::debug!("{} {} failed: {}", program, args.join(" "), err);
                None
            }
        }
    }
}

impl<T: ProcessOps + ?Sized> ProcessOps for &T {
    fn command_output(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> HostResult<Output> {
        (**self).command_output(program, args, timeout)
    }

    fn command_status(&self, program: &str, args: &[&str], timeout: Duration) -> HostResult<()> {
        (**self).command_status(program, args, timeout)
    }
}
