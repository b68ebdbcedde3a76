//! Host implementation that spawns real processes.

use super::ProcessOps;
use crate::{HostError, HostResult};
use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

#[derive(Debug, Clone, Default)]
pub struct LocalHost;

impl LocalHost {
    pub fn new() -> Self {
        Self
    }
}

fn map_command_err(program: &str, err: std::io::Error) -> HostError {
    if err.kind() == std::io::ErrorKind::NotFound {
        return HostError::CommandNotFound(program.to_string());
    }
    HostError::Io(err)
}

pub(crate) fn output_failed(program: &str, output: &Output) -> HostError {
    HostError::CommandFailed {
        program: program.to_string(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

/// Kills the child and everything it spawned (pip build backends, brew's ruby).
#[cfg(unix)]
fn kill_process_tree(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Err(err) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
        log::debug!("killpg {} failed: {}", child.id(), err);
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child) {
    let _ = child.kill();
}

fn output_with_timeout(program: &str, cmd: &mut Command, timeout: Duration) -> HostResult<Output> {
    // Package managers prompt on stdin when they are unsure; never let them wait.
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    // Own process group, so a timeout can take down grandchildren too.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let mut child = cmd.spawn().map_err(|e| map_command_err(program, e))?;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    // Drain pipes concurrently to avoid deadlocks on large output (pip list, brew info).
    let stdout_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout.take() {
            let _ = out.read_to_end(&mut buf);
        }
        buf
    });
    let stderr_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr.take() {
            let _ = err.read_to_end(&mut buf);
        }
        buf
    });

    let status = match child.wait_timeout(timeout).map_err(HostError::Io)? {
        Some(status) => status,
        None => {
            kill_process_tree(&mut child);
            let _ = child.wait();
            // A descendant that escaped the group can still hold the pipes
            // open; the readers are left detached rather than joined.
            drop(stdout_handle);
            drop(stderr_handle);
            return Err(HostError::CommandTimeout {
                program: program.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

impl ProcessOps for LocalHost {
    fn command_output(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> HostResult<Output> {
        log::debug!("exec: {} {}", program, args.join(" "));
        let mut cmd = Command::new(program);
        cmd.args(args);
        output_with_timeout(program, &mut cmd, timeout)
    }

    fn command_status(&self, program: &str, args: &[&str], timeout: Duration) -> HostResult<()> {
        let output = self.command_output(program, args, timeout)?;
        if !output.status.success() {
            return Err(output_failed(program, &output));
        }
        Ok(())
    }
}
