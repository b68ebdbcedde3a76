//! Fake host implementation for testing.
//!
//! Records every command without executing it and replays scripted output, so
//! package-manager flows can be tested on any CI runner.

use super::local_host::output_failed;
use super::ProcessOps;
use crate::{HostError, HostResult};
use std::collections::{HashMap, HashSet, VecDeque};
#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;
#[cfg(windows)]
use std::os::windows::process::ExitStatusExt;
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A command the fake host was asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl CommandRecord {
    /// `program arg1 arg2 ...`, handy for assertions.
    pub fn line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Scripted result for one command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeResponse {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl FakeResponse {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn fail(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

#[derive(Debug, Default)]
struct FakeHostState {
    commands: Vec<CommandRecord>,
    /// Keyed by the full command line. The last queued response is sticky.
    responses: HashMap<String, VecDeque<FakeResponse>>,
    missing_programs: HashSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    state: Arc<Mutex<FakeHostState>>,
}

fn exit_status(code: i32) -> ExitStatus {
    #[cfg(unix)]
    {
        ExitStatus::from_raw(code << 8)
    }
    #[cfg(windows)]
    {
        ExitStatus::from_raw(code as u32)
    }
}

fn key(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program];
    parts.extend_from_slice(args);
    parts.join(" ")
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for an exact command line.
    pub fn respond(&self, program: &str, args: &[&str], response: FakeResponse) -> &Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .entry(key(program, args))
            .or_default()
            .push_back(response);
        self
    }

    /// Make every invocation of `program` fail as if it were not installed.
    pub fn missing(&self, program: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .missing_programs
            .insert(program.to_string());
        self
    }

    /// Get all recorded commands.
    pub fn commands(&self) -> Vec<CommandRecord> {
        self.state.lock().unwrap().commands.clone()
    }

    /// Recorded commands as `program args...` lines.
    pub fn command_lines(&self) -> Vec<String> {
        self.commands().iter().map(CommandRecord::line).collect()
    }

    /// Check if a command with the given line prefix was recorded.
    pub fn ran(&self, prefix: &str) -> bool {
        self.command_lines().iter().any(|l| l.starts_with(prefix))
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().commands.clear();
    }

    fn next_response(&self, program: &str, args: &[&str]) -> Option<FakeResponse> {
        let mut state = self.state.lock().unwrap();
        let queue = state.responses.get_mut(&key(program, args))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl ProcessOps for FakeHost {
    fn command_output(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> HostResult<Output> {
        {
            let mut state = self.state.lock().unwrap();
            state.commands.push(CommandRecord {
                program: program.to_string(),
                args: args.iter().map(|s| s.to_string()).collect(),
                timeout_secs: timeout.as_secs(),
            });
            if state.missing_programs.contains(program) {
                return Err(HostError::CommandNotFound(program.to_string()));
            }
        }

        // Unscripted commands succeed silently.
        let response = self
            .next_response(program, args)
            .unwrap_or_else(|| FakeResponse::ok(""));
        Ok(Output {
            status: exit_status(response.code),
            stdout: response.stdout.into_bytes(),
            stderr: response.stderr.into_bytes(),
        })
    }

    fn command_status(&self, program: &str, args: &[&str], timeout: Duration) -> HostResult<()> {
        let output = self.command_output(program, args, timeout)?;
        if !output.status.success() {
            return Err(output_failed(program, &output));
        }
        Ok(())
    }
}
