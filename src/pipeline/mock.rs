//! Scripted [`ProcessExecutor`] for tests: no processes are spawned.

use std::collections::{HashMap, VecDeque};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::ProcessError;
use crate::pipeline::process::{ProcessExecutor, ProcessOutput};

/// What a scripted invocation does.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Exit 0. If `write_arg` is set, write a small file to the argument at that index first
    /// (how a fake transform produces its output artifact).
    Succeed { write_arg: Option<usize> },
    /// Exit with `code` and `stderr`.
    Fail { code: i32, stderr: String },
    /// Behave as if the timeout expired.
    TimeOut,
}

impl MockResponse {
    pub fn fail(code: i32, stderr: impl Into<String>) -> Self {
        MockResponse::Fail {
            code,
            stderr: stderr.into(),
        }
    }
}

/// One recorded call.
#[derive(Clone, Debug)]
pub struct MockCall {
    pub program: String,
    pub args: Vec<OsString>,
    pub timeout: Option<Duration>,
}

/// Scripted executor. Responses are chosen per call by the first rule whose needle appears in
/// any argument; rules with a queue pop one response per matching call and fall back to the
/// program default once drained.
#[derive(Clone, Default)]
pub struct MockExecutor {
    defaults: Arc<Mutex<HashMap<String, MockResponse>>>,
    rules: Arc<Mutex<Vec<(String, VecDeque<MockResponse>)>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response for `program` when no rule matches.
    pub fn on_program(self, program: &str, response: MockResponse) -> Self {
        self.defaults
            .lock()
            .unwrap()
            .insert(program.to_string(), response);
        self
    }

    /// Responses, in order, for calls whose arguments contain `needle`.
    pub fn on_arg(self, needle: &str, responses: Vec<MockResponse>) -> Self {
        self.rules
            .lock()
            .unwrap()
            .push((needle.to_string(), responses.into()));
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.program == program)
            .count()
    }

    fn pick(&self, program: &str, args: &[OsString]) -> MockResponse {
        let mut rules = self.rules.lock().unwrap();
        for (needle, queue) in rules.iter_mut() {
            let hit = args.iter().any(|a| a.to_string_lossy().contains(needle.as_str()));
            if hit && let Some(response) = queue.pop_front() {
                return response;
            }
        }
        self.defaults
            .lock()
            .unwrap()
            .get(program)
            .cloned()
            .unwrap_or(MockResponse::Succeed { write_arg: None })
    }
}

impl ProcessExecutor for MockExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[OsString],
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, ProcessError> {
        self.calls.lock().unwrap().push(MockCall {
            program: program.to_string(),
            args: args.to_vec(),
            timeout,
        });
        match self.pick(program, args) {
            MockResponse::Succeed { write_arg } => {
                if let Some(path) = write_arg.and_then(|i| args.get(i)).map(PathBuf::from) {
                    std::fs::write(&path, b"deidentified").map_err(|source| {
                        ProcessError::Wait {
                            program: program.to_string(),
                            source,
                        }
                    })?;
                }
                Ok(ProcessOutput {
                    code: Some(0),
                    ..Default::default()
                })
            }
            MockResponse::Fail { code, stderr } => Ok(ProcessOutput {
                code: Some(code),
                stdout: String::new(),
                stderr,
            }),
            MockResponse::TimeOut => Err(ProcessError::TimedOut {
                program: program.to_string(),
                after: timeout.unwrap_or_default(),
            }),
        }
    }
}
