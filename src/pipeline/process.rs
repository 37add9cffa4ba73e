//! Process invocation for the external collaborators (transform and upload commands).
//!
//! [`ProcessExecutor`] is the seam: the pipeline only ever sees `execute(program, args, timeout)`,
//! so tests substitute a scripted fake and never spawn anything.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::{ErrorKind, Read};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::{debug, warn};

use crate::error::ProcessError;
use crate::pipeline::cancel::CancelFlag;
use crate::utils::config::ProcessConsts;

/// Exit status and captured output of a finished child.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the child was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// "exit code 3" or "signal".
    pub fn describe_status(&self) -> String {
        match self.code {
            Some(c) => format!("exit code {c}"),
            None => "signal".to_string(),
        }
    }
}

pub trait ProcessExecutor: Send + Sync {
    /// Run `program` with `args` to completion. When `timeout` elapses the child is killed and
    /// [`ProcessError::TimedOut`] is returned. A non-zero exit is not an error at this layer.
    fn execute(
        &self,
        program: &str,
        args: &[OsString],
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, ProcessError>;
}

/// Spawns real child processes, each in its own process group, polled until exit, timeout or
/// cancellation.
#[derive(Clone, Debug, Default)]
pub struct SystemExecutor {
    cancel: CancelFlag,
}

impl SystemExecutor {
    pub fn new(cancel: CancelFlag) -> Self {
        Self { cancel }
    }
}

enum Stream {
    Stdout,
    Stderr,
}

impl ProcessExecutor for SystemExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[OsString],
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, ProcessError> {
        debug!("exec: {} {:?}", program, args);
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        })?;

        // Readers report through a channel so a wedged pipe can't block us past the grace period.
        let (out_tx, out_rx) = bounded::<(Stream, String)>(2);
        let mut readers = 0;
        if let Some(pipe) = child.stdout.take() {
            spawn_reader(pipe, Stream::Stdout, out_tx.clone());
            readers += 1;
        }
        if let Some(pipe) = child.stderr.take() {
            spawn_reader(pipe, Stream::Stderr, out_tx.clone());
            readers += 1;
        }
        drop(out_tx);
        let pgid = child.id();

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(source) => {
                    kill_process_tree(&mut child);
                    return Err(ProcessError::Wait {
                        program: program.to_string(),
                        source,
                    });
                }
            }
            if self.cancel.is_cancelled() {
                kill_process_tree(&mut child);
                return Err(ProcessError::Cancelled {
                    program: program.to_string(),
                });
            }
            if let Some(limit) = timeout
                && started.elapsed() >= limit
            {
                kill_process_tree(&mut child);
                return Err(ProcessError::TimedOut {
                    program: program.to_string(),
                    after: limit,
                });
            }
            thread::sleep(ProcessConsts::POLL_INTERVAL);
        };

        let mut output = ProcessOutput {
            code: status.code(),
            ..Default::default()
        };
        let pending = collect_output(&out_rx, readers, &mut output);
        if pending > 0 {
            // Something the child left behind still holds its pipes.
            warn!(
                "`{}` exited but its output pipes stayed open; killing its process group",
                program
            );
            kill_group(pgid);
            collect_output(&out_rx, pending, &mut output);
        }
        debug!(
            "exec: {} finished with {} in {:?}",
            program,
            output.describe_status(),
            started.elapsed()
        );
        Ok(output)
    }
}

/// Read `pipe` to EOF on its own thread, keeping only the last
/// [`ProcessConsts::CAPTURE_TAIL_BYTES`].
fn spawn_reader(pipe: impl Read + Send + 'static, stream: Stream, tx: Sender<(Stream, String)>) {
    thread::spawn(move || {
        let text = read_tail(pipe, ProcessConsts::CAPTURE_TAIL_BYTES);
        let _ = tx.send((stream, text));
    });
}

fn read_tail(mut pipe: impl Read, max_bytes: usize) -> String {
    let mut kept: VecDeque<u8> = VecDeque::new();
    let mut buf = [0u8; 8 * 1024];
    loop {
        match pipe.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                kept.extend(&buf[..n]);
                let excess = kept.len().saturating_sub(max_bytes);
                kept.drain(..excess);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(kept.make_contiguous()).into_owned()
}

/// Receive up to `expected` reader results, waiting at most the grace period for each.
/// Returns how many readers have not reported.
fn collect_output(
    rx: &Receiver<(Stream, String)>,
    expected: usize,
    output: &mut ProcessOutput,
) -> usize {
    let mut pending = expected;
    while pending > 0 {
        match rx.recv_timeout(ProcessConsts::READER_GRACE) {
            Ok((Stream::Stdout, text)) => output.stdout = text,
            Ok((Stream::Stderr, text)) => output.stderr = text,
            Err(RecvTimeoutError::Timeout) => break,
            Err(RecvTimeoutError::Disconnected) => return 0,
        }
        pending -= 1;
    }
    pending
}

/// SIGKILL every process in group `pgid`.
fn kill_group(pgid: u32) {
    #[cfg(unix)]
    {
        if let Ok(pid) = libc::pid_t::try_from(pgid) {
            unsafe {
                libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;
}

/// Kill the child's whole process group (wrappers like `sh -c` fork), then reap it.
fn kill_process_tree(child: &mut Child) {
    kill_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}
