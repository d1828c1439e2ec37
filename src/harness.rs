//! Test harnesses
//!
//! A harness builds and runs the test suite inside the transient workspace and
//! reports whether it passed along with everything it printed.

use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::HarnessConfig;

/// libtest's summary line when at least one test failed
pub const DEFAULT_FAILURE_MARKER: &str = "test result: FAILED";

/// File name of the test binary `RustcHarness` builds in the workspace
pub const HARNESS_BINARY: &str = "mutest-harness";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long to keep reading output once the child has been killed
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Exit status and captured output of one harness run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessOutput {
    pub success: bool,
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Combined stdout and stderr
    pub output: String,
}

impl HarnessOutput {
    fn from_parts(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
            output: combine(stdout, stderr),
        }
    }
}

/// Runs the test suite in a workspace directory
///
/// `Err` means the harness itself could not run (e.g. the program is
/// missing), not that tests failed.
pub trait TestHarness {
    fn name(&self) -> &str;

    fn run(&self, workspace: &Path) -> io::Result<HarnessOutput>;
}

/// Build a harness from configuration
///
/// `entry` is the test file handed to `rustc --test`.
pub fn from_config(
    config: &HarnessConfig,
    entry: &OsStr,
    timeout: Option<Duration>,
) -> Box<dyn TestHarness> {
    match config {
        HarnessConfig::Rustc { edition } => Box::new(RustcHarness {
            rustc: std::env::var_os("RUSTC").unwrap_or_else(|| OsString::from("rustc")),
            edition: edition.clone(),
            test_file: entry.to_os_string(),
            timeout,
        }),
        HarnessConfig::Command { program, args } => Box::new(CommandHarness {
            program: program.clone(),
            args: args.clone(),
            timeout,
        }),
    }
}

/// Compiles the test file with `rustc --test` and runs the resulting binary
#[derive(Debug, Clone)]
pub struct RustcHarness {
    pub rustc: OsString,
    pub edition: String,
    pub test_file: OsString,
    /// Applies to the compile and the test run separately
    pub timeout: Option<Duration>,
}

impl TestHarness for RustcHarness {
    fn name(&self) -> &str {
        "rustc"
    }

    fn run(&self, workspace: &Path) -> io::Result<HarnessOutput> {
        let binary = workspace.join(format!("{}{}", HARNESS_BINARY, std::env::consts::EXE_SUFFIX));

        let mut compile = Command::new(&self.rustc);
        compile
            .arg("--edition")
            .arg(&self.edition)
            .arg("--test")
            .arg(&self.test_file)
            .arg("-o")
            .arg(&binary)
            .current_dir(workspace);

        debug!(test_file = ?self.test_file, "compiling test harness");
        let built = run_command(compile, self.timeout)?;
        if !built.success {
            return Ok(built);
        }

        let mut test = Command::new(&binary);
        test.current_dir(workspace);
        let mut ran = run_command(test, self.timeout)?;
        ran.output = format!("{}\n{}", built.output, ran.output);
        Ok(ran)
    }
}

/// Runs an arbitrary command with the workspace as working directory
#[derive(Debug, Clone)]
pub struct CommandHarness {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl TestHarness for CommandHarness {
    fn name(&self) -> &str {
        &self.program
    }

    fn run(&self, workspace: &Path) -> io::Result<HarnessOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(workspace);
        run_command(cmd, self.timeout)
    }
}

/// Run to completion, or kill the child once `timeout` has passed
fn run_command(mut cmd: Command, timeout: Option<Duration>) -> io::Result<HarnessOutput> {
    cmd.stdin(Stdio::null());

    let Some(timeout) = timeout else {
        let output = cmd.output()?;
        return Ok(HarnessOutput::from_parts(
            output.status,
            &output.stdout,
            &output.stderr,
        ));
    };

    let mut child = cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).spawn()?;
    let stdout = Drain::spawn(child.stdout.take());
    let stderr = Drain::spawn(child.stderr.take());

    let start = Instant::now();
    let deadline = start + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) if start.elapsed() > timeout => {
                reap(&mut child);
                break None;
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                reap(&mut child);
                return Err(e);
            }
        }
    };

    // Grandchildren can keep the pipes open after the child is gone
    let drain_until = match status {
        Some(_) => deadline.max(Instant::now() + DRAIN_GRACE),
        None => Instant::now() + DRAIN_GRACE,
    };
    let stdout = Drain::collect(stdout, drain_until);
    let stderr = Drain::collect(stderr, drain_until);

    Ok(match status {
        Some(status) => HarnessOutput::from_parts(status, &stdout, &stderr),
        None => HarnessOutput {
            success: false,
            code: None,
            output: format!(
                "{}\nmutest: harness timed out after {}s",
                combine(&stdout, &stderr),
                timeout.as_secs_f64()
            ),
        },
    })
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Reads a pipe on its own thread into a buffer that can be taken at any time
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<()>,
}

impl Drain {
    fn spawn<R>(pipe: Option<R>) -> Option<Self>
    where
        R: Read + Send + 'static,
    {
        let mut pipe = pipe?;
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let handle = thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
        });
        Some(Self { buf, handle })
    }

    /// Whatever was read by `until`; a reader still blocked then is abandoned
    fn collect(drain: Option<Self>, until: Instant) -> Vec<u8> {
        let Some(drain) = drain else {
            return Vec::new();
        };
        while !drain.handle.is_finished() && Instant::now() < until {
            thread::sleep(POLL_INTERVAL);
        }
        let taken = match drain.buf.lock() {
            Ok(mut buf) => std::mem::take(&mut *buf),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        taken
    }
}

fn combine(stdout: &[u8], stderr: &[u8]) -> String {
    format!(
        "{}\n{}",
        String::from_utf8_lossy(stdout),
        String::from_utf8_lossy(stderr)
    )
}
