//! Drives one stress run: isolated stack, load generator, output relay.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use async_stream::stream;
use futures_util::Stream;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::stress::{IsolatedStack, StressTestError};
use crate::config::{Config, StressTestConfig};

/// Environment variable carrying the isolated server's base URL to the load
/// generator.
pub const TARGET_URL_ENV: &str = "STRESS_TARGET_URL";

/// Progress of a stress run.
#[derive(Debug)]
pub enum StressEvent {
    /// One line of load generator stdout or stderr.
    Output(String),
    /// The load generator exited successfully. Always the last event.
    Done,
    /// The run was aborted. Always the last event.
    Failed(StressTestError),
}

/// Starts a stress run and returns its events.
///
/// Nothing happens until the stream is first polled. The run ends at the
/// first of: the load generator exiting, the isolated server stopping, or
/// the stream being dropped. In every case the load generator's whole process
/// group is killed and the isolated stack is torn down.
pub fn run_stress_test(config: Arc<Config>) -> impl Stream<Item = StressEvent> {
    stream! {
        let stack = match IsolatedStack::start(&config).await {
            Ok(stack) => stack,
            Err(e) => {
                error!(error = %e, "Stress test aborted");
                yield StressEvent::Failed(e);
                return;
            }
        };

        for await event in relay(stack, config.stress_test.clone()) {
            yield event;
        }
    }
}

/// Runs the load generator against an already started stack.
fn relay(mut stack: IsolatedStack, config: StressTestConfig) -> impl Stream<Item = StressEvent> {
    stream! {
        let mut generator = match LoadGenerator::spawn(&config, &stack.base_url()) {
            Ok(generator) => generator,
            Err(e) => {
                error!(error = %e, "Stress test aborted");
                yield StressEvent::Failed(e);
                return;
            }
        };

        info!(target_url = %stack.base_url(), "Stress test started");

        loop {
            let step = tokio::select! {
                biased;
                _ = stack.stopped() => Step::ServerStopped,
                line = generator.next_line() => match line {
                    Some(Ok(line)) => Step::Line(line),
                    Some(Err(e)) => Step::ReadFailed(e),
                    None => Step::OutputClosed,
                },
            };

            match step {
                Step::Line(line) => yield StressEvent::Output(line),
                Step::OutputClosed => break,
                Step::ServerStopped => {
                    generator.kill();
                    error!("Isolated test server stopped during stress test");
                    yield StressEvent::Failed(StressTestError::UnexpectedServerStop);
                    return;
                }
                Step::ReadFailed(e) => {
                    generator.kill();
                    error!(error = %e, "Failed to read load generator output");
                    yield StressEvent::Failed(StressTestError::Output(e));
                    return;
                }
            }
        }

        let outcome = tokio::select! {
            biased;
            _ = stack.stopped() => Err(StressTestError::UnexpectedServerStop),
            status = generator.wait() => match status {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(StressTestError::SubprocessFailed(status)),
                Err(e) => Err(StressTestError::Spawn(e)),
            },
        };
        // Background jobs of a finished generator must not outlive the run.
        generator.kill_group();

        match outcome {
            Ok(()) => {
                info!("Stress test completed successfully");
                yield StressEvent::Done;
            }
            Err(e) => {
                generator.kill();
                error!(error = %e, "Stress test failed");
                yield StressEvent::Failed(e);
            }
        }
    }
}

enum Step {
    Line(String),
    OutputClosed,
    ServerStopped,
    ReadFailed(io::Error),
}

/// Supervised load generator process.
///
/// stdout and stderr are merged line by line into one channel. On Unix the
/// process leads its own process group, and the whole group is killed when
/// this guard is dropped.
struct LoadGenerator {
    child: Child,
    pgid: Option<u32>,
    lines: mpsc::Receiver<io::Result<String>>,
    readers: Vec<JoinHandle<()>>,
}

impl LoadGenerator {
    fn spawn(config: &StressTestConfig, target_url: &str) -> Result<Self, StressTestError> {
        let mut command = Command::new(&config.command);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .args(&config.args)
            .env(TARGET_URL_ENV, target_url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(StressTestError::Spawn)?;

        let (tx, lines) = mpsc::channel(64);
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(forward_lines(stderr, tx));
        }

        let pgid = child.id();
        debug!(
            command = %config.command,
            pid = pgid.unwrap_or_default(),
            "Load generator spawned"
        );

        Ok(Self {
            child,
            pgid,
            lines,
            readers,
        })
    }

    /// Next output line, or `None` once both streams are closed.
    async fn next_line(&mut self) -> Option<io::Result<String>> {
        self.lines.recv().await
    }

    async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }

    fn kill(&mut self) {
        self.kill_group();
        if let Err(e) = self.child.start_kill() {
            // Already reaped.
            debug!(error = %e, "Load generator not killed");
        }
    }

    /// Sends SIGKILL to every process in the generator's group.
    #[cfg(unix)]
    fn kill_group(&self) {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        let Some(pgid) = self.pgid.and_then(|pid| i32::try_from(pid).ok()) else {
            return;
        };

        match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            Ok(()) => debug!(pgid, "Load generator process group killed"),
            // Every member has already exited.
            Err(Errno::ESRCH) => {}
            Err(e) => warn!(pgid, error = %e, "Failed to kill load generator process group"),
        }
    }

    #[cfg(not(unix))]
    fn kill_group(&self) {}
}

impl Drop for LoadGenerator {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            warn!("Stress test interrupted, killing load generator");
            self.kill();
        } else {
            self.kill_group();
        }
        for reader in &self.readers {
            reader.abort();
        }
    }
}

fn forward_lines<R>(reader: R, tx: mpsc::Sender<io::Result<String>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            let item = match lines.next_line().await {
                Ok(Some(line)) => Ok(line),
                Ok(None) => break,
                Err(e) => Err(e),
            };
            let failed = item.is_err();
            if tx.send(item).await.is_err() || failed {
                break;
            }
        }
    })
}
