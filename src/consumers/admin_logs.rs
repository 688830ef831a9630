//! Staff-only live view of the service's log files.
//!
//! Each stream owns a `tail -F` child process inside a background task.
//! Lines are forwarded as `log_line` frames; read failures and unexpected
//! child exits are retried with a linear backoff until too many happen in a
//! row, at which point the stream stops by itself.

use crate::common::error::{AppError, ServiceResult};
use crate::consumers::{Consumer, require_session};
use crate::entities::sessions::Session;
use crate::events::ping;
use crate::models::frames::{InboundFrame, OutboundFrame};
use crate::repositories::groups::GroupName;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

const BACKLOG_LINES: usize = 100;
const READ_TIMEOUT: Duration = Duration::from_secs(5);
const RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_CONSECUTIVE_FAILURES: u32 = 5;
const STOP_TIMEOUT: Duration = Duration::from_secs(3);
const LINE_BUFFER: usize = 256;
const TAIL_PROGRAM: &str = "tail";

/// Named log files staff may stream.
#[derive(Debug, Default)]
pub struct LogSources {
    sources: Vec<(String, PathBuf)>,
}

impl LogSources {
    pub fn new(sources: Vec<(String, PathBuf)>) -> Self {
        Self { sources }
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn path(&self, name: &str) -> Option<&Path> {
        self.sources
            .iter()
            .find(|(source, _)| source == name)
            .map(|(_, path)| path.as_path())
    }
}

pub struct AdminLogsConsumer {
    session: Session,
    sources: Arc<LogSources>,
    tail: Option<LogTail>,
}

impl AdminLogsConsumer {
    pub fn authorize(session: Option<Session>, sources: Arc<LogSources>) -> ServiceResult<Self> {
        let session = require_session(session)?;
        if !session.is_staff {
            return Err(AppError::AdminForbidden);
        }
        Ok(Self {
            session,
            sources,
            tail: None,
        })
    }

    async fn stop_tail(&mut self) -> Option<String> {
        let tail = self.tail.take()?;
        let source = tail.source.clone();
        tail.stop().await;
        Some(source)
    }
}

#[async_trait]
impl Consumer for AdminLogsConsumer {
    fn name(&self) -> &'static str {
        "admin_logs"
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn group(&self) -> Option<GroupName> {
        None
    }

    fn greeting(&self) -> Vec<OutboundFrame> {
        vec![OutboundFrame::LogSources {
            sources: self.sources.names(),
        }]
    }

    async fn on_frame(&mut self, frame: InboundFrame) -> ServiceResult<Option<OutboundFrame>> {
        match frame {
            InboundFrame::StartStream { source } => {
                let Some(path) = self.sources.path(&source).map(Path::to_path_buf) else {
                    return Err(AppError::AdminLogSourceNotFound);
                };
                self.stop_tail().await;
                info!(user_id = self.session.user_id, source, "Starting log stream");
                self.tail = Some(LogTail::start(source.clone(), path, BACKLOG_LINES));
                Ok(Some(OutboundFrame::LogStreamStarted { source }))
            }
            InboundFrame::StopStream => match self.stop_tail().await {
                Some(source) => Ok(Some(OutboundFrame::LogStreamStopped {
                    source,
                    reason: "stopped".to_owned(),
                })),
                None => Ok(None),
            },
            InboundFrame::Ping => ping::handle(),
            _ => Err(AppError::FramesUnknownType),
        }
    }

    async fn next_output(&mut self) -> Option<OutboundFrame> {
        let Some(tail) = self.tail.as_mut() else {
            return futures::future::pending().await;
        };
        match tail.frames.recv().await {
            Some(frame) => Some(frame),
            None => {
                // the tail gave up and already reported why
                self.tail = None;
                None
            }
        }
    }

    async fn on_close(&mut self) {
        self.stop_tail().await;
    }
}

/// Handle on a running tail task.
pub struct LogTail {
    source: String,
    frames: mpsc::Receiver<OutboundFrame>,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl LogTail {
    pub fn start(source: String, path: PathBuf, backlog: usize) -> Self {
        Self::start_with(TAIL_PROGRAM, source, path, backlog)
    }

    fn start_with(program: &'static str, source: String, path: PathBuf, backlog: usize) -> Self {
        let (frame_tx, frames) = mpsc::channel(LINE_BUFFER);
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(tail_loop(
            program,
            source.clone(),
            path,
            backlog,
            frame_tx,
            stop_rx,
        ));
        Self {
            source,
            frames,
            stop,
            task,
        }
    }

    pub async fn recv(&mut self) -> Option<OutboundFrame> {
        self.frames.recv().await
    }

    /// Signals the task and waits a bounded time for it to reap its child.
    /// Past the deadline the task is aborted, which kills the child on drop.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        let mut task = self.task;
        if tokio::time::timeout(STOP_TIMEOUT, &mut task).await.is_err() {
            warn!(source = self.source, "Log tail did not stop in time, aborting");
            task.abort();
        }
    }
}

enum TailOutcome {
    Stopped,
    Failed(String),
}

async fn tail_loop(
    program: &'static str,
    source: String,
    path: PathBuf,
    backlog: usize,
    frames: mpsc::Sender<OutboundFrame>,
    mut stop: oneshot::Receiver<()>,
) {
    let mut failures = 0;
    let reason = loop {
        let outcome = match spawn_tail(program, &path, backlog) {
            Ok(child) => follow(&source, child, &frames, &mut stop, &mut failures).await,
            Err(e) => TailOutcome::Failed(format!("failed to start tail: {e}")),
        };
        let TailOutcome::Failed(reason) = outcome else {
            return;
        };

        failures += 1;
        warn!(source, failures, "Log tail failed: {reason}");
        if failures >= MAX_CONSECUTIVE_FAILURES {
            break reason;
        }
        tokio::select! {
            _ = &mut stop => return,
            _ = tokio::time::sleep(RETRY_DELAY * failures) => {}
        }
    };

    let _ = frames
        .send(OutboundFrame::LogStreamStopped { source, reason })
        .await;
}

fn spawn_tail(program: &str, path: &Path, backlog: usize) -> std::io::Result<Child> {
    Command::new(program)
        .arg("-n")
        .arg(backlog.to_string())
        .arg("-F")
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
}

/// Forwards lines of one child until it fails or the stream is stopped.
/// Any line read resets the failure count.
async fn follow(
    source: &str,
    mut child: Child,
    frames: &mpsc::Sender<OutboundFrame>,
    stop: &mut oneshot::Receiver<()>,
    failures: &mut u32,
) -> TailOutcome {
    let Some(stdout) = child.stdout.take() else {
        return TailOutcome::Failed("tail has no stdout".to_owned());
    };
    let mut lines = BufReader::new(stdout).lines();
    let outcome = loop {
        tokio::select! {
            _ = &mut *stop => break TailOutcome::Stopped,
            read = tokio::time::timeout(READ_TIMEOUT, lines.next_line()) => match read {
                // nothing new within the timeout
                Err(_) => continue,
                Ok(Ok(Some(line))) => {
                    *failures = 0;
                    let frame = OutboundFrame::LogLine {
                        source: source.to_owned(),
                        line,
                    };
                    if frames.send(frame).await.is_err() {
                        break TailOutcome::Stopped;
                    }
                }
                Ok(Ok(None)) => break TailOutcome::Failed("tail exited".to_owned()),
                Ok(Err(e)) => break TailOutcome::Failed(format!("read error: {e}")),
            },
        }
    };

    let _ = child.start_kill();
    if tokio::time::timeout(STOP_TIMEOUT, child.wait()).await.is_err() {
        warn!(source, "Log tail child did not exit in time");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn staff_session(is_staff: bool) -> Session {
        let now = chrono::Utc::now();
        Session {
            session_id: uuid::Uuid::new_v4(),
            user_id: 1,
            username: "admin".to_owned(),
            is_staff,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn only_staff_may_stream_logs() {
        let sources = Arc::new(LogSources::default());
        assert!(AdminLogsConsumer::authorize(Some(staff_session(true)), sources.clone()).is_ok());
        assert_eq!(
            AdminLogsConsumer::authorize(Some(staff_session(false)), sources.clone()).err(),
            Some(AppError::AdminForbidden)
        );
        assert_eq!(
            AdminLogsConsumer::authorize(None, sources).err(),
            Some(AppError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn tail_streams_backlog_and_stops() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first line").unwrap();
        writeln!(file, "second line").unwrap();
        file.flush().unwrap();

        let mut tail = LogTail::start("app".to_owned(), file.path().to_path_buf(), 10);
        for expected in ["first line", "second line"] {
            let frame = tokio::time::timeout(Duration::from_secs(10), tail.recv())
                .await
                .expect("line within timeout");
            assert_eq!(
                frame,
                Some(OutboundFrame::LogLine {
                    source: "app".to_owned(),
                    line: expected.to_owned(),
                })
            );
        }
        tokio::time::timeout(Duration::from_secs(10), tail.stop())
            .await
            .expect("tail stops in bounded time");
    }

    #[tokio::test(start_paused = true)]
    async fn tail_gives_up_after_repeated_failures() {
        let started = tokio::time::Instant::now();
        let mut tail = LogTail::start_with(
            "/nonexistent/bin/tail",
            "app".to_owned(),
            PathBuf::from("/var/log/app.log"),
            10,
        );

        match tail.recv().await {
            Some(OutboundFrame::LogStreamStopped { source, reason }) => {
                assert_eq!(source, "app");
                assert!(reason.starts_with("failed to start tail"), "{reason}");
            }
            other => panic!("unexpected frame {other:?}"),
        }
        // waits 1s, 2s, 3s and 4s between the five attempts
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(10), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(11), "{elapsed:?}");
        assert_eq!(tail.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_a_failing_tail_cancels_the_retry() {
        let tail = LogTail::start_with(
            "/nonexistent/bin/tail",
            "app".to_owned(),
            PathBuf::from("/var/log/app.log"),
            10,
        );
        tokio::time::sleep(Duration::from_millis(1500)).await;
        tokio::time::timeout(STOP_TIMEOUT, tail.stop())
            .await
            .expect("stop interrupts the backoff");
    }

    #[tokio::test]
    async fn unknown_source_is_rejected() {
        let sources = Arc::new(LogSources::new(vec![(
            "app".to_owned(),
            PathBuf::from("/var/log/app.log"),
        )]));
        let mut consumer = AdminLogsConsumer::authorize(Some(staff_session(true)), sources).unwrap();
        let result = consumer
            .on_frame(InboundFrame::StartStream {
                source: "secrets".to_owned(),
            })
            .await;
        assert_eq!(result, Err(AppError::AdminLogSourceNotFound));
        assert_eq!(consumer.on_frame(InboundFrame::StopStream).await, Ok(None));
    }
}
