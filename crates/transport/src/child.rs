//! Child process transport
//!
//! Owns one capture child and its bidirectional byte stream. Four tasks run
//! per child: the stdout pump (decode loop), the stdin writer, the stderr
//! drain, and the reaper enforcing the soft-kill grace period.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use aircap_protocol::{decode_frame, DecodedFrame, ProtocolError};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::binary::resolve_binary;
use crate::error::TransportError;
use crate::Result;

/// Initial capacity of the stdout accumulation buffer (32KB)
pub const READ_BUFFER_SIZE: usize = 32 * 1024;

/// Depth of the outgoing frame queue
pub const WRITE_QUEUE_DEPTH: usize = 64;

/// Depth of the upstream event channel
const EVENT_QUEUE_DEPTH: usize = 256;

/// Default grace period between stdin close and force-kill
pub(crate) const DEFAULT_KILL_GRACE: Duration = Duration::from_millis(500);

/// Events delivered upstream from a child transport, in arrival order
#[derive(Debug)]
pub enum TransportEvent {
    /// A complete, checksum-valid frame
    Frame(DecodedFrame),

    /// The byte stream is poisoned; the transport is shutting down
    ProtocolError(ProtocolError),

    /// The child exited or the stream ended; always the final event
    Closed,
}

/// A live capture child with its framed stdio streams
///
/// Dropping the transport soft-kills the child. All teardown paths are
/// idempotent.
#[derive(Debug)]
pub struct ChildTransport {
    pid: u32,
    write_tx: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
}

impl ChildTransport {
    /// Spawn a capture child and start its pump tasks
    ///
    /// `binary` is resolved against `bin_paths`; launches outside the allow
    /// list are refused. Returns the transport and the upstream event
    /// channel.
    pub fn spawn(
        binary: &str,
        args: &[String],
        bin_paths: &[PathBuf],
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        Self::spawn_with_grace(binary, args, bin_paths, DEFAULT_KILL_GRACE)
    }

    /// Spawn with an explicit soft-kill grace period
    pub fn spawn_with_grace(
        binary: &str,
        args: &[String],
        bin_paths: &[PathBuf],
        grace: Duration,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let path = resolve_binary(binary, bin_paths)?;

        let mut child = Command::new(&path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TransportError::LaunchFailed {
                binary: path.display().to_string(),
                source: e,
            })?;

        let pid = child.id().unwrap_or(0);

        // The stdio handles are always piped, so take() cannot fail here
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stdin, stdout) = match (stdin, stdout) {
            (Some(i), Some(o)) => (i, o),
            _ => {
                let _ = child.start_kill();
                return Err(TransportError::LaunchFailed {
                    binary: path.display().to_string(),
                    source: std::io::Error::other("failed to capture child stdio"),
                });
            }
        };

        tracing::debug!(
            binary = %path.display(),
            pid,
            "launched capture child"
        );

        let cancel = CancellationToken::new();
        let (write_tx, write_rx) = mpsc::channel(WRITE_QUEUE_DEPTH);
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);

        tokio::spawn(read_pump(stdout, event_tx, cancel.clone()));
        tokio::spawn(write_pump(stdin, write_rx, cancel.clone()));
        if let Some(stderr) = stderr {
            tokio::spawn(stderr_drain(stderr, pid));
        }
        tokio::spawn(reaper(child, pid, grace, cancel.clone()));

        Ok((
            Self {
                pid,
                write_tx,
                cancel,
            },
            event_rx,
        ))
    }

    /// PID of the child process
    #[inline]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Enqueue one encoded frame for the child
    ///
    /// All-or-nothing: either the whole frame is accepted or nothing is.
    pub fn write(&self, frame: Bytes) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(TransportError::Closed);
        }
        self.write_tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::WriteQueueFull,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    /// Whether the transport has been shut down
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Begin graceful termination: close stdin, wait the grace period, then
    /// force-kill. Idempotent.
    pub fn soft_kill(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(pid = self.pid, "soft-killing capture child");
            self.cancel.cancel();
        }
    }

    /// Tear the transport down. Idempotent; equivalent to a soft kill, the
    /// pump tasks release their handles as they exit.
    pub fn close(&self) {
        self.soft_kill();
    }
}

impl Drop for ChildTransport {
    fn drop(&mut self) {
        self.soft_kill();
    }
}

/// Decode frames out of the child's stdout until EOF or a fatal error
///
/// Bytes buffered at the moment the stream ends are still decoded
/// frame-by-frame before `Closed` is emitted.
async fn read_pump(
    mut stdout: ChildStdout,
    event_tx: mpsc::Sender<TransportEvent>,
    cancel: CancellationToken,
) {
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);

    loop {
        // Drain every complete frame currently buffered
        loop {
            match decode_frame(&mut buf) {
                Ok(Some(frame)) => {
                    if event_tx.send(TransportEvent::Frame(frame)).await.is_err() {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "framing error on capture stream");
                    let _ = event_tx.send(TransportEvent::ProtocolError(e)).await;
                    cancel.cancel();
                    return;
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = event_tx.send(TransportEvent::Closed).await;
                return;
            }
            result = stdout.read_buf(&mut buf) => match result {
                Ok(0) => {
                    // EOF: decode whatever is left, then report closure
                    drain_remaining(&mut buf, &event_tx).await;
                    let _ = event_tx.send(TransportEvent::Closed).await;
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "capture stream read error");
                    let _ = event_tx.send(TransportEvent::Closed).await;
                    return;
                }
            }
        }
    }
}

/// Decode the final buffered frames after EOF
async fn drain_remaining(buf: &mut BytesMut, event_tx: &mpsc::Sender<TransportEvent>) {
    loop {
        match decode_frame(buf) {
            Ok(Some(frame)) => {
                if event_tx.send(TransportEvent::Frame(frame)).await.is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                let _ = event_tx.send(TransportEvent::ProtocolError(e)).await;
                return;
            }
        }
    }
}

/// Write whole frames to the child's stdin; exits on cancellation
///
/// Dropping stdin on exit is what signals the child to terminate.
async fn write_pump(
    mut stdin: ChildStdin,
    mut write_rx: mpsc::Receiver<Bytes>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = write_rx.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = stdin.write_all(&frame).await {
                        tracing::debug!(error = %e, "capture stdin write failed");
                        break;
                    }
                    if stdin.flush().await.is_err() {
                        break;
                    }
                }
                None => break,
            }
        }
    }
    // stdin drops here, closing the pipe
}

/// Forward child stderr lines into logging
async fn stderr_drain(stderr: ChildStderr, pid: u32) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.is_empty() {
            tracing::debug!(pid, stderr = %line, "capture child stderr");
        }
    }
}

/// Reap the child; on cancellation enforce the grace period then force-kill
async fn reaper(mut child: Child, pid: u32, grace: Duration, cancel: CancellationToken) {
    let cancelled = tokio::select! {
        status = child.wait() => {
            tracing::debug!(pid, ?status, "capture child exited");
            false
        }
        _ = cancel.cancelled() => true,
    };

    if !cancelled {
        return;
    }

    // Stdin is closing via the write pump; give the child a moment to obey
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => {
            tracing::debug!(pid, ?status, "capture child exited within grace period");
        }
        Err(_) => {
            tracing::debug!(pid, "grace period expired, killing capture child");
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}
