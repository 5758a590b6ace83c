//! Data source instances
//!
//! A [`DataSource`] is one live capture source: its identity, lifecycle
//! state machine, completion callbacks, pending command queue, and the
//! transport of its capture child. Sources are always handled as
//! `Arc<DataSource>`; the supervisor is the sole long-term owner, while
//! callbacks and pump tasks hold weak handles.
//!
//! # Callback discipline
//!
//! Probe and open completions are `FnOnce` and delivered exactly once per
//! installation: installing a replacement fails the displaced predecessor
//! first, and every teardown path drains outstanding callbacks with a
//! failure. The source lock is never held across a callback invocation;
//! handlers snapshot and take the callback under the lock, release it, then
//! invoke.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use aircap_pipeline::{CapturePacket, PacketChain};
use aircap_protocol::{
    decode_channels, decode_gps, decode_message, decode_packet, decode_signal, decode_success,
    encode_chanhop, encode_frame, DecodedFrame, ProtocolError, FRAME_CONFIGURE, FRAME_DATA,
    FRAME_ERROR, FRAME_MESSAGE, FRAME_OPENDEVICE, FRAME_OPENRESP, FRAME_PROBERESP, FRAME_STATUS,
    MSG_ERROR, MSG_FATAL,
};
use aircap_transport::{ChildTransport, TransportEvent, TransportError};
use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::definition::SourceDefinition;
use crate::error::SourceError;

/// Completion callback for probe and open operations
pub type CompletionCallback = Box<dyn FnOnce(&Arc<DataSource>, bool) + Send>;

/// Callback fired when a source fails at runtime
pub type ErrorCallback = Box<dyn FnOnce(&Arc<DataSource>) + Send>;

/// Lifecycle states of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Registered but never started
    Idle,
    /// A probe is outstanding on this prototype
    Probing,
    /// The prototype answered its probe positively
    ProbedOk,
    /// An open command is outstanding
    Opening,
    /// The child is delivering packets
    Running,
    /// The source failed and awaits retry
    Failed,
    /// The source was removed; terminal
    Terminated,
}

impl Lifecycle {
    /// Stable string form for logs and the HTTP surface
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Probing => "probing",
            Self::ProbedOk => "probed",
            Self::Opening => "opening",
            Self::Running => "running",
            Self::Failed => "failed",
            Self::Terminated => "terminated",
        }
    }
}

/// A command held until the child signals readiness
#[derive(Debug)]
pub(crate) struct QueuedCommand {
    pub command: String,
    pub frame: Bytes,
    #[allow(dead_code)]
    pub queued_at: Instant,
}

/// Counters updated from the I/O context without the source lock
#[derive(Debug, Default)]
struct SourceCounters {
    ipc_errors: AtomicU64,
    num_reports: AtomicU64,
    last_report_time: AtomicU64,
}

/// Mutable source state, guarded by the source lock (innermost tier)
struct SourceState {
    name: String,
    definition: Option<SourceDefinition>,
    lifecycle: Lifecycle,
    channel_capable: bool,
    channels: Vec<String>,
    hopping: bool,
    hop_rate: f64,
    hop_channels: Vec<String>,
    transport: Option<ChildTransport>,
    pid: Option<u32>,
    child_ready: bool,
    epoch: u64,
    pending: VecDeque<QueuedCommand>,
    probe_cb: Option<CompletionCallback>,
    open_cb: Option<CompletionCallback>,
    error_cb: Option<ErrorCallback>,
}

/// One capture source instance
pub struct DataSource {
    uuid: Uuid,
    driver_type: String,
    ipc_binary: String,
    bin_paths: Vec<PathBuf>,
    chain: Option<PacketChain>,
    counters: SourceCounters,
    state: Mutex<SourceState>,
}

/// Serializable point-in-time view of a source
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub uuid: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub definition: Option<String>,
    pub state: &'static str,
    pub running: bool,
    pub pid: Option<u32>,
    pub channel_capable: bool,
    pub channels: Vec<String>,
    pub hopping: bool,
    pub hop_rate: f64,
    pub hop_channels: Vec<String>,
    pub num_reports: u64,
    pub ipc_errors: u64,
    pub last_report_time: u64,
    pub failed: bool,
}

impl DataSource {
    /// Create a source instance
    ///
    /// A prototype passes `None` for the chain and can probe but never
    /// delivers packets; a full source is bound to the shared packet chain.
    pub fn new(
        driver_type: String,
        ipc_binary: String,
        chain: Option<PacketChain>,
        bin_paths: Vec<PathBuf>,
    ) -> Arc<Self> {
        Arc::new(Self {
            uuid: Uuid::new_v4(),
            driver_type,
            ipc_binary,
            bin_paths,
            chain,
            counters: SourceCounters::default(),
            state: Mutex::new(SourceState {
                name: String::new(),
                definition: None,
                lifecycle: Lifecycle::Idle,
                channel_capable: false,
                channels: Vec::new(),
                hopping: false,
                hop_rate: 0.0,
                hop_channels: Vec::new(),
                transport: None,
                pid: None,
                child_ready: false,
                epoch: 0,
                pending: VecDeque::new(),
                probe_cb: None,
                open_cb: None,
                error_cb: None,
            }),
        })
    }

    /// Stable identity of this source
    #[inline]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Resolved driver type tag
    #[inline]
    pub fn driver_type(&self) -> &str {
        &self.driver_type
    }

    /// Human name, taken from the definition
    pub fn name(&self) -> String {
        self.state.lock().name.clone()
    }

    /// The definition this source was opened with, if any
    pub fn definition(&self) -> Option<SourceDefinition> {
        self.state.lock().definition.clone()
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lock().lifecycle
    }

    /// Whether the source is delivering packets
    pub fn is_running(&self) -> bool {
        let st = self.state.lock();
        st.lifecycle == Lifecycle::Running && st.pid.is_some()
    }

    /// Child PID, if a child is attached
    pub fn pid(&self) -> Option<u32> {
        self.state.lock().pid
    }

    /// Channels the source reported as usable
    pub fn channels(&self) -> Vec<String> {
        self.state.lock().channels.clone()
    }

    /// IPC protocol error count
    #[inline]
    pub fn ipc_errors(&self) -> u64 {
        self.counters.ipc_errors.load(Ordering::Relaxed)
    }

    /// Number of packet reports received
    #[inline]
    pub fn num_reports(&self) -> u64 {
        self.counters.num_reports.load(Ordering::Relaxed)
    }

    /// Install the runtime error callback, replacing any prior one
    pub fn set_error_callback(&self, callback: ErrorCallback) {
        self.state.lock().error_cb = Some(callback);
    }

    /// Serializable snapshot of the source
    pub fn status(&self, failed: bool) -> SourceStatus {
        let st = self.state.lock();
        SourceStatus {
            uuid: self.uuid,
            name: st.name.clone(),
            source_type: self.driver_type.clone(),
            definition: st.definition.as_ref().map(|d| d.raw().to_string()),
            state: st.lifecycle.as_str(),
            running: st.lifecycle == Lifecycle::Running && st.pid.is_some(),
            pid: st.pid,
            channel_capable: st.channel_capable,
            channels: st.channels.clone(),
            hopping: st.hopping,
            hop_rate: st.hop_rate,
            hop_channels: st.hop_channels.clone(),
            num_reports: self.counters.num_reports.load(Ordering::Relaxed),
            ipc_errors: self.counters.ipc_errors.load(Ordering::Relaxed),
            last_report_time: self.counters.last_report_time.load(Ordering::Relaxed),
            failed,
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Start an auto-detection probe
    ///
    /// Installs `on_complete`, failing any displaced predecessor first, and
    /// spawns the capture child. The completion fires once: with the child's
    /// probe verdict, or with failure if the child cannot start or exits
    /// before answering.
    pub fn probe(self: &Arc<Self>, definition: &SourceDefinition, on_complete: CompletionCallback) {
        let (displaced, spawned) = {
            let mut st = self.state.lock();
            let displaced = st.probe_cb.take();
            st.probe_cb = Some(on_complete);
            st.definition = Some(definition.clone());
            if st.name.is_empty() {
                st.name = definition.name().to_string();
            }
            st.lifecycle = Lifecycle::Probing;
            let spawned = self.spawn_transport_locked(&mut st);
            (displaced, spawned)
        };

        if let Some(cb) = displaced {
            cb(self, false);
        }

        match spawned {
            Ok((events, epoch)) => {
                tokio::spawn(pump_events(Arc::downgrade(self), events, epoch));
            }
            Err(e) => {
                tracing::debug!(
                    source = %self.uuid,
                    source_type = %self.driver_type,
                    error = %e,
                    "probe child failed to launch"
                );
                self.spawn_failed();
            }
        }
    }

    /// Open the source for packet delivery
    ///
    /// Installs `on_complete` (failing a displaced predecessor), records the
    /// definition, spawns the capture child, and queues an OPENDEVICE
    /// command that is written once the child signals readiness.
    pub fn open(self: &Arc<Self>, definition: &SourceDefinition, on_complete: CompletionCallback) {
        let (displaced, spawned) = {
            let mut st = self.state.lock();
            let displaced = st.open_cb.take();
            st.open_cb = Some(on_complete);
            st.definition = Some(definition.clone());
            st.name = definition.name().to_string();
            st.lifecycle = Lifecycle::Opening;
            let spawned = self.spawn_transport_locked(&mut st);
            (displaced, spawned)
        };

        if let Some(cb) = displaced {
            cb(self, false);
        }

        match spawned {
            Ok((events, epoch)) => {
                tokio::spawn(pump_events(Arc::downgrade(self), events, epoch));

                match encode_frame(
                    FRAME_OPENDEVICE,
                    &[("DEFINITION", definition.raw().as_bytes())],
                ) {
                    Ok(frame) => self.queue_command(FRAME_OPENDEVICE, frame),
                    Err(e) => {
                        tracing::error!(source = %self.uuid, error = %e, "failed to encode open command");
                        self.spawn_failed();
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    source = %self.uuid,
                    source_type = %self.driver_type,
                    binary = %self.ipc_binary,
                    error = %e,
                    "failed to launch capture child"
                );
                self.spawn_failed();
            }
        }
    }

    /// Tune the child to a single channel
    ///
    /// # Errors
    ///
    /// [`SourceError::SourceClosed`] unless the source is running.
    pub fn set_channel(&self, channel: &str) -> Result<(), SourceError> {
        self.require_running()?;

        let frame = encode_frame(FRAME_CONFIGURE, &[("CHANSET", channel.as_bytes())])?;
        {
            let mut st = self.state.lock();
            st.hopping = false;
        }
        self.queue_command(FRAME_CONFIGURE, frame);
        Ok(())
    }

    /// Configure the child to hop across a channel sequence
    ///
    /// # Errors
    ///
    /// [`SourceError::SourceClosed`] unless the source is running.
    pub fn set_channel_hop(&self, channels: &[String], rate: f64) -> Result<(), SourceError> {
        self.require_running()?;

        let payload = encode_chanhop(rate, channels)?;
        let frame = encode_frame(FRAME_CONFIGURE, &[("CHANHOP", payload.as_slice())])?;
        {
            let mut st = self.state.lock();
            st.hopping = true;
            st.hop_rate = rate;
            st.hop_channels = channels.to_vec();
        }
        self.queue_command(FRAME_CONFIGURE, frame);
        Ok(())
    }

    /// Shut the source down
    ///
    /// Outstanding probe/open callbacks are failed, the child is
    /// soft-killed, and the source lands in `Failed` (retryable) or
    /// `Terminated` (removed) per `terminal`.
    pub fn close(self: &Arc<Self>, terminal: bool) {
        let (probe_cb, open_cb, transport) = {
            let mut st = self.state.lock();
            st.lifecycle = if terminal {
                Lifecycle::Terminated
            } else {
                Lifecycle::Failed
            };
            st.pid = None;
            st.child_ready = false;
            st.pending.clear();
            (st.probe_cb.take(), st.open_cb.take(), st.transport.take())
        };

        if let Some(transport) = transport {
            transport.soft_kill();
        }
        if let Some(cb) = probe_cb {
            cb(self, false);
        }
        if let Some(cb) = open_cb {
            cb(self, false);
        }
    }

    // =========================================================================
    // Command queue
    // =========================================================================

    /// Write a command now if the child is ready, otherwise queue it FIFO
    pub(crate) fn queue_command(&self, command: &str, frame: Bytes) {
        let mut st = self.state.lock();

        if st.child_ready {
            if let Some(transport) = st.transport.as_ref() {
                if transport.write(frame.clone()).is_ok() {
                    return;
                }
            }
        }

        st.pending.push_back(QueuedCommand {
            command: command.to_string(),
            frame,
            queued_at: Instant::now(),
        });
    }

    /// Names of the queued commands, oldest first
    pub(crate) fn pending_commands(&self) -> Vec<String> {
        self.state
            .lock()
            .pending
            .iter()
            .map(|c| c.command.clone())
            .collect()
    }

    /// Drain the queue in FIFO order; a failed write goes back to the head
    fn drain_pending(st: &mut SourceState) {
        while let Some(cmd) = st.pending.pop_front() {
            let Some(transport) = st.transport.as_ref() else {
                st.pending.push_front(cmd);
                return;
            };
            if let Err(e) = transport.write(cmd.frame.clone()) {
                tracing::debug!(command = %cmd.command, error = %e, "command write failed, requeued");
                st.pending.push_front(cmd);
                return;
            }
            tracing::trace!(command = %cmd.command, "queued command written");
        }
    }

    // =========================================================================
    // Transport plumbing
    // =========================================================================

    /// Spawn a fresh child while the source lock is held
    ///
    /// Any existing child is soft-killed first. The epoch counter fences off
    /// events still in flight from a replaced transport. This runs with the
    /// lock held and must not re-acquire it.
    fn spawn_transport_locked(
        &self,
        st: &mut SourceState,
    ) -> Result<(mpsc::Receiver<TransportEvent>, u64), TransportError> {
        if let Some(old) = st.transport.take() {
            tracing::debug!(source = %self.uuid, pid = ?st.pid, "replacing running capture child");
            old.soft_kill();
        }
        st.pid = None;
        st.child_ready = false;
        st.epoch += 1;

        let (transport, events) = ChildTransport::spawn(&self.ipc_binary, &[], &self.bin_paths)?;
        st.pid = Some(transport.pid());
        st.transport = Some(transport);
        Ok((events, st.epoch))
    }

    /// Fail everything after the child could not be started
    fn spawn_failed(self: &Arc<Self>) {
        let (probe_cb, open_cb, error_cb) = {
            let mut st = self.state.lock();
            st.lifecycle = Lifecycle::Failed;
            st.pid = None;
            st.child_ready = false;
            (st.probe_cb.take(), st.open_cb.take(), st.error_cb.take())
        };

        if let Some(cb) = probe_cb {
            cb(self, false);
        }
        if let Some(cb) = open_cb {
            cb(self, false);
        }
        if let Some(cb) = error_cb {
            cb(self);
        }
    }

    fn require_running(&self) -> Result<(), SourceError> {
        if self.state.lock().lifecycle != Lifecycle::Running {
            return Err(SourceError::SourceClosed);
        }
        Ok(())
    }

    /// Record an IPC protocol irregularity
    fn ipc_error(&self, error: &ProtocolError) {
        self.counters.ipc_errors.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            source = %self.uuid,
            source_type = %self.driver_type,
            error = %error,
            "capture ipc error"
        );
    }

    // =========================================================================
    // Event handling
    // =========================================================================

    /// Dispatch one transport event, ignoring events from replaced children
    pub(crate) fn handle_event(self: &Arc<Self>, event: TransportEvent, epoch: u64) {
        {
            let st = self.state.lock();
            if st.epoch != epoch {
                return;
            }
        }

        match event {
            TransportEvent::Frame(frame) => self.handle_frame(frame),
            TransportEvent::ProtocolError(error) => self.handle_protocol_error(error),
            TransportEvent::Closed => self.handle_transport_closed(),
        }
    }

    /// Dispatch a decoded frame by type
    pub(crate) fn handle_frame(self: &Arc<Self>, frame: DecodedFrame) {
        match frame.frame_type.to_ascii_lowercase().as_str() {
            FRAME_STATUS => self.handle_status(&frame),
            FRAME_PROBERESP => self.handle_proberesp(&frame),
            FRAME_OPENRESP => self.handle_openresp(&frame),
            FRAME_ERROR => self.handle_error_frame(&frame),
            FRAME_MESSAGE => self.log_message_kv(&frame),
            FRAME_DATA => self.handle_data(&frame),
            other => {
                self.ipc_error(&ProtocolError::schema(
                    "frame",
                    format!("unsolicited frame type '{other}'"),
                ));
            }
        }
    }

    /// First status frame marks the child ready and releases queued commands
    fn handle_status(self: &Arc<Self>, frame: &DecodedFrame) {
        self.log_message_kv(frame);

        let mut st = self.state.lock();
        if !st.child_ready {
            st.child_ready = true;
            tracing::debug!(source = %self.uuid, pending = st.pending.len(), "capture child ready");
        }
        Self::drain_pending(&mut st);
    }

    /// Probe verdict from the child; ends the prototype's life
    fn handle_proberesp(self: &Arc<Self>, frame: &DecodedFrame) {
        self.log_message_kv(frame);

        {
            let st = self.state.lock();
            if st.lifecycle != Lifecycle::Probing || st.probe_cb.is_none() {
                drop(st);
                self.ipc_error(&ProtocolError::schema("proberesp", "no probe outstanding"));
                return;
            }
        }

        if !self.store_channels_kv(frame) {
            return;
        }

        let Some(object) = frame.get("success") else {
            self.ipc_error(&ProtocolError::MissingObject { key: "success" });
            return;
        };
        let success = match decode_success(object) {
            Ok(s) => s,
            Err(e) => {
                self.ipc_error(&e);
                return;
            }
        };

        let (callback, transport) = {
            let mut st = self.state.lock();
            st.lifecycle = if success {
                Lifecycle::ProbedOk
            } else {
                Lifecycle::Failed
            };
            st.pid = None;
            st.child_ready = false;
            (st.probe_cb.take(), st.transport.take())
        };

        if let Some(cb) = callback {
            cb(self, success);
        }
        // The probe is done either way; the prototype's child goes away
        if let Some(transport) = transport {
            transport.close();
        }
    }

    /// Open verdict from the child
    fn handle_openresp(self: &Arc<Self>, frame: &DecodedFrame) {
        self.log_message_kv(frame);

        {
            let st = self.state.lock();
            if st.lifecycle != Lifecycle::Opening || st.open_cb.is_none() {
                drop(st);
                self.ipc_error(&ProtocolError::schema("openresp", "no open outstanding"));
                return;
            }
        }

        if !self.store_channels_kv(frame) {
            return;
        }

        let Some(object) = frame.get("success") else {
            self.ipc_error(&ProtocolError::MissingObject { key: "success" });
            return;
        };
        let success = match decode_success(object) {
            Ok(s) => s,
            Err(e) => {
                self.ipc_error(&e);
                return;
            }
        };

        let (callback, transport) = {
            let mut st = self.state.lock();
            if success {
                st.lifecycle = Lifecycle::Running;
                (st.open_cb.take(), None)
            } else {
                st.lifecycle = Lifecycle::Failed;
                st.pid = None;
                st.child_ready = false;
                (st.open_cb.take(), st.transport.take())
            }
        };

        if let Some(cb) = callback {
            cb(self, success);
        }
        if let Some(transport) = transport {
            transport.soft_kill();
        }
    }

    /// Fatal error report from the child
    fn handle_error_frame(self: &Arc<Self>, frame: &DecodedFrame) {
        self.log_message_kv(frame);
        self.fail_source();
    }

    /// Captured packet report
    fn handle_data(self: &Arc<Self>, frame: &DecodedFrame) {
        self.log_message_kv(frame);

        let Some(object) = frame.get("packet") else {
            return;
        };
        let report = match decode_packet(object) {
            Ok(r) => r,
            Err(e) => {
                self.ipc_error(&e);
                return;
            }
        };

        let mut packet = CapturePacket::from_report(report);

        if let Some(object) = frame.get("signal") {
            match decode_signal(object) {
                Ok(signal) => packet = packet.with_signal(signal),
                Err(e) => self.ipc_error(&e),
            }
        }
        if let Some(object) = frame.get("gps") {
            match decode_gps(object) {
                Ok(gps) => packet = packet.with_gps(gps),
                Err(e) => self.ipc_error(&e),
            }
        }

        self.counters.num_reports.fetch_add(1, Ordering::Relaxed);
        self.counters
            .last_report_time
            .store(unix_now(), Ordering::Relaxed);

        // Prototypes have no chain and never deliver packets
        if let Some(chain) = &self.chain {
            chain.submit(packet);
        }
    }

    /// Stream-level protocol failure: count it, then fail the source
    fn handle_protocol_error(self: &Arc<Self>, error: ProtocolError) {
        self.ipc_error(&error);
        self.fail_source();
    }

    /// The child went away
    ///
    /// An unexpected closure fails outstanding work and reports the error;
    /// closure of an already-resolved source is unremarkable. This is a
    /// transport event, not a protocol error: the IPC counter is untouched.
    fn handle_transport_closed(self: &Arc<Self>) {
        let (probe_cb, open_cb, error_cb, transport) = {
            let mut st = self.state.lock();
            let unexpected = matches!(
                st.lifecycle,
                Lifecycle::Probing | Lifecycle::Opening | Lifecycle::Running
            );
            if unexpected {
                st.lifecycle = Lifecycle::Failed;
            }
            st.pid = None;
            st.child_ready = false;
            let error_cb = if unexpected { st.error_cb.take() } else { None };
            (
                st.probe_cb.take(),
                st.open_cb.take(),
                error_cb,
                st.transport.take(),
            )
        };

        if let Some(transport) = transport {
            transport.close();
        }
        if let Some(cb) = probe_cb {
            cb(self, false);
        }
        if let Some(cb) = open_cb {
            cb(self, false);
        }
        if let Some(cb) = error_cb {
            cb(self);
        }
    }

    /// Common failure path: tear the child down, drain callbacks, go Failed
    fn fail_source(self: &Arc<Self>) {
        let (probe_cb, open_cb, error_cb, transport) = {
            let mut st = self.state.lock();
            st.lifecycle = Lifecycle::Failed;
            st.pid = None;
            st.child_ready = false;
            (
                st.probe_cb.take(),
                st.open_cb.take(),
                st.error_cb.take(),
                st.transport.take(),
            )
        };

        if let Some(transport) = transport {
            transport.soft_kill();
        }
        if let Some(cb) = probe_cb {
            cb(self, false);
        }
        if let Some(cb) = open_cb {
            cb(self, false);
        }
        if let Some(cb) = error_cb {
            cb(self);
        }
    }

    /// Log the `message` object of a frame, if present
    fn log_message_kv(&self, frame: &DecodedFrame) {
        let Some(object) = frame.get("message") else {
            return;
        };
        match decode_message(object) {
            Ok(report) => {
                if report.flags & (MSG_ERROR | MSG_FATAL) != 0 {
                    tracing::error!(source = %self.uuid, name = %self.name(), "{}", report.msg);
                } else {
                    tracing::info!(source = %self.uuid, name = %self.name(), "{}", report.msg);
                }
            }
            Err(e) => self.ipc_error(&e),
        }
    }

    /// Store a `channels` object; false means the frame should be discarded
    fn store_channels_kv(self: &Arc<Self>, frame: &DecodedFrame) -> bool {
        let Some(object) = frame.get("channels") else {
            return true;
        };
        match decode_channels(object) {
            Ok(report) => {
                let mut st = self.state.lock();
                st.channel_capable = !report.channels.is_empty();
                st.channels = report.channels;
                true
            }
            Err(e) => {
                self.ipc_error(&e);
                false
            }
        }
    }
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource")
            .field("uuid", &self.uuid)
            .field("type", &self.driver_type)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

/// Feed transport events into the source until the channel ends
///
/// The pump holds only a weak handle: a removed source stops pumping as soon
/// as the supervisor drops its ownership.
async fn pump_events(
    source: Weak<DataSource>,
    mut events: mpsc::Receiver<TransportEvent>,
    epoch: u64,
) {
    while let Some(event) = events.recv().await {
        let Some(source) = source.upgrade() else {
            return;
        };
        source.handle_event(event, epoch);
    }
}

/// Seconds since the unix epoch
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
