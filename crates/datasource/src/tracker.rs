//! Data source tracker - registry and supervisor
//!
//! The tracker owns the driver registry and the active and failed source
//! lists. It is the entry point for everything external: HTTP handlers call
//! [`DataSourceTracker::open_source`] / [`DataSourceTracker::remove_source`]
//! and the snapshot accessors, and the retry timer re-opens failed sources.
//!
//! # Ownership and locking
//!
//! The tracker is the sole strong owner of its sources. Completion and
//! error callbacks capture only a `Weak` handle back to the tracker and
//! upgrade-or-skip on invocation, so a torn-down tracker quietly orphans
//! in-flight completions instead of cycling. The tracker lock is the
//! outermost tier: it is never held while source callbacks run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use aircap_pipeline::PacketChain;

use crate::definition::SourceDefinition;
use crate::driver::{DriverInfo, DriverRegistry, SourceDriver};
use crate::error::SourceError;
use crate::probe::ProbeRace;
use crate::source::{DataSource, Lifecycle, SourceStatus};

/// Default interval between retry sweeps of the failed list
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Default deadline for a probe race
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Tracker configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Ordered directories capture binaries may be launched from
    pub bin_paths: Vec<PathBuf>,

    /// Interval between retry sweeps of failed sources
    pub retry_interval: Duration,

    /// Deadline for probe races; `None` disables the deadline
    pub probe_timeout: Option<Duration>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            bin_paths: Vec::new(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            probe_timeout: Some(DEFAULT_PROBE_TIMEOUT),
        }
    }
}

/// Visitor for [`DataSourceTracker::iterate_sources`]
///
/// `handle_source` runs once per active source of a point-in-time snapshot,
/// then `finalize` runs once.
pub trait SourceVisitor {
    /// Visit one active source
    fn handle_source(&mut self, source: &Arc<DataSource>);

    /// All sources of the snapshot have been visited
    fn finalize(&mut self) {}
}

/// Handle returned by a successful [`DataSourceTracker::open_source`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenHandle {
    /// A source was instantiated directly; open completes asynchronously
    Source(Uuid),

    /// A probe race is resolving the driver; a source appears if it wins
    Probing,
}

/// Collections guarded by the tracker lock (outermost tier)
struct TrackerInner {
    drivers: DriverRegistry,
    active: Vec<Arc<DataSource>>,
    failed: Vec<Arc<DataSource>>,
    races: Vec<Arc<ProbeRace>>,
}

/// Registry and supervisor of all data sources
pub struct DataSourceTracker {
    chain: PacketChain,
    config: TrackerConfig,
    inner: Mutex<TrackerInner>,
}

impl DataSourceTracker {
    /// Create a tracker submitting packets into `chain`
    pub fn new(chain: PacketChain, config: TrackerConfig) -> Arc<Self> {
        Arc::new(Self {
            chain,
            config,
            inner: Mutex::new(TrackerInner {
                drivers: DriverRegistry::new(),
                active: Vec::new(),
                failed: Vec::new(),
                races: Vec::new(),
            }),
        })
    }

    /// Register a source driver
    ///
    /// Registration order sets probe precedence.
    ///
    /// # Errors
    ///
    /// [`SourceError::DuplicateType`] if the type tag is taken.
    pub fn register_driver(
        &self,
        type_tag: &str,
        description: &str,
        ipc_binary: &str,
    ) -> Result<(), SourceError> {
        let mut inner = self.inner.lock();
        inner
            .drivers
            .register(SourceDriver::new(type_tag, description, ipc_binary))
    }

    /// Registered driver summaries, in registration order
    pub fn driver_infos(&self) -> Vec<DriverInfo> {
        self.inner.lock().drivers.infos()
    }

    /// Visit a point-in-time snapshot of the active sources
    ///
    /// The snapshot is taken under the tracker lock, briefly blocking
    /// mutators; visiting happens outside it, so a visitor may safely call
    /// back into the tracker (including `remove_source`).
    pub fn iterate_sources(&self, visitor: &mut dyn SourceVisitor) {
        let snapshot: Vec<Arc<DataSource>> = self.inner.lock().active.clone();
        for source in &snapshot {
            visitor.handle_source(source);
        }
        visitor.finalize();
    }

    /// Open a source from a user definition string
    ///
    /// An explicit type instantiates that driver directly; a missing or
    /// `auto` type starts a probe race across every registered driver.
    /// Malformed definitions fail synchronously; everything downstream
    /// completes asynchronously and failures land the source in the failed
    /// list for retry.
    ///
    /// # Errors
    ///
    /// [`SourceError::DefinitionParse`] or [`SourceError::UnknownType`],
    /// both synchronous; no state changes on error.
    pub fn open_source(self: &Arc<Self>, definition: &str) -> Result<OpenHandle, SourceError> {
        let definition = SourceDefinition::parse(definition)?;

        if definition.is_auto() {
            self.start_probe(definition);
            return Ok(OpenHandle::Probing);
        }

        // is_auto() returned false, so a type is present
        let type_tag = definition.source_type().unwrap_or_default();
        let driver = self
            .inner
            .lock()
            .drivers
            .find(type_tag)
            .ok_or_else(|| SourceError::UnknownType(type_tag.to_string()))?;

        let source = self.launch_source(&driver, &definition);
        Ok(OpenHandle::Source(source.uuid()))
    }

    /// Remove a source by UUID
    ///
    /// The child is soft-killed and outstanding callbacks are failed.
    /// Returns whether the UUID named a known source.
    pub fn remove_source(&self, uuid: Uuid) -> bool {
        let source = {
            let mut inner = self.inner.lock();
            take_by_uuid(&mut inner.active, uuid).or_else(|| take_by_uuid(&mut inner.failed, uuid))
        };

        match source {
            Some(source) => {
                tracing::info!(source = %uuid, name = %source.name(), "removing source");
                source.close(true);
                true
            }
            None => false,
        }
    }

    /// Re-attempt every failed source with its stored definition
    ///
    /// Invoked by the retry timer. Sources that come back move to the
    /// active list from their open completion.
    pub fn retry_failed(self: &Arc<Self>) {
        let retry: Vec<Arc<DataSource>> = {
            let inner = self.inner.lock();
            inner
                .failed
                .iter()
                .filter(|s| s.lifecycle() == Lifecycle::Failed)
                .cloned()
                .collect()
        };

        for source in retry {
            let Some(definition) = source.definition() else {
                continue;
            };
            tracing::info!(
                source = %source.uuid(),
                definition = %definition,
                "retrying failed source"
            );
            self.install_error_callback(&source);
            let weak = Arc::downgrade(self);
            source.open(
                &definition,
                Box::new(move |source, success| {
                    if let Some(tracker) = weak.upgrade() {
                        tracker.handle_open_result(source, success);
                    }
                }),
            );
        }
    }

    /// Run the periodic retry sweep until cancelled
    pub fn spawn_retry_timer(self: &Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tracker.config.retry_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => tracker.retry_failed(),
                }
            }
        })
    }

    /// Serializable snapshot of active and failed sources
    pub fn status_snapshot(&self) -> Vec<SourceStatus> {
        let inner = self.inner.lock();
        inner
            .active
            .iter()
            .map(|s| s.status(false))
            .chain(inner.failed.iter().map(|s| s.status(true)))
            .collect()
    }

    /// Number of active sources
    pub fn active_count(&self) -> usize {
        self.inner.lock().active.len()
    }

    /// Number of failed sources awaiting retry
    pub fn failed_count(&self) -> usize {
        self.inner.lock().failed.len()
    }

    /// Close every source; used on shutdown
    pub fn shutdown(&self) {
        let sources = {
            let mut inner = self.inner.lock();
            let mut all = std::mem::take(&mut inner.active);
            all.append(&mut inner.failed);
            all
        };
        for source in sources {
            source.close(true);
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Instantiate a driver's source, add it to the active list, and open it
    ///
    /// The source is listed immediately: a source that has been assigned
    /// stays known even if its first open fails, landing in the failed list
    /// for retry instead of vanishing.
    fn launch_source(self: &Arc<Self>, driver: &Arc<SourceDriver>, definition: &SourceDefinition) -> Arc<DataSource> {
        let source = driver.build_source(self.chain.clone(), self.config.bin_paths.clone());

        tracing::info!(
            source = %source.uuid(),
            source_type = driver.type_tag(),
            definition = %definition,
            "launching source"
        );

        self.inner.lock().active.push(Arc::clone(&source));
        self.install_error_callback(&source);

        let weak = Arc::downgrade(self);
        source.open(
            definition,
            Box::new(move |source, success| {
                if let Some(tracker) = weak.upgrade() {
                    tracker.handle_open_result(source, success);
                }
            }),
        );

        source
    }

    /// Start a probe race and launch the winning driver's source
    fn start_probe(self: &Arc<Self>, definition: SourceDefinition) {
        let entries: Vec<(Arc<SourceDriver>, Arc<DataSource>)> = {
            let inner = self.inner.lock();
            inner
                .drivers
                .all()
                .into_iter()
                .map(|driver| {
                    let proto = driver.build_prototype(self.config.bin_paths.clone());
                    (driver, proto)
                })
                .collect()
        };

        let weak = Arc::downgrade(self);
        let launch_definition = definition.clone();
        let race = ProbeRace::start(
            definition,
            entries,
            self.config.probe_timeout,
            Box::new(move |winner| {
                let Some(tracker) = weak.upgrade() else {
                    return;
                };
                tracker.inner.lock().races.retain(|r| !r.is_resolved());
                if let Some(driver) = winner {
                    tracker.launch_source(&driver, &launch_definition);
                }
            }),
        );

        // A race over zero drivers (or instant failures) resolves during
        // start; only live races are worth holding on to.
        if !race.is_resolved() {
            self.inner.lock().races.push(race);
        }
    }

    /// Open completion: file the source under active or failed
    fn handle_open_result(&self, source: &Arc<DataSource>, success: bool) {
        let mut inner = self.inner.lock();
        let uuid = source.uuid();

        if success {
            if let Some(source) = take_by_uuid(&mut inner.failed, uuid) {
                inner.active.push(source);
            }
            drop(inner);
            tracing::info!(
                source = %uuid,
                name = %source.name(),
                channels = source.channels().len(),
                "source opened"
            );
        } else {
            if let Some(source) = take_by_uuid(&mut inner.active, uuid) {
                inner.failed.push(source);
            }
            drop(inner);
            tracing::warn!(source = %uuid, name = %source.name(), "source failed to open");
        }
    }

    /// Runtime error on a live source: re-home it for retry
    fn install_error_callback(self: &Arc<Self>, source: &Arc<DataSource>) {
        let weak = Arc::downgrade(self);
        source.set_error_callback(Box::new(move |source| {
            let Some(tracker) = weak.upgrade() else {
                return;
            };
            tracing::warn!(
                source = %source.uuid(),
                name = %source.name(),
                "source failed, scheduling retry"
            );
            let mut inner = tracker.inner.lock();
            let uuid = source.uuid();
            if let Some(source) = take_by_uuid(&mut inner.active, uuid) {
                inner.failed.push(source);
            }
        }));
    }
}

impl std::fmt::Debug for DataSourceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("DataSourceTracker")
            .field("drivers", &inner.drivers.len())
            .field("active", &inner.active.len())
            .field("failed", &inner.failed.len())
            .field("races", &inner.races.len())
            .finish()
    }
}

/// Remove and return the source with `uuid`, preserving list order
fn take_by_uuid(list: &mut Vec<Arc<DataSource>>, uuid: Uuid) -> Option<Arc<DataSource>> {
    let index = list.iter().position(|s| s.uuid() == uuid)?;
    Some(list.remove(index))
}
