//! Probe race - auto-detecting the driver for a source definition
//!
//! When a definition has no explicit type, every registered driver gets a
//! prototype instance and all of them probe the definition concurrently.
//! The first prototype to answer positively wins; the rest are cancelled.
//! If every prototype fails, or the deadline passes, the race resolves with
//! no winner.
//!
//! Races are self-contained: each holds its own lock (tier below the
//! supervisor lock), and late completions from cancelled prototypes observe
//! the resolved flag and become no-ops.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::definition::SourceDefinition;
use crate::driver::SourceDriver;
use crate::source::DataSource;

/// Completion invoked exactly once with the winning driver, if any
pub type RaceCompletion = Box<dyn FnOnce(Option<Arc<SourceDriver>>) + Send>;

/// One prototype still being waited on
struct RaceEntry {
    driver: Arc<SourceDriver>,
    proto: Arc<DataSource>,
}

/// Race-local state, guarded by the race lock
struct RaceState {
    pending: Vec<RaceEntry>,
    resolved: bool,
    completion: Option<RaceCompletion>,
}

/// A fan-out probe across every registered driver
pub struct ProbeRace {
    definition: SourceDefinition,
    started: Instant,
    state: Mutex<RaceState>,
}

impl ProbeRace {
    /// Start probing `definition` across the given driver prototypes
    ///
    /// Prototypes are started in registration order; `completion` fires once
    /// with the winner, or with `None` when every prototype failed, none
    /// exist, or the deadline passed.
    pub fn start(
        definition: SourceDefinition,
        entries: Vec<(Arc<SourceDriver>, Arc<DataSource>)>,
        deadline: Option<Duration>,
        completion: RaceCompletion,
    ) -> Arc<Self> {
        let race = Arc::new(Self {
            definition,
            started: Instant::now(),
            state: Mutex::new(RaceState {
                pending: entries
                    .iter()
                    .map(|(driver, proto)| RaceEntry {
                        driver: Arc::clone(driver),
                        proto: Arc::clone(proto),
                    })
                    .collect(),
                resolved: false,
                completion: Some(completion),
            }),
        });

        if entries.is_empty() {
            tracing::debug!(definition = %race.definition, "no drivers registered, probe cannot match");
            race.resolve_unmatched();
            return race;
        }

        tracing::info!(
            definition = %race.definition,
            candidates = entries.len(),
            "starting probe race"
        );

        for (_, proto) in &entries {
            let weak = Arc::downgrade(&race);
            let proto_uuid = proto.uuid();
            proto.probe(
                &race.definition,
                Box::new(move |source, success| {
                    if let Some(race) = weak.upgrade() {
                        race.handle_result(proto_uuid, source, success);
                    }
                }),
            );
        }

        if let Some(deadline) = deadline {
            let weak = Arc::downgrade(&race);
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                if let Some(race) = weak.upgrade() {
                    race.expire();
                }
            });
        }

        race
    }

    /// The definition being probed
    #[inline]
    pub fn definition(&self) -> &SourceDefinition {
        &self.definition
    }

    /// When the race started
    #[inline]
    pub fn started(&self) -> Instant {
        self.started
    }

    /// Whether the race has resolved
    pub fn is_resolved(&self) -> bool {
        self.state.lock().resolved
    }

    /// Record one prototype's verdict
    ///
    /// The first success wins and cancels the remaining prototypes; when the
    /// pending set drains without a winner the race resolves unmatched. Late
    /// verdicts after resolution are discarded.
    fn handle_result(self: &Arc<Self>, proto_uuid: Uuid, _source: &Arc<DataSource>, success: bool) {
        let outcome = {
            let mut st = self.state.lock();
            if st.resolved {
                return;
            }

            let Some(index) = st.pending.iter().position(|e| e.proto.uuid() == proto_uuid) else {
                return;
            };
            let entry = st.pending.swap_remove(index);

            if success {
                st.resolved = true;
                let losers = std::mem::take(&mut st.pending);
                Some((Some(entry.driver), losers, st.completion.take()))
            } else if st.pending.is_empty() {
                st.resolved = true;
                Some((None, Vec::new(), st.completion.take()))
            } else {
                None
            }
        };

        let Some((winner, losers, completion)) = outcome else {
            return;
        };

        // Cancelled prototypes are torn down outside the race lock; their
        // callbacks re-enter handle_result and see the resolved flag.
        for loser in &losers {
            loser.proto.close(true);
        }

        match &winner {
            Some(driver) => {
                tracing::info!(
                    definition = %self.definition,
                    source_type = driver.type_tag(),
                    elapsed_ms = self.started.elapsed().as_millis() as u64,
                    "probe race resolved"
                );
            }
            None => {
                tracing::warn!(
                    definition = %self.definition,
                    "no driver claimed source"
                );
            }
        }

        if let Some(completion) = completion {
            completion(winner);
        }
    }

    /// Deadline expiry: resolve unmatched and cancel whatever is left
    fn expire(self: &Arc<Self>) {
        let pending = {
            let mut st = self.state.lock();
            if st.resolved {
                return;
            }
            st.resolved = true;
            std::mem::take(&mut st.pending)
        };

        tracing::warn!(
            definition = %self.definition,
            outstanding = pending.len(),
            "probe race deadline expired"
        );

        for entry in &pending {
            entry.proto.close(true);
        }

        self.resolve_unmatched();
    }

    /// Deliver the unmatched completion if it is still owed
    fn resolve_unmatched(&self) {
        let completion = {
            let mut st = self.state.lock();
            st.resolved = true;
            st.completion.take()
        };
        if let Some(completion) = completion {
            completion(None);
        }
    }
}

impl std::fmt::Debug for ProbeRace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.state.lock();
        f.debug_struct("ProbeRace")
            .field("definition", &self.definition.raw())
            .field("pending", &st.pending.len())
            .field("resolved", &st.resolved)
            .finish()
    }
}
