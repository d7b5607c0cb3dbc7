//! Debounced search pipeline
//!
//! Combines a live query string and a live people collection into a
//! filtered, asynchronously delayed result stream with a derived busy flag.
//!
//! Shape of the thing:
//! - Four host-owned `watch` slots (query, people, results, busy). The
//!   mutable senders never leave this module; consumers only ever get
//!   receivers and the narrow setters on [`SearchPipeline`].
//! - A worker task ([`worker`]) runs the debounce/compute state machine.
//! - A supervisor task ([`supervisor`]) reference-counts attached consumers
//!   and keeps the worker alive for a grace period after the last one
//!   detaches, so a quick reattach reuses the last snapshot instead of
//!   recomputing.
//!
//! The query and people slots outlive the worker, so both survive an idle
//! teardown and a restarted worker recombines from them.

mod supervisor;
mod worker;

#[cfg(test)]
mod tests;

use crate::person::Person;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::WatchStream;

use supervisor::{Ctl, Supervisor};

/// An ordered, immutable result snapshot. Each emission replaces the
/// previous one wholesale.
pub type ResultSnapshot = Arc<Vec<Person>>;

/// Timing knobs for the pipeline
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Quiet period a query change must survive before it is observed
    pub debounce: Duration,
    /// Simulated lookup latency applied to non-blank filter computations
    pub latency: Duration,
    /// How long the pipeline stays live after its last consumer detaches
    pub keep_alive: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            latency: Duration::from_millis(1000),
            keep_alive: Duration::from_millis(5000),
        }
    }
}

struct PipelineShared {
    query_tx: watch::Sender<String>,
    people_tx: watch::Sender<ResultSnapshot>,
    results_tx: watch::Sender<ResultSnapshot>,
    busy_tx: watch::Sender<bool>,
    ctl_tx: mpsc::UnboundedSender<Ctl>,
}

/// Handle to a search pipeline instance.
///
/// Cheap to clone; all clones address the same pipeline. The pipeline's
/// worker only runs while at least one [`Subscription`] is attached (plus
/// the keep-alive grace period). Dropping every handle and subscription
/// shuts the supervisor down.
#[derive(Clone)]
pub struct SearchPipeline {
    shared: Arc<PipelineShared>,
}

impl SearchPipeline {
    /// Create a pipeline over an initial people collection.
    ///
    /// Spawns the supervisor task, so this must be called from within a
    /// tokio runtime. No filtering work happens until a consumer attaches.
    pub fn new(people: Vec<Person>, config: PipelineConfig) -> Self {
        let people: ResultSnapshot = Arc::new(people);

        let (query_tx, _) = watch::channel(String::new());
        let (people_tx, _) = watch::channel(people.clone());
        // Before the first computation the snapshot is the full collection,
        // matching the blank initial query.
        let (results_tx, _) = watch::channel(people);
        let (busy_tx, _) = watch::channel(false);
        let (ctl_tx, ctl_rx) = mpsc::unbounded_channel();

        let supervisor = Supervisor::new(
            config,
            query_tx.clone(),
            people_tx.clone(),
            results_tx.clone(),
            busy_tx.clone(),
            ctl_rx,
        );
        tokio::spawn(supervisor.run());

        Self {
            shared: Arc::new(PipelineShared {
                query_tx,
                people_tx,
                results_tx,
                busy_tx,
                ctl_tx,
            }),
        }
    }

    /// Attach a consumer, starting the worker if it is not already live.
    pub fn attach(&self) -> Subscription {
        let _ = self.shared.ctl_tx.send(Ctl::Attach);
        Subscription {
            shared: Arc::clone(&self.shared),
            results_rx: self.shared.results_tx.subscribe(),
            busy_rx: self.shared.busy_tx.subscribe(),
        }
    }

    /// Write to the pipeline's query slot. Latest write wins; a value equal
    /// to the current query is conflated away and does not restart the
    /// debounce timer.
    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        self.shared.query_tx.send_if_modified(|current| {
            if *current == text {
                false
            } else {
                *current = text;
                true
            }
        });
    }

    /// Replace the people collection. The worker recombines it with the
    /// current settled query without re-debouncing.
    pub fn set_people(&self, people: Vec<Person>) {
        self.shared.people_tx.send_replace(Arc::new(people));
    }

    /// The most recently written query
    pub fn current_query(&self) -> String {
        self.shared.query_tx.borrow().clone()
    }
}

/// A consumer attachment to the pipeline.
///
/// Holds read access to the result and busy slots; dropping it detaches the
/// consumer and, if it was the last one, starts the keep-alive countdown.
pub struct Subscription {
    shared: Arc<PipelineShared>,
    results_rx: watch::Receiver<ResultSnapshot>,
    busy_rx: watch::Receiver<bool>,
}

impl Subscription {
    /// The most recently emitted snapshot
    pub fn latest_results(&self) -> ResultSnapshot {
        self.results_rx.borrow().clone()
    }

    /// Whether a filter computation is currently in flight
    pub fn is_busy(&self) -> bool {
        *self.busy_rx.borrow()
    }

    /// Wait for the next snapshot emission
    pub async fn results_changed(&mut self) {
        if self.results_rx.changed().await.is_err() {
            // The senders live in PipelineShared, which we hold, so the
            // channel cannot close under us; park rather than spin if it
            // somehow does.
            std::future::pending::<()>().await;
        }
    }

    /// Wait for the busy flag to flip
    pub async fn busy_changed(&mut self) {
        if self.busy_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Stream of snapshot emissions, starting with the next change
    pub fn results_stream(&self) -> WatchStream<ResultSnapshot> {
        WatchStream::from_changes(self.results_rx.clone())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.shared.ctl_tx.send(Ctl::Detach);
    }
}
