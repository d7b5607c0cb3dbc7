//! The debounce/compute state machine
//!
//! One worker task per live pipeline. It owns a single debounce timer slot
//! (cancel-and-replace on every query change) and tags every computation
//! with a monotonic sequence number so that last-query-wins holds even when
//! an older computation finishes after a newer one.

use super::{PipelineConfig, ResultSnapshot};
use crate::person::Person;
use std::future::pending;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Debouncing,
    Computing,
    Settled,
}

struct Completion {
    seq: u64,
    people: ResultSnapshot,
}

pub(super) struct Worker {
    config: PipelineConfig,
    query_rx: watch::Receiver<String>,
    people_rx: watch::Receiver<ResultSnapshot>,
    results_tx: watch::Sender<ResultSnapshot>,
    busy_tx: watch::Sender<bool>,

    phase: Phase,
    /// The query that last survived the debounce quiet period. People
    /// changes recombine against this, not against a still-debouncing write.
    query: String,
    /// Deadline of the pending debounce timer, if any
    debounce_at: Option<Instant>,
    /// In-flight filter computations; dropped (and so cancelled) with the worker
    computations: JoinSet<Completion>,

    next_seq: u64,
    /// Highest sequence number published so far
    published_seq: u64,
    /// Sequence number of the newest busy-asserting computation
    busy_seq: u64,
}

impl Worker {
    pub(super) fn new(
        config: PipelineConfig,
        query_rx: watch::Receiver<String>,
        people_rx: watch::Receiver<ResultSnapshot>,
        results_tx: watch::Sender<ResultSnapshot>,
        busy_tx: watch::Sender<bool>,
    ) -> Self {
        let query = query_rx.borrow().clone();
        Self {
            config,
            query_rx,
            people_rx,
            results_tx,
            busy_tx,
            phase: Phase::Idle,
            query,
            debounce_at: None,
            computations: JoinSet::new(),
            next_seq: 1,
            published_seq: 0,
            busy_seq: 0,
        }
    }

    pub(super) async fn run(mut self) {
        debug!(query = %self.query, "worker started");

        // A (re)started worker recombines from the current query and people
        // before waiting for changes. On a cold start with a blank query
        // this conflates into the initial full-collection snapshot.
        self.start_computation();

        loop {
            let debounce_at = self.debounce_at;
            let debounce = async move {
                match debounce_at {
                    Some(at) => sleep_until(at).await,
                    None => pending().await,
                }
            };

            tokio::select! {
                res = self.query_rx.changed() => match res {
                    Ok(()) => self.on_query_changed(),
                    Err(_) => break,
                },
                res = self.people_rx.changed() => match res {
                    Ok(()) => {
                        debug!("people collection changed, recombining");
                        self.start_computation();
                    }
                    Err(_) => break,
                },
                _ = debounce => {
                    self.debounce_at = None;
                    // borrow_and_update marks a write racing the timer expiry
                    // as seen, so the value computed here cannot trigger a
                    // redundant second debounce cycle.
                    self.query = self.query_rx.borrow_and_update().clone();
                    debug!(query = %self.query, "debounce elapsed");
                    self.start_computation();
                }
                Some(done) = self.computations.join_next() => {
                    if let Ok(completion) = done {
                        self.publish(completion);
                    }
                }
            }
        }
    }

    /// Cancel-and-replace: one timer slot, restarted by every keystroke, so
    /// only the last value written within a quiet period is ever observed.
    fn on_query_changed(&mut self) {
        self.debounce_at = Some(Instant::now() + self.config.debounce);
        self.set_phase(Phase::Debouncing);
    }

    fn start_computation(&mut self) {
        let seq = self.next_seq;
        self.next_seq += 1;

        let people = self.people_rx.borrow().clone();
        let query = self.query.clone();

        if query.trim().is_empty() {
            // Blank query: the full collection, immediately, never busy.
            self.busy_seq = seq;
            self.publish(Completion { seq, people });
            return;
        }

        self.set_phase(Phase::Computing);
        self.busy_seq = seq;
        self.set_busy(true);

        let latency = self.config.latency;
        self.computations.spawn(async move {
            let matched: Vec<Person> = people
                .iter()
                .filter(|person| person.matches_query(&query))
                .cloned()
                .collect();
            // Stands in for a storage or network lookup.
            sleep(latency).await;
            Completion {
                seq,
                people: Arc::new(matched),
            }
        });
    }

    fn publish(&mut self, done: Completion) {
        if done.seq < self.published_seq {
            // An in-flight computation was superseded while it slept; its
            // result must not overwrite the newer one.
            debug!(seq = done.seq, latest = self.published_seq, "discarding superseded result");
            return;
        }
        self.published_seq = done.seq;

        self.results_tx.send_if_modified(|current| {
            if *current == done.people {
                false
            } else {
                *current = done.people.clone();
                true
            }
        });

        // A stale completion must not clear a newer computation's busy flag.
        if done.seq >= self.busy_seq {
            self.set_busy(false);
            self.set_phase(Phase::Settled);
        }
    }

    fn set_busy(&self, busy: bool) {
        self.busy_tx.send_if_modified(|current| {
            if *current == busy {
                false
            } else {
                *current = busy;
                true
            }
        });
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "phase transition");
            self.phase = phase;
        }
    }
}
