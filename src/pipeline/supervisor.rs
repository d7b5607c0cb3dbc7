//! Consumer reference counting and deferred teardown
//!
//! The supervisor is a small actor fed by an unbounded control channel.
//! Attach/detach messages adjust the subscriber count; when it reaches zero
//! a keep-alive timer starts, and only if it elapses with no reattachment
//! is the worker torn down. The query and people slots are host-owned, so a
//! later attach restarts the worker against the values they still hold.

use super::worker::Worker;
use super::{PipelineConfig, ResultSnapshot};
use std::future::pending;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

pub(super) enum Ctl {
    Attach,
    Detach,
}

pub(super) struct Supervisor {
    config: PipelineConfig,
    query_tx: watch::Sender<String>,
    people_tx: watch::Sender<ResultSnapshot>,
    results_tx: watch::Sender<ResultSnapshot>,
    busy_tx: watch::Sender<bool>,
    ctl_rx: mpsc::UnboundedReceiver<Ctl>,

    subscribers: usize,
    worker: Option<JoinHandle<()>>,
    /// Deadline of the pending teardown timer, if any
    teardown_at: Option<Instant>,
}

impl Supervisor {
    pub(super) fn new(
        config: PipelineConfig,
        query_tx: watch::Sender<String>,
        people_tx: watch::Sender<ResultSnapshot>,
        results_tx: watch::Sender<ResultSnapshot>,
        busy_tx: watch::Sender<bool>,
        ctl_rx: mpsc::UnboundedReceiver<Ctl>,
    ) -> Self {
        Self {
            config,
            query_tx,
            people_tx,
            results_tx,
            busy_tx,
            ctl_rx,
            subscribers: 0,
            worker: None,
            teardown_at: None,
        }
    }

    pub(super) async fn run(mut self) {
        loop {
            let teardown_at = self.teardown_at;
            let teardown = async move {
                match teardown_at {
                    Some(at) => sleep_until(at).await,
                    None => pending().await,
                }
            };

            tokio::select! {
                msg = self.ctl_rx.recv() => match msg {
                    Some(Ctl::Attach) => self.on_attach(),
                    Some(Ctl::Detach) => self.on_detach(),
                    // Every pipeline handle is gone; shut down for good.
                    None => break,
                },
                _ = teardown => {
                    self.teardown_at = None;
                    debug!("keep-alive elapsed, tearing worker down");
                    self.stop_worker();
                }
            }
        }
        self.stop_worker();
    }

    fn on_attach(&mut self) {
        self.subscribers += 1;
        self.teardown_at = None;
        if self.worker.is_none() {
            debug!(subscribers = self.subscribers, "starting worker");
            let worker = Worker::new(
                self.config,
                self.query_tx.subscribe(),
                self.people_tx.subscribe(),
                self.results_tx.clone(),
                self.busy_tx.clone(),
            );
            self.worker = Some(tokio::spawn(worker.run()));
        }
    }

    fn on_detach(&mut self) {
        self.subscribers = self.subscribers.saturating_sub(1);
        if self.subscribers == 0 && self.worker.is_some() {
            self.teardown_at = Some(Instant::now() + self.config.keep_alive);
            debug!(keep_alive = ?self.config.keep_alive, "last consumer detached");
        }
    }

    fn stop_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            handle.abort();
            // An aborted worker cannot clear a busy flag it had asserted.
            self.busy_tx.send_if_modified(|busy| {
                if *busy {
                    *busy = false;
                    true
                } else {
                    false
                }
            });
        }
    }
}
