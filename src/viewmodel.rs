//! Presentation adapter
//!
//! The boundary between a front end and the pipeline: keystrokes go in
//! through [`SearchViewModel::set_query`], the latest snapshot and busy
//! flag come out as plain reads. No validation is applied to queries; any
//! string, including empty, is accepted.

use crate::person::Person;
use crate::pipeline::{ResultSnapshot, SearchPipeline, Subscription};
use tokio_stream::wrappers::WatchStream;

/// One attached consumer of a [`SearchPipeline`].
///
/// Dropping the view model detaches it; if it was the pipeline's last
/// consumer, the keep-alive countdown starts.
pub struct SearchViewModel {
    pipeline: SearchPipeline,
    subscription: Subscription,
}

impl SearchViewModel {
    pub fn attach(pipeline: &SearchPipeline) -> Self {
        Self {
            pipeline: pipeline.clone(),
            subscription: pipeline.attach(),
        }
    }

    /// Feed a keystroke-driven query update into the pipeline
    pub fn set_query(&self, text: impl Into<String>) {
        self.pipeline.set_query(text);
    }

    pub fn current_query(&self) -> String {
        self.pipeline.current_query()
    }

    pub fn latest_results(&self) -> ResultSnapshot {
        self.subscription.latest_results()
    }

    pub fn is_busy(&self) -> bool {
        self.subscription.is_busy()
    }

    /// Wait for the next snapshot emission
    pub async fn results_changed(&mut self) {
        self.subscription.results_changed().await
    }

    /// Wait for the busy flag to flip
    pub async fn busy_changed(&mut self) {
        self.subscription.busy_changed().await
    }

    /// Stream of snapshot emissions, starting with the next change
    pub fn results_stream(&self) -> WatchStream<ResultSnapshot> {
        self.subscription.results_stream()
    }

    /// Render-ready `"First Last"` rows for the latest snapshot
    pub fn display_lines(&self) -> Vec<String> {
        self.latest_results()
            .iter()
            .map(Person::display_name)
            .collect()
    }
}
