use super::*;
use crate::person::{sample_people, Person};
use std::time::Duration;
use tokio::time::{advance, timeout, Instant};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn display(snapshot: &ResultSnapshot) -> Vec<String> {
    snapshot.iter().map(Person::display_name).collect()
}

/// Let the supervisor/worker tasks process pending channel events without
/// moving the paused clock.
async fn drain() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Paused-clock timers are deterministic, but allow a small rounding slack.
fn assert_elapsed(start: Instant, expected: Duration) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= expected && elapsed <= expected + ms(5),
        "elapsed {elapsed:?}, expected {expected:?}"
    );
}

async fn attached_pipeline() -> (SearchPipeline, Subscription) {
    let pipeline = SearchPipeline::new(sample_people(), PipelineConfig::default());
    let sub = pipeline.attach();
    drain().await;
    (pipeline, sub)
}

#[tokio::test(start_paused = true)]
async fn test_cold_start_snapshot_is_full_roster() {
    let (_pipeline, sub) = attached_pipeline().await;

    assert_eq!(sub.latest_results().len(), 4);
    assert!(!sub.is_busy());

    // The blank initial query conflates into the initial snapshot; nothing
    // further is emitted.
    let mut probe = sub.results_rx.clone();
    probe.mark_unchanged();
    advance(ms(2000)).await;
    drain().await;
    assert!(!probe.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_busy_flag_window() {
    let (pipeline, mut sub) = attached_pipeline().await;

    let start = Instant::now();
    pipeline.set_query("Bef");
    drain().await;

    sub.busy_changed().await;
    assert!(sub.is_busy());
    assert_elapsed(start, ms(500)); // debounce elapsed, computing entered

    sub.busy_changed().await;
    assert!(!sub.is_busy());
    assert_elapsed(start, ms(1500)); // 500 debounce + 1000 latency
    assert_eq!(display(&sub.latest_results()), vec!["Beff Jezos"]);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_coalesces_rapid_keystrokes() {
    let (pipeline, mut sub) = attached_pipeline().await;

    let start = Instant::now();
    pipeline.set_query("P");
    drain().await;
    advance(ms(100)).await;
    pipeline.set_query("Ph");
    drain().await;
    advance(ms(100)).await;
    pipeline.set_query("Phi");
    drain().await;
    advance(ms(400)).await; // t=600, quiet since t=200 but < 500ms of quiet
    pipeline.set_query("Phil");
    drain().await;

    // Exactly one computation, triggered by the t=600 write: busy first
    // flips at 600 + 500. An uncoalesced write would have flipped it sooner.
    sub.busy_changed().await;
    assert!(sub.is_busy());
    assert_elapsed(start, ms(1100));

    sub.busy_changed().await;
    assert!(!sub.is_busy());
    assert_elapsed(start, ms(2100));
    assert_eq!(display(&sub.latest_results()), vec!["Philipp Lackner"]);
}

#[tokio::test(start_paused = true)]
async fn test_write_racing_debounce_expiry_computes_once() {
    let (pipeline, mut sub) = attached_pipeline().await;

    pipeline.set_query("Phi");
    drain().await;
    advance(ms(499)).await;
    // Land a new write in the same poll window as the timer expiry, so the
    // worker sees both events at once.
    pipeline.set_query("Phil");
    advance(ms(1)).await;
    drain().await;

    sub.busy_changed().await;
    assert!(sub.is_busy());
    sub.busy_changed().await;
    assert!(!sub.is_busy());
    assert_eq!(display(&sub.latest_results()), vec!["Philipp Lackner"]);

    // Whichever event the worker handled first, the value it computed must
    // not trigger a redundant second debounce cycle.
    let mut busy_probe = sub.busy_rx.clone();
    busy_probe.mark_unchanged();
    advance(ms(3000)).await;
    drain().await;
    assert!(!busy_probe.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_results_preserve_directory_order() {
    let (pipeline, mut sub) = attached_pipeline().await;

    pipeline.set_query("e");
    sub.results_changed().await;

    assert_eq!(
        display(&sub.latest_results()),
        vec!["Philipp Lackner", "Beff Jezos", "Jeve Stops"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_blank_query_is_immediate_and_never_busy() {
    let (pipeline, mut sub) = attached_pipeline().await;

    pipeline.set_query("Bef");
    sub.results_changed().await;
    assert_eq!(sub.latest_results().len(), 1);

    let mut busy_probe = sub.busy_rx.clone();
    busy_probe.mark_unchanged();

    let start = Instant::now();
    pipeline.set_query("   ");
    sub.results_changed().await;

    // Debounce still applies, but there is no simulated latency.
    assert_elapsed(start, ms(500));
    assert_eq!(sub.latest_results().len(), 4);
    assert!(!busy_probe.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_people_update_recombines_without_debounce() {
    let (pipeline, mut sub) = attached_pipeline().await;

    pipeline.set_query("be");
    sub.results_changed().await;
    assert_eq!(display(&sub.latest_results()), vec!["Beff Jezos"]);

    let start = Instant::now();
    pipeline.set_people(vec![
        Person::new("Benedict", "Cumberbatch"),
        Person::new("Jeve", "Stops"),
    ]);
    drain().await;

    // Busy immediately: no debounce on collection changes.
    assert!(sub.is_busy());
    assert_elapsed(start, ms(0));

    sub.results_changed().await;
    assert_elapsed(start, ms(1000)); // latency only
    assert_eq!(display(&sub.latest_results()), vec!["Benedict Cumberbatch"]);
    assert!(!sub.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_superseding_blank_discards_stale_result() {
    let (pipeline, mut sub) = attached_pipeline().await;

    let start = Instant::now();
    pipeline.set_query("Bef");
    drain().await;

    sub.busy_changed().await;
    assert!(sub.is_busy());
    assert_elapsed(start, ms(500)); // "Bef" computation in flight until t=1500

    advance(ms(100)).await; // t=600
    pipeline.set_query("");
    drain().await;

    // The blank query settles at t=1100 (debounce only) and supersedes the
    // in-flight computation. Its snapshot equals the still-current initial
    // roster, so it conflates away; the busy flag clearing is the signal.
    sub.busy_changed().await;
    assert_elapsed(start, ms(1100));
    assert_eq!(sub.latest_results().len(), 4);
    assert!(!sub.is_busy());

    // The stale "Bef" result lands at t=1500 and must be discarded.
    let mut results_probe = sub.results_rx.clone();
    results_probe.mark_unchanged();
    advance(ms(1000)).await;
    drain().await;
    assert!(!results_probe.has_changed().unwrap());
    assert_eq!(sub.latest_results().len(), 4);
    assert!(!sub.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_equal_query_write_is_conflated() {
    let (pipeline, mut sub) = attached_pipeline().await;

    pipeline.set_query("be");
    sub.results_changed().await;

    let mut busy_probe = sub.busy_rx.clone();
    busy_probe.mark_unchanged();

    pipeline.set_query("be"); // same value: no re-debounce, no recompute
    drain().await;
    advance(ms(2000)).await;
    drain().await;
    assert!(!busy_probe.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_reattach_within_grace_reuses_snapshot() {
    let pipeline = SearchPipeline::new(sample_people(), PipelineConfig::default());

    {
        let mut sub = pipeline.attach();
        drain().await;
        pipeline.set_query("be");
        sub.results_changed().await;
        assert_eq!(display(&sub.latest_results()), vec!["Beff Jezos"]);
    } // detach

    drain().await;
    advance(ms(4000)).await; // still inside the 5000ms grace period
    drain().await;

    let sub = pipeline.attach();
    drain().await;
    assert_eq!(display(&sub.latest_results()), vec!["Beff Jezos"]);
    assert!(!sub.is_busy());

    // Reattachment reused the live worker: no recomputation follows.
    let mut busy_probe = sub.busy_rx.clone();
    busy_probe.mark_unchanged();
    advance(ms(3000)).await;
    drain().await;
    assert!(!busy_probe.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_reattach_after_teardown_recomputes() {
    let pipeline = SearchPipeline::new(sample_people(), PipelineConfig::default());

    {
        let mut sub = pipeline.attach();
        drain().await;
        pipeline.set_query("be");
        sub.results_changed().await;
    } // detach

    drain().await;
    advance(ms(6000)).await; // grace period elapsed, worker torn down
    drain().await;

    let mut sub = pipeline.attach();
    drain().await;

    // The query survived teardown and the restarted worker recombines from it.
    assert_eq!(pipeline.current_query(), "be");
    assert!(sub.is_busy());

    // The busy->true flip landed after this subscription was created;
    // consume it so the next wait observes the clearing flip.
    sub.busy_rx.mark_unchanged();

    let start = Instant::now();
    sub.busy_changed().await;
    assert!(!sub.is_busy());
    assert_elapsed(start, ms(1000));
    assert_eq!(display(&sub.latest_results()), vec!["Beff Jezos"]);
}

#[tokio::test(start_paused = true)]
async fn test_worker_survives_while_any_consumer_attached() {
    let pipeline = SearchPipeline::new(sample_people(), PipelineConfig::default());
    let sub_a = pipeline.attach();
    let mut sub_b = pipeline.attach();
    drain().await;

    drop(sub_a);
    drain().await;
    advance(ms(6000)).await; // would tear down if the count had hit zero
    drain().await;

    pipeline.set_query("jeve");
    timeout(ms(10_000), sub_b.results_changed())
        .await
        .expect("worker should still be live");
    assert_eq!(display(&sub_b.latest_results()), vec!["Jeve Stops"]);
}
