//! Periodic cycle scheduling with jitter and a manual trigger.
//!
//! ```text
//! run_cycle ─► countdown (base ± jitter, one status tick per second)
//!     ▲              │
//!     │              ├─ elapsed ───────┐
//!     │              ├─ manual trigger ┤
//!     └──────────────┴─────────────────┘
//!                    └─ shutdown ─► stop
//! ```

use futures::FutureExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::run::Cycle;
use super::status::StatusBoard;
use crate::types::config::ScheduleConfig;
use crate::types::status::Mode;

/// Shortest wait between cycles, whatever the jitter.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Starts the next cycle early. Only honoured while the scheduler is
/// counting down; presses during a cycle are dropped.
#[derive(Clone, Default)]
pub struct ManualTrigger {
    inner: Arc<TriggerState>,
}

#[derive(Default)]
struct TriggerState {
    idle: AtomicBool,
    notify: Notify,
}

impl ManualTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an immediate cycle. Returns whether the request was accepted.
    pub fn trigger(&self) -> bool {
        if !self.inner.idle.load(Ordering::SeqCst) {
            debug!("Manual trigger ignored, cycle in progress");
            return false;
        }
        self.inner.notify.notify_one();
        true
    }

    /// Whether a trigger would be accepted right now.
    pub fn is_idle(&self) -> bool {
        self.inner.idle.load(Ordering::SeqCst)
    }

    fn set_idle(&self, idle: bool) {
        self.inner.idle.store(idle, Ordering::SeqCst);
    }

    /// Drop a permit left over from an earlier countdown.
    fn drain(&self) {
        while self.inner.notify.notified().now_or_never().is_some() {}
    }
}

/// How a countdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEnd {
    Elapsed,
    Triggered { remaining: u64 },
    Shutdown,
}

/// Runs cycles back to back with a jittered idle countdown in between.
pub struct Scheduler<C: Cycle> {
    cycle: C,
    config: ScheduleConfig,
    status: Arc<StatusBoard>,
    trigger: ManualTrigger,
}

impl<C: Cycle> Scheduler<C> {
    pub fn new(cycle: C, config: ScheduleConfig, status: Arc<StatusBoard>) -> Self {
        Self {
            cycle,
            config,
            status,
            trigger: ManualTrigger::new(),
        }
    }

    /// Handle for starting the next cycle early.
    pub fn trigger(&self) -> ManualTrigger {
        self.trigger.clone()
    }

    /// Base interval plus a uniform offset in `[-jitter, +jitter]`, whole
    /// seconds, never below one second.
    pub fn next_interval(&self) -> Duration {
        let base = self.config.base_interval.as_secs() as i64;
        let jitter = self.config.jitter.as_secs() as i64;
        let offset = if jitter > 0 {
            fastrand::i64(-jitter..=jitter)
        } else {
            0
        };
        Duration::from_secs((base + offset).max(0) as u64).max(MIN_INTERVAL)
    }

    /// Run until `shutdown` is cancelled. The first cycle starts immediately.
    ///
    /// A failing cycle is logged and the schedule carries on. A cycle in
    /// progress always runs to completion; `shutdown` is only observed while
    /// counting down.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            base_interval_secs = self.config.base_interval.as_secs(),
            jitter_secs = self.config.jitter.as_secs(),
            "Scheduler started"
        );

        loop {
            self.trigger.set_idle(false);

            match self.cycle.run_cycle().await {
                Ok(summary) => debug!(?summary, "Cycle finished"),
                Err(e) => error!(error = %e, "Cycle aborted, waiting for next run"),
            }

            let wait = self.next_interval();
            info!(wait_secs = wait.as_secs(), "Next scrape scheduled");

            match self.countdown(wait.as_secs(), &shutdown).await {
                CountdownEnd::Elapsed => {}
                CountdownEnd::Triggered { remaining } => {
                    info!(remaining_secs = remaining, "Manual scrape triggered")
                }
                CountdownEnd::Shutdown => break,
            }
        }

        self.trigger.set_idle(false);
        info!("Scheduler stopped");
    }

    /// Count down `total_secs`, publishing the remaining seconds once per
    /// second, until the time is up, the trigger fires or `shutdown` is
    /// cancelled.
    pub async fn countdown(&self, total_secs: u64, shutdown: &CancellationToken) -> CountdownEnd {
        self.trigger.drain();
        self.trigger.set_idle(true);

        let mut end = CountdownEnd::Elapsed;
        for remaining in (1..=total_secs).rev() {
            self.status.update(|s| {
                s.mode = Mode::Idle;
                s.next_run_in = Some(remaining);
            });

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    end = CountdownEnd::Shutdown;
                    break;
                }
                _ = self.trigger.inner.notify.notified() => {
                    end = CountdownEnd::Triggered { remaining };
                    break;
                }
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            }
        }

        self.trigger.set_idle(false);
        self.status.update(|s| s.next_run_in = None);
        end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RunError, RunResult, StoreError};
    use crate::pipeline::run::CycleSummary;
    use crate::testing::RecordingStatus;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingCycle {
        runs: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Cycle for Arc<CountingCycle> {
        async fn run_cycle(&self) -> RunResult<CycleSummary> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RunError::Store(StoreError::io(
                    "data/remoteok.com.json",
                    std::io::Error::other("disk full"),
                )));
            }
            Ok(CycleSummary::default())
        }
    }

    fn scheduler(
        cycle: Arc<CountingCycle>,
        config: ScheduleConfig,
    ) -> (Arc<Scheduler<Arc<CountingCycle>>>, Arc<RecordingStatus>) {
        let observer = Arc::new(RecordingStatus::new());
        let status = Arc::new(StatusBoard::new(observer.clone()));
        (Arc::new(Scheduler::new(cycle, config, status)), observer)
    }

    #[test]
    fn test_next_interval_stays_in_jitter_window() {
        let (sched, _) = scheduler(
            Arc::default(),
            ScheduleConfig::new()
                .with_base_interval(Duration::from_secs(600))
                .with_jitter(Duration::from_secs(120)),
        );

        for _ in 0..1000 {
            let wait = sched.next_interval().as_secs();
            assert!((480..=720).contains(&wait), "{wait} out of window");
        }
    }

    #[test]
    fn test_next_interval_never_below_one_second() {
        let (sched, _) = scheduler(
            Arc::default(),
            ScheduleConfig::new()
                .with_base_interval(Duration::from_secs(1))
                .with_jitter(Duration::from_secs(30)),
        );

        for _ in 0..1000 {
            assert!(sched.next_interval() >= MIN_INTERVAL);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_trigger_cuts_countdown_short() {
        let (sched, observer) = scheduler(Arc::default(), ScheduleConfig::default());
        let trigger = sched.trigger();
        let token = CancellationToken::new();

        let start = tokio::time::Instant::now();
        let handle = {
            let sched = Arc::clone(&sched);
            let token = token.clone();
            tokio::spawn(async move { sched.countdown(600, &token).await })
        };

        tokio::time::sleep(Duration::from_millis(150_500)).await;
        assert!(trigger.trigger());

        let end = handle.await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(end, CountdownEnd::Triggered { remaining: 450 });
        assert!(elapsed >= Duration::from_secs(150));
        assert!(elapsed < Duration::from_secs(152));
        assert!(!trigger.is_idle());

        // One tick per elapsed second, counting down from 600
        let ticks: Vec<u64> = observer
            .snapshots()
            .iter()
            .filter_map(|s| s.next_run_in)
            .collect();
        assert_eq!(ticks.first(), Some(&600));
        assert_eq!(ticks.last(), Some(&450));
        assert_eq!(ticks.len(), 151);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_elapses() {
        let (sched, _) = scheduler(Arc::default(), ScheduleConfig::default());
        let start = tokio::time::Instant::now();

        let end = sched.countdown(5, &CancellationToken::new()).await;

        assert_eq!(end, CountdownEnd::Elapsed);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_ignored_outside_countdown() {
        let (sched, _) = scheduler(Arc::default(), ScheduleConfig::default());
        let trigger = sched.trigger();

        // Not idle yet, so the press is dropped rather than stored
        assert!(!trigger.trigger());

        let start = tokio::time::Instant::now();
        let end = sched.countdown(3, &CancellationToken::new()).await;
        assert_eq!(end, CountdownEnd::Elapsed);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_stops_on_shutdown() {
        let (sched, _) = scheduler(Arc::default(), ScheduleConfig::default());
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(sched.countdown(600, &token).await, CountdownEnd::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_cycles_do_not_stop_the_schedule() {
        let cycle = Arc::new(CountingCycle {
            runs: AtomicUsize::new(0),
            fail: true,
        });
        let (sched, _) = scheduler(
            Arc::clone(&cycle),
            ScheduleConfig::new()
                .with_base_interval(Duration::from_secs(10))
                .with_jitter(Duration::ZERO),
        );
        let token = CancellationToken::new();

        let handle = {
            let sched = Arc::clone(&sched);
            let token = token.clone();
            tokio::spawn(async move { sched.run(token).await })
        };

        // Cycles at t=0, t=10 and t=20
        tokio::time::sleep(Duration::from_secs(25)).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(cycle.runs.load(Ordering::SeqCst), 3);
    }
}
