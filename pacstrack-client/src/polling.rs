//! Recurring server probes.
//!
//! A [`PollingScheduler`] owns one spawned loop. Dropping the scheduler or
//! calling [`PollingScheduler::stop`] ends it; a probe that is already in
//! flight may finish, but its output is discarded.

use async_trait::async_trait;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

/// When probes run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Every period, starting one period after the loop starts. A job that
    /// finishes sooner sees no probe at all.
    FixedRate(Duration),
    /// Immediately, then again `delay` after each probe finished. Probes
    /// never overlap.
    FixedDelay(Duration),
}

/// One unit of polling work: fetch, then apply the result.
#[async_trait]
pub trait Probe: Send + 'static {
    type Output: Send;

    async fn probe(&mut self) -> ApiResult<Self::Output>;

    /// Runs only while the scheduler is live.
    fn apply(&mut self, output: Self::Output);

    /// A probe failed while the scheduler is live. The loop keeps going
    /// either way.
    fn failed(&mut self, _err: &ApiError) {}
}

#[derive(Debug)]
pub struct PollingScheduler {
    name: &'static str,
    token: CancellationToken,
    applied: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl PollingScheduler {
    /// Spawn the loop on the current runtime.
    pub fn start<P: Probe>(name: &'static str, cadence: Cadence, probe: P) -> Self {
        let token = CancellationToken::new();
        let applied = Arc::new(AtomicU64::new(0));
        let handle = tokio::spawn(run_loop(
            name,
            cadence,
            probe,
            token.clone(),
            applied.clone(),
        ));
        debug!(poller = name, ?cadence, "polling started");

        Self {
            name,
            token,
            applied,
            handle: Some(handle),
        }
    }

    /// Idempotent.
    pub fn stop(&self) {
        if !self.token.is_cancelled() {
            debug!(poller = self.name, "polling stopped");
            self.token.cancel();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Number of probe results applied so far.
    pub fn applied_ticks(&self) -> u64 {
        self.applied.load(Ordering::Acquire)
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take()
            && let Err(err) = handle.await
        {
            warn!(poller = self.name, "polling task ended abnormally: {err}");
        }
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run_loop<P: Probe>(
    name: &'static str,
    cadence: Cadence,
    mut probe: P,
    token: CancellationToken,
    applied: Arc<AtomicU64>,
) {
    match cadence {
        Cadence::FixedRate(period) => {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                run_tick(name, &mut probe, &token, &applied).await;
            }
        }
        Cadence::FixedDelay(delay) => loop {
            if token.is_cancelled() {
                break;
            }
            run_tick(name, &mut probe, &token, &applied).await;
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = sleep(delay) => {}
            }
        },
    }
    debug!(poller = name, "polling loop exited");
}

async fn run_tick<P: Probe>(
    name: &'static str,
    probe: &mut P,
    token: &CancellationToken,
    applied: &AtomicU64,
) {
    match probe.probe().await {
        Ok(_) if token.is_cancelled() => {
            debug!(poller = name, "discarding probe result after stop");
        }
        Ok(output) => {
            probe.apply(output);
            applied.fetch_add(1, Ordering::AcqRel);
        }
        Err(_) if token.is_cancelled() => {
            debug!(poller = name, "discarding probe failure after stop");
        }
        // The next tick tries again.
        Err(err) => {
            warn!(poller = name, "probe failed: {err}");
            probe.failed(&err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct Counts {
        probes: u64,
        applied: Vec<u64>,
        failures: u64,
        in_flight: bool,
        overlapped: bool,
    }

    struct CountingProbe {
        counts: Arc<Mutex<Counts>>,
        fail_every_other: bool,
        work: Duration,
    }

    impl CountingProbe {
        fn new(counts: Arc<Mutex<Counts>>) -> Self {
            Self {
                counts,
                fail_every_other: false,
                work: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl Probe for CountingProbe {
        type Output = u64;

        async fn probe(&mut self) -> ApiResult<u64> {
            let n = {
                let mut counts = self.counts.lock();
                if counts.in_flight {
                    counts.overlapped = true;
                }
                counts.in_flight = true;
                counts.probes += 1;
                counts.probes
            };
            if !self.work.is_zero() {
                sleep(self.work).await;
            }
            self.counts.lock().in_flight = false;
            if self.fail_every_other && n % 2 == 0 {
                return Err(ApiError::transport("http://test/progress", "refused"));
            }
            Ok(n)
        }

        fn apply(&mut self, output: u64) {
            self.counts.lock().applied.push(output);
        }

        fn failed(&mut self, _err: &ApiError) {
            self.counts.lock().failures += 1;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_rate_first_probe_waits_one_period() {
        let counts = Arc::new(Mutex::new(Counts::default()));
        let poller = PollingScheduler::start(
            "test",
            Cadence::FixedRate(Duration::from_secs(1)),
            CountingProbe::new(counts.clone()),
        );

        sleep(Duration::from_millis(999)).await;
        assert_eq!(counts.lock().probes, 0);

        sleep(Duration::from_millis(2_100)).await;
        assert_eq!(counts.lock().probes, 3);
        assert_eq!(poller.applied_ticks(), 3);
        poller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn job_finishing_before_first_period_sees_zero_probes() {
        let counts = Arc::new(Mutex::new(Counts::default()));
        let poller = PollingScheduler::start(
            "test",
            Cadence::FixedRate(Duration::from_secs(1)),
            CountingProbe::new(counts.clone()),
        );

        sleep(Duration::from_millis(300)).await;
        poller.stop();
        sleep(Duration::from_secs(10)).await;

        assert_eq!(counts.lock().probes, 0);
        assert!(poller.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn no_effects_after_stop() {
        let counts = Arc::new(Mutex::new(Counts::default()));
        let poller = PollingScheduler::start(
            "test",
            Cadence::FixedRate(Duration::from_secs(1)),
            CountingProbe::new(counts.clone()),
        );

        sleep(Duration::from_millis(2_500)).await;
        poller.stop();
        poller.stop();
        let applied_at_stop = counts.lock().applied.len();

        sleep(Duration::from_secs(10)).await;
        let counts = counts.lock();
        assert_eq!(counts.applied.len(), applied_at_stop);
        assert!(counts.probes <= applied_at_stop as u64 + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_result_is_discarded_once_stopped() {
        let counts = Arc::new(Mutex::new(Counts::default()));
        let mut probe = CountingProbe::new(counts.clone());
        probe.work = Duration::from_millis(500);
        let poller = PollingScheduler::start(
            "test",
            Cadence::FixedRate(Duration::from_secs(1)),
            probe,
        );

        // First probe starts at 1s and is still running at 1.2s.
        sleep(Duration::from_millis(1_200)).await;
        poller.stop();
        sleep(Duration::from_secs(2)).await;

        let counts = counts.lock();
        assert_eq!(counts.probes, 1);
        assert!(counts.applied.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probes_do_not_stop_the_loop() {
        let counts = Arc::new(Mutex::new(Counts::default()));
        let mut probe = CountingProbe::new(counts.clone());
        probe.fail_every_other = true;
        let poller = PollingScheduler::start(
            "test",
            Cadence::FixedRate(Duration::from_secs(1)),
            probe,
        );

        sleep(Duration::from_millis(4_500)).await;
        poller.shutdown().await;

        let counts = counts.lock();
        assert_eq!(counts.probes, 4);
        assert_eq!(counts.applied, vec![1, 3]);
        assert_eq!(counts.failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_runs_immediately_and_never_overlaps() {
        let counts = Arc::new(Mutex::new(Counts::default()));
        let mut probe = CountingProbe::new(counts.clone());
        probe.work = Duration::from_millis(1_500);
        let poller = PollingScheduler::start(
            "tasks",
            Cadence::FixedDelay(Duration::from_secs(2)),
            probe,
        );

        sleep(Duration::from_millis(10)).await;
        assert_eq!(counts.lock().probes, 1);

        // Probes start at 0s, 3.5s, 7s.
        sleep(Duration::from_millis(7_200)).await;
        poller.shutdown().await;

        let counts = counts.lock();
        assert_eq!(counts.probes, 3);
        assert!(!counts.overlapped);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_scheduler_stops_the_loop() {
        let counts = Arc::new(Mutex::new(Counts::default()));
        let poller = PollingScheduler::start(
            "tasks",
            Cadence::FixedDelay(Duration::from_secs(2)),
            CountingProbe::new(counts.clone()),
        );
        sleep(Duration::from_millis(10)).await;
        drop(poller);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(counts.lock().probes, 1);
    }
}
