//! Fixed-period orchestrator: aggregate → regulate → persist → notify.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::aggregate::Aggregator;
use super::regulate::Regulator;
use super::types::{CycleRecord, CycleReport, records_for};
use crate::error::SinkError;
use crate::inference::Inference;
use crate::io::PersistenceSink;
use crate::site::SiteStateStore;
use crate::state::SharedState;

/// Restores cumulative energy from the sink before the first cycle.
///
/// Returns the number of sites restored.
///
/// # Errors
///
/// Returns the sink's error unchanged; callers must treat it as fatal.
pub fn hydrate_energy<S: PersistenceSink + ?Sized>(
    store: &SiteStateStore,
    sink: &S,
) -> Result<usize, SinkError> {
    let totals = sink.last_energy()?;
    let sites = totals.len();
    store.hydrate(totals);
    info!(sites, "hydrated cumulative energy");
    Ok(sites)
}

type Flush = (u64, Vec<CycleRecord>);

fn persist<S: PersistenceSink + ?Sized>(sink: &S, cycle: u64, records: &[CycleRecord]) {
    if let Err(e) = sink.write_cycle(records) {
        warn!(cycle, error = %e, "persistence failed, cycle not recorded");
    }
}

/// Single blocking-pool task that writes flushes in the order they were
/// queued. Ends once the sender is dropped and the queue is drained.
fn spawn_writer<S: PersistenceSink>(handle: &Handle, sink: Arc<S>) -> mpsc::UnboundedSender<Flush> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Flush>();
    handle.spawn_blocking(move || {
        while let Some((cycle, records)) = rx.blocking_recv() {
            persist(sink.as_ref(), cycle, &records);
        }
    });
    tx
}

/// Drives one cycle per period over the shared state.
///
/// Generic over the inference capability and the sink for static dispatch.
pub struct CycleScheduler<I, S> {
    shared: Arc<SharedState>,
    aggregator: Aggregator,
    regulator: Regulator<I>,
    sink: Arc<S>,
    writer: Option<mpsc::UnboundedSender<Flush>>,
    cycle: u64,
}

impl<I: Inference, S: PersistenceSink> CycleScheduler<I, S> {
    pub fn new(shared: Arc<SharedState>, regulator: Regulator<I>, sink: Arc<S>) -> Self {
        Self {
            aggregator: Aggregator::new(shared.config),
            shared,
            regulator,
            sink,
            writer: None,
            cycle: 0,
        }
    }

    /// Number of cycles completed so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Runs one complete cycle and returns what was published.
    ///
    /// Contains no await points, so a started cycle always finishes.
    pub fn run_cycle(&mut self) -> CycleReport {
        self.cycle += 1;
        let cycle = self.cycle;
        let shared = Arc::clone(&self.shared);

        // (a) sessions may start collecting for the next boundary
        shared.hub.open_window(cycle);

        // (b) consume pending batches, integrate energy
        let buffer = self.aggregator.aggregate(&shared.pending, &shared.store);

        // (c) regulate against the finalized buffer, commit in one swap
        let prior = shared.store.commands();
        let commands = Arc::new(self.regulator.regulate(&buffer, &prior));
        shared.store.commit_commands(Arc::clone(&commands));

        // (d) persist without waiting
        let completed_at = Utc::now();
        self.flush(cycle, records_for(&buffer, completed_at));

        // (e) wake actuator sessions
        let report = CycleReport {
            cycle,
            completed_at,
            buffer: Arc::new(buffer),
            commands,
        };
        shared.hub.publish(report.clone());

        debug!(cycle, sites = report.buffer.len(), "cycle complete");
        report
    }

    /// Queues records for the writer task, or writes inline when no
    /// runtime is present.
    fn flush(&mut self, cycle: u64, records: Vec<CycleRecord>) {
        if records.is_empty() {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            persist(self.sink.as_ref(), cycle, &records);
            return;
        };
        let writer = self
            .writer
            .get_or_insert_with(|| spawn_writer(&handle, Arc::clone(&self.sink)));
        if writer.send((cycle, records)).is_err() {
            warn!(cycle, "record writer gone, cycle not recorded");
            self.writer = None;
        }
    }

    /// Ticks every period until `shutdown` resolves.
    ///
    /// The first cycle runs one full period after start. Late ticks are
    /// delayed rather than bunched. A cycle that panics is logged and the
    /// next tick runs as usual.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) {
        let period = self.shared.config.period;
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        info!(period_ms = period.as_millis() as u64, "cycle scheduler started");
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if panic::catch_unwind(AssertUnwindSafe(|| self.run_cycle())).is_err() {
                        error!(cycle = self.cycle, "cycle panicked, continuing with next tick");
                    }
                }
                () = &mut shutdown => break,
            }
        }
        info!(cycles = self.cycle, "cycle scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::cycle::types::CycleConfig;
    use crate::inference::{FuzzyInference, Rule};
    use crate::io::MemorySink;
    use crate::site::{Field, ReadingBatch, Subsystem, TenantLocation};

    fn roof() -> TenantLocation {
        TenantLocation::new("Acme", "Roof").unwrap()
    }

    fn scheduler(sink: Arc<MemorySink>) -> CycleScheduler<FuzzyInference, MemorySink> {
        let shared = SharedState::new(CycleConfig::new(Duration::from_secs(3)));
        CycleScheduler::new(shared, Regulator::with_catalogue(FuzzyInference::new()), sink)
    }

    fn batch(fields: &[(Field, f64)]) -> ReadingBatch {
        let mut b = ReadingBatch::default();
        for (f, v) in fields {
            b.set(*f, Some(*v));
        }
        b
    }

    #[test]
    fn cycle_publishes_buffer_and_commands() {
        let sink = Arc::new(MemorySink::new());
        let mut sched = scheduler(Arc::clone(&sink));
        let mut done = sched.shared.hub.subscribe_complete();
        sched
            .shared
            .pending
            .submit(roof(), batch(&[(Field::Temperature, 45.0), (Field::InstantaneousPower, 1000.0)]));

        let report = sched.run_cycle();

        assert_eq!(report.cycle, 1);
        assert!(done.has_changed().unwrap());
        assert!(report.commands[&roof()].level(Subsystem::AirConditioner) > 85.0);
        assert_eq!(sched.shared.store.commands(), report.commands);
        assert!(report.buffer[&roof()].cumulative_energy_kwh > 0.0);
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn cycle_opens_ingestion_window() {
        let mut sched = scheduler(Arc::new(MemorySink::new()));
        let window = sched.shared.hub.subscribe_window();
        sched.run_cycle();
        sched.run_cycle();
        assert_eq!(*window.borrow(), 2);
        assert_eq!(sched.cycle(), 2);
    }

    #[test]
    fn empty_cycle_writes_nothing() {
        let sink = Arc::new(MemorySink::new());
        let mut sched = scheduler(Arc::clone(&sink));
        let report = sched.run_cycle();
        assert!(report.buffer.is_empty());
        assert_eq!(sink.write_count(), 0);
    }

    #[test]
    fn persistence_failure_does_not_roll_back() {
        let sink = Arc::new(MemorySink::new());
        sink.fail_writes(true);
        let mut sched = scheduler(Arc::clone(&sink));
        sched
            .shared
            .pending
            .submit(roof(), batch(&[(Field::InstantaneousPower, 3600.0)]));

        let report = sched.run_cycle();

        assert!((sched.shared.store.energy_kwh(&roof()) - 0.003).abs() < 1e-12);
        assert!(report.commands.contains_key(&roof()));
        assert!(sink.records().is_empty());

        sched
            .shared
            .pending
            .submit(roof(), batch(&[(Field::InstantaneousPower, 3600.0)]));
        assert_eq!(sched.run_cycle().cycle, 2);
    }

    #[test]
    fn restart_hydrates_last_persisted_total() {
        let sink = Arc::new(MemorySink::new());
        let mut sched = scheduler(Arc::clone(&sink));
        sched.shared.store.hydrate(HashMap::from([(roof(), 2.0)]));
        sched
            .shared
            .pending
            .submit(roof(), batch(&[(Field::InstantaneousPower, 3600.0)]));
        sched.run_cycle();

        let restarted = SiteStateStore::new();
        assert_eq!(hydrate_energy(&restarted, sink.as_ref()).unwrap(), 1);
        assert!((restarted.energy_kwh(&roof()) - 2.003).abs() < 1e-12);
    }

    #[test]
    fn hydration_failure_is_reported() {
        let sink = MemorySink::new();
        sink.fail_reads(true);
        assert!(hydrate_energy(&SiteStateStore::new(), &sink).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn run_until_ticks_each_period() {
        let sink = Arc::new(MemorySink::new());
        let sched = scheduler(sink);
        let shared = Arc::clone(&sched.shared);
        let mut done = shared.hub.subscribe_complete();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let task = tokio::spawn(sched.run_until(async {
            let _ = stop_rx.await;
        }));

        done.changed().await.unwrap();
        assert_eq!(done.borrow_and_update().cycle, 1);
        done.changed().await.unwrap();
        assert_eq!(done.borrow_and_update().cycle, 2);

        stop_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn queued_writes_land_in_cycle_order() {
        let sink = Arc::new(MemorySink::new());
        let mut sched = scheduler(Arc::clone(&sink));
        for _ in 0..20 {
            sched
                .shared
                .pending
                .submit(roof(), batch(&[(Field::InstantaneousPower, 3600.0)]));
            sched.run_cycle();
        }
        drop(sched);

        for _ in 0..500 {
            if sink.write_count() == 20 {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        let energies: Vec<f64> = sink.records().iter().map(|r| r.cumulative_energy).collect();
        assert_eq!(energies.len(), 20);
        assert!(energies.windows(2).all(|w| w[0] < w[1]), "{energies:?}");
    }

    struct FaultsOnce {
        tripped: AtomicBool,
        inner: FuzzyInference,
    }

    impl Inference for FaultsOnce {
        fn infer(&self, rule: Rule, value: f64) -> Option<f64> {
            if !self.tripped.swap(true, Ordering::SeqCst) {
                panic!("inference fault");
            }
            self.inner.infer(rule, value)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_cycle_does_not_stop_ticking() {
        let shared = SharedState::new(CycleConfig::new(Duration::from_secs(3)));
        let regulator = Regulator::with_catalogue(FaultsOnce {
            tripped: AtomicBool::new(false),
            inner: FuzzyInference::new(),
        });
        let sched = CycleScheduler::new(Arc::clone(&shared), regulator, Arc::new(MemorySink::new()));
        let mut done = shared.hub.subscribe_complete();
        shared
            .pending
            .submit(roof(), batch(&[(Field::Temperature, 45.0)]));
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let task = tokio::spawn(sched.run_until(async {
            let _ = stop_rx.await;
        }));

        // cycle 1 panics before publishing
        done.changed().await.unwrap();
        assert_eq!(done.borrow_and_update().cycle, 2);

        shared
            .pending
            .submit(roof(), batch(&[(Field::Temperature, 45.0)]));
        done.changed().await.unwrap();
        let report = done.borrow_and_update().clone();
        assert_eq!(report.cycle, 3);
        assert!(report.commands[&roof()].level(Subsystem::AirConditioner) > 85.0);

        stop_tx.send(()).unwrap();
        task.await.unwrap();
    }
}
