//! The scan pipeline: workers, host-context handoff, and snapshot
//! publication.
//!
//! The scan worker ticks every [`SCAN_INTERVAL`] and submits the whole
//! cycle body as one job to the [`HostExecutor`], so object enumeration,
//! classification, tracking, and auto-opening all observe a single
//! point-in-time view under the controller lock. A handoff that misses
//! [`HANDOFF_TIMEOUT`] is a skipped cycle, not an error: the job's output
//! slot is abandoned and the previous snapshot stays published.
//!
//! Readers never block on a cycle. [`SnapshotHandle::load`] hands out the
//! last published `Arc<ScanSnapshot>` and publication swaps the whole
//! `Arc`, so a reader mid-iteration keeps a complete, immutable snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::entity::ClassifiedEntity;
use crate::host::{ExecOutcome, HostExecutor};
use crate::run::RunController;

/// Scan cadence.
pub const SCAN_INTERVAL: Duration = Duration::from_millis(250);

/// Housekeeping cadence.
pub const TIMER_INTERVAL: Duration = Duration::from_secs(1);

/// How long a cycle waits for the host context before it is skipped.
pub const HANDOFF_TIMEOUT: Duration = Duration::from_millis(500);

// =============================================================================
// Snapshots
// =============================================================================

/// One published scan result. Immutable after publication.
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    /// Every classified entity from the cycle, local player included.
    pub entities: Vec<ClassifiedEntity>,
    /// When the cycle ran.
    pub captured_at: Instant,
}

impl ScanSnapshot {
    /// An empty snapshot, published before the first cycle completes.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entities: Vec::new(),
            captured_at: Instant::now(),
        }
    }
}

/// Shared handle to the latest snapshot.
///
/// Cloning is cheap; every clone points at the same published slot.
#[derive(Clone)]
pub struct SnapshotHandle {
    slot: Arc<RwLock<Arc<ScanSnapshot>>>,
    lock_warning_issued: Arc<AtomicBool>,
}

impl SnapshotHandle {
    /// Creates a handle holding an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(RwLock::new(Arc::new(ScanSnapshot::empty()))),
            lock_warning_issued: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Publishes a new snapshot, replacing the previous one atomically.
    pub fn publish(&self, snapshot: ScanSnapshot) {
        let next = Arc::new(snapshot);
        match self.slot.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => {
                if !self.lock_warning_issued.swap(true, Ordering::Relaxed) {
                    warn!("snapshot_lock_poisoned");
                }
                *poisoned.into_inner() = next;
            }
        }
    }

    /// Returns the latest published snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<ScanSnapshot> {
        match self.slot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => {
                if !self.lock_warning_issued.swap(true, Ordering::Relaxed) {
                    warn!("snapshot_lock_poisoned");
                }
                Arc::clone(&poisoned.into_inner())
            }
        }
    }
}

impl Default for SnapshotHandle {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ScanPipeline
// =============================================================================

fn lock_controller(controller: &Arc<Mutex<RunController>>) -> std::sync::MutexGuard<'_, RunController> {
    match controller.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Runs one scan cycle through the host executor. Returns the cycle's
/// entities, or `None` for a skipped cycle (preconditions failed or the
/// handoff timed out).
fn run_one_cycle(
    controller: &Arc<Mutex<RunController>>,
    executor: &Arc<dyn HostExecutor>,
) -> Option<Vec<ClassifiedEntity>> {
    // Fresh slot per cycle: an abandoned job that completes after the
    // timeout writes into a slot nobody reads again.
    let output: Arc<Mutex<Option<Vec<ClassifiedEntity>>>> = Arc::new(Mutex::new(None));
    let job_output = Arc::clone(&output);
    let job_controller = Arc::clone(controller);

    let outcome = executor.run(
        Box::new(move || {
            let result = lock_controller(&job_controller).scan_cycle();
            if let Ok(mut slot) = job_output.lock() {
                *slot = result;
            }
        }),
        HANDOFF_TIMEOUT,
    );

    match outcome {
        ExecOutcome::Completed => match output.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        },
        ExecOutcome::TimedOut => {
            warn!("scan_handoff_timed_out");
            None
        }
    }
}

/// Owns the scan and housekeeping workers.
pub struct ScanPipeline {
    running: Arc<AtomicBool>,
    scan_worker: Option<JoinHandle<()>>,
    timer_worker: Option<JoinHandle<()>>,
    snapshots: SnapshotHandle,
}

impl ScanPipeline {
    /// Starts both workers.
    #[must_use]
    pub fn start(
        controller: Arc<Mutex<RunController>>,
        executor: Arc<dyn HostExecutor>,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let snapshots = SnapshotHandle::new();

        let scan_worker = {
            let running = Arc::clone(&running);
            let controller = Arc::clone(&controller);
            let snapshots = snapshots.clone();
            std::thread::Builder::new()
                .name("delvelens-scan".to_string())
                .spawn(move || {
                    while running.load(Ordering::Relaxed) {
                        if let Some(entities) = run_one_cycle(&controller, &executor) {
                            snapshots.publish(ScanSnapshot {
                                entities,
                                captured_at: Instant::now(),
                            });
                        }
                        std::thread::sleep(SCAN_INTERVAL);
                    }
                    debug!("scan_worker_stopped");
                })
                .ok()
        };

        let timer_worker = {
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("delvelens-timer".to_string())
                .spawn(move || {
                    while running.load(Ordering::Relaxed) {
                        lock_controller(&controller).on_timer_tick(Instant::now());
                        std::thread::sleep(TIMER_INTERVAL);
                    }
                    debug!("timer_worker_stopped");
                })
                .ok()
        };

        Self {
            running,
            scan_worker,
            timer_worker,
            snapshots,
        }
    }

    /// Handle for snapshot readers (the overlay renderer).
    #[must_use]
    pub fn snapshots(&self) -> SnapshotHandle {
        self.snapshots.clone()
    }

    /// Stops both workers and waits for them to finish their current tick.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.scan_worker.take() {
            let _ = worker.join();
        }
        if let Some(worker) = self.timer_worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for ScanPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Tests
// =============================================================================
