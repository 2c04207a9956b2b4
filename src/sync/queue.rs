use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use panel_db::settings::DeviceSettings;
use serde::Serialize;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use super::pusher::{PushOutcome, SyncPusher};

/// Pending pushes beyond this are dropped, not buffered.
pub const QUEUE_CAPACITY: usize = 32;

/// Background deliveries whose outcome the caller does not wait for.
#[derive(Debug, Clone)]
pub enum SyncJob {
    Settings {
        address: Option<String>,
        settings: DeviceSettings,
    },
}

impl SyncJob {
    fn name(&self) -> &'static str {
        match self {
            SyncJob::Settings { .. } => "settings",
        }
    }
}

#[derive(Debug, Default)]
struct SyncStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncCounters {
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl SyncStats {
    fn record(&self, outcome: &PushOutcome) {
        match outcome {
            PushOutcome::Delivered => self.delivered.fetch_add(1, Ordering::Relaxed),
            PushOutcome::Skipped { .. } => self.dropped.fetch_add(1, Ordering::Relaxed),
            PushOutcome::Failed { .. } => self.failed.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn snapshot(&self) -> SyncCounters {
        SyncCounters {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

pub struct SyncQueue {
    tx: mpsc::Sender<SyncJob>,
    stats: Arc<SyncStats>,
}

async fn run(pusher: &SyncPusher, job: SyncJob) -> PushOutcome {
    match job {
        SyncJob::Settings { address, settings } => {
            pusher.push_settings(address.as_deref(), &settings).await
        }
    }
}

impl SyncQueue {
    /// Spawns the dispatcher. At most `workers` pushes are in flight at once; the
    /// dispatcher stops taking jobs once `cancel` fires.
    pub fn start(pusher: Arc<SyncPusher>, workers: usize, cancel: CancellationToken) -> Self {
        let (tx, mut rx) = mpsc::channel::<SyncJob>(QUEUE_CAPACITY);
        let stats = Arc::new(SyncStats::default());
        let permits = Arc::new(Semaphore::new(workers.max(1)));

        let worker_stats = stats.clone();
        tokio::spawn(async move {
            loop {
                let job = tokio::select! {
                    _ = cancel.cancelled() => break,
                    job = rx.recv() => match job {
                        Some(job) => job,
                        None => break,
                    },
                };
                let Ok(permit) = permits.clone().acquire_owned().await else {
                    break;
                };
                let pusher = pusher.clone();
                let stats = worker_stats.clone();
                tokio::spawn(async move {
                    let name = job.name();
                    let outcome = run(&pusher, job).await;
                    log::debug!("sync job {} finished: {:?}", name, outcome);
                    stats.record(&outcome);
                    drop(permit);
                });
            }
            log::info!("sync queue stopped");
        });

        Self { tx, stats }
    }

    /// Queues `job` without waiting. Returns false when it was dropped because the
    /// queue is full or stopped.
    pub fn submit(&self, job: SyncJob) -> bool {
        let name = job.name();
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("sync job {} dropped: {}", name, e);
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn counters(&self) -> SyncCounters {
        self.stats.snapshot()
    }
}
