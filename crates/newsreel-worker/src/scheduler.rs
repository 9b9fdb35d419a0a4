//! Fixed-interval job scheduler.
//!
//! Shutdown: [`Scheduler::stop`] signals every job loop and waits for the
//! loops to exit. A job run already in flight finishes before its loop
//! observes the signal, so stop() never interrupts a half-done sweep.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A unit of periodic background work. One run per tick; a failed run is
/// logged and the next tick proceeds normally.
#[async_trait]
pub trait Job: Send + Sync {
    async fn run(&self) -> Result<()>;
}

struct JobDescriptor {
    name: &'static str,
    interval: Duration,
    job: Arc<dyn Job>,
}

/// Owns the registered jobs and their loop tasks.
pub struct Scheduler {
    jobs: Vec<JobDescriptor>,
    handles: Vec<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            jobs: Vec::new(),
            handles: Vec::new(),
            shutdown_tx,
        }
    }

    /// Register a job to run every `interval`. Must be called before
    /// [`Scheduler::start`].
    pub fn register(&mut self, name: &'static str, interval: Duration, job: Arc<dyn Job>) {
        self.jobs.push(JobDescriptor {
            name,
            interval,
            job,
        });
    }

    /// Spawn one loop task per registered job. The first tick fires after a
    /// full interval, not immediately, so startup is not front-loaded with
    /// every sweep at once.
    pub fn start(&mut self) {
        for descriptor in self.jobs.drain(..) {
            let mut shutdown_rx = self.shutdown_tx.subscribe();
            let handle = tokio::spawn(async move {
                tracing::info!(
                    job = descriptor.name,
                    interval_secs = descriptor.interval.as_secs(),
                    "Scheduled job started"
                );

                let mut interval = tokio::time::interval(descriptor.interval);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                // Consume the immediate first tick.
                interval.tick().await;

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            if let Err(e) = descriptor.job.run().await {
                                tracing::error!(job = descriptor.name, error = %e, "Scheduled job run failed");
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            tracing::info!(job = descriptor.name, "Scheduled job stopped");
                            break;
                        }
                    }
                }
            });
            self.handles.push(handle);
        }
    }

    /// Signal all job loops to exit and wait for them.
    pub async fn stop(self) {
        tracing::info!("Stopping scheduler");
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
        tracing::info!("Scheduler stopped");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingJob {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Job for CountingJob {
        async fn run(&self) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingJob {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Job for FailingJob {
        async fn run(&self) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("probe unavailable")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_tick_at_their_interval() {
        let job = Arc::new(CountingJob {
            runs: AtomicUsize::new(0),
        });

        let mut scheduler = Scheduler::new();
        scheduler.register("counting", Duration::from_secs(10), job.clone());
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(35)).await;
        scheduler.stop().await;

        assert_eq!(job.runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_run_does_not_stop_the_loop() {
        let job = Arc::new(FailingJob {
            runs: AtomicUsize::new(0),
        });

        let mut scheduler = Scheduler::new();
        scheduler.register("failing", Duration::from_secs(10), job.clone());
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(25)).await;
        scheduler.stop().await;

        assert_eq!(job.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_exits_before_first_tick() {
        let job = Arc::new(CountingJob {
            runs: AtomicUsize::new(0),
        });

        let mut scheduler = Scheduler::new();
        scheduler.register("counting", Duration::from_secs(60), job.clone());
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(1)).await;
        scheduler.stop().await;

        assert_eq!(job.runs.load(Ordering::SeqCst), 0);
    }
}
