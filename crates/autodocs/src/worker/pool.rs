use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, warn};

use crate::broadcast::JobEventBroadcaster;
use crate::db::Database;
use crate::error::WorkerError;
use crate::pipeline::{Pipeline, PipelineConfig};

use super::queue::JobQueue;
use super::runner::TaskRunner;
use super::scheduler::RetryScheduler;
use super::task::{Task, TaskOutcome, TaskReport};

pub struct WorkerPool {
    job_sender: Sender<Task>,
    result_receiver: Receiver<TaskReport>,
    workers: Vec<JoinHandle<()>>,
    scheduler: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
    events: Option<JobEventBroadcaster>,
}

impl WorkerPool {
    pub fn new(
        config: Arc<PipelineConfig>,
        db: Database,
        worker_count: usize,
        events: Option<JobEventBroadcaster>,
    ) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::SpawnFailed("worker_count must be > 0".to_string()));
        }

        // Both unbounded: enqueueing never waits on a busy worker, and a
        // worker never waits on a caller that stopped reading reports
        let (job_sender, job_receiver) = unbounded::<Task>();
        let (result_sender, result_receiver) = unbounded::<TaskReport>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let (retry, scheduler) = RetryScheduler::spawn(job_sender.clone(), Arc::clone(&shutdown))?;

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let retry = retry.clone();
            let runner = TaskRunner::new(
                db.clone(),
                Pipeline::from_config(Arc::clone(&config), db.clone()),
                events.clone(),
            );

            let handle = thread::Builder::new()
                .name(format!("autodocs-worker-{}", worker_id))
                .spawn(move || run_worker(worker_id, job_rx, result_tx, shutdown_flag, runner, retry))
                .map_err(|e| {
                    shutdown.store(true, Ordering::Relaxed);
                    WorkerError::SpawnFailed(e.to_string())
                })?;

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            job_sender,
            result_receiver,
            workers,
            scheduler,
            shutdown,
            events,
        })
    }

    pub fn submit(&self, task: Task) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        self.job_sender
            .send(task)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    pub fn try_recv_result(&self) -> Option<TaskReport> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<TaskReport> {
        self.result_receiver.recv().ok()
    }

    pub fn recv_result_timeout(&self, timeout: Duration) -> Option<TaskReport> {
        self.result_receiver.recv_timeout(timeout).ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Stops the pool and joins every thread. Delayed retries that are not
    /// yet due are dropped.
    pub fn wait(self) {
        self.shutdown.store(true, Ordering::Relaxed);
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        if let Err(e) = self.scheduler.join() {
            error!("Retry scheduler panicked: {:?}", e);
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

impl JobQueue for WorkerPool {
    fn enqueue(&self, job_id: &str, upload_path: &Path) -> Result<(), WorkerError> {
        self.submit(Task::new(job_id, upload_path))?;
        if let Some(events) = &self.events {
            events.tracker(job_id).queued();
        }
        Ok(())
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<Task>,
    result_sender: Sender<TaskReport>,
    shutdown: Arc<AtomicBool>,
    runner: TaskRunner,
    retry: RetryScheduler,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(task) => {
                debug!("Worker {} processing job {}", worker_id, task.job_id);

                let outcome = runner.execute(&task);
                let outcome = hand_off_retry(&runner, &retry, &task, outcome);

                let report = TaskReport {
                    job_id: task.job_id,
                    outcome,
                };
                if let Err(e) = result_sender.send(report) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

/// Passes a rescheduled task to the retry scheduler. A job whose retry
/// cannot be scheduled is failed rather than left `processing`.
fn hand_off_retry(runner: &TaskRunner, retry: &RetryScheduler, task: &Task, outcome: TaskOutcome) -> TaskOutcome {
    let delay = match outcome {
        TaskOutcome::Rescheduled { delay, .. } => delay,
        other => return other,
    };

    match retry.schedule(task.next_retry(), delay) {
        Ok(()) => outcome,
        Err(e) => {
            warn!("Could not reschedule job {}: {}", task.job_id, e);
            runner.abandon_retry(task, &e.to_string())
        }
    }
}
