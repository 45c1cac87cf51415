use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use log::{debug, error, warn};

use crate::error::WorkerError;

use super::task::Task;

/// How often the scheduler thread rechecks the shutdown flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Delayed {
    due: Instant,
    seq: u64,
    task: Task,
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delayed {
    // Reversed so the max-heap pops the earliest due task first
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Holds rescheduled tasks until they are due, then feeds them back into the
/// worker channel.
#[derive(Clone)]
pub struct RetryScheduler {
    sender: Sender<(Instant, Task)>,
}

impl RetryScheduler {
    /// Starts the scheduler thread.
    pub fn spawn(
        work_sender: Sender<Task>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<(Self, JoinHandle<()>), WorkerError> {
        let (sender, receiver) = unbounded();
        let handle = thread::Builder::new()
            .name("autodocs-retry".to_string())
            .spawn(move || run_scheduler(receiver, work_sender, shutdown))
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

        Ok((Self { sender }, handle))
    }

    pub fn schedule(&self, task: Task, delay: Duration) -> Result<(), WorkerError> {
        self.sender
            .send((Instant::now() + delay, task))
            .map_err(|_| WorkerError::ChannelClosed)
    }
}

fn run_scheduler(receiver: Receiver<(Instant, Task)>, work_sender: Sender<Task>, shutdown: Arc<AtomicBool>) {
    debug!("Retry scheduler started");

    let mut heap = BinaryHeap::new();
    let mut seq = 0u64;

    'outer: loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        let wait = heap
            .peek()
            .map(|d: &Delayed| d.due.saturating_duration_since(Instant::now()))
            .unwrap_or(POLL_INTERVAL)
            .min(POLL_INTERVAL);

        match receiver.recv_timeout(wait) {
            Ok((due, task)) => {
                heap.push(Delayed { due, seq, task });
                seq += 1;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Retry scheduler channel disconnected");
                break;
            }
        }

        while heap.peek().is_some_and(|d| d.due <= Instant::now()) {
            let Some(Delayed { task, .. }) = heap.pop() else {
                break;
            };
            let mut pending = task;
            loop {
                match work_sender.send_timeout(pending, POLL_INTERVAL) {
                    Ok(()) => break,
                    Err(SendTimeoutError::Timeout(task)) => {
                        if shutdown.load(Ordering::Relaxed) {
                            warn!("Dropping retry of job {} during shutdown", task.job_id);
                            break 'outer;
                        }
                        pending = task;
                    }
                    Err(SendTimeoutError::Disconnected(task)) => {
                        error!("Worker channel closed, dropping retry of job {}", task.job_id);
                        break 'outer;
                    }
                }
            }
        }
    }

    if !heap.is_empty() {
        warn!("Retry scheduler stopped with {} delayed tasks undelivered", heap.len());
    }
    debug!("Retry scheduler stopped");
}
