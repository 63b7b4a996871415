use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use log::{debug, error, info};

use crate::error::WorkerError;
use crate::worker::job::SummarizeJob;
use crate::worker::JobHandler;

/// How long `submit` waits for room in a full queue.
const DEFAULT_ENQUEUE_TIMEOUT: Duration = Duration::from_secs(2);

pub struct WorkerPool {
    job_sender: Sender<SummarizeJob>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    enqueue_timeout: Duration,
}

impl WorkerPool {
    /// Starts `worker_count` threads pulling from a queue holding at most
    /// `queue_capacity` jobs.
    pub fn new(
        handler: Arc<dyn JobHandler>,
        worker_count: usize,
        queue_capacity: usize,
    ) -> Result<Self, WorkerError> {
        let worker_count = worker_count.max(1);
        let (job_sender, job_receiver) = bounded::<SummarizeJob>(queue_capacity.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let worker_handler = Arc::clone(&handler);

            let handle = thread::Builder::new()
                .name(format!("docsum-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(worker_id, job_rx, worker_handler);
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            job_sender,
            workers,
            shutdown,
            enqueue_timeout: DEFAULT_ENQUEUE_TIMEOUT,
        })
    }

    pub fn with_enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.enqueue_timeout = timeout;
        self
    }

    /// Enqueues a job, waiting up to the enqueue timeout while the queue is
    /// full. Fails when the pool is shutting down or no room frees up.
    pub fn submit(&self, job: SummarizeJob) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        self.job_sender
            .send_timeout(job, self.enqueue_timeout)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(job) => {
                    WorkerError::QueueFull(job.submission_id.to_string())
                }
                SendTimeoutError::Disconnected(_) => WorkerError::ChannelClosed,
            })
    }

    /// Jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.job_sender.len()
    }

    /// Stops intake. Jobs already queued still run.
    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Waits for the workers to drain the queue and exit.
    pub fn wait(self) {
        let pending = self.queued();
        if pending > 0 {
            info!("Draining {} queued jobs", pending);
        }
        // Workers exit once the channel is empty and disconnected.
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(worker_id: usize, job_receiver: Receiver<SummarizeJob>, handler: Arc<dyn JobHandler>) {
    debug!("Worker {} started", worker_id);

    while let Ok(job) = job_receiver.recv() {
        debug!(
            "Worker {} processing submission {} (job {})",
            worker_id, job.submission_id, job.id
        );
        handler.handle(job);
    }

    debug!("Worker {} stopped", worker_id);
}
