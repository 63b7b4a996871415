pub mod job;
pub mod pool;

pub use job::SummarizeJob;
pub use pool::WorkerPool;

/// Runs queued jobs on worker threads.
pub trait JobHandler: Send + Sync {
    fn handle(&self, job: SummarizeJob);
}
