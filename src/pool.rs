use crossbeam_channel::{unbounded, SendError, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::OnceLock;

type Job = Box<dyn FnOnce() + Send>;

/// Long-lived worker threads that run fan-out search tasks.
///
/// Workers pull jobs from one shared channel. A panicking job is caught so
/// the worker survives; jobs report their own completion through drop guards.
pub struct SearchPool {
    sender: Option<Sender<Job>>,
    workers: usize,
}

/// Returns the number of workers started by the global pool.
fn default_worker_amount() -> usize {
    std::thread::available_parallelism().map_or(1, usize::from)
}

impl SearchPool {
    /// The process-wide pool, started on first use.
    pub fn global() -> &'static SearchPool {
        static POOL: OnceLock<SearchPool> = OnceLock::new();
        POOL.get_or_init(|| SearchPool::new(default_worker_amount()))
    }

    /// Starts up to `size` workers.
    ///
    /// Workers that fail to start are skipped. With no worker at all, jobs
    /// run on the submitting thread.
    pub fn new(size: usize) -> Self {
        let (sender, receiver) = unbounded::<Job>();
        let mut workers = 0;
        for id in 0..size {
            let receiver = receiver.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("bucketmap-search-{id}"))
                .spawn(move || {
                    for job in receiver.iter() {
                        run(job);
                    }
                });
            match spawned {
                Ok(_) => workers += 1,
                Err(err) => {
                    tracing::warn!(%err, id, "failed to start search worker");
                    break;
                }
            }
        }
        tracing::debug!(workers, "started search pool");
        Self {
            sender: (workers > 0).then_some(sender),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `job` on a worker, or on the calling thread if none is available.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let job: Job = Box::new(job);
        match &self.sender {
            Some(sender) => {
                if let Err(SendError(job)) = sender.send(job) {
                    run(job);
                }
            }
            None => run(job),
        }
    }
}

fn run(job: Job) {
    let _ = catch_unwind(AssertUnwindSafe(job));
}
