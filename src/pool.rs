//! Fixed-size worker pool serving all virtual file system fan-out.

use std::thread;

use tracing::trace;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed set of worker threads pulling jobs from a single queue.
///
/// The pool bounds concurrency: submitting is cheap and never blocks, but
/// at most `size` jobs run at any moment. Dropping the pool closes the
/// queue, lets queued jobs finish, and joins every worker.
pub struct ThreadPool {
    queue: async_channel::Sender<Job>,
    workers: Vec<thread::JoinHandle<()>>,
    size: usize,
}

/// Completion handle for one submitted job.
pub struct TaskHandle<T> {
    done: async_channel::Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the job finishes and yields its result.
    ///
    /// Returns `None` when the pool shut down before the job could run.
    pub fn wait(self) -> Option<T> {
        self.done.recv_blocking().ok()
    }
}

impl ThreadPool {
    /// Spawns `size` workers. A size of zero is clamped to one.
    pub fn new(size: usize) -> ThreadPool {
        let size = size.max(1);
        let (queue, jobs) = async_channel::unbounded::<Job>();

        let workers = (0..size)
            .map(|index| {
                let jobs = jobs.clone();
                thread::Builder::new()
                    .name(format!("vfs-worker-{index}"))
                    .spawn(move || {
                        while let Ok(job) = jobs.recv_blocking() {
                            job();
                        }
                        trace!(index, "worker exiting");
                    })
                    .expect("spawn pool worker")
            })
            .collect();

        ThreadPool { queue, workers, size }
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Queues a job and returns its completion handle.
    pub fn execute<T, F>(&self, job: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, done) = async_channel::bounded(1);
        let boxed: Job = Box::new(move || {
            let _ = tx.send_blocking(job());
        });
        // Fails only once the queue is closed; the handle then resolves
        // to `None`.
        let _ = self.queue.send_blocking(boxed);
        TaskHandle { done }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.queue.close();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
