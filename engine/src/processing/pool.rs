use std::{collections::VecDeque, sync::Arc};

use log::{debug, error};
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use tokio::sync::mpsc;

use crate::error::{EngineErr, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// The pending jobs of one invocation.
struct Lane {
    id: u64,
    jobs: VecDeque<Job>,
}

/// Round robin admission of jobs across the invocations sharing the pool.
///
/// Every spawned pool task pops the next job of the lane at the front and moves
/// that lane to the back, so an invocation with many batches can't starve the
/// ones submitted after it.
#[derive(Default)]
struct Admission {
    next_lane: u64,
    lanes: VecDeque<Lane>,
}

impl Admission {
    fn push_lane(&mut self, jobs: VecDeque<Job>) -> u64 {
        let id = self.next_lane;
        self.next_lane += 1;
        self.lanes.push_back(Lane { id, jobs });
        id
    }

    fn pop(&mut self) -> Option<Job> {
        let mut lane = self.lanes.pop_front()?;
        let job = lane.jobs.pop_front();

        if lane.jobs.is_empty() {
            debug!(lane = lane.id; "lane drained");
        } else {
            self.lanes.push_back(lane);
        }

        job
    }
}

/// The process wide pool running the batch processing jobs of every master component.
pub struct WorkerPool {
    pool: ThreadPool,
    admission: Arc<Mutex<Admission>>,
}

impl WorkerPool {
    /// Creates a new `WorkerPool`.
    ///
    /// # Arguments
    /// * `num_threads` - The amount of worker threads.
    ///
    /// # Returns
    /// The pool or an `InternalError` if the threads can't be spawned.
    pub fn new(num_threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads.max(1))
            .thread_name(|i| format!("batch-worker-{i}"))
            .panic_handler(|_| error!("a batch worker panicked"))
            .build()
            .map_err(|e| EngineErr::Internal(format!("failed to build the worker pool: {e}")))?;

        Ok(Self {
            pool,
            admission: Arc::default(),
        })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Applies `f` to every item in parallel.
    ///
    /// # Returns
    /// The results in the same order as `items`.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        self.pool.install(|| items.par_iter().map(f).collect())
    }

    /// Runs every task on the pool as a single admission lane and blocks until
    /// all of them are done.
    ///
    /// # Arguments
    /// * `tasks` - The tasks to run.
    ///
    /// # Returns
    /// The results in the same order as `tasks`, whatever order they completed in,
    /// or an `InternalError` if a task panicked.
    pub fn run_ordered<R, F>(&self, tasks: Vec<F>) -> Result<Vec<R>>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let len = tasks.len();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let jobs = tasks
            .into_iter()
            .enumerate()
            .map(|(i, task)| {
                let tx = tx.clone();
                Box::new(move || {
                    let _ = tx.send((i, task()));
                }) as Job
            })
            .collect();
        drop(tx);

        self.admission.lock().push_lane(jobs);
        for _ in 0..len {
            let admission = Arc::clone(&self.admission);
            self.pool.spawn_fifo(move || {
                let job = admission.lock().pop();
                if let Some(job) = job {
                    job();
                }
            });
        }

        let mut results: Vec<Option<R>> = (0..len).map(|_| None).collect();
        while let Some((i, result)) = rx.blocking_recv() {
            results[i] = Some(result);
        }

        results
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| EngineErr::Internal("a batch processing task panicked".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;

    #[test]
    fn results_keep_the_task_order() {
        let pool = WorkerPool::new(4).unwrap();
        let tasks: Vec<_> = (0..16u64)
            .map(|i| {
                move || {
                    thread::sleep(Duration::from_millis(16 - i));
                    i * i
                }
            })
            .collect();

        let results = pool.run_ordered(tasks).unwrap();
        assert_eq!(results, (0..16).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn panics_are_reported() {
        let pool = WorkerPool::new(2).unwrap();
        let tasks: Vec<Box<dyn FnOnce() -> u8 + Send>> =
            vec![Box::new(|| 1), Box::new(|| panic!("boom"))];

        let err = pool.run_ordered(tasks).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InternalError);

        assert_eq!(pool.run_ordered(vec![|| 3]).unwrap(), [3]);
    }

    #[test]
    fn lanes_are_admitted_round_robin() {
        let mut admission = Admission::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        for lane in 0..2 {
            let jobs = (0..2)
                .map(|job| {
                    let order = Arc::clone(&order);
                    Box::new(move || order.lock().push((lane, job))) as Job
                })
                .collect();
            admission.push_lane(jobs);
        }

        while let Some(job) = admission.pop() {
            job();
        }

        assert_eq!(*order.lock(), [(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn map_runs_on_the_pool() {
        let pool = WorkerPool::new(2).unwrap();
        let names = pool.map(&[0, 1, 2], |_| {
            thread::current()
                .name()
                .is_some_and(|n| n.starts_with("batch-worker-"))
        });

        assert_eq!(names, [true, true, true]);
    }
}
