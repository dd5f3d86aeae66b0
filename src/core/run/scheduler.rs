use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crossbeam_queue::SegQueue;
use log::{debug, error};
use rayon::ThreadPoolBuilder;

use crate::core::error::{RemapError, Result};
use crate::core::io::RecordSource;

use super::task::{RegionTask, TaskContext};

/// Fixed pool of workers pulling tasks from a shared queue until it is empty.
pub struct TaskScheduler {
    queue: SegQueue<RegionTask>,
    workers: usize,
}

impl TaskScheduler {
    pub fn new(tasks: impl IntoIterator<Item = RegionTask>, workers: usize) -> Self {
        let queue = SegQueue::new();
        for task in tasks {
            queue.push(task);
        }
        Self { queue, workers: workers.max(1) }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Runs every queued task. Each worker builds its own record source, the first error aborts the run.
    pub fn run<Source, Builder, OnTask>(self, builder: Builder, ctx: TaskContext, ontask: OnTask) -> Result<()>
    where
        Source: RecordSource,
        Builder: Fn() -> Result<Source> + Sync,
        OnTask: Fn(&RegionTask) + Sync,
    {
        let pool = ThreadPoolBuilder::new().num_threads(self.workers).build()?;
        let failed = AtomicBool::new(false);
        let failure: Mutex<Option<RemapError>> = Mutex::new(None);

        pool.scope(|scope| {
            for worker in 0..self.workers {
                let (queue, failed, failure, builder, ontask) = (&self.queue, &failed, &failure, &builder, &ontask);
                scope.spawn(move |_| {
                    if let Err(err) = Self::work(worker, queue, failed, builder, ctx, ontask) {
                        error!("Worker {} failed: {}", worker, err);
                        failed.store(true, Ordering::SeqCst);
                        let mut failure = failure.lock().unwrap_or_else(|x| x.into_inner());
                        if failure.is_none() {
                            *failure = Some(err);
                        }
                    }
                });
            }
        });

        match failure.into_inner().unwrap_or_else(|x| x.into_inner()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn work<Source, Builder, OnTask>(
        worker: usize,
        queue: &SegQueue<RegionTask>,
        failed: &AtomicBool,
        builder: &Builder,
        ctx: TaskContext,
        ontask: &OnTask,
    ) -> Result<()>
    where
        Source: RecordSource,
        Builder: Fn() -> Result<Source>,
        OnTask: Fn(&RegionTask),
    {
        let mut source = builder()?;
        let mut processed = 0;
        while !failed.load(Ordering::SeqCst) {
            let mut task = match queue.pop() {
                Some(x) => x,
                None => break,
            };
            task.run(&mut source, &ctx)?;
            ontask(&task);
            processed += 1;
        }
        debug!("Worker {} finished after {} tasks", worker, processed);
        Ok(())
    }
}
