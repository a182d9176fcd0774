use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use super::{GpuDevice, GpuError, SharedGpuContext};

type Job<S> = Box<dyn FnOnce(&mut dyn GpuDevice, &mut S) + Send>;

/// A GPU device confined to one dedicated worker thread.
///
/// The worker owns the device plus a piece of thread-local state `S` that
/// jobs can keep GPU objects in between calls. Jobs run strictly in
/// submission order, so two `run_sync` calls never overlap.
///
/// Teardown order on `dispose` (or drop): the job queue is closed, queued
/// jobs drain, `S` is dropped, then the device, all on the worker thread.
pub struct GpuContext<S: Default + 'static = ()> {
    name: String,
    jobs: Option<Sender<Job<S>>>,
    worker: Option<JoinHandle<()>>,
}

impl<S: Default + 'static> GpuContext<S> {
    /// Spawns the worker and creates its device from `shared`.
    ///
    /// Blocks until the device exists, so creation errors surface here rather
    /// than on the first job.
    pub fn create(name: &str, shared: Arc<dyn SharedGpuContext>) -> Result<Self, GpuError> {
        let (jobs_tx, jobs_rx) = crossbeam_channel::unbounded::<Job<S>>();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), GpuError>>(1);

        let thread_name = name.to_string();
        let worker = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || worker_main(thread_name, shared, jobs_rx, ready_tx))
            .map_err(|e| GpuError::WorkerSpawn(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = worker.join();
                return Err(err);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(GpuError::ContextLost);
            }
        }

        log::info!("GpuContext '{name}': worker started");
        Ok(Self {
            name: name.to_string(),
            jobs: Some(jobs_tx),
            worker: Some(worker),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs `work` on the worker thread and blocks until it returns.
    ///
    /// Must not be called from the worker thread itself (from inside another
    /// job); that would wait on a queue only the caller can drain.
    pub fn run_sync<T, F>(&self, work: F) -> Result<T, GpuError>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn GpuDevice, &mut S) -> T + Send + 'static,
    {
        let Some(jobs) = self.jobs.as_ref() else {
            return Err(GpuError::ContextLost);
        };

        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let job: Job<S> = Box::new(move |device, state| {
            let _ = reply_tx.send(work(device, state));
        });

        jobs.send(job).map_err(|_| GpuError::ContextLost)?;
        // A dropped reply sender means the job unwound on the worker.
        reply_rx.recv().map_err(|_| GpuError::ContextLost)
    }

    /// Stops the worker after queued jobs complete and waits for it to exit.
    pub fn dispose(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.jobs.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("GpuContext '{}': worker panicked", self.name);
            } else {
                log::info!("GpuContext '{}': disposed", self.name);
            }
        }
    }
}

impl<S: Default + 'static> Drop for GpuContext<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_main<S: Default>(
    name: String,
    shared: Arc<dyn SharedGpuContext>,
    jobs: Receiver<Job<S>>,
    ready: Sender<Result<(), GpuError>>,
) {
    let mut device = match shared.create_device() {
        Ok(device) => device,
        Err(err) => {
            log::error!("GpuContext '{name}': {err}");
            let _ = ready.send(Err(err));
            return;
        }
    };
    let mut state = S::default();
    let _ = ready.send(Ok(()));
    drop(ready);

    for job in jobs {
        job(device.as_mut(), &mut state);
    }

    // Objects in `state` belong to the device; drop them first.
    drop(state);
    drop(device);
    log::debug!("GpuContext '{name}': worker exiting");
}
