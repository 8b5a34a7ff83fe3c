//! Background execution of blocking operations.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;

const THREAD_NAME: &str = "nimbus-background";

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs an operation off the caller's thread and hands its result to a
/// callback.
///
/// The callback runs on the worker, exactly once, after the operation has
/// finished.
#[derive(Debug, Clone, Default)]
pub enum Dispatcher {
    /// One named OS thread per operation.
    #[default]
    Thread,
    /// The blocking pool of a tokio runtime.
    Runtime(Handle),
}

impl Dispatcher {
    /// Uses the runtime the caller is currently inside, if any.
    pub fn current() -> Self {
        match Handle::try_current() {
            Ok(handle) => Dispatcher::Runtime(handle),
            Err(_) => Dispatcher::Thread,
        }
    }

    /// Runs `op` in the background and passes its output to `callback`.
    pub fn spawn<T, Op, Cb>(&self, op: Op, callback: Cb)
    where
        T: Send + 'static,
        Op: FnOnce() -> T + Send + 'static,
        Cb: FnOnce(T) + Send + 'static,
    {
        let job: Job = Box::new(move || callback(op()));
        match self {
            Dispatcher::Thread => spawn_thread(job),
            Dispatcher::Runtime(handle) => {
                handle.spawn_blocking(job);
            }
        }
    }
}

fn spawn_thread(job: Job) {
    let slot = Arc::new(Mutex::new(Some(job)));
    let worker_slot = Arc::clone(&slot);

    let spawned = std::thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || {
            if let Some(job) = worker_slot.lock().take() {
                job();
            }
        });

    if let Err(e) = spawned {
        tracing::warn!(error = %e, "failed to spawn background thread, running inline");
        let job = slot.lock().take();
        if let Some(job) = job {
            job();
        }
    }
}
