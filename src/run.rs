use color_eyre::eyre;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Handle to one asynchronous execution.
///
/// A run cannot be cancelled. Dropping the handle blocks until it completes.
#[derive(Debug)]
pub struct Run {
    id: usize,
    start: Instant,
    done: flume::Receiver<Option<String>>,
    thread: Option<JoinHandle<()>>,
    completed: bool,
    failure: Option<String>,
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Run {
    pub fn spawn<F>(id: usize, job: F) -> std::io::Result<Self>
    where
        F: FnOnce() -> eyre::Result<()> + Send + 'static,
    {
        let (tx, done) = flume::bounded(1);
        let thread = std::thread::Builder::new()
            .name(format!("run-{id}"))
            .spawn(move || {
                let failure = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
                    Ok(Ok(())) => None,
                    Ok(Err(err)) => Some(format!("{err:#}")),
                    Err(panic) => Some(format!("panicked: {}", panic_message(&*panic))),
                };
                // the handle may already be gone
                let _ = tx.send(failure);
            })?;
        log::debug!("run {id} started");
        Ok(Self {
            id,
            start: Instant::now(),
            done,
            thread: Some(thread),
            completed: false,
            failure: None,
        })
    }

    fn complete(&mut self, failure: Option<String>) {
        self.completed = true;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("run {} thread panicked", self.id);
            }
        }
        match &failure {
            Some(err) => log::error!("run {} failed after {:?}: {err}", self.id, self.start.elapsed()),
            None => log::debug!("run {} completed after {:?}", self.id, self.start.elapsed()),
        }
        self.failure = failure;
    }

    fn disconnected(&mut self) {
        self.complete(Some("run exited without reporting completion".to_string()));
    }

    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Check for completion without blocking.
    pub fn poll(&mut self) -> bool {
        if !self.completed {
            match self.done.try_recv() {
                Ok(failure) => self.complete(failure),
                Err(flume::TryRecvError::Empty) => {}
                Err(flume::TryRecvError::Disconnected) => self.disconnected(),
            }
        }
        self.completed
    }

    pub fn is_running(&mut self) -> bool {
        !self.poll()
    }

    /// Block for at most `timeout`, returns whether the run completed.
    pub fn join(&mut self, timeout: Duration) -> bool {
        if !self.completed {
            match self.done.recv_timeout(timeout) {
                Ok(failure) => self.complete(failure),
                Err(flume::RecvTimeoutError::Timeout) => {}
                Err(flume::RecvTimeoutError::Disconnected) => self.disconnected(),
            }
        }
        self.completed
    }

    /// Block until the run completes.
    pub fn wait(&mut self) {
        if !self.completed {
            match self.done.recv() {
                Ok(failure) => self.complete(failure),
                Err(flume::RecvError::Disconnected) => self.disconnected(),
            }
        }
    }

    /// Error of a completed run that did not succeed.
    #[must_use]
    pub fn failed(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}

impl Drop for Run {
    fn drop(&mut self) {
        self.wait();
    }
}
