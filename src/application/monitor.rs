//! Task monitoring.
//!
//! A `TaskMonitor` tracks at most one submitted job at a time. Attaching a job
//! starts a fixed-interval poll loop; each tick fetches one status snapshot and
//! replaces the held `TaskHandle` with it. The loop ends on a terminal status,
//! on the first fetch failure, or when the monitor is re-attached, detached,
//! or dropped.
//!
//! Every attach/detach bumps a generation counter. A tick applies its result
//! only if the generation it started under is still current, so a slow
//! response for a replaced job is discarded on arrival.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::{PollError, TaskHandle, TaskSnapshot, TaskStatus};

/// Source of job status snapshots.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the current snapshot for `job_id`.
    async fn fetch_status(&self, job_id: &str) -> Result<TaskSnapshot, PollError>;
}

/// Lifecycle state of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Nothing attached, or detached.
    Idle,
    /// A poll loop is running.
    Polling,
    /// The job finished successfully.
    Done,
    /// The job failed, or its status could not be fetched.
    Errored,
    /// A newer job was attached before this one finished. Only a retired
    /// poll loop ends in this state; the monitor itself moves on to polling
    /// the new job.
    Superseded,
}

struct Shared {
    generation: u64,
    /// Generation of the latest `attach`.
    attached: u64,
    state: MonitorState,
    handle: Option<TaskHandle>,
}

struct ActiveLoop {
    job_id: String,
    cancel: CancellationToken,
    task: Option<JoinHandle<MonitorState>>,
}

/// Observes one job at a time via a timed poll loop.
pub struct TaskMonitor {
    source: Arc<dyn StatusSource>,
    interval: Duration,
    shared: Arc<Mutex<Shared>>,
    updates: watch::Sender<Option<TaskHandle>>,
    active: Option<ActiveLoop>,
}

impl TaskMonitor {
    /// Create an idle monitor polling `source` every `interval`.
    #[must_use]
    pub fn new(source: Arc<dyn StatusSource>, interval: Duration) -> Self {
        let (updates, _) = watch::channel(None);
        Self {
            source,
            interval,
            shared: Arc::new(Mutex::new(Shared {
                generation: 0,
                attached: 0,
                state: MonitorState::Idle,
                handle: None,
            })),
            updates,
            active: None,
        }
    }

    /// Start tracking `job_id`, superseding any job currently being polled.
    ///
    /// Returns the id of the superseded job, if one was still polling.
    /// Must be called from within a Tokio runtime.
    pub fn attach(&mut self, job_id: impl Into<String>) -> Option<String> {
        let job_id = job_id.into();

        let (generation, superseded) = {
            let mut shared = lock(&self.shared);
            let superseded = (shared.state == MonitorState::Polling)
                .then(|| self.active.as_ref().map(|a| a.job_id.clone()))
                .flatten();
            shared.generation += 1;
            shared.attached = shared.generation;
            shared.state = MonitorState::Polling;
            let handle = TaskHandle::running(job_id.clone());
            shared.handle = Some(handle.clone());
            self.updates.send_replace(Some(handle));
            (shared.generation, superseded)
        };

        if let Some(previous) = self.active.take() {
            previous.cancel.cancel();
        }
        if let Some(old) = &superseded {
            tracing::info!(old_job = %old, new_job = %job_id, "Superseding task");
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll_loop(PollLoop {
            source: Arc::clone(&self.source),
            job_id: job_id.clone(),
            generation,
            interval: self.interval,
            shared: Arc::clone(&self.shared),
            updates: self.updates.clone(),
            cancel: cancel.clone(),
        }));

        tracing::debug!(job_id = %job_id, generation, "Attached task monitor");
        self.active = Some(ActiveLoop {
            job_id,
            cancel,
            task: Some(task),
        });

        superseded
    }

    /// Stop polling. The held handle is left as it was.
    pub fn detach(&mut self) {
        {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            if shared.state == MonitorState::Polling {
                shared.state = MonitorState::Idle;
            }
        }
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            tracing::debug!(job_id = %active.job_id, "Detached task monitor");
        }
    }

    /// Wait for the current poll loop to end and return the final state.
    pub async fn wait(&mut self) -> MonitorState {
        if let Some(task) = self.active.as_mut().and_then(|a| a.task.take()) {
            match task.await {
                Ok(end) => return end,
                Err(e) => tracing::warn!(error = %e, "Poll loop ended abnormally"),
            }
        }
        self.state()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> MonitorState {
        lock(&self.shared).state
    }

    /// Snapshot of the latest known handle.
    #[must_use]
    pub fn handle(&self) -> Option<TaskHandle> {
        lock(&self.shared).handle.clone()
    }

    /// Receive every handle the monitor publishes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<TaskHandle>> {
        self.updates.subscribe()
    }
}

impl Drop for TaskMonitor {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

struct PollLoop {
    source: Arc<dyn StatusSource>,
    job_id: String,
    generation: u64,
    interval: Duration,
    shared: Arc<Mutex<Shared>>,
    updates: watch::Sender<Option<TaskHandle>>,
    cancel: CancellationToken,
}

/// Runs one job's poll loop and returns the state it ended in.
async fn poll_loop(ctx: PollLoop) -> MonitorState {
    loop {
        tokio::select! {
            () = ctx.cancel.cancelled() => return cancelled(&ctx),
            () = tokio::time::sleep(ctx.interval) => {}
        }

        // An in-flight fetch is allowed to finish; its result is dropped in
        // `apply` if the generation moved on meanwhile.
        let result = ctx.source.fetch_status(&ctx.job_id).await;
        if let Some(end) = apply(&ctx, result) {
            return end;
        }
    }
}

fn cancelled(ctx: &PollLoop) -> MonitorState {
    retired(ctx, &lock(&ctx.shared))
}

/// End state of a loop whose generation is no longer current.
fn retired(ctx: &PollLoop, shared: &Shared) -> MonitorState {
    let end = if shared.attached > ctx.generation {
        MonitorState::Superseded
    } else {
        MonitorState::Idle
    };
    tracing::debug!(job_id = %ctx.job_id, generation = ctx.generation, ?end, "Poll loop retired");
    end
}

/// Applies one tick's result. Returns the end state once polling should stop.
fn apply(ctx: &PollLoop, result: Result<TaskSnapshot, PollError>) -> Option<MonitorState> {
    let mut shared = lock(&ctx.shared);
    if shared.generation != ctx.generation {
        tracing::debug!(job_id = %ctx.job_id, generation = ctx.generation, "Discarding stale status");
        return Some(retired(ctx, &shared));
    }

    match result {
        Ok(snapshot) => {
            let handle = TaskHandle::from_snapshot(ctx.job_id.clone(), snapshot);
            let status = handle.status;
            tracing::trace!(job_id = %ctx.job_id, %status, logs = handle.logs.len(), "Status snapshot");
            shared.handle = Some(handle.clone());
            match status {
                TaskStatus::Running => {}
                TaskStatus::Done => shared.state = MonitorState::Done,
                TaskStatus::Error => shared.state = MonitorState::Errored,
            }
            ctx.updates.send_replace(Some(handle));
            if status.is_terminal() {
                tracing::info!(job_id = %ctx.job_id, %status, "Task finished");
                return Some(shared.state);
            }
            None
        }
        Err(e) => {
            tracing::warn!(job_id = %ctx.job_id, error = %e, "Status poll failed; stopping");
            let handle = shared
                .handle
                .take()
                .unwrap_or_else(|| TaskHandle::running(ctx.job_id.clone()))
                .errored(e.to_string());
            shared.handle = Some(handle.clone());
            shared.state = MonitorState::Errored;
            ctx.updates.send_replace(Some(handle));
            Some(MonitorState::Errored)
        }
    }
}
