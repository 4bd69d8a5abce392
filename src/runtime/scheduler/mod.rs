//! Cooperative scheduler for continuation frames
//!
//! The [`Scheduler`] owns every frame and the [`FutureStore`]. Each step pops
//! one runnable frame, runs its body once and interprets the returned
//! [`Signal`]:
//!
//! | Signal | Effect |
//! |--------|--------|
//! | `Continue` | back of the run queue |
//! | `Wait(id)` | suspended until `id` is submitted |
//! | `Done` | removed |
//! | `Fail(reason)` | removed and recorded, others keep running |
//! | `Exit` | every remaining frame is abandoned, the run loop stops |
//!
//! Frames are never preempted. Waiting is purely a state in this module,
//! no native thread ever blocks on a future.

pub mod cx;
pub mod frame;
pub mod queue;
pub mod remote;

pub use cx::FrameCx;
pub use frame::{BlockResult, FrameState, Signal};
pub use queue::RunQueue;
pub use remote::RemoteHandle;

use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use self::frame::{Frame, Wake};
use self::remote::{RemoteInbox, Submission};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::future::{DestroyPolicy, FutureStore, Payload};
use crate::runtime::id::{FrameId, FrameIdGenerator, FutureId};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Upper bound on steps per `run` call (`None` = unbounded).
    pub max_steps: Option<u64>,
    /// Slice to wait for remote submissions when nothing is runnable.
    pub idle_timeout: Duration,
    /// Exclusive bound of the future identifier space (`None` = full `u64`).
    pub id_limit: Option<u64>,
    /// What destroying a pending future does.
    pub destroy_policy: DestroyPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            idle_timeout: Duration::from_millis(1),
            id_limit: None,
            destroy_policy: DestroyPolicy::Reject,
        }
    }
}

/// Scheduler statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStats {
    /// Total frames spawned.
    pub frames_spawned: usize,
    /// Total frame bodies run.
    pub steps: usize,
    /// Frames that returned `Done`.
    pub completed: usize,
    /// Frames that failed.
    pub failed: usize,
    /// Frames abandoned by `Exit`.
    pub abandoned: usize,
    /// Times a frame was suspended.
    pub suspensions: usize,
    /// Times a suspended frame was woken.
    pub wakes: usize,
    /// `Wait` on a future that was already ready.
    pub immediate_resumes: usize,
    /// Remote submissions applied.
    pub remote_applied: usize,
    /// Remote submissions the store refused.
    pub remote_rejected: usize,
    /// Longest run queue observed.
    pub peak_runnable: usize,
}

impl SchedulerStats {
    /// Record a spawned frame.
    #[inline]
    pub fn record_spawned(&mut self) {
        self.frames_spawned += 1;
    }

    /// Record one executed step.
    #[inline]
    pub fn record_step(&mut self) {
        self.steps += 1;
    }

    /// Record a wake.
    #[inline]
    pub fn record_wake(&mut self) {
        self.wakes += 1;
    }

    /// Update the peak run queue length.
    #[inline]
    pub fn update_runnable(
        &mut self,
        current: usize,
    ) {
        self.peak_runnable = self.peak_runnable.max(current);
    }
}

/// A frame that terminated with a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameFailure {
    pub frame: FrameId,
    pub name: String,
    pub reason: String,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// No frames left.
    Idle,
    /// A frame requested shutdown.
    Exit,
    /// Only suspended frames left and nobody can submit.
    Stalled,
    /// The step budget ran out.
    StepLimit,
}

/// Summary of one `run` call.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Steps executed during this run.
    pub steps: usize,
    /// Frames that returned `Done` during this run.
    pub completed: usize,
    pub failed: Vec<FrameFailure>,
    /// Frames dropped without running again because of `Exit`.
    pub abandoned: Vec<FrameId>,
    /// Frames still suspended when the run stopped.
    pub suspended: Vec<FrameId>,
}

/// Result of a single scheduling step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A frame ran and returned this signal.
    Ran(FrameId, Signal),
    /// Nothing was runnable.
    Idle,
    /// The runtime has exited.
    Halted,
}

/// Single-threaded cooperative scheduler.
pub struct Scheduler {
    config: SchedulerConfig,
    store: FutureStore,
    frames: IndexMap<FrameId, Frame>,
    run_queue: RunQueue,
    frame_ids: FrameIdGenerator,
    inbox: RemoteInbox,
    stats: SchedulerStats,
    failures: Vec<FrameFailure>,
    abandoned: Vec<FrameId>,
    exit_requested: bool,
}

impl Scheduler {
    /// Create a scheduler with default config.
    #[inline]
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Create a scheduler with custom configuration.
    pub fn with_config(config: SchedulerConfig) -> Self {
        let store = FutureStore::with_config(config.id_limit, config.destroy_policy);

        Self {
            config,
            store,
            frames: IndexMap::new(),
            run_queue: RunQueue::new(),
            frame_ids: FrameIdGenerator::new(),
            inbox: RemoteInbox::new(),
            stats: SchedulerStats::default(),
            failures: Vec::new(),
            abandoned: Vec::new(),
            exit_requested: false,
        }
    }

    /// Register a new runnable frame.
    ///
    /// `context` is moved into the frame and handed to `block` on every
    /// step.
    pub fn spawn<C, F>(
        &mut self,
        block: F,
        context: C,
    ) -> FrameId
    where
        C: 'static,
        F: FnMut(&mut FrameCx<'_>, &mut C) -> BlockResult + 'static,
    {
        let id = self.frame_ids.next();
        self.enqueue_new(Frame::new(id, None, block, context));
        id
    }

    /// Like [`spawn`](Self::spawn), with a name for diagnostics.
    pub fn spawn_named<C, F>(
        &mut self,
        name: impl Into<String>,
        block: F,
        context: C,
    ) -> FrameId
    where
        C: 'static,
        F: FnMut(&mut FrameCx<'_>, &mut C) -> BlockResult + 'static,
    {
        let id = self.frame_ids.next();
        self.enqueue_new(Frame::new(id, Some(name.into()), block, context));
        id
    }

    /// Allocate a fresh pending future from the host side.
    pub fn create_future(&mut self) -> RuntimeResult<FutureId> {
        self.store.create()
    }

    /// Complete a future from the host side, waking its waiters.
    pub fn submit(
        &mut self,
        id: FutureId,
        payload: impl Into<Payload>,
    ) -> RuntimeResult<()> {
        let waiters = self.store.submit(id, payload.into())?;
        self.apply_wakes(waiters.into_iter().map(|frame| Wake::ready(id, frame)));
        Ok(())
    }

    /// Read a future; `Ok(None)` while pending.
    pub fn read(
        &self,
        id: FutureId,
    ) -> RuntimeResult<Option<Payload>> {
        self.store.read(id)
    }

    /// Destroy a future from the host side.
    pub fn destroy(
        &mut self,
        id: FutureId,
    ) -> RuntimeResult<()> {
        let waiters = self.store.destroy(id)?;
        self.apply_wakes(waiters.into_iter().map(|frame| Wake::abandoned(id, frame)));
        Ok(())
    }

    /// A `Send` handle for submitting values from other threads.
    pub fn remote(&self) -> RemoteHandle {
        self.inbox.handle()
    }

    /// Run one frame body.
    pub fn step(&mut self) -> Step {
        if self.exit_requested {
            return Step::Halted;
        }

        self.drain_remote();

        let Some(id) = self.run_queue.pop() else {
            return Step::Idle;
        };
        let Some(frame) = self.frames.get_mut(&id) else {
            // Only live frames are ever queued.
            return Step::Idle;
        };

        frame.state = FrameState::Running;
        frame.steps += 1;
        trace!("running {} ({}), step {}", id, frame.name, frame.steps);

        let mut spawned = Vec::new();
        let mut wakes = Vec::new();
        let mut registered = SmallVec::new();
        let result = {
            let mut cx = FrameCx::new(
                id,
                &mut self.store,
                &mut self.frame_ids,
                &mut spawned,
                &mut wakes,
                &mut registered,
                &mut frame.abandoned,
            );
            (frame.block)(&mut cx)
        };

        let signal = result.unwrap_or_else(|err| Signal::Fail(err.to_string()));
        self.stats.record_step();

        self.apply_wakes(wakes);
        for frame in spawned {
            self.enqueue_new(frame);
        }
        self.settle(id, &signal, registered);

        Step::Ran(id, signal)
    }

    /// Step until exit, until nothing is runnable, or until the step budget
    /// is spent.
    ///
    /// With only suspended frames left, the run waits for remote
    /// submissions as long as a [`RemoteHandle`] is alive.
    pub fn run(&mut self) -> RunReport {
        let start_steps = self.stats.steps;
        let start_completed = self.stats.completed;

        let outcome = loop {
            if let Some(max) = self.config.max_steps {
                if (self.stats.steps - start_steps) as u64 >= max {
                    break RunOutcome::StepLimit;
                }
            }

            match self.step() {
                Step::Ran(..) => continue,
                Step::Halted => break RunOutcome::Exit,
                Step::Idle => {
                    if self.frames.is_empty() {
                        break RunOutcome::Idle;
                    }
                    if !self.wait_remote() {
                        break RunOutcome::Stalled;
                    }
                }
            }
        };

        let report = RunReport {
            outcome,
            steps: self.stats.steps - start_steps,
            completed: self.stats.completed - start_completed,
            failed: std::mem::take(&mut self.failures),
            abandoned: std::mem::take(&mut self.abandoned),
            suspended: self.suspended_frames(),
        };
        debug!(
            "run finished: {:?} after {} steps ({} completed, {} failed)",
            report.outcome,
            report.steps,
            report.completed,
            report.failed.len()
        );
        report
    }

    /// Drive the scheduler until future `id` is ready and return its value.
    ///
    /// While a [`RemoteHandle`] is alive this keeps waiting even with no
    /// frames left. Fails with `StillPending` once nothing can produce the
    /// value anymore, or if the runtime exits first.
    pub fn run_until_ready(
        &mut self,
        id: FutureId,
    ) -> RuntimeResult<Payload> {
        loop {
            if let Some(value) = self.store.read(id)? {
                return Ok(value);
            }

            match self.step() {
                Step::Ran(..) => {}
                Step::Halted => return Err(RuntimeError::StillPending(id)),
                Step::Idle => {
                    if !self.wait_remote() {
                        return Err(RuntimeError::StillPending(id));
                    }
                }
            }
        }
    }

    /// State of a frame; `None` for IDs never issued.
    pub fn frame_state(
        &self,
        id: FrameId,
    ) -> Option<FrameState> {
        match self.frames.get(&id) {
            Some(frame) => Some(frame.state),
            None if self.frame_ids.has_issued(id) => Some(FrameState::Terminated),
            None => None,
        }
    }

    /// Number of frames held (runnable or suspended).
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of runnable frames.
    #[inline]
    pub fn runnable_count(&self) -> usize {
        self.run_queue.len()
    }

    /// Suspended frames, in spawn order.
    pub fn suspended_frames(&self) -> Vec<FrameId> {
        self.frames
            .values()
            .filter(|frame| matches!(frame.state, FrameState::Suspended(_)))
            .map(|frame| frame.id)
            .collect()
    }

    /// Whether a frame has requested exit.
    #[inline]
    pub fn has_exited(&self) -> bool {
        self.exit_requested
    }

    /// Get statistics.
    #[inline]
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Get the configuration.
    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The future store.
    #[inline]
    pub fn store(&self) -> &FutureStore {
        &self.store
    }

    fn enqueue_new(
        &mut self,
        frame: Frame,
    ) {
        let id = frame.id;
        debug!("spawned {} ({})", id, frame.name);
        self.frames.insert(id, frame);
        self.make_runnable(id);
        self.stats.record_spawned();
    }

    fn make_runnable(
        &mut self,
        id: FrameId,
    ) {
        if let Some(frame) = self.frames.get_mut(&id) {
            frame.state = FrameState::Runnable;
            self.run_queue.push(id);
            self.stats.update_runnable(self.run_queue.len());
        }
    }

    /// Apply the signal a frame returned.
    fn settle(
        &mut self,
        id: FrameId,
        signal: &Signal,
        registered: SmallVec<[FutureId; 2]>,
    ) {
        let keep = match signal {
            Signal::Wait(future) => Some(*future),
            _ => None,
        };
        for future in registered {
            if Some(future) != keep {
                self.store.remove_waiter(future, id);
            }
        }

        match signal {
            Signal::Continue => self.make_runnable(id),
            Signal::Wait(future) => self.suspend(id, *future),
            Signal::Done => {
                self.retire(id);
                self.stats.completed += 1;
                debug!("{} done", id);
            }
            Signal::Fail(reason) => self.fail(id, reason.clone()),
            Signal::Exit => {
                self.retire(id);
                debug!("{} requested exit", id);
                self.exit_requested = true;
                self.abandon_all();
            }
        }
    }

    fn suspend(
        &mut self,
        id: FrameId,
        future: FutureId,
    ) {
        let abandoned = self
            .frames
            .get_mut(&id)
            .is_some_and(|frame| frame.take_abandoned(future));
        if abandoned && !self.store.contains(future) {
            self.fail(id, RuntimeError::Abandoned(future).to_string());
            return;
        }

        match self.store.add_waiter(future, id) {
            Ok(true) => {
                if let Some(frame) = self.frames.get_mut(&id) {
                    frame.state = FrameState::Suspended(future);
                }
                self.stats.suspensions += 1;
                debug!("{} suspended on {}", id, future);
            }
            Ok(false) => {
                self.stats.immediate_resumes += 1;
                self.make_runnable(id);
            }
            Err(err) => self.fail(id, err.to_string()),
        }
    }

    fn fail(
        &mut self,
        id: FrameId,
        reason: String,
    ) {
        if let Some(frame) = self.retire(id) {
            warn!("{} ({}) failed: {}", id, frame.name, reason);
            self.failures.push(FrameFailure {
                frame: id,
                name: frame.name,
                reason,
            });
        }
        self.stats.failed += 1;
    }

    /// Remove a frame, dropping its block and context.
    fn retire(
        &mut self,
        id: FrameId,
    ) -> Option<Frame> {
        self.frames.shift_remove(&id).map(|mut frame| {
            frame.state = FrameState::Terminated;
            frame
        })
    }

    fn abandon_all(&mut self) {
        self.run_queue.drain().for_each(drop);

        for (id, frame) in self.frames.drain(..) {
            if let FrameState::Suspended(future) = frame.state {
                self.store.remove_waiter(future, id);
            }
            debug!("abandoned {} ({})", id, frame.name);
            self.abandoned.push(id);
            self.stats.abandoned += 1;
        }
    }

    fn apply_wakes(
        &mut self,
        wakes: impl IntoIterator<Item = Wake>,
    ) {
        for wake in wakes {
            let Some(frame) = self.frames.get_mut(&wake.frame) else {
                continue;
            };

            if wake.abandoned {
                frame.abandoned.push(wake.future);
            }

            if frame.state == FrameState::Suspended(wake.future) {
                debug!("woke {} on {}", wake.frame, wake.future);
                self.stats.record_wake();
                self.make_runnable(wake.frame);
            }
        }
    }

    fn drain_remote(&mut self) {
        while let Some(submission) = self.inbox.try_recv() {
            self.apply_remote(submission);
        }
    }

    /// Block for one idle slice waiting for a remote submission.
    ///
    /// Returns `false` when no handle is alive to submit anything.
    fn wait_remote(&mut self) -> bool {
        // Sample liveness before draining: a handle sends before it drops.
        let live = self.inbox.has_handles();
        if let Some(submission) = self.inbox.try_recv() {
            self.apply_remote(submission);
            return true;
        }
        if !live {
            return false;
        }

        if let Some(submission) = self.inbox.recv_timeout(self.config.idle_timeout) {
            self.apply_remote(submission);
        }
        true
    }

    fn apply_remote(
        &mut self,
        submission: Submission,
    ) {
        let Submission { id, payload } = submission;
        match self.store.submit(id, payload) {
            Ok(waiters) => {
                self.stats.remote_applied += 1;
                self.apply_wakes(waiters.into_iter().map(|frame| Wake::ready(id, frame)));
            }
            Err(err) => {
                self.stats.remote_rejected += 1;
                warn!("remote submission rejected: {}", err);
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("frames", &self.frames.len())
            .field("runnable", &self.run_queue.len())
            .field("futures", &self.store.len())
            .field("exited", &self.exit_requested)
            .finish()
    }
}
