//! Superstep execution of compiled workflows.
//!
//! The [`Executor`] owns everything a run needs: the compiled [`Workflow`],
//! the [`ReducerRegistry`] applied at each barrier, and the
//! [`CheckpointStore`] its threads persist to. Nothing is process-global;
//! two executors over different stores never observe each other.
//!
//! Execution proceeds in supersteps. Every executable node of the current
//! frontier runs concurrently against one immutable snapshot; the barrier
//! then merges their partials in frontier order, routes the next frontier
//! from the post-merge snapshot, and appends exactly one checkpoint. A node
//! failure aborts the run before the append, so the previous checkpoint
//! stays authoritative and the thread can be resumed.

use chrono::Utc;
use futures_util::future::join_all;
use miette::Diagnostic;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

use crate::graph::Workflow;
use crate::node::{NodeContext, NodeError, NodePartial};
use crate::reducers::ReducerRegistry;
use crate::registry::RegistryError;
use crate::router::RoutingError;
use crate::runtime::checkpoint::{
    Checkpoint, CheckpointError, CheckpointStore, MemorySaver,
};
use crate::runtime::config::{CheckpointerType, ExecutorConfig};
use crate::runtime::stream::{StepUpdate, StreamItem};
use crate::state::{StateSnapshot, WorkflowState};
use crate::types::NodeId;

/// Fatal errors aborting a run. The thread's last appended checkpoint
/// remains authoritative in every case.
#[derive(Debug, Error, Diagnostic)]
pub enum ExecutorError {
    #[error("node {node} failed")]
    #[diagnostic(
        code(threadflow::executor::node_run),
        help("The thread can be resumed from its last checkpoint once the cause is fixed.")
    )]
    NodeRun {
        node: NodeId,
        #[source]
        source: NodeError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("unknown thread: {thread_id}")]
    #[diagnostic(
        code(threadflow::executor::unknown_thread),
        help("resume only works for threads with at least one checkpoint; use run to start one.")
    )]
    UnknownThread { thread_id: String },

    #[error("checkpoint backend {backend:?} is not available in this build")]
    #[diagnostic(
        code(threadflow::executor::backend_unavailable),
        help("Enable the `sqlite` feature to use the sqlite checkpointer.")
    )]
    BackendUnavailable { backend: CheckpointerType },
}

/// Pause gates evaluated around each superstep.
#[derive(Clone, Debug, Default)]
pub struct StepOptions {
    /// Suspend before any of these nodes executes. The suspension is
    /// persisted, so a later resume picks up exactly at the gate.
    pub interrupt_before: Vec<NodeId>,
    /// Pause after a superstep in which any of these nodes ran. The
    /// superstep is already committed when the pause is reported.
    pub interrupt_after: Vec<NodeId>,
    /// Pause after every committed superstep.
    pub interrupt_each_step: bool,
}

impl StepOptions {
    #[must_use]
    pub fn interrupt_before(mut self, node: impl Into<NodeId>) -> Self {
        self.interrupt_before.push(node.into());
        self
    }

    #[must_use]
    pub fn interrupt_after(mut self, node: impl Into<NodeId>) -> Self {
        self.interrupt_after.push(node.into());
        self
    }

    #[must_use]
    pub fn interrupt_each_step(mut self) -> Self {
        self.interrupt_each_step = true;
        self
    }
}

/// Why a run stopped before reaching `End`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PausedReason {
    /// Suspended before `node` ran; the gate is recorded in the checkpoint.
    BeforeNode { node: NodeId },
    /// Paused after the committed superstep in which `node` ran.
    AfterNode { node: NodeId },
    /// Paused by `interrupt_each_step`.
    EachStep,
}

/// Terminal status of one `run`/`resume` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepResult {
    /// The frontier reached `End`; the thread is complete.
    Completed,
    /// A gate fired; the thread can be resumed.
    Paused(PausedReason),
    /// The stream consumer went away; execution stopped at the last
    /// committed checkpoint.
    Cancelled,
}

/// How a run call found its thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ThreadInit {
    /// No prior checkpoint existed; the input seeded step zero.
    Fresh,
    /// Execution continued from the checkpoint at `step`.
    Resumed { step: u64 },
}

/// Outcome of one `run`/`resume` call on a thread.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub thread_id: String,
    pub init: ThreadInit,
    /// Supersteps committed by this call.
    pub steps_run: u64,
    pub result: StepResult,
    /// State snapshot at the moment the call returned.
    pub snapshot: StateSnapshot,
}

/// Drives workflow threads against a checkpoint store.
///
/// Distinct thread ids never interfere; the store is the only shared
/// resource. A single thread id must not be driven by two concurrent run
/// calls: that is a caller contract, not something the executor detects.
#[derive(Clone)]
pub struct Executor {
    workflow: Arc<Workflow>,
    reducers: ReducerRegistry,
    store: Arc<dyn CheckpointStore>,
}

impl Executor {
    /// Executor over an explicit checkpoint store.
    pub fn new(workflow: Workflow, store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            workflow: Arc::new(workflow),
            reducers: ReducerRegistry::default(),
            store,
        }
    }

    /// Executor with a process-local [`MemorySaver`].
    pub fn in_memory(workflow: Workflow) -> Self {
        Self::new(workflow, Arc::new(MemorySaver::new()))
    }

    /// Build the checkpoint backend described by `config`.
    pub async fn from_config(
        workflow: Workflow,
        config: ExecutorConfig,
    ) -> Result<Self, ExecutorError> {
        let store: Arc<dyn CheckpointStore> = match config.checkpointer {
            CheckpointerType::InMemory => Arc::new(MemorySaver::new()),
            #[cfg(feature = "sqlite")]
            CheckpointerType::Sqlite => {
                let url = config
                    .sqlite_db_url
                    .unwrap_or_else(|| "sqlite://threadflow.db".to_string());
                Arc::new(crate::runtime::checkpoint_sqlite::SqliteSaver::connect(&url).await?)
            }
            #[cfg(not(feature = "sqlite"))]
            CheckpointerType::Sqlite => {
                return Err(ExecutorError::BackendUnavailable {
                    backend: CheckpointerType::Sqlite,
                });
            }
        };
        Ok(Self::new(workflow, store))
    }

    /// The checkpoint store this executor persists to.
    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// The compiled workflow being executed.
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Run a thread to completion.
    ///
    /// A fresh thread is seeded with `input`; an existing thread resumes from
    /// its latest checkpoint, with `input`'s messages and data folded in as a
    /// new turn. A completed thread given new input starts again from the
    /// entry frontier over the accumulated state.
    pub async fn run(
        &self,
        thread_id: &str,
        input: WorkflowState,
    ) -> Result<RunReport, ExecutorError> {
        self.run_with_options(thread_id, input, StepOptions::default())
            .await
    }

    /// `run` with pause gates.
    pub async fn run_with_options(
        &self,
        thread_id: &str,
        input: WorkflowState,
        options: StepOptions,
    ) -> Result<RunReport, ExecutorError> {
        self.run_inner(thread_id, input, options, None).await
    }

    /// Run until just before `breakpoint` would execute.
    pub async fn run_until(
        &self,
        thread_id: &str,
        input: WorkflowState,
        breakpoint: impl Into<NodeId>,
    ) -> Result<RunReport, ExecutorError> {
        self.run_with_options(
            thread_id,
            input,
            StepOptions::default().interrupt_before(breakpoint),
        )
        .await
    }

    /// Continue a previously started thread without new input.
    pub async fn resume(&self, thread_id: &str) -> Result<RunReport, ExecutorError> {
        self.resume_with_options(thread_id, StepOptions::default())
            .await
    }

    /// `resume` with pause gates.
    pub async fn resume_with_options(
        &self,
        thread_id: &str,
        options: StepOptions,
    ) -> Result<RunReport, ExecutorError> {
        if self.store.latest(thread_id).await?.is_none() {
            return Err(ExecutorError::UnknownThread {
                thread_id: thread_id.to_string(),
            });
        }
        self.run_inner(thread_id, WorkflowState::default(), options, None)
            .await
    }

    /// Latest persisted snapshot of a thread, if any.
    pub async fn latest_snapshot(
        &self,
        thread_id: &str,
    ) -> Result<Option<StateSnapshot>, ExecutorError> {
        Ok(self
            .store
            .latest(thread_id)
            .await?
            .map(|cp| cp.state.snapshot()))
    }

    /// Thread ids known to the checkpoint store.
    pub async fn list_threads(&self) -> Result<Vec<String>, ExecutorError> {
        Ok(self.store.list_threads().await?)
    }

    #[instrument(skip(self, input, options, updates))]
    pub(crate) async fn run_inner(
        &self,
        thread_id: &str,
        input: WorkflowState,
        options: StepOptions,
        updates: Option<flume::Sender<StreamItem>>,
    ) -> Result<RunReport, ExecutorError> {
        let (mut state, mut step, mut frontier, mut skip_gate, init) =
            self.init_thread(thread_id, input).await?;

        let mut steps_run = 0u64;
        loop {
            let executable: Vec<NodeId> = frontier
                .iter()
                .filter(|id| !id.is_end())
                .cloned()
                .collect();
            if executable.is_empty() {
                tracing::debug!(thread_id, step, "thread complete");
                return Ok(RunReport {
                    thread_id: thread_id.to_string(),
                    init,
                    steps_run,
                    result: StepResult::Completed,
                    snapshot: state.snapshot(),
                });
            }

            // Pre-step gate. A gate we were already suspended at fires only
            // once; clearing it lets resume walk through.
            if let Some(gated) = executable.iter().find(|&id| {
                options.interrupt_before.contains(id) && skip_gate.as_ref() != Some(id)
            }) {
                self.store
                    .append(Checkpoint {
                        thread_id: thread_id.to_string(),
                        step,
                        state: state.clone(),
                        frontier: frontier.clone(),
                        pending_gate: Some(gated.clone()),
                        created_at: Utc::now(),
                    })
                    .await?;
                tracing::info!(thread_id, step, node = %gated, "suspended before node");
                return Ok(RunReport {
                    thread_id: thread_id.to_string(),
                    init,
                    steps_run,
                    result: StepResult::Paused(PausedReason::BeforeNode {
                        node: gated.clone(),
                    }),
                    snapshot: state.snapshot(),
                });
            }
            skip_gate = None;

            let current_step = step + 1;
            let partials = self
                .superstep(thread_id, current_step, &executable, &state)
                .await?;
            let updated_channels = self.reducers.apply_all(&mut state, &partials);
            step = current_step;
            steps_run += 1;

            let post = state.snapshot();
            let next = self.route_frontier(&frontier, &post)?;

            self.store
                .append(Checkpoint {
                    thread_id: thread_id.to_string(),
                    step,
                    state: state.clone(),
                    frontier: next.clone(),
                    pending_gate: None,
                    created_at: Utc::now(),
                })
                .await?;
            tracing::debug!(
                thread_id,
                step,
                ran = executable.len(),
                next = next.len(),
                "superstep committed"
            );

            if let Some(tx) = &updates {
                let update = StepUpdate {
                    thread_id: thread_id.to_string(),
                    step,
                    ran: executable.clone(),
                    updated_channels: updated_channels.clone(),
                    snapshot: post.clone(),
                    next_frontier: next.clone(),
                };
                if tx.send_async(Ok(update)).await.is_err() {
                    tracing::debug!(thread_id, step, "stream consumer gone, stopping");
                    return Ok(RunReport {
                        thread_id: thread_id.to_string(),
                        init,
                        steps_run,
                        result: StepResult::Cancelled,
                        snapshot: post,
                    });
                }
            }

            frontier = next;

            if let Some(node) = executable
                .iter()
                .find(|&id| options.interrupt_after.contains(id))
            {
                return Ok(RunReport {
                    thread_id: thread_id.to_string(),
                    init,
                    steps_run,
                    result: StepResult::Paused(PausedReason::AfterNode {
                        node: node.clone(),
                    }),
                    snapshot: post,
                });
            }
            if options.interrupt_each_step && frontier.iter().any(|id| !id.is_end()) {
                return Ok(RunReport {
                    thread_id: thread_id.to_string(),
                    init,
                    steps_run,
                    result: StepResult::Paused(PausedReason::EachStep),
                    snapshot: post,
                });
            }
        }
    }

    /// Load or seed the thread, returning its working state, committed step
    /// count, next frontier, pending gate, and how it was initialized.
    async fn init_thread(
        &self,
        thread_id: &str,
        input: WorkflowState,
    ) -> Result<
        (WorkflowState, u64, Vec<NodeId>, Option<NodeId>, ThreadInit),
        ExecutorError,
    > {
        match self.store.latest(thread_id).await? {
            None => {
                let frontier = self.workflow.entries();
                self.store
                    .append(Checkpoint {
                        thread_id: thread_id.to_string(),
                        step: 0,
                        state: input.clone(),
                        frontier: frontier.clone(),
                        pending_gate: None,
                        created_at: Utc::now(),
                    })
                    .await?;
                tracing::info!(thread_id, "seeded fresh thread");
                Ok((input, 0, frontier, None, ThreadInit::Fresh))
            }
            Some(checkpoint) => {
                let resumed_step = checkpoint.step;
                let mut state = checkpoint.state;
                let mut frontier = checkpoint.frontier;
                let gate = checkpoint.pending_gate;

                let turn = input_partial(&input);
                if !turn.is_empty() {
                    self.reducers
                        .apply_all(&mut state, std::slice::from_ref(&turn));
                    // A completed thread given a new turn starts over from
                    // the entry frontier, carrying its accumulated state.
                    if frontier.iter().all(NodeId::is_end) {
                        frontier = self.workflow.entries();
                    }
                }
                tracing::info!(thread_id, step = resumed_step, "resumed thread");
                Ok((
                    state,
                    resumed_step,
                    frontier,
                    gate,
                    ThreadInit::Resumed { step: resumed_step },
                ))
            }
        }
    }

    /// Run every executable frontier node concurrently against one snapshot.
    /// Outputs come back in frontier order regardless of completion order.
    async fn superstep(
        &self,
        thread_id: &str,
        step: u64,
        executable: &[NodeId],
        state: &WorkflowState,
    ) -> Result<Vec<NodePartial>, ExecutorError> {
        let snapshot = state.snapshot();
        let mut runs = Vec::with_capacity(executable.len());
        for id in executable {
            let node = self.workflow.registry().get(id)?;
            let ctx = NodeContext {
                node: id.encode(),
                step,
                thread_id: thread_id.to_string(),
            };
            let snapshot = snapshot.clone();
            let id = id.clone();
            runs.push(async move { (id, node.run(snapshot, ctx).await) });
        }

        let mut partials = Vec::with_capacity(executable.len());
        for (id, result) in join_all(runs).await {
            match result {
                Ok(partial) => partials.push(partial),
                Err(source) => {
                    tracing::error!(thread_id, step, node = %id, error = %source, "node failed");
                    return Err(ExecutorError::NodeRun { node: id, source });
                }
            }
        }
        Ok(partials)
    }

    /// Successors of the whole frontier, deduplicated in first-seen order.
    fn route_frontier(
        &self,
        frontier: &[NodeId],
        post: &StateSnapshot,
    ) -> Result<Vec<NodeId>, ExecutorError> {
        let mut next: Vec<NodeId> = Vec::new();
        for id in frontier {
            for target in self.workflow.router().next(id, post)? {
                if !next.contains(&target) {
                    next.push(target);
                }
            }
        }
        Ok(next)
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("workflow", &self.workflow)
            .finish()
    }
}

/// New-turn input folded into a resumed thread's state.
fn input_partial(input: &WorkflowState) -> NodePartial {
    let snap = input.snapshot();
    let mut partial = NodePartial::new();
    if !snap.messages.is_empty() {
        partial.messages = Some(snap.messages);
    }
    if !snap.data.is_empty() {
        partial.data = Some(snap.data);
    }
    partial
}
