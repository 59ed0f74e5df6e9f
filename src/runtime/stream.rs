//! Pull-based streaming of superstep updates.
//!
//! `run_stream` drives a thread on a background task and hands back a
//! [`StepStream`]: a `futures` [`Stream`] yielding one [`StepUpdate`] per
//! committed superstep. The channel is bounded at one item, so the driver
//! advances only as fast as the consumer polls. Dropping the stream is the
//! cancellation signal: the driver notices on its next send, stops before
//! the following superstep, and the thread stays consistent at its last
//! committed checkpoint.

use futures_util::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

use crate::runtime::executor::{Executor, ExecutorError, RunReport, StepOptions};
use crate::state::{StateSnapshot, WorkflowState};
use crate::types::{ChannelId, NodeId};

/// What one committed superstep did to a thread.
#[derive(Clone, Debug)]
pub struct StepUpdate {
    pub thread_id: String,
    /// Step number of the superstep this update describes.
    pub step: u64,
    /// Nodes that executed, in frontier order.
    pub ran: Vec<NodeId>,
    /// Channels the barrier actually changed.
    pub updated_channels: Vec<ChannelId>,
    /// Post-merge snapshot, identical to the persisted checkpoint's state.
    pub snapshot: StateSnapshot,
    /// Frontier that runs next.
    pub next_frontier: Vec<NodeId>,
}

/// Items yielded by [`StepStream`]: updates until the run ends, then at most
/// one error if the run aborted.
pub type StreamItem = Result<StepUpdate, ExecutorError>;

/// Lazy stream of superstep updates for one `run_stream` call.
pub struct StepStream {
    inner: flume::r#async::RecvStream<'static, StreamItem>,
    driver: JoinHandle<Option<RunReport>>,
}

impl Stream for StepStream {
    type Item = StreamItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl StepStream {
    /// Wait for the driver and return the run's report.
    ///
    /// `None` when the run aborted with an error (already yielded as the
    /// stream's final item).
    pub async fn finish(self) -> Option<RunReport> {
        drop(self.inner);
        self.driver.await.ok().flatten()
    }
}

impl std::fmt::Debug for StepStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepStream").finish_non_exhaustive()
    }
}

impl Executor {
    /// Run a thread, streaming one update per committed superstep.
    ///
    /// Must be called within a tokio runtime; the run is driven by a spawned
    /// task paced by the consumer.
    pub fn run_stream(&self, thread_id: &str, input: WorkflowState) -> StepStream {
        self.run_stream_with_options(thread_id, input, StepOptions::default())
    }

    /// `run_stream` with pause gates.
    pub fn run_stream_with_options(
        &self,
        thread_id: &str,
        input: WorkflowState,
        options: StepOptions,
    ) -> StepStream {
        let (tx, rx) = flume::bounded::<StreamItem>(1);
        let executor = self.clone();
        let thread_id = thread_id.to_string();
        let driver = tokio::spawn(async move {
            match executor
                .run_inner(&thread_id, input, options, Some(tx.clone()))
                .await
            {
                Ok(report) => Some(report),
                Err(err) => {
                    let _ = tx.send_async(Err(err)).await;
                    None
                }
            }
        });
        StepStream {
            inner: rx.into_stream(),
            driver,
        }
    }
}
