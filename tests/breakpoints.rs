//! Breakpoint gating and pause options.

mod common;

use common::{Say, message_texts};

use threadflow::graph::GraphBuilder;
use threadflow::runtime::{Executor, PausedReason, StepOptions, StepResult};
use threadflow::state::WorkflowState;
use threadflow::types::NodeId;

fn three_step_workflow() -> threadflow::graph::Workflow {
    GraphBuilder::new()
        .add_node("draft", Say("drafted"))
        .add_node("review", Say("reviewed"))
        .add_node("publish", Say("published"))
        .add_edge(NodeId::Start, "draft")
        .add_edge("draft", "review")
        .add_edge("review", "publish")
        .add_edge("publish", NodeId::End)
        .compile()
        .unwrap()
}

#[tokio::test]
async fn gated_node_does_not_run_until_resumed() {
    let executor = Executor::in_memory(three_step_workflow());

    let report = executor
        .run_until("t1", WorkflowState::default(), "review")
        .await
        .unwrap();
    assert_eq!(
        report.result,
        StepResult::Paused(PausedReason::BeforeNode {
            node: NodeId::named("review")
        })
    );
    assert_eq!(message_texts(&report.snapshot), vec!["drafted"]);

    // The suspension itself is persisted, gate included.
    let latest = executor.store().latest("t1").await.unwrap().unwrap();
    assert_eq!(latest.pending_gate, Some(NodeId::named("review")));
    assert_eq!(latest.frontier, vec![NodeId::named("review")]);

    let resumed = executor.resume("t1").await.unwrap();
    assert_eq!(resumed.result, StepResult::Completed);
    assert_eq!(
        message_texts(&resumed.snapshot),
        vec!["drafted", "reviewed", "published"]
    );
}

#[tokio::test]
async fn gate_on_the_entry_node_suspends_before_any_work() {
    let executor = Executor::in_memory(three_step_workflow());
    let report = executor
        .run_until("t1", WorkflowState::with_user_message("go"), "draft")
        .await
        .unwrap();
    assert!(matches!(
        report.result,
        StepResult::Paused(PausedReason::BeforeNode { .. })
    ));
    // Only the user's input is in state; nothing executed.
    assert_eq!(message_texts(&report.snapshot), vec!["go"]);
}

#[tokio::test]
async fn resuming_with_the_same_gate_walks_through_it_once() {
    let executor = Executor::in_memory(three_step_workflow());
    let options = StepOptions::default().interrupt_before("review");

    executor
        .run_with_options("t1", WorkflowState::default(), options.clone())
        .await
        .unwrap();
    // Resume keeps the gate configured; the pending node runs exactly once
    // and the gate does not re-fire on it.
    let resumed = executor
        .resume_with_options("t1", options)
        .await
        .unwrap();
    assert_eq!(resumed.result, StepResult::Completed);
    assert_eq!(
        message_texts(&resumed.snapshot),
        vec!["drafted", "reviewed", "published"]
    );
}

#[tokio::test]
async fn interrupt_after_pauses_on_a_committed_step() {
    let executor = Executor::in_memory(three_step_workflow());
    let report = executor
        .run_with_options(
            "t1",
            WorkflowState::default(),
            StepOptions::default().interrupt_after("draft"),
        )
        .await
        .unwrap();
    assert_eq!(
        report.result,
        StepResult::Paused(PausedReason::AfterNode {
            node: NodeId::named("draft")
        })
    );
    // Unlike a before-gate, the step is already persisted.
    let latest = executor.store().latest("t1").await.unwrap().unwrap();
    assert_eq!(latest.step, 1);
    assert!(latest.pending_gate.is_none());
}

#[tokio::test]
async fn interrupt_each_step_single_steps_the_thread() {
    let executor = Executor::in_memory(three_step_workflow());
    let options = StepOptions::default().interrupt_each_step();

    let first = executor
        .run_with_options("t1", WorkflowState::default(), options.clone())
        .await
        .unwrap();
    assert_eq!(first.result, StepResult::Paused(PausedReason::EachStep));
    assert_eq!(first.steps_run, 1);

    let second = executor
        .resume_with_options("t1", options.clone())
        .await
        .unwrap();
    assert_eq!(second.result, StepResult::Paused(PausedReason::EachStep));
    assert_eq!(message_texts(&second.snapshot), vec!["drafted", "reviewed"]);

    // The final step completes rather than pausing into a terminal frontier.
    let third = executor.resume_with_options("t1", options).await.unwrap();
    assert_eq!(third.result, StepResult::Completed);
}
