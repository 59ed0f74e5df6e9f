//! Per-channel merge policies applied at the superstep barrier.
//!
//! A [`Reducer`] folds the ordered partials of one superstep into a single
//! channel. The ordering of the slice is the frontier's registration order,
//! which is what makes replay deterministic: the same checkpoint and inputs
//! always produce the same merged state, regardless of how the concurrent
//! node futures interleaved.
//!
//! Policies are fixed per channel: `messages` appends, `data` replaces per
//! key (last writer in frontier order wins), `errors` appends in a stable
//! scope/origin order.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::channels::Channel;
use crate::node::NodePartial;
use crate::state::WorkflowState;
use crate::types::ChannelId;

/// Merges one superstep's partials into one channel of live state.
pub trait Reducer: Send + Sync {
    /// Apply the ordered partials. Returns `true` if the channel changed.
    fn apply(&self, state: &mut WorkflowState, partials: &[NodePartial]) -> bool;
}

/// Append-merge for the `messages` channel.
#[derive(Debug, Default)]
pub struct AppendMessages;

impl Reducer for AppendMessages {
    fn apply(&self, state: &mut WorkflowState, partials: &[NodePartial]) -> bool {
        let mut changed = false;
        for partial in partials {
            if let Some(messages) = &partial.messages
                && !messages.is_empty()
            {
                state.messages.get_mut().extend(messages.iter().cloned());
                changed = true;
            }
        }
        changed
    }
}

/// Per-key replace-merge for the `data` channel.
#[derive(Debug, Default)]
pub struct MergeData;

impl Reducer for MergeData {
    fn apply(&self, state: &mut WorkflowState, partials: &[NodePartial]) -> bool {
        let mut changed = false;
        for partial in partials {
            if let Some(data) = &partial.data
                && !data.is_empty()
            {
                let live = state.data.get_mut();
                for (key, value) in data {
                    live.insert(key.clone(), value.clone());
                }
                changed = true;
            }
        }
        changed
    }
}

/// Append-merge for the `errors` channel with a stable batch order.
///
/// The batch is sorted by scope and origin before appending so that an
/// identical superstep always leaves identical error ordering behind, even
/// though the events were produced concurrently.
#[derive(Debug, Default)]
pub struct AppendErrors;

impl Reducer for AppendErrors {
    fn apply(&self, state: &mut WorkflowState, partials: &[NodePartial]) -> bool {
        let mut batch: Vec<_> = partials
            .iter()
            .filter_map(|p| p.errors.as_ref())
            .flatten()
            .cloned()
            .collect();
        if batch.is_empty() {
            return false;
        }
        batch.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        state.errors.get_mut().extend(batch);
        true
    }
}

/// The fixed channel-to-reducer mapping used by the barrier.
#[derive(Clone)]
pub struct ReducerRegistry {
    reducers: Vec<(ChannelId, Arc<dyn Reducer>)>,
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        Self {
            reducers: vec![
                (ChannelId::Messages, Arc::new(AppendMessages)),
                (ChannelId::Data, Arc::new(MergeData)),
                (ChannelId::Errors, Arc::new(AppendErrors)),
            ],
        }
    }
}

impl ReducerRegistry {
    /// Merge a superstep's partials into live state and bump the version of
    /// every channel that actually changed.
    ///
    /// Returns the changed channels, in the registry's fixed order.
    pub fn apply_all(
        &self,
        state: &mut WorkflowState,
        partials: &[NodePartial],
    ) -> Vec<ChannelId> {
        let mut updated = Vec::new();
        for (channel, reducer) in &self.reducers {
            if reducer.apply(state, partials) {
                bump_version(state, channel);
                updated.push(channel.clone());
            }
        }
        updated
    }
}

impl std::fmt::Debug for ReducerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let channels: Vec<_> = self.reducers.iter().map(|(c, _)| c).collect();
        f.debug_struct("ReducerRegistry")
            .field("channels", &channels)
            .finish()
    }
}

fn bump_version(state: &mut WorkflowState, channel: &ChannelId) {
    match channel {
        ChannelId::Messages => {
            let v = state.messages.version();
            state.messages.set_version(v + 1);
        }
        ChannelId::Data => {
            let v = state.data.version();
            state.data.set_version(v + 1);
        }
        ChannelId::Errors => {
            let v = state.errors.version();
            state.errors.set_version(v + 1);
        }
    }
}

/// Helper for building a single-entry data map in tests and nodes.
#[must_use]
pub fn data_entry(key: &str, value: serde_json::Value) -> FxHashMap<String, serde_json::Value> {
    let mut map = FxHashMap::default();
    map.insert(key.to_string(), value);
    map
}
