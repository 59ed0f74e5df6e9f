//! Versioned state channels.
//!
//! Each channel stores one category of workflow data together with a version
//! counter. Versions are bumped by the barrier only when a superstep actually
//! changed the channel's content, which makes "did anything happen" checks
//! cheap for checkpointing and tests.
//!
//! The merge policy of a channel lives in [`crate::reducers`], not here:
//! channels are plain versioned containers.

pub mod errors;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::message::Message;
use errors::ErrorEvent;

/// Common behavior for versioned state channels.
pub trait Channel {
    /// The snapshot type cloned out of the channel.
    type Snapshot;

    /// Clone the channel contents.
    fn snapshot(&self) -> Self::Snapshot;

    /// Current version counter.
    fn version(&self) -> u32;

    /// Overwrite the version counter. Only the barrier should call this.
    fn set_version(&mut self, version: u32);
}

macro_rules! versioned_channel {
    ($(#[$meta:meta])* $name:ident, $inner:ty, $snapshot:ty) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub struct $name {
            contents: $inner,
            version: u32,
        }

        impl $name {
            /// Create a channel with explicit contents and version.
            #[must_use]
            pub fn new(contents: $inner, version: u32) -> Self {
                Self { contents, version }
            }

            /// Mutable access to the contents. Does not bump the version;
            /// version management belongs to the barrier.
            pub fn get_mut(&mut self) -> &mut $inner {
                &mut self.contents
            }

            /// Number of entries currently stored.
            #[must_use]
            pub fn len(&self) -> usize {
                self.contents.len()
            }

            /// Returns `true` when the channel holds no entries.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.contents.is_empty()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new(<$inner>::default(), 1)
            }
        }

        impl Channel for $name {
            type Snapshot = $snapshot;

            fn snapshot(&self) -> Self::Snapshot {
                self.contents.clone()
            }

            fn version(&self) -> u32 {
                self.version
            }

            fn set_version(&mut self, version: u32) {
                self.version = version;
            }
        }
    };
}

versioned_channel!(
    /// Append-only conversation history.
    MessagesChannel,
    Vec<Message>,
    Vec<Message>
);

versioned_channel!(
    /// Keyed scratch values; later writes to a key replace earlier ones.
    DataChannel,
    FxHashMap<String, Value>,
    FxHashMap<String, Value>
);

versioned_channel!(
    /// Non-fatal error events accumulated across supersteps.
    ErrorsChannel,
    Vec<ErrorEvent>,
    Vec<ErrorEvent>
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channels_start_at_version_one() {
        assert_eq!(MessagesChannel::default().version(), 1);
        assert_eq!(DataChannel::default().version(), 1);
        assert_eq!(ErrorsChannel::default().version(), 1);
    }

    #[test]
    fn snapshot_is_independent_of_later_mutation() {
        let mut data = DataChannel::default();
        data.get_mut().insert("mood".into(), json!("happy"));
        let snap = data.snapshot();
        data.get_mut().clear();
        assert_eq!(snap.get("mood"), Some(&json!("happy")));
        assert!(data.is_empty());
    }

    #[test]
    fn get_mut_leaves_version_untouched() {
        let mut messages = MessagesChannel::default();
        messages.get_mut().push(Message::user("hi"));
        assert_eq!(messages.version(), 1);
        messages.set_version(2);
        assert_eq!(messages.version(), 2);
    }
}
