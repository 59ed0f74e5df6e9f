//! Identifier generation for threads and runs.

use rand::Rng;
use uuid::Uuid;

/// Globally unique thread id.
#[must_use]
pub fn thread_id() -> String {
    Uuid::new_v4().to_string()
}

/// Short human-scannable run id for log correlation.
#[must_use]
pub fn run_id() -> String {
    let suffix: u32 = rand::rng().random();
    format!("run-{suffix:08x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_ids_are_unique() {
        assert_ne!(thread_id(), thread_id());
    }

    #[test]
    fn run_ids_have_stable_shape() {
        let id = run_id();
        assert!(id.starts_with("run-"));
        assert_eq!(id.len(), 12);
    }
}
