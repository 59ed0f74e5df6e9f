//! Graph definition and compilation.
//!
//! A workflow graph is built fluently with [`GraphBuilder`], validated by
//! [`GraphBuilder::compile`], and executed as an immutable [`Workflow`].
//! Edge kinds live in [`edges`]; validation and the compiled form live in
//! [`compile`].

pub mod builder;
pub mod compile;
pub mod edges;

pub use builder::GraphBuilder;
pub use compile::{CompileError, Workflow};
pub use edges::{ConditionalEdge, Edge, EdgePredicate};
