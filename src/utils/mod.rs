//! Small shared helpers.

pub mod id_generator;
