//! Shared task types and wire protocol for `Taskboard`.

pub mod batch;
pub mod codec;
pub mod filter;
pub mod protocol;
pub mod task;
