//! `Taskboard` — ordered task board client library.
//!
//! Keeps tasks in status columns in a user-controlled order, turns
//! drag-and-drop moves into minimal placement batches, and reconciles the
//! optimistic local board with the server.

pub mod board;
pub mod config;
pub mod sync;
pub mod transport;
