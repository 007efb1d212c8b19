//! `Taskboard` server library.
//!
//! Exposes the board server for use in tests and embedding. The server
//! accepts WebSocket sessions, checks workspace membership, and applies
//! batches of task placements computed by clients.

pub mod auth;
pub mod config;
pub mod seed;
pub mod server;
pub mod service;
pub mod store;
