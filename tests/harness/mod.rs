//! Test harness utilities for multi-connection WebSocket testing.
//!
//! This module provides reusable components for concurrency and stress
//! testing of the wsframe server: a masking client, echo servers over TCP and
//! in-memory pipes, and shared counters.

#![allow(dead_code)]

mod client;
mod metrics;
mod server;

pub use client::TestClient;
pub use metrics::{Latencies, Metrics};
pub use server::TestServer;
