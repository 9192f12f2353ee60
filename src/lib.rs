//! Core library for the `surge` CLI.
//!
//! Provides the building blocks used by the binary: CLI argument types,
//! configuration merging, HTTP and WebSocket protocol adapters, the simple
//! and workflow scenario engines, the session orchestrator, metrics
//! aggregation, and result reporters.
pub mod args;
pub mod config;
pub mod entry;
pub mod error;
pub mod jsonpath;
pub mod metrics;
pub mod protocol;
pub mod reporters;
pub mod runner;
pub mod scenario;
pub mod shutdown;
pub mod shutdown_handlers;
pub mod system;
