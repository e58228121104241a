//! Parkchain - blocking relations between parked cars.
//!
//! This crate keeps a directed graph of "car A blocks car B" relations,
//! rejects self-blocking, duplicates and cycles, and walks the graph to tell
//! every upstream owner to move when a blocked driver needs to leave. It
//! ships both a library and the `parkchain` CLI.

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod directory;
pub mod domain;
pub mod error;
pub mod graph;
pub mod notify;
pub mod service;
pub mod storage;

// Configuration and application context
pub mod app;
pub mod config;

// Public CLI module (needed by binary)
pub mod cli;

// Command implementations
pub mod commands;

// Output formatting
pub mod output;
