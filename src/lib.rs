//! Research Pipeline Library
//!
//! Turns a research query into a written report and an emailed copy:
//! plan searches, run them, write the report, deliver it.
//! The HTTP server binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
/// Shared application state
pub mod state;
