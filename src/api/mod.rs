//! API module
//!
//! Contains HTTP request handlers for the research pipeline endpoints

pub mod research;
