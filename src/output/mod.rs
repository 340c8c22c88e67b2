//! Output module for summarizing harvest results
//!
//! This module handles:
//! - Per-topic reports (pages, rows, duplicates, failures)
//! - Rendering the run summary for the terminal

mod report;

pub use report::{print_summary, render_summary, HarvestSummary, TopicReport};
