//! Real-time scheduler
//!
//! - `core`: per-CPU scheduler loop and the process-side hand-off
//! - `select`: EDF / RM dispatch choice
//! - `admission`: utilization bounds and the scheduling-parameter setters

pub mod admission;
pub mod core;
pub mod select;

pub use admission::{edf_contribution, rm_bound, rm_contribution, rm_priority, Utilization};
pub use select::select_next;
