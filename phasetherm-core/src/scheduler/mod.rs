//! Cooperative task scheduler
//!
//! A single logical thread of control runs short task bodies in priority
//! order. Tasks never block; they finish their state changes and hand
//! control back, and the caller sleeps until the next deadline.

pub mod executor;

pub use executor::{TaskId, TaskScheduler, TASK_COUNT};
