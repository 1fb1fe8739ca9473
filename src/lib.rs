//! Command line water intake tracker. Log drinks against a daily goal,
//! review streaks and history, and run a foreground reminder loop. All state
//! lives in a single serialized database image inside the application
//! directory.

pub mod cli;
pub mod reminder;
pub mod stats;
pub mod store;
pub mod utils;
