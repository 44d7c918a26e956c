//! Terminal user interface for Minicord
//!
//! Ratatui front end over the same feeds the CLI uses.

mod app;
mod backend;
mod compose;
mod log_capture;
mod messages;
mod requests;
mod sidebar;
mod ui;

pub use app::run;
pub use log_capture::LogBuffer;
