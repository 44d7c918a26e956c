//! API client modules for the Minicord REST API
//!
//! One module per resource. Each exposes `*_data` functions that map
//! one-to-one onto endpoints and return typed models, plus the printing
//! wrappers the CLI subcommands call.

pub mod auth;
pub mod client;
pub mod conversations;
pub mod error;
pub mod friends;
pub mod messages;
pub mod users;

pub use error::ApiError;
