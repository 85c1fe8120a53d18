pub mod config;
pub mod error;

// GitHub access
pub mod github;
pub mod tree;
pub mod suggest;

// AI flows
pub mod ai;
pub mod insights;

// Server state
pub mod session;

// HTTP surface
pub mod api;
pub mod web;

pub mod cli;

// Re-exports
pub use config::Settings;
pub use error::{Error, Result};
pub use insights::Insights;
