// Domain module - Errors and deployment configuration
pub mod config;
pub mod error;
