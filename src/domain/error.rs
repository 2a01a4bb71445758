use thiserror::Error;

use crate::core::protocol::command::Axis;
use crate::core::session::job::JobState;

/// WeldLink unified error type
#[derive(Error, Debug)]
pub enum WeldLinkError {
    #[error("Port unavailable: {message}")]
    PortUnavailable { message: String },

    #[error("Invalid port name")]
    InvalidPort,

    #[error("Write to firmware failed: {message}")]
    WriteFailed { message: String },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Command not allowed while {state}")]
    Guard { state: JobState },

    #[error("No step size configured for {axis} axis")]
    MissingStepSize { axis: Axis },

    #[error("Invalid step size '{input}': must be a positive integer")]
    InvalidStepSize { input: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Engine error: {message}")]
    Engine { message: String },
}

/// Inbound protocol violations. Logged and dropped, never fatal,
/// and never a reason to change the job state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed status line: {line:?}")]
    Malformed { line: String },

    #[error("progress line has {got} fields, expected {expected}: {line:?}")]
    SchemaMismatch {
        line: String,
        got: usize,
        expected: usize,
    },
}

pub type WeldLinkResult<T> = Result<T, WeldLinkError>;
