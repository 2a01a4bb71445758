//! WeldLink Library
//!
//! Host-side serial session engine for a CNC spot-welder motion
//! controller: connection lifecycle, line-based command/status
//! protocol, and the job state machine the operator UI observes.

pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::engine::{WelderEngine, WelderObserver};
pub use crate::core::protocol::command::{Axis, JogDirection, PackKind, StepConfig, WelderCommand};
pub use crate::core::protocol::status::{StatusClassifier, StatusEvent};
pub use crate::core::session::job::{JobProgress, JobState};
pub use domain::config::DeploymentConfig;
pub use domain::error::{ProtocolError, WeldLinkError, WeldLinkResult};
pub use infrastructure::serial::port::{LinkPort, PortFactory, SerialPortFactory};
