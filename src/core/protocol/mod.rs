// Protocol module - Line framing, status classification, command formats
pub mod codec;
pub mod command;
pub mod status;

pub use codec::{DecodedLine, LineCodec};
pub use command::{Axis, JogDirection, PackKind, StepConfig, WelderCommand};
pub use status::{StatusClassifier, StatusEvent};
