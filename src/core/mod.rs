// Core module - Session engine internals
pub mod engine;
pub mod protocol;
pub mod session;

pub use engine::{WelderEngine, WelderObserver};
