// Session module - Link ownership and job state tracking
pub mod job;
pub mod link;

pub use job::{JobProgress, JobSignal, JobState, JobTracker};
pub use link::Session;
