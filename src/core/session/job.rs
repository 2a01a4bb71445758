use tracing::{debug, info, warn};

use crate::core::protocol::status::StatusEvent;
use crate::domain::error::{WeldLinkError, WeldLinkResult};

/// Authoritative machine run state
///
/// `Running`, `Paused` and `EmergencyStop` are only reachable while the
/// link is open; losing the link forces `Disconnected` from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Disconnected,
    Idle,
    Running,
    Paused,
    EmergencyStop,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Disconnected => write!(f, "disconnected"),
            JobState::Idle => write!(f, "idle"),
            JobState::Running => write!(f, "running"),
            JobState::Paused => write!(f, "paused"),
            JobState::EmergencyStop => write!(f, "emergency stop"),
        }
    }
}

/// Latest reported job progress. Every in-schema progress line
/// replaces all fields; nothing is carried over from earlier reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobProgress {
    pub row: Option<u32>,
    pub pass: u32,
    pub cell: u32,
}

/// Notification produced by a state transition, dispatched to
/// observers by the engine after the shared lock is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSignal {
    StateChanged(JobState),
    Progress(JobProgress),
    ConnectionLost,
    EmergencyStop,
}

/// The job state machine
///
/// Mutated only here, in response to local operator commands and
/// remote status events. The UI layer observes, never writes.
#[derive(Debug)]
pub struct JobTracker {
    state: JobState,
    progress: Option<JobProgress>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self {
            state: JobState::Disconnected,
            progress: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn progress(&self) -> Option<JobProgress> {
        self.progress
    }

    /// Guard check for commands that require an idle machine
    /// (job start, homing, alignment, pack selection).
    pub fn require_idle(&self) -> WeldLinkResult<()> {
        if self.state == JobState::Idle {
            Ok(())
        } else {
            Err(WeldLinkError::Guard { state: self.state })
        }
    }

    /// Guard check for jogging. Jogs are legal while idle or paused
    /// (the operator may reposition mid-job during a pause) but never
    /// while a job is actively running or after an emergency stop.
    pub fn require_joggable(&self) -> WeldLinkResult<()> {
        match self.state {
            JobState::Idle | JobState::Paused => Ok(()),
            state => Err(WeldLinkError::Guard { state }),
        }
    }

    /// Local transition: connect succeeded
    pub fn on_connected(&mut self) -> Vec<JobSignal> {
        self.transition(JobState::Idle)
    }

    /// Forced transition on loss of the link, bypassing all guards.
    /// Emits `ConnectionLost` only for an unexpected loss.
    pub fn on_connection_lost(&mut self, unexpected: bool) -> Vec<JobSignal> {
        self.progress = None;
        let mut signals = self.transition(JobState::Disconnected);
        if unexpected {
            warn!("link lost unexpectedly");
            signals.push(JobSignal::ConnectionLost);
        }
        signals
    }

    /// Local transition: job-start command accepted
    pub fn on_job_started(&mut self) -> Vec<JobSignal> {
        self.transition(JobState::Running)
    }

    /// Local transition: stop accepted. Pending progress is cleared.
    pub fn on_job_stopped(&mut self) -> Vec<JobSignal> {
        self.progress = None;
        self.transition(JobState::Idle)
    }

    /// Local transition: pause accepted
    pub fn on_job_paused(&mut self) -> Vec<JobSignal> {
        self.transition(JobState::Paused)
    }

    /// Local transition: resume accepted
    pub fn on_job_resumed(&mut self) -> Vec<JobSignal> {
        self.transition(JobState::Running)
    }

    /// Apply one remote status event
    pub fn apply_status(&mut self, event: &StatusEvent) -> Vec<JobSignal> {
        match event {
            StatusEvent::Finished => self.on_finished(),
            StatusEvent::RunningProgress { row, pass, cell } => self.on_progress(JobProgress {
                row: *row,
                pass: *pass,
                cell: *cell,
            }),
            StatusEvent::Paused => {
                // Firmware-initiated pause; sync only from Running so a
                // pause echo cannot drag the machine out of ESTOP.
                if self.state == JobState::Running {
                    self.transition(JobState::Paused)
                } else {
                    Vec::new()
                }
            }
            StatusEvent::EmergencyStop => self.on_emergency_stop(),
            StatusEvent::Idle | StatusEvent::Moving => {
                // Informational only; the local command path already
                // tracks run state, and ESTOP recovery goes through a
                // reconnect, not an idle report.
                debug!(event = ?event, "status report");
                Vec::new()
            }
            StatusEvent::Comment | StatusEvent::Blank | StatusEvent::Malformed => Vec::new(),
        }
    }

    fn on_finished(&mut self) -> Vec<JobSignal> {
        match self.state {
            JobState::Running | JobState::Paused => {
                info!("job complete");
                self.progress = None;
                self.transition(JobState::Idle)
            }
            // `finished` while already idle is a no-op
            _ => Vec::new(),
        }
    }

    fn on_progress(&mut self, progress: JobProgress) -> Vec<JobSignal> {
        let mut signals = Vec::new();
        // A progress report implies the job is running, e.g. when the
        // firmware resumed on its own or a start raced a status burst.
        if self.state == JobState::Idle || self.state == JobState::Paused {
            signals.extend(self.transition(JobState::Running));
        }
        if self.state != JobState::Running {
            // No progress updates while estopped or disconnected
            return signals;
        }
        self.progress = Some(progress);
        signals.push(JobSignal::Progress(progress));
        signals
    }

    fn on_emergency_stop(&mut self) -> Vec<JobSignal> {
        if self.state == JobState::EmergencyStop || self.state == JobState::Disconnected {
            // Alert once per edge; the firmware repeats ESTOP lines
            return Vec::new();
        }
        warn!("emergency stop reported by firmware");
        let mut signals = self.transition(JobState::EmergencyStop);
        signals.push(JobSignal::EmergencyStop);
        signals
    }

    fn transition(&mut self, next: JobState) -> Vec<JobSignal> {
        if self.state == next {
            return Vec::new();
        }
        debug!(from = %self.state, to = %next, "job state transition");
        self.state = next;
        vec![JobSignal::StateChanged(next)]
    }
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}
