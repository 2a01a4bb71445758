use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::core::protocol::command::{
    format_home, format_move, format_pack_type, format_set_step_size, jog_distance, Axis,
    StepConfig, WelderCommand,
};
use crate::core::protocol::status::StatusClassifier;
use crate::core::session::job::{JobProgress, JobSignal, JobState, JobTracker};
use crate::core::session::link::Session;
use crate::domain::config::{AxisConfig, DeploymentConfig};
use crate::domain::error::{WeldLinkError, WeldLinkResult};
use crate::infrastructure::serial::port::{PortFactory, SerialPortFactory};

/// Callback surface consumed by the UI layer
///
/// All callbacks are invoked from the engine's tasks with no locks
/// held; implementations may call back into the engine.
pub trait WelderObserver: Send + Sync {
    fn on_state_changed(&self, _state: JobState) {}
    fn on_progress(&self, _progress: &JobProgress) {}
    fn on_connection_lost(&self) {}
    fn on_emergency_stop(&self) {}
}

/// Session, job state and step sizes share one lock. The poll loop
/// applies remote events and the command path applies local
/// transitions; splitting the lock would reintroduce the races this
/// record exists to prevent.
struct Shared {
    session: Session,
    job: JobTracker,
    steps: StepConfig,
}

/// The serial session engine
///
/// Owns the single link session, validates and transmits operator
/// commands, and runs the background poll loop that turns inbound
/// status lines into job state transitions and observer callbacks.
pub struct WelderEngine {
    config: DeploymentConfig,
    factory: Arc<dyn PortFactory>,
    classifier: StatusClassifier,
    shared: Arc<Mutex<Shared>>,
    observers: Arc<RwLock<Vec<Arc<dyn WelderObserver>>>>,
    running: Arc<RwLock<bool>>,
    poll_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl WelderEngine {
    /// Create an engine backed by real serial ports
    pub fn new(config: DeploymentConfig) -> Self {
        Self::with_factory(config, Arc::new(SerialPortFactory))
    }

    /// Create an engine with a custom port factory (used by tests to
    /// substitute an in-memory wire)
    pub fn with_factory(config: DeploymentConfig, factory: Arc<dyn PortFactory>) -> Self {
        let classifier = StatusClassifier::new(config.protocol.progress_fields);

        Self {
            config,
            factory,
            classifier,
            shared: Arc::new(Mutex::new(Shared {
                session: Session::new(),
                job: JobTracker::new(),
                steps: StepConfig::new(),
            })),
            observers: Arc::new(RwLock::new(Vec::new())),
            running: Arc::new(RwLock::new(false)),
            poll_task: Mutex::new(None),
        }
    }

    /// Start the background poll loop
    pub async fn start(&self) -> WeldLinkResult<()> {
        let mut running = self.running.write().await;
        if *running {
            return Err(WeldLinkError::Engine {
                message: "engine is already running".to_string(),
            });
        }
        *running = true;
        drop(running);

        let handle = self.spawn_poll_loop();
        *self.poll_task.lock().await = Some(handle);

        info!("welder engine started");
        Ok(())
    }

    /// Stop the poll loop cooperatively and close the link.
    /// The loop observes the flag at the top of its next cycle; no
    /// forced interruption mid-cycle.
    pub async fn shutdown(&self) -> WeldLinkResult<()> {
        let mut running = self.running.write().await;
        if !*running {
            return Ok(());
        }
        *running = false;
        drop(running);

        if let Some(handle) = self.poll_task.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("poll task ended with error: {}", e);
            }
        }

        let mut shared = self.shared.lock().await;
        shared.session.close(true);
        shared.job.on_connection_lost(false);

        info!("welder engine stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Register an observer for state, progress and loss callbacks
    pub async fn add_observer(&self, observer: Arc<dyn WelderObserver>) {
        self.observers.write().await.push(observer);
    }

    /// Enumerate serial ports currently offered by the host.
    /// Queried fresh on every call; the set changes as devices plug in.
    pub fn available_ports(&self) -> WeldLinkResult<Vec<String>> {
        self.factory.list_ports()
    }

    /// Open the link and bring the machine to `Idle`
    pub async fn connect(&self, port_name: &str) -> WeldLinkResult<()> {
        if port_name.is_empty() {
            return Err(WeldLinkError::InvalidPort);
        }

        let port = self.factory.open(port_name, self.config.link.baud_rate)?;

        let signals = {
            let mut shared = self.shared.lock().await;
            shared.session.attach(port_name, port);
            shared.job.on_connected()
        };
        self.notify(&signals).await;
        Ok(())
    }

    /// Safe, operator-initiated disconnect. Never reported as a loss.
    pub async fn disconnect(&self) {
        let signals = {
            let mut shared = self.shared.lock().await;
            shared.session.close(true);
            shared.job.on_connection_lost(false)
        };
        self.notify(&signals).await;
    }

    pub async fn is_connected(&self) -> bool {
        self.shared.lock().await.session.is_open()
    }

    pub async fn job_state(&self) -> JobState {
        self.shared.lock().await.job.state()
    }

    pub async fn progress(&self) -> Option<JobProgress> {
        self.shared.lock().await.job.progress()
    }

    pub async fn step_size(&self, axis: Axis) -> Option<u32> {
        self.shared.lock().await.steps.get(axis)
    }

    /// Store a jog step size from raw operator input.
    ///
    /// The value persists across connects. For axes configured with
    /// explicit step registration it is also transmitted to the
    /// firmware, provided the link is open.
    pub async fn set_step_size(&self, axis: Axis, input: &str) -> WeldLinkResult<u32> {
        let mut shared = self.shared.lock().await;
        let value = shared.steps.set(axis, input)?;

        if self.axis_config(axis).register_step_size && shared.session.is_open() {
            shared
                .session
                .send_line(&format_set_step_size(axis, value))?;
        }

        debug!(%axis, value, "step size configured");
        Ok(value)
    }

    /// Validate and transmit one operator command.
    ///
    /// Guard violations are reported as errors with nothing written to
    /// the wire; the session stays usable.
    pub async fn issue(&self, command: WelderCommand) -> WeldLinkResult<()> {
        let signals = {
            let mut shared = self.shared.lock().await;
            self.dispatch(&mut shared, &command)?
        };
        self.notify(&signals).await;
        Ok(())
    }

    // Private methods

    fn axis_config(&self, axis: Axis) -> &AxisConfig {
        match axis {
            Axis::X => &self.config.axes.x,
            Axis::Y => &self.config.axes.y,
            Axis::Z => &self.config.axes.z,
        }
    }

    /// Guard, format and send; apply the local transition only after
    /// the write succeeded.
    fn dispatch(
        &self,
        shared: &mut Shared,
        command: &WelderCommand,
    ) -> WeldLinkResult<Vec<JobSignal>> {
        match command {
            WelderCommand::Jog { axis, direction } => {
                shared.job.require_joggable()?;
                let magnitude = shared.steps.require(*axis)?;
                let distance = jog_distance(*direction, magnitude, self.axis_config(*axis));
                shared.session.send_line(&format_move(*axis, distance))?;
                Ok(Vec::new())
            }
            WelderCommand::RegisterStepSize(axis) => {
                shared.job.require_joggable()?;
                let step = shared.steps.require(*axis)?;
                shared.session.send_line(&format_set_step_size(*axis, step))?;
                Ok(Vec::new())
            }
            WelderCommand::Home(axis) => {
                shared.job.require_idle()?;
                shared.session.send_line(&format_home(*axis))?;
                Ok(Vec::new())
            }
            WelderCommand::HomeAll => {
                shared.job.require_idle()?;
                shared.session.send_line("homeAll")?;
                Ok(Vec::new())
            }
            WelderCommand::ZStepCycle => {
                shared.job.require_joggable()?;
                shared.session.send_line("zStepCycle")?;
                Ok(Vec::new())
            }
            WelderCommand::StartJob => {
                shared.job.require_idle()?;
                let token = self.config.protocol.job_start_command.clone();
                shared.session.send_line(&token)?;
                info!(command = %token, "job started");
                Ok(shared.job.on_job_started())
            }
            WelderCommand::Stop => {
                match shared.job.state() {
                    JobState::Running | JobState::Paused => {}
                    state => return Err(WeldLinkError::Guard { state }),
                }
                shared.session.send_line("stop")?;
                Ok(shared.job.on_job_stopped())
            }
            WelderCommand::Pause => {
                if shared.job.state() != JobState::Running {
                    return Err(WeldLinkError::Guard {
                        state: shared.job.state(),
                    });
                }
                shared.session.send_line("pause")?;
                Ok(shared.job.on_job_paused())
            }
            WelderCommand::Resume => {
                if shared.job.state() != JobState::Paused {
                    return Err(WeldLinkError::Guard {
                        state: shared.job.state(),
                    });
                }
                shared.session.send_line("continue")?;
                Ok(shared.job.on_job_resumed())
            }
            WelderCommand::Align => {
                shared.job.require_idle()?;
                shared.session.send_line("align")?;
                Ok(Vec::new())
            }
            WelderCommand::SelectPack(kind) => {
                shared.job.require_idle()?;
                shared.session.send_line(&format_pack_type(*kind))?;
                Ok(Vec::new())
            }
        }
    }

    fn spawn_poll_loop(&self) -> tokio::task::JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let observers = Arc::clone(&self.observers);
        let running = Arc::clone(&self.running);
        let classifier = self.classifier.clone();
        let interval = Duration::from_millis(self.config.link.poll_interval_ms);

        tokio::spawn(async move {
            while *running.read().await {
                let signals = {
                    let mut shared = shared.lock().await;
                    Self::poll_tick(&mut shared, &classifier)
                };
                Self::notify_observers(&observers, &signals).await;
                tokio::time::sleep(interval).await;
            }
            debug!("poll loop exited");
        })
    }

    /// One poll cycle: loss-edge detection, then a full drain of
    /// buffered status lines. Holds the shared lock for exactly one
    /// drain; command issuance interleaves between cycles.
    fn poll_tick(shared: &mut Shared, classifier: &StatusClassifier) -> Vec<JobSignal> {
        let mut signals = Vec::new();

        if let Some(unexpected) = shared.session.take_loss_edge() {
            signals.extend(shared.job.on_connection_lost(unexpected));
        }

        while let Some(line) = shared.session.try_read_line() {
            let event = classifier.classify(&line);
            signals.extend(shared.job.apply_status(&event));
        }

        // A read error during the drain closes the session; pick up
        // that edge in the same cycle rather than a poll later.
        if let Some(unexpected) = shared.session.take_loss_edge() {
            signals.extend(shared.job.on_connection_lost(unexpected));
        }

        signals
    }

    /// Run one poll cycle immediately instead of waiting for the next
    /// scheduled tick, e.g. right after a command the UI wants
    /// reflected.
    pub async fn poll_now(&self) {
        let signals = {
            let mut shared = self.shared.lock().await;
            Self::poll_tick(&mut shared, &self.classifier)
        };
        self.notify(&signals).await;
    }

    async fn notify(&self, signals: &[JobSignal]) {
        Self::notify_observers(&self.observers, signals).await;
    }

    async fn notify_observers(
        observers: &RwLock<Vec<Arc<dyn WelderObserver>>>,
        signals: &[JobSignal],
    ) {
        if signals.is_empty() {
            return;
        }
        let observers: Vec<_> = observers.read().await.iter().cloned().collect();
        for signal in signals {
            for observer in &observers {
                match signal {
                    JobSignal::StateChanged(state) => observer.on_state_changed(*state),
                    JobSignal::Progress(progress) => observer.on_progress(progress),
                    JobSignal::ConnectionLost => observer.on_connection_lost(),
                    JobSignal::EmergencyStop => observer.on_emergency_stop(),
                }
            }
        }
    }
}
