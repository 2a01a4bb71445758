use serde::{Deserialize, Serialize};

/// WeldLink deployment configuration
///
/// Everything that varies between firmware revisions and rigs lives
/// here: link parameters, the inbound progress schema, the job-start
/// token, and the per-axis sign conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Serial link settings
    #[serde(default)]
    pub link: LinkConfig,
    /// Wire protocol settings
    #[serde(default)]
    pub protocol: ProtocolConfig,
    /// Per-axis conventions
    #[serde(default)]
    pub axes: AxesConfig,
}

/// Serial link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Baud rate for the serial link
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Poll loop interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

/// Wire protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Expected field count of inbound `R` progress lines.
    /// Two-field firmware reports pass/cell; three-field reports
    /// row/pass/cell.
    #[serde(default = "default_progress_fields")]
    pub progress_fields: usize,
    /// Job-start token for this deployment
    /// (`runSeries`, `runPack` or `runScript` depending on firmware)
    #[serde(default = "default_job_start")]
    pub job_start_command: String,
}

/// Per-axis conventions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AxesConfig {
    #[serde(default)]
    pub x: AxisConfig,
    #[serde(default)]
    pub y: AxisConfig,
    #[serde(default)]
    pub z: AxisConfig,
}

/// Convention table for a single axis
///
/// The firmware exposes an inversion flag per stepper, and revisions
/// disagree on which logical direction is positive (X in particular is
/// inverted relative to Y/Z on some rigs). With the defaults below the
/// forward direction (Y-left, Z-up, X-forward) sends a positive
/// distance, matching the reference firmware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Negate the jog distance for this axis
    #[serde(default)]
    pub inverted: bool,
    /// Send an explicit `<axis>SetStepSize <n>` command when the
    /// operator registers a step size. Firmware variants that track the
    /// step size on-board need this; others take the distance with
    /// every move and ignore registration.
    #[serde(default)]
    pub register_step_size: bool,
}

// Default value functions

fn default_baud_rate() -> u32 {
    9600
}

fn default_poll_interval() -> u64 {
    100
}

fn default_progress_fields() -> usize {
    2
}

fn default_job_start() -> String {
    "runSeries".to_string()
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            protocol: ProtocolConfig::default(),
            axes: AxesConfig::default(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            progress_fields: default_progress_fields(),
            job_start_command: default_job_start(),
        }
    }
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            inverted: false,
            register_step_size: false,
        }
    }
}
