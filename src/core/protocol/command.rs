use crate::domain::config::AxisConfig;
use crate::domain::error::{WeldLinkError, WeldLinkResult};

/// Machine axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Wire prefix for axis-scoped commands (`xMove`, `yHome`, ...)
    pub fn prefix(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
            Axis::Z => write!(f, "Z"),
        }
    }
}

/// Logical jog direction
///
/// `Forward` is X-forward, Y-left and Z-up; `Reverse` is the opposite.
/// Whether `Forward` puts a positive or negative distance on the wire
/// is an axis convention (`AxisConfig::inverted`) because firmware
/// revisions disagree, X in particular.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JogDirection {
    Forward,
    Reverse,
}

/// Battery pack arrangement selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackKind {
    A,
    B,
}

impl std::fmt::Display for PackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackKind::A => write!(f, "A"),
            PackKind::B => write!(f, "B"),
        }
    }
}

/// Operator-triggered command, pre-validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WelderCommand {
    Jog { axis: Axis, direction: JogDirection },
    RegisterStepSize(Axis),
    Home(Axis),
    HomeAll,
    ZStepCycle,
    StartJob,
    Stop,
    Pause,
    Resume,
    Align,
    SelectPack(PackKind),
}

/// Per-axis jog step sizes, entered by the operator
///
/// Values persist across connects and disconnects; nothing is put on
/// the wire until a jog or an explicit registration command uses them.
#[derive(Debug, Clone, Default)]
pub struct StepConfig {
    x: Option<u32>,
    y: Option<u32>,
    z: Option<u32>,
}

impl StepConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a step size from raw operator input.
    /// Rejects non-numeric input and zero.
    pub fn set(&mut self, axis: Axis, input: &str) -> WeldLinkResult<u32> {
        let value: u32 = input
            .trim()
            .parse()
            .map_err(|_| WeldLinkError::InvalidStepSize {
                input: input.to_string(),
            })?;
        if value == 0 {
            return Err(WeldLinkError::InvalidStepSize {
                input: input.to_string(),
            });
        }

        let slot = match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        };
        *slot = Some(value);
        Ok(value)
    }

    pub fn get(&self, axis: Axis) -> Option<u32> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Step size for `axis`, or `MissingStepSize` if the operator has
    /// not configured one.
    pub fn require(&self, axis: Axis) -> WeldLinkResult<u32> {
        self.get(axis)
            .ok_or(WeldLinkError::MissingStepSize { axis })
    }
}

/// Signed jog distance for one move, honoring the axis convention
pub fn jog_distance(direction: JogDirection, magnitude: u32, axis_config: &AxisConfig) -> i64 {
    let signed = match direction {
        JogDirection::Forward => magnitude as i64,
        JogDirection::Reverse => -(magnitude as i64),
    };
    if axis_config.inverted {
        -signed
    } else {
        signed
    }
}

/// `<axis>Move <±n>`
pub fn format_move(axis: Axis, distance: i64) -> String {
    format!("{}Move {}", axis.prefix(), distance)
}

/// `<axis>SetStepSize <n>`
pub fn format_set_step_size(axis: Axis, step: u32) -> String {
    format!("{}SetStepSize {}", axis.prefix(), step)
}

/// `<axis>Home`
pub fn format_home(axis: Axis) -> String {
    format!("{}Home", axis.prefix())
}

/// `packType <A|B>`
pub fn format_pack_type(kind: PackKind) -> String {
    format!("packType {}", kind)
}
