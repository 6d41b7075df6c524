use super::logger::{BinaryLogLevel, LoggerConfig};

/// Configuration for the checks performed while kernels run.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ValidationConfig {
    /// Logger configuration for reported violations.
    #[serde(default)]
    pub logger: LoggerConfig<BinaryLogLevel>,

    /// Which checks are performed.
    #[serde(default)]
    pub level: ValidationLevel,
}

/// Amount of checking performed while kernels run.
#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum ValidationLevel {
    /// No checks. Synchronization bugs silently produce wrong results.
    #[serde(rename = "disabled")]
    Disabled,

    /// Fence protocol checks: double signals, unmatched signals and leaked tokens.
    #[serde(rename = "fences")]
    Fences,

    /// Fence checks, plus happens-before race detection and placement overlap checks.
    #[default]
    #[serde(rename = "full")]
    Full,
}

impl ValidationLevel {
    /// Whether the fence protocol is checked.
    pub fn checks_fences(self) -> bool {
        self >= ValidationLevel::Fences
    }

    /// Whether memory accesses are checked for races and overlaps.
    pub fn checks_hazards(self) -> bool {
        self >= ValidationLevel::Full
    }
}
