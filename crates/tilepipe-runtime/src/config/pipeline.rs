use super::logger::{LogLevel, LoggerConfig};

/// Configuration for the execution of pipe instruction queues.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PipelineConfig {
    /// Logger configuration for pipeline logs.
    #[serde(default)]
    pub logger: LoggerConfig<PipelineLogLevel>,

    /// How pending instructions of different pipes are interleaved when a core drains.
    #[serde(default)]
    pub schedule: SchedulePolicy,
}

/// Log levels for pipeline execution.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PipelineLogLevel {
    /// Pipeline logging is disabled.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,

    /// Per kernel summaries are logged, such as the number of instructions executed per pipe.
    #[serde(rename = "basic")]
    Basic,

    /// Every issued and executed instruction is logged.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for PipelineLogLevel {}

/// Order in which runnable pipes execute their next instruction.
///
/// Every policy respects the FIFO order within a pipe and the fences between pipes. A correctly
/// synchronized kernel produces the same results under all of them.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SchedulePolicy {
    /// Each round executes one instruction from every runnable pipe, in pipe order.
    #[default]
    #[serde(rename = "round_robin")]
    RoundRobin,

    /// Each step executes one instruction from a runnable pipe chosen at random.
    #[serde(rename = "shuffled")]
    Shuffled {
        /// Seed of the random generator, the same seed replays the same interleaving.
        seed: u64,
    },
}
