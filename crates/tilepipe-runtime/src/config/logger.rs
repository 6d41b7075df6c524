use super::{GlobalConfig, pipeline::PipelineLogLevel};
use alloc::{string::ToString, sync::Arc, vec::Vec};
use core::fmt::Display;
use hashbrown::HashMap;

#[cfg(std_io)]
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::PathBuf,
};

/// Configuration for logging in tilepipe, parameterized by a log level type.
///
/// Note that you can use multiple loggers at the same time.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct LoggerConfig<L: LogLevel> {
    /// Path to the log file, if file logging is enabled (requires `std` feature).
    #[serde(default)]
    #[cfg(std_io)]
    pub file: Option<PathBuf>,

    /// Whether to append to the log file (true) or overwrite it (false). Defaults to true.
    #[serde(default = "append_default")]
    pub append: bool,

    /// Whether to log to standard output.
    #[serde(default)]
    pub stdout: bool,

    /// Whether to log to standard error.
    #[serde(default)]
    pub stderr: bool,

    /// Optional crate-level logging configuration (e.g., info, debug, trace).
    #[serde(default)]
    pub log: Option<LogCrateLevel>,

    /// The log level for this logger, determining verbosity.
    #[serde(default)]
    pub level: L,
}

impl<L: LogLevel> Default for LoggerConfig<L> {
    fn default() -> Self {
        Self {
            #[cfg(std_io)]
            file: None,
            append: true,
            stdout: false,
            stderr: false,
            log: None,
            level: L::default(),
        }
    }
}

/// Log levels using the `log` crate.
#[derive(
    Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize, Hash, PartialEq, Eq,
)]
pub enum LogCrateLevel {
    /// Logs informational messages.
    #[default]
    #[serde(rename = "info")]
    Info,

    /// Logs debugging messages.
    #[serde(rename = "debug")]
    Debug,

    /// Logs trace-level messages.
    #[serde(rename = "trace")]
    Trace,
}

fn append_default() -> bool {
    true
}

/// Trait for types that can be used as log levels in `LoggerConfig`.
pub trait LogLevel:
    serde::de::DeserializeOwned + serde::Serialize + Clone + Copy + core::fmt::Debug + Default
{
}

/// Central logging utility for tilepipe, managing multiple log outputs.
#[derive(Debug)]
pub struct Logger {
    /// Collection of logger instances (file, stdout, stderr, or crate-level).
    loggers: Vec<LoggerKind>,

    /// Indices of loggers used for pipeline logging.
    pipeline_index: Vec<usize>,

    /// Indices of loggers used for validation logging.
    validation_index: Vec<usize>,

    /// Configuration the logger was built from.
    pub config: Arc<GlobalConfig>,
}

impl Logger {
    /// Creates a new `Logger` instance based on the provided configuration.
    ///
    /// Note that creating a logger is quite expensive, since log files are opened here.
    pub fn new(config: Arc<GlobalConfig>) -> Self {
        let mut loggers = Vec::new();
        let mut pipeline_index = Vec::new();
        let mut validation_index = Vec::new();

        #[derive(Hash, PartialEq, Eq)]
        enum LoggerId {
            #[cfg(std_io)]
            File(PathBuf),
            #[cfg(feature = "std")]
            Stdout,
            #[cfg(feature = "std")]
            Stderr,
            LogCrate(LogCrateLevel),
        }

        let mut logger2index = HashMap::<LoggerId, usize>::new();

        fn new_logger<S: Clone, ID: Fn(S) -> LoggerId, LG: Fn(S) -> Option<LoggerKind>>(
            setting_index: &mut Vec<usize>,
            loggers: &mut Vec<LoggerKind>,
            logger2index: &mut HashMap<LoggerId, usize>,
            state: S,
            func_id: ID,
            func_logger: LG,
        ) {
            let id = func_id(state.clone());

            if let Some(index) = logger2index.get(&id) {
                setting_index.push(*index);
            } else if let Some(logger) = func_logger(state) {
                let index = loggers.len();
                logger2index.insert(id, index);
                loggers.push(logger);
                setting_index.push(index);
            }
        }

        fn register_logger<L: LogLevel>(
            #[allow(unused_variables)] kind: &LoggerConfig<L>, // not used in no-std
            setting_index: &mut Vec<usize>,
            loggers: &mut Vec<LoggerKind>,
            logger2index: &mut HashMap<LoggerId, usize>,
        ) {
            #[cfg(std_io)]
            if let Some(file) = &kind.file {
                new_logger(
                    setting_index,
                    loggers,
                    logger2index,
                    (file, kind.append),
                    |(file, _append)| LoggerId::File(file.clone()),
                    |(file, append)| match FileLogger::new(file, append) {
                        Ok(logger) => Some(LoggerKind::File(logger)),
                        Err(err) => {
                            log::warn!("Can't open log file {}: {err}", file.display());
                            None
                        }
                    },
                );
            }

            #[cfg(feature = "std")]
            if kind.stdout {
                new_logger(
                    setting_index,
                    loggers,
                    logger2index,
                    (),
                    |_| LoggerId::Stdout,
                    |_| Some(LoggerKind::Stdout),
                );
            }

            #[cfg(feature = "std")]
            if kind.stderr {
                new_logger(
                    setting_index,
                    loggers,
                    logger2index,
                    (),
                    |_| LoggerId::Stderr,
                    |_| Some(LoggerKind::Stderr),
                );
            }

            if let Some(level) = kind.log {
                new_logger(
                    setting_index,
                    loggers,
                    logger2index,
                    level,
                    LoggerId::LogCrate,
                    |level| Some(LoggerKind::Log(level)),
                );
            }
        }

        if let PipelineLogLevel::Disabled = config.pipeline.logger.level {
        } else {
            register_logger(
                &config.pipeline.logger,
                &mut pipeline_index,
                &mut loggers,
                &mut logger2index,
            )
        }

        if let BinaryLogLevel::Disabled = config.validation.logger.level {
        } else {
            register_logger(
                &config.validation.logger,
                &mut validation_index,
                &mut loggers,
                &mut logger2index,
            )
        }

        Self {
            loggers,
            pipeline_index,
            validation_index,
            config,
        }
    }

    /// Logs a message for pipeline execution, directing it to all configured pipeline loggers.
    pub fn log_pipeline<S: Display>(&mut self, msg: &S) {
        let indices = core::mem::take(&mut self.pipeline_index);
        self.log_all(msg, &indices);
        self.pipeline_index = indices;
    }

    /// Logs a validation violation, directing it to all configured validation loggers.
    pub fn log_validation<S: Display>(&mut self, msg: &S) {
        let indices = core::mem::take(&mut self.validation_index);
        self.log_all(msg, &indices);
        self.validation_index = indices;
    }

    /// Returns the current pipeline log level.
    pub fn log_level_pipeline(&self) -> PipelineLogLevel {
        self.config.pipeline.logger.level
    }

    /// Whether violations are logged.
    pub fn log_level_validation(&self) -> BinaryLogLevel {
        self.config.validation.logger.level
    }

    fn log_all<S: Display>(&mut self, msg: &S, indices: &[usize]) {
        if indices.len() > 1 {
            let msg = msg.to_string();
            for index in indices {
                self.loggers[*index].log(&msg);
            }
        } else if let Some(index) = indices.first() {
            self.loggers[*index].log(msg);
        }
    }
}

/// Binary log level for enabling or disabling logging.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BinaryLogLevel {
    /// Logging is disabled.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,

    /// Logging is fully enabled.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for BinaryLogLevel {}

/// Represents different types of loggers.
#[derive(Debug)]
enum LoggerKind {
    /// Logs to a file.
    #[cfg(std_io)]
    File(FileLogger),

    /// Logs to standard output.
    #[cfg(feature = "std")]
    Stdout,

    /// Logs to standard error.
    #[cfg(feature = "std")]
    Stderr,

    /// Logs using the `log` crate with a specified level.
    Log(LogCrateLevel),
}

impl LoggerKind {
    fn log<S: Display>(&mut self, msg: &S) {
        match self {
            #[cfg(std_io)]
            LoggerKind::File(file_logger) => file_logger.log(msg),
            #[cfg(feature = "std")]
            LoggerKind::Stdout => println!("{msg}"),
            #[cfg(feature = "std")]
            LoggerKind::Stderr => eprintln!("{msg}"),
            LoggerKind::Log(level) => match level {
                LogCrateLevel::Info => log::info!("{msg}"),
                LogCrateLevel::Debug => log::debug!("{msg}"),
                LogCrateLevel::Trace => log::trace!("{msg}"),
            },
        }
    }
}

/// Logger that writes messages to a file.
#[derive(Debug)]
#[cfg(std_io)]
struct FileLogger {
    writer: BufWriter<File>,
}

#[cfg(std_io)]
impl FileLogger {
    fn new(path: &PathBuf, append: bool) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .append(append)
            .truncate(!append)
            .create(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    // A failed write only loses a log line.
    fn log<S: Display>(&mut self, msg: &S) {
        if writeln!(self.writer, "{msg}")
            .and_then(|_| self.writer.flush())
            .is_err()
        {
            log::warn!("Can't write to the log file");
        }
    }
}
