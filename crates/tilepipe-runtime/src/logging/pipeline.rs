use core::fmt::Display;

use crate::config::{BinaryLogLevel, GlobalConfig, Logger, pipeline::PipelineLogLevel};
use alloc::{format, sync::Arc};

/// Logger shared by the cores of a device.
#[derive(Debug)]
pub struct PipelineLogger {
    kind: PipelineLoggerKind,
}

#[derive(Debug)]
enum PipelineLoggerKind {
    /// Activated logger.
    Activated(spin::Mutex<Logger>, PipelineLoggerOptions),
    /// Don't log information.
    None,
}

#[derive(Debug, Clone, Copy)]
struct PipelineLoggerOptions {
    pipeline: PipelineLogLevel,
    violations: bool,
}

impl PipelineLogger {
    /// Create a logger from the provided configuration.
    pub fn new(config: Arc<GlobalConfig>) -> Self {
        let options = PipelineLoggerOptions {
            pipeline: config.pipeline.logger.level,
            violations: config.validation.logger.level == BinaryLogLevel::Full,
        };

        if options.pipeline == PipelineLogLevel::Disabled && !options.violations {
            return Self {
                kind: PipelineLoggerKind::None,
            };
        }

        Self {
            kind: PipelineLoggerKind::Activated(spin::Mutex::new(Logger::new(config)), options),
        }
    }

    /// Returns the pipeline log level, `Disabled` if the logger is deactivated.
    pub fn pipeline_level(&self) -> PipelineLogLevel {
        match &self.kind {
            PipelineLoggerKind::Activated(_, options) => options.pipeline,
            PipelineLoggerKind::None => PipelineLogLevel::Disabled,
        }
    }

    /// Log an instruction entering a pipe queue.
    pub fn log_issue<I: Display>(&self, core: usize, arg: I) {
        self.log_full(|logger| logger.log_pipeline(&format!("[core {core}] issue   {arg}")));
    }

    /// Log an instruction leaving a pipe queue.
    pub fn log_execute<I: Display>(&self, core: usize, arg: I) {
        self.log_full(|logger| logger.log_pipeline(&format!("[core {core}] execute {arg}")));
    }

    fn log_full<F: FnOnce(&mut Logger)>(&self, func: F) {
        if self.pipeline_level() == PipelineLogLevel::Full
            && let PipelineLoggerKind::Activated(logger, _) = &self.kind
        {
            func(&mut logger.lock());
        }
    }

    /// Log a kernel summary.
    pub fn log_summary<I: Display>(&self, arg: I) {
        if self.pipeline_level() != PipelineLogLevel::Disabled
            && let PipelineLoggerKind::Activated(logger, _) = &self.kind
        {
            logger.lock().log_pipeline(&arg);
        }
    }

    /// Log a violation found by the validator.
    pub fn log_violation<I: Display>(&self, arg: I) {
        if let PipelineLoggerKind::Activated(logger, options) = &self.kind
            && options.violations
        {
            logger.lock().log_validation(&arg);
        }
    }
}
