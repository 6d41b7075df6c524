use super::{pipeline::PipelineConfig, validation::ValidationConfig};
use alloc::sync::Arc;

/// Static mutex holding the global configuration, initialized as `None`.
static TILEPIPE_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// Represents the global configuration for tilepipe, combining pipeline and validation settings.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Configuration for pipe execution and its logs.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Configuration for the checks performed while kernels run.
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl GlobalConfig {
    /// Retrieves the current global configuration, loading it from the current directory if not set.
    ///
    /// If no configuration is set, it attempts to load one from `tilepipe.toml` or `TilePipe.toml`
    /// in the current directory or its parents, then applies the environment overrides. If no file
    /// is found, a default configuration is used.
    ///
    /// # Notes
    ///
    /// Calling this function takes a global lock. Devices read it once when they are created.
    pub fn get() -> Arc<Self> {
        let mut state = TILEPIPE_GLOBAL_CONFIG.lock();
        let config = state.get_or_insert_with(|| {
            cfg_if::cfg_if! {
                if #[cfg(std_io)]  {
                    let config = Self::from_current_dir();
                    let config = config.override_from_env();
                } else {
                    let config = Self::default();
                }
            }

            Arc::new(config)
        });

        config.clone()
    }

    #[cfg(std_io)]
    /// Save the current configuration to the provided file path.
    pub fn save_default<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<()> {
        let config = Self::get();
        let content = toml::to_string_pretty(config.as_ref())
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        std::fs::write(path, content)
    }

    /// Sets the global configuration to the provided value.
    ///
    /// # Panics
    /// Panics if the configuration has already been set or read, as it cannot be overridden.
    ///
    /// # Warning
    /// This method must be called at the start of the program, before any calls to `get`.
    pub fn set(config: Self) {
        let mut state = TILEPIPE_GLOBAL_CONFIG.lock();
        if state.is_some() {
            panic!("Cannot set the global configuration multiple times.");
        }
        *state = Some(Arc::new(config));
    }

    #[cfg(std_io)]
    /// Overrides configuration fields based on environment variables.
    ///
    /// - `TILEPIPE_DEBUG_LOG`: `stdout`, `stderr`, `1`/`true` (log to `/tmp/tilepipe.log`),
    ///   `0`/`false` (disable) or a file path.
    /// - `TILEPIPE_VALIDATION`: `disabled`, `fences` or `full`.
    /// - `TILEPIPE_SCHEDULE_SEED`: shuffle the pipe interleaving with the given seed.
    pub fn override_from_env(mut self) -> Self {
        use super::{logger::BinaryLogLevel, pipeline::PipelineLogLevel};
        use crate::config::{pipeline::SchedulePolicy, validation::ValidationLevel};

        if let Ok(val) = std::env::var("TILEPIPE_DEBUG_LOG") {
            self.pipeline.logger.level = PipelineLogLevel::Full;
            self.validation.logger.level = BinaryLogLevel::Full;

            match val.as_str() {
                "stdout" => {
                    self.pipeline.logger.stdout = true;
                    self.validation.logger.stdout = true;
                }
                "stderr" => {
                    self.pipeline.logger.stderr = true;
                    self.validation.logger.stderr = true;
                }
                "1" | "true" => {
                    let file_path = "/tmp/tilepipe.log";
                    self.pipeline.logger.file = Some(file_path.into());
                    self.validation.logger.file = Some(file_path.into());
                }
                "0" | "false" => {
                    self.pipeline.logger.level = PipelineLogLevel::Disabled;
                    self.validation.logger.level = BinaryLogLevel::Disabled;
                }
                file_path => {
                    self.pipeline.logger.file = Some(file_path.into());
                    self.validation.logger.file = Some(file_path.into());
                }
            }
        };

        if let Ok(val) = std::env::var("TILEPIPE_VALIDATION") {
            match val.as_str() {
                "disabled" | "0" => self.validation.level = ValidationLevel::Disabled,
                "fences" | "1" => self.validation.level = ValidationLevel::Fences,
                "full" | "2" => self.validation.level = ValidationLevel::Full,
                _ => {}
            }
        }

        if let Ok(val) = std::env::var("TILEPIPE_SCHEDULE_SEED")
            && let Ok(seed) = val.parse::<u64>()
        {
            self.pipeline.schedule = SchedulePolicy::Shuffled { seed };
        }

        self
    }

    // Loads configuration from `tilepipe.toml` or `TilePipe.toml` in the current directory or its parents.
    //
    // Traverses up the directory tree until a valid configuration file is found or the root is reached.
    // Returns a default configuration if no file is found.
    #[cfg(std_io)]
    fn from_current_dir() -> Self {
        let Ok(mut dir) = std::env::current_dir() else {
            return Self::default();
        };

        loop {
            for name in ["tilepipe.toml", "TilePipe.toml"] {
                match Self::from_file_path(dir.join(name)) {
                    Ok(config) => return config,
                    Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                        log::warn!("Ignoring {name} in {}: {err}", dir.display());
                    }
                    Err(_) => {}
                }
            }

            if !dir.pop() {
                break;
            }
        }

        Self::default()
    }

    // Loads configuration from a specified file path.
    #[cfg(std_io)]
    fn from_file_path<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }
}

#[cfg(all(test, std_io))]
mod tests {
    use super::*;
    use crate::config::{
        pipeline::{PipelineLogLevel, SchedulePolicy},
        validation::ValidationLevel,
    };

    #[test]
    fn defaults_enable_full_validation() {
        let config = GlobalConfig::default();

        assert_eq!(config.validation.level, ValidationLevel::Full);
        assert_eq!(config.pipeline.schedule, SchedulePolicy::RoundRobin);
        assert_eq!(config.pipeline.logger.level, PipelineLogLevel::Disabled);
    }

    #[test]
    fn parse_partial_file() {
        let content = r#"
            [pipeline]
            schedule = { shuffled = { seed = 7 } }

            [pipeline.logger]
            level = "basic"
            stdout = true

            [validation]
            level = "fences"
        "#;
        let config: GlobalConfig = toml::from_str(content).unwrap();

        assert_eq!(config.pipeline.schedule, SchedulePolicy::Shuffled { seed: 7 });
        assert_eq!(config.pipeline.logger.level, PipelineLogLevel::Basic);
        assert!(config.pipeline.logger.stdout);
        assert_eq!(config.validation.level, ValidationLevel::Fences);
    }
}
