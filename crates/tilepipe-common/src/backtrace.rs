use alloc::string::{String, ToString};

/// Call stack recorded where an execution error was raised.
///
/// The stack is captured whatever `RUST_BACKTRACE` says. Without `std` only a placeholder is
/// kept.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackTrace {
    frames: String,
}

impl BackTrace {
    /// Record the stack of the current thread.
    pub fn capture() -> Self {
        Self {
            #[cfg(feature = "std")]
            frames: std::backtrace::Backtrace::force_capture().to_string(),
            #[cfg(not(feature = "std"))]
            frames: "No backtrace available".to_string(),
        }
    }
}

impl core::fmt::Debug for BackTrace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.frames)
    }
}

impl core::fmt::Display for BackTrace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.frames)
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn capture_ignores_the_environment() {
        let backtrace = BackTrace::capture();

        assert!(!backtrace.to_string().is_empty());
        assert_ne!(backtrace.to_string(), "disabled backtrace");
    }
}
