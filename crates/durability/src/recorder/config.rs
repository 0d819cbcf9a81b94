//! Recorder configuration.

use std::time::Duration;

/// What the recorder does after a sink write fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteFailurePolicy {
    /// Report the failure and keep recording (default)
    #[default]
    Report,
    /// Report the failure and stop recording for good
    Disable,
}

/// Recorder configuration parameters.
#[derive(Debug, Clone, Default)]
pub struct RecorderConfig {
    /// Period of the background size report (default: off).
    ///
    /// `None` or a zero duration disables the size reporter entirely.
    pub size_report_interval: Option<Duration>,

    /// Handling of sink write failures (default: report and continue).
    pub write_failure: WriteFailurePolicy,
}

impl RecorderConfig {
    /// Create a new recorder configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size report interval (builder pattern).
    ///
    /// A zero interval turns reporting off.
    pub fn with_size_report_interval(mut self, interval: Duration) -> Self {
        self.size_report_interval = Some(interval).filter(|i| !i.is_zero());
        self
    }

    /// Set the write failure policy (builder pattern).
    pub fn with_write_failure(mut self, policy: WriteFailurePolicy) -> Self {
        self.write_failure = policy;
        self
    }

    /// Effective report interval, if reporting is on.
    pub fn report_interval(&self) -> Option<Duration> {
        self.size_report_interval.filter(|i| !i.is_zero())
    }
}

/// Chunk rotation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum bytes per dump chunk.
    ///
    /// A frame that would push the current chunk past this size goes to a
    /// fresh chunk instead. A single frame larger than the threshold gets a
    /// chunk of its own.
    pub threshold_bytes: u64,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        ChunkConfig {
            threshold_bytes: 64 * 1024 * 1024, // 64MB
        }
    }
}

impl ChunkConfig {
    /// Rotate once a chunk would exceed `threshold_bytes`.
    pub fn new(threshold_bytes: u64) -> Self {
        ChunkConfig { threshold_bytes }
    }

    /// Threshold expressed in KiB.
    pub fn from_kb(unit_kb: u32) -> Self {
        ChunkConfig {
            threshold_bytes: u64::from(unit_kb) * 1024,
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), RecorderConfigError> {
        if self.threshold_bytes == 0 {
            return Err(RecorderConfigError::ZeroThreshold);
        }
        Ok(())
    }

    /// Create a configuration optimized for testing (small chunks).
    pub fn for_testing() -> Self {
        ChunkConfig {
            threshold_bytes: 4 * 1024, // 4KB for frequent rotation in tests
        }
    }
}

/// Recorder configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecorderConfigError {
    /// Chunk threshold is zero.
    #[error("Chunk threshold must be greater than zero")]
    ZeroThreshold,
}
