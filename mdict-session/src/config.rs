/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Response encoding configuration.
//!
//! Controls the grow-and-retry strategy used when a session re-encodes a
//! cached payload into its own response message.

/// BeginString of response frames.
pub const DEFAULT_BEGIN_STRING: &str = "MDICT.1.0";

/// Default extra bytes reserved on top of the payload length.
pub const DEFAULT_HEADROOM: usize = 256;

/// Default growth per retry, in percent of the current capacity.
pub const DEFAULT_GROWTH_PERCENT: usize = 10;

/// Default number of encoding attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default upper bound on the encoding buffer.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Configuration for response encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingConfig {
    /// BeginString written into every response frame.
    pub begin_string: String,
    /// Bytes added to the payload length for the first attempt.
    pub headroom: usize,
    /// Capacity growth per retry, in percent.
    pub growth_percent: usize,
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    /// Capacity never exceeds this many bytes.
    pub max_buffer_size: usize,
}

impl EncodingConfig {
    /// Creates a configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            begin_string: DEFAULT_BEGIN_STRING.to_string(),
            headroom: DEFAULT_HEADROOM,
            growth_percent: DEFAULT_GROWTH_PERCENT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }

    /// Returns a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> EncodingConfigBuilder {
        EncodingConfigBuilder::default()
    }

    /// Sets the BeginString.
    #[must_use]
    pub fn with_begin_string(mut self, begin_string: impl Into<String>) -> Self {
        self.begin_string = begin_string.into();
        self
    }

    /// Sets the headroom.
    #[must_use]
    pub const fn with_headroom(mut self, headroom: usize) -> Self {
        self.headroom = headroom;
        self
    }

    /// Sets the growth percent.
    #[must_use]
    pub const fn with_growth_percent(mut self, percent: usize) -> Self {
        self.growth_percent = percent;
        self
    }

    /// Sets the maximum number of attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the maximum buffer size.
    #[must_use]
    pub const fn with_max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size;
        self
    }

    /// Returns the capacity of the first attempt for a payload of `payload_len` bytes.
    #[must_use]
    pub fn initial_capacity(&self, payload_len: usize) -> usize {
        payload_len
            .saturating_add(self.headroom)
            .min(self.max_buffer_size)
    }

    /// Returns the capacity of the attempt after one using `capacity`.
    ///
    /// Always grows by at least one byte and never past `max_buffer_size`.
    #[must_use]
    pub fn grow(&self, capacity: usize) -> usize {
        let step = (capacity.saturating_mul(self.growth_percent) / 100).max(1);
        capacity.saturating_add(step).min(self.max_buffer_size)
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`EncodingConfig`].
#[derive(Debug, Clone, Default)]
pub struct EncodingConfigBuilder {
    config: EncodingConfig,
}

impl EncodingConfigBuilder {
    /// Sets the BeginString.
    #[must_use]
    pub fn begin_string(mut self, begin_string: impl Into<String>) -> Self {
        self.config.begin_string = begin_string.into();
        self
    }

    /// Sets the headroom.
    #[must_use]
    pub const fn headroom(mut self, headroom: usize) -> Self {
        self.config.headroom = headroom;
        self
    }

    /// Sets the growth percent.
    #[must_use]
    pub const fn growth_percent(mut self, percent: usize) -> Self {
        self.config.growth_percent = percent;
        self
    }

    /// Sets the maximum number of attempts. Zero is treated as one.
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts.max(1);
        self
    }

    /// Sets the maximum buffer size.
    #[must_use]
    pub const fn max_buffer_size(mut self, size: usize) -> Self {
        self.config.max_buffer_size = size;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> EncodingConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EncodingConfig::default();
        assert_eq!(config.begin_string, "MDICT.1.0");
        assert_eq!(config.growth_percent, 10);
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.max_buffer_size, 16 * 1024 * 1024);
    }

    #[test]
    fn test_builder() {
        let config = EncodingConfig::builder()
            .headroom(8)
            .growth_percent(50)
            .max_attempts(0)
            .max_buffer_size(4096)
            .begin_string("TEST.1")
            .build();

        assert_eq!(config.headroom, 8);
        assert_eq!(config.growth_percent, 50);
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.max_buffer_size, 4096);
        assert_eq!(config.begin_string, "TEST.1");
    }

    #[test]
    fn test_initial_capacity_is_capped() {
        let config = EncodingConfig::new().with_headroom(100).with_max_buffer_size(1000);
        assert_eq!(config.initial_capacity(500), 600);
        assert_eq!(config.initial_capacity(5000), 1000);
    }

    #[test]
    fn test_grow() {
        let config = EncodingConfig::new();
        assert_eq!(config.grow(1000), 1100);
        assert_eq!(config.grow(5), 6);

        let capped = config.with_max_buffer_size(1050);
        assert_eq!(capped.grow(1000), 1050);
        assert_eq!(capped.grow(1050), 1050);
    }
}
