//! Session configuration.

use std::time::Duration;

use crate::traits::{ExchangeError, FourCC, Format, Result};

/// Environment variable selecting the capture device index.
pub const ENV_DEVICE: &str = "PI_CAM_DEVICE";
/// Environment variable selecting the number of capture buffers.
pub const ENV_BUFFERS: &str = "PI_CAM_BUFFERS";
/// Environment variable limiting the number of frames captured.
pub const ENV_FRAMES: &str = "PI_CAM_FRAMES";

/// Settings for one capture-to-display session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Capture device index (e.g., 0 for /dev/video0).
    pub device_index: u32,
    /// Requested capture format.
    pub format: Format,
    /// Buffers shared between capture and display.
    pub buffer_count: u32,
    /// Vblank period of the headless display.
    pub refresh_interval: Duration,
    /// Stop after this many frames; run until the device fails otherwise.
    pub max_frames: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            format: Format::new(1280, 720, FourCC::YUYV),
            buffer_count: 4,
            refresh_interval: Duration::from_micros(16_667),
            max_frames: None,
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `PI_CAM_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `PI_CAM_*`
    /// keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_DEVICE) {
            config.device_index = parse_var(ENV_DEVICE, &value)?;
        }
        if let Some(value) = lookup(ENV_BUFFERS) {
            config.buffer_count = parse_var(ENV_BUFFERS, &value)?;
        }
        if let Some(value) = lookup(ENV_FRAMES) {
            config.max_frames = Some(parse_var(ENV_FRAMES, &value)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the capture device index.
    #[must_use]
    pub const fn with_device_index(mut self, device_index: u32) -> Self {
        self.device_index = device_index;
        self
    }

    /// Set the requested capture format.
    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Set the number of shared buffers.
    #[must_use]
    pub const fn with_buffer_count(mut self, buffer_count: u32) -> Self {
        self.buffer_count = buffer_count;
        self
    }

    /// Set the headless display refresh period.
    #[must_use]
    pub const fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    /// Limit the session to `max_frames` frames.
    #[must_use]
    pub const fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Reject settings no session can run with.
    ///
    /// A flip needs one buffer on screen and one armed, so fewer than two
    /// buffers would starve the producer.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_count < 2 {
            return Err(ExchangeError::InvalidConfig(format!(
                "buffer_count must be at least 2, got {}",
                self.buffer_count
            )));
        }
        if self.format.width == 0 || self.format.height == 0 {
            return Err(ExchangeError::InvalidConfig(format!(
                "format must not be empty, got {}x{}",
                self.format.width, self.format.height
            )));
        }
        if self.refresh_interval.is_zero() {
            return Err(ExchangeError::InvalidConfig(
                "refresh_interval must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ExchangeError::InvalidConfig(format!("{key}={value:?} is not a number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_count, 4);
        assert_eq!(config.format.width, 1280);
        assert_eq!(config.max_frames, None);
    }

    #[test]
    fn test_env_overrides() {
        let config = SessionConfig::from_lookup(lookup(&[
            (ENV_DEVICE, "2"),
            (ENV_BUFFERS, " 6 "),
            (ENV_FRAMES, "300"),
        ]))
        .expect("values are valid");

        assert_eq!(config.device_index, 2);
        assert_eq!(config.buffer_count, 6);
        assert_eq!(config.max_frames, Some(300));
    }

    #[test]
    fn test_env_missing_keeps_defaults() {
        let config = SessionConfig::from_lookup(lookup(&[])).expect("defaults are valid");
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_env_malformed_rejected() {
        let result = SessionConfig::from_lookup(lookup(&[(ENV_BUFFERS, "many")]));
        assert!(matches!(result, Err(ExchangeError::InvalidConfig(_))));
    }

    #[test]
    fn test_single_buffer_rejected() {
        let result = SessionConfig::from_lookup(lookup(&[(ENV_BUFFERS, "1")]));
        assert!(matches!(result, Err(ExchangeError::InvalidConfig(_))));
    }

    #[test]
    fn test_builders() {
        let config = SessionConfig::default()
            .with_device_index(1)
            .with_format(Format::new(640, 480, FourCC::YUYV))
            .with_buffer_count(3)
            .with_refresh_interval(Duration::from_millis(20))
            .with_max_frames(Some(10));

        assert!(config.validate().is_ok());
        assert_eq!(config.format.height, 480);
        assert_eq!(config.refresh_interval, Duration::from_millis(20));
    }

    #[test]
    fn test_empty_format_rejected() {
        let config = SessionConfig::default().with_format(Format::new(0, 480, FourCC::YUYV));
        assert!(config.validate().is_err());
    }
}
