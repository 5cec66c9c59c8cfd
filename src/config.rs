//! Capture configuration
//!
//! All fields have defaults matching the amplifier this crate was built for,
//! so an empty YAML document is a valid configuration:
//!
//! ```rust
//! use eeg_monitor::MonitorConfig;
//!
//! let config = MonitorConfig::from_yaml_str("read_timeout_ms: 50\nserial:\n  port: /dev/ttyACM0\n")?;
//! assert_eq!(config.read_timeout_ms, 50);
//! assert_eq!(config.serial.baud_rate, 57600);
//! assert_eq!(config.packet.size, 17);
//! # Ok::<(), eeg_monitor::MonitorError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::PacketFormat;
use crate::{MonitorError, Result};

/// Settings for the capture path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Wire layout of one packet
    pub packet: PacketFormat,

    /// Maximum bytes held while waiting for a complete packet (default: 1024)
    pub accumulator_capacity: usize,

    /// Maximum bytes requested per transport read (default: 64)
    pub read_size: usize,

    /// Upper bound on one blocking transport read (default: 100)
    pub read_timeout_ms: u64,

    /// Device sample rate, packets per second (default: 256)
    pub sample_rate_hz: f64,

    /// Serial link settings
    pub serial: SerialConfig,

    /// CSV log destination used when recording is switched on
    pub recording_path: Option<PathBuf>,

    /// Records buffered for the recording writer before recording is
    /// abandoned as too slow (default: 1024)
    pub recording_queue: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            packet: PacketFormat::default(),
            accumulator_capacity: 1024,
            read_size: 64,
            read_timeout_ms: 100,
            sample_rate_hz: 256.0,
            serial: SerialConfig::default(),
            recording_path: None,
            recording_queue: 1024,
        }
    }
}

impl MonitorConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Raw byte rate of the device stream
    pub fn bytes_per_second(&self) -> f64 {
        self.sample_rate_hz * self.packet.size as f64
    }

    /// Check the settings against each other.
    pub fn validate(&self) -> Result<()> {
        self.packet.validate()?;

        if self.accumulator_capacity <= self.packet.size {
            return Err(MonitorError::config_invalid(format!(
                "accumulator capacity {} must exceed packet size {}",
                self.accumulator_capacity, self.packet.size
            )));
        }

        if self.read_size == 0 || self.read_size > self.accumulator_capacity {
            return Err(MonitorError::config_invalid(format!(
                "read size {} must be within 1..={}",
                self.read_size, self.accumulator_capacity
            )));
        }

        if self.read_timeout_ms == 0 {
            return Err(MonitorError::config_invalid("read timeout must be non-zero"));
        }

        if self.recording_queue == 0 {
            return Err(MonitorError::config_invalid("recording queue must hold at least one record"));
        }

        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(MonitorError::config_invalid(format!(
                "sample rate {} must be positive",
                self.sample_rate_hz
            )));
        }

        Ok(())
    }
}

/// Serial port settings (8N1 framing is fixed)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: String,

    /// Line speed (default: 57600)
    pub baud_rate: u32,

    /// Port-level read timeout (default: 100)
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self { port: "/dev/ttyUSB0".to_string(), baud_rate: 57600, timeout_ms: 100 }
    }
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.read_timeout(), Duration::from_millis(100));
        assert_eq!(config.bytes_per_second(), 256.0 * 17.0);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = MonitorConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn legacy_packet_layout_from_yaml() {
        let yaml = "packet:\n  sequence_offset: 3\n  channel_offset: 4\n";
        let config = MonitorConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.packet, PacketFormat::modular_eeg_p2());
    }

    #[test]
    fn rejects_capacity_not_larger_than_packet() {
        let err = MonitorConfig::from_yaml_str("accumulator_capacity: 17\n").unwrap_err();
        assert!(matches!(err, MonitorError::Config { .. }));
    }

    #[test]
    fn rejects_zero_read_size_and_timeout() {
        assert!(MonitorConfig::from_yaml_str("read_size: 0\n").is_err());
        assert!(MonitorConfig::from_yaml_str("read_timeout_ms: 0\n").is_err());
        assert!(MonitorConfig::from_yaml_str("sample_rate_hz: -1.0\n").is_err());
        assert!(MonitorConfig::from_yaml_str("recording_queue: 0\n").is_err());
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = MonitorConfig::from_yaml_str("read_size: [1, 2").unwrap_err();
        assert!(matches!(err, MonitorError::Config { .. }));
    }

    #[test]
    fn from_file_reports_missing_path() {
        let err = MonitorConfig::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, MonitorError::File { .. }));
    }
}
