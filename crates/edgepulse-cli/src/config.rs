//! Configuration loading and validation

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use edgepulse_core::constants::{
    DEFAULT_ACTUATOR_PIN, DEFAULT_BAUD_RATE, DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_MAX_IN_FLIGHT,
    DEFAULT_PORTS, DEFAULT_PULSE_HIGH_MS, DEFAULT_PULSE_LOW_MS, DEFAULT_PULSES_PER_EVENT,
    MAX_PIN_NUMBER,
};
use edgepulse_core::Error;
use edgepulse_hardware::PulseTiming;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub actuator: ActuatorConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Candidate endpoints, separated by commas or whitespace
    #[serde(default = "default_ports")]
    pub ports: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// How long each candidate gets to answer the handshake
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            ports: default_ports(),
            baud_rate: default_baud_rate(),
            handshake_timeout_ms: default_handshake_timeout(),
        }
    }
}

impl SerialConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

fn default_ports() -> String {
    DEFAULT_PORTS.to_string()
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_handshake_timeout() -> u64 {
    DEFAULT_HANDSHAKE_TIMEOUT_MS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// Output pin driving the buzzer
    #[serde(default = "default_pin")]
    pub pin: u8,
    #[serde(default = "default_high_ms")]
    pub high_ms: u64,
    #[serde(default = "default_low_ms")]
    pub low_ms: u64,
    /// Pulses per worthy message
    #[serde(default = "default_pulses")]
    pub pulses_per_event: u32,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            pin: default_pin(),
            high_ms: default_high_ms(),
            low_ms: default_low_ms(),
            pulses_per_event: default_pulses(),
        }
    }
}

impl ActuatorConfig {
    pub fn timing(&self) -> PulseTiming {
        PulseTiming::from_millis(self.high_ms, self.low_ms)
    }
}

fn default_pin() -> u8 {
    DEFAULT_ACTUATOR_PIN
}

fn default_high_ms() -> u64 {
    DEFAULT_PULSE_HIGH_MS
}

fn default_low_ms() -> u64 {
    DEFAULT_PULSE_LOW_MS
}

fn default_pulses() -> u32 {
    DEFAULT_PULSES_PER_EVENT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Messages handled at once; further deliveries wait in the source
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
        }
    }
}

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

impl Config {
    /// Check values the type system cannot.
    pub fn validate(&self) -> edgepulse_core::Result<()> {
        if self.serial.baud_rate == 0 {
            return Err(Error::InvalidBaudRate(self.serial.baud_rate));
        }
        if self.serial.handshake_timeout_ms == 0 {
            return Err(Error::Config(
                "serial.handshake_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.actuator.pin > MAX_PIN_NUMBER {
            return Err(Error::Config(format!(
                "actuator.pin must be at most {MAX_PIN_NUMBER}, got {}",
                self.actuator.pin
            )));
        }
        if self.actuator.pulses_per_event == 0 {
            return Err(Error::Config(
                "actuator.pulses_per_event must be at least 1".to_string(),
            ));
        }
        if self.relay.max_in_flight == 0 {
            return Err(Error::Config(
                "relay.max_in_flight must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse configuration text
pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Load configuration from file, falling back to defaults when it is absent
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config = parse_config(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.serial.ports, "/dev/ttyS1,/dev/ttyS2,/dev/ttyS3,/dev/ttyS4");
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.serial.handshake_timeout(), Duration::from_secs(5));
        assert_eq!(config.actuator.pin, 6);
        assert_eq!(config.actuator.pulses_per_event, 1);
        assert_eq!(config.actuator.timing(), PulseTiming::from_millis(500, 500));
        assert_eq!(config.relay.max_in_flight, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            [serial]
            ports = "/dev/ttyACM0 /dev/ttyACM1"

            [actuator]
            pin = 13
            "#,
        )
        .unwrap();

        assert_eq!(config.serial.ports, "/dev/ttyACM0 /dev/ttyACM1");
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.actuator.pin, 13);
        assert_eq!(config.actuator.high_ms, 500);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse_config("").unwrap(), Config::default());
    }

    #[test]
    fn test_pin_out_of_byte_range_is_rejected() {
        assert!(parse_config("[actuator]\npin = 300\n").is_err());
    }

    #[rstest]
    #[case::zero_baud("[serial]\nbaud_rate = 0\n")]
    #[case::zero_timeout("[serial]\nhandshake_timeout_ms = 0\n")]
    #[case::pin_above_firmata_range("[actuator]\npin = 128\n")]
    #[case::zero_pulses("[actuator]\npulses_per_event = 0\n")]
    #[case::zero_in_flight("[relay]\nmax_in_flight = 0\n")]
    fn test_validation_failures(#[case] content: &str) {
        let config = parse_config(content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/edgepulse.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_serialized_defaults_parse_back() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert_eq!(parse_config(&text).unwrap(), Config::default());
    }
}
