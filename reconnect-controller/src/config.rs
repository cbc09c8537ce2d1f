//! Configuration for the reconnect controller
//!
//! Controls the retry ladder: how long to tolerate a signaling blip before
//! showing recovery UI, how attempts are paced, and when to give up and
//! reload.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ControllerError;

/// How an attempt re-establishes the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejoinStrategy {
    /// Ask the transport to reconnect the existing connection
    InPlace,
    /// Disconnect, wait for the settle delay, reconnect, then rejoin the room
    LeaveAndRejoin,
}

/// Configuration for the ReconnectController
///
/// Durations are (de)serialized as integer milliseconds so hosts can pass the
/// same JSON blob they use for the rest of their client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Wait after a signaling loss before the first attempt
    /// Default: 5 seconds
    #[serde(rename = "initial_wait_ms", with = "duration_ms")]
    pub initial_wait: Duration,

    /// Delay between failed attempts
    /// Default: 3 seconds
    #[serde(rename = "retry_delay_ms", with = "duration_ms")]
    pub retry_delay: Duration,

    /// Attempts before escalating to a reload
    /// Default: 3
    pub max_attempts: u32,

    /// Delay between showing "reloading" and reloading
    /// Default: 2 seconds
    #[serde(rename = "reload_delay_ms", with = "duration_ms")]
    pub reload_delay: Duration,

    /// An attempt not confirmed by signaling-established within this window fails
    /// Default: 15 seconds
    #[serde(rename = "attempt_timeout_ms", with = "duration_ms")]
    pub attempt_timeout: Duration,

    /// Reconnect in place or leave and rejoin
    /// Default: InPlace
    pub rejoin_strategy: RejoinStrategy,

    /// Pause between disconnect and reconnect for `LeaveAndRejoin`
    /// Default: 1 second
    #[serde(rename = "rejoin_settle_delay_ms", with = "duration_ms")]
    pub rejoin_settle_delay: Duration,

    /// Start immediately when the failure is a diagnosed credential expiry
    /// Default: true
    pub immediate_on_credential_expiry: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_secs(5),
            retry_delay: Duration::from_secs(3),
            max_attempts: 3,
            reload_delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(15),
            rejoin_strategy: RejoinStrategy::InPlace,
            rejoin_settle_delay: Duration::from_secs(1),
            immediate_on_credential_expiry: true,
        }
    }
}

impl ReconnectConfig {
    /// Create a new ReconnectConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Short waits and more attempts, for networks with frequent brief drops
    pub fn quick_recovery() -> Self {
        Self {
            initial_wait: Duration::from_secs(1),
            retry_delay: Duration::from_secs(1),
            max_attempts: 5,
            attempt_timeout: Duration::from_secs(10),
            ..Default::default()
        }
    }

    /// Long waits and a full leave-and-rejoin, for slow or overloaded servers
    pub fn patient() -> Self {
        Self {
            initial_wait: Duration::from_secs(10),
            retry_delay: Duration::from_secs(8),
            max_attempts: 4,
            attempt_timeout: Duration::from_secs(30),
            rejoin_strategy: RejoinStrategy::LeaveAndRejoin,
            ..Default::default()
        }
    }

    /// Parse a configuration blob; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ControllerError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.max_attempts == 0 {
            return Err(ControllerError::Configuration(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.attempt_timeout == Duration::ZERO {
            return Err(ControllerError::Configuration(
                "attempt_timeout must be greater than 0".to_string(),
            ));
        }

        if self.retry_delay == Duration::ZERO {
            return Err(ControllerError::Configuration(
                "retry_delay must be greater than 0".to_string(),
            ));
        }

        // The settle delay runs inside the attempt window
        if self.rejoin_strategy == RejoinStrategy::LeaveAndRejoin
            && self.rejoin_settle_delay >= self.attempt_timeout
        {
            return Err(ControllerError::Configuration(format!(
                "rejoin_settle_delay ({:?}) must be shorter than attempt_timeout ({:?})",
                self.rejoin_settle_delay, self.attempt_timeout
            )));
        }

        Ok(())
    }

    pub fn with_initial_wait(mut self, wait: Duration) -> Self {
        self.initial_wait = wait;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_reload_delay(mut self, delay: Duration) -> Self {
        self.reload_delay = delay;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_rejoin_strategy(mut self, strategy: RejoinStrategy) -> Self {
        self.rejoin_strategy = strategy;
        self
    }

    pub fn with_rejoin_settle_delay(mut self, delay: Duration) -> Self {
        self.rejoin_settle_delay = delay;
        self
    }

    pub fn with_immediate_credential_retry(mut self, enabled: bool) -> Self {
        self.immediate_on_credential_expiry = enabled;
        self
    }
}

/// Serde adapter for durations stored as integer milliseconds
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_wait, Duration::from_secs(5));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.rejoin_strategy, RejoinStrategy::InPlace);
        assert!(config.immediate_on_credential_expiry);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case(ReconnectConfig::default().with_max_attempts(0))]
    #[case(ReconnectConfig::default().with_attempt_timeout(Duration::ZERO))]
    #[case(ReconnectConfig::default().with_retry_delay(Duration::ZERO))]
    #[case(ReconnectConfig::default()
        .with_rejoin_strategy(RejoinStrategy::LeaveAndRejoin)
        .with_attempt_timeout(Duration::from_secs(2))
        .with_rejoin_settle_delay(Duration::from_secs(2)))]
    fn test_invalid_configs(#[case] config: ReconnectConfig) {
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case(ReconnectConfig::quick_recovery(), 5)]
    #[case(ReconnectConfig::patient(), 4)]
    fn test_config_presets(#[case] config: ReconnectConfig, #[case] attempts: u32) {
        assert_eq!(config.max_attempts, attempts);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_long_settle_delay_only_matters_for_rejoin() {
        let in_place = ReconnectConfig::default()
            .with_attempt_timeout(Duration::from_secs(1))
            .with_rejoin_settle_delay(Duration::from_secs(5));
        assert!(in_place.validate().is_ok());

        let rejoin = in_place.with_rejoin_strategy(RejoinStrategy::LeaveAndRejoin);
        match rejoin.validate() {
            Err(ControllerError::Configuration(message)) => {
                assert!(message.contains("rejoin_settle_delay"))
            }
            other => panic!("Expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_initial_wait_is_allowed() {
        let config = ReconnectConfig::new().with_initial_wait(Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = ReconnectConfig::from_json_str(
            r#"{ "initial_wait_ms": 2500, "max_attempts": 6, "rejoin_strategy": "leave_and_rejoin" }"#,
        )
        .unwrap();

        assert_eq!(config.initial_wait, Duration::from_millis(2500));
        assert_eq!(config.max_attempts, 6);
        assert_eq!(config.rejoin_strategy, RejoinStrategy::LeaveAndRejoin);
        // Untouched fields keep their defaults
        assert_eq!(config.retry_delay, Duration::from_secs(3));
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(matches!(
            ReconnectConfig::from_json_str(r#"{ "max_attempts": 0 }"#),
            Err(ControllerError::Configuration(_))
        ));
        assert!(matches!(
            ReconnectConfig::from_json_str("not json"),
            Err(ControllerError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_json_round_trip_uses_millis() {
        let json = serde_json::to_value(ReconnectConfig::quick_recovery()).unwrap();
        assert_eq!(json["retry_delay_ms"], 1000);
        assert_eq!(json["rejoin_strategy"], "in_place");
    }
}
