//! Configuration types and environment helpers.

use std::time::Duration;

use crate::error::ConfigError;

/// Read a required environment variable.
pub fn required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Read an optional port variable, defaulting when unset.
pub fn env_port(key: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?} is not a port number"),
        }),
        Err(_) => Ok(default),
    }
}

/// Timing configuration for the conversation flow.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Minimum time the question-loading screen is shown, even when the
    /// question source responds faster.
    pub question_loading_min: Duration,
    /// Minimum time the summary-loading screen is shown.
    pub summary_loading_min: Duration,
    /// Upper bound on the background auth check during resume. Past this,
    /// the flow proceeds as unauthenticated.
    pub auth_check_timeout: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            question_loading_min: Duration::from_secs(3),
            summary_loading_min: Duration::from_secs(2),
            auth_check_timeout: Duration::from_secs(2),
        }
    }
}

impl FlowConfig {
    /// Config with zeroed timers, so tests don't wait on loading screens.
    pub fn instant() -> Self {
        Self {
            question_loading_min: Duration::ZERO,
            summary_loading_min: Duration::ZERO,
            auth_check_timeout: Duration::from_millis(50),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_env_reports_the_missing_key() {
        let err = required_env("INTAKE_FLOW_TEST_UNSET_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key)
            if key == "INTAKE_FLOW_TEST_UNSET_VAR"));
    }

    #[test]
    fn env_port_defaults_and_rejects_garbage() {
        assert_eq!(env_port("INTAKE_FLOW_TEST_UNSET_PORT", 8080).unwrap(), 8080);

        unsafe { std::env::set_var("INTAKE_FLOW_TEST_BAD_PORT", "eighty") };
        let err = env_port("INTAKE_FLOW_TEST_BAD_PORT", 8080).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. }
            if key == "INTAKE_FLOW_TEST_BAD_PORT"));
        unsafe { std::env::remove_var("INTAKE_FLOW_TEST_BAD_PORT") };
    }
}
