// ABOUTME: AgentConfig - iteration, retry, and context limits for the ReAct
// ABOUTME: controller. Assembled once and passed into the Controller.

use crate::error::ConfigError;

/// Default bound on think-act cycles per run.
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Default number of re-prompts after unparseable model output.
pub const DEFAULT_PARSE_RETRIES: usize = 1;

/// Runtime limits for one controller.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Maximum number of think-act cycles before the run fails.
    pub max_iterations: usize,

    /// How many times the model is re-prompted after output that does not
    /// follow the action protocol, per iteration.
    pub parse_retries: usize,

    /// Observations longer than this are truncated before they enter the
    /// model context. Traces always keep the full text.
    pub max_observation_chars: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            parse_retries: DEFAULT_PARSE_RETRIES,
            max_observation_chars: None,
        }
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum iterations.
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the parse retry budget.
    pub fn parse_retries(mut self, retries: usize) -> Self {
        self.parse_retries = retries;
        self
    }

    /// Truncate long observations in the model context.
    pub fn max_observation_chars(mut self, max: usize) -> Self {
        self.max_observation_chars = Some(max);
        self
    }

    /// Reject limits that would make every run fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.max_observation_chars == Some(0) {
            return Err(ConfigError::Invalid(
                "max_observation_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = AgentConfig::new()
            .max_iterations(5)
            .parse_retries(2)
            .max_observation_chars(4000);

        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.parse_retries, 2);
        assert_eq!(config.max_observation_chars, Some(4000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.parse_retries, DEFAULT_PARSE_RETRIES);
        assert!(config.max_observation_chars.is_none());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        assert!(AgentConfig::new().max_iterations(0).validate().is_err());
    }
}
