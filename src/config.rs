//! Session-level configuration.
//!
//! Everything environment-sensitive is decided once, up front, and passed
//! down as plain values: the hosting environment, the correlation budget,
//! the quiescence windows and the liveness sampling strategy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::correlator::DEFAULT_CORRELATION_TIMEOUT;
use crate::liveness::LivenessStrategy;
use crate::quiescence::QuiescenceConfig;

/// Where the client under test is hosted.
///
/// Cloud-hosted targets sit behind more transport buffering and need longer
/// drain windows before silence can be asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Local,
    Cloud,
}

impl Environment {
    pub fn is_cloud(self) -> bool {
        matches!(self, Environment::Cloud)
    }
}

/// Per-session settings for the verification engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub environment: Environment,
    /// Budget for each correlation wait.
    pub correlation_timeout: Duration,
    pub quiescence: QuiescenceConfig,
    /// Sampling strategy, chosen once per session from environment
    /// capability (e.g. whether the runtime can decode the stream codec).
    pub strategy: LivenessStrategy,
}

impl SessionConfig {
    /// Defaults for the given environment and strategy.
    pub fn new(environment: Environment, strategy: LivenessStrategy) -> Self {
        Self {
            environment,
            correlation_timeout: DEFAULT_CORRELATION_TIMEOUT,
            quiescence: QuiescenceConfig::for_environment(environment),
            strategy,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(Environment::Local, LivenessStrategy::TimerText)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_environment_widens_the_settle_window() {
        let local = SessionConfig::new(Environment::Local, LivenessStrategy::TimerText);
        let cloud = SessionConfig::new(Environment::Cloud, LivenessStrategy::TimerText);
        assert!(cloud.quiescence.settle > local.quiescence.settle);
        assert_eq!(local.quiescence.window, cloud.quiescence.window);
    }

    #[test]
    fn defaults_target_local_timer_sampling() {
        let config = SessionConfig::default();
        assert_eq!(config.environment, Environment::Local);
        assert_eq!(config.strategy, LivenessStrategy::TimerText);
        assert_eq!(config.correlation_timeout, DEFAULT_CORRELATION_TIMEOUT);
    }
}
