use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of runs watched concurrently by [`crate::Engine::submit`].
    pub workers: usize,
    /// Poll interval for jobs that do not set one.
    pub default_poll_interval: Duration,
    /// RUNNING deadline for jobs that do not set one.
    pub default_start_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            default_poll_interval: Duration::from_secs(5),
            default_start_timeout: Duration::from_secs(120),
        }
    }
}
