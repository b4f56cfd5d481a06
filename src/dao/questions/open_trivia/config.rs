use std::time::Duration;

/// Runtime configuration describing how to reach the Open Trivia DB API.
#[derive(Debug, Clone)]
pub struct OpenTriviaConfig {
    pub base_url: String,
    /// Upper bound for a single HTTP request.
    pub request_timeout: Duration,
}

impl OpenTriviaConfig {
    /// Construct a configuration from an explicit base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Override the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
