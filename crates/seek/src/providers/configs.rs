use std::time::Duration;

/// Ten minutes, long enough for large local models on slow hardware
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Plain settings a provider is built from; validation happens in `LlmProvider`
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub provider_name: String,
    pub model: String,
    pub server_address: Option<String>,
    pub is_local: bool,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new<N: Into<String>, M: Into<String>>(provider_name: N, model: M) -> Self {
        Self {
            provider_name: provider_name.into(),
            model: model.into(),
            server_address: None,
            is_local: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_server_address<S: Into<String>>(mut self, address: S) -> Self {
        self.server_address = Some(address.into());
        self
    }

    pub fn local(mut self, is_local: bool) -> Self {
        self.is_local = is_local;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
