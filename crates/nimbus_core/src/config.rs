//! Configuration for the client runtime.

/// API version prefix used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2013-09-01";

/// Configuration for a [`crate::Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Whether `automatic_current_user` may create an anonymous user.
    pub automatic_user: bool,
    /// Path prefix of every request (e.g. `2013-09-01`).
    pub api_version: String,
}

impl ClientConfig {
    /// Creates a configuration with automatic users disabled.
    pub fn new() -> Self {
        Self {
            automatic_user: false,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Enables or disables anonymous bootstrap.
    pub fn with_automatic_user(mut self, enabled: bool) -> Self {
        self.automatic_user = enabled;
        self
    }

    /// Sets the API version prefix.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into().trim_matches('/').to_string();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert!(!config.automatic_user);
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
    }

    #[test]
    fn config_builder() {
        let config = ClientConfig::new()
            .with_automatic_user(true)
            .with_api_version("/2020-01-01/");

        assert!(config.automatic_user);
        assert_eq!(config.api_version, "2020-01-01");
    }
}
