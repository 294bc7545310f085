use secrecy::SecretString;
use std::path::PathBuf;

/// Process-wide service configuration, loaded by the CLI layer and passed
/// by reference into provider and store operations. The core never
/// mutates it; a freshly accepted API key is persisted by the caller
/// through its own configuration path.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Account-level key for the remote verification service.
    pub api_key: SecretString,
    /// Selects the sandbox endpoint instead of production.
    pub test_mode: bool,
    /// Credential store path; `None` disables the store.
    pub credential_file: Option<PathBuf>,
}

impl ServiceConfig {
    #[must_use]
    pub fn new(api_key: SecretString, test_mode: bool, credential_file: Option<PathBuf>) -> Self {
        Self {
            api_key,
            test_mode,
            credential_file,
        }
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("api_key", &"***")
            .field("test_mode", &self.test_mode)
            .field("credential_file", &self.credential_file)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_service_config() {
        let config = ServiceConfig::new(
            SecretString::from("key".to_string()),
            true,
            Some(PathBuf::from("/var/lib/twofactor/users.db")),
        );
        assert_eq!(config.api_key.expose_secret(), "key");
        assert!(config.test_mode);
        assert_eq!(
            config.credential_file.as_deref(),
            Some(std::path::Path::new("/var/lib/twofactor/users.db"))
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ServiceConfig::new(SecretString::from("hunter2".to_string()), false, None);
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***"));
    }
}
