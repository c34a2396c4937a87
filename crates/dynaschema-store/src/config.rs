//! Store client configuration.

use std::env;

use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;

/// Name recorded as the provider of credentials set through
/// [`StoreConfig::with_credentials`].
const STATIC_PROVIDER: &str = "dynaschema";

/// Connection settings for [`SdkStore`](crate::sdk::SdkStore).
///
/// Owned by the caller and passed in explicitly; nothing here is global.
/// Unset fields fall through to the AWS default provider chain when the
/// configuration is loaded.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Endpoint override, e.g. `http://localhost:8000`.
    pub endpoint_url: Option<String>,
    /// Signing region.
    pub region: Option<String>,
    /// Static credentials.
    pub credentials: Option<Credentials>,
}

impl StoreConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads `DYNAMODB_ENDPOINT_URL` and `AWS_REGION` (falling back to
    /// `DEFAULT_REGION`). Credentials are left to the provider chain.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            endpoint_url: env_opt("DYNAMODB_ENDPOINT_URL"),
            region: env_opt("AWS_REGION").or_else(|| env_opt("DEFAULT_REGION")),
            credentials: None,
        }
    }

    /// Point the client at a specific endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Set the signing region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set static credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            STATIC_PROVIDER,
        ));
        self
    }

    /// Resolve the shared SDK configuration.
    ///
    /// Retries are disabled: every store call is a single exchange.
    pub async fn load(&self) -> SdkConfig {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).retry_config(RetryConfig::disabled());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url.trim_end_matches('/'));
        }
        if let Some(credentials) = &self.credentials {
            loader = loader.credentials_provider(credentials.clone());
        }
        loader.load().await
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_should_load_explicit_region_and_endpoint() {
        let shared = StoreConfig::default()
            .with_region("eu-west-1")
            .with_endpoint("http://localhost:8000/")
            .with_credentials("test", "test")
            .load()
            .await;
        assert_eq!(shared.region(), Some(&Region::new("eu-west-1")));
        assert_eq!(shared.endpoint_url(), Some("http://localhost:8000"));
        assert!(shared.credentials_provider().is_some());
    }

    #[test]
    fn test_should_tag_static_credentials() {
        let config = StoreConfig::default().with_credentials("AKID", "very-secret");
        let credentials = config.credentials.as_ref().unwrap();
        assert_eq!(credentials.access_key_id(), "AKID");
        assert_eq!(credentials.secret_access_key(), "very-secret");
        assert!(credentials.session_token().is_none());
    }

    #[test]
    fn test_should_redact_secrets_in_debug_output() {
        let config = StoreConfig::default().with_credentials("AKID", "very-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("very-secret"));
    }
}
