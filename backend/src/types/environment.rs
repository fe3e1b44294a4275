//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};

use crate::quota::DEFAULT_QUOTA_LIMIT_BYTES;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Development environment (uses `LocalStack`)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Returns the S3 bucket name for the environment
    ///
    /// # Panics
    ///
    /// Panics in production if `S3_BUCKET_NAME` is not set
    #[must_use]
    pub fn s3_bucket(&self) -> String {
        match self {
            Self::Production => {
                env::var("S3_BUCKET_NAME").expect("S3_BUCKET_NAME environment variable is not set")
            }
            Self::Development => {
                env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "mosaic-media".to_string())
            }
        }
    }

    /// Path of the SQLite database file
    #[must_use]
    pub fn database_path(&self) -> String {
        env::var("DATABASE_PATH").unwrap_or_else(|_| "mosaic.db".to_string())
    }

    /// Aggregate storage ceiling in bytes
    ///
    /// Defaults to 10 GiB; overridable via `STORAGE_QUOTA_BYTES`.
    #[must_use]
    pub fn quota_limit_bytes(&self) -> u64 {
        env::var("STORAGE_QUOTA_BYTES")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_QUOTA_LIMIT_BYTES)
    }

    /// Bearer token guarding the admin routes, when configured
    #[must_use]
    pub fn admin_token(&self) -> Option<String> {
        env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty())
    }

    /// Port the HTTP server binds to
    #[must_use]
    pub fn port(&self) -> u16 {
        env::var("PORT")
            .ok()
            .and_then(|val| val.parse::<u16>().ok())
            .unwrap_or(8080)
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production
            Self::Production => None,
            // LocalStack endpoint for development
            Self::Development => Some("http://localhost:4566"),
        }
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// AWS S3 service configuration
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let aws_config = self.aws_config().await;
        let s3_config: aws_sdk_s3::Config = (&aws_config).into();
        let mut builder = s3_config.to_builder();

        // Override "force path style" to true for compatibility with LocalStack
        // https://github.com/awslabs/aws-sdk-rust/discussions/874
        if matches!(self, Self::Development) {
            builder.set_force_path_style(Some(true));
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn environment_from_env() {
        env::remove_var("APP_ENV");
        assert_eq!(Environment::from_env(), Environment::Development);

        env::set_var("APP_ENV", "development");
        assert_eq!(Environment::from_env(), Environment::Development);

        env::set_var("APP_ENV", "production");
        assert_eq!(Environment::from_env(), Environment::Production);

        env::remove_var("APP_ENV");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "Invalid environment: invalid")]
    fn invalid_environment() {
        env::set_var("APP_ENV", "invalid");
        let _ = Environment::from_env();
    }

    #[test]
    #[serial]
    fn quota_limit_override() {
        env::remove_var("STORAGE_QUOTA_BYTES");
        let environment = Environment::Development;
        assert_eq!(environment.quota_limit_bytes(), DEFAULT_QUOTA_LIMIT_BYTES);

        env::set_var("STORAGE_QUOTA_BYTES", "1048576");
        assert_eq!(environment.quota_limit_bytes(), 1_048_576);

        // Invalid values fall back to the default
        env::set_var("STORAGE_QUOTA_BYTES", "a lot");
        assert_eq!(environment.quota_limit_bytes(), DEFAULT_QUOTA_LIMIT_BYTES);

        env::remove_var("STORAGE_QUOTA_BYTES");
    }

    #[test]
    #[serial]
    fn admin_token_requires_non_empty_value() {
        env::remove_var("ADMIN_TOKEN");
        let environment = Environment::Development;
        assert_eq!(environment.admin_token(), None);

        env::set_var("ADMIN_TOKEN", "");
        assert_eq!(environment.admin_token(), None);

        env::set_var("ADMIN_TOKEN", "secret");
        assert_eq!(environment.admin_token(), Some("secret".to_string()));

        env::remove_var("ADMIN_TOKEN");
    }
}
