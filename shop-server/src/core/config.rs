use std::path::PathBuf;
use std::time::Duration;

use shared::models::GatewayKind;

use super::error::{Result, ServerError};
use crate::gateway::{flutterwave, paystack};

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Notes |
/// |----------|---------|-------|
/// | ENVIRONMENT | development | development / staging / production |
/// | HTTP_PORT | 8080 | |
/// | DATA_DIR | ./data | holds `shop.redb` |
/// | RESERVATION_TTL_SECS | 900 | hold time for reserved stock |
/// | REAPER_INTERVAL_SECS | 120 | expiry sweep period |
/// | GATEWAY_TIMEOUT_SECS | 15 | per gateway HTTP call |
/// | DEFAULT_GATEWAY | paystack | when checkout names none |
/// | CURRENCY | NGN | |
/// | PUBLIC_BASE_URL | http://localhost:3000 | storefront origin for redirects |
/// | PAYSTACK_SECRET_KEY | - | secret outside development |
/// | PAYSTACK_BASE_URL | https://api.paystack.co | |
/// | FLUTTERWAVE_SECRET_KEY | - | secret outside development |
/// | FLUTTERWAVE_SECRET_HASH | - | secret outside development |
/// | FLUTTERWAVE_BASE_URL | https://api.flutterwave.com | |
/// | FLUTTERWAVE_LOGO_URL | - | |
/// | STORE_TITLE | Online Store | shown on hosted payment pages |
/// | OPERATOR_TOKEN | - | bearer token for operator endpoints |
/// | CATALOG_SEED_PATH | - | JSON array of products |
/// | VERIFY_SETTLES_SUCCESS | true | verify path settles success |
/// | LOG_LEVEL | info | |
/// | LOG_JSON | false | |
/// | LOG_DIR | - | daily rolling files |
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub http_port: u16,
    pub data_dir: PathBuf,
    pub reservation_ttl: Duration,
    pub reaper_interval: Duration,
    pub gateway_timeout: Duration,
    pub default_gateway: GatewayKind,
    pub currency: String,
    pub public_base_url: String,

    pub paystack_secret_key: String,
    pub paystack_base_url: String,
    pub flutterwave_secret_key: String,
    pub flutterwave_secret_hash: String,
    pub flutterwave_base_url: String,
    pub flutterwave_logo_url: Option<String>,
    pub store_title: String,

    pub operator_token: String,
    pub catalog_seed_path: Option<PathBuf>,
    pub verify_settles_success: bool,

    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    /// Development defaults, no environment lookups
    fn default() -> Self {
        Self {
            environment: "development".into(),
            http_port: 8080,
            data_dir: PathBuf::from("./data"),
            reservation_ttl: Duration::from_secs(15 * 60),
            reaper_interval: Duration::from_secs(120),
            gateway_timeout: Duration::from_secs(15),
            default_gateway: GatewayKind::Paystack,
            currency: "NGN".into(),
            public_base_url: "http://localhost:3000".into(),
            paystack_secret_key: String::new(),
            paystack_base_url: paystack::DEFAULT_BASE_URL.into(),
            flutterwave_secret_key: String::new(),
            flutterwave_secret_hash: String::new(),
            flutterwave_base_url: flutterwave::DEFAULT_BASE_URL.into(),
            flutterwave_logo_url: None,
            store_title: "Online Store".into(),
            operator_token: String::new(),
            catalog_seed_path: None,
            verify_settles_success: true,
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
        }
    }
}

impl Config {
    /// Require a secret env var: must be set and non-empty outside development.
    fn require_secret(name: &str, environment: &str) -> Result<String> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(ServerError::Config(format!(
                        "{name} must be set in {environment} environment"
                    )));
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(ServerError::Config(format!(
                "{name} must not be empty in {environment} environment"
            )));
        }
        Ok(val)
    }

    fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn env_opt(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|s| !s.trim().is_empty())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let environment = std::env::var("ENVIRONMENT").unwrap_or(defaults.environment);

        let default_gateway = match Self::env_opt("DEFAULT_GATEWAY") {
            Some(v) => v
                .parse()
                .map_err(|_| ServerError::Config(format!("DEFAULT_GATEWAY: unknown gateway {v}")))?,
            None => defaults.default_gateway,
        };

        let reservation_ttl_secs: u64 = Self::env_or("RESERVATION_TTL_SECS", 900);
        if reservation_ttl_secs == 0 {
            return Err(ServerError::Config("RESERVATION_TTL_SECS must be positive".into()));
        }

        Ok(Self {
            http_port: Self::env_or("HTTP_PORT", defaults.http_port),
            data_dir: Self::env_opt("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            reservation_ttl: Duration::from_secs(reservation_ttl_secs),
            reaper_interval: Duration::from_secs(Self::env_or("REAPER_INTERVAL_SECS", 120).max(1)),
            gateway_timeout: Duration::from_secs(Self::env_or("GATEWAY_TIMEOUT_SECS", 15).max(1)),
            default_gateway,
            currency: Self::env_opt("CURRENCY").unwrap_or(defaults.currency),
            public_base_url: Self::env_opt("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),

            paystack_secret_key: Self::require_secret("PAYSTACK_SECRET_KEY", &environment)?,
            paystack_base_url: Self::env_opt("PAYSTACK_BASE_URL")
                .unwrap_or(defaults.paystack_base_url),
            flutterwave_secret_key: Self::require_secret("FLUTTERWAVE_SECRET_KEY", &environment)?,
            flutterwave_secret_hash: Self::require_secret("FLUTTERWAVE_SECRET_HASH", &environment)?,
            flutterwave_base_url: Self::env_opt("FLUTTERWAVE_BASE_URL")
                .unwrap_or(defaults.flutterwave_base_url),
            flutterwave_logo_url: Self::env_opt("FLUTTERWAVE_LOGO_URL"),
            store_title: Self::env_opt("STORE_TITLE").unwrap_or(defaults.store_title),

            operator_token: Self::require_secret("OPERATOR_TOKEN", &environment)?,
            catalog_seed_path: Self::env_opt("CATALOG_SEED_PATH").map(PathBuf::from),
            verify_settles_success: Self::env_or("VERIFY_SETTLES_SUCCESS", true),

            log_level: Self::env_opt("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json: Self::env_or("LOG_JSON", false),
            log_dir: Self::env_opt("LOG_DIR").map(PathBuf::from),
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("shop.redb")
    }

    pub fn reservation_ttl_ms(&self) -> i64 {
        i64::try_from(self.reservation_ttl.as_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.is_development());
        assert_eq!(config.reservation_ttl_ms(), 900_000);
        assert_eq!(config.database_path(), PathBuf::from("./data/shop.redb"));
        assert_eq!(config.default_gateway, GatewayKind::Paystack);
        assert!(config.verify_settles_success);
    }

    #[test]
    fn test_require_secret_in_development() {
        let secret = Config::require_secret("SHOP_TEST_UNSET_SECRET", "development").unwrap();
        assert_eq!(secret, "dev-SHOP_TEST_UNSET_SECRET-not-for-production");
    }

    #[test]
    fn test_require_secret_in_production() {
        let err = Config::require_secret("SHOP_TEST_UNSET_SECRET", "production").unwrap_err();
        assert!(err.to_string().contains("must be set in production"));
    }

    #[test]
    fn test_env_or_falls_back() {
        assert_eq!(Config::env_or("SHOP_TEST_UNSET_PORT", 8080u16), 8080);
    }
}
