//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use checkout::CheckoutConfig;
use payment::GatewayConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset keeps state in memory
/// - `CATALOG_SEED_FILE`: JSON file of vendors and products to load at startup
/// - `PAYMENT_GATEWAY_URL`, `PAYMENT_GATEWAY_TOKEN`, `PAYMENT_CURRENCY`,
///   `PAYMENT_CALLBACK_URL`, `PAYMENT_ERROR_URL`: payment gateway settings
/// - `GATEWAY_TIMEOUT_MS`, `STORE_TIMEOUT_MS`, `NOTIFICATION_TIMEOUT_MS`:
///   per-call limits
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub catalog_seed: Option<PathBuf>,
    pub gateway: GatewayConfig,
    pub checkout: CheckoutConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        let gateway_timeout = millis("GATEWAY_TIMEOUT_MS", defaults.gateway.timeout);
        let gateway = GatewayConfig {
            base_url: lookup("PAYMENT_GATEWAY_URL").unwrap_or(defaults.gateway.base_url),
            api_token: lookup("PAYMENT_GATEWAY_TOKEN").unwrap_or(defaults.gateway.api_token),
            currency: lookup("PAYMENT_CURRENCY").unwrap_or(defaults.gateway.currency),
            callback_url: lookup("PAYMENT_CALLBACK_URL").unwrap_or(defaults.gateway.callback_url),
            error_url: lookup("PAYMENT_ERROR_URL").unwrap_or(defaults.gateway.error_url),
            timeout: gateway_timeout,
        };
        let checkout = CheckoutConfig {
            store_timeout: millis("STORE_TIMEOUT_MS", defaults.checkout.store_timeout),
            gateway_timeout,
            notification_timeout: millis(
                "NOTIFICATION_TIMEOUT_MS",
                defaults.checkout.notification_timeout,
            ),
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            catalog_seed: lookup("CATALOG_SEED_FILE").map(PathBuf::from),
            gateway,
            checkout,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            catalog_seed: None,
            gateway: GatewayConfig::default(),
            checkout: CheckoutConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.is_none());
        assert_eq!(config.gateway.base_url, "https://apitest.myfatoorah.com");
        assert_eq!(config.gateway.currency, "KWD");
        assert_eq!(config.checkout.store_timeout, Duration::from_secs(5));
        assert_eq!(config.checkout.gateway_timeout, Duration::from_secs(15));
        assert_eq!(config.checkout.notification_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("PAYMENT_GATEWAY_TOKEN", "secret"),
            ("PAYMENT_CURRENCY", "SAR"),
            ("GATEWAY_TIMEOUT_MS", "2500"),
            ("STORE_TIMEOUT_MS", "750"),
        ]));

        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/shop"));
        assert_eq!(config.gateway.api_token, "secret");
        assert_eq!(config.gateway.currency, "SAR");
        assert_eq!(config.gateway.timeout, Duration::from_millis(2500));
        assert_eq!(config.checkout.gateway_timeout, Duration::from_millis(2500));
        assert_eq!(config.checkout.store_timeout, Duration::from_millis(750));
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "not-a-port"),
            ("STORE_TIMEOUT_MS", "soon"),
            ("DATABASE_URL", ""),
        ]));
        assert_eq!(config.port, 3000);
        assert_eq!(config.checkout.store_timeout, Duration::from_secs(5));
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
