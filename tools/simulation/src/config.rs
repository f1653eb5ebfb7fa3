//! Harness configuration
//!
//! Supports loading from TOML file with CLI argument overrides.

use crate::catalog::{CatalogEntry, SymbolCatalog};
use crate::generator::GeneratorConfig;
use crate::session::{SessionConfig, SessionTimeouts};
use crate::transport::Endpoint;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use types::ids::{Symbol, TraderId};
use types::numeric::Price;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub endpoint: Endpoint,
    pub traders: usize,
    pub trader_prefix: String,
    pub duration: Duration,
    pub interval: Duration,
    pub max_concurrency: usize,
    pub seed: Option<u64>,
    pub log_level: String,
    pub timeouts: SessionTimeouts,
    pub generator: GeneratorConfig,
    pub catalog: SymbolCatalog,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::new("127.0.0.1", 8888),
            traders: 100,
            trader_prefix: "trader".to_string(),
            duration: Duration::from_secs(60),
            interval: Duration::from_secs(2),
            max_concurrency: 20,
            seed: None,
            log_level: "info".to_string(),
            timeouts: SessionTimeouts::default(),
            generator: GeneratorConfig::default(),
            catalog: SymbolCatalog::default(),
        }
    }
}

/// CLI values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub traders: Option<usize>,
    pub duration: Option<Duration>,
    pub interval: Option<Duration>,
    pub max_concurrency: Option<usize>,
    pub seed: Option<u64>,
    pub log_level: Option<String>,
}

impl HarnessConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: TomlConfig = toml::from_str(content)?;
        Self::try_from(file)
    }

    /// Apply CLI overrides to the configuration.
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.endpoint.host = host;
        }
        if let Some(port) = overrides.port {
            self.endpoint.port = port;
        }
        if let Some(traders) = overrides.traders {
            self.traders = traders;
        }
        if let Some(duration) = overrides.duration {
            self.duration = duration;
        }
        if let Some(interval) = overrides.interval {
            self.interval = interval;
        }
        if let Some(max_concurrency) = overrides.max_concurrency {
            self.max_concurrency = max_concurrency;
        }
        if overrides.seed.is_some() {
            self.seed = overrides.seed;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
    }

    /// Reject settings a run cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.host.is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.interval.is_zero() {
            return Err(ConfigError::Invalid("order interval must be positive".into()));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid("max concurrency must be at least 1".into()));
        }
        if self.catalog.is_empty() {
            return Err(ConfigError::Invalid("symbol catalog is empty".into()));
        }
        if self.generator.min_quantity == 0 || self.generator.min_quantity > self.generator.max_quantity {
            return Err(ConfigError::Invalid(format!(
                "quantity range {}..={} is invalid",
                self.generator.min_quantity, self.generator.max_quantity
            )));
        }
        if !(0..10_000).contains(&self.generator.max_jitter_bps) {
            return Err(ConfigError::Invalid("price jitter must be in 0..10000 bps".into()));
        }
        if self.traders > 0 && TraderId::try_new(format!("{}1", self.trader_prefix)).is_none() {
            return Err(ConfigError::Invalid(format!(
                "trader prefix {:?} produces invalid identities",
                self.trader_prefix
            )));
        }
        Ok(())
    }

    /// One session config per trader: `<prefix>1` .. `<prefix>N`.
    ///
    /// With a run seed, trader `i` gets seed `seed + i` so runs are reproducible
    /// while sessions stay independent.
    pub fn session_configs(&self) -> Result<Vec<SessionConfig>, ConfigError> {
        self.validate()?;
        let catalog = Arc::new(self.catalog.clone());
        (1..=self.traders)
            .map(|i| {
                let trader_id = TraderId::try_new(format!("{}{}", self.trader_prefix, i))
                    .ok_or_else(|| ConfigError::Invalid(format!("invalid trader id for index {i}")))?;
                let mut config = SessionConfig::new(trader_id, self.endpoint.clone(), Arc::clone(&catalog))
                    .with_duration(self.duration)
                    .with_interval(self.interval)
                    .with_timeouts(self.timeouts)
                    .with_seed(self.seed.map(|s| s.wrapping_add(i as u64)));
                config.generator = self.generator.clone();
                Ok(config)
            })
            .collect()
    }
}

/// TOML file structure for deserialization.
#[derive(Debug, Deserialize)]
struct TomlConfig {
    #[serde(default)]
    general: GeneralToml,
    #[serde(default)]
    session: SessionToml,
    #[serde(default)]
    timeouts: TimeoutsToml,
    #[serde(default)]
    symbols: Vec<SymbolToml>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GeneralToml {
    host: String,
    port: u16,
    traders: usize,
    trader_prefix: String,
    max_concurrency: usize,
    seed: Option<u64>,
    log_level: String,
}

impl Default for GeneralToml {
    fn default() -> Self {
        let defaults = HarnessConfig::default();
        Self {
            host: defaults.endpoint.host,
            port: defaults.endpoint.port,
            traders: defaults.traders,
            trader_prefix: defaults.trader_prefix,
            max_concurrency: defaults.max_concurrency,
            seed: None,
            log_level: defaults.log_level,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SessionToml {
    duration_secs: f64,
    interval_secs: f64,
    max_jitter_bps: i64,
    min_quantity: u32,
    max_quantity: u32,
}

impl Default for SessionToml {
    fn default() -> Self {
        let generator = GeneratorConfig::default();
        Self {
            duration_secs: 60.0,
            interval_secs: 2.0,
            max_jitter_bps: generator.max_jitter_bps,
            min_quantity: generator.min_quantity,
            max_quantity: generator.max_quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TimeoutsToml {
    connect_ms: u64,
    register_ack_ms: u64,
    send_ms: u64,
    drain_ms: u64,
}

impl Default for TimeoutsToml {
    fn default() -> Self {
        let t = SessionTimeouts::default();
        Self {
            connect_ms: t.connect.as_millis() as u64,
            register_ack_ms: t.register_ack.as_millis() as u64,
            send_ms: t.send.as_millis() as u64,
            drain_ms: t.drain.as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SymbolToml {
    symbol: String,
    base_price: Decimal,
}

/// Parse a non-negative number of seconds.
pub fn parse_seconds(secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| ConfigError::Invalid(format!("{secs} is not a valid number of seconds")))
}

impl TryFrom<TomlConfig> for HarnessConfig {
    type Error = ConfigError;

    fn try_from(file: TomlConfig) -> Result<Self, ConfigError> {
        let catalog = if file.symbols.is_empty() {
            SymbolCatalog::default()
        } else {
            let mut entries = Vec::with_capacity(file.symbols.len());
            for s in file.symbols {
                let symbol = Symbol::try_new(s.symbol.clone())
                    .ok_or_else(|| ConfigError::Invalid(format!("invalid symbol {:?}", s.symbol)))?;
                let base_price = Price::new(s.base_price);
                if !base_price.is_positive() {
                    return Err(ConfigError::Invalid(format!("base price for {symbol} must be positive")));
                }
                entries.push(CatalogEntry { symbol, base_price });
            }
            SymbolCatalog::new(entries)
        };

        Ok(Self {
            endpoint: Endpoint::new(file.general.host, file.general.port),
            traders: file.general.traders,
            trader_prefix: file.general.trader_prefix,
            duration: parse_seconds(file.session.duration_secs)?,
            interval: parse_seconds(file.session.interval_secs)?,
            max_concurrency: file.general.max_concurrency,
            seed: file.general.seed,
            log_level: file.general.log_level,
            timeouts: SessionTimeouts {
                connect: Duration::from_millis(file.timeouts.connect_ms),
                register_ack: Duration::from_millis(file.timeouts.register_ack_ms),
                send: Duration::from_millis(file.timeouts.send_ms),
                drain: Duration::from_millis(file.timeouts.drain_ms),
            },
            generator: GeneratorConfig {
                max_jitter_bps: file.session.max_jitter_bps,
                min_quantity: file.session.min_quantity,
                max_quantity: file.session.max_quantity,
            },
            catalog,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HarnessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint.port, 8888);
        assert_eq!(config.traders, 100);
        assert_eq!(config.max_concurrency, 20);
    }

    #[test]
    fn test_from_toml_str() {
        let toml = r#"
            [general]
            host = "10.0.0.5"
            port = 9999
            traders = 5
            max_concurrency = 2
            seed = 11

            [session]
            duration_secs = 4
            interval_secs = 0.5

            [timeouts]
            drain_ms = 50

            [[symbols]]
            symbol = "AAPL"
            base_price = "150.00"

            [[symbols]]
            symbol = "MSFT"
            base_price = "400"
        "#;
        let config = HarnessConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.endpoint, Endpoint::new("10.0.0.5", 9999));
        assert_eq!(config.traders, 5);
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.duration, Duration::from_secs(4));
        assert_eq!(config.interval, Duration::from_millis(500));
        assert_eq!(config.timeouts.drain, Duration::from_millis(50));
        assert_eq!(config.timeouts.connect, Duration::from_secs(5));
        assert_eq!(config.catalog.len(), 2);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = HarnessConfig::from_toml_str("").unwrap();
        assert_eq!(config.traders, 100);
        assert_eq!(config.catalog.len(), 8);
        assert_eq!(config.interval, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_symbol_rejected() {
        let toml = r#"
            [[symbols]]
            symbol = "BAD:SYM"
            base_price = "1"
        "#;
        assert!(matches!(HarnessConfig::from_toml_str(toml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_negative_duration_rejected() {
        let toml = "[session]\nduration_secs = -1\n";
        assert!(matches!(HarnessConfig::from_toml_str(toml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = HarnessConfig::default();
        config.apply_overrides(Overrides {
            host: Some("example.org".into()),
            traders: Some(3),
            interval: Some(Duration::from_millis(250)),
            seed: Some(5),
            ..Default::default()
        });
        assert_eq!(config.endpoint.host, "example.org");
        assert_eq!(config.endpoint.port, 8888);
        assert_eq!(config.traders, 3);
        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.seed, Some(5));
    }

    #[test]
    fn test_validate_rejects_zero_interval_and_concurrency() {
        let mut config = HarnessConfig::default();
        config.interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.max_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.catalog = SymbolCatalog::new(Vec::new());
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.trader_prefix = "bad:".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_configs() {
        let mut config = HarnessConfig::default();
        config.traders = 3;
        config.seed = Some(100);
        let sessions = config.session_configs().unwrap();

        let ids: Vec<_> = sessions.iter().map(|s| s.trader_id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["trader1", "trader2", "trader3"]);
        assert_eq!(sessions[0].seed, Some(101));
        assert_eq!(sessions[2].seed, Some(103));
        assert!(Arc::ptr_eq(&sessions[0].catalog, &sessions[1].catalog));
    }

    #[test]
    fn test_zero_traders() {
        let mut config = HarnessConfig::default();
        config.traders = 0;
        assert!(config.session_configs().unwrap().is_empty());
    }
}
