//! Application configuration management.
//!
//! Sources, later ones winning:
//! 1. `config/default.toml`
//! 2. `config/{RUN_MODE}.toml`
//! 3. Environment variables prefixed with `BOOKWELL__`, e.g.
//!    `BOOKWELL__DATABASE__URL` or `BOOKWELL__LEDGER__NUMBERING__INVOICE_PREFIX`.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Bookkeeping core configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait for a new connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout_secs() -> u64 {
    5
}

/// Settings for numbering, locking and retries.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Document and payment number formats.
    #[serde(default)]
    pub numbering: NumberingConfig,
    /// Upper bound, in milliseconds, on waiting for a counter or document lock.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// How many times a contended sequence increment is retried.
    #[serde(default = "default_sequence_retries")]
    pub sequence_retries: u32,
}

fn default_lock_timeout_ms() -> u64 {
    2_000
}

fn default_sequence_retries() -> u32 {
    3
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            numbering: NumberingConfig::default(),
            lock_timeout_ms: default_lock_timeout_ms(),
            sequence_retries: default_sequence_retries(),
        }
    }
}

/// Prefixes and suffix width for issued numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct NumberingConfig {
    /// Width of the zero-padded numeric suffix.
    #[serde(default = "default_width")]
    pub width: usize,
    /// Prefix for sales invoices.
    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,
    /// Prefix for purchase invoices.
    #[serde(default = "default_purchase_invoice_prefix")]
    pub purchase_invoice_prefix: String,
    /// Prefix for credit notes.
    #[serde(default = "default_credit_note_prefix")]
    pub credit_note_prefix: String,
    /// Prefix for delivery orders.
    #[serde(default = "default_delivery_order_prefix")]
    pub delivery_order_prefix: String,
    /// Prefix for customer receipts.
    #[serde(default = "default_receipt_prefix")]
    pub receipt_prefix: String,
    /// Prefix for supplier payments.
    #[serde(default = "default_payment_prefix")]
    pub payment_prefix: String,
}

fn default_width() -> usize {
    6
}

fn default_invoice_prefix() -> String {
    "INV".to_string()
}

fn default_purchase_invoice_prefix() -> String {
    "PINV".to_string()
}

fn default_credit_note_prefix() -> String {
    "CN".to_string()
}

fn default_delivery_order_prefix() -> String {
    "DO".to_string()
}

fn default_receipt_prefix() -> String {
    "RCT".to_string()
}

fn default_payment_prefix() -> String {
    "PAY".to_string()
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            invoice_prefix: default_invoice_prefix(),
            purchase_invoice_prefix: default_purchase_invoice_prefix(),
            credit_note_prefix: default_credit_note_prefix(),
            delivery_order_prefix: default_delivery_order_prefix(),
            receipt_prefix: default_receipt_prefix(),
            payment_prefix: default_payment_prefix(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("BOOKWELL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("BOOKWELL__DATABASE__URL", Some("postgres://localhost/books")),
                ("BOOKWELL__LEDGER__LOCK_TIMEOUT_MS", Some("500")),
                ("BOOKWELL__LEDGER__NUMBERING__INVOICE_PREFIX", Some("SI")),
                ("RUN_MODE", Some("test-no-such-file")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/books");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.ledger.lock_timeout_ms, 500);
                assert_eq!(config.ledger.sequence_retries, 3);
                assert_eq!(config.ledger.numbering.invoice_prefix, "SI");
                assert_eq!(config.ledger.numbering.receipt_prefix, "RCT");
                assert_eq!(config.ledger.numbering.width, 6);
            },
        );
    }

    #[test]
    fn test_missing_database_url_fails() {
        temp_env::with_vars(
            [
                ("BOOKWELL__DATABASE__URL", None::<&str>),
                ("RUN_MODE", Some("test-no-such-file")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }

    #[test]
    fn test_ledger_defaults() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.lock_timeout_ms, 2_000);
        assert_eq!(ledger.numbering.invoice_prefix, "INV");
        assert_eq!(ledger.numbering.purchase_invoice_prefix, "PINV");
        assert_eq!(ledger.numbering.credit_note_prefix, "CN");
        assert_eq!(ledger.numbering.delivery_order_prefix, "DO");
        assert_eq!(ledger.numbering.payment_prefix, "PAY");
    }
}
