//! Node configuration loading and management.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ael_channel::EngineConfig;
use ael_core::{ExchangeRatio, LedgerConfig, DEFAULT_CREDIT_RATIO, DEFAULT_MAX_PARTICIPANTS};
use ael_payment::{GateConfig, VerificationMode};
use serde::{Deserialize, Serialize};

/// Full configuration for the AEL node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AelConfig {
    /// API server settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Ledger storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Credit minting and operation limits.
    #[serde(default)]
    pub ledger: LedgerSection,

    /// Escrow and identity resolution.
    #[serde(default)]
    pub settlement: SettlementConfig,

    /// Payment verification.
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Rocksdb,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Rocksdb => "rocksdb",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Path to the data directory (rocksdb only).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSection {
    /// Credits minted per unit of deposited currency.
    #[serde(default = "default_credit_ratio")]
    pub credit_ratio: u64,
    #[serde(default = "default_max_participants")]
    pub default_max_participants: u32,
    /// Deadline applied to each API-driven engine operation.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Escrow service base URL. Unset means settlement runs degraded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escrow_url: Option<String>,
    /// Identity registry base URL. Unset means `addresses` is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver_url: Option<String>,
    /// Static agent id to chain address table.
    #[serde(default)]
    pub addresses: BTreeMap<String, String>,
    #[serde(default = "default_settlement_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
    /// Age after which an unfinished settlement attempt is retried.
    #[serde(default = "default_stale_claim_secs")]
    pub stale_claim_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    #[serde(default)]
    pub verification: VerificationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facilitator_url: Option<String>,
    /// Address that paid requests must pay to.
    #[serde(default)]
    pub recipient: String,
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default = "default_token")]
    pub token: String,
    #[serde(default = "default_payment_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    9001
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_credit_ratio() -> u64 {
    DEFAULT_CREDIT_RATIO
}
fn default_max_participants() -> u32 {
    DEFAULT_MAX_PARTICIPANTS
}
fn default_operation_timeout_ms() -> u64 {
    5_000
}
fn default_settlement_timeout_ms() -> u64 {
    15_000
}
fn default_retry_interval_secs() -> u64 {
    30
}
fn default_stale_claim_secs() -> u64 {
    300
}
fn default_network() -> String {
    "base-sepolia".into()
}
fn default_token() -> String {
    "USDC".into()
}
fn default_payment_timeout_ms() -> u64 {
    10_000
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            credit_ratio: default_credit_ratio(),
            default_max_participants: default_max_participants(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            escrow_url: None,
            resolver_url: None,
            addresses: BTreeMap::new(),
            timeout_ms: default_settlement_timeout_ms(),
            retry_interval_secs: default_retry_interval_secs(),
            stale_claim_secs: default_stale_claim_secs(),
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            verification: VerificationMode::default(),
            facilitator_url: None,
            recipient: String::new(),
            network: default_network(),
            token: default_token(),
            timeout_ms: default_payment_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl AelConfig {
    /// Read config from a TOML file, falling back to defaults for missing
    /// fields. Not validated, so CLI overrides can still be applied.
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// [`AelConfig::read`] followed by [`AelConfig::validate`].
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject settings the node cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Err(e) = ExchangeRatio::new(self.ledger.credit_ratio) {
            anyhow::bail!("ledger.credit_ratio: {e}");
        }
        if self.ledger.operation_timeout_ms == 0 {
            anyhow::bail!("ledger.operation_timeout_ms must be greater than zero");
        }
        if self.settlement.retry_interval_secs == 0 {
            anyhow::bail!("settlement.retry_interval_secs must be greater than zero");
        }
        if self.payment.verification == VerificationMode::Enforce {
            if is_blank(&self.payment.facilitator_url) {
                anyhow::bail!(
                    "payment.verification is \"enforce\" but payment.facilitator_url is not set \
                     (set it, or set verification = \"disabled\" for non-production use)"
                );
            }
            if self.payment.recipient.trim().is_empty() {
                anyhow::bail!("payment.verification is \"enforce\" but payment.recipient is not set");
            }
        }
        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("logging.format must be \"text\" or \"json\", got {other:?}"),
        }
        Ok(())
    }

    /// The socket address the HTTP API binds to.
    pub fn api_socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.api.listen_addr, self.api.port).parse()?)
    }

    pub fn ledger_config(&self) -> anyhow::Result<LedgerConfig> {
        Ok(LedgerConfig {
            credit_ratio: ExchangeRatio::new(self.ledger.credit_ratio)?,
            default_max_participants: self.ledger.default_max_participants,
        })
    }

    pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        Ok(EngineConfig {
            ledger: self.ledger_config()?,
            settlement_timeout: Duration::from_millis(self.settlement.timeout_ms),
            stale_claim_after: Duration::from_secs(self.settlement.stale_claim_secs),
        })
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            mode: self.payment.verification,
            recipient: self.payment.recipient.clone(),
            network: self.payment.network.clone(),
            token: self.payment.token.clone(),
        }
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.ledger.operation_timeout_ms)
    }
}
