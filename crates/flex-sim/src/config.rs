//! Simulator configuration.
//!
//! Read from `flex-sim.toml` in the working directory, or from the path in
//! `FLEX_SIM_CONFIG`. Missing file means defaults.

use std::path::{Path, PathBuf};

use flex_payout::PayoutKind;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the config file path.
pub const CONFIG_ENV: &str = "FLEX_SIM_CONFIG";

/// Default config file name.
const DEFAULT_CONFIG_FILE: &str = "flex-sim.toml";

/// Largest accepted `payout.start_offset`, about 158 years of 5 s blocks.
pub const MAX_START_OFFSET: u64 = 1_000_000_000;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`SimConfig`].
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value is present but unusable.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Complete simulator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub payout: PayoutConfig,
    #[serde(default)]
    pub distributor: DistributorConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Genesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Label of the deployer/admin account.
    #[serde(default = "default_admin")]
    pub admin: String,
    /// Whole FLEX minted to the admin at genesis.
    #[serde(default = "default_supply")]
    pub supply_flex: u64,
}

/// Payout engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutConfig {
    /// `"daily"`, `"quarterly"` or `{ custom = <blocks> }`.
    #[serde(default = "default_kind")]
    pub kind: PayoutKind,
    /// Initial epoch length. Defaults to the kind's preset.
    #[serde(default)]
    pub init_epoch_length: Option<u64>,
    /// Blocks between genesis and epoch 0.
    #[serde(default)]
    pub start_offset: u64,
}

/// Distributor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributorConfig {
    #[serde(default = "default_distributor_name")]
    pub name: String,
    /// Labels allowed to trigger the distributor besides the admin.
    #[serde(default)]
    pub delegatees: Vec<String>,
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Account labels to break rewards down for.
    #[serde(default = "default_accounts")]
    pub accounts: Vec<String>,
    /// Pretty-print the JSON output.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

// Default value functions

fn default_admin() -> String {
    "admin".to_string()
}

fn default_supply() -> u64 {
    500_000_000
}

fn default_kind() -> PayoutKind {
    PayoutKind::Daily
}

fn default_distributor_name() -> String {
    "mini daily".to_string()
}

fn default_accounts() -> Vec<String> {
    vec!["alice".to_string(), "bob".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            admin: default_admin(),
            supply_flex: default_supply(),
        }
    }
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            init_epoch_length: None,
            start_offset: 0,
        }
    }
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            name: default_distributor_name(),
            delegatees: Vec::new(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            accounts: default_accounts(),
            pretty: true,
        }
    }
}

impl SimConfig {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// Falls back to defaults if the default file does not exist; an
    /// explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::config_path() {
                Some(p) => (p, true),
                None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
            },
        };

        if !explicit && !path.exists() {
            tracing::debug!("no config file found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.clone(),
                source,
            },
            other => other,
        })?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Path from the environment override, if set.
    fn config_path() -> Option<PathBuf> {
        std::env::var(CONFIG_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    /// Initial epoch length after applying the kind's preset.
    pub fn init_epoch_length(&self) -> u64 {
        self.payout
            .init_epoch_length
            .unwrap_or_else(|| self.payout.kind.epoch_blocks())
    }

    /// Reject values that would make the simulation meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.admin.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "chain.admin",
                reason: "must not be empty".to_string(),
            });
        }
        if self.chain.supply_flex == 0 {
            return Err(ConfigError::Invalid {
                field: "chain.supply_flex",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.init_epoch_length() == 0 {
            return Err(ConfigError::Invalid {
                field: "payout.init_epoch_length",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.payout.start_offset > MAX_START_OFFSET {
            return Err(ConfigError::Invalid {
                field: "payout.start_offset",
                reason: format!("must be at most {MAX_START_OFFSET}"),
            });
        }
        if self.distributor.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "distributor.name",
                reason: "must not be empty".to_string(),
            });
        }
        if let Some(label) = self
            .distributor
            .delegatees
            .iter()
            .chain(self.report.accounts.iter())
            .find(|l| l.trim().is_empty())
        {
            return Err(ConfigError::Invalid {
                field: "account label",
                reason: format!("{label:?} is empty"),
            });
        }
        Ok(())
    }
}
