//! # Node Configuration
//!
//! Runtime parameters for the diamond node.
//!
//! ## Environment overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `HABER_OWNER` | `deployment.owner` |
//! | `HABER_DEPLOYER_NONCE` | `deployment.deployer_nonce` |
//! | `HABER_DIAMOND_ADDRESS` | `deployment.diamond_address` |
//! | `HABER_MAX_CUT_SELECTORS` | `diamond.max_cut_selectors` |
//! | `HABER_PERSIST` | `diamond.persist_on_commit` |
//! | `HABER_STATE_PATH` | `storage.state_path` |
//! | `HABER_LOG` | `logging.filter` |

use haber_diamond::domain::services::compute_contract_address;
use haber_diamond::domain::value_objects::Address;
use haber_diamond::service::DiamondConfig;
use std::path::PathBuf;
use thiserror::Error;

/// First account of the local development chain, used when no owner is set.
pub const DEV_OWNER: Address = Address::new([
    0xf3, 0x9f, 0xd6, 0xe5, 0x1a, 0xad, 0x88, 0xf6, 0xf4, 0xce, 0x6a, 0xb8, 0x82, 0x72, 0x79, 0xcf,
    0xff, 0xb9, 0x22, 0x66,
]);

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Who deploys the diamond and where it lands.
    pub deployment: DeploymentConfig,
    /// Diamond behaviour.
    pub diamond: DiamondSettings,
    /// Snapshot persistence.
    pub storage: StorageConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

impl NodeConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// - `NullOwner` if the owner is the null address.
    /// - `NullDiamond` if an explicit diamond address is null.
    /// - `ZeroCutLimit` if cuts could never touch a selector.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deployment.owner.is_zero() {
            return Err(ConfigError::NullOwner);
        }
        if self.deployment.diamond_address.is_some_and(|a| a.is_zero()) {
            return Err(ConfigError::NullDiamond);
        }
        if self.diamond.max_cut_selectors == 0 {
            return Err(ConfigError::ZeroCutLimit);
        }
        Ok(())
    }

    /// Address the diamond lives at.
    ///
    /// An explicit address wins; otherwise the address is derived from the
    /// owner and deployer nonce, the way a contract creation would place it.
    #[must_use]
    pub fn diamond_address(&self) -> Address {
        self.deployment.diamond_address.unwrap_or_else(|| {
            compute_contract_address(self.deployment.owner, self.deployment.deployer_nonce)
        })
    }

    /// Diamond service configuration derived from this node configuration.
    #[must_use]
    pub fn diamond_config(&self) -> DiamondConfig {
        DiamondConfig {
            diamond_address: self.diamond_address(),
            max_cut_selectors: self.diamond.max_cut_selectors,
            persist_on_commit: self.diamond.persist_on_commit,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Owner is not set.
    #[error("owner must not be the null address; set HABER_OWNER")]
    NullOwner,

    /// Explicit diamond address is null.
    #[error("diamond address must not be the null address")]
    NullDiamond,

    /// Cut limit is zero.
    #[error("max_cut_selectors must be at least 1")]
    ZeroCutLimit,

    /// An environment variable could not be parsed.
    #[error("invalid value for {var}: {reason}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Parse failure.
        reason: String,
    },
}

/// Deployment configuration.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    /// Deployer and initial owner.
    pub owner: Address,
    /// Deployer nonce at the diamond's creation. Facets take the next nonces.
    pub deployer_nonce: u64,
    /// Explicit diamond address, overriding the derived one.
    pub diamond_address: Option<Address>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            owner: DEV_OWNER,
            deployer_nonce: 0,
            diamond_address: None,
        }
    }
}

/// Diamond behaviour settings.
#[derive(Debug, Clone)]
pub struct DiamondSettings {
    /// Upper bound on selectors touched by one cut.
    pub max_cut_selectors: usize,
    /// Save a snapshot after every committed mutation.
    pub persist_on_commit: bool,
}

impl Default for DiamondSettings {
    fn default() -> Self {
        let defaults = DiamondConfig::default();
        Self {
            max_cut_selectors: defaults.max_cut_selectors,
            persist_on_commit: defaults.persist_on_commit,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Snapshot file. `None` keeps state in memory only.
    pub state_path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

/// Load configuration from the process environment.
///
/// # Errors
///
/// `InvalidEnv` if a set variable does not parse, or any `validate` error.
pub fn load_config() -> Result<NodeConfig, ConfigError> {
    load_config_from(|var| std::env::var(var).ok())
}

/// Load configuration, reading variables through `lookup`.
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_from<F>(lookup: F) -> Result<NodeConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = NodeConfig::default();

    if let Some(owner) = lookup("HABER_OWNER") {
        config.deployment.owner = parse_address("HABER_OWNER", &owner)?;
    }
    if let Some(nonce) = lookup("HABER_DEPLOYER_NONCE") {
        config.deployment.deployer_nonce =
            nonce.trim().parse::<u64>().map_err(|e| ConfigError::InvalidEnv {
                var: "HABER_DEPLOYER_NONCE",
                reason: format!("{e}"),
            })?;
    }
    if let Some(address) = lookup("HABER_DIAMOND_ADDRESS") {
        config.deployment.diamond_address =
            Some(parse_address("HABER_DIAMOND_ADDRESS", &address)?);
    }
    if let Some(max) = lookup("HABER_MAX_CUT_SELECTORS") {
        config.diamond.max_cut_selectors =
            max.trim().parse::<usize>().map_err(|e| ConfigError::InvalidEnv {
                var: "HABER_MAX_CUT_SELECTORS",
                reason: format!("{e}"),
            })?;
    }
    if let Some(persist) = lookup("HABER_PERSIST") {
        config.diamond.persist_on_commit = parse_bool("HABER_PERSIST", &persist)?;
    }
    if let Some(path) = lookup("HABER_STATE_PATH") {
        config.storage.state_path = (!path.is_empty()).then(|| PathBuf::from(path));
    }
    if let Some(filter) = lookup("HABER_LOG") {
        config.logging.filter = filter;
    }

    config.validate()?;
    Ok(config)
}

fn parse_address(var: &'static str, value: &str) -> Result<Address, ConfigError> {
    value.trim().parse::<Address>().map_err(|e| ConfigError::InvalidEnv {
        var,
        reason: format!("{e}"),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnv {
            var,
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}
