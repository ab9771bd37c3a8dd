//! Invocation Configuration
//!
//! [`FunctionConfig`] is the resolved set of options controlling one
//! invocation. Production populates it once from an injected key-value
//! lookup ([`FunctionConfig::from_lookup`], with [`FunctionConfig::from_env`]
//! reading the process environment); harness logic itself never consults
//! ambient state. Debug invocations build it through [`DebugOptions`], a
//! chained-setter builder over the default configuration: call order is
//! override order, the last writer wins per field, and migrations accumulate.

use crate::context::CancelScope;
use crate::error::ConfigError;
use std::path::PathBuf;

/// Environment variables read by the production entry point.
pub const ENV_INPUT_DIR: &str = "INPUT_DIR";
pub const ENV_DATA_DIR: &str = "DATA_DIR";
pub const ENV_OUTPUT_DIR: &str = "OUTPUT_DIR";
pub const ENV_QUERY_ENDPOINT: &str = "QUERY_ENDPOINT";
pub const ENV_CACHE_ENDPOINT: &str = "CACHE_ENDPOINT";
pub const ENV_API_KEY: &str = "API_KEY";

/// Hosted endpoint defaults used by debug invocations.
pub const DEFAULT_QUERY_ENDPOINT: &str = "https://query.chaindata.dev";
pub const DEFAULT_CACHE_ENDPOINT: &str = "https://cache.chaindata.dev";

const DEFAULT_PATH_TRIGGER: &str = "eth";

/// Resolved options for a single invocation.
#[derive(Debug, Clone)]
pub struct FunctionConfig {
    /// Directory holding the input database and the production context file.
    pub inputs_dir: PathBuf,
    /// Directory holding the persistent database and its lock file.
    pub data_dir: PathBuf,
    /// Directory the output database is written into.
    pub outputs_dir: PathBuf,

    pub query_endpoint: String,
    pub cache_endpoint: String,
    pub api_key: String,

    /// Dataset-family discriminator for remote queries (e.g. `eth`).
    pub path_trigger: String,

    /// Explicit block number; `0` means auto-discover (debug mode).
    pub block_number: i64,
    /// Explicit block hash; empty means auto-discover (debug mode).
    pub block_hash: String,

    /// Schema statements applied in order before the user function (debug mode).
    pub migrations: Vec<String>,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            inputs_dir: PathBuf::from("./inputs"),
            data_dir: PathBuf::from("./data"),
            outputs_dir: PathBuf::from("./outputs"),
            query_endpoint: DEFAULT_QUERY_ENDPOINT.to_string(),
            cache_endpoint: DEFAULT_CACHE_ENDPOINT.to_string(),
            api_key: std::env::var(ENV_API_KEY).unwrap_or_default(),
            path_trigger: DEFAULT_PATH_TRIGGER.to_string(),
            block_number: 0,
            block_hash: String::new(),
            migrations: Vec::new(),
        }
    }
}

impl FunctionConfig {
    /// Production configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Production configuration from an injected key-value source.
    ///
    /// Every key is required and must be non-empty. Block identity is left
    /// unset here; production reads it from the context file.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let require = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
        };

        Ok(Self {
            inputs_dir: PathBuf::from(require(ENV_INPUT_DIR)?),
            data_dir: PathBuf::from(require(ENV_DATA_DIR)?),
            outputs_dir: PathBuf::from(require(ENV_OUTPUT_DIR)?),
            query_endpoint: require(ENV_QUERY_ENDPOINT)?,
            cache_endpoint: require(ENV_CACHE_ENDPOINT)?,
            api_key: require(ENV_API_KEY)?,
            path_trigger: DEFAULT_PATH_TRIGGER.to_string(),
            block_number: 0,
            block_hash: String::new(),
            migrations: Vec::new(),
        })
    }
}

/// Builder for debug invocations.
///
/// Starts from the default configuration (`./inputs`, `./data`, `./outputs`,
/// hosted endpoints, `API_KEY` from the environment, trigger `eth`) and
/// applies overrides in call order.
#[derive(Debug, Default)]
pub struct DebugOptions {
    config: FunctionConfig,
    scope: Option<CancelScope>,
}

impl DebugOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inputs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.inputs_dir = dir.into();
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn outputs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.outputs_dir = dir.into();
        self
    }

    pub fn query_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.query_endpoint = endpoint.into();
        self
    }

    pub fn cache_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.cache_endpoint = endpoint.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    /// Select which remote dataset family to query.
    pub fn path_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.config.path_trigger = trigger.into();
        self
    }

    /// Pin the block number instead of auto-discovering the latest one.
    pub fn block_number(mut self, number: i64) -> Self {
        self.config.block_number = number;
        self
    }

    /// Pin the block hash instead of looking it up remotely.
    pub fn block_hash(mut self, hash: impl Into<String>) -> Self {
        self.config.block_hash = hash.into();
        self
    }

    /// Append one schema statement to the migration list.
    pub fn migration(mut self, statement: impl Into<String>) -> Self {
        self.config.migrations.push(statement.into());
        self
    }

    /// Append several schema statements, preserving order.
    pub fn migrations(mut self, statements: impl IntoIterator<Item = String>) -> Self {
        self.config.migrations.extend(statements);
        self
    }

    /// Run under an enclosing cancellation scope instead of a fresh root.
    pub fn scope(mut self, scope: CancelScope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub(crate) fn into_parts(self) -> (FunctionConfig, CancelScope) {
        let scope = self.scope.unwrap_or_default();
        (self.config, scope)
    }
}
