//! Error types for the transform-function execution harness.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration and context-file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnv(String),

    #[error("failed to read context file {path}: {source}")]
    ContextRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse context file {path}: {source}")]
    ContextParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("context file {path} is incomplete: block_number and block_hash must both be set")]
    IncompleteContext { path: PathBuf },

    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Cancellation and deadline errors raised by [`crate::context::CancelScope`]
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Workspace lock acquisition errors
#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to create lock file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("workspace lock {path} is already held")]
    Held { path: PathBuf },

    #[error("failed to acquire workspace lock {path}: {source}")]
    Acquire {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Remote query client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid endpoint address: {0}")]
    InvalidEndpoint(String),

    #[error("failed to build HTTP client: {0}")]
    Init(#[source] reqwest::Error),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("query request failed: {0}")]
    RequestFailed(String),

    #[error("failed to decode query response: {0}")]
    Decode(String),

    #[error(transparent)]
    Cancelled(#[from] ContextError),
}

/// Workspace assembly and statement errors
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open persistent database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: duckdb::Error,
    },

    #[error("extension bootstrap failed: {source}")]
    Bootstrap {
        #[source]
        source: duckdb::Error,
    },

    #[error("failed to attach {name} database {path}: {source}")]
    Attach {
        name: &'static str,
        path: PathBuf,
        #[source]
        source: duckdb::Error,
    },

    #[error("failed to reset output database {path}: {source}")]
    ResetOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("migration failed: `{statement}`: {source}")]
    Migration {
        statement: String,
        #[source]
        source: duckdb::Error,
    },

    #[error("statement failed: `{statement}`: {source}")]
    Statement {
        statement: String,
        #[source]
        source: duckdb::Error,
    },

    #[error(transparent)]
    Cancelled(#[from] ContextError),
}

/// Block number/hash auto-discovery errors
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("latest block query failed for trigger {trigger}: {source}")]
    LatestBlockQuery {
        trigger: String,
        #[source]
        source: ClientError,
    },

    #[error("no latest block available for trigger {trigger}")]
    NoLatestBlock { trigger: String },

    #[error("block hash query failed for block {number}: {source}")]
    BlockHashQuery {
        number: i64,
        #[source]
        source: ClientError,
    },

    #[error("no block hash found for block {number}")]
    NoBlockHash { number: i64 },
}

/// Top-level invocation error
///
/// Production invocations report any of these and terminate the process;
/// debug invocations return them to the caller.
#[derive(Debug, Error)]
pub enum FunctionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("user function failed: {0}")]
    Handler(anyhow::Error),
}
