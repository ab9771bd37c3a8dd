//! Invocation Driver
//!
//! Two entry points share one sequencing skeleton: lock the persistent
//! directory, establish the execution context, assemble the workspace, hand
//! control to the user function.
//!
//! [`run`] is the production path: configuration comes entirely from the
//! environment, the block identity from the context file written by the
//! upstream trigger, and every failure terminates the process; a failed run
//! is retried by whatever triggered it, never by this harness. [`debug`] is
//! the interactive path: configuration comes from [`DebugOptions`], unset
//! block identity is auto-discovered remotely, migrations run before the
//! user function, and failures come back as error values. On success the
//! open workspace is returned for inspection.
//!
//! The workspace lock is released on every exit path of both entry points.
//! A partially built workspace is not rolled back beyond that; the next
//! build's output reset discards whatever a failed run left behind.

use crate::client::{HttpQueryClient, QueryClient};
use crate::config::{DebugOptions, FunctionConfig};
use crate::context::{CancelScope, FunctionContext};
use crate::error::{ConfigError, FunctionError};
use crate::lock::WorkspaceLock;
use crate::workspace::{self, Workspace};
use crate::{logging, migrate, resolve};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};

/// File inside the inputs directory carrying the production block identity.
pub const CONTEXT_FILE: &str = "context.yaml";

/// Block identity written by the production trigger.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ContextVariables {
    #[serde(default)]
    pub block_number: i64,
    #[serde(default)]
    pub block_hash: String,
}

/// Production entry point.
///
/// Never returns to the caller on failure: every setup error and any user
/// function error is reported and the process exits nonzero, after the lock
/// guard and connection have been dropped.
pub fn run<H>(handler: H)
where
    H: FnOnce(&FunctionContext, &Workspace, &dyn QueryClient) -> anyhow::Result<()>,
{
    let _ = logging::init_logging(None);

    let config = match FunctionConfig::from_env() {
        Ok(config) => config,
        Err(err) => fatal(err.into()),
    };

    match run_production(handler, &config) {
        Ok(()) => info!("function invocation succeeded"),
        Err(err) => fatal(err),
    }
}

fn fatal(err: FunctionError) -> ! {
    error!(error = %err, "function invocation failed");
    process::exit(1);
}

fn run_production<H>(handler: H, config: &FunctionConfig) -> Result<(), FunctionError>
where
    H: FnOnce(&FunctionContext, &Workspace, &dyn QueryClient) -> anyhow::Result<()>,
{
    let client = HttpQueryClient::connect(
        &config.query_endpoint,
        &config.cache_endpoint,
        &config.api_key,
    )?;

    workspace::ensure_directories(config)?;
    let _lock = WorkspaceLock::acquire(&workspace::lock_path(config))?;

    let vars = read_context_variables(&context_path(config))?;
    let scope = CancelScope::root();
    let ctx = FunctionContext::new(&scope, vars.block_number, vars.block_hash);
    info!(
        block_number = ctx.block_number(),
        block_hash = %ctx.block_hash(),
        "execution context loaded"
    );

    let ws = Workspace::open(config, ctx.scope())?;
    handler(&ctx, &ws, &client).map_err(FunctionError::Handler)?;
    Ok(())
}

/// Debug entry point, building its own HTTP client from the options.
pub fn debug<H>(handler: H, options: DebugOptions) -> Result<Workspace, FunctionError>
where
    H: FnOnce(&FunctionContext, &Workspace, &dyn QueryClient) -> anyhow::Result<()>,
{
    let (config, scope) = options.into_parts();
    workspace::ensure_directories(&config)?;
    let client = HttpQueryClient::connect(
        &config.query_endpoint,
        &config.cache_endpoint,
        &config.api_key,
    )?;
    run_debug(handler, &config, &scope, &client)
}

/// Debug entry point with an injected query client.
///
/// Test harnesses use this to substitute a stub for the remote service.
pub fn debug_with_client<H>(
    handler: H,
    options: DebugOptions,
    client: &dyn QueryClient,
) -> Result<Workspace, FunctionError>
where
    H: FnOnce(&FunctionContext, &Workspace, &dyn QueryClient) -> anyhow::Result<()>,
{
    let (config, scope) = options.into_parts();
    workspace::ensure_directories(&config)?;
    run_debug(handler, &config, &scope, client)
}

fn run_debug<H>(
    handler: H,
    config: &FunctionConfig,
    scope: &CancelScope,
    client: &dyn QueryClient,
) -> Result<Workspace, FunctionError>
where
    H: FnOnce(&FunctionContext, &Workspace, &dyn QueryClient) -> anyhow::Result<()>,
{
    let _lock = WorkspaceLock::try_acquire(&workspace::lock_path(config))?;

    let (block_number, block_hash) = resolve::resolve_block(config, client, scope)?;
    let ctx = FunctionContext::new(scope, block_number, block_hash);
    info!(
        block_number = ctx.block_number(),
        block_hash = %ctx.block_hash(),
        "execution context resolved"
    );

    let ws = Workspace::open(config, ctx.scope())?;
    migrate::apply_migrations(&ws, ctx.scope(), &config.migrations)?;

    handler(&ctx, &ws, client).map_err(FunctionError::Handler)?;

    // Lock releases here; the connection stays open for the caller.
    Ok(ws)
}

fn context_path(config: &FunctionConfig) -> PathBuf {
    config.inputs_dir.join(CONTEXT_FILE)
}

fn read_context_variables(path: &Path) -> Result<ContextVariables, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::ContextRead {
        path: path.to_path_buf(),
        source,
    })?;
    let vars: ContextVariables =
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::ContextParse {
            path: path.to_path_buf(),
            source,
        })?;

    // Production never resolves remotely, so both values must be present.
    if vars.block_number == 0 || vars.block_hash.is_empty() {
        return Err(ConfigError::IncompleteContext {
            path: path.to_path_buf(),
        });
    }
    Ok(vars)
}
