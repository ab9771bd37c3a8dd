//! Context Resolver
//!
//! Determines the block the invocation operates against. Explicitly supplied
//! values are used verbatim; otherwise the resolver asks the remote service
//! for the newest known block of the configured dataset family, then for
//! that block's hash. Production never reaches the network path: it supplies
//! both values through the context file, and only the debug driver calls in
//! here with unset fields.

use crate::client::QueryClient;
use crate::config::FunctionConfig;
use crate::context::CancelScope;
use crate::error::ResolveError;
use tracing::debug;

/// Resolve the invocation's `(block_number, block_hash)`.
pub fn resolve_block(
    config: &FunctionConfig,
    client: &dyn QueryClient,
    scope: &CancelScope,
) -> Result<(i64, String), ResolveError> {
    let block_number = if config.block_number != 0 {
        config.block_number
    } else {
        latest_block_number(config, client, scope)?
    };

    let block_hash = if !config.block_hash.is_empty() {
        config.block_hash.clone()
    } else {
        block_hash_for(config, client, scope, block_number)?
    };

    debug!(block_number, block_hash = %block_hash, "execution context resolved");
    Ok((block_number, block_hash))
}

fn latest_block_number(
    config: &FunctionConfig,
    client: &dyn QueryClient,
    scope: &CancelScope,
) -> Result<i64, ResolveError> {
    let sql = format!(
        "SELECT MAX(number) FROM {}.recent_blocks",
        config.path_trigger
    );
    let batches = client
        .query(scope, &sql)
        .map_err(|source| ResolveError::LatestBlockQuery {
            trigger: config.path_trigger.clone(),
            source,
        })?;

    match batches.first_value().and_then(|value| value.as_i64()) {
        Some(number) if number > 0 => Ok(number),
        _ => Err(ResolveError::NoLatestBlock {
            trigger: config.path_trigger.clone(),
        }),
    }
}

fn block_hash_for(
    config: &FunctionConfig,
    client: &dyn QueryClient,
    scope: &CancelScope,
    number: i64,
) -> Result<String, ResolveError> {
    let sql = format!(
        "SELECT hash FROM {}.blocks WHERE number = {}",
        config.path_trigger, number
    );
    let batches = client
        .query(scope, &sql)
        .map_err(|source| ResolveError::BlockHashQuery { number, source })?;

    match batches.first_value() {
        Some(value) => match value.as_text() {
            Some(hash) if !hash.is_empty() => Ok(hash.to_string()),
            _ => Err(ResolveError::NoBlockHash { number }),
        },
        None => Err(ResolveError::NoBlockHash { number }),
    }
}
