//! End-to-end debug invocations against a stubbed query service.

use super::test_utils::StubChainClient;
use chainfn::duckdb::params;
use chainfn::error::{FunctionError, LockError, ResolveError};
use chainfn::{
    debug_with_client, CancelScope, DebugOptions, FunctionContext, QueryClient, Workspace,
};
use tempfile::TempDir;

fn options_in(dir: &TempDir) -> DebugOptions {
    DebugOptions::new()
        .inputs_dir(dir.path().join("inputs"))
        .data_dir(dir.path().join("data"))
        .outputs_dir(dir.path().join("outputs"))
}

const GREETINGS_TABLE: &str =
    "CREATE TABLE output.greetings (block_number BIGINT, greeting VARCHAR)";

/// Test that an unset block identity resolves to the latest remote block
#[test]
fn test_resolves_latest_block_and_exposes_context() {
    let dir = TempDir::new().unwrap();
    let client = StubChainClient::new(100, "0xabc");

    let ws = debug_with_client(
        |ctx: &FunctionContext, _ws: &Workspace, _client: &dyn QueryClient| {
            assert_eq!(ctx.block_number(), 100);
            assert_eq!(ctx.block_hash(), "0xabc");
            Ok(())
        },
        options_in(&dir),
        &client,
    )
    .unwrap();

    assert_eq!(client.query_count(), 2);
    drop(ws);
}

/// Test that a pinned block identity is used verbatim, with zero remote queries
#[test]
fn test_pinned_block_performs_no_remote_queries() {
    let dir = TempDir::new().unwrap();
    let client = StubChainClient::new(999, "0xnever");

    let ws = debug_with_client(
        |ctx: &FunctionContext, _ws: &Workspace, _client: &dyn QueryClient| {
            assert_eq!(ctx.block_number(), 42);
            assert_eq!(ctx.block_hash(), "0xdead");
            Ok(())
        },
        options_in(&dir).block_number(42).block_hash("0xdead"),
        &client,
    )
    .unwrap();

    assert_eq!(client.query_count(), 0);
    drop(ws);
}

#[test]
fn test_migrations_provision_output_before_the_handler() {
    let dir = TempDir::new().unwrap();
    let client = StubChainClient::new(100, "0xabc");

    let ws = debug_with_client(
        |ctx: &FunctionContext, ws: &Workspace, _client: &dyn QueryClient| {
            // The migrated table must already exist here.
            ws.exec(
                ctx.scope(),
                "INSERT INTO output.greetings VALUES (?, ?)",
                params![ctx.block_number(), "hello from the harness"],
            )?;
            Ok(())
        },
        options_in(&dir).migration(GREETINGS_TABLE),
        &client,
    )
    .unwrap();

    let scope = CancelScope::root();
    let (block_number, greeting): (i64, String) = ws
        .query_row(
            &scope,
            "SELECT block_number, greeting FROM output.greetings",
            params![],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(block_number, 100);
    assert_eq!(greeting, "hello from the harness");
}

#[test]
fn test_output_database_is_reset_between_runs() {
    let dir = TempDir::new().unwrap();
    let client = StubChainClient::new(100, "0xabc");

    let first = debug_with_client(
        |ctx: &FunctionContext, ws: &Workspace, _client: &dyn QueryClient| {
            ws.exec(
                ctx.scope(),
                "INSERT INTO output.greetings VALUES (?, ?)",
                params![ctx.block_number(), "first run"],
            )?;
            Ok(())
        },
        options_in(&dir).migration(GREETINGS_TABLE),
        &client,
    )
    .unwrap();
    drop(first);

    let second = debug_with_client(
        |ctx: &FunctionContext, ws: &Workspace, _client: &dyn QueryClient| {
            let rows: i64 = ws.query_row(
                ctx.scope(),
                "SELECT COUNT(*) FROM output.greetings",
                params![],
                |row| row.get(0),
            )?;
            assert_eq!(rows, 0, "first run's output leaked into the second run");
            Ok(())
        },
        options_in(&dir).migration(GREETINGS_TABLE),
        &client,
    )
    .unwrap();
    drop(second);
}

#[test]
fn test_handler_failure_is_returned_and_releases_the_lock() {
    let dir = TempDir::new().unwrap();
    let client = StubChainClient::new(100, "0xabc");

    let err = debug_with_client(
        |_ctx: &FunctionContext, _ws: &Workspace, _client: &dyn QueryClient| {
            Err(anyhow::anyhow!("boom"))
        },
        options_in(&dir),
        &client,
    )
    .unwrap_err();
    assert!(matches!(err, FunctionError::Handler(_)));

    // The lock must be free again for the next invocation.
    let ws = debug_with_client(
        |_ctx: &FunctionContext, _ws: &Workspace, _client: &dyn QueryClient| Ok(()),
        options_in(&dir),
        &client,
    )
    .unwrap();
    drop(ws);
}

#[test]
fn test_concurrent_invocation_fails_fast_on_the_held_lock() {
    let dir = TempDir::new().unwrap();
    let client = StubChainClient::new(100, "0xabc");

    let outer_options = options_in(&dir);
    let inner_options = options_in(&dir);

    let ws = debug_with_client(
        move |_ctx: &FunctionContext, _ws: &Workspace, client: &dyn QueryClient| {
            // Re-entering while the lock is held must fail, not deadlock.
            let err = debug_with_client(
                |_ctx: &FunctionContext, _ws: &Workspace, _client: &dyn QueryClient| Ok(()),
                inner_options,
                client,
            )
            .unwrap_err();
            assert!(matches!(err, FunctionError::Lock(LockError::Held { .. })));
            Ok(())
        },
        outer_options,
        &client,
    )
    .unwrap();
    drop(ws);
}

#[test]
fn test_resolver_failure_surfaces_as_resolve_error() {
    let dir = TempDir::new().unwrap();
    let client = StubChainClient::empty();

    let err = debug_with_client(
        |_ctx: &FunctionContext, _ws: &Workspace, _client: &dyn QueryClient| Ok(()),
        options_in(&dir),
        &client,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        FunctionError::Resolve(ResolveError::NoLatestBlock { .. })
    ));
}

#[test]
fn test_failed_migration_names_the_statement_and_skips_the_handler() {
    let dir = TempDir::new().unwrap();
    let client = StubChainClient::new(100, "0xabc");

    let err = debug_with_client(
        |_ctx: &FunctionContext, _ws: &Workspace, _client: &dyn QueryClient| {
            panic!("handler must not run after a failed migration");
        },
        options_in(&dir)
            .migration(GREETINGS_TABLE)
            .migration("CREATE TABLE output.broken ("),
        &client,
    )
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("CREATE TABLE output.broken ("));
}

#[test]
fn test_cancelled_scope_aborts_before_workspace_assembly() {
    let dir = TempDir::new().unwrap();
    let client = StubChainClient::new(100, "0xabc");

    let scope = CancelScope::root();
    scope.cancel();

    let err = debug_with_client(
        |_ctx: &FunctionContext, _ws: &Workspace, _client: &dyn QueryClient| Ok(()),
        options_in(&dir)
            .block_number(42)
            .block_hash("0xdead")
            .scope(scope),
        &client,
    )
    .unwrap_err();
    assert!(matches!(err, FunctionError::Workspace(_)));
}
