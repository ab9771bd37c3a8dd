//! Migration Applier
//!
//! Runs caller-declared schema statements against the assembled workspace,
//! strictly in declaration order, after assembly and before the user
//! function. The first failing statement aborts the sequence; its text is
//! carried in the error alongside the engine's own message. Debug mode only:
//! production workspaces arrive with schemas provisioned by deployment.

use crate::context::CancelScope;
use crate::error::WorkspaceError;
use crate::workspace::Workspace;
use tracing::debug;

pub fn apply_migrations(
    workspace: &Workspace,
    scope: &CancelScope,
    migrations: &[String],
) -> Result<(), WorkspaceError> {
    for statement in migrations {
        scope.check()?;
        workspace
            .connection()
            .execute_batch(statement)
            .map_err(|source| WorkspaceError::Migration {
                statement: statement.clone(),
                source,
            })?;
        debug!(statement = %statement, "migration applied");
    }
    Ok(())
}
