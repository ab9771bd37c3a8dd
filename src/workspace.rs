//! Database Workspace Builder
//!
//! Assembles the three-database workspace a transform function runs against:
//! the persistent database opened (or created) under the data directory, the
//! input database attached read-side under the logical name `input`, and a
//! freshly reset output database attached under `output`. All three names
//! are visible through one connection for the duration of the invocation.
//!
//! The extension bootstrap runs exactly once per open, before any caller
//! statement. The output file is deleted (WAL sidecar included) on every
//! build, so no run ever observes a previous run's output.

use crate::config::FunctionConfig;
use crate::context::CancelScope;
use crate::error::WorkspaceError;
use duckdb::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const PERSISTENT_DB_FILE: &str = "persistent_data.duckdb";
pub const LOCK_FILE: &str = "persistent_data.lock";
pub const INPUT_DB_FILE: &str = "input.duckdb";
pub const OUTPUT_DB_FILE: &str = "output.duckdb";

pub const INPUT_SCHEMA: &str = "input";
pub const OUTPUT_SCHEMA: &str = "output";

const BOOTSTRAP_SQL: &str = "INSTALL 'parquet'; LOAD 'parquet'; INSTALL 'json'; LOAD 'json';";

/// Path of the lock file guarding a configuration's persistent directory.
pub fn lock_path(config: &FunctionConfig) -> PathBuf {
    config.data_dir.join(LOCK_FILE)
}

/// Create the input/data/output directories if absent.
///
/// Idempotent; must run before lock acquisition so the lock file's parent
/// exists. Existing files are left untouched.
pub fn ensure_directories(config: &FunctionConfig) -> Result<(), WorkspaceError> {
    for dir in [&config.inputs_dir, &config.data_dir, &config.outputs_dir] {
        fs::create_dir_all(dir).map_err(|source| WorkspaceError::CreateDir {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(())
}

/// The assembled workspace: one live connection exposing the persistent
/// database's own tables plus the `input` and `output` schemas.
#[derive(Debug)]
pub struct Workspace {
    conn: Connection,
    persistent_path: PathBuf,
    input_path: PathBuf,
    output_path: PathBuf,
}

impl Workspace {
    /// Open the persistent database and attach the input and output files.
    ///
    /// Order is significant: open + bootstrap, attach `input`, reset and
    /// attach `output`. Each step's completion is a precondition for the
    /// next; nothing is retried.
    pub fn open(config: &FunctionConfig, scope: &CancelScope) -> Result<Self, WorkspaceError> {
        scope.check()?;

        let persistent_path = config.data_dir.join(PERSISTENT_DB_FILE);
        let conn = Connection::open(&persistent_path).map_err(|source| WorkspaceError::Open {
            path: persistent_path.clone(),
            source,
        })?;
        conn.execute_batch(BOOTSTRAP_SQL)
            .map_err(|source| WorkspaceError::Bootstrap { source })?;

        let input_path = config.inputs_dir.join(INPUT_DB_FILE);
        attach(&conn, scope, INPUT_SCHEMA, &input_path)?;

        let output_path = config.outputs_dir.join(OUTPUT_DB_FILE);
        reset_output(&output_path)?;
        attach(&conn, scope, OUTPUT_SCHEMA, &output_path)?;

        info!(
            persistent = %persistent_path.display(),
            input = %input_path.display(),
            output = %output_path.display(),
            "workspace assembled"
        );
        Ok(Self {
            conn,
            persistent_path,
            input_path,
            output_path,
        })
    }

    /// The underlying connection, for callers that need prepared statements
    /// or batch execution directly.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Execute one statement, checking the scope first.
    pub fn exec<P: duckdb::Params>(
        &self,
        scope: &CancelScope,
        sql: &str,
        params: P,
    ) -> Result<usize, WorkspaceError> {
        scope.check()?;
        self.conn
            .execute(sql, params)
            .map_err(|source| WorkspaceError::Statement {
                statement: sql.to_string(),
                source,
            })
    }

    /// Run a query expected to yield a single row, checking the scope first.
    pub fn query_row<T, P, F>(
        &self,
        scope: &CancelScope,
        sql: &str,
        params: P,
        f: F,
    ) -> Result<T, WorkspaceError>
    where
        P: duckdb::Params,
        F: FnOnce(&duckdb::Row<'_>) -> duckdb::Result<T>,
    {
        scope.check()?;
        self.conn
            .query_row(sql, params, f)
            .map_err(|source| WorkspaceError::Statement {
                statement: sql.to_string(),
                source,
            })
    }

    pub fn persistent_path(&self) -> &Path {
        &self.persistent_path
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

fn attach(
    conn: &Connection,
    scope: &CancelScope,
    name: &'static str,
    path: &Path,
) -> Result<(), WorkspaceError> {
    scope.check()?;
    let sql = format!("ATTACH '{}' AS {}", quote_path(path), name);
    conn.execute_batch(&sql)
        .map_err(|source| WorkspaceError::Attach {
            name,
            path: path.to_path_buf(),
            source,
        })?;
    debug!(name, path = %path.display(), "database attached");
    Ok(())
}

fn quote_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "''")
}

fn reset_output(path: &Path) -> Result<(), WorkspaceError> {
    let wal = PathBuf::from(format!("{}.wal", path.display()));
    for candidate in [path, wal.as_path()] {
        if candidate.exists() {
            fs::remove_file(candidate).map_err(|source| WorkspaceError::ResetOutput {
                path: candidate.to_path_buf(),
                source,
            })?;
            debug!(path = %candidate.display(), "stale output removed");
        }
    }
    Ok(())
}
