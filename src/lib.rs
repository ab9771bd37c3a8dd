//! Chainfn: Execution Harness for Chain-Data Transform Functions
//!
//! Hosts one user-authored transform function per process run. The harness
//! resolves which block of on-chain data the function operates against,
//! takes an exclusive lock over the persistent-state directory, assembles a
//! three-database workspace (`persistent`, `input`, and `output`, all visible
//! through one connection), applies caller-supplied migrations in debug
//! mode, and invokes the function with a prepared context, workspace, and
//! remote query client.
//!
//! ```no_run
//! use chainfn::{DebugOptions, FunctionContext, QueryClient, Workspace};
//! use duckdb::params;
//!
//! # fn main() -> Result<(), chainfn::FunctionError> {
//! let workspace = chainfn::debug(
//!     |ctx: &FunctionContext, ws: &Workspace, _client: &dyn QueryClient| {
//!         ws.exec(
//!             ctx.scope(),
//!             "INSERT INTO output.greetings VALUES (?, ?)",
//!             params![ctx.block_number(), "hello"],
//!         )?;
//!         Ok(())
//!     },
//!     DebugOptions::new()
//!         .migration("CREATE TABLE output.greetings (block_number BIGINT, greeting VARCHAR)"),
//! )?;
//! # drop(workspace);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod lock;
pub mod logging;
pub mod migrate;
pub mod resolve;
pub mod run;
pub mod workspace;

pub use client::{HttpQueryClient, QueryClient, RecordBatch, RecordBatches, Value};
pub use config::{DebugOptions, FunctionConfig};
pub use context::{CancelScope, FunctionContext};
pub use error::FunctionError;
pub use run::{debug, debug_with_client, run};
pub use workspace::Workspace;

// Re-exported so user functions can build statement parameters without
// declaring the dependency themselves.
pub use duckdb;
