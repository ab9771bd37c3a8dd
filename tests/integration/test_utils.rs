//! Shared test utilities for integration tests
//!
//! Provides stub query clients so the harness can be driven end to end
//! without reaching the hosted query service.

use chainfn::error::ClientError;
use chainfn::{CancelScope, QueryClient, RecordBatch, RecordBatches, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Stub for the hosted query service: answers the two resolver queries and
/// counts every call.
pub struct StubChainClient {
    latest_block: i64,
    block_hash: &'static str,
    queries: AtomicUsize,
}

impl StubChainClient {
    pub fn new(latest_block: i64, block_hash: &'static str) -> Self {
        Self {
            latest_block,
            block_hash,
            queries: AtomicUsize::new(0),
        }
    }

    /// A service that knows no blocks at all.
    pub fn empty() -> Self {
        Self::new(0, "")
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn scalar(name: &str, value: Option<Value>) -> RecordBatches {
        let rows = value.map(|v| vec![vec![v]]).unwrap_or_default();
        RecordBatches::new(vec![RecordBatch::from_rows(vec![name.to_string()], rows)])
    }
}

impl QueryClient for StubChainClient {
    fn query(&self, _scope: &CancelScope, sql: &str) -> Result<RecordBatches, ClientError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if sql.contains("MAX(number)") {
            let value = (self.latest_block > 0).then_some(Value::Int(self.latest_block));
            Ok(Self::scalar("max(number)", value))
        } else if sql.contains("SELECT hash") {
            let value =
                (!self.block_hash.is_empty()).then(|| Value::Text(self.block_hash.to_string()));
            Ok(Self::scalar("hash", value))
        } else {
            Err(ClientError::RequestFailed(format!(
                "unexpected query: {sql}"
            )))
        }
    }
}

/// Client for tests that must never touch the network path.
pub struct UnusedClient;

impl QueryClient for UnusedClient {
    fn query(&self, _scope: &CancelScope, sql: &str) -> Result<RecordBatches, ClientError> {
        Err(ClientError::RequestFailed(format!(
            "no remote service in this test: {sql}"
        )))
    }
}
