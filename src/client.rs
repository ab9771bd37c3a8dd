//! Remote Query Client
//!
//! Boundary to the hosted chain-data query service: a [`QueryClient`] trait
//! over `query(scope, sql) -> RecordBatches`, plus the [`HttpQueryClient`]
//! implementation that posts SQL to the service's HTTP endpoint and decodes
//! the columnar JSON payload. The harness itself consumes only the first
//! row/column of specific aggregate queries; user functions may consume full
//! batches.

use crate::context::CancelScope;
use crate::error::ClientError;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const SQL_ENDPOINT_PATH: &str = "/v1/sql";
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A single cell of a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view; whole-number floats coerce, everything else is `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Text(other.to_string()),
        }
    }
}

/// One columnar batch of query results.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    names: Vec<String>,
    columns: Vec<Vec<Value>>,
}

impl RecordBatch {
    /// Build a batch from row-major data, transposing into columns.
    pub fn from_rows(names: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = names.len();
        let mut columns: Vec<Vec<Value>> = (0..width).map(|_| Vec::with_capacity(rows.len())).collect();
        for row in rows {
            for (idx, value) in row.into_iter().take(width).enumerate() {
                columns[idx].push(value);
            }
        }
        Self { names, columns }
    }

    pub fn num_columns(&self) -> usize {
        self.names.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, idx: usize) -> Option<&[Value]> {
        self.columns.get(idx).map(Vec::as_slice)
    }

    pub fn value(&self, row: usize, col: usize) -> Option<&Value> {
        self.columns.get(col).and_then(|column| column.get(row))
    }

    /// First row of the first column, the shape aggregate queries resolve to.
    pub fn first(&self) -> Option<&Value> {
        self.value(0, 0)
    }
}

/// Iterator over the batches of one query result.
#[derive(Debug)]
pub struct RecordBatches {
    batches: std::vec::IntoIter<RecordBatch>,
}

impl RecordBatches {
    pub fn new(batches: Vec<RecordBatch>) -> Self {
        Self {
            batches: batches.into_iter(),
        }
    }

    /// Consume the iterator, returning the first cell of the first batch.
    pub fn first_value(mut self) -> Option<Value> {
        self.batches.next().and_then(|batch| batch.first().cloned())
    }
}

impl Iterator for RecordBatches {
    type Item = RecordBatch;

    fn next(&mut self) -> Option<RecordBatch> {
        self.batches.next()
    }
}

/// Remote query client boundary.
pub trait QueryClient: Send + Sync {
    fn query(&self, scope: &CancelScope, sql: &str) -> Result<RecordBatches, ClientError>;
}

#[derive(Deserialize)]
struct SqlResponse {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

/// HTTP client for the hosted query service.
#[derive(Debug)]
pub struct HttpQueryClient {
    http: reqwest::blocking::Client,
    query_endpoint: String,
    cache_endpoint: String,
    api_key: String,
}

impl HttpQueryClient {
    /// Validate the endpoints and build the underlying HTTP client.
    pub fn connect(
        query_endpoint: &str,
        cache_endpoint: &str,
        api_key: &str,
    ) -> Result<Self, ClientError> {
        if query_endpoint.is_empty() {
            return Err(ClientError::InvalidEndpoint(
                "query endpoint is empty".to_string(),
            ));
        }
        if cache_endpoint.is_empty() {
            return Err(ClientError::InvalidEndpoint(
                "cache endpoint is empty".to_string(),
            ));
        }

        let http = reqwest::blocking::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(ClientError::Init)?;

        debug!(query_endpoint, cache_endpoint, "query client ready");
        Ok(Self {
            http,
            query_endpoint: query_endpoint.to_string(),
            cache_endpoint: cache_endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn query_endpoint(&self) -> &str {
        &self.query_endpoint
    }

    pub fn cache_endpoint(&self) -> &str {
        &self.cache_endpoint
    }

    /// Query through the cache-accelerated endpoint instead of the primary one.
    pub fn query_cached(
        &self,
        scope: &CancelScope,
        sql: &str,
    ) -> Result<RecordBatches, ClientError> {
        self.post_sql(scope, &self.cache_endpoint, sql)
    }

    fn post_sql(
        &self,
        scope: &CancelScope,
        endpoint: &str,
        sql: &str,
    ) -> Result<RecordBatches, ClientError> {
        scope.check()?;

        let url = format!("{}{}", endpoint.trim_end_matches('/'), SQL_ENDPOINT_PATH);
        let mut request = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "sql": sql }));
        if let Some(remaining) = scope.remaining() {
            request = request.timeout(remaining);
        }

        let response = request
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(map_http_error)?;

        let payload: SqlResponse = response
            .json()
            .map_err(|err| ClientError::Decode(err.to_string()))?;

        let rows = payload
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(Value::from_json).collect())
            .collect();
        Ok(RecordBatches::new(vec![RecordBatch::from_rows(
            payload.columns,
            rows,
        )]))
    }
}

impl QueryClient for HttpQueryClient {
    fn query(&self, scope: &CancelScope, sql: &str) -> Result<RecordBatches, ClientError> {
        self.post_sql(scope, &self.query_endpoint, sql)
    }
}

fn map_http_error(error: reqwest::Error) -> ClientError {
    if let Some(status) = error.status() {
        match status.as_u16() {
            401 | 403 => ClientError::AuthFailed(error.to_string()),
            429 => ClientError::RateLimit(error.to_string()),
            _ => ClientError::RequestFailed(format!(
                "request failed with status {}: {}",
                status, error
            )),
        }
    } else if error.is_timeout() {
        ClientError::RequestFailed(format!("request timeout: {}", error))
    } else if error.is_connect() {
        ClientError::RequestFailed(format!("connection error: {}", error))
    } else {
        ClientError::RequestFailed(error.to_string())
    }
}
