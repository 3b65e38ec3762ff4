//! Schema download over HTTP via `gloo-net`.

#[cfg(test)]
#[path = "schema_fetch_test.rs"]
mod schema_fetch_test;

#[cfg(feature = "csr")]
use crate::error::ReceiverError;

#[cfg(any(test, feature = "csr"))]
fn schema_status_message(path: &str, status: u16) -> String {
    format!("GET {path} returned {status}")
}

/// Fetch the schema text from `path` (relative to the page origin).
///
/// # Errors
///
/// Returns [`ReceiverError::SchemaLoad`] for network failures and non-2xx
/// responses.
#[cfg(feature = "csr")]
pub async fn fetch_schema(path: &str) -> Result<String, ReceiverError> {
    let resp = gloo_net::http::Request::get(path)
        .send()
        .await
        .map_err(|e| ReceiverError::SchemaLoad(e.to_string()))?;
    if !resp.ok() {
        return Err(ReceiverError::SchemaLoad(schema_status_message(path, resp.status())));
    }
    resp.text().await.map_err(|e| ReceiverError::SchemaLoad(e.to_string()))
}
