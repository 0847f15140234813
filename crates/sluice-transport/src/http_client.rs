//! Minimal HTTPS JSON client used for service handshakes.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use sluice_core::{TransportError, TransportResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Joins `base` and `endpoint` and appends the query `params`.
pub fn endpoint_url(base: &str, endpoint: &str, params: &[(&str, &str)]) -> TransportResult<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    );
    Url::parse_with_params(&joined, params)
        .map_err(|e| TransportError::InvalidConfig(format!("invalid URL '{joined}': {e}")))
}

/// Issues a GET request and decodes the JSON body.
///
/// Any status other than 200 is an error.
pub async fn get_json<T: DeserializeOwned>(url: Url) -> TransportResult<T> {
    let client = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| TransportError::Io(e.to_string()))?;

    // The query may carry credentials; log only the endpoint.
    debug!(host = ?url.host_str(), path = %url.path(), "GET");

    let resp = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| TransportError::ConnectionFailed {
            url: url.path().to_string(),
            reason: e.to_string(),
        })?;

    let status = resp.status();
    if status != StatusCode::OK {
        return Err(TransportError::UnexpectedStatus {
            url: url.path().to_string(),
            status: status.as_u16(),
        });
    }

    resp.json()
        .await
        .map_err(|e| TransportError::Io(format!("invalid JSON body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url() {
        let url = endpoint_url("https://slack.com/api/", "/rtm.start", &[("token", "a b&c")])
            .unwrap();
        assert_eq!(url.as_str(), "https://slack.com/api/rtm.start?token=a+b%26c");
    }

    #[test]
    fn test_endpoint_url_rejects_garbage() {
        assert!(endpoint_url("not a url", "x", &[]).is_err());
    }
}
