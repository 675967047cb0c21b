//! Shared HTTP plumbing for the built-in adapters.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::FetchError;

/// Build the client shared by all adapters.
///
/// # Errors
///
/// Returns [`FetchError::Configuration`] if the TLS backend cannot be set up.
pub fn build_client(timeout: Duration, user_agent: &str) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(user_agent)
        .build()
        .map_err(|e| FetchError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Send a request and return the body text of a 2xx response.
pub(crate) async fn send_text(
    request: RequestBuilder,
    authenticated: bool,
) -> Result<String, FetchError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::from_status(
            status,
            response.url().as_str(),
            authenticated,
        ));
    }
    Ok(response.text().await?)
}

/// Send a request and decode a 2xx JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    authenticated: bool,
    context: &str,
) -> Result<T, FetchError> {
    let body = send_text(request, authenticated).await?;
    serde_json::from_str(&body).map_err(|e| FetchError::decode(context, e))
}
