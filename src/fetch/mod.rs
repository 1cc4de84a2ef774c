//! HTTP plumbing for the feed endpoint.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::Url;

/// Issues a GET for `url` through `client` and returns the response body.
///
/// A non-2xx status is reported as an error, the same as a connection failure.
#[tracing::instrument(skip_all, fields(url = %url))]
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: Url) -> reqwest::Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req).await?.error_for_status()?;
    let bytes = resp.bytes().await?;
    tracing::debug!(bytes = bytes.len(), "Feed body received");
    Ok(bytes.to_vec())
}
