use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes prepared requests. Decorators such as
/// [`UrlParam`](super::auth::UrlParam) wrap another client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
