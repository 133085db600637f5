use async_trait::async_trait;
use reqwest::{Request, Response};

/// Seam over request execution so auth wrappers can decorate any client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
