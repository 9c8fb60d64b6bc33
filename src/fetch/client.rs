use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes prepared requests. The seam tests and wrappers plug into.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
