use std::time::Duration;

use super::client::HttpClient;
use async_trait::async_trait;

/// A plain `reqwest` client with a request timeout and a fixed user agent.
///
/// Certificate verification is left at reqwest's default (enabled).
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new(timeout: Duration, user_agent: &str) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .user_agent(user_agent)
            .build()?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
