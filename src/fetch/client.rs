use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, Request, Response, Url};

/// Media type GTFS-RT producers serve protobuf feeds under.
pub const PROTOBUF_MEDIA_TYPE: &str = "application/x-protobuf";

/// Transport seam for feed requests. Implementations may decorate the
/// request before sending it.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;

    /// Sends a GET for a protobuf feed at `url`.
    async fn get_feed(&self, url: Url) -> reqwest::Result<Response> {
        let mut req = Request::new(Method::GET, url);
        req.headers_mut()
            .insert(ACCEPT, HeaderValue::from_static(PROTOBUF_MEDIA_TYPE));
        self.execute(req).await
    }
}
