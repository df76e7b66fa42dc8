use async_trait::async_trait;

use crate::error::ContentStoreError;

/// What a gateway probe determined the object to be (spec.md §4.2
/// "Download algorithm" step 2: "issue a probe request to decide
/// file-vs-directory").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    File,
    Directory,
}

/// The HTTP gateway fallback fetch path (spec.md §4.2, §6 "Collaborators").
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn probe(&self, cid: &str) -> Result<GatewayKind, ContentStoreError>;
    async fn fetch_file(&self, cid: &str) -> Result<Vec<u8>, ContentStoreError>;
    async fn fetch_tar(&self, cid: &str) -> Result<Vec<u8>, ContentStoreError>;
}

pub struct HttpGatewayTransport {
    client: reqwest::Client,
    gateway_url: String,
}

impl HttpGatewayTransport {
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), gateway_url: gateway_url.into() }
    }

    fn object_url(&self, cid: &str) -> String {
        format!("{}/ipfs/{cid}", self.gateway_url.trim_end_matches('/'))
    }
}

/// A gateway directory listing page links every child as `/ipfs/<cid>`
/// (spec.md §4.2 "directory if the gateway returns a listing page
/// containing `/ipfs/` links").
pub fn looks_like_directory_listing(body: &str) -> bool {
    body.contains("/ipfs/")
}

#[async_trait]
impl GatewayTransport for HttpGatewayTransport {
    async fn probe(&self, cid: &str) -> Result<GatewayKind, ContentStoreError> {
        let resp = self.client.get(self.object_url(cid)).send().await?;
        let content_type =
            resp.headers().get(reqwest::header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("").to_string();
        if content_type.starts_with("text/html") {
            let body = resp.text().await?;
            if looks_like_directory_listing(&body) {
                return Ok(GatewayKind::Directory);
            }
        }
        Ok(GatewayKind::File)
    }

    async fn fetch_file(&self, cid: &str) -> Result<Vec<u8>, ContentStoreError> {
        let resp = self.client.get(self.object_url(cid)).send().await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn fetch_tar(&self, cid: &str) -> Result<Vec<u8>, ContentStoreError> {
        let resp = self.client.get(format!("{}?format=tar", self.object_url(cid))).send().await?;
        Ok(resp.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_listing_detection_looks_for_ipfs_links() {
        assert!(looks_like_directory_listing("<html><a href=\"/ipfs/QmChild\">child</a></html>"));
        assert!(!looks_like_directory_listing("<html>just a file body</html>"));
    }
}
