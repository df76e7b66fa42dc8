use std::path::Path;

use async_trait::async_trait;

use crate::error::ContentStoreError;

/// The local content-addressed daemon's HTTP surface actually used here
/// (spec.md §6 "Collaborators": `version`, `id`, `swarm/peering/{ls,add}`,
/// `get`, `add`, `pin/{add,rm,ls}`, `repo/gc`, `config`), as a trait
/// object seam so tests substitute an in-memory fake.
#[async_trait]
pub trait DaemonTransport: Send + Sync {
    async fn version(&self) -> Result<String, ContentStoreError>;
    async fn get(&self, cid: &str) -> Result<Vec<u8>, ContentStoreError>;
    async fn add(&self, path: &Path) -> Result<String, ContentStoreError>;
    async fn pin_add(&self, cid: &str) -> Result<(), ContentStoreError>;
    async fn pin_rm(&self, cid: &str) -> Result<(), ContentStoreError>;
    async fn pin_ls(&self, cid: &str) -> Result<bool, ContentStoreError>;
    async fn repo_gc(&self) -> Result<(), ContentStoreError>;
    async fn swarm_peering_add(&self, multiaddr: &str) -> Result<(), ContentStoreError>;
    /// Whether `endpoint` is this daemon's own address and it is
    /// reachable only over loopback (spec.md §4.2 "Version-change
    /// protocol": upgrade is only attempted "if the endpoint is
    /// local-loopback").
    fn is_loopback(&self) -> bool;
}

/// Default transport, talking to a daemon's HTTP API (Kubo-shaped:
/// `/api/v0/<verb>?arg=<cid>`).
pub struct HttpDaemonTransport {
    client: reqwest::Client,
    base_url: String,
    loopback: bool,
}

impl HttpDaemonTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let loopback = base_url.contains("localhost") || base_url.contains("127.0.0.1");
        Self { client: reqwest::Client::new(), base_url, loopback }
    }

    fn url(&self, verb: &str) -> String {
        format!("{}/api/v0/{verb}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl DaemonTransport for HttpDaemonTransport {
    async fn version(&self) -> Result<String, ContentStoreError> {
        #[derive(serde::Deserialize)]
        struct VersionResponse {
            #[serde(rename = "Version")]
            version: String,
        }
        let resp: VersionResponse =
            self.client.post(self.url("version")).send().await?.json().await?;
        Ok(resp.version)
    }

    async fn get(&self, cid: &str) -> Result<Vec<u8>, ContentStoreError> {
        let resp = self.client.post(self.url("get")).query(&[("arg", cid)]).send().await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn add(&self, path: &Path) -> Result<String, ContentStoreError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ContentStoreError::Io { path: path.to_path_buf(), source })?;
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes)
                .file_name(path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()),
        );
        #[derive(serde::Deserialize)]
        struct AddResponse {
            #[serde(rename = "Hash")]
            hash: String,
        }
        let resp: AddResponse =
            self.client.post(self.url("add")).multipart(form).send().await?.json().await?;
        Ok(resp.hash)
    }

    async fn pin_add(&self, cid: &str) -> Result<(), ContentStoreError> {
        self.client.post(self.url("pin/add")).query(&[("arg", cid)]).send().await?;
        Ok(())
    }

    async fn pin_rm(&self, cid: &str) -> Result<(), ContentStoreError> {
        self.client.post(self.url("pin/rm")).query(&[("arg", cid)]).send().await?;
        Ok(())
    }

    async fn pin_ls(&self, cid: &str) -> Result<bool, ContentStoreError> {
        let resp = self.client.post(self.url("pin/ls")).query(&[("arg", cid)]).send().await?;
        Ok(resp.status().is_success())
    }

    async fn repo_gc(&self) -> Result<(), ContentStoreError> {
        self.client.post(self.url("repo/gc")).send().await?;
        Ok(())
    }

    async fn swarm_peering_add(&self, multiaddr: &str) -> Result<(), ContentStoreError> {
        self.client.post(self.url("swarm/peering/add")).query(&[("arg", multiaddr)]).send().await?;
        Ok(())
    }

    fn is_loopback(&self) -> bool {
        self.loopback
    }
}
