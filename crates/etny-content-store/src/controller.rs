use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::ContentStoreError;

/// Daemon lifecycle control, kept as a pluggable trait per spec.md §9
/// ("Daemon restart via `systemctl`... on non-Linux hosts the spec
/// permits the implementer to expose this via a pluggable 'daemon
/// controller' interface").
#[async_trait]
pub trait DaemonController: Send + Sync {
    async fn stop(&self) -> Result<(), ContentStoreError>;
    async fn start(&self) -> Result<(), ContentStoreError>;
    /// One best-effort restart attempt (spec.md §4.2 "Failure semantics":
    /// "the client attempts exactly one `systemctl restart` and
    /// reconnects").
    async fn restart(&self) -> Result<(), ContentStoreError>;
    /// Downloads and installs the upgrade artefact (spec.md §4.2
    /// "downloads and installs the new daemon binary").
    async fn install_version(&self, download_url: &str, install_path: &PathBuf) -> Result<(), ContentStoreError>;
}

/// Linux `systemctl`-backed controller for a named unit.
pub struct SystemctlController {
    unit_name: String,
    http: reqwest::Client,
}

impl SystemctlController {
    pub fn new(unit_name: impl Into<String>) -> Self {
        Self { unit_name: unit_name.into(), http: reqwest::Client::new() }
    }

    async fn systemctl(&self, verb: &str) -> Result<(), ContentStoreError> {
        let output = tokio::process::Command::new("systemctl")
            .arg(verb)
            .arg(&self.unit_name)
            .output()
            .await
            .map_err(|source| ContentStoreError::Io { path: PathBuf::from("systemctl"), source })?;
        if !output.status.success() {
            tracing::warn!(
                target: "content_store",
                unit = %self.unit_name,
                verb,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "systemctl command did not exit cleanly"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl DaemonController for SystemctlController {
    async fn stop(&self) -> Result<(), ContentStoreError> {
        self.systemctl("stop").await
    }

    async fn start(&self) -> Result<(), ContentStoreError> {
        self.systemctl("start").await
    }

    async fn restart(&self) -> Result<(), ContentStoreError> {
        self.systemctl("restart").await
    }

    async fn install_version(&self, download_url: &str, install_path: &PathBuf) -> Result<(), ContentStoreError> {
        let bytes = self.http.get(download_url).send().await?.bytes().await?;
        tokio::fs::write(install_path, &bytes)
            .await
            .map_err(|source| ContentStoreError::Io { path: install_path.clone(), source })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = tokio::fs::metadata(install_path)
                .await
                .map_err(|source| ContentStoreError::Io { path: install_path.clone(), source })?
                .permissions();
            perms.set_mode(0o755);
            tokio::fs::set_permissions(install_path, perms)
                .await
                .map_err(|source| ContentStoreError::Io { path: install_path.clone(), source })?;
        }
        Ok(())
    }
}
