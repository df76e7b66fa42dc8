//! The enclave control channel: an S3-compatible bucket used to pass
//! payloads in and results out, plus the container-engine commands that
//! bring the trusted-zone stack up (spec.md §4.6 "Execute", §6 "Container
//! engine" / "S3-compatible object store").
//!
//! The enclave-execution substrate itself (the SGX runtime, the
//! trusted-zone images) is an external collaborator out of scope (spec.md
//! §1); this module is only the concrete interface the core speaks to it
//! through, grounded on `original_source/node/swift_stream_service.py`'s
//! MinIO usage for the bucket half and plain `docker`/`docker-compose`
//! subprocesses for the container half.

use std::path::{Path, PathBuf};
use std::time::Duration;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tokio::process::Command;
use tokio::time::sleep;

/// Containers purged before a fresh execute (spec.md §4.6 "Execute":
/// "stop and purge any prior registry/las/securelock/trustedzone
/// containers").
const MANAGED_CONTAINER_NAMES: &[&str] = &["etny-registry", "etny-las", "etny-securelock", "etny-trustedzone"];

const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum EnclaveError {
    #[error("object store error: {0}")]
    ObjectStore(String),

    #[error("container engine command {command} failed: {message}")]
    ContainerEngine { command: String, message: String },

    #[error("timed out waiting for {object} in bucket {bucket} after {elapsed:?}")]
    PollTimedOut { bucket: String, object: String, elapsed: Duration },

    #[error("io error writing {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}

/// Thin wrapper over the S3-compatible bucket the enclave uses as its
/// control channel. One instance is shared by every order on a worker.
pub struct BucketClient {
    client: S3Client,
}

impl BucketClient {
    pub async fn connect(endpoint: &str, access_key: &str, secret_key: &str) -> Self {
        let endpoint_url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("http://{endpoint}")
        };
        let credentials = aws_credential_types::Credentials::new(access_key, secret_key, None, None, "etny-node");
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .endpoint_url(endpoint_url)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();
        Self { client: S3Client::from_conf(config) }
    }

    pub async fn create_bucket(&self, bucket: &str) -> Result<(), EnclaveError> {
        match self.client.create_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            Err(err) => {
                if err.as_service_error().map(|e| e.is_bucket_already_owned_by_you()).unwrap_or(false) {
                    Ok(())
                } else {
                    Err(EnclaveError::ObjectStore(err.to_string()))
                }
            }
        }
    }

    pub async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), EnclaveError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map(|_| ())
            .map_err(|err| EnclaveError::ObjectStore(err.to_string()))
    }

    pub async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<(), EnclaveError> {
        let body = ByteStream::from_path(path).await.map_err(|source| EnclaveError::Io { path: path.to_path_buf(), source: std::io::Error::new(std::io::ErrorKind::Other, source) })?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map(|_| ())
            .map_err(|err| EnclaveError::ObjectStore(err.to_string()))
    }

    pub async fn object_exists(&self, bucket: &str, key: &str) -> bool {
        self.client.head_object().bucket(bucket).key(key).send().await.is_ok()
    }

    pub async fn get_object_string(&self, bucket: &str, key: &str) -> Result<String, EnclaveError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| EnclaveError::ObjectStore(err.to_string()))?;
        let bytes = output.body.collect().await.map_err(|err| EnclaveError::ObjectStore(err.to_string()))?;
        Ok(String::from_utf8_lossy(&bytes.into_bytes()).trim().to_string())
    }

    /// Polls for `key` to appear in `bucket`, returning its contents once
    /// present or an error once `timeout` elapses (spec.md §4.6/§4.8).
    pub async fn poll_for_object(&self, bucket: &str, key: &str, timeout: Duration) -> Result<String, EnclaveError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.object_exists(bucket, key).await {
                return self.get_object_string(bucket, key).await;
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(EnclaveError::PollTimedOut { bucket: bucket.to_string(), object: key.to_string(), elapsed: timeout });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn delete_bucket(&self, bucket: &str) -> Result<(), EnclaveError> {
        let listing = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .send()
            .await
            .map_err(|err| EnclaveError::ObjectStore(err.to_string()))?;
        for object in listing.contents() {
            if let Some(key) = object.key() {
                let _ = self.client.delete_object().bucket(bucket).key(key).send().await;
            }
        }
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(|err| EnclaveError::ObjectStore(err.to_string()))
    }
}

/// A single service entry in the generated compose file: one managed
/// container, bound to the order's content directory.
pub struct ComposeService {
    pub name: String,
    pub image: String,
    pub volumes: Vec<(PathBuf, String)>,
    pub environment: Vec<(String, String)>,
}

/// Writes a minimal `docker-compose.yml` with `restart: on-failure:20`
/// (spec.md §4.6 "Execute").
pub fn write_compose_file(path: &Path, services: &[ComposeService]) -> Result<(), EnclaveError> {
    let mut out = String::from("version: \"3.8\"\nservices:\n");
    for service in services {
        out.push_str(&format!("  {}:\n", service.name));
        out.push_str(&format!("    image: {}\n", service.image));
        out.push_str("    restart: on-failure:20\n");
        if !service.environment.is_empty() {
            out.push_str("    environment:\n");
            for (key, value) in &service.environment {
                out.push_str(&format!("      {key}: {value:?}\n"));
            }
        }
        if !service.volumes.is_empty() {
            out.push_str("    volumes:\n");
            for (host, container) in &service.volumes {
                out.push_str(&format!("      - {}:{}\n", host.display(), container));
            }
        }
    }
    std::fs::write(path, out).map_err(|source| EnclaveError::Io { path: path.to_path_buf(), source })
}

/// Writes the order's `.env` file: chain id, contract, provider,
/// challenge, order id (spec.md §4.6 "Execute").
pub fn write_env_file(
    path: &Path,
    chain_id: u64,
    contract: &str,
    provider: &str,
    challenge_cid: &str,
    order_id: u64,
) -> Result<(), EnclaveError> {
    let contents = format!(
        "CHAIN_ID={chain_id}\nCONTRACT={contract}\nPROVIDER={provider}\nCHALLENGE={challenge_cid}\nORDER_ID={order_id}\n"
    );
    std::fs::write(path, contents).map_err(|source| EnclaveError::Io { path: path.to_path_buf(), source })
}

async fn run_command(program: &str, args: &[&str]) -> Result<(), EnclaveError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|source| EnclaveError::ContainerEngine { command: program.to_string(), message: source.to_string() })?;
    if !output.status.success() {
        return Err(EnclaveError::ContainerEngine {
            command: format!("{program} {}", args.join(" ")),
            message: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(())
}

/// Stops and removes any container left over from a prior execute.
/// Failures are swallowed: the container may simply not exist.
pub async fn purge_prior_containers() {
    for name in MANAGED_CONTAINER_NAMES {
        let _ = run_command("docker", &["rm", "-f", name]).await;
    }
}

/// Starts a local registry serving the enclave image out of the
/// image-CID directory (spec.md §4.6 "start a fresh registry bound to
/// the image-CID directory").
pub async fn start_registry(name: &str, image_dir: &Path, port: u16) -> Result<(), EnclaveError> {
    let volume = format!("{}:/var/lib/registry", image_dir.display());
    let port_mapping = format!("{port}:5000");
    run_command(
        "docker",
        &["run", "-d", "--name", name, "-v", &volume, "-p", &port_mapping, "registry:2"],
    )
    .await
}

/// `docker-compose -f <file> up -d` (spec.md §4.6 "bring the compose
/// stack up").
pub async fn compose_up(compose_file: &Path) -> Result<(), EnclaveError> {
    run_command("docker-compose", &["-f", &compose_file.to_string_lossy(), "up", "-d"]).await
}

/// `docker-compose -f <file> down` — used on the 24h cooperative restart
/// and after an order finishes.
pub async fn compose_down(compose_file: &Path) -> Result<(), EnclaveError> {
    run_command("docker-compose", &["-f", &compose_file.to_string_lossy(), "down"]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn compose_file_includes_restart_policy_and_services() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docker-compose.yml");
        let services = vec![ComposeService {
            name: "securelock".to_string(),
            image: "ethernitycloud/etny-securelock:latest".to_string(),
            volumes: vec![(dir.path().to_path_buf(), "/data".to_string())],
            environment: vec![("ORDER_ID".to_string(), "1".to_string())],
        }];
        write_compose_file(&path, &services).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("restart: on-failure:20"));
        assert!(content.contains("securelock"));
        assert!(content.contains("ORDER_ID"));
    }

    #[test]
    fn env_file_contains_every_required_field() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        write_env_file(&path, 137, "0xcontract", "0xprovider", "Qmchallenge", 42).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("CHAIN_ID=137"));
        assert!(content.contains("ORDER_ID=42"));
        assert!(content.contains("CHALLENGE=Qmchallenge"));
    }
}
