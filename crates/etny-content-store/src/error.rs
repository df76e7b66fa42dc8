/// Errors surfaced by the content store client (spec.md §4.2 "Failure
/// semantics", §7 "Content fetch").
#[derive(Debug, thiserror::Error)]
pub enum ContentStoreError {
    #[error("daemon HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("local I/O error at {path}: {source}")]
    Io { path: std::path::PathBuf, #[source] source: std::io::Error },

    #[error("daemon reported error for {cid}: {message}")]
    Daemon { cid: String, message: String },

    #[error("gateway returned neither a file nor a recognizable directory listing for {cid}")]
    UnrecognizedGatewayResponse { cid: String },

    #[error("all {attempts} download attempts for {cid} failed")]
    RetriesExhausted { cid: String, attempts: u32 },

    #[error("daemon at {endpoint} is unresponsive and is not local-loopback, cannot auto-restart")]
    UnresponsiveRemoteDaemon { endpoint: String },

    #[error("cache layer error: {0}")]
    Cache(#[from] etny_cache::CacheError),

    #[error("failed to extract tar archive for {cid}: {source}")]
    TarExtract { cid: String, #[source] source: std::io::Error },
}
