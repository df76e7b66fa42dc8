use clap::Parser;

/// Fixed CLI surface (spec.md §6). Per-network override flags
/// (`--<network>-<field>`) are generated separately in
/// [`crate::overrides`] since their set depends on the known-network
/// table rather than being fixed at compile time.
#[derive(Parser, Debug, Clone)]
#[command(name = "etny-node", version, about = "Ethernity Cloud compute-provider agent")]
pub struct EtnyArgs {
    /// Operator private key used to sign chain transactions. Required.
    #[arg(long, env = "ETNY_PRIVATE_KEY")]
    pub privatekey: String,

    /// Advertised CPU capacity. Defaults to probing the host.
    #[arg(long)]
    pub cpu: Option<u32>,
    /// Advertised RAM capacity (MB). Defaults to probing the host.
    #[arg(long)]
    pub memory: Option<u64>,
    /// Advertised storage capacity (GB). Defaults to probing the host.
    #[arg(long)]
    pub storage: Option<u64>,
    /// Advertised bandwidth. Defaults to probing the host.
    #[arg(long)]
    pub bandwidth: Option<u64>,
    /// Advertised max task duration (seconds). Defaults to probing the host.
    #[arg(long)]
    pub duration: Option<u64>,

    /// S3-compatible object store endpoint.
    #[arg(long, default_value = "localhost:9000")]
    pub endpoint: String,
    #[arg(long, default_value = "swiftstreamadmin")]
    pub access_key: String,
    #[arg(long, default_value = "swiftstreamadmin")]
    pub secret_key: String,

    /// Minimum asking price per compute-hour.
    #[arg(long, default_value_t = 3.0)]
    pub price: f64,

    /// Network selection: `all`, `auto`, a legacy single name, or an
    /// explicit comma-separated `<family>_<variant>` list.
    #[arg(long, value_delimiter = ',', default_value = "all")]
    pub network: Vec<String>,

    /// Content-store HTTP gateway (defaults to `IPFS_HOST`).
    #[arg(long, env = "IPFS_HOST")]
    pub ipfshost: Option<String>,
    /// Local content daemon connect URL (defaults to `CLIENT_CONNECT_URL`).
    #[arg(long, env = "CLIENT_CONNECT_URL")]
    pub ipfslocal: Option<String>,
}
