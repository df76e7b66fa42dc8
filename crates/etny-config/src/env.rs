/// Plain-env-var overrides (spec.md §6 "Environment variables"). Kept
/// as a small hand-rolled reader rather than a config-framework crate,
/// matching a CLI-first binary that only has a handful of env knobs.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub ipfs_host: Option<String>,
    pub client_connect_url: Option<String>,
    pub client_bootstrap_url: Option<String>,
    pub gas_limit: Option<u64>,
    pub gas_price_value: Option<u64>,
    pub skip_integration_test: bool,
    pub log_level: Option<String>,
    pub contract_call_frequency: Option<u64>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            ipfs_host: std::env::var("IPFS_HOST").ok(),
            client_connect_url: std::env::var("CLIENT_CONNECT_URL").ok(),
            client_bootstrap_url: std::env::var("CLIENT_BOOTSTRAP_URL").ok(),
            gas_limit: std::env::var("GAS_LIMIT").ok().and_then(|v| v.parse().ok()),
            gas_price_value: std::env::var("GAS_PRICE_VALUE").ok().and_then(|v| v.parse().ok()),
            skip_integration_test: parse_bool_env("SKIP_INTEGRATION_TEST"),
            log_level: std::env::var("LOG_LEVEL").ok(),
            contract_call_frequency: std::env::var("CONTRACT_CALL_FREQUENCY").ok().and_then(|v| v.parse().ok()),
        }
    }
}

fn parse_bool_env(key: &str) -> bool {
    std::env::var(key).map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes")).unwrap_or(false)
}

/// Per-network env override: `<NET>_<VARIANT>_<FIELD>`, e.g.
/// `POLYGON_MAINNET_RPC_URL` for network `polygon_mainnet` field
/// `rpc-url` (spec.md §6).
pub fn network_env_override(network_name: &str, field: &str) -> Option<String> {
    let key = format!("{}_{}", network_name.to_uppercase(), field.to_uppercase().replace('-', "_"));
    std::env::var(key).ok()
}
