//! Network configuration, CLI surface and cache path layout for
//! `etny-node`. See `SPEC_FULL.md` §2/§6 and §3 "Cache File".

mod cache_paths;
mod cli;
mod env;
mod error;
mod network;
mod overrides;

pub use cache_paths::{
    CachePaths, DOREQ_CACHE_LIMIT, DPREQ_CACHE_LIMIT, IPFS_CACHE_LIMIT, IPFS_VERSION_CACHE_LIMIT,
    MERGED_ORDERS_CACHE_LIMIT, NETWORK_CACHE_LIMIT, ORDERS_CACHE_LIMIT,
};
pub use cli::EtnyArgs;
pub use env::{network_env_override, EnvOverrides};
pub use error::ConfigError;
pub use network::{
    resolve_network_selection, ContractAddresses, FeeModel, GasParams, NetworkConfig, NetworkType,
    RewardType, AUTO_NETWORKS, KNOWN_NETWORKS,
};
pub use overrides::{apply_override, build_command, parse_overrides, OVERRIDABLE_FIELDS};
