use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Distinguishes production networks (where the dispersion factor
/// scales with operator count) from testnets (where it is pinned to 1).
/// Resolves Open Question #2 in spec.md §9: this is a flag on
/// `NetworkConfig`, never a string comparison against the network's
/// display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkType {
    Mainnet,
    Testnet,
}

impl NetworkType {
    pub fn is_testnet(self) -> bool {
        matches!(self, NetworkType::Testnet)
    }
}

/// Selects one of the two fee-distribution formulas in
/// `SPEC_FULL.md` §4.6/§4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardType {
    /// `reward = total - total*network_fee% - total*enclave_fee%`
    Net = 1,
    /// fees are backed out of `total` so that `base + net + enc == total`
    GrossedUp = 2,
}

impl TryFrom<u8> for RewardType {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RewardType::Net),
            2 => Ok(RewardType::GrossedUp),
            other => Err(ConfigError::InvalidValue {
                field: "reward_type",
                value: other.to_string(),
                reason: "must be 1 or 2".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub dp_request: String,
    pub do_request: String,
    pub order: String,
    pub heartbeat: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeModel {
    pub network_fee_pct: u32,
    pub enclave_fee_pct: u32,
    pub reward_type: RewardType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasParams {
    pub gas_limit: u64,
    /// Legacy `gasPrice` value, pre-multiplication by `gas_price_measure`.
    pub gas_price_value: u64,
    /// Wei/gwei scaling factor applied to `gas_price_value` for legacy fee mode.
    pub gas_price_measure: u64,
    /// Hard ceiling on computed `maxFeePerGas`; `send` fails with `FeeTooHigh` above this.
    pub fee_ceiling_wei: u128,
}

/// One configured network. Immutable once built; a worker owns one
/// `NetworkConfig` value for its lifetime (spec.md §9 — no monkey-patched
/// reassignment of a shared config object).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub block_time_secs: u64,
    pub contracts: ContractAddresses,
    pub fee_model: FeeModel,
    pub eip1559: bool,
    pub gas: GasParams,
    pub network_type: NetworkType,
    pub integration_test_image: String,
    pub trustedzone_images: Vec<String>,
    /// Per-network JSON-RPC rate-limit pacing (spec.md §4.3 "Inter-call pacing").
    pub rpc_delay_ms: u64,
}

impl NetworkConfig {
    pub fn block_time(&self) -> Duration {
        Duration::from_secs(self.block_time_secs)
    }

    /// `block_time - 1.3s`, clamped to zero for degenerate configs
    /// (spec.md §8 "Boundary behaviors").
    pub fn dispatch_scan_sleep(&self) -> Duration {
        self.block_time().checked_sub(Duration::from_millis(1300)).unwrap_or(Duration::ZERO)
    }

    pub fn rpc_delay(&self) -> Duration {
        Duration::from_millis(self.rpc_delay_ms)
    }
}

/// All `<family>_<variant>` pairs known to the binary, plus the legacy
/// aliases that map onto them (spec.md §4.8 "Worker set").
pub const KNOWN_NETWORKS: &[&str] =
    &["polygon_mainnet", "polygon_testnet", "bloxberg_mainnet", "bloxberg_testnet"];

/// `auto` resolves to this set (spec.md §4.8).
pub const AUTO_NETWORKS: &[&str] = &["polygon_mainnet", "bloxberg_mainnet"];

/// Resolves the `--network` CLI argument's selection rules into a
/// concrete, deduplicated list of `<family>_<variant>` names.
pub fn resolve_network_selection(requested: &[String]) -> Result<Vec<String>, ConfigError> {
    let mut resolved = Vec::new();
    for name in requested {
        match name.as_str() {
            "all" => resolved.extend(KNOWN_NETWORKS.iter().map(|s| s.to_string())),
            "auto" => resolved.extend(AUTO_NETWORKS.iter().map(|s| s.to_string())),
            // Legacy single names map to their mainnet/testnet variant.
            "bloxberg" => resolved.push("bloxberg_mainnet".to_string()),
            "testnet" => resolved.push("bloxberg_testnet".to_string()),
            "polygon" => resolved.push("polygon_mainnet".to_string()),
            explicit if KNOWN_NETWORKS.contains(&explicit) => resolved.push(explicit.to_string()),
            unknown => {
                return Err(ConfigError::UnknownNetwork(unknown.to_string(), KNOWN_NETWORKS.to_vec()))
            }
        }
    }
    resolved.sort();
    resolved.dedup();
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_expands_to_known_networks() {
        let resolved = resolve_network_selection(&["all".to_string()]).unwrap();
        assert_eq!(resolved.len(), KNOWN_NETWORKS.len());
    }

    #[test]
    fn auto_expands_to_mainnets() {
        let resolved = resolve_network_selection(&["auto".to_string()]).unwrap();
        assert_eq!(resolved, vec!["bloxberg_mainnet".to_string(), "polygon_mainnet".to_string()]);
    }

    #[test]
    fn legacy_names_map_to_variants() {
        let resolved =
            resolve_network_selection(&["bloxberg".to_string(), "testnet".to_string()]).unwrap();
        assert_eq!(resolved, vec!["bloxberg_mainnet".to_string(), "bloxberg_testnet".to_string()]);
    }

    #[test]
    fn unknown_name_errors() {
        let err = resolve_network_selection(&["not-a-network".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownNetwork(..)));
    }

    #[test]
    fn degenerate_block_time_clamps_to_zero() {
        let cfg = NetworkConfig {
            name: "test".into(),
            rpc_url: "http://localhost".into(),
            chain_id: 1,
            block_time_secs: 1,
            contracts: ContractAddresses {
                dp_request: String::new(),
                do_request: String::new(),
                order: String::new(),
                heartbeat: String::new(),
                token: String::new(),
            },
            fee_model: FeeModel { network_fee_pct: 5, enclave_fee_pct: 10, reward_type: RewardType::Net },
            eip1559: false,
            gas: GasParams { gas_limit: 1, gas_price_value: 1, gas_price_measure: 1, fee_ceiling_wei: 1 },
            network_type: NetworkType::Testnet,
            integration_test_image: String::new(),
            trustedzone_images: vec![],
            rpc_delay_ms: 0,
        };
        assert_eq!(cfg.dispatch_scan_sleep(), Duration::ZERO);
    }
}
