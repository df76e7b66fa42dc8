//! Built-in `NetworkConfig` defaults for the known network set.
//!
//! Concrete contract addresses and ABIs are out of scope (spec.md §1):
//! the placeholders here are meant to be overridden per deployment via
//! the generated `--<network>-<field>` flags or `<NET>_<VARIANT>_<FIELD>`
//! env vars (spec.md §6), the same way the teacher's `reth-node-core`
//! ships chain-spec defaults that operators override at the edges.

use etny_config::{ContractAddresses, FeeModel, GasParams, NetworkConfig, NetworkType, RewardType};

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

fn placeholder_contracts() -> ContractAddresses {
    ContractAddresses {
        dp_request: ZERO_ADDRESS.to_string(),
        do_request: ZERO_ADDRESS.to_string(),
        order: ZERO_ADDRESS.to_string(),
        heartbeat: ZERO_ADDRESS.to_string(),
        token: ZERO_ADDRESS.to_string(),
    }
}

fn default_fee_model() -> FeeModel {
    FeeModel { network_fee_pct: 5, enclave_fee_pct: 10, reward_type: RewardType::Net }
}

/// Returns the built-in defaults for one of `etny_config::KNOWN_NETWORKS`.
/// Panics on an unknown name; callers are expected to have already run
/// the name through `resolve_network_selection`.
pub fn default_network_config(name: &str) -> NetworkConfig {
    match name {
        "polygon_mainnet" => NetworkConfig {
            name: name.to_string(),
            rpc_url: "https://polygon-rpc.com".to_string(),
            chain_id: 137,
            block_time_secs: 2,
            contracts: placeholder_contracts(),
            fee_model: default_fee_model(),
            eip1559: true,
            gas: GasParams { gas_limit: 3_000_000, gas_price_value: 30, gas_price_measure: 1_000_000_000, fee_ceiling_wei: 500_000_000_000 },
            network_type: NetworkType::Mainnet,
            integration_test_image: "ethernitycloud/etny-integration-test:latest".to_string(),
            trustedzone_images: vec!["ethernitycloud/etny-pynithy:latest".to_string()],
            rpc_delay_ms: 250,
        },
        "polygon_testnet" => NetworkConfig {
            name: name.to_string(),
            rpc_url: "https://rpc-amoy.polygon.technology".to_string(),
            chain_id: 80002,
            block_time_secs: 2,
            contracts: placeholder_contracts(),
            fee_model: default_fee_model(),
            eip1559: true,
            gas: GasParams { gas_limit: 3_000_000, gas_price_value: 30, gas_price_measure: 1_000_000_000, fee_ceiling_wei: 500_000_000_000 },
            network_type: NetworkType::Testnet,
            integration_test_image: "ethernitycloud/etny-integration-test:latest".to_string(),
            trustedzone_images: vec!["ethernitycloud/etny-pynithy:latest".to_string()],
            rpc_delay_ms: 250,
        },
        "bloxberg_mainnet" => NetworkConfig {
            name: name.to_string(),
            rpc_url: "https://core.bloxberg.org".to_string(),
            chain_id: 8995,
            block_time_secs: 5,
            contracts: placeholder_contracts(),
            fee_model: default_fee_model(),
            eip1559: false,
            gas: GasParams { gas_limit: 3_000_000, gas_price_value: 1, gas_price_measure: 1_000_000_000, fee_ceiling_wei: 100_000_000_000 },
            network_type: NetworkType::Mainnet,
            integration_test_image: "ethernitycloud/etny-integration-test:latest".to_string(),
            trustedzone_images: vec!["ethernitycloud/etny-pynithy:latest".to_string()],
            rpc_delay_ms: 500,
        },
        "bloxberg_testnet" => NetworkConfig {
            name: name.to_string(),
            rpc_url: "https://rpc.bloxberg.org".to_string(),
            chain_id: 8996,
            block_time_secs: 5,
            contracts: placeholder_contracts(),
            fee_model: default_fee_model(),
            eip1559: false,
            gas: GasParams { gas_limit: 3_000_000, gas_price_value: 1, gas_price_measure: 1_000_000_000, fee_ceiling_wei: 100_000_000_000 },
            network_type: NetworkType::Testnet,
            integration_test_image: "ethernitycloud/etny-integration-test:latest".to_string(),
            trustedzone_images: vec!["ethernitycloud/etny-pynithy:latest".to_string()],
            rpc_delay_ms: 500,
        },
        other => panic!("no built-in defaults for network {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_network_has_a_default() {
        for name in etny_config::KNOWN_NETWORKS {
            let cfg = default_network_config(name);
            assert_eq!(&cfg.name, name);
        }
    }

    #[test]
    fn testnets_are_flagged_as_such() {
        assert!(default_network_config("polygon_testnet").network_type.is_testnet());
        assert!(default_network_config("bloxberg_testnet").network_type.is_testnet());
        assert!(!default_network_config("polygon_mainnet").network_type.is_testnet());
    }
}
