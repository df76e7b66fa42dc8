use std::collections::HashMap;

use clap::{CommandFactory, Parser};

use crate::cli::EtnyArgs;
use crate::error::ConfigError;
use crate::network::{NetworkConfig, RewardType};

/// `NetworkConfig` fields that may be overridden per-network from the
/// CLI (spec.md §6: "Per-network override flags generated from each
/// `NetworkConfig` field, name pattern `--<network>-<field>`").
pub const OVERRIDABLE_FIELDS: &[&str] = &[
    "rpc-url",
    "chain-id",
    "block-time",
    "network-fee",
    "enclave-fee",
    "reward-type",
    "eip1559",
    "gas-limit",
    "gas-price-value",
    "gas-price-measure",
    "fee-ceiling",
    "rpc-delay-ms",
];

/// Builds the full `clap::Command`, the fixed surface from
/// [`EtnyArgs`] plus one generated `--<network>-<field>` flag per
/// `(known network, overridable field)` pair.
pub fn build_command(known_networks: &[&str]) -> clap::Command {
    let mut cmd = EtnyArgs::command();
    for network in known_networks {
        for field in OVERRIDABLE_FIELDS {
            let id = format!("{network}-{field}");
            cmd = cmd.arg(
                clap::Arg::new(id.clone())
                    .long(id)
                    .value_name(field.to_uppercase())
                    .help(format!("override `{field}` for network `{network}`")),
            );
        }
    }
    cmd
}

/// `overrides[network][field] = value` for every override flag the
/// operator actually passed.
pub fn parse_overrides(
    matches: &clap::ArgMatches,
    known_networks: &[&str],
) -> HashMap<String, HashMap<String, String>> {
    let mut overrides: HashMap<String, HashMap<String, String>> = HashMap::new();
    for network in known_networks {
        for field in OVERRIDABLE_FIELDS {
            let id = format!("{network}-{field}");
            if let Some(value) = matches.get_one::<String>(&id) {
                overrides.entry(network.to_string()).or_default().insert(field.to_string(), value.clone());
            }
        }
    }
    overrides
}

fn parse_field<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        field,
        value: value.to_string(),
        reason: "could not parse".to_string(),
    })
}

fn parse_bool_field(field: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue { field, value: value.to_string(), reason: "must be a boolean".to_string() }),
    }
}

/// Applies one `--<network>-<field>` (or `<NET>_<VARIANT>_<FIELD>` env)
/// override onto an already-built [`NetworkConfig`] (spec.md §6, §9
/// "Per-attribute file-path constants" sibling: here, per-attribute
/// override dispatch rather than monkey-patched reassignment of a
/// shared config object).
pub fn apply_override(config: &mut NetworkConfig, field: &str, value: &str) -> Result<(), ConfigError> {
    match field {
        "rpc-url" => config.rpc_url = value.to_string(),
        "chain-id" => config.chain_id = parse_field("chain-id", value)?,
        "block-time" => config.block_time_secs = parse_field("block-time", value)?,
        "network-fee" => config.fee_model.network_fee_pct = parse_field("network-fee", value)?,
        "enclave-fee" => config.fee_model.enclave_fee_pct = parse_field("enclave-fee", value)?,
        "reward-type" => config.fee_model.reward_type = RewardType::try_from(parse_field::<u8>("reward-type", value)?)?,
        "eip1559" => config.eip1559 = parse_bool_field("eip1559", value)?,
        "gas-limit" => config.gas.gas_limit = parse_field("gas-limit", value)?,
        "gas-price-value" => config.gas.gas_price_value = parse_field("gas-price-value", value)?,
        "gas-price-measure" => config.gas.gas_price_measure = parse_field("gas-price-measure", value)?,
        "fee-ceiling" => config.gas.fee_ceiling_wei = parse_field("fee-ceiling", value)?,
        "rpc-delay-ms" => config.rpc_delay_ms = parse_field("rpc-delay-ms", value)?,
        other => {
            return Err(ConfigError::InvalidValue {
                field: "override",
                value: other.to_string(),
                reason: "not one of OVERRIDABLE_FIELDS".to_string(),
            })
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_one_flag_per_network_and_field() {
        let cmd = build_command(&["polygon_mainnet"]);
        let has_flag = cmd.get_arguments().any(|a| a.get_id() == "polygon_mainnet-rpc-url");
        assert!(has_flag);
    }

    #[test]
    fn parses_override_values_per_network() {
        let cmd = build_command(&["polygon_mainnet"]);
        let matches = cmd
            .try_get_matches_from(vec![
                "etny-node",
                "--privatekey",
                "0xabc",
                "--polygon_mainnet-rpc-url",
                "https://example.invalid",
            ])
            .unwrap();
        let overrides = parse_overrides(&matches, &["polygon_mainnet"]);
        assert_eq!(
            overrides.get("polygon_mainnet").and_then(|m| m.get("rpc-url")).map(String::as_str),
            Some("https://example.invalid")
        );
    }

    fn sample_config() -> NetworkConfig {
        use crate::network::{ContractAddresses, FeeModel, GasParams, NetworkType};
        NetworkConfig {
            name: "polygon_mainnet".into(),
            rpc_url: "https://polygon-rpc.com".into(),
            chain_id: 137,
            block_time_secs: 2,
            contracts: ContractAddresses {
                dp_request: String::new(),
                do_request: String::new(),
                order: String::new(),
                heartbeat: String::new(),
                token: String::new(),
            },
            fee_model: FeeModel { network_fee_pct: 5, enclave_fee_pct: 10, reward_type: RewardType::Net },
            eip1559: true,
            gas: GasParams { gas_limit: 3_000_000, gas_price_value: 30, gas_price_measure: 1_000_000_000, fee_ceiling_wei: 1 },
            network_type: NetworkType::Mainnet,
            integration_test_image: String::new(),
            trustedzone_images: vec![],
            rpc_delay_ms: 250,
        }
    }

    #[test]
    fn apply_override_updates_the_named_field_only() {
        let mut config = sample_config();
        apply_override(&mut config, "rpc-url", "https://override.invalid").unwrap();
        assert_eq!(config.rpc_url, "https://override.invalid");
        assert_eq!(config.chain_id, 137, "unrelated fields must not change");
    }

    #[test]
    fn apply_override_parses_numeric_and_enum_fields() {
        let mut config = sample_config();
        apply_override(&mut config, "chain-id", "80002").unwrap();
        assert_eq!(config.chain_id, 80002);
        apply_override(&mut config, "reward-type", "2").unwrap();
        assert_eq!(config.fee_model.reward_type, RewardType::GrossedUp);
    }

    #[test]
    fn apply_override_rejects_an_unknown_field() {
        let mut config = sample_config();
        assert!(apply_override(&mut config, "not-a-field", "x").is_err());
    }

    #[test]
    fn apply_override_rejects_an_unparseable_value() {
        let mut config = sample_config();
        assert!(apply_override(&mut config, "chain-id", "not-a-number").is_err());
    }
}
