//! `etny-node`: the decentralized compute-provider agent (spec.md §1/§2).
//!
//! Parses the CLI surface, resolves the selected network set, wires one
//! `EtnyWorker` per network over the process-wide supervisor state, and
//! runs the cooperative-restart loop (spec.md §4.8) forever.

mod caches;
mod chain_ops;
mod contracts;
mod enclave;
mod host_probe;
mod networks;
mod worker;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, FromArgMatches};
use ethers_providers::{Http, Provider};
use ethers_signers::LocalWallet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use etny_chain::{ChainClient, EthersTransport};
use etny_config::{
    apply_override, network_env_override, resolve_network_selection, CachePaths, EnvOverrides, EtnyArgs,
    NetworkConfig, KNOWN_NETWORKS, OVERRIDABLE_FIELDS,
};
use etny_content_store::{
    ContentStoreClient, DaemonController, GlobalVersionCache, HttpDaemonTransport, HttpGatewayTransport,
    SystemctlController,
};
use etny_supervisor::{IntegrationTestGate, Supervisor, TaskMutex, Worker};

use crate::{
    chain_ops::ChainOps,
    enclave::BucketClient,
    host_probe::HostCapacity,
    worker::{EtnyWorker, WorkerDeps},
};

/// Every network's worker pool is torn down and rebuilt on this cadence
/// (spec.md §4.8 "Cooperative restart").
const COOPERATIVE_RESTART_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Root of the per-network `cache/<network_name>/` layout (spec.md §6
/// "Persisted state layout"). Not operator-configurable in the original
/// CLI surface, so it is a fixed relative path rather than a flag.
const CACHE_ROOT: &str = "cache";

/// Default Kubo-shaped daemon endpoint, used when neither `--ipfslocal`
/// nor `CLIENT_CONNECT_URL` is set.
const DEFAULT_DAEMON_ENDPOINT: &str = "http://localhost:5001";

/// Where a daemon upgrade (spec.md §4.2 "Version-change protocol")
/// installs the new binary.
const DAEMON_INSTALL_PATH: &str = "/usr/local/bin/ipfs";

fn init_tracing(log_level: Option<&str>) {
    let filter = log_level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Loads `~/opt/etny/node/UUID`, generating and persisting a fresh
/// 128-bit identity on first boot (spec.md §3 "Operator UUID").
fn load_or_create_operator_uuid() -> eyre::Result<Uuid> {
    let path = CachePaths::operator_uuid_file();
    if let Ok(existing) = std::fs::read_to_string(&path) {
        if let Ok(uuid) = existing.trim().parse::<Uuid>() {
            return Ok(uuid);
        }
        tracing::warn!(target: "supervisor", path = %path.display(), "operator uuid file unreadable, generating a fresh identity");
    }
    let uuid = Uuid::new_v4();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, uuid.to_string())?;
    Ok(uuid)
}

/// Resolves `--cpu/--memory/--storage/--bandwidth/--duration` against
/// the host probe (spec.md §6 "CLI surface": "default: probe host").
fn resolve_host_capacity(args: &EtnyArgs) -> HostCapacity {
    let probed = host_probe::probe_host();
    HostCapacity {
        cpu: args.cpu.map(u64::from).unwrap_or(probed.cpu),
        memory: args.memory.unwrap_or(probed.memory),
        storage: args.storage.unwrap_or(probed.storage),
        bandwidth: args.bandwidth.unwrap_or(probed.bandwidth),
        duration: args.duration.unwrap_or(probed.duration),
    }
}

/// Builds one network's fully-resolved [`NetworkConfig`]: built-in
/// defaults, then `<NET>_<VARIANT>_<FIELD>` env overrides, then
/// `--<network>-<field>` CLI overrides (spec.md §6) — CLI wins since
/// it's the most specific knob an operator can reach for.
fn build_network_config(
    name: &str,
    cli_overrides: &HashMap<String, HashMap<String, String>>,
    env: &EnvOverrides,
) -> eyre::Result<NetworkConfig> {
    let mut config = networks::default_network_config(name);

    for field in OVERRIDABLE_FIELDS {
        if let Some(value) = network_env_override(name, field) {
            apply_override(&mut config, field, &value)?;
        }
    }
    if let Some(gas_limit) = env.gas_limit {
        config.gas.gas_limit = gas_limit;
    }
    if let Some(gas_price_value) = env.gas_price_value {
        config.gas.gas_price_value = gas_price_value;
    }
    if let Some(frequency_ms) = env.contract_call_frequency {
        config.rpc_delay_ms = frequency_ms;
    }
    if let Some(fields) = cli_overrides.get(name) {
        for (field, value) in fields {
            apply_override(&mut config, field, value)?;
        }
    }
    Ok(config)
}

#[allow(clippy::too_many_arguments)]
async fn build_worker(
    name: &str,
    args: &EtnyArgs,
    cli_overrides: &HashMap<String, HashMap<String, String>>,
    env: &EnvOverrides,
    daemon_endpoint: &str,
    gateway_url: Option<&str>,
    global_version: &GlobalVersionCache,
    task_mutex: Arc<TaskMutex>,
    integration_gate: Arc<IntegrationTestGate>,
    operator_uuid: Uuid,
    capacity: HostCapacity,
) -> eyre::Result<Arc<dyn Worker>> {
    let network = build_network_config(name, cli_overrides, env)?;
    let paths = CachePaths::new(CACHE_ROOT, name);
    std::fs::create_dir_all(paths.network_dir())?;

    let wallet: LocalWallet = args.privatekey.parse()?;
    let provider = Provider::<Http>::try_from(network.rpc_url.as_str())?;
    let chain_client = ChainClient::new(EthersTransport::new(provider), wallet, network.clone());
    let chain = ChainOps::new(chain_client, network.clone());

    let daemon = HttpDaemonTransport::new(daemon_endpoint.to_string());
    let is_loopback = daemon_endpoint.contains("localhost") || daemon_endpoint.contains("127.0.0.1");
    let controller: Option<Arc<dyn DaemonController>> =
        if is_loopback { Some(Arc::new(SystemctlController::new("ipfs"))) } else { None };
    let content_dir = paths.network_dir().join("content");
    std::fs::create_dir_all(&content_dir)?;
    let content = ContentStoreClient::new(
        daemon,
        gateway_url.map(HttpGatewayTransport::new),
        controller,
        content_dir,
        paths.ipfs_cache(),
    );
    if let Some(bootstrap) = &env.client_bootstrap_url {
        content.peer_with_bootstrap(bootstrap).await;
    }

    let bucket = BucketClient::connect(&args.endpoint, &args.access_key, &args.secret_key).await;

    let deps = WorkerDeps {
        network,
        chain,
        content,
        bucket,
        global_version: global_version.clone(),
        task_mutex,
        integration_gate,
        paths,
        operator_uuid,
        capacity,
        price: args.price.round() as u64,
        daemon_endpoint: daemon_endpoint.to_string(),
        daemon_install_path: PathBuf::from(DAEMON_INSTALL_PATH),
    };
    Ok(Arc::new(EtnyWorker::new(deps)) as Arc<dyn Worker>)
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let env = EnvOverrides::from_env();
    init_tracing(env.log_level.as_deref());

    let command = etny_config::build_command(KNOWN_NETWORKS);
    let matches = command.get_matches();
    let args = EtnyArgs::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    let cli_overrides = etny_config::parse_overrides(&matches, KNOWN_NETWORKS);

    let selected = resolve_network_selection(&args.network)?;
    tracing::info!(target: "supervisor", networks = ?selected, "resolved network selection");

    let operator_uuid = load_or_create_operator_uuid()?;
    tracing::info!(target: "supervisor", %operator_uuid, "loaded operator identity");
    let capacity = resolve_host_capacity(&args);
    tracing::info!(
        target: "discovery",
        cpu = capacity.cpu,
        memory = capacity.memory,
        storage = capacity.storage,
        bandwidth = capacity.bandwidth,
        "advertised host capacity"
    );

    let daemon_endpoint = args.ipfslocal.clone().unwrap_or_else(|| DEFAULT_DAEMON_ENDPOINT.to_string());
    let gateway_url = args.ipfshost.clone();
    // `ipfs_version.txt` lives one level above every `cache/<network>/`
    // directory (spec.md §6 "Persisted state layout"); the network name
    // passed here is never consulted for this particular path.
    let global_version = GlobalVersionCache::load(CachePaths::new(CACHE_ROOT, "_shared").ipfs_version_file());

    if env.skip_integration_test {
        tracing::info!(target: "supervisor", "SKIP_INTEGRATION_TEST set, bypassing the sgx capability probe");
    }

    let supervisor = Supervisor::new(COOPERATIVE_RESTART_INTERVAL);

    supervisor
        .run(|| {
            let task_mutex = supervisor.task_mutex();
            let integration_gate = supervisor.integration_gate();
            if env.skip_integration_test {
                integration_gate.claim();
                integration_gate.record_result(true);
            }
            let selected = selected.clone();
            let args = args.clone();
            let cli_overrides = cli_overrides.clone();
            let env = env.clone();
            let daemon_endpoint = daemon_endpoint.clone();
            let gateway_url = gateway_url.clone();
            let global_version = global_version.clone();

            async move {
                let mut built = Vec::with_capacity(selected.len());
                for name in &selected {
                    match build_worker(
                        name,
                        &args,
                        &cli_overrides,
                        &env,
                        &daemon_endpoint,
                        gateway_url.as_deref(),
                        &global_version,
                        task_mutex.clone(),
                        integration_gate.clone(),
                        operator_uuid,
                        capacity,
                    )
                    .await
                    {
                        Ok(worker) => built.push(worker),
                        Err(err) => {
                            tracing::error!(target: "supervisor", network = %name, error = %err, "failed to build worker, skipping it this cycle");
                        }
                    }
                }
                built
            }
        })
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_capacity_falls_back_to_the_probe_when_unset() {
        let args = EtnyArgs::command().get_matches_from(vec!["etny-node", "--privatekey", "0xabc"]);
        let args = EtnyArgs::from_arg_matches(&args).unwrap();
        let capacity = resolve_host_capacity(&args);
        assert!(capacity.cpu >= 1);
    }

    #[test]
    fn cli_overrides_win_over_env_overrides() {
        let cli_overrides = {
            let mut map = HashMap::new();
            let mut fields = HashMap::new();
            fields.insert("rpc-url".to_string(), "https://cli.invalid".to_string());
            map.insert("polygon_mainnet".to_string(), fields);
            map
        };
        let env = EnvOverrides::default();
        let config = build_network_config("polygon_mainnet", &cli_overrides, &env).unwrap();
        assert_eq!(config.rpc_url, "https://cli.invalid");
    }
}
