//! Typed chain operations for `etny-node`, built over `etny_chain::ChainClient`
//! and the ABI helpers in [`crate::contracts`]. This is the seam where the
//! domain model (spec.md §4.4) meets the wire (spec.md §4.3): every method
//! here does exactly one `call`/`send`+`wait`+`decode_events` round trip,
//! named after the contract function it wraps.

use std::time::Duration;

use ethers_core::types::{transaction::eip2718::TypedTransaction, Address, Bytes, TransactionRequest, U256};

use etny_chain::{ChainClient, ChainError, EthersTransport};
use etny_config::NetworkConfig;
use etny_domain::{DoRequest, DpRequest, Metadata, Order};

use crate::contracts;

fn view_tx(to: Address, data: Bytes) -> TypedTransaction {
    TypedTransaction::Legacy(TransactionRequest::new().to(to).data(data))
}

fn parse_address(raw: &str) -> Result<Address, ChainError> {
    raw.parse().map_err(|_| ChainError::Decode { what: "contract address", source: ethers_core::abi::Error::InvalidData })
}

/// Thin named wrapper over [`ChainClient`] exposing one method per
/// contract function the worker needs (spec.md §4.3/§4.4/§4.6/§4.8).
/// Owned by exactly one worker, matching the client's per-worker
/// ownership (spec.md §3 "Ownership in design terms").
pub struct ChainOps {
    client: ChainClient<EthersTransport>,
    network: NetworkConfig,
}

impl ChainOps {
    pub fn new(client: ChainClient<EthersTransport>, network: NetworkConfig) -> Self {
        Self { client, network }
    }

    pub fn address(&self) -> Address {
        self.client.address()
    }

    pub fn address_string(&self) -> String {
        format!("{:#x}", self.client.address())
    }

    pub async fn block_number(&self) -> Result<u64, ChainError> {
        self.client.block_number().await
    }

    pub async fn balance(&self) -> Result<U256, ChainError> {
        self.client.balance(self.address()).await
    }

    pub async fn get_dp_request(&self, dp_id: u64) -> Result<DpRequest, ChainError> {
        let to = parse_address(&self.network.contracts.dp_request)?;
        let data = contracts::get_dp_request_call(dp_id);
        let out = self.client.call(view_tx(to, data)).await?;
        contracts::decode_dp_request(&out)
    }

    pub async fn get_dp_requests_by_operator(&self) -> Result<Vec<u64>, ChainError> {
        let to = parse_address(&self.network.contracts.dp_request)?;
        let data = contracts::get_dp_requests_by_operator_call(self.address());
        let out = self.client.call(view_tx(to, data)).await?;
        contracts::decode_dp_request_ids(&out)
    }

    /// `createDpRequest(...)` (spec.md §4.4 "Register"): returns the new
    /// DP id decoded from `DPRequestCreated`.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_dp_request(
        &self,
        cpu: u64,
        memory: u64,
        storage: u64,
        bandwidth: u64,
        duration: u64,
        price: u64,
        uuid: &str,
        version: &str,
        geo: &str,
    ) -> Result<u64, ChainError> {
        let to = parse_address(&self.network.contracts.dp_request)?;
        let data = contracts::create_dp_request_call(cpu, memory, storage, bandwidth, duration, price, uuid, version, geo);
        let tx_hash = self.client.send(to, data, U256::zero()).await?;
        let receipt = self.client.wait(tx_hash, 30, Duration::from_secs(5)).await?;
        contracts::decode_dp_request_created(&receipt)
    }

    pub async fn get_do_request(&self, do_id: u64) -> Result<(DoRequest, Metadata), ChainError> {
        let to = parse_address(&self.network.contracts.do_request)?;
        let data = contracts::get_do_request_call(do_id);
        let out = self.client.call(view_tx(to, data)).await?;
        contracts::decode_do_request_with_metadata(&out)
    }

    pub async fn get_do_requests_count(&self) -> Result<u64, ChainError> {
        let to = parse_address(&self.network.contracts.do_request)?;
        let data = contracts::get_do_requests_count_call();
        let out = self.client.call(view_tx(to, data)).await?;
        contracts::decode_count(&out)
    }

    pub async fn get_order(&self, order_id: u64) -> Result<Order, ChainError> {
        let to = parse_address(&self.network.contracts.order)?;
        let data = contracts::get_order_call(order_id);
        let out = self.client.call(view_tx(to, data)).await?;
        contracts::decode_order(&out)
    }

    /// `placeOrder(do, dp)` (spec.md §4.6 "Place"). A revert is surfaced
    /// as [`ChainError::LogicRevert`] for the caller to classify as "taken
    /// by another operator" (spec.md §7 "RPC logical revert").
    pub async fn place_order(&self, do_id: u64, dp_id: u64) -> Result<Option<u64>, ChainError> {
        let to = parse_address(&self.network.contracts.order)?;
        let data = contracts::place_order_call(do_id, dp_id);
        let tx_hash = match self.client.send(to, data, U256::zero()).await {
            Ok(hash) => hash,
            Err(ChainError::LogicRevert(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        let receipt = self.client.wait(tx_hash, 30, Duration::from_secs(5)).await?;
        match contracts::decode_place_order_event(&receipt) {
            Ok(order_id) => Ok(Some(order_id)),
            Err(_) => Ok(None),
        }
    }

    pub async fn add_result_to_order(&self, order_id: u64, result: &str) -> Result<(), ChainError> {
        let to = parse_address(&self.network.contracts.order)?;
        let data = contracts::add_result_to_order_call(order_id, result);
        let tx_hash = self.client.send(to, data, U256::zero()).await?;
        self.client.wait(tx_hash, 30, Duration::from_secs(5)).await?;
        Ok(())
    }

    /// `logCall()` — the heartbeat write (spec.md glossary "Heartbeat").
    pub async fn log_call(&self) -> Result<(), ChainError> {
        let to = parse_address(&self.network.contracts.heartbeat)?;
        let data = contracts::log_call_call();
        let tx_hash = self.client.send(to, data, U256::zero()).await?;
        self.client.wait(tx_hash, 30, Duration::from_secs(5)).await?;
        Ok(())
    }

    /// `getOperatorsCount()`, feeding the dispersion factor's `N`
    /// (spec.md §4.5 "Dispersion").
    pub async fn get_operators_count(&self) -> Result<u64, ChainError> {
        let to = parse_address(&self.network.contracts.heartbeat)?;
        let data = contracts::get_operators_count_call();
        let out = self.client.call(view_tx(to, data)).await?;
        contracts::decode_count(&out)
    }
}
