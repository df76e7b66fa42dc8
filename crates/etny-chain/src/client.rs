use std::time::Duration;

use ethers_core::{
    abi::{Event, Log as DecodedLog, RawLog},
    types::{transaction::eip2718::TypedTransaction, Address, Bytes, Eip1559TransactionRequest, TransactionReceipt, TransactionRequest, TxHash, U256},
};
use ethers_signers::{LocalWallet, Signer};

use etny_config::NetworkConfig;

use crate::{
    error::ChainError,
    fee::{self, GasPrice},
    retry::{retry, RetryPolicy},
    transport::JsonRpcTransport,
};

/// Snapshot returned by [`ChainClient::latest_block`]: the block number
/// plus the base fee needed for EIP-1559 fee computation, fetched in
/// one round trip (spec.md §4.3 "`latest_block() -> receipt`-like view").
#[derive(Debug, Clone, Copy)]
pub struct BlockSnapshot {
    pub number: u64,
    pub base_fee_per_gas: Option<U256>,
}

/// Thin JSON-RPC wrapper (spec.md §4.3): `call`, `send`, `wait`,
/// `decode_events`, nonce management, fee selection, bounded retry.
/// Every operation is preceded by a per-network pacing sleep
/// (`rpc_delay_ms`) enforced here, not by the transport (spec.md §4.3
/// "Inter-call pacing").
pub struct ChainClient<T: JsonRpcTransport> {
    transport: T,
    wallet: LocalWallet,
    network: NetworkConfig,
}

impl<T: JsonRpcTransport> ChainClient<T> {
    pub fn new(transport: T, wallet: LocalWallet, network: NetworkConfig) -> Self {
        let wallet = wallet.with_chain_id(network.chain_id);
        Self { transport, wallet, network }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn pace(&self) {
        tokio::time::sleep(self.network.rpc_delay()).await;
    }

    pub async fn block_number(&self) -> Result<u64, ChainError> {
        self.pace().await;
        self.transport.block_number().await
    }

    pub async fn latest_block(&self) -> Result<BlockSnapshot, ChainError> {
        self.pace().await;
        let number = self.transport.block_number().await?;
        let base_fee_per_gas = if self.network.eip1559 {
            Some(self.transport.get_base_fee().await?)
        } else {
            None
        };
        Ok(BlockSnapshot { number, base_fee_per_gas })
    }

    pub async fn nonce(&self, address: Address) -> Result<u64, ChainError> {
        self.pace().await;
        self.transport.get_transaction_count(address).await
    }

    pub async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        self.pace().await;
        self.transport.get_balance(address).await
    }

    pub async fn call(&self, tx: TypedTransaction) -> Result<Bytes, ChainError> {
        self.pace().await;
        self.transport.call(&tx).await
    }

    /// Selects the gas price for this attempt: EIP-1559 when the network
    /// is configured for it, legacy otherwise (spec.md §4.3 "Fee policy").
    async fn gas_price(&self) -> Result<GasPrice, ChainError> {
        if self.network.eip1559 {
            self.pace().await;
            let base_fee = self.transport.get_base_fee().await?;
            // Priority fee is taken from the same configured value used
            // by legacy mode; networks distinguish the two via `eip1559`.
            let priority = U256::from(self.network.gas.gas_price_value);
            fee::eip1559_fee(base_fee, priority, self.network.gas.fee_ceiling_wei)
        } else {
            Ok(fee::legacy_fee(self.network.gas.gas_price_value, self.network.gas.gas_price_measure))
        }
    }

    /// `send(tx, opts) -> receipt` per spec.md §4.3: builds, signs and
    /// submits the transaction, re-reading the nonce and fee before each
    /// retry attempt (up to 20 attempts, 5s fixed delay; a logical revert
    /// short-circuits, spec.md §4.3 "Retry policy").
    pub async fn send(&self, to: Address, data: Bytes, value: U256) -> Result<TxHash, ChainError> {
        let policy = RetryPolicy::FixedDelay { attempts: 20, delay: Duration::from_secs(5) };
        retry(policy, || async {
            let nonce = self.nonce(self.address()).await?;
            let gas_price = self.gas_price().await?;
            let tx = self.build_transaction(to, data.clone(), value, nonce, gas_price);
            let signature = self
                .wallet
                .sign_transaction(&tx)
                .await
                .map_err(|err| ChainError::Transient(err.to_string()))?;
            let raw = tx.rlp_signed(&signature);
            self.pace().await;
            self.transport.send_raw_transaction(raw).await
        })
        .await
    }

    fn build_transaction(
        &self,
        to: Address,
        data: Bytes,
        value: U256,
        nonce: u64,
        gas_price: GasPrice,
    ) -> TypedTransaction {
        match gas_price {
            GasPrice::Eip1559 { max_fee_per_gas, max_priority_fee_per_gas } => {
                TypedTransaction::Eip1559(
                    Eip1559TransactionRequest::new()
                        .to(to)
                        .data(data)
                        .value(value)
                        .nonce(nonce)
                        .gas(self.network.gas.gas_limit)
                        .max_fee_per_gas(max_fee_per_gas)
                        .max_priority_fee_per_gas(max_priority_fee_per_gas)
                        .chain_id(self.network.chain_id),
                )
            }
            GasPrice::Legacy { gas_price } => TypedTransaction::Legacy(
                TransactionRequest::new()
                    .to(to)
                    .data(data)
                    .value(value)
                    .nonce(nonce)
                    .gas(self.network.gas.gas_limit)
                    .gas_price(gas_price)
                    .chain_id(self.network.chain_id),
            ),
        }
    }

    /// Polls `getTransactionReceipt` every `poll_delay` up to `attempts`
    /// times (spec.md §4.3 `wait(tx_hash) -> receipt`).
    pub async fn wait(
        &self,
        tx_hash: TxHash,
        attempts: u32,
        poll_delay: Duration,
    ) -> Result<TransactionReceipt, ChainError> {
        for attempt in 0..attempts.max(1) {
            self.pace().await;
            if let Some(receipt) = self.transport.get_transaction_receipt(tx_hash).await? {
                return Ok(receipt);
            }
            if attempt + 1 < attempts {
                tokio::time::sleep(poll_delay).await;
            }
        }
        Err(ChainError::Transient(format!("receipt for {tx_hash:?} not found after {attempts} polls")))
    }

    /// Decodes every log in `receipt` matching `event`'s signature
    /// (spec.md §4.3 `decode_events(receipt, event_name) -> [decoded]`).
    pub fn decode_events(receipt: &TransactionReceipt, event: &Event) -> Result<Vec<DecodedLog>, ChainError> {
        receipt
            .logs
            .iter()
            .filter(|log| log.topics.first() == Some(&event.signature()))
            .map(|log| {
                let raw = RawLog { topics: log.topics.clone(), data: log.data.to_vec() };
                event.parse_log(raw).map_err(|source| ChainError::Decode { what: "event log", source })
            })
            .collect()
    }
}
