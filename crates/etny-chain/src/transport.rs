use async_trait::async_trait;
use ethers_core::types::{transaction::eip2718::TypedTransaction, Address, Bytes, TransactionReceipt, TxHash, U256};
use ethers_providers::{Http, Middleware, Provider, ProviderError};

use crate::error::ChainError;

/// The raw JSON-RPC surface the chain client needs, as a trait object
/// seam (spec.md/SPEC_FULL §2 "[AMBIENT] Test tooling" —
/// `JsonRpcTransport`): tests substitute an in-memory fake instead of
/// hitting a real node.
#[async_trait]
pub trait JsonRpcTransport: Send + Sync {
    async fn block_number(&self) -> Result<u64, ChainError>;
    async fn get_transaction_count(&self, address: Address) -> Result<u64, ChainError>;
    async fn get_balance(&self, address: Address) -> Result<U256, ChainError>;
    async fn get_base_fee(&self) -> Result<U256, ChainError>;
    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, ChainError>;
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash, ChainError>;
    async fn get_transaction_receipt(&self, tx: TxHash) -> Result<Option<TransactionReceipt>, ChainError>;
}

/// Default transport: `ethers_providers::Provider<Http>`.
pub struct EthersTransport {
    provider: Provider<Http>,
}

impl EthersTransport {
    pub fn new(provider: Provider<Http>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl JsonRpcTransport for EthersTransport {
    async fn block_number(&self) -> Result<u64, ChainError> {
        self.provider.get_block_number().await.map(|n| n.as_u64()).map_err(classify)
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64, ChainError> {
        self.provider
            .get_transaction_count(address, None)
            .await
            .map(|n| n.as_u64())
            .map_err(classify)
    }

    async fn get_balance(&self, address: Address) -> Result<U256, ChainError> {
        self.provider.get_balance(address, None).await.map_err(classify)
    }

    async fn get_base_fee(&self) -> Result<U256, ChainError> {
        let block = self
            .provider
            .get_block(ethers_core::types::BlockNumber::Latest)
            .await
            .map_err(classify)?
            .ok_or_else(|| ChainError::Transient("latest block unavailable".to_string()))?;
        block.base_fee_per_gas.ok_or_else(|| ChainError::Transient("node did not report a base fee".to_string()))
    }

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, ChainError> {
        self.provider.call(tx, None).await.map_err(classify)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash, ChainError> {
        self.provider
            .send_raw_transaction(raw)
            .await
            .map(|pending| pending.tx_hash())
            .map_err(classify)
    }

    async fn get_transaction_receipt(&self, tx: TxHash) -> Result<Option<TransactionReceipt>, ChainError> {
        self.provider.get_transaction_receipt(tx).await.map_err(classify)
    }
}

/// Classifies a provider error as a revert (never retried, propagated
/// for the call site to interpret) or a transient RPC failure (spec.md
/// §7 "RPC transient" vs "RPC logical revert").
fn classify(err: ProviderError) -> ChainError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("revert") || lower.contains("execution reverted") {
        ChainError::LogicRevert(message)
    } else {
        ChainError::Transient(message)
    }
}
