/// Errors surfaced by the chain client (spec.md §7 "RPC transient" /
/// "RPC logical revert" / "Fee too high"). Callers pattern-match on the
/// variant rather than string-sniffing an exception message (spec.md §9
/// "Exception-for-control-flow sites ... map to result values with a
/// typed error variant").
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Network/timeout/5xx-class failure. Retried with fixed backoff by
    /// [`crate::retry::retry`].
    #[error("transient RPC error: {0}")]
    Transient(String),

    /// `ContractLogicError`/revert. Never retried by the generic retry
    /// loop; the call site classifies it (spec.md §4.6 "Place": a revert
    /// on `placeOrder` means the DO was taken by a peer).
    #[error("contract logic reverted: {0}")]
    LogicRevert(String),

    /// Computed `maxFeePerGas` exceeds the configured ceiling (spec.md
    /// §4.3 "Fee policy").
    #[error("computed maxFeePerGas {computed} exceeds ceiling {ceiling}")]
    FeeTooHigh { computed: u128, ceiling: u128 },

    /// ABI decode failure on an event or return value.
    #[error("failed to decode {what}: {source}")]
    Decode { what: &'static str, source: ethers_core::abi::Error },

    /// Retry budget exhausted without success.
    #[error("exceeded retry budget of {attempts} attempts; last error: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl ChainError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainError::Transient(_))
    }
}
