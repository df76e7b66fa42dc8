//! Thin JSON-RPC chain client for `etny-node`.
//!
//! `call`/`send`/`wait`/`decode_events`, nonce management, EIP-1559 vs
//! legacy fee selection, and bounded-retry semantics against a
//! Byzantine RPC. See `SPEC_FULL.md` §4.3.

mod client;
mod error;
mod fee;
mod retry;
mod transport;

pub use client::{BlockSnapshot, ChainClient};
pub use error::ChainError;
pub use fee::{eip1559_fee, legacy_fee, GasPrice};
pub use retry::{retry, RetryPolicy};
pub use transport::{EthersTransport, JsonRpcTransport};
