//! Typed domain model over the tuples the chain client returns.
//!
//! Reth's RPC layer turns raw tuple-shaped contract returns into named
//! structs with enum-typed status (see `crates/rpc/rpc/src/eth/api`);
//! this crate does the same for the DP/DO/Order tuples of spec.md §3.

mod error;
mod metadata;
mod order;
mod request;

pub use error::DomainError;
pub use metadata::Metadata;
pub use order::{Order, OrderStatus};
pub use request::{DoRequest, DpRequest, RequestStatus};

/// 128-bit opaque identity generated once per host and persisted at
/// `CachePaths::operator_uuid_file()`; tags every DP request the node
/// creates so it can recognize its own requests after a restart or
/// migration.
pub type OperatorUuid = uuid::Uuid;
