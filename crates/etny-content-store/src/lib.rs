//! Content-addressed blob store: daemon-first, gateway-fallback download,
//! pinning, weekly GC, and the cross-worker daemon version-change protocol.

mod archive;
mod client;
mod controller;
mod daemon;
mod error;
mod gateway;
mod gc;
mod version;

pub use archive::{extract_directory, looks_like_tar};
pub use client::ContentStoreClient;
pub use controller::{DaemonController, SystemctlController};
pub use daemon::{DaemonTransport, HttpDaemonTransport};
pub use error::ContentStoreError;
pub use gateway::{GatewayKind, GatewayTransport, HttpGatewayTransport, looks_like_directory_listing};
pub use gc::{GC_MAX_AGE_SECS, GcPlan, plan_gc};
pub use version::{EndpointVersion, GlobalVersionCache, version_is_below};
