/// Errors surfaced while walking the discovery pipeline (spec.md §4.4).
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("failed to fetch dp request {dp_id}: {message}")]
    FetchDpRequest { dp_id: u64, message: String },

    #[error("failed to fetch order {order_id}: {message}")]
    FetchOrder { order_id: u64, message: String },

    #[error("booked dp {dp_id} has no associated order in orders_cache")]
    MissingOrderForBookedDp { dp_id: u64 },

    #[error("order lifecycle for order {order_id} failed: {message}")]
    OrderLifecycle { order_id: u64, message: String },

    #[error("dispatch for dp {dp_id} failed: {message}")]
    Dispatch { dp_id: u64, message: String },

    #[error("failed to cache dp {dp_id}: {message}")]
    Cache { dp_id: u64, message: String },
}
