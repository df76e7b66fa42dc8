#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("unrecognized request status {0}")]
    UnknownRequestStatus(u8),

    #[error("unrecognized order status {0}")]
    UnknownOrderStatus(u8),

    #[error("malformed metadata spec string {0:?}: {1}")]
    MalformedSpec(String, &'static str),

    #[error("malformed content hash {0:?}: expected `kind:cid`")]
    MalformedContentHash(String),
}
