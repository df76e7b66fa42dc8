use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Order state machine: `Open -> Processing -> Closed`, with `Cancelled`
/// reachable from `Open` (spec.md §3 "Order" row). Once `Closed` the
/// order is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderStatus {
    Open = 0,
    Processing = 1,
    Closed = 2,
    Cancelled = 3,
}

impl TryFrom<u8> for OrderStatus {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(OrderStatus::Open),
            1 => Ok(OrderStatus::Processing),
            2 => Ok(OrderStatus::Closed),
            3 => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::UnknownOrderStatus(other)),
        }
    }
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Closed | OrderStatus::Cancelled)
    }
}

/// On-chain binding between one DP and one DO (spec.md §3 "Order" row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub owner: String,
    pub operator: String,
    pub do_req_id: u64,
    pub dp_req_id: u64,
    pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_and_cancelled_are_terminal() {
        assert!(OrderStatus::Closed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Open.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
    }

    #[test]
    fn status_roundtrips_from_chain_tuple_index() {
        for (raw, expected) in [
            (0u8, OrderStatus::Open),
            (1, OrderStatus::Processing),
            (2, OrderStatus::Closed),
            (3, OrderStatus::Cancelled),
        ] {
            assert_eq!(OrderStatus::try_from(raw).unwrap(), expected);
        }
        assert!(OrderStatus::try_from(4).is_err());
    }
}
