use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// `status` of a DP or DO request (spec.md §3 "Request" row). Transitions
/// monotonically `Available -> Booked -> (observed via order closure)`;
/// `Canceled` is terminal for DP requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RequestStatus {
    Available = 0,
    Booked = 1,
    Canceled = 2,
}

impl TryFrom<u8> for RequestStatus {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RequestStatus::Available),
            1 => Ok(RequestStatus::Booked),
            2 => Ok(RequestStatus::Canceled),
            other => Err(DomainError::UnknownRequestStatus(other)),
        }
    }
}

/// A DP (data-processor) request: the operator's own advertisement of
/// spare capacity. Immutable after creation except `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DpRequest {
    pub id: u64,
    pub operator: String,
    pub cpu: u64,
    pub memory: u64,
    pub storage: u64,
    pub bandwidth: u64,
    pub duration: u64,
    pub price: u64,
    pub status: RequestStatus,
    pub uuid: String,
    pub version: String,
    pub geo: String,
}

/// A DO (data-owner) request: a client's task advertisement. Owned by the
/// client; the node only observes it, never mutates it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoRequest {
    pub id: u64,
    pub owner: String,
    pub cpu: u64,
    pub memory: u64,
    pub storage: u64,
    pub bandwidth: u64,
    pub duration: u64,
    pub price: u64,
    pub status: RequestStatus,
}

impl DoRequest {
    /// The resource filter of spec.md §4.5: a DO is only eligible against
    /// a DP if the DP can cover it and the DO's price meets the DP's ask.
    pub fn fits(&self, dp: &DpRequest) -> bool {
        self.cpu <= dp.cpu
            && self.memory <= dp.memory
            && self.storage <= dp.storage
            && self.bandwidth <= dp.bandwidth
            && self.price >= dp.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;

    fn dp(cpu: u64, memory: u64, storage: u64, bandwidth: u64, price: u64) -> DpRequest {
        DpRequest {
            id: 1,
            operator: "0xop".into(),
            cpu,
            memory,
            storage,
            bandwidth,
            duration: 3600,
            price,
            status: RequestStatus::Available,
            uuid: "uuid".into(),
            version: "1".into(),
            geo: "".into(),
        }
    }

    fn do_req(cpu: u64, memory: u64, storage: u64, bandwidth: u64, price: u64) -> DoRequest {
        DoRequest {
            id: 1,
            owner: "0xowner".into(),
            cpu,
            memory,
            storage,
            bandwidth,
            duration: 3600,
            price,
            status: RequestStatus::Available,
        }
    }

    #[test]
    fn fits_requires_dp_to_cover_every_resource_and_price_to_meet_ask() {
        let dp = dp(8, 16, 100, 100, 3);
        assert!(do_req(4, 8, 50, 50, 5).fits(&dp));
        assert!(!do_req(16, 8, 50, 50, 5).fits(&dp), "cpu exceeds dp.cpu");
        assert!(!do_req(4, 8, 50, 50, 2).fits(&dp), "price below dp ask");
    }

    #[test]
    fn status_roundtrips_from_chain_tuple_index() {
        assert_eq!(RequestStatus::try_from(0).unwrap(), RequestStatus::Available);
        assert_eq!(RequestStatus::try_from(1).unwrap(), RequestStatus::Booked);
        assert_eq!(RequestStatus::try_from(2).unwrap(), RequestStatus::Canceled);
        assert!(RequestStatus::try_from(3).is_err());
    }

    #[test]
    fn pinned_metadata_slot_is_unused_here_but_parses_via_metadata() {
        let m = Metadata::parse([
            "1".into(),
            "v3:cid-image:name:cid-compose:cid-challenge:pubkey".into(),
            "sha256:abc".into(),
            "sha256:def".into(),
            "".into(),
        ])
        .unwrap();
        assert!(m.pinned_operator.is_none());
    }
}
