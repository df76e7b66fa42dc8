use etny_domain::{DoRequest, DpRequest, Metadata};

use crate::{dispersion::SlotDecision, tracker::DispersionTracker};

/// Outcome of evaluating one DO request against one DP request this
/// block (spec.md §4.5 "Pinned DOs" + "Resource filter" + dispersion).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Place an order for this DO now.
    Eligible,
    /// Pinned to a different operator; never revisit (cache in `doreq_cache`).
    SkipPermanently,
    /// Resources/price don't match this DP; try a different DP, or this
    /// DO again later if capacity changes.
    ResourceMismatch,
    /// Matches resources and isn't pinned away, but not this DO's slot
    /// this block. Try again in `n` blocks.
    Wait(u64),
}

/// Evaluates a single DO against a single DP under dispersion.
/// `operator_address` identifies this node for the pinning check.
pub fn evaluate_do(
    tracker: &mut DispersionTracker,
    d: u64,
    block: u64,
    dp: &DpRequest,
    do_req: &DoRequest,
    metadata: &Metadata,
    operator_address: &str,
) -> Eligibility {
    if let Some(pinned) = &metadata.pinned_operator {
        if !pinned.eq_ignore_ascii_case(operator_address) {
            return Eligibility::SkipPermanently;
        }
        // Pinned to this operator: dispersion does not apply (spec.md
        // §4.5 "If it is this operator's address, skip the dispersion check").
        return if do_req.fits(dp) { Eligibility::Eligible } else { Eligibility::ResourceMismatch };
    }

    if !do_req.fits(dp) {
        return Eligibility::ResourceMismatch;
    }

    match tracker.evaluate(d, block, dp.id, do_req.id) {
        SlotDecision::PlaceNow => Eligibility::Eligible,
        SlotDecision::WaitBlocks(n) => Eligibility::Wait(n),
    }
}

#[cfg(test)]
mod tests {
    use etny_domain::RequestStatus;

    use super::*;

    fn dp() -> DpRequest {
        DpRequest {
            id: 7,
            operator: "0xop".into(),
            cpu: 8,
            memory: 16,
            storage: 100,
            bandwidth: 100,
            duration: 3600,
            price: 3,
            status: RequestStatus::Available,
            uuid: "u".into(),
            version: "1".into(),
            geo: "".into(),
        }
    }

    fn do_req(id: u64) -> DoRequest {
        DoRequest {
            id,
            owner: "0xowner".into(),
            cpu: 4,
            memory: 8,
            storage: 50,
            bandwidth: 50,
            duration: 3600,
            price: 5,
            status: RequestStatus::Available,
        }
    }

    fn metadata(pinned: &str) -> Metadata {
        Metadata::parse([
            "1".into(),
            "v3:a:b:c:d:e".into(),
            "sha256:payload".into(),
            "".into(),
            pinned.into(),
        ])
        .unwrap()
    }

    #[test]
    fn pinned_to_another_operator_is_skipped_permanently() {
        let mut tracker = DispersionTracker::new();
        let outcome =
            evaluate_do(&mut tracker, 4, 1000, &dp(), &do_req(42), &metadata("0xSomeoneElse"), "0xop");
        assert_eq!(outcome, Eligibility::SkipPermanently);
    }

    #[test]
    fn pinned_to_self_bypasses_dispersion() {
        let mut tracker = DispersionTracker::new();
        // Block/dp/do chosen so dispersion would otherwise say "wait".
        let outcome = evaluate_do(&mut tracker, 4, 1000, &dp(), &do_req(42), &metadata("0xOp"), "0xop");
        assert_eq!(outcome, Eligibility::Eligible);
    }

    #[test]
    fn resource_mismatch_skips_regardless_of_slot() {
        let mut tracker = DispersionTracker::new();
        let mut too_big = do_req(42);
        too_big.cpu = 100;
        let outcome = evaluate_do(&mut tracker, 1, 1000, &dp(), &too_big, &metadata(""), "0xop");
        assert_eq!(outcome, Eligibility::ResourceMismatch);
    }

    #[test]
    fn unpinned_in_slot_match_is_eligible() {
        let mut tracker = DispersionTracker::new();
        let outcome = evaluate_do(&mut tracker, 1, 1000, &dp(), &do_req(42), &metadata(""), "0xop");
        assert_eq!(outcome, Eligibility::Eligible, "D=1 is always in-slot");
    }
}
