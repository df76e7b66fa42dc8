//! The block-aligned deterministic "dispersion" rule (spec.md §4.5):
//! at any given block, at most one operator among an eligible set tries
//! to place an order for a given DO request.

mod dispersion;
mod eligibility;
mod select;
mod tracker;

pub use dispersion::{dispersion_factor, evaluate_slot, DoSlotState, SlotDecision};
pub use eligibility::{evaluate_do, Eligibility};
pub use select::{select_match, DoCandidate, ScanOutcome};
pub use tracker::DispersionTracker;
