/// The dispersion factor `D` (spec.md §4.5 "Dispersion factor"):
/// production networks scale the number of slots with the registered
/// operator count, testnets pin it to 1 so every operator is always
/// eligible (spec.md §8 "Boundary behaviors").
pub fn dispersion_factor(operator_count: u64, is_testnet: bool) -> u64 {
    if is_testnet {
        1
    } else {
        std::cmp::max(1, operator_count / 25)
    }
}

/// Per-`do`-id state: whether this worker has ever reached this DO's
/// slot (`offset_mod == do_mod`) since it started tracking the DO.
/// Lazily starts `true` (spec.md §4.5 "'First cycle' is per-`do`-id
/// state in the worker, lazily initialized to true").
#[derive(Debug, Clone, Copy, Default)]
pub struct DoSlotState {
    first_cycle: bool,
}

impl DoSlotState {
    pub fn new() -> Self {
        Self { first_cycle: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotDecision {
    /// This block, the node is eligible to place an order for this DO.
    PlaceNow,
    /// Not eligible; try again after this many blocks.
    WaitBlocks(u64),
}

/// The scheduling rule of spec.md §4.5, evaluated fresh from the
/// current block each call — idempotent regardless of how many blocks
/// were skipped between calls (see spec.md §8 scenario S1, where the
/// wait count recomputed at B=1000 and again at B=1001 both resolve to
/// the same target block).
pub fn evaluate_slot(d: u64, block: u64, dp_id: u64, do_id: u64, state: &mut DoSlotState) -> SlotDecision {
    let d = d.max(1);
    let offset_mod = (block + dp_id) % d;
    let do_mod = do_id % d;

    if offset_mod == do_mod {
        state.first_cycle = false;
        return SlotDecision::PlaceNow;
    }
    if offset_mod < do_mod {
        return SlotDecision::WaitBlocks(do_mod - offset_mod);
    }
    // offset_mod > do_mod.
    if state.first_cycle {
        // Open Question #1 (spec.md §9): normalize explicitly with
        // `rem_euclid` rather than relying on `%`, whose sign for a
        // negative left-hand side is implementation-defined in most
        // languages but always non-negative here.
        let diff = do_mod as i64 - offset_mod as i64;
        SlotDecision::WaitBlocks(diff.rem_euclid(d as i64) as u64)
    } else {
        // Lost the race earlier this cycle; keep trying every block.
        SlotDecision::PlaceNow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispersion_factor_boundary_behaviors() {
        assert_eq!(dispersion_factor(0, false), 1);
        assert_eq!(dispersion_factor(24, false), 1);
        assert_eq!(dispersion_factor(100, false), 4);
        assert_eq!(dispersion_factor(1_000_000, true), 1, "testnets always pin D=1");
    }

    /// spec.md §8 scenario S1.
    #[test]
    fn s1_dispersion_slot_walk() {
        let d = dispersion_factor(100, false);
        assert_eq!(d, 4);
        let mut state = DoSlotState::new();

        let decision = evaluate_slot(d, 1000, 7, 42, &mut state);
        assert_eq!(decision, SlotDecision::WaitBlocks(3));

        let decision = evaluate_slot(d, 1001, 7, 42, &mut state);
        assert_eq!(decision, SlotDecision::WaitBlocks(2));

        let decision = evaluate_slot(d, 1003, 7, 42, &mut state);
        assert_eq!(decision, SlotDecision::PlaceNow);
    }

    #[test]
    fn d_equals_one_is_always_eligible() {
        let mut state = DoSlotState::new();
        for block in 0..5 {
            assert_eq!(evaluate_slot(1, block, 9, 123, &mut state), SlotDecision::PlaceNow);
        }
    }

    #[test]
    fn after_first_slot_hit_a_later_miss_places_immediately() {
        let mut state = DoSlotState::new();
        // Hit the slot once: flips first_cycle false.
        assert_eq!(evaluate_slot(4, 2, 0, 2, &mut state), SlotDecision::PlaceNow);
        // Next block: offset_mod=3 > do_mod=2, no longer first cycle -> place now (keep trying).
        assert_eq!(evaluate_slot(4, 3, 0, 2, &mut state), SlotDecision::PlaceNow);
    }

    #[test]
    fn first_cycle_miss_waits_into_next_cycle_without_skipping() {
        // DO discovered mid-cycle, already past its slot for this period.
        let mut state = DoSlotState::new();
        // D=4, do_mod=1, offset_mod=3 (>1), first cycle -> wait (1-3) mod 4 = 2.
        assert_eq!(evaluate_slot(4, 3, 0, 1, &mut state), SlotDecision::WaitBlocks(2));
    }
}
