/// Whether logging `done` out of `total` should emit a progress line
/// (spec.md §4.4 "Progress is logged at 10%-granularity thresholds").
/// Pure so the exact crossing points are testable without a real scan.
pub fn crosses_progress_threshold(done: usize, total: usize) -> bool {
    if total == 0 || done == 0 {
        return false;
    }
    let prev_decile = ((done - 1) * 10) / total;
    let cur_decile = (done * 10) / total;
    cur_decile > prev_decile
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_at_each_ten_percent_step_of_a_clean_hundred() {
        let hits: Vec<usize> = (1..=100).filter(|&done| crosses_progress_threshold(done, 100)).collect();
        assert_eq!(hits, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
    }

    #[test]
    fn small_totals_still_fire_on_every_item() {
        assert!(crosses_progress_threshold(1, 3));
        assert!(crosses_progress_threshold(2, 3));
        assert!(crosses_progress_threshold(3, 3));
    }

    #[test]
    fn empty_scan_never_fires() {
        assert!(!crosses_progress_threshold(0, 0));
    }
}
