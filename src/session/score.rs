/// Runs that are free before each extra run costs points.
pub const FREE_RUNS: u32 = 3;
pub const MISTAKE_PENALTY: u32 = 5;
pub const EXTRA_RUN_PENALTY: u32 = 2;

/// `max(0, 100 - 5 * mistakes - 2 * max(0, runs - 3))`
pub fn compute_score(mistakes: u32, runs: u32) -> u32 {
    let penalty = mistakes
        .saturating_mul(MISTAKE_PENALTY)
        .saturating_add(runs.saturating_sub(FREE_RUNS).saturating_mul(EXTRA_RUN_PENALTY));
    100u32.saturating_sub(penalty)
}
