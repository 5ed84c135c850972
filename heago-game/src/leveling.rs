//! Level thresholds and XP progress.
use crate::constants::{LEVEL_BASE_XP, LEVEL_XP_STEP};
use crate::numbers::u64_to_f64;
use crate::state::Player;

/// XP required to advance from `level` to `level + 1`.
///
/// Levels below 1 are treated as level 1 so the threshold is always positive.
#[must_use]
pub const fn xp_to_next_level(level: u32) -> u64 {
    let steps = level.saturating_sub(1) as u64;
    LEVEL_BASE_XP + steps * LEVEL_XP_STEP
}

/// Fraction of the current level already earned, clamped to `[0, 1]`.
#[must_use]
pub fn xp_progress(player: &Player) -> f64 {
    let needed = xp_to_next_level(player.level);
    (u64_to_f64(player.xp) / u64_to_f64(needed)).clamp(0.0, 1.0)
}
