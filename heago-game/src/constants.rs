//! Centralized balance and tuning constants for Heago progress rules.
//!
//! These values define the deterministic math for the progress engine.
//! Keeping them together ensures that rewards can only be adjusted via
//! code changes reviewed in version control, rather than through external
//! configuration.

// Persistence --------------------------------------------------------------
pub const DEFAULT_STORAGE_KEY: &str = "heago-habits-save-v1";
pub(crate) const SAVE_DIR_ENV_VAR: &str = "HEAGO_SAVE_DIR";
pub(crate) const DEFAULT_SAVE_DIR: &str = ".heago";
pub(crate) const DEFAULT_RESET_CHECK_SECS: u64 = 60;
pub(crate) const MAX_RESET_CHECK_SECS: u64 = 24 * 60 * 60;

// Player bounds ------------------------------------------------------------
pub(crate) const STARTING_LEVEL: u32 = 1;
pub(crate) const STARTING_HP: u32 = 50;
pub(crate) const HP_MAX: u32 = 999;
/// Level-ups applied while normalizing a loaded player before the xp is capped.
pub(crate) const MIGRATION_MAX_LEVEL_UPS: u32 = 10_000;

// Leveling -----------------------------------------------------------------
pub(crate) const LEVEL_BASE_XP: u64 = 100;
pub(crate) const LEVEL_XP_STEP: u64 = 30;
pub(crate) const LEVEL_UP_HEAL: u32 = 10;
pub(crate) const LEVEL_UP_HP_CAP_BASE: u32 = 50;
pub(crate) const LEVEL_UP_HP_CAP_PER_LEVEL: u32 = 5;
pub(crate) const LEVEL_UP_GOLD: u64 = 5;

// Habits -------------------------------------------------------------------
pub(crate) const HABIT_VALUE_MIN: i32 = -10;
pub(crate) const HABIT_VALUE_MAX: i32 = 10;
pub(crate) const HABIT_BASE_XP: u64 = 10;
pub(crate) const HABIT_XP_MOMENTUM_PIVOT: i32 = 5;
pub(crate) const HABIT_BASE_GOLD: u64 = 3;
pub(crate) const HABIT_GOLD_MOMENTUM_PIVOT: i32 = 3;
pub(crate) const HABIT_BASE_DAMAGE: u32 = 6;

// Dailies ------------------------------------------------------------------
pub(crate) const DAILY_XP: u64 = 15;
pub(crate) const DAILY_GOLD: u64 = 5;
pub(crate) const DAILY_UNDO_DAMAGE: u32 = 2;

// Todos --------------------------------------------------------------------
pub(crate) const TODO_XP: u64 = 20;
pub(crate) const TODO_GOLD: u64 = 8;
pub(crate) const TODO_UNDO_DAMAGE: u32 = 2;

// Rewards ------------------------------------------------------------------
pub(crate) const REWARD_PURCHASE_XP: u64 = 5;
pub(crate) const REWARD_MIN_COST: u64 = 1;

// Analytics ----------------------------------------------------------------
pub(crate) const CONSISTENCY_WINDOW_DAYS: u32 = 30;
pub(crate) const STREAK_SCAN_DAYS: u32 = 30;
pub(crate) const LEADERBOARD_SIZE: usize = 3;
