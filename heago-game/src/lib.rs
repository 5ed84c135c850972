//! Heago Progress Engine
//!
//! Platform-agnostic core of the Heago habit tracker: the gamification rules,
//! the daily reset cycle, snapshot persistence and read-only analytics.
//! This crate has no UI or network dependencies.

pub mod analytics;
pub mod challenges;
pub mod config;
pub mod constants;
pub mod leveling;
pub mod migration;
pub mod numbers;
pub mod progress;
pub mod reset;
pub mod session;
pub mod state;
pub mod storage;

use anyhow::Context;
use chrono::{DateTime, Local, TimeDelta, TimeZone};
use std::cell::RefCell;
use std::rc::Rc;

// Re-export commonly used types
pub use analytics::{
    ActivityLevel, CalendarDay, CompletionEntry, CompletionSource, GoalProgress, MonthCalendar,
    ProgressSummary, completions_for_date, completions_on, consistency_rate, current_streak,
    goal_progress, streak_leaderboard, week_start, weekly_completions,
};
pub use challenges::{
    CatalogError, Challenge, ChallengeCatalog, ChallengeFilter, ChallengeId, ChallengeStats,
    InMemoryCatalog, JoinOutcome, NewChallenge, join_challenge,
};
pub use config::{ConfigError, TrackerConfig};
pub use constants::DEFAULT_STORAGE_KEY;
pub use leveling::{xp_progress, xp_to_next_level};
pub use migration::{MigrationReport, SchemaVersion, detect_schema, migrate_value};
pub use progress::{
    Action, ActionOutcome, add_daily, add_habit, add_reward, add_todo, apply_action, buy_reward,
    grant_gold, grant_xp, remove, take_damage, tap_habit, toggle_daily, toggle_todo,
};
pub use reset::{ResetOutcome, ResetSchedule, needs_daily_reset, run_daily_reset};
pub use session::TrackerSession;
pub use state::{
    Collection, Daily, DailyTemplate, Direction, EntityId, Habit, HabitKind, HabitTemplate,
    Player, Reward, RewardTemplate, SaveState, Todo, TodoTemplate,
};
pub use storage::{
    FileStorage, LoadOrigin, LoadedState, MemoryStorage, StorageError, load_state, save_state,
};

/// Trait for abstracting the local key-value store holding save snapshots.
/// Platform-specific implementations should provide this
pub trait SaveStorage {
    type Error: std::error::Error + From<serde_json::Error> + Send + Sync + 'static;

    /// Read the raw snapshot stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Replace the snapshot under `key`. A later `read` sees either the old
    /// or the new text, never a mix.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    fn write(&self, key: &str, json: &str) -> Result<(), Self::Error>;

    /// Delete the snapshot under `key`; deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be removed.
    fn delete(&self, key: &str) -> Result<(), Self::Error>;
}

/// Source of the current time. Calendar-day decisions use the clock's zone.
pub trait Clock {
    type Tz: TimeZone;

    fn now(&self) -> DateTime<Self::Tz>;
}

/// Wall clock in the machine's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Manually driven clock. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock<Tz: TimeZone> {
    now: Rc<RefCell<DateTime<Tz>>>,
}

impl<Tz: TimeZone> FixedClock<Tz> {
    #[must_use]
    pub fn new(now: DateTime<Tz>) -> Self {
        Self {
            now: Rc::new(RefCell::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Tz>) {
        *self.now.borrow_mut() = now;
    }

    pub fn advance(&self, by: TimeDelta) {
        let next = self.now.borrow().clone() + by;
        self.set(next);
    }
}

impl<Tz: TimeZone> Clock for FixedClock<Tz> {
    type Tz = Tz;

    fn now(&self) -> DateTime<Tz> {
        self.now.borrow().clone()
    }
}

/// Entry point binding a save store to a challenge catalog.
pub struct TrackerEngine<S, K>
where
    S: SaveStorage,
    K: ChallengeCatalog,
{
    storage: S,
    catalog: K,
}

impl<S, K> TrackerEngine<S, K>
where
    S: SaveStorage,
    K: ChallengeCatalog,
{
    /// Create a new engine with the provided storage and catalog
    pub const fn new(storage: S, catalog: K) -> Self {
        Self { storage, catalog }
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub const fn catalog(&self) -> &K {
        &self.catalog
    }

    /// Open a session over the configured save record.
    pub fn open_session<C: Clock>(&self, clock: C, config: &TrackerConfig) -> TrackerSession<S, C>
    where
        S: Clone,
    {
        TrackerSession::open(self.storage.clone(), clock, config)
    }

    /// List catalog challenges.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be reached.
    pub fn browse(&self, filter: &ChallengeFilter) -> Result<Vec<Challenge>, CatalogError> {
        self.catalog.list(filter)
    }

    /// Fetch `challenge_id` from the catalog and join it in `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog fails or does not know the challenge;
    /// the session state is untouched in that case.
    pub fn join_from_catalog<C: Clock>(
        &self,
        session: &mut TrackerSession<S, C>,
        challenge_id: &str,
    ) -> Result<JoinOutcome, anyhow::Error> {
        let challenge = self
            .catalog
            .get(challenge_id)
            .with_context(|| format!("loading challenge {challenge_id}"))?
            .with_context(|| format!("unknown challenge {challenge_id}"))?;
        Ok(session.join_challenge(&challenge))
    }

    /// Strict read of a stored snapshot, for export and inspection tooling.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read, parsed or migrated.
    pub fn export_snapshot(&self, key: &str) -> Result<Option<SaveState>, anyhow::Error> {
        let Some(raw) = self.storage.read(key)? else {
            return Ok(None);
        };
        let value: serde_json::Value =
            serde_json::from_str(&raw).with_context(|| format!("parsing save {key}"))?;
        let report = migrate_value(value).with_context(|| format!("save {key} is not an object"))?;
        Ok(Some(report.state))
    }

    /// Remove the stored snapshot; the next session starts from the seeded state.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be deleted.
    pub fn reset_save(&self, key: &str) -> Result<(), S::Error> {
        self.storage.delete(key)
    }
}
