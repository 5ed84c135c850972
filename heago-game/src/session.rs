use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::mem;

use crate::analytics::{GoalProgress, MonthCalendar, ProgressSummary, goal_progress};
use crate::challenges::{Challenge, JoinOutcome, join_challenge};
use crate::config::TrackerConfig;
use crate::progress::{Action, ActionOutcome, apply_action};
use crate::reset::{ResetOutcome, ResetSchedule, run_daily_reset};
use crate::state::{
    Collection, DailyTemplate, Direction, HabitTemplate, RewardTemplate, SaveState, TodoTemplate,
};
use crate::storage::{FileStorage, LoadOrigin, load_state, save_state};
use crate::{Clock, SaveStorage, SystemClock};

/// High-level session owning the save state, its store and the clock.
///
/// Every applied mutation is persisted before the method returns. A failed
/// write leaves the in-memory state intact and marks the session dirty until
/// a later save or [`TrackerSession::flush`] succeeds.
pub struct TrackerSession<S: SaveStorage, C: Clock> {
    storage: S,
    clock: C,
    key: String,
    state: SaveState,
    origin: LoadOrigin,
    schedule: ResetSchedule,
    dirty: bool,
}

impl<S: SaveStorage, C: Clock> TrackerSession<S, C> {
    /// Load the configured snapshot, run the daily reset and persist the result.
    pub fn open(storage: S, clock: C, config: &TrackerConfig) -> Self {
        let now = clock.now();
        let loaded = load_state(&storage, &config.storage_key, now.with_timezone(&Utc));
        let mut session = Self {
            storage,
            clock,
            key: config.storage_key.clone(),
            state: loaded.state,
            origin: loaded.origin,
            schedule: ResetSchedule::every(config.reset_check_interval()),
            dirty: false,
        };
        session.schedule.poll(&mut session.state, &now);
        session.persist();
        session
    }

    fn persist(&mut self) {
        match save_state(&self.storage, &self.key, &self.state) {
            Ok(()) => self.dirty = false,
            Err(err) => {
                warn!("could not save {}: {err}", self.key);
                self.dirty = true;
            }
        }
    }

    fn commit(&mut self, outcome: ActionOutcome) -> ActionOutcome {
        if outcome.applied {
            self.persist();
        }
        outcome
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.clock.now().with_timezone(&Utc)
    }

    /// Write the current state, retrying any earlier failed save.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub fn flush(&mut self) -> Result<(), S::Error> {
        save_state(&self.storage, &self.key, &self.state)?;
        self.dirty = false;
        Ok(())
    }

    /// Whether the last save attempt failed.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Apply `action` and persist if it changed anything.
    ///
    /// Habit taps in a direction the habit's kind does not allow are ignored.
    pub fn apply(&mut self, action: &Action) -> ActionOutcome {
        if let Action::TapHabit { id, direction } = action
            && let Some(habit) = self.state.habit(id)
            && !habit.kind.allows(*direction)
        {
            debug!("{} habit {id} cannot be tapped {direction}", habit.kind);
            return ActionOutcome::noop();
        }
        let now = self.now_utc();
        let outcome = apply_action(&mut self.state, action, now);
        self.commit(outcome)
    }

    pub fn tap_habit(&mut self, id: &str, direction: Direction) -> ActionOutcome {
        self.apply(&Action::TapHabit {
            id: id.to_string(),
            direction,
        })
    }

    pub fn toggle_daily(&mut self, id: &str) -> ActionOutcome {
        self.apply(&Action::ToggleDaily { id: id.to_string() })
    }

    pub fn toggle_todo(&mut self, id: &str) -> ActionOutcome {
        self.apply(&Action::ToggleTodo { id: id.to_string() })
    }

    pub fn buy_reward(&mut self, id: &str) -> ActionOutcome {
        self.apply(&Action::BuyReward { id: id.to_string() })
    }

    pub fn add_habit(&mut self, template: HabitTemplate) -> ActionOutcome {
        self.apply(&Action::AddHabit(template))
    }

    pub fn add_daily(&mut self, template: DailyTemplate) -> ActionOutcome {
        self.apply(&Action::AddDaily(template))
    }

    pub fn add_todo(&mut self, template: TodoTemplate) -> ActionOutcome {
        self.apply(&Action::AddTodo(template))
    }

    pub fn add_reward(&mut self, template: RewardTemplate) -> ActionOutcome {
        self.apply(&Action::AddReward(template))
    }

    pub fn remove(&mut self, collection: Collection, id: &str) -> ActionOutcome {
        self.apply(&Action::Remove {
            collection,
            id: id.to_string(),
        })
    }

    /// Copy a challenge's items into the save.
    pub fn join_challenge(&mut self, challenge: &Challenge) -> JoinOutcome {
        let outcome = join_challenge(&mut self.state, challenge);
        if outcome.joined {
            self.persist();
        }
        outcome
    }

    /// Periodic re-check: runs the daily reset once the check interval elapsed.
    pub fn tick(&mut self) -> ResetOutcome {
        let now = self.clock.now();
        let outcome = self.schedule.poll(&mut self.state, &now);
        if outcome.reset {
            self.persist();
        }
        outcome
    }

    /// Run the daily reset check immediately, ignoring the interval.
    pub fn check_reset(&mut self) -> ResetOutcome {
        let now = self.clock.now();
        let outcome = run_daily_reset(&mut self.state, &now);
        if outcome.reset {
            self.persist();
        }
        outcome
    }

    #[must_use]
    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary::compute(&self.state, &self.clock.now())
    }

    #[must_use]
    pub fn calendar(&self) -> Option<MonthCalendar> {
        MonthCalendar::current(&self.state, &self.clock.now())
    }

    #[must_use]
    pub fn goal_progress(&self, habit_id: &str) -> Option<GoalProgress> {
        let habit = self.state.habit(habit_id)?;
        goal_progress(habit, &self.clock.now())
    }

    /// Borrow the underlying immutable save state.
    #[must_use]
    pub const fn state(&self) -> &SaveState {
        &self.state
    }

    /// How the state was obtained when the session opened.
    #[must_use]
    pub const fn origin(&self) -> LoadOrigin {
        self.origin
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Consume the session, returning the underlying save state.
    ///
    /// # Errors
    ///
    /// Returns an error if the final save fails; the state is still dropped.
    pub fn into_state(mut self) -> Result<SaveState, S::Error> {
        self.flush()?;
        let placeholder = SaveState::empty(self.state.last_reset);
        Ok(mem::replace(&mut self.state, placeholder))
    }
}

impl TrackerSession<FileStorage, SystemClock> {
    /// Open the on-disk save under `config.save_dir` on the local wall clock.
    ///
    /// ```no_run
    /// use heago_game::{Direction, TrackerConfig, TrackerSession};
    ///
    /// let config = TrackerConfig::load(None)?;
    /// let mut session = TrackerSession::open_local(&config);
    /// if let Some(id) = session.state().habits.first().map(|habit| habit.id.clone()) {
    ///     session.tap_habit(&id, Direction::Up);
    /// }
    /// session.flush()?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[must_use]
    pub fn open_local(config: &TrackerConfig) -> Self {
        Self::open(FileStorage::new(config.save_dir.clone()), SystemClock, config)
    }
}

impl<S: SaveStorage, C: Clock> Drop for TrackerSession<S, C> {
    fn drop(&mut self) {
        if self.dirty
            && let Err(err) = self.flush()
        {
            warn!("dropping session with unsaved changes to {}: {err}", self.key);
        }
    }
}
