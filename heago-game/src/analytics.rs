//! Read-only analytics and calendar views over completion histories.
//!
//! All calendar math happens in the time zone of the supplied `now`, so the
//! same history renders identically for a given local day.
use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::constants::{CONSISTENCY_WINDOW_DAYS, LEADERBOARD_SIZE, STREAK_SCAN_DAYS};
use crate::numbers::{percent, ratio, round_one_decimal, u64_to_f64, usize_to_f64};
use crate::state::{Daily, Habit, SaveState};

/// Heatmap bucket for a day's completion count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    None,
    Light,
    Moderate,
    Strong,
    Intense,
}

impl ActivityLevel {
    #[must_use]
    pub const fn from_count(count: usize) -> Self {
        match count {
            0 => Self::None,
            1..=2 => Self::Light,
            3..=4 => Self::Moderate,
            5..=6 => Self::Strong,
            _ => Self::Intense,
        }
    }

    /// Bucket index, 0 through 4.
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionSource {
    Habit,
    Daily,
}

/// One completion, for listing a selected calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionEntry {
    pub title: String,
    pub source: CompletionSource,
    pub at: DateTime<Utc>,
}

fn all_timestamps<'a>(
    habits: &'a [Habit],
    dailies: &'a [Daily],
) -> impl Iterator<Item = &'a DateTime<Utc>> + 'a {
    habits
        .iter()
        .flat_map(|habit| habit.completion_history.iter())
        .chain(dailies.iter().flat_map(|daily| daily.completion_history.iter()))
}

fn local_date<Tz: TimeZone>(stamp: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    stamp.with_timezone(tz).date_naive()
}

/// Completions across habits and dailies on `date` in zone `tz`.
#[must_use]
pub fn completions_on<Tz: TimeZone>(
    habits: &[Habit],
    dailies: &[Daily],
    date: NaiveDate,
    tz: &Tz,
) -> usize {
    all_timestamps(habits, dailies)
        .filter(|stamp| local_date(stamp, tz) == date)
        .count()
}

/// Every completion on `date`, habits first, in history order.
#[must_use]
pub fn completions_for_date<Tz: TimeZone>(
    state: &SaveState,
    date: NaiveDate,
    tz: &Tz,
) -> Vec<CompletionEntry> {
    let habits = state.habits.iter().flat_map(|habit| {
        habit
            .completion_history
            .iter()
            .map(move |at| (habit.title.as_str(), CompletionSource::Habit, at))
    });
    let dailies = state.dailies.iter().flat_map(|daily| {
        daily
            .completion_history
            .iter()
            .map(move |at| (daily.title.as_str(), CompletionSource::Daily, at))
    });
    habits
        .chain(dailies)
        .filter(|(_, _, at)| local_date(at, tz) == date)
        .map(|(title, source, at)| CompletionEntry {
            title: title.to_string(),
            source,
            at: *at,
        })
        .collect()
}

/// Sunday of the local week containing `now`.
#[must_use]
pub fn week_start<Tz: TimeZone>(now: &DateTime<Tz>) -> NaiveDate {
    let today = now.date_naive();
    let offset = u64::from(today.weekday().num_days_from_sunday());
    today.checked_sub_days(Days::new(offset)).unwrap_or(today)
}

/// Completions since the start of the current local week (Sunday).
#[must_use]
pub fn weekly_completions<Tz: TimeZone>(
    habits: &[Habit],
    dailies: &[Daily],
    now: &DateTime<Tz>,
) -> usize {
    let start = week_start(now);
    let tz = now.timezone();
    all_timestamps(habits, dailies)
        .filter(|stamp| local_date(stamp, &tz) >= start)
        .count()
}

/// Share of the trailing 30 local days (today included) with any completion.
#[must_use]
pub fn consistency_rate<Tz: TimeZone>(
    habits: &[Habit],
    dailies: &[Daily],
    now: &DateTime<Tz>,
) -> f64 {
    let today = now.date_naive();
    let earliest = today
        .checked_sub_days(Days::new(u64::from(CONSISTENCY_WINDOW_DAYS - 1)))
        .unwrap_or(NaiveDate::MIN);
    let tz = now.timezone();
    let active: BTreeSet<NaiveDate> = all_timestamps(habits, dailies)
        .map(|stamp| local_date(stamp, &tz))
        .filter(|date| (earliest..=today).contains(date))
        .collect();
    ratio(
        active.len(),
        usize::try_from(CONSISTENCY_WINDOW_DAYS).unwrap_or(usize::MAX),
    )
}

/// Consecutive local days ending today with at least one completion,
/// scanning back at most 30 days.
#[must_use]
pub fn current_streak<Tz: TimeZone>(
    habits: &[Habit],
    dailies: &[Daily],
    now: &DateTime<Tz>,
) -> u32 {
    let tz = now.timezone();
    let active: BTreeSet<NaiveDate> = all_timestamps(habits, dailies)
        .map(|stamp| local_date(stamp, &tz))
        .collect();
    let mut day = now.date_naive();
    let mut streak = 0;
    while streak < STREAK_SCAN_DAYS && active.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}

/// Headline numbers for the progress panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub habit_completions: usize,
    pub daily_completions: usize,
    /// Mean current streak across dailies, one decimal.
    pub average_daily_streak: f64,
    pub best_daily_streak: u32,
    pub longest_current_streak: u32,
    pub weekly_completions: usize,
    pub consistency_percent: u32,
    pub activity_streak: u32,
}

impl ProgressSummary {
    #[must_use]
    pub fn compute<Tz: TimeZone>(state: &SaveState, now: &DateTime<Tz>) -> Self {
        let habit_completions = state
            .habits
            .iter()
            .map(|habit| habit.completion_history.len())
            .sum();
        let daily_completions = state
            .dailies
            .iter()
            .map(|daily| daily.completion_history.len())
            .sum();
        let average_daily_streak = if state.dailies.is_empty() {
            0.0
        } else {
            let total: u64 = state.dailies.iter().map(|daily| u64::from(daily.streak)).sum();
            round_one_decimal(u64_to_f64(total) / usize_to_f64(state.dailies.len()))
        };
        Self {
            habit_completions,
            daily_completions,
            average_daily_streak,
            best_daily_streak: state
                .dailies
                .iter()
                .map(|daily| daily.best_streak)
                .max()
                .unwrap_or(0),
            longest_current_streak: state
                .dailies
                .iter()
                .map(|daily| daily.streak)
                .max()
                .unwrap_or(0),
            weekly_completions: weekly_completions(&state.habits, &state.dailies, now),
            consistency_percent: percent(consistency_rate(&state.habits, &state.dailies, now)),
            activity_streak: current_streak(&state.habits, &state.dailies, now),
        }
    }
}

/// Top dailies by current streak, highest first; ties keep list order.
#[must_use]
pub fn streak_leaderboard(dailies: &[Daily]) -> Vec<&Daily> {
    let mut ranked: Vec<&Daily> = dailies.iter().collect();
    ranked.sort_by(|a, b| b.streak.cmp(&a.streak));
    ranked.truncate(LEADERBOARD_SIZE);
    ranked
}

/// Today's progress toward a habit's daily goal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalProgress {
    pub completed_today: usize,
    pub goal: u32,
    /// Capped at 100.
    pub percent: f64,
}

impl GoalProgress {
    #[must_use]
    pub fn is_met(&self) -> bool {
        self.completed_today >= usize::try_from(self.goal).unwrap_or(usize::MAX)
    }
}

/// `None` for habits without a goal.
#[must_use]
pub fn goal_progress<Tz: TimeZone>(habit: &Habit, now: &DateTime<Tz>) -> Option<GoalProgress> {
    let goal = habit.goal.filter(|goal| *goal > 0)?;
    let today = now.date_naive();
    let tz = now.timezone();
    let completed_today = habit
        .completion_history
        .iter()
        .filter(|stamp| local_date(stamp, &tz) == today)
        .count();
    let goal_count = usize::try_from(goal).unwrap_or(usize::MAX);
    let percent = (ratio(completed_today, goal_count) * 100.0).min(100.0);
    Some(GoalProgress {
        completed_today,
        goal,
        percent,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub day: u32,
    pub completions: usize,
    pub level: ActivityLevel,
    pub is_today: bool,
}

/// A month of heatmap cells laid out from Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCalendar {
    pub year: i32,
    pub month: u32,
    /// Empty cells before the 1st (Sunday = 0).
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

impl MonthCalendar {
    /// Build the grid for `year`/`month`; `None` for an invalid month.
    #[must_use]
    pub fn build<Tz: TimeZone>(
        state: &SaveState,
        year: i32,
        month: u32,
        now: &DateTime<Tz>,
    ) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next_first = if month == 12 {
            NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let tz = now.timezone();
        let today = now.date_naive();
        let days = first
            .iter_days()
            .take_while(|date| *date < next_first)
            .map(|date| {
                let completions = completions_on(&state.habits, &state.dailies, date, &tz);
                CalendarDay {
                    day: date.day(),
                    completions,
                    level: ActivityLevel::from_count(completions),
                    is_today: date == today,
                }
            })
            .collect();
        Some(Self {
            year,
            month,
            leading_blanks: first.weekday().num_days_from_sunday(),
            days,
        })
    }

    /// Calendar for the month containing `now`.
    #[must_use]
    pub fn current<Tz: TimeZone>(state: &SaveState, now: &DateTime<Tz>) -> Option<Self> {
        let today = now.date_naive();
        Self::build(state, today.year(), today.month(), now)
    }
}
