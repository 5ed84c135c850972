use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::constants::{
    HABIT_VALUE_MAX, HABIT_VALUE_MIN, REWARD_MIN_COST, STARTING_HP, STARTING_LEVEL,
};

/// Identifier shared by every entity collection.
pub type EntityId = String;

/// Fresh collision-resistant entity id.
#[must_use]
pub fn new_id() -> EntityId {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HabitKind {
    Good,
    Bad,
    #[default]
    Both,
}

impl HabitKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Bad => "bad",
            Self::Both => "both",
        }
    }

    /// Whether the calling surface may offer `direction` for this habit.
    #[must_use]
    pub const fn allows(self, direction: Direction) -> bool {
        match direction {
            Direction::Up => matches!(self, Self::Good | Self::Both),
            Direction::Down => matches!(self, Self::Bad | Self::Both),
        }
    }
}

impl fmt::Display for HabitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HabitKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(Self::Good),
            "bad" => Ok(Self::Bad),
            "both" => Ok(Self::Both),
            _ => Err(()),
        }
    }
}

/// Direction of a habit tap: `+` or `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Up => '+',
            Self::Down => '-',
        }
    }

    #[must_use]
    pub const fn delta(self) -> i32 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" | "up" => Ok(Self::Up),
            "-" | "down" => Ok(Self::Down),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Player {
    pub level: u32,
    pub xp: u64,
    pub hp: u32,
    pub gold: u64,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            level: STARTING_LEVEL,
            xp: 0,
            hp: STARTING_HP,
            gold: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: EntityId,
    pub title: String,
    pub kind: HabitKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Momentum counter in `[-10, 10]`; not a completion count.
    pub value: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<u32>,
    /// Positive taps only, append-only.
    #[serde(default)]
    pub completion_history: Vec<DateTime<Utc>>,
}

impl Habit {
    #[must_use]
    pub fn from_template(template: &HabitTemplate) -> Self {
        Self {
            id: new_id(),
            title: template.title.trim().to_string(),
            kind: template.kind,
            notes: clean_notes(template.notes.as_deref()),
            value: 0,
            goal: template.goal.filter(|goal| *goal > 0),
            completion_history: Vec::new(),
        }
    }

    pub(crate) fn shift_value(&mut self, delta: i32) {
        self.value = (self.value + delta).clamp(HABIT_VALUE_MIN, HABIT_VALUE_MAX);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Daily {
    pub id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub done: bool,
    pub streak: u32,
    /// Historical maximum of `streak`; never below it.
    #[serde(default)]
    pub best_streak: u32,
    #[serde(default)]
    pub completion_history: Vec<DateTime<Utc>>,
}

impl Daily {
    #[must_use]
    pub fn from_template(template: &DailyTemplate) -> Self {
        Self {
            id: new_id(),
            title: template.title.trim().to_string(),
            notes: clean_notes(template.notes.as_deref()),
            done: false,
            streak: 0,
            best_streak: 0,
            completion_history: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub done: bool,
}

impl Todo {
    #[must_use]
    pub fn from_template(template: &TodoTemplate) -> Self {
        Self {
            id: new_id(),
            title: template.title.trim().to_string(),
            notes: clean_notes(template.notes.as_deref()),
            done: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub id: EntityId,
    pub title: String,
    pub cost: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Reward {
    #[must_use]
    pub fn from_template(template: &RewardTemplate) -> Self {
        Self {
            id: new_id(),
            title: template.title.trim().to_string(),
            cost: template.cost.max(REWARD_MIN_COST),
            notes: clean_notes(template.notes.as_deref()),
        }
    }
}

/// Blueprint for a new habit, used by the add form and by challenges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitTemplate {
    pub title: String,
    #[serde(rename = "type", alias = "kind", default)]
    pub kind: HabitKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl HabitTemplate {
    #[must_use]
    pub fn new(title: impl Into<String>, kind: HabitKind) -> Self {
        Self {
            title: title.into(),
            kind,
            goal: None,
            notes: None,
        }
    }

    #[must_use]
    pub const fn with_goal(mut self, goal: u32) -> Self {
        self.goal = Some(goal);
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTemplate {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DailyTemplate {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoTemplate {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TodoTemplate {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTemplate {
    pub title: String,
    pub cost: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RewardTemplate {
    #[must_use]
    pub fn new(title: impl Into<String>, cost: u64) -> Self {
        Self {
            title: title.into(),
            cost,
            notes: None,
        }
    }
}

fn clean_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Entity collections addressable by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Habits,
    Dailies,
    Todos,
    Rewards,
}

impl Collection {
    pub const ALL: [Self; 4] = [Self::Habits, Self::Dailies, Self::Todos, Self::Rewards];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Habits => "habits",
            Self::Dailies => "dailies",
            Self::Todos => "todos",
            Self::Rewards => "rewards",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root aggregate persisted as a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveState {
    pub player: Player,
    pub habits: Vec<Habit>,
    pub dailies: Vec<Daily>,
    pub todos: Vec<Todo>,
    pub rewards: Vec<Reward>,
    #[serde(rename = "lastResetISO")]
    pub last_reset: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joined_challenges: Vec<String>,
}

impl SaveState {
    /// First-run state: two habits, two dailies, one todo and two rewards.
    #[must_use]
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let habits = vec![
            Habit::from_template(&HabitTemplate::new("Drink water", HabitKind::Good).with_goal(8)),
            Habit::from_template(&HabitTemplate::new("Mindless scrolling", HabitKind::Bad)),
        ];
        let dailies = vec![
            Daily::from_template(&DailyTemplate::new("10 min stretch")),
            Daily::from_template(&DailyTemplate::new("Read 5 pages")),
        ];
        let todos = vec![Todo::from_template(&TodoTemplate::new("Plan weekly meals"))];
        let rewards = vec![
            Reward::from_template(&RewardTemplate::new("Episode break", 10)),
            Reward::from_template(&RewardTemplate::new("Chocolate square", 5)),
        ];
        Self {
            player: Player::default(),
            habits,
            dailies,
            todos,
            rewards,
            last_reset: now,
            joined_challenges: Vec::new(),
        }
    }

    /// Empty aggregate with a default player.
    #[must_use]
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            player: Player::default(),
            habits: Vec::new(),
            dailies: Vec::new(),
            todos: Vec::new(),
            rewards: Vec::new(),
            last_reset: now,
            joined_challenges: Vec::new(),
        }
    }

    #[must_use]
    pub fn habit(&self, id: &str) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == id)
    }

    pub fn habit_mut(&mut self, id: &str) -> Option<&mut Habit> {
        self.habits.iter_mut().find(|habit| habit.id == id)
    }

    #[must_use]
    pub fn daily(&self, id: &str) -> Option<&Daily> {
        self.dailies.iter().find(|daily| daily.id == id)
    }

    pub fn daily_mut(&mut self, id: &str) -> Option<&mut Daily> {
        self.dailies.iter_mut().find(|daily| daily.id == id)
    }

    #[must_use]
    pub fn todo(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    pub fn todo_mut(&mut self, id: &str) -> Option<&mut Todo> {
        self.todos.iter_mut().find(|todo| todo.id == id)
    }

    #[must_use]
    pub fn reward(&self, id: &str) -> Option<&Reward> {
        self.rewards.iter().find(|reward| reward.id == id)
    }

    /// Number of entities held in `collection`.
    #[must_use]
    pub fn len_of(&self, collection: Collection) -> usize {
        match collection {
            Collection::Habits => self.habits.len(),
            Collection::Dailies => self.dailies.len(),
            Collection::Todos => self.todos.len(),
            Collection::Rewards => self.rewards.len(),
        }
    }

    #[must_use]
    pub fn has_joined(&self, challenge_id: &str) -> bool {
        self.joined_challenges.iter().any(|id| id == challenge_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn seeded_state_matches_first_run_shape() {
        let state = SaveState::seeded(fixed_now());
        assert_eq!(state.player, Player::default());
        assert_eq!(state.player.level, 1);
        assert_eq!(state.player.hp, 50);
        assert_eq!(state.habits.len(), 2);
        assert_eq!(state.dailies.len(), 2);
        assert_eq!(state.todos.len(), 1);
        assert_eq!(state.rewards.len(), 2);
        assert_eq!(state.habits[0].goal, Some(8));
        assert_eq!(state.habits[1].kind, HabitKind::Bad);
        assert_eq!(state.last_reset, fixed_now());
    }

    #[test]
    fn seeded_ids_are_unique() {
        let state = SaveState::seeded(fixed_now());
        let mut ids: Vec<&str> = state
            .habits
            .iter()
            .map(|h| h.id.as_str())
            .chain(state.dailies.iter().map(|d| d.id.as_str()))
            .chain(state.todos.iter().map(|t| t.id.as_str()))
            .chain(state.rewards.iter().map(|r| r.id.as_str()))
            .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn serialized_field_names_match_snapshot_contract() {
        let state = SaveState::seeded(fixed_now());
        let value = serde_json::to_value(&state).unwrap();
        assert!(value.get("lastResetISO").is_some());
        assert!(value["dailies"][0].get("bestStreak").is_some());
        assert!(value["habits"][0].get("completionHistory").is_some());
        assert_eq!(value["habits"][0]["kind"], "good");
        assert!(value.get("joinedChallenges").is_none());
        assert!(value["todos"][0].get("notes").is_none());
    }

    #[test]
    fn kind_direction_matrix() {
        assert!(HabitKind::Good.allows(Direction::Up));
        assert!(!HabitKind::Good.allows(Direction::Down));
        assert!(HabitKind::Bad.allows(Direction::Down));
        assert!(!HabitKind::Bad.allows(Direction::Up));
        assert!(HabitKind::Both.allows(Direction::Up));
        assert!(HabitKind::Both.allows(Direction::Down));
    }

    #[test]
    fn templates_normalize_input() {
        let habit = Habit::from_template(&HabitTemplate::new("  Walk  ", HabitKind::Good).with_goal(0));
        assert_eq!(habit.title, "Walk");
        assert_eq!(habit.goal, None);

        let reward = Reward::from_template(&RewardTemplate::new("Free", 0));
        assert_eq!(reward.cost, 1);

        let mut template = TodoTemplate::new("Call");
        template.notes = Some("   ".to_string());
        assert_eq!(Todo::from_template(&template).notes, None);
    }

    #[test]
    fn direction_parses_symbols() {
        assert_eq!("+".parse::<Direction>(), Ok(Direction::Up));
        assert_eq!("down".parse::<Direction>(), Ok(Direction::Down));
        assert!("*".parse::<Direction>().is_err());
        assert_eq!(Direction::Down.to_string(), "-");
    }
}
