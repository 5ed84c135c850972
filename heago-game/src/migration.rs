//! Snapshot migration from any earlier save shape to the current [`SaveState`].
//!
//! Persisted data is never trusted as-is: the raw JSON is inspected field by
//! field, missing optional fields are filled with their defaults and entities
//! that cannot be interpreted are dropped.
use chrono::{DateTime, Utc};
use log::warn;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::constants::{
    HABIT_VALUE_MAX, HABIT_VALUE_MIN, HP_MAX, MIGRATION_MAX_LEVEL_UPS, REWARD_MIN_COST,
    STARTING_LEVEL,
};
use crate::leveling::xp_to_next_level;
use crate::state::{Daily, Habit, Player, Reward, SaveState, Todo};

const HISTORY_FIELD: &str = "completionHistory";
const BEST_STREAK_FIELD: &str = "bestStreak";
const LAST_RESET_FIELD: &str = "lastResetISO";

/// Shape of a persisted snapshot before migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// Written before completion history and best streaks were tracked.
    Legacy,
    Current,
}

/// Migrated state plus a count of repaired or dropped fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub state: SaveState,
    pub schema: SchemaVersion,
    pub repairs: usize,
}

/// Detect which snapshot shape `root` was written with.
#[must_use]
pub fn detect_schema(root: &Map<String, Value>) -> SchemaVersion {
    let missing = |collection: &str, field: &str| {
        root.get(collection)
            .and_then(Value::as_array)
            .is_some_and(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .any(|item| !item.contains_key(field))
            })
    };
    if missing("habits", HISTORY_FIELD)
        || missing("dailies", HISTORY_FIELD)
        || missing("dailies", BEST_STREAK_FIELD)
    {
        SchemaVersion::Legacy
    } else {
        SchemaVersion::Current
    }
}

/// Migrate a raw snapshot. Returns `None` when the root is not an object,
/// in which case the caller falls back to the seeded default state.
#[must_use]
pub fn migrate_value(raw: Value) -> Option<MigrationReport> {
    let Value::Object(root) = raw else {
        warn!("save snapshot root is not an object");
        return None;
    };
    let schema = detect_schema(&root);
    let mut migrator = Migrator::default();

    let player = migrator.player(root.get("player"));
    let habits: Vec<Habit> = migrator.collection(root.get("habits"), "habits", |item, repairs| {
        *repairs += fill_history(item);
        clamp_value(item, repairs);
        drop_empty_goal(item, repairs);
    });
    let mut dailies: Vec<Daily> =
        migrator.collection(root.get("dailies"), "dailies", |item, repairs| {
            *repairs += fill_history(item);
            if !item.contains_key(BEST_STREAK_FIELD) {
                item.insert(BEST_STREAK_FIELD.to_string(), Value::from(0));
            }
        });
    for daily in &mut dailies {
        if daily.best_streak < daily.streak {
            daily.best_streak = daily.streak;
            migrator.repairs += 1;
        }
    }
    let todos: Vec<Todo> = migrator.collection(root.get("todos"), "todos", |_, _| {});
    let mut rewards: Vec<Reward> = migrator.collection(root.get("rewards"), "rewards", |_, _| {});
    for reward in &mut rewards {
        if reward.cost < REWARD_MIN_COST {
            reward.cost = REWARD_MIN_COST;
            migrator.repairs += 1;
        }
    }
    let last_reset = migrator.last_reset(root.get(LAST_RESET_FIELD));
    let joined_challenges = root
        .get("joinedChallenges")
        .and_then(|value| serde_json::from_value::<Vec<String>>(value.clone()).ok())
        .unwrap_or_default();

    Some(MigrationReport {
        state: SaveState {
            player,
            habits,
            dailies,
            todos,
            rewards,
            last_reset,
            joined_challenges,
        },
        schema,
        repairs: migrator.repairs,
    })
}

#[derive(Default)]
struct Migrator {
    repairs: usize,
}

impl Migrator {
    fn player(&mut self, raw: Option<&Value>) -> Player {
        match raw.map(|value| serde_json::from_value::<Player>(value.clone())) {
            Some(Ok(player)) => self.bound_player(player),
            Some(Err(err)) => {
                warn!("unreadable player record, using defaults: {err}");
                self.repairs += 1;
                Player::default()
            }
            None => {
                self.repairs += 1;
                Player::default()
            }
        }
    }

    /// Pull a stored player back inside the level, hp and xp bounds.
    /// Surplus xp is rolled into levels without the level-up rewards.
    fn bound_player(&mut self, mut player: Player) -> Player {
        if player.level < STARTING_LEVEL {
            player.level = STARTING_LEVEL;
            self.repairs += 1;
        }
        if player.hp > HP_MAX {
            player.hp = HP_MAX;
            self.repairs += 1;
        }
        if player.xp >= xp_to_next_level(player.level) {
            let mut level_ups = 0;
            while player.xp >= xp_to_next_level(player.level) && level_ups < MIGRATION_MAX_LEVEL_UPS
            {
                player.xp -= xp_to_next_level(player.level);
                player.level = player.level.saturating_add(1);
                level_ups += 1;
            }
            player.xp = player.xp.min(xp_to_next_level(player.level) - 1);
            self.repairs += 1;
        }
        player
    }

    fn collection<T, F>(&mut self, raw: Option<&Value>, name: &str, mut repair: F) -> Vec<T>
    where
        T: DeserializeOwned,
        F: FnMut(&mut Map<String, Value>, &mut usize),
    {
        let Some(raw) = raw else {
            return Vec::new();
        };
        let Some(items) = raw.as_array() else {
            warn!("{name} is not a list, dropping it");
            self.repairs += 1;
            return Vec::new();
        };
        let mut parsed = Vec::with_capacity(items.len());
        for item in items {
            let Some(object) = item.as_object() else {
                warn!("dropping non-object entry in {name}");
                self.repairs += 1;
                continue;
            };
            let mut object = object.clone();
            repair(&mut object, &mut self.repairs);
            match serde_json::from_value::<T>(Value::Object(object)) {
                Ok(entity) => parsed.push(entity),
                Err(err) => {
                    warn!("dropping unreadable entry in {name}: {err}");
                    self.repairs += 1;
                }
            }
        }
        parsed
    }

    fn last_reset(&mut self, raw: Option<&Value>) -> DateTime<Utc> {
        let parsed = raw
            .and_then(Value::as_str)
            .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
            .map(|stamp| stamp.with_timezone(&Utc));
        parsed.unwrap_or_else(|| {
            // The epoch guarantees a reset on the first check after load.
            self.repairs += 1;
            DateTime::<Utc>::UNIX_EPOCH
        })
    }
}

/// Ensure a usable `completionHistory`, dropping unparsable timestamps.
fn fill_history(item: &mut Map<String, Value>) -> usize {
    let Some(Value::Array(entries)) = item.get(HISTORY_FIELD) else {
        item.insert(HISTORY_FIELD.to_string(), Value::Array(Vec::new()));
        return 0;
    };
    let kept: Vec<Value> = entries
        .iter()
        .filter(|entry| {
            entry
                .as_str()
                .is_some_and(|text| DateTime::parse_from_rfc3339(text).is_ok())
        })
        .cloned()
        .collect();
    let dropped = entries.len() - kept.len();
    item.insert(HISTORY_FIELD.to_string(), Value::Array(kept));
    dropped
}

fn clamp_value(item: &mut Map<String, Value>, repairs: &mut usize) {
    let Some(value) = item.get("value").and_then(Value::as_i64) else {
        return;
    };
    let clamped = value.clamp(i64::from(HABIT_VALUE_MIN), i64::from(HABIT_VALUE_MAX));
    if clamped != value {
        item.insert("value".to_string(), Value::from(clamped));
        *repairs += 1;
    }
}

/// Goals must be positive; zero or non-numeric goals mean "no goal".
fn drop_empty_goal(item: &mut Map<String, Value>, repairs: &mut usize) {
    let Some(goal) = item.get("goal") else {
        return;
    };
    if goal.is_null() || goal.as_u64().is_some_and(|goal| goal > 0) {
        return;
    }
    item.remove("goal");
    *repairs += 1;
}
