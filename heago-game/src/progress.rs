//! Progress engine: turns tracker actions into XP, gold and HP changes.
//!
//! Every operation is total over a well-formed [`SaveState`]. Unknown ids and
//! unaffordable purchases are silent no-ops reported through
//! [`ActionOutcome::applied`], never errors.
use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::constants::{
    DAILY_GOLD, DAILY_UNDO_DAMAGE, DAILY_XP, HABIT_BASE_DAMAGE, HABIT_BASE_GOLD, HABIT_BASE_XP,
    HABIT_GOLD_MOMENTUM_PIVOT, HABIT_XP_MOMENTUM_PIVOT, HP_MAX, LEVEL_UP_GOLD, LEVEL_UP_HEAL,
    LEVEL_UP_HP_CAP_BASE, LEVEL_UP_HP_CAP_PER_LEVEL, REWARD_PURCHASE_XP, TODO_GOLD,
    TODO_UNDO_DAMAGE, TODO_XP,
};
use crate::leveling::xp_to_next_level;
use crate::state::{
    Collection, Daily, DailyTemplate, Direction, EntityId, Habit, HabitTemplate, Player, Reward,
    RewardTemplate, SaveState, Todo, TodoTemplate,
};

/// A single user action against the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    TapHabit { id: EntityId, direction: Direction },
    ToggleDaily { id: EntityId },
    ToggleTodo { id: EntityId },
    BuyReward { id: EntityId },
    AddHabit(HabitTemplate),
    AddDaily(DailyTemplate),
    AddTodo(TodoTemplate),
    AddReward(RewardTemplate),
    Remove { collection: Collection, id: EntityId },
}

/// Side effects produced by one engine transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionOutcome {
    /// False when the action targeted a missing id or was rejected.
    pub applied: bool,
    pub xp_granted: u64,
    /// Gold granted directly by the action, excluding level-up bonuses.
    pub gold_granted: u64,
    pub gold_spent: u64,
    pub level_up_gold: u64,
    pub damage: u32,
    pub levels_gained: u32,
    /// Id of the entity created by an add action.
    pub created: Option<EntityId>,
}

impl ActionOutcome {
    #[must_use]
    pub fn noop() -> Self {
        Self::default()
    }

    fn applied() -> Self {
        Self {
            applied: true,
            ..Self::default()
        }
    }

    fn with_xp(mut self, player: &mut Player, amount: u64) -> Self {
        let levels = grant_xp(player, amount);
        self.xp_granted += amount;
        self.levels_gained += levels;
        self.level_up_gold += u64::from(levels) * LEVEL_UP_GOLD;
        self
    }

    fn with_gold(mut self, player: &mut Player, amount: u64) -> Self {
        grant_gold(player, amount);
        self.gold_granted += amount;
        self
    }

    fn with_damage(mut self, player: &mut Player, amount: u32) -> Self {
        take_damage(player, amount);
        self.damage += amount;
        self
    }
}

/// Add XP, levelling up as many times as the total allows.
///
/// Each level gained heals `min(50 + level * 5, hp + 10)` and grants 5 gold,
/// so levels are processed one at a time. Returns the number of levels gained.
pub fn grant_xp(player: &mut Player, amount: u64) -> u32 {
    player.xp = player.xp.saturating_add(amount);
    let mut gained = 0;
    loop {
        let threshold = xp_to_next_level(player.level);
        if player.xp < threshold {
            break;
        }
        player.xp -= threshold;
        player.level = player.level.saturating_add(1);
        let cap = LEVEL_UP_HP_CAP_BASE
            .saturating_add(player.level.saturating_mul(LEVEL_UP_HP_CAP_PER_LEVEL));
        player.hp = cap.min(player.hp.saturating_add(LEVEL_UP_HEAL)).min(HP_MAX);
        player.gold = player.gold.saturating_add(LEVEL_UP_GOLD);
        gained += 1;
    }
    if gained > 0 {
        info!("level up: +{gained} to level {}", player.level);
    }
    gained
}

/// Reduce HP, flooring at zero. There is no death state.
pub fn take_damage(player: &mut Player, amount: u32) {
    player.hp = player.hp.saturating_sub(amount).min(HP_MAX);
}

pub fn grant_gold(player: &mut Player, amount: u64) {
    player.gold = player.gold.saturating_add(amount);
}

/// Apply a habit tap. Rewards and damage scale with the value *before* the tap.
///
/// Callers must only offer directions the habit kind allows
/// (see [`crate::HabitKind::allows`]); the pair is not re-validated here.
pub fn tap_habit(
    state: &mut SaveState,
    id: &str,
    direction: Direction,
    now: DateTime<Utc>,
) -> ActionOutcome {
    let Some(habit) = state.habit_mut(id) else {
        debug!("tap on unknown habit {id}");
        return ActionOutcome::noop();
    };
    let before = habit.value;
    habit.shift_value(direction.delta());
    debug!("habit {id} tapped {direction}: {before} -> {}", habit.value);

    match direction {
        Direction::Up => {
            habit.completion_history.push(now);
            ActionOutcome::applied()
                .with_xp(&mut state.player, habit_xp(before))
                .with_gold(&mut state.player, habit_gold(before))
        }
        Direction::Down => {
            ActionOutcome::applied().with_damage(&mut state.player, habit_damage(before))
        }
    }
}

/// XP for a positive tap at momentum `value`.
#[must_use]
pub fn habit_xp(value: i32) -> u64 {
    HABIT_BASE_XP + momentum_bonus(HABIT_XP_MOMENTUM_PIVOT - value)
}

/// Gold for a positive tap at momentum `value`.
#[must_use]
pub fn habit_gold(value: i32) -> u64 {
    HABIT_BASE_GOLD + momentum_bonus(HABIT_GOLD_MOMENTUM_PIVOT - value)
}

/// Damage for a negative tap at momentum `value`.
#[must_use]
pub fn habit_damage(value: i32) -> u32 {
    HABIT_BASE_DAMAGE + u32::try_from(value.max(0)).unwrap_or(0)
}

fn momentum_bonus(delta: i32) -> u64 {
    u64::try_from(delta.max(0)).unwrap_or(0)
}

/// Flip a daily. Checking extends the streak and pays out; unchecking only
/// costs 2 HP and leaves streak and history as they were.
pub fn toggle_daily(state: &mut SaveState, id: &str, now: DateTime<Utc>) -> ActionOutcome {
    let Some(daily) = state.daily_mut(id) else {
        debug!("toggle on unknown daily {id}");
        return ActionOutcome::noop();
    };
    daily.done = !daily.done;
    if daily.done {
        daily.streak = daily.streak.saturating_add(1);
        daily.best_streak = daily.best_streak.max(daily.streak);
        daily.completion_history.push(now);
        debug!("daily {id} checked, streak {}", daily.streak);
        ActionOutcome::applied()
            .with_xp(&mut state.player, DAILY_XP)
            .with_gold(&mut state.player, DAILY_GOLD)
    } else {
        debug!("daily {id} unchecked, streak kept at {}", daily.streak);
        ActionOutcome::applied().with_damage(&mut state.player, DAILY_UNDO_DAMAGE)
    }
}

pub fn toggle_todo(state: &mut SaveState, id: &str) -> ActionOutcome {
    let Some(todo) = state.todo_mut(id) else {
        debug!("toggle on unknown todo {id}");
        return ActionOutcome::noop();
    };
    todo.done = !todo.done;
    if todo.done {
        ActionOutcome::applied()
            .with_xp(&mut state.player, TODO_XP)
            .with_gold(&mut state.player, TODO_GOLD)
    } else {
        ActionOutcome::applied().with_damage(&mut state.player, TODO_UNDO_DAMAGE)
    }
}

/// Spend gold on a reward. Rewards are never consumed and can be bought again.
pub fn buy_reward(state: &mut SaveState, id: &str) -> ActionOutcome {
    let Some(cost) = state.reward(id).map(|reward| reward.cost) else {
        debug!("purchase of unknown reward {id}");
        return ActionOutcome::noop();
    };
    if state.player.gold < cost {
        debug!(
            "purchase of {id} rejected: {} gold < {cost}",
            state.player.gold
        );
        return ActionOutcome::noop();
    }
    state.player.gold -= cost;
    let mut outcome = ActionOutcome::applied().with_xp(&mut state.player, REWARD_PURCHASE_XP);
    outcome.gold_spent = cost;
    outcome
}

fn created(id: EntityId) -> ActionOutcome {
    ActionOutcome {
        created: Some(id),
        ..ActionOutcome::applied()
    }
}

fn blank(title: &str) -> bool {
    title.trim().is_empty()
}

pub fn add_habit(state: &mut SaveState, template: &HabitTemplate) -> ActionOutcome {
    if blank(&template.title) {
        return ActionOutcome::noop();
    }
    let habit = Habit::from_template(template);
    let id = habit.id.clone();
    state.habits.push(habit);
    created(id)
}

pub fn add_daily(state: &mut SaveState, template: &DailyTemplate) -> ActionOutcome {
    if blank(&template.title) {
        return ActionOutcome::noop();
    }
    let daily = Daily::from_template(template);
    let id = daily.id.clone();
    state.dailies.push(daily);
    created(id)
}

pub fn add_todo(state: &mut SaveState, template: &TodoTemplate) -> ActionOutcome {
    if blank(&template.title) {
        return ActionOutcome::noop();
    }
    let todo = Todo::from_template(template);
    let id = todo.id.clone();
    state.todos.push(todo);
    created(id)
}

pub fn add_reward(state: &mut SaveState, template: &RewardTemplate) -> ActionOutcome {
    if blank(&template.title) {
        return ActionOutcome::noop();
    }
    let reward = Reward::from_template(template);
    let id = reward.id.clone();
    state.rewards.push(reward);
    created(id)
}

/// Drop the entity `id` from `collection`. The player is untouched.
pub fn remove(state: &mut SaveState, collection: Collection, id: &str) -> ActionOutcome {
    let before = state.len_of(collection);
    match collection {
        Collection::Habits => state.habits.retain(|habit| habit.id != id),
        Collection::Dailies => state.dailies.retain(|daily| daily.id != id),
        Collection::Todos => state.todos.retain(|todo| todo.id != id),
        Collection::Rewards => state.rewards.retain(|reward| reward.id != id),
    }
    if state.len_of(collection) == before {
        return ActionOutcome::noop();
    }
    ActionOutcome::applied()
}

/// Dispatch an [`Action`] to the matching engine operation.
pub fn apply_action(state: &mut SaveState, action: &Action, now: DateTime<Utc>) -> ActionOutcome {
    match action {
        Action::TapHabit { id, direction } => tap_habit(state, id, *direction, now),
        Action::ToggleDaily { id } => toggle_daily(state, id, now),
        Action::ToggleTodo { id } => toggle_todo(state, id),
        Action::BuyReward { id } => buy_reward(state, id),
        Action::AddHabit(template) => add_habit(state, template),
        Action::AddDaily(template) => add_daily(state, template),
        Action::AddTodo(template) => add_todo(state, template),
        Action::AddReward(template) => add_reward(state, template),
        Action::Remove { collection, id } => remove(state, *collection, id),
    }
}
