use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use heago_game::{
    Daily, DailyTemplate, Direction, FixedClock, HabitKind, HabitTemplate, MemoryStorage, Player,
    SaveState, TrackerConfig, TrackerSession, buy_reward, grant_xp, run_daily_reset, tap_habit,
    toggle_daily, xp_to_next_level,
};

fn today() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 3, 10, 0, 0).unwrap()
}

#[test]
fn scenario_a_water_taps_shrink_rewards() {
    let mut state = SaveState::seeded(today());
    let water = state
        .habits
        .iter()
        .find(|habit| habit.title == "Drink water")
        .map(|habit| habit.id.clone())
        .unwrap();
    assert_eq!(state.habit(&water).unwrap().value, 0);

    let mut xp = Vec::new();
    let mut gold = Vec::new();
    for _ in 0..3 {
        let outcome = tap_habit(&mut state, &water, Direction::Up, today());
        xp.push(outcome.xp_granted);
        gold.push(outcome.gold_granted);
    }
    assert_eq!(xp, vec![15, 14, 13]);
    assert_eq!(gold, vec![6, 5, 4]);
    let habit = state.habit(&water).unwrap();
    assert_eq!(habit.value, 3);
    assert_eq!(habit.completion_history.len(), 3);
    assert_eq!(state.player.xp, 42);
    assert_eq!(state.player.gold, 15);
}

#[test]
fn scenario_b_uncheck_keeps_streak_and_costs_hp() {
    let mut state = SaveState::empty(today());
    let mut daily = Daily::from_template(&DailyTemplate::new("Meditate"));
    daily.streak = 6;
    daily.best_streak = 6;
    let id = daily.id.clone();
    state.dailies.push(daily);

    toggle_daily(&mut state, &id, today());
    let daily = state.daily(&id).unwrap();
    assert!(daily.done);
    assert_eq!((daily.streak, daily.best_streak), (7, 7));
    let hp_before = state.player.hp;

    let outcome = toggle_daily(&mut state, &id, today());
    let daily = state.daily(&id).unwrap();
    assert!(!daily.done);
    assert_eq!((daily.streak, daily.best_streak), (7, 7));
    assert_eq!(daily.completion_history.len(), 1);
    assert_eq!(outcome.damage, 2);
    assert_eq!(state.player.hp, hp_before - 2);
}

#[test]
fn scenario_c_single_level_up() {
    let mut player = Player {
        level: 1,
        xp: 90,
        hp: 42,
        gold: 0,
    };
    assert_eq!(grant_xp(&mut player, 30), 1);
    assert_eq!(player.level, 2);
    assert_eq!(player.xp, 20);
    assert_eq!(player.gold, 5);
    assert_eq!(player.hp, 52);
    assert!(player.xp < xp_to_next_level(player.level));
}

#[test]
fn scenario_d_reset_clears_yesterdays_dailies() {
    let yesterday = today() - TimeDelta::days(1);
    let mut state = SaveState::seeded(yesterday);
    let ids: Vec<String> = state.dailies.iter().map(|daily| daily.id.clone()).collect();
    for id in &ids {
        toggle_daily(&mut state, id, yesterday);
    }
    let before: Vec<(u32, u32, usize)> = state
        .dailies
        .iter()
        .map(|daily| (daily.streak, daily.best_streak, daily.completion_history.len()))
        .collect();

    let outcome = run_daily_reset(&mut state, &today());
    assert!(outcome.reset);
    assert_eq!(outcome.cleared, 2);
    assert!(state.dailies.iter().all(|daily| !daily.done));
    assert_eq!(state.last_reset, today());
    let after: Vec<(u32, u32, usize)> = state
        .dailies
        .iter()
        .map(|daily| (daily.streak, daily.best_streak, daily.completion_history.len()))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn broke_player_cannot_buy() {
    let mut state = SaveState::seeded(today());
    let episode = state.rewards[0].id.clone();
    state.player.gold = 9;
    let before = state.clone();
    assert!(!buy_reward(&mut state, &episode).applied);
    assert_eq!(state, before);

    state.player.gold = 10;
    let outcome = buy_reward(&mut state, &episode);
    assert!(outcome.applied);
    assert_eq!(outcome.gold_spent, 10);
    assert_eq!(state.player.gold, 0);
    assert_eq!(state.player.xp, 5);
    assert_eq!(state.rewards.len(), 2);
}

#[test]
fn a_week_in_a_session() {
    let storage = MemoryStorage::new();
    let clock = FixedClock::new(today());
    let mut session = TrackerSession::open(storage, clock.clone(), &TrackerConfig::default());
    let workout = session
        .add_habit(HabitTemplate::new("Workout", HabitKind::Both).with_goal(1))
        .created
        .unwrap();
    let stretch = session.state().dailies[0].id.clone();

    for _ in 0..7 {
        session.check_reset();
        session.toggle_daily(&stretch);
        session.tap_habit(&workout, Direction::Up);
        clock.advance(TimeDelta::days(1));
    }
    session.check_reset();

    let daily = session.state().daily(&stretch).unwrap();
    assert_eq!(daily.streak, 7);
    assert_eq!(daily.best_streak, 7);
    assert!(!daily.done);
    let summary = session.summary();
    assert_eq!(summary.habit_completions, 7);
    assert_eq!(summary.daily_completions, 7);
    // Nothing logged yet on the eighth day.
    assert_eq!(summary.activity_streak, 0);
    assert!(session.state().player.level >= 2);
}
