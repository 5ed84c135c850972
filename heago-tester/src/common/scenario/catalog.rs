use anyhow::{Context, Result, bail, ensure};
use chrono::TimeDelta;
use heago_game::{
    Daily, DailyTemplate, Direction, FileStorage, LoadOrigin, MemoryStorage, Player, SaveState,
    SaveStorage, TrackerConfig, TrackerSession, grant_xp, load_state, save_state, toggle_daily,
};
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::playthrough::{random_playthrough, run_random_days};
use super::{Harness, ScenarioCtx, TestScenario, check_invariants, start_for_seed};

pub static SCENARIOS: &[TestScenario] = &[
    TestScenario::new(
        "smoke",
        "Open a fresh save and exercise every action once",
        smoke,
    ),
    TestScenario::new(
        "scenario-a",
        "Three water taps grant 15/14/13 XP and 6/5/4 gold",
        scenario_a,
    ),
    TestScenario::new(
        "scenario-b",
        "Unchecking a daily keeps its streak and costs 2 HP",
        scenario_b,
    ),
    TestScenario::new(
        "scenario-c",
        "Crossing the first XP threshold levels up once",
        scenario_c,
    ),
    TestScenario::new(
        "scenario-d",
        "Reopening on a new day clears yesterday's dailies",
        scenario_d,
    ),
    TestScenario::new(
        "reset-idempotence",
        "A second reset check on the same day changes nothing",
        reset_idempotence,
    ),
    TestScenario::new(
        "persistence-roundtrip",
        "Saved snapshots load back identically from memory and disk",
        persistence_roundtrip,
    ),
    TestScenario::new(
        "random-playthrough",
        "Seeded multi-day action sequences keep every invariant",
        random_playthrough,
    ),
];

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS
        .iter()
        .map(|scenario| (scenario.name, scenario.description))
        .collect()
}

#[must_use]
pub fn scenario_names() -> Vec<String> {
    SCENARIOS
        .iter()
        .map(|scenario| scenario.name.to_string())
        .collect()
}

fn smoke(ctx: &ScenarioCtx) -> Result<()> {
    let mut harness = Harness::open(start_for_seed(ctx.seed));
    let session = &mut harness.session;
    ensure!(session.origin() == LoadOrigin::Seeded, "fresh storage should seed");

    let state = session.state().clone();
    let water = &state.habits[0].id;
    let stretch = &state.dailies[0].id;
    let meals = &state.todos[0].id;
    let chocolate = &state.rewards[1].id;

    ensure!(session.tap_habit(water, Direction::Up).applied, "water tap ignored");
    ensure!(session.toggle_daily(stretch).applied, "daily toggle ignored");
    ensure!(session.toggle_todo(meals).applied, "todo toggle ignored");
    ensure!(session.buy_reward(chocolate).applied, "could not afford chocolate");
    ensure!(
        !session.toggle_todo("no-such-todo").applied,
        "missing id should be a no-op"
    );
    let created = session
        .add_daily(DailyTemplate::new("Evening walk"))
        .created
        .context("daily not created")?;
    ensure!(
        session.remove(heago_game::Collection::Dailies, &created).applied,
        "remove failed"
    );
    check_invariants(session.state())?;

    let stored = harness
        .storage
        .raw(session.key())
        .context("nothing was persisted")?;
    let saved: SaveState = serde_json::from_str(&stored)?;
    ensure!(&saved == session.state(), "persisted snapshot is stale");
    if ctx.verbose {
        let summary = session.summary();
        println!(
            "     smoke: {} completions, player {:?}",
            summary.habit_completions + summary.daily_completions,
            session.state().player
        );
    }
    Ok(())
}

fn scenario_a(ctx: &ScenarioCtx) -> Result<()> {
    let mut harness = Harness::open(start_for_seed(ctx.seed));
    let water = harness
        .session
        .state()
        .habits
        .iter()
        .find(|habit| habit.title == "Drink water")
        .map(|habit| habit.id.clone())
        .context("seeded water habit missing")?;
    let mut xp = Vec::new();
    let mut gold = Vec::new();
    for _ in 0..3 {
        let outcome = harness.session.tap_habit(&water, Direction::Up);
        xp.push(outcome.xp_granted);
        gold.push(outcome.gold_granted);
    }
    ensure!(xp == [15, 14, 13], "xp grants were {xp:?}");
    ensure!(gold == [6, 5, 4], "gold grants were {gold:?}");
    let habit = harness.session.state().habit(&water).context("water gone")?;
    ensure!(habit.value == 3, "value ended at {}", habit.value);
    ensure!(habit.completion_history.len() == 3, "history not appended");
    Ok(())
}

fn scenario_b(ctx: &ScenarioCtx) -> Result<()> {
    let now = start_for_seed(ctx.seed);
    let mut state = SaveState::empty(now);
    let mut daily = Daily::from_template(&DailyTemplate::new("Meditate"));
    daily.streak = 6;
    daily.best_streak = 6;
    let id = daily.id.clone();
    state.dailies.push(daily);

    toggle_daily(&mut state, &id, now);
    let checked = state.daily(&id).context("daily missing")?;
    ensure!(
        checked.done && checked.streak == 7 && checked.best_streak == 7,
        "check produced {checked:?}"
    );
    let hp = state.player.hp;
    toggle_daily(&mut state, &id, now);
    let unchecked = state.daily(&id).context("daily missing")?;
    ensure!(!unchecked.done, "daily still done");
    ensure!(
        unchecked.streak == 7 && unchecked.best_streak == 7,
        "uncheck changed streaks: {unchecked:?}"
    );
    ensure!(state.player.hp == hp - 2, "hp {} -> {}", hp, state.player.hp);
    Ok(())
}

fn scenario_c(_ctx: &ScenarioCtx) -> Result<()> {
    let mut player = Player {
        level: 1,
        xp: 90,
        hp: 50,
        gold: 0,
    };
    let levels = grant_xp(&mut player, 30);
    ensure!(levels == 1, "gained {levels} levels");
    ensure!(
        player.level == 2 && player.xp == 20 && player.gold == 5,
        "player after level-up: {player:?}"
    );
    ensure!(player.hp == 60, "heal went to {}", player.hp);
    Ok(())
}

fn scenario_d(ctx: &ScenarioCtx) -> Result<()> {
    let yesterday = start_for_seed(ctx.seed);
    let storage = MemoryStorage::new();
    let mut state = SaveState::seeded(yesterday);
    let ids: Vec<String> = state.dailies.iter().map(|daily| daily.id.clone()).collect();
    for id in &ids {
        toggle_daily(&mut state, id, yesterday);
    }
    save_state(&storage, heago_game::DEFAULT_STORAGE_KEY, &state)?;

    let harness = Harness::with_storage(storage, yesterday + TimeDelta::days(1));
    let reopened = harness.session.state();
    ensure!(
        reopened.dailies.iter().all(|daily| !daily.done),
        "dailies still checked after a new day"
    );
    ensure!(
        reopened.last_reset == yesterday + TimeDelta::days(1),
        "lastResetISO not moved to today"
    );
    for (before, after) in state.dailies.iter().zip(&reopened.dailies) {
        ensure!(
            before.streak == after.streak
                && before.best_streak == after.best_streak
                && before.completion_history == after.completion_history,
            "reset touched {}",
            before.title
        );
    }
    Ok(())
}

fn reset_idempotence(ctx: &ScenarioCtx) -> Result<()> {
    let mut rng = ChaCha20Rng::seed_from_u64(ctx.seed);
    let mut harness = Harness::open(start_for_seed(ctx.seed));
    for day in 0..ctx.days.max(1) {
        let ids: Vec<String> = harness
            .session
            .state()
            .dailies
            .iter()
            .map(|daily| daily.id.clone())
            .collect();
        for id in &ids {
            if rng.gen_bool(0.7) {
                harness.session.toggle_daily(id);
            }
        }
        harness.advance(TimeDelta::minutes(rng.gen_range(6 * 60..30 * 60)));
        let first = harness.session.check_reset();
        let snapshot = harness.session.state().clone();
        let second = harness.session.check_reset();
        if second.reset || harness.session.state() != &snapshot {
            bail!("day {day}: second reset check changed state (first {first:?})");
        }
        debug!("day {day}: reset={} cleared={}", first.reset, first.cleared);
    }
    Ok(())
}

fn persistence_roundtrip(ctx: &ScenarioCtx) -> Result<()> {
    let mut harness = Harness::open(start_for_seed(ctx.seed));
    run_random_days(&mut harness, ctx.seed, ctx.days.clamp(1, 14))?;
    let state = harness.session.state().clone();

    let memory = MemoryStorage::new();
    save_state(&memory, "roundtrip", &state)?;
    let loaded = load_state(&memory, "roundtrip", state.last_reset);
    ensure!(loaded.state == state, "memory roundtrip differs");

    let dir = std::env::temp_dir().join(format!("heago-tester-{}-{}", ctx.seed, std::process::id()));
    let disk = FileStorage::new(&dir);
    save_state(&disk, "roundtrip", &state)?;
    let from_disk = load_state(&disk, "roundtrip", state.last_reset);
    disk.delete("roundtrip")?;
    let _ = std::fs::remove_dir_all(&dir);
    ensure!(from_disk.state == state, "disk roundtrip differs");

    let config = TrackerConfig::default();
    let reopened = TrackerSession::open(harness.storage.clone(), harness.clock.clone(), &config);
    ensure!(
        reopened.state() == harness.session.state(),
        "reopened session differs from the live one"
    );
    Ok(())
}
