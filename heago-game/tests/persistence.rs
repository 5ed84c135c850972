use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use heago_game::{
    Direction, FileStorage, FixedClock, HabitKind, HabitTemplate, LoadOrigin, MemoryStorage,
    RewardTemplate, SaveState, SaveStorage, SchemaVersion, TrackerConfig, TrackerSession,
    add_reward, load_state, save_state, tap_habit, toggle_daily,
};
use std::path::PathBuf;

const KEY: &str = "heago-habits-save-v1";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 20, 19, 45, 0).unwrap()
}

fn scratch_dir(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("heago-persistence-{label}-{nanos}"))
}

fn busy_state() -> SaveState {
    let mut state = SaveState::seeded(now() - TimeDelta::days(2));
    let water = state.habits[0].id.clone();
    let read = state.dailies[1].id.clone();
    for offset in 0..3 {
        tap_habit(&mut state, &water, Direction::Up, now() - TimeDelta::hours(offset));
    }
    toggle_daily(&mut state, &read, now());
    let mut template = RewardTemplate::new("Weekend trip", 250);
    template.notes = Some("save up".into());
    add_reward(&mut state, &template);
    state.joined_challenges.push("study-sprint".into());
    state
}

#[test]
fn memory_roundtrip_preserves_everything() {
    let storage = MemoryStorage::new();
    let state = busy_state();
    save_state(&storage, KEY, &state).unwrap();
    let loaded = load_state(&storage, KEY, now());
    assert_eq!(loaded.state, state);
}

#[test]
fn file_roundtrip_preserves_everything() {
    let dir = scratch_dir("roundtrip");
    let storage = FileStorage::new(&dir);
    let state = busy_state();
    save_state(&storage, KEY, &state).unwrap();
    let loaded = load_state(&storage, KEY, now());
    assert_eq!(loaded.state, state);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn snapshot_uses_camel_case_field_names() {
    let json = serde_json::to_value(busy_state()).unwrap();
    assert!(json.get("lastResetISO").is_some());
    assert!(json.get("joinedChallenges").is_some());
    let daily = &json["dailies"][1];
    assert!(daily.get("bestStreak").is_some());
    assert!(daily.get("completionHistory").is_some());
    assert_eq!(json["habits"][0]["kind"], "good");
    assert!(json["habits"][0].get("notes").is_none());
    assert_eq!(json["rewards"][2]["notes"], "save up");
}

#[test]
fn legacy_snapshot_migrates_on_session_open() {
    let storage = MemoryStorage::new();
    storage
        .write(
            KEY,
            r#"{
                "player": { "level": 4, "xp": 12, "hp": 70, "gold": 33 },
                "habits": [ { "id": "h1", "title": "Floss", "kind": "good", "value": -2 } ],
                "dailies": [ { "id": "d1", "title": "Journal", "done": true, "streak": 12 } ],
                "todos": [],
                "rewards": [ { "id": "r1", "title": "Coffee", "cost": 4 } ],
                "lastResetISO": "2025-11-19T08:00:00.000Z"
            }"#,
        )
        .unwrap();
    let clock = FixedClock::new(now());
    let session = TrackerSession::open(storage.clone(), clock, &TrackerConfig::default());
    assert_eq!(
        session.origin(),
        LoadOrigin::Restored {
            schema: SchemaVersion::Legacy,
            repairs: 1,
        }
    );
    let state = session.state();
    assert_eq!(state.player.gold, 33);
    assert_eq!(state.habits[0].value, -2);
    assert!(state.habits[0].completion_history.is_empty());
    let journal = state.daily("d1").unwrap();
    assert_eq!(journal.best_streak, 12);
    assert!(!journal.done, "a new day resets the daily");
    assert_eq!(state.last_reset, now());

    // The migrated shape is written straight back.
    let raw = storage.raw(KEY).unwrap();
    assert!(raw.contains("bestStreak"));
    assert!(raw.contains("completionHistory"));
}

#[test]
fn out_of_range_player_is_repaired_on_open() {
    let storage = MemoryStorage::new();
    storage
        .write(
            KEY,
            r#"{
                "player": { "level": 0, "xp": 5000, "hp": 4000, "gold": 1 },
                "habits": [], "dailies": [], "todos": [], "rewards": [],
                "lastResetISO": "2025-11-20T06:00:00.000Z"
            }"#,
        )
        .unwrap();
    let session =
        TrackerSession::open(storage, FixedClock::new(now()), &TrackerConfig::default());
    assert_eq!(
        session.origin(),
        LoadOrigin::Restored {
            schema: SchemaVersion::Current,
            repairs: 3,
        }
    );
    let player = session.state().player;
    assert_eq!(player.level, 16);
    assert_eq!(player.xp, 350);
    assert_eq!(player.hp, 999);
    assert_eq!(player.gold, 1);
}

#[test]
fn unreadable_snapshot_falls_back_to_seed() {
    let storage = MemoryStorage::new();
    storage.write(KEY, "][").unwrap();
    let session =
        TrackerSession::open(storage, FixedClock::new(now()), &TrackerConfig::default());
    assert_eq!(session.origin(), LoadOrigin::Seeded);
    assert_eq!(session.state().habits.len(), 2);
    assert_eq!(session.state().player.hp, 50);
}

#[test]
fn sessions_on_disk_survive_restart() {
    let dir = scratch_dir("restart");
    let config = TrackerConfig {
        save_dir: dir.clone(),
        ..TrackerConfig::default()
    };
    let clock = FixedClock::new(now());
    let mut session =
        TrackerSession::open(FileStorage::new(&config.save_dir), clock.clone(), &config);
    let created = session
        .add_habit(HabitTemplate::new("Cold shower", HabitKind::Good))
        .created
        .unwrap();
    session.tap_habit(&created, Direction::Up);
    let expected = session.into_state().unwrap();

    let reopened = TrackerSession::open(FileStorage::new(&config.save_dir), clock, &config);
    assert_eq!(reopened.state(), &expected);
    let _ = std::fs::remove_dir_all(dir);
}
