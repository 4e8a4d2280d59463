use chores_core::repo::atomic::{backup_path, load_json_with_fallback, write_json_atomic};
use chores_core::{
    ChoreService, FixedClock, JsonFileRepository, Ledger, LoadSource, SnapshotRepository,
    StoreConfig, Task, TaskSnapshot,
};
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::fs;

fn snapshot_with(names: &[&str]) -> TaskSnapshot {
    let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
    TaskSnapshot {
        tasks: names
            .iter()
            .enumerate()
            .map(|(index, name)| Task::new(index as u64 + 1, *name, date, Utc::now()))
            .collect(),
        ..TaskSnapshot::default()
    }
}

#[test]
fn save_then_load_returns_the_same_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(StoreConfig::new(dir.path()));
    let snapshot = snapshot_with(&["Dishes", "Laundry"]);

    repo.save_tasks(&snapshot).unwrap();
    let loaded = repo.load_tasks();

    assert_eq!(loaded.source, LoadSource::Primary);
    assert_eq!(loaded.value, snapshot);
}

#[test]
fn second_save_keeps_previous_content_as_backup() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(StoreConfig::new(dir.path()));
    let first = snapshot_with(&["Dishes"]);
    let second = snapshot_with(&["Dishes", "Laundry"]);

    repo.save_tasks(&first).unwrap();
    repo.save_tasks(&second).unwrap();

    let backup = fs::read_to_string(backup_path(&repo.config().tasks_path())).unwrap();
    let backed_up: TaskSnapshot = serde_json::from_str(&backup).unwrap();
    assert_eq!(backed_up, first);

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn corrupt_primary_falls_back_to_backup() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(StoreConfig::new(dir.path()));
    let first = snapshot_with(&["Dishes"]);
    repo.save_tasks(&first).unwrap();
    repo.save_tasks(&snapshot_with(&["Dishes", "Laundry"])).unwrap();

    fs::write(repo.config().tasks_path(), "{\"tasks\": [").unwrap();
    let loaded = repo.load_tasks();

    assert_eq!(loaded.source, LoadSource::Backup);
    assert_eq!(loaded.value, first);
}

#[test]
fn corrupt_primary_and_backup_yield_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    fs::write(&path, "not json").unwrap();
    fs::write(backup_path(&path), "").unwrap();

    let loaded = load_json_with_fallback::<Ledger>(&path, "ledger");

    assert_eq!(loaded.source, LoadSource::Default);
    assert_eq!(loaded.value, Ledger::default());
}

#[test]
fn missing_files_yield_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(StoreConfig::new(dir.path().join("nested")));
    assert_eq!(repo.load_tasks().source, LoadSource::Default);
    assert_eq!(repo.load_ledger().value, Ledger::default());
}

#[test]
fn writer_creates_missing_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a").join("b").join("ledger.json");
    let mut ledger = Ledger::default();
    ledger.credit(4, 12);

    write_json_atomic(&path, &ledger, "ledger").unwrap();

    let loaded = load_json_with_fallback::<Ledger>(&path, "ledger");
    assert_eq!(loaded.source, LoadSource::Primary);
    assert_eq!(loaded.value.balance(4), 12);
}

#[test]
fn legacy_tasks_without_series_fields_still_load() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(StoreConfig::new(dir.path()));
    fs::write(
        repo.config().tasks_path(),
        r#"{"tasks":[{"id":5,"name":"Dust","date":"2024-03-20","recurring":"weekly","order":0}],
            "people":[{"id":1,"name":"Alex"}]}"#,
    )
    .unwrap();

    let loaded = repo.load_tasks();

    assert_eq!(loaded.source, LoadSource::Primary);
    let task = &loaded.value.tasks[0];
    assert_eq!(task.series(), 5);
    assert_eq!(loaded.value.people[0].level, 1);
    assert_eq!(loaded.value.settings.language, "en");
}

#[test]
fn older_data_file_settings_and_task_keys_survive_a_commit() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path());
    fs::write(
        config.tasks_path(),
        r#"{
            "tasks": [{
                "id": 5, "name": "Dust", "date": "2024-03-20", "assignedTo": 1,
                "assignedDate": "2024-03-19T10:00:00.000Z",
                "assignedDateShort": "A 19/3", "createdShort": "C 18/3"
            }],
            "people": [{"id": 1, "name": "Alex"}],
            "settings": {
                "language": "sv", "dateFormatting": "dd.mm.yyyy",
                "useAI": false, "levelingEnabled": false, "theme": "dark"
            }
        }"#,
    )
    .unwrap();

    let clock = FixedClock::at(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(), 9, 0);
    let mut service = ChoreService::open(JsonFileRepository::new(config.clone()), clock);
    assert!(!service.settings().use_ai);
    assert!(!service.settings().leveling.enabled);
    assert_eq!(service.settings().language, "sv");
    assert!(service.add_person("Sam").unwrap().persisted);

    let saved: Value =
        serde_json::from_str(&fs::read_to_string(config.tasks_path()).unwrap()).unwrap();
    let settings = &saved["settings"];
    assert_eq!(settings["useAI"], false);
    assert!(settings.get("useAi").is_none());
    assert_eq!(settings["levelingEnabled"], false);
    assert_eq!(settings["leveling"]["enabled"], false);
    assert_eq!(settings["theme"], "dark");

    let task = &saved["tasks"][0];
    assert!(task["assignedDate"].is_string());
    assert_eq!(task["assignedDateShort"], "A 19/3");
    assert_eq!(task["createdShort"], "C 18/3");
}
