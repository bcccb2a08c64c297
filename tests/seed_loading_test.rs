use std::path::Path;
use std::sync::Arc;
use streaminit::provision::{Provisioner, SeedStatus};
use streaminit::{Config, DatabaseName, MemoryStore, PrincipalName, Role};
use tempfile::TempDir;

const CONTENT_JSON: &str = r#"{
    "movies": [
        {
            "content_id": "m001",
            "title": "The Long Return",
            "genre": ["drama", "thriller"],
            "rating": 8.1,
            "production_budget": 42000000,
            "duration_minutes": 131,
            "release_year": 2019,
            "views_count": 5400211
        }
    ],
    "series": [
        {
            "content_id": "s001",
            "title": "Harbor Lights",
            "genre": ["drama"],
            "rating": 7.6,
            "production_budget": 12500000,
            "seasons": 2,
            "avg_episode_duration": 47.5,
            "total_views": 9300500,
            "episodes_per_season": [8, 10]
        }
    ]
}"#;

const USERS_CSV: &str = "\
user_id,age,country,subscription_type,registration_date,total_watch_time_hours
1001,34,ES,premium,2023-05-14,120.5
1002,27,MX,basic,2024-01-03,44.25
";

const SESSIONS_CSV: &str = "\
session_id,user_id,content_id,watch_date,watch_duration_minutes,completion_percentage,device_type,quality_level
sess-0001,1001,m001,2024-02-11,95,72.5,tv,hd
sess-0002,1002,s001,2024-02-12,47,100.0,mobile,sd
";

fn seeded_config(dir: &Path) -> Config {
    Config {
        host: "localhost".to_string(),
        port: 5432,
        admin_user: "postgres".to_string(),
        admin_password: "admin_pw".to_string(),
        database: DatabaseName::new("video_streaming").unwrap(),
        app_user: PrincipalName::new("video_user").unwrap(),
        app_password: "video_pw".to_string(),
        app_role: Role::ReadWrite,
        seed_content_json: Some(dir.join("content.json")),
        seed_snapshot_dir: Some(dir.to_path_buf()),
        connect_timeout_secs: 1,
    }
}

fn write_fixtures(dir: &Path) {
    std::fs::write(dir.join("content.json"), CONTENT_JSON).unwrap();
    std::fs::write(dir.join("users.csv"), USERS_CSV).unwrap();
    std::fs::write(dir.join("viewing_sessions.csv"), SESSIONS_CSV).unwrap();
}

#[tokio::test]
async fn test_first_run_loads_all_seed_sources() {
    let temp = TempDir::new().unwrap();
    write_fixtures(temp.path());

    let store = Arc::new(MemoryStore::new());
    let provisioner = Provisioner::new(store.clone(), seeded_config(temp.path()));
    let report = provisioner.run().await.expect("run failed");

    assert_eq!(report.seeds.len(), 3);
    // Catalog: 2 content + 1 movie detail + 1 series detail + 3 genres + 2 episodes.
    assert_eq!(
        report.seeds[0].status,
        SeedStatus::Loaded { rows: 9 }
    );
    assert_eq!(report.seeds[1].status, SeedStatus::Loaded { rows: 2 });
    assert_eq!(report.seeds[2].status, SeedStatus::Loaded { rows: 2 });

    assert_eq!(store.relation_rows("content").unwrap().len(), 2);
    assert_eq!(store.relation_rows("content_genres").unwrap().len(), 3);
    assert_eq!(store.relation_rows("series_episodes").unwrap().len(), 2);
    assert_eq!(store.relation_rows("users").unwrap().len(), 2);
    assert_eq!(store.relation_rows("viewing_sessions").unwrap().len(), 2);
}

#[tokio::test]
async fn test_second_run_skips_populated_relations() {
    let temp = TempDir::new().unwrap();
    write_fixtures(temp.path());

    let store = Arc::new(MemoryStore::new());
    let provisioner = Provisioner::new(store.clone(), seeded_config(temp.path()));
    provisioner.run().await.expect("first run failed");
    let report = provisioner.run().await.expect("second run failed");

    for seed in &report.seeds {
        assert!(
            matches!(seed.status, SeedStatus::SkippedExisting { .. }),
            "{} was not skipped",
            seed.source
        );
    }
    // No duplicated rows.
    assert_eq!(store.relation_rows("content").unwrap().len(), 2);
    assert_eq!(store.relation_rows("users").unwrap().len(), 2);
}

#[tokio::test]
async fn test_malformed_catalog_fails_without_partial_load() {
    let temp = TempDir::new().unwrap();
    write_fixtures(temp.path());
    std::fs::write(temp.path().join("content.json"), "{ not json").unwrap();

    let store = Arc::new(MemoryStore::new());
    let provisioner = Provisioner::new(store.clone(), seeded_config(temp.path()));
    provisioner.run().await.expect_err("run should fail");

    // Schema exists but nothing was loaded into it.
    assert_eq!(store.relation_rows("content").unwrap().len(), 0);
    assert_eq!(store.relation_rows("movie_details").unwrap().len(), 0);
}

#[tokio::test]
async fn test_missing_snapshot_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    write_fixtures(temp.path());
    std::fs::remove_file(temp.path().join("users.csv")).unwrap();

    let store = Arc::new(MemoryStore::new());
    let provisioner = Provisioner::new(store, seeded_config(temp.path()));
    provisioner.run().await.expect_err("run should fail");
}

#[tokio::test]
async fn test_catalog_only_configuration() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("content.json"), CONTENT_JSON).unwrap();

    let mut config = seeded_config(temp.path());
    config.seed_snapshot_dir = None;

    let store = Arc::new(MemoryStore::new());
    let provisioner = Provisioner::new(store.clone(), config);
    let report = provisioner.run().await.expect("run failed");

    assert_eq!(report.seeds.len(), 1);
    assert_eq!(report.seeds[0].source, "content catalog");
    assert_eq!(store.relation_rows("users").unwrap().len(), 0);
}
