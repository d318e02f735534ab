//! End-to-end migrations between temporary SQLite files.

use std::path::{Path, PathBuf};

use oneapi_migrate::{
    detect, AbilityRebuilder, Config, Database, Orchestrator, RebuildOutcome, TableOutcome,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection, Executor};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const SOURCE_SCHEMA: &[&str] = &[
    "CREATE TABLE channels (
        id INTEGER PRIMARY KEY,
        type INTEGER NOT NULL DEFAULT 0,
        name TEXT,
        `group` TEXT,
        models TEXT,
        status INTEGER,
        priority INTEGER,
        plugin TEXT
    )",
    "CREATE TABLE tokens (id INTEGER PRIMARY KEY, `key` TEXT, name TEXT, remain_quota INTEGER)",
    "CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT)",
];

const TARGET_SCHEMA: &[&str] = &[
    "CREATE TABLE channels (
        id INTEGER PRIMARY KEY,
        type INTEGER NOT NULL DEFAULT 0,
        name TEXT,
        `group` TEXT,
        models TEXT,
        status INTEGER,
        priority INTEGER
    )",
    "CREATE TABLE tokens (id INTEGER PRIMARY KEY, `key` TEXT, name TEXT, remain_quota INTEGER)",
    "CREATE TABLE options (`key` TEXT PRIMARY KEY, value TEXT)",
    "CREATE TABLE abilities (
        `group` TEXT NOT NULL,
        model TEXT NOT NULL,
        channel_id INTEGER NOT NULL,
        enabled NUMERIC,
        priority INTEGER,
        PRIMARY KEY (`group`, model, channel_id)
    )",
];

async fn create_db(path: &Path, statements: &[&str]) -> SqliteConnection {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .disable_statement_logging();
    let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
    for sql in statements {
        conn.execute(*sql).await.unwrap();
    }
    conn
}

async fn count(conn: &mut SqliteConnection, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM `{}`", table))
        .fetch_one(conn)
        .await
        .unwrap()
}

struct Fixture {
    _dir: TempDir,
    source: PathBuf,
    target: PathBuf,
}

impl Fixture {
    async fn new(source_schema: &[&str], target_schema: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("one-hub.db");
        let target = dir.path().join("one-api.db");
        create_db(&source, source_schema).await.close().await.unwrap();
        create_db(&target, target_schema).await.close().await.unwrap();
        Self {
            _dir: dir,
            source,
            target,
        }
    }

    async fn source_conn(&self) -> SqliteConnection {
        create_db(&self.source, &[]).await
    }

    async fn target_conn(&self) -> SqliteConnection {
        create_db(&self.target, &[]).await
    }

    fn config(&self) -> Config {
        Config::from_dsns(
            self.source.to_str().unwrap(),
            self.target.to_str().unwrap(),
        )
        .unwrap()
    }

    async fn run(&self, config: Config) -> oneapi_migrate::MigrationResult {
        Orchestrator::new(config).await.unwrap().run().await.unwrap()
    }
}

async fn seed_source(fixture: &Fixture) {
    let mut conn = fixture.source_conn().await;
    for sql in [
        "INSERT INTO channels (id, type, name, `group`, models, status, priority, plugin)
         VALUES (1, 29, 'groq', 'default, vip', 'llama3,mixtral', 1, 5, '{}')",
        "INSERT INTO channels (id, type, name, `group`, models, status, priority, plugin)
         VALUES (2, 999, 'custom', 'default', '', 1, NULL, NULL)",
        "INSERT INTO tokens (id, `key`, name, remain_quota) VALUES (1, 'sk-a', 'first', 100)",
        "INSERT INTO tokens (id, `key`, name, remain_quota) VALUES (2, 'sk-b', 'second', 200)",
        "INSERT INTO users (id, username) VALUES (1, 'root')",
    ] {
        conn.execute(sql).await.unwrap();
    }
    conn.close().await.unwrap();
}

fn outcome<'a>(result: &'a oneapi_migrate::MigrationResult, table: &str) -> &'a TableOutcome {
    &result
        .tables
        .iter()
        .find(|r| r.table == table)
        .unwrap()
        .outcome
}

#[tokio::test]
async fn test_full_migration_with_rebuild() {
    let fixture = Fixture::new(SOURCE_SCHEMA, TARGET_SCHEMA).await;
    seed_source(&fixture).await;

    let result = fixture.run(fixture.config()).await;

    assert_eq!(result.tables_total, 7);
    assert_eq!(*outcome(&result, "channels"), TableOutcome::Migrated { rows: 2 });
    assert_eq!(*outcome(&result, "tokens"), TableOutcome::Migrated { rows: 2 });
    assert!(matches!(outcome(&result, "users"), TableOutcome::Skipped { .. }));
    assert!(matches!(outcome(&result, "logs"), TableOutcome::Skipped { .. }));
    assert_eq!(result.tables_migrated, 2);
    assert_eq!(result.tables_failed, 0);
    assert_eq!(result.rows_total, 4);

    let channels = result.tables.iter().find(|r| r.table == "channels").unwrap();
    assert_eq!(channels.dropped_columns, vec!["plugin".to_string()]);

    let mut target = fixture.target_conn().await;
    let types: Vec<(i64, i64)> = sqlx::query_as("SELECT id, type FROM channels ORDER BY id")
        .fetch_all(&mut target)
        .await
        .unwrap();
    assert_eq!(types, vec![(1, 25), (2, 0)]);

    match result.abilities {
        Some(RebuildOutcome::Rebuilt(ref report)) => {
            assert_eq!(report.channels_scanned, 2);
            assert_eq!(report.channels_skipped, 1);
            assert_eq!(report.rows_generated, 4);
            assert_eq!(report.statements, 1);
        }
        ref other => panic!("unexpected rebuild outcome: {:?}", other),
    }

    let abilities: Vec<(String, String, i64, i64, Option<i64>)> = sqlx::query_as(
        "SELECT `group`, model, channel_id, enabled, priority FROM abilities
         ORDER BY `group`, model",
    )
    .fetch_all(&mut target)
    .await
    .unwrap();
    assert_eq!(
        abilities,
        vec![
            ("default".into(), "llama3".into(), 1, 1, Some(5)),
            ("default".into(), "mixtral".into(), 1, 1, Some(5)),
            ("vip".into(), "llama3".into(), 1, 1, Some(5)),
            ("vip".into(), "mixtral".into(), 1, 1, Some(5)),
        ]
    );
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let fixture = Fixture::new(SOURCE_SCHEMA, TARGET_SCHEMA).await;
    seed_source(&fixture).await;

    let first = fixture.run(fixture.config()).await;
    let second = fixture.run(fixture.config()).await;

    assert_eq!(first.rows_total, second.rows_total);
    assert_eq!(second.tables_failed, 0);

    let mut target = fixture.target_conn().await;
    assert_eq!(count(&mut target, "channels").await, 2);
    assert_eq!(count(&mut target, "tokens").await, 2);
    assert_eq!(count(&mut target, "abilities").await, 4);
}

#[tokio::test]
async fn test_missing_source_table_leaves_destination_untouched() {
    let fixture = Fixture::new(SOURCE_SCHEMA, TARGET_SCHEMA).await;
    let mut target = fixture.target_conn().await;
    target
        .execute("INSERT INTO options (`key`, value) VALUES ('theme', 'dark')")
        .await
        .unwrap();

    let mut config = fixture.config();
    config.migration.tables = vec!["options".into()];
    config.migration.rebuild_abilities = false;
    let result = fixture.run(config).await;

    assert_eq!(
        *outcome(&result, "options"),
        TableOutcome::Skipped {
            reason: "table not found in source".into()
        }
    );
    assert!(result.abilities.is_none());
    assert_eq!(count(&mut target, "options").await, 1);
}

#[tokio::test]
async fn test_failed_table_is_rolled_back() {
    let target_schema = &[
        "CREATE TABLE tokens (id INTEGER PRIMARY KEY, `key` TEXT, name TEXT)",
        "CREATE TRIGGER reject_long_names BEFORE INSERT ON tokens
         WHEN length(NEW.name) > 5
         BEGIN SELECT RAISE(ABORT, 'name too long'); END",
    ];
    let fixture = Fixture::new(SOURCE_SCHEMA, target_schema).await;
    seed_source(&fixture).await;

    let mut config = fixture.config();
    config.migration.tables = vec!["tokens".into()];
    config.migration.rebuild_abilities = false;
    let result = fixture.run(config).await;

    assert!(matches!(outcome(&result, "tokens"), TableOutcome::Failed { .. }));
    assert_eq!(result.tables_failed, 1);
    assert!(result.has_failures());

    let mut target = fixture.target_conn().await;
    assert_eq!(count(&mut target, "tokens").await, 0);
}

#[tokio::test]
async fn test_rebuild_batches_at_limit() {
    let fixture = Fixture::new(&[], TARGET_SCHEMA).await;
    let models: Vec<String> = (0..501).map(|i| format!("model-{}", i)).collect();
    let mut target = fixture.target_conn().await;
    sqlx::query(
        "INSERT INTO channels (id, type, `group`, models, status, priority) VALUES (1, 1, 'default', ?, 2, 0)",
    )
    .bind(models.join(","))
    .execute(&mut target)
    .await
    .unwrap();

    let mut dest = Database::connect(&detect(fixture.target.to_str().unwrap()))
        .await
        .unwrap();
    let outcome = AbilityRebuilder::new(500).rebuild(&mut dest).await;
    dest.close().await.unwrap();

    match outcome {
        RebuildOutcome::Rebuilt(report) => {
            assert_eq!(report.rows_generated, 501);
            assert_eq!(report.statements, 2);
        }
        other => panic!("unexpected rebuild outcome: {:?}", other),
    }

    assert_eq!(count(&mut target, "abilities").await, 501);
    let enabled: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM abilities WHERE enabled = 0")
        .fetch_one(&mut target)
        .await
        .unwrap();
    assert_eq!(enabled, 501);
}

#[tokio::test]
async fn test_rebuild_skipped_without_abilities_table() {
    let fixture = Fixture::new(&[], &[TARGET_SCHEMA[0]]).await;
    let mut dest = Database::connect(&detect(fixture.target.to_str().unwrap()))
        .await
        .unwrap();

    let outcome = AbilityRebuilder::new(500).rebuild(&mut dest).await;
    assert_eq!(
        outcome,
        RebuildOutcome::Skipped {
            reason: "abilities table not found in destination".into()
        }
    );
}

#[tokio::test]
async fn test_failed_rebuild_batch_rolls_back_earlier_batches() {
    let target_schema = &[
        TARGET_SCHEMA[0],
        TARGET_SCHEMA[3],
        "CREATE TRIGGER reject_m3 BEFORE INSERT ON abilities
         WHEN NEW.model = 'm3'
         BEGIN SELECT RAISE(ABORT, 'rejected'); END",
    ];
    let fixture = Fixture::new(&[], target_schema).await;
    let mut target = fixture.target_conn().await;
    target
        .execute(
            "INSERT INTO channels (id, type, `group`, models, status, priority)
             VALUES (1, 1, 'default', 'm1,m2,m3,m4', 1, 0)",
        )
        .await
        .unwrap();

    let mut dest = Database::connect(&detect(fixture.target.to_str().unwrap()))
        .await
        .unwrap();
    let outcome = AbilityRebuilder::new(2).rebuild(&mut dest).await;
    dest.close().await.unwrap();

    assert!(
        matches!(outcome, RebuildOutcome::Failed { .. }),
        "unexpected rebuild outcome: {:?}",
        outcome
    );
    assert_eq!(count(&mut target, "abilities").await, 0);
}

#[tokio::test]
async fn test_rebuild_skipped_when_channels_lacks_status() {
    let target_schema = &[
        "CREATE TABLE channels (id INTEGER PRIMARY KEY, `group` TEXT, models TEXT, priority INTEGER)",
        TARGET_SCHEMA[3],
    ];
    let fixture = Fixture::new(&[], target_schema).await;
    let mut target = fixture.target_conn().await;
    target
        .execute("INSERT INTO channels (id, `group`, models) VALUES (1, 'default', 'gpt-4')")
        .await
        .unwrap();

    let mut dest = Database::connect(&detect(fixture.target.to_str().unwrap()))
        .await
        .unwrap();
    let outcome = AbilityRebuilder::new(500).rebuild(&mut dest).await;
    dest.close().await.unwrap();

    assert_eq!(
        outcome,
        RebuildOutcome::Skipped {
            reason: "channels lacks columns: status".into()
        }
    );
    assert_eq!(count(&mut target, "abilities").await, 0);
}

#[tokio::test]
async fn test_table_without_common_columns_is_skipped() {
    let fixture = Fixture::new(
        &["CREATE TABLE options (a TEXT)"],
        &["CREATE TABLE options (b TEXT)"],
    )
    .await;
    let mut source = fixture.source_conn().await;
    source
        .execute("INSERT INTO options (a) VALUES ('x')")
        .await
        .unwrap();
    source.close().await.unwrap();

    let mut config = fixture.config();
    config.migration.tables = vec!["options".into()];
    config.migration.rebuild_abilities = false;
    let result = fixture.run(config).await;

    let report = result.tables.iter().find(|r| r.table == "options").unwrap();
    assert_eq!(
        report.outcome,
        TableOutcome::Skipped {
            reason: "no common columns".into()
        }
    );
    assert_eq!(report.dropped_columns, vec!["a".to_string()]);
    assert_eq!(result.tables_skipped, 1);

    let mut target = fixture.target_conn().await;
    assert_eq!(count(&mut target, "options").await, 0);
}
