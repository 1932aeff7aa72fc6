//! Test-only helpers: databases with migrations applied and shortcuts for
//! seeding participants and gifts.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::config::{Config, DatabaseConfig, RateLimitConfig, ServerConfig, TurnOrderConfig};
use crate::services::init;

/// Single-connection in-memory pool; every connection would otherwise get
/// its own empty database.
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("parse in-memory url")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    pool
}

pub async fn insert_user(pool: &SqlitePool, email: &str, name: &str) -> String {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();

    sqlx::query(
        "INSERT INTO users (id, email, name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(email)
    .bind(name)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .expect("insert user");

    id
}

pub async fn insert_gift(pool: &SqlitePool, user_id: &str, name: &str) -> String {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();

    sqlx::query(
        r#"
        INSERT INTO gifts (id, user_id, name, description, turn_order, created_at, updated_at)
        VALUES (?, ?, ?, NULL, NULL, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(name)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .expect("insert gift");

    id
}

pub async fn delete_gift(pool: &SqlitePool, id: &str) {
    sqlx::query("DELETE FROM gifts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .expect("delete gift");
}

/// Current turn orders keyed by gift id, in insertion order.
pub async fn turn_orders(pool: &SqlitePool) -> Vec<(String, Option<i64>)> {
    sqlx::query_as::<_, (String, Option<i64>)>("SELECT id, turn_order FROM gifts ORDER BY rowid")
        .fetch_all(pool)
        .await
        .expect("read turn orders")
}

/// File-backed pool opened through `init_db`, for tests that need several
/// connections sharing one database.
pub async fn file_pool(max_connections: u32) -> (SqlitePool, PathBuf) {
    let path = std::env::temp_dir().join(format!("family-hub-{}.db", Uuid::new_v4()));
    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            frontend_url: "http://localhost:3000".to_string(),
        },
        database: DatabaseConfig {
            url: format!("sqlite://{}", path.display()),
            max_connections,
        },
        rate_limit: RateLimitConfig {
            shuffle_per_second: 2,
            shuffle_burst: 5,
        },
        turn_order: TurnOrderConfig { seed: None },
    };

    let pool = init::init_db(&config).await.expect("open file database");
    (pool, path)
}

/// Remove a file database together with its WAL side files.
pub fn remove_db_files(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}
