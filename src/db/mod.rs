use std::path::Path;
use std::time::Duration;

use log::info;
use sqlx::sqlite::*;

pub mod crud;
pub mod model;

pub use model::*;

pub type Database = SqlitePool;

/// 连接池大小。SQLite 同一时间只有一个写者，连接多了只会增加锁等待
const MAX_CONNECTIONS: u32 = 4;

/// 并发回填和重建索引会同时写入，拿不到写锁时最多等待的时间
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// 打开商品库并执行迁移
pub async fn init_db(filename: impl AsRef<Path>) -> Result<Database, sqlx::Error> {
    let filename = filename.as_ref();
    info!("打开商品库: {}", filename.display());

    let options = SqliteConnectOptions::new()
        .filename(filename)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    sqlx::migrate!().run(&pool).await?;
    info!("商品库就绪");

    Ok(pool)
}
