//! kv_store 表结构版本
//!
//! 已执行的版本记在 `schema_migrations` 中，启动时只补跑缺失的步骤。
//! 每一步连同它的版本记录在同一个事务里提交。

use rusqlite::Connection;

use crate::storage::{StorageError, StorageResult};

/// 最新表结构版本
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// 单个版本步骤
#[derive(Debug, Clone, Copy)]
pub struct SchemaStep {
    pub version: i32,
    pub label: &'static str,
    pub sql: &'static str,
}

/// 按版本升序排列的全部步骤
pub const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        label: "kv_store 表",
        sql: "CREATE TABLE IF NOT EXISTS kv_store (
                  key TEXT PRIMARY KEY NOT NULL,
                  value TEXT NOT NULL
              );",
    },
    SchemaStep {
        version: 2,
        label: "kv_store.updated_at",
        sql: "ALTER TABLE kv_store ADD COLUMN updated_at TEXT NOT NULL DEFAULT '';",
    },
];

fn create_ledger_table(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
             version INTEGER PRIMARY KEY,
             name TEXT NOT NULL,
             applied_at INTEGER NOT NULL
         );",
    )
    .map_err(|e| StorageError::Migration(format!("无法建立版本记录表: {e}")))
}

/// 已应用的最高版本，空库为 0
pub fn schema_version(conn: &Connection) -> StorageResult<i32> {
    create_ledger_table(conn)?;
    let version = conn.query_row(
        "SELECT IFNULL(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// 把数据库升级到 [`CURRENT_SCHEMA_VERSION`]，返回升级后的版本
pub fn upgrade_schema(conn: &mut Connection) -> StorageResult<i32> {
    let mut version = schema_version(conn)?;
    if version >= CURRENT_SCHEMA_VERSION {
        return Ok(version);
    }

    tracing::info!(from = version, to = CURRENT_SCHEMA_VERSION, "升级表结构");

    let start = version;
    for step in SCHEMA_STEPS.iter().filter(|step| step.version > start) {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql).map_err(|e| {
            StorageError::Migration(format!("v{} ({}) 执行失败: {e}", step.version, step.label))
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![step.version, step.label, chrono::Utc::now().timestamp()],
        )?;
        tx.commit()?;

        tracing::debug!(version = step.version, label = step.label, "表结构步骤完成");
        version = step.version;
    }

    Ok(version)
}
