//! SQLite 键值存储
//!
//! 将持久化键空间落盘到单个 SQLite 文件的 `kv_store` 表中，
//! 批量写入在同一事务内完成。

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection};

use crate::storage::kv::KeyValueStore;
use crate::storage::{migrations, StorageError, StorageResult};

/// SQLite 键值存储
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

impl SqliteStore {
    /// 打开（或创建）数据库文件
    ///
    /// 自动创建父目录、启用 WAL 模式，并运行迁移。
    pub fn open<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut connection = Connection::open(path)?;
        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        migrations::upgrade_schema(&mut connection)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(connection)),
            db_path: path.to_string_lossy().to_string(),
        })
    }

    /// 创建内存数据库（用于测试）
    pub fn in_memory() -> StorageResult<Self> {
        let mut connection = Connection::open_in_memory()?;
        migrations::upgrade_schema(&mut connection)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(connection)),
            db_path: ":memory:".to_string(),
        })
    }

    /// 获取数据库路径
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    fn get_conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    /// 列出全部已存储的键
    pub fn keys(&self) -> StorageResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn upsert(conn: &Connection, key: &str, value: &str) -> StorageResult<()> {
        conn.execute(
            r#"
            INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::upsert(&conn, key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }

    fn write_batch(&self, entries: &[(String, String)]) -> StorageResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        for (key, value) in entries {
            Self::upsert(&tx, key, value)?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_store_in_memory() {
        let store = SqliteStore::in_memory().expect("Failed to create in-memory store");
        assert_eq!(store.db_path(), ":memory:");
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_sqlite_store_crud() {
        let store = SqliteStore::in_memory().unwrap();

        store.set("nexus_stats", "{}").unwrap();
        assert_eq!(store.get("nexus_stats").unwrap(), Some("{}".to_string()));

        store.set("nexus_stats", "{\"xp\":1}").unwrap();
        assert_eq!(
            store.get("nexus_stats").unwrap(),
            Some("{\"xp\":1}".to_string())
        );

        assert!(store.remove("nexus_stats").unwrap());
        assert!(!store.remove("nexus_stats").unwrap());
        assert_eq!(store.get("nexus_stats").unwrap(), None);
    }

    #[test]
    fn test_sqlite_store_write_batch() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .write_batch(&[
                ("nexus_vocab".to_string(), "[]".to_string()),
                ("nexus_mistakes".to_string(), "[]".to_string()),
            ])
            .unwrap();

        assert_eq!(
            store.keys().unwrap(),
            vec!["nexus_mistakes".to_string(), "nexus_vocab".to_string()]
        );
    }

    #[test]
    fn test_sqlite_store_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("nexus.db");

        {
            let store = SqliteStore::open(&path).expect("Failed to open store");
            store.set("nexus_profile", "{\"username\":\"Ana\"}").unwrap();
        }

        let reopened = SqliteStore::open(&path).expect("Failed to reopen store");
        assert_eq!(
            reopened.get("nexus_profile").unwrap(),
            Some("{\"username\":\"Ana\"}".to_string())
        );
    }
}
