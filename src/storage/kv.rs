//! 键值存储端口
//!
//! 所有 Repository 只依赖 [`KeyValueStore`]，具体实现可以是内存、SQLite 文件等。

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::storage::{StorageError, StorageResult};

/// 同步、字符串键的持久化端口
pub trait KeyValueStore: Send + Sync {
    /// 读取键值，不存在时返回 None
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// 写入键值（覆盖）
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// 删除键，返回是否存在过
    fn remove(&self, key: &str) -> StorageResult<bool>;

    /// 批量写入
    ///
    /// 默认实现逐条写入；支持事务的实现应当覆盖此方法，保证全部成功或全部失败。
    fn write_batch(&self, entries: &[(String, String)]) -> StorageResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// 内存键值存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> StorageResult<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    /// 当前键数量
    pub fn len(&self) -> usize {
        self.entries().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        Ok(self.entries()?.remove(key).is_some())
    }

    fn write_batch(&self, entries: &[(String, String)]) -> StorageResult<()> {
        // 持有一次锁完成全部写入
        let mut guard = self.entries()?;
        for (key, value) in entries {
            guard.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}
