//! 键值存储上的 JSON 读写辅助

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::storage::kv::KeyValueStore;
use crate::storage::{StorageKey, StorageResult};

/// 读取并解析 JSON 值
///
/// 键不存在返回 None；内容无法解析时记录警告并同样返回 None，由调用方使用默认值。
pub(crate) fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: StorageKey,
) -> StorageResult<Option<T>> {
    let Some(raw) = store.get(key.as_str())? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key = %key, error = %e, "存储数据无法解析，使用默认值");
            Ok(None)
        }
    }
}

/// 读取集合，不存在或损坏时返回空列表
pub(crate) fn load_list<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: StorageKey,
) -> StorageResult<Vec<T>> {
    Ok(load_json(store, key)?.unwrap_or_default())
}

/// 序列化并写入
pub(crate) fn store_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: StorageKey,
    value: &T,
) -> StorageResult<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key.as_str(), &raw)
}
