//! 用户档案与导航顺序

use std::sync::Arc;

use crate::storage::collection::{load_json, load_list, store_json};
use crate::storage::events::{ChangeEvent, ChangeNotifier};
use crate::storage::kv::KeyValueStore;
use crate::storage::models::{ProficiencyLevel, Profile, TargetLanguage};
use crate::storage::{StorageKey, StorageResult};

/// 用户档案仓库
#[derive(Clone)]
pub struct ProfileRepository {
    store: Arc<dyn KeyValueStore>,
    notifier: ChangeNotifier,
}

impl ProfileRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: ChangeNotifier) -> Self {
        Self { store, notifier }
    }

    /// 获取档案，不存在时返回默认档案
    pub fn get_profile(&self) -> StorageResult<Profile> {
        Ok(load_json(&*self.store, StorageKey::Profile)?.unwrap_or_default())
    }

    /// 保存档案（整体覆盖）
    pub fn save_profile(&self, profile: &Profile) -> StorageResult<()> {
        store_json(&*self.store, StorageKey::Profile, profile)?;
        self.notifier.emit(ChangeEvent::ProfileUpdated);
        Ok(())
    }

    /// 当前目标语言
    pub fn target_language(&self) -> StorageResult<TargetLanguage> {
        Ok(self.get_profile()?.target_language)
    }

    /// 切换到下一个语言水平并保存
    pub fn cycle_level(&self) -> StorageResult<ProficiencyLevel> {
        let mut profile = self.get_profile()?;
        profile.level = profile.level.next();
        self.save_profile(&profile)?;
        Ok(profile.level)
    }

    /// 获取保存的导航顺序
    pub fn get_nav_order(&self) -> StorageResult<Vec<String>> {
        load_list(&*self.store, StorageKey::NavOrder)
    }

    /// 保存导航顺序
    pub fn save_nav_order(&self, order: &[String]) -> StorageResult<()> {
        store_json(&*self.store, StorageKey::NavOrder, order)?;
        self.notifier.emit(ChangeEvent::ProfileUpdated);
        Ok(())
    }

    /// 结合已知入口整理导航顺序
    ///
    /// 保存的顺序中去掉未知或重复的入口，再把缺失的已知入口按原顺序追加到末尾。
    /// 没有保存过顺序时直接返回 `known_ids`。
    pub fn resolved_nav_order(&self, known_ids: &[&str]) -> StorageResult<Vec<String>> {
        let saved = self.get_nav_order()?;
        if saved.is_empty() {
            return Ok(known_ids.iter().map(|id| id.to_string()).collect());
        }

        let mut order: Vec<String> = Vec::with_capacity(known_ids.len());
        for id in saved {
            if known_ids.contains(&id.as_str()) && !order.contains(&id) {
                order.push(id);
            }
        }
        for id in known_ids {
            if !order.iter().any(|existing| existing == id) {
                order.push(id.to_string());
            }
        }

        Ok(order)
    }
}
