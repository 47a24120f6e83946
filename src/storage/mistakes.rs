//! 错题仓库
//!
//! 保存时不去重；删除即视为“已解决”，奖励 25 经验。

use std::sync::Arc;

use crate::storage::collection::{load_list, store_json};
use crate::storage::events::{ChangeEvent, ChangeNotifier, CollectionKind};
use crate::storage::kv::KeyValueStore;
use crate::storage::models::{Mistake, MistakeCategory, TargetLanguage};
use crate::storage::profile::ProfileRepository;
use crate::storage::stats::{Reward, StatsLedger};
use crate::storage::{StorageKey, StorageResult};

/// 错题仓库
#[derive(Clone)]
pub struct MistakeRepository {
    store: Arc<dyn KeyValueStore>,
    notifier: ChangeNotifier,
    profile: ProfileRepository,
    stats: StatsLedger,
}

impl MistakeRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: ChangeNotifier) -> Self {
        Self {
            profile: ProfileRepository::new(Arc::clone(&store), notifier.clone()),
            stats: StatsLedger::new(Arc::clone(&store), notifier.clone()),
            store,
            notifier,
        }
    }

    pub fn get_all(&self) -> StorageResult<Vec<Mistake>> {
        load_list(&*self.store, StorageKey::Mistakes)
    }

    /// 记录错题（插入到最前面，不奖励经验）
    pub fn save(&self, mut mistake: Mistake) -> StorageResult<()> {
        let mut mistakes = self.get_all()?;
        mistake.language = Some(self.profile.target_language()?);
        mistakes.insert(0, mistake);
        self.persist(&mistakes)
    }

    /// 标记为已解决：移除并奖励 25 经验
    ///
    /// 返回记录是否存在；即使不存在也会发放奖励。
    pub fn resolve(&self, id: &str) -> StorageResult<bool> {
        let mut mistakes = self.get_all()?;
        let before = mistakes.len();
        mistakes.retain(|m| m.id != id);
        let removed = mistakes.len() != before;

        if removed {
            self.persist(&mistakes)?;
        }
        self.stats.award(Reward::MistakeResolved)?;

        Ok(removed)
    }

    /// 同 [`MistakeRepository::resolve`]
    pub fn remove(&self, id: &str) -> StorageResult<bool> {
        self.resolve(id)
    }

    pub fn list_by_language(&self, language: TargetLanguage) -> StorageResult<Vec<Mistake>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|m| m.language() == language)
            .collect())
    }

    pub fn list_by_category(&self, category: MistakeCategory) -> StorageResult<Vec<Mistake>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|m| m.category == category)
            .collect())
    }

    fn persist(&self, mistakes: &[Mistake]) -> StorageResult<()> {
        store_json(&*self.store, StorageKey::Mistakes, mistakes)?;
        self.notifier
            .emit(ChangeEvent::CollectionUpdated(CollectionKind::Mistakes));
        Ok(())
    }
}
