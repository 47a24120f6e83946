//! 单词卡仓库
//!
//! 新卡片插入到列表最前面；同一词条只保存一次。

use std::sync::Arc;

use tracing::debug;

use crate::storage::collection::{load_list, store_json};
use crate::storage::events::{ChangeEvent, ChangeNotifier, CollectionKind};
use crate::storage::kv::KeyValueStore;
use crate::storage::models::{TargetLanguage, VocabCard};
use crate::storage::profile::ProfileRepository;
use crate::storage::stats::{Reward, StatsLedger};
use crate::storage::{StorageKey, StorageResult};

/// 单词卡仓库
#[derive(Clone)]
pub struct VocabularyRepository {
    store: Arc<dyn KeyValueStore>,
    notifier: ChangeNotifier,
    profile: ProfileRepository,
    stats: StatsLedger,
}

impl VocabularyRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: ChangeNotifier) -> Self {
        Self {
            profile: ProfileRepository::new(Arc::clone(&store), notifier.clone()),
            stats: StatsLedger::new(Arc::clone(&store), notifier.clone()),
            store,
            notifier,
        }
    }

    /// 获取全部卡片（最近保存的在前）
    pub fn get_all(&self) -> StorageResult<Vec<VocabCard>> {
        load_list(&*self.store, StorageKey::Vocabulary)
    }

    /// 保存卡片
    ///
    /// 语言取当前档案的目标语言。词条已存在时不做任何修改，返回 false；
    /// 插入成功时奖励 10 经验（词汇技能）。
    pub fn save(&self, mut card: VocabCard) -> StorageResult<bool> {
        let mut cards = self.get_all()?;
        if cards.iter().any(|c| c.headword == card.headword) {
            debug!(headword = %card.headword, "词条已存在，跳过保存");
            return Ok(false);
        }

        card.language = Some(self.profile.target_language()?);
        cards.insert(0, card);
        self.persist(&cards)?;
        self.stats.award(Reward::VocabularySaved)?;

        Ok(true)
    }

    /// 删除卡片，返回是否存在
    pub fn remove(&self, id: &str) -> StorageResult<bool> {
        let mut cards = self.get_all()?;
        let before = cards.len();
        cards.retain(|c| c.id != id);
        if cards.len() == before {
            return Ok(false);
        }

        self.persist(&cards)?;
        Ok(true)
    }

    /// 切换收藏状态，返回更新后的卡片
    pub fn toggle_favorite(&self, id: &str) -> StorageResult<Option<VocabCard>> {
        self.update(id, |card| card.favorite = !card.favorite)
    }

    /// 切换掌握状态，返回更新后的卡片
    pub fn toggle_mastered(&self, id: &str) -> StorageResult<Option<VocabCard>> {
        self.update(id, |card| card.mastered = !card.mastered)
    }

    /// 收藏的卡片
    pub fn favorites(&self) -> StorageResult<Vec<VocabCard>> {
        Ok(self.get_all()?.into_iter().filter(|c| c.favorite).collect())
    }

    /// 按语言筛选（未标注语言的旧卡片视为英语）
    pub fn list_by_language(&self, language: TargetLanguage) -> StorageResult<Vec<VocabCard>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|c| c.language() == language)
            .collect())
    }

    /// 按词条查找
    pub fn find_by_headword(&self, headword: &str) -> StorageResult<Option<VocabCard>> {
        Ok(self.get_all()?.into_iter().find(|c| c.headword == headword))
    }

    fn update<F>(&self, id: &str, f: F) -> StorageResult<Option<VocabCard>>
    where
        F: FnOnce(&mut VocabCard),
    {
        let mut cards = self.get_all()?;
        let Some(card) = cards.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        f(card);
        let updated = card.clone();

        self.persist(&cards)?;
        Ok(Some(updated))
    }

    fn persist(&self, cards: &[VocabCard]) -> StorageResult<()> {
        store_json(&*self.store, StorageKey::Vocabulary, cards)?;
        self.notifier
            .emit(ChangeEvent::CollectionUpdated(CollectionKind::Vocabulary));
        Ok(())
    }
}
