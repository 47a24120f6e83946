//! 写作记录仓库

use std::sync::Arc;

use crate::storage::collection::{load_list, store_json};
use crate::storage::events::{ChangeEvent, ChangeNotifier, CollectionKind};
use crate::storage::kv::KeyValueStore;
use crate::storage::models::{WritingSubmission, MAX_WRITING_SCORE};
use crate::storage::stats::{Reward, StatsLedger};
use crate::storage::{StorageKey, StorageResult};

/// 写作记录仓库，按提交时间倒序
#[derive(Clone)]
pub struct WritingRepository {
    store: Arc<dyn KeyValueStore>,
    notifier: ChangeNotifier,
    stats: StatsLedger,
}

impl WritingRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: ChangeNotifier) -> Self {
        Self {
            stats: StatsLedger::new(Arc::clone(&store), notifier.clone()),
            store,
            notifier,
        }
    }

    /// 全部记录，最新提交在前
    pub fn get_all(&self) -> StorageResult<Vec<WritingSubmission>> {
        let mut submissions: Vec<WritingSubmission> =
            load_list(&*self.store, StorageKey::Writing)?;
        sort_newest_first(&mut submissions);
        Ok(submissions)
    }

    /// 保存写作记录并奖励 100 经验（写作技能）
    pub fn save(&self, mut submission: WritingSubmission) -> StorageResult<()> {
        submission.score = submission.score.clamp(0, MAX_WRITING_SCORE);

        let mut submissions = self.get_all()?;
        submissions.insert(0, submission);
        sort_newest_first(&mut submissions);
        self.persist(&submissions)?;
        self.stats.award(Reward::WritingSubmitted)?;

        Ok(())
    }

    pub fn remove(&self, id: &str) -> StorageResult<bool> {
        let mut submissions = self.get_all()?;
        let before = submissions.len();
        submissions.retain(|s| s.id != id);
        if submissions.len() == before {
            return Ok(false);
        }

        self.persist(&submissions)?;
        Ok(true)
    }

    /// 平均得分，没有记录时返回 None
    pub fn average_score(&self) -> StorageResult<Option<f64>> {
        let submissions = self.get_all()?;
        if submissions.is_empty() {
            return Ok(None);
        }
        let total: i64 = submissions.iter().map(|s| i64::from(s.score)).sum();
        Ok(Some(total as f64 / submissions.len() as f64))
    }

    fn persist(&self, submissions: &[WritingSubmission]) -> StorageResult<()> {
        store_json(&*self.store, StorageKey::Writing, submissions)?;
        self.notifier
            .emit(ChangeEvent::CollectionUpdated(CollectionKind::Writing));
        Ok(())
    }
}

/// 按提交时间倒序（稳定排序）
pub(crate) fn sort_newest_first(submissions: &mut [WritingSubmission]) {
    submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
}
