//! 学习计划仓库
//!
//! 旧版本以纯文本保存计划，读取到非数组内容时视为空计划。

use std::sync::Arc;

use crate::storage::collection::{load_list, store_json};
use crate::storage::events::{ChangeEvent, ChangeNotifier, CollectionKind};
use crate::storage::kv::KeyValueStore;
use crate::storage::models::StudyDay;
use crate::storage::stats::{Reward, StatsLedger};
use crate::storage::{StorageKey, StorageResult};

/// 学习计划仓库
#[derive(Clone)]
pub struct StudyPlanRepository {
    store: Arc<dyn KeyValueStore>,
    notifier: ChangeNotifier,
    stats: StatsLedger,
}

impl StudyPlanRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: ChangeNotifier) -> Self {
        Self {
            stats: StatsLedger::new(Arc::clone(&store), notifier.clone()),
            store,
            notifier,
        }
    }

    pub fn get_plan(&self) -> StorageResult<Vec<StudyDay>> {
        load_list(&*self.store, StorageKey::StudyPlan)
    }

    pub fn save_plan(&self, plan: &[StudyDay]) -> StorageResult<()> {
        store_json(&*self.store, StorageKey::StudyPlan, plan)?;
        self.notifier
            .emit(ChangeEvent::CollectionUpdated(CollectionKind::StudyPlan));
        Ok(())
    }

    /// 切换任务完成状态
    ///
    /// 任务变为完成时奖励 15 经验；天数或任务不存在时原样返回计划。
    pub fn toggle_task(&self, day_index: usize, task_id: &str) -> StorageResult<Vec<StudyDay>> {
        let mut plan = self.get_plan()?;

        let Some(task) = plan
            .get_mut(day_index)
            .and_then(|day| day.tasks.iter_mut().find(|t| t.id == task_id))
        else {
            return Ok(plan);
        };

        task.completed = !task.completed;
        let completed = task.completed;

        if completed {
            self.stats.award(Reward::StudyTaskCompleted)?;
        }
        self.save_plan(&plan)?;

        Ok(plan)
    }

    /// 已完成任务数 / 任务总数
    pub fn completion(&self) -> StorageResult<(usize, usize)> {
        let plan = self.get_plan()?;
        let total = plan.iter().map(|d| d.tasks.len()).sum();
        let done = plan
            .iter()
            .flat_map(|d| d.tasks.iter())
            .filter(|t| t.completed)
            .count();
        Ok((done, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kv::MemoryStore;
    use crate::storage::models::StudyTask;

    fn setup() -> (StudyPlanRepository, StatsLedger, Arc<dyn KeyValueStore>) {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let notifier = ChangeNotifier::new();
        (
            StudyPlanRepository::new(Arc::clone(&store), notifier.clone()),
            StatsLedger::new(Arc::clone(&store), notifier),
            store,
        )
    }

    fn create_plan() -> Vec<StudyDay> {
        vec![StudyDay {
            day_label: "Monday".to_string(),
            focus_area: "Listening".to_string(),
            tasks: vec![
                StudyTask {
                    id: "t1".to_string(),
                    description: "Podcast episode".to_string(),
                    completed: false,
                },
                StudyTask::new("Shadowing"),
            ],
        }]
    }

    #[test]
    fn test_legacy_string_plan_reads_as_empty() {
        let (repo, _, store) = setup();
        store
            .set(StorageKey::StudyPlan.as_str(), "Lunes: leer 20 minutos")
            .unwrap();

        assert!(repo.get_plan().unwrap().is_empty());
    }

    #[test]
    fn test_toggle_task_awards_on_completion_only() {
        let (repo, stats, _) = setup();
        repo.save_plan(&create_plan()).unwrap();

        let plan = repo.toggle_task(0, "t1").unwrap();
        assert!(plan[0].tasks[0].completed);
        assert_eq!(stats.get_stats().unwrap().xp, 15);

        let plan = repo.toggle_task(0, "t1").unwrap();
        assert!(!plan[0].tasks[0].completed);
        assert_eq!(stats.get_stats().unwrap().xp, 15);
    }

    #[test]
    fn test_toggle_unknown_task_is_noop() {
        let (repo, stats, _) = setup();
        repo.save_plan(&create_plan()).unwrap();

        let stored = repo.get_plan().unwrap();

        assert_eq!(repo.toggle_task(3, "t1").unwrap(), stored);
        assert_eq!(repo.toggle_task(0, "missing").unwrap(), stored);
        assert_eq!(stats.get_stats().unwrap().xp, 0);
    }

    #[test]
    fn test_completion() {
        let (repo, _, _) = setup();
        repo.save_plan(&create_plan()).unwrap();
        repo.toggle_task(0, "t1").unwrap();

        assert_eq!(repo.completion().unwrap(), (1, 2));
    }
}
