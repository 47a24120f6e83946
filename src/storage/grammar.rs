//! 语法图表仓库

use std::sync::Arc;

use tracing::debug;

use crate::storage::collection::{load_list, store_json};
use crate::storage::events::{ChangeEvent, ChangeNotifier, CollectionKind};
use crate::storage::kv::KeyValueStore;
use crate::storage::models::{CustomSection, GrammarChart, TargetLanguage};
use crate::storage::profile::ProfileRepository;
use crate::storage::stats::{Reward, StatsLedger};
use crate::storage::{StorageKey, StorageResult};

/// 语法图表仓库，标题唯一
#[derive(Clone)]
pub struct GrammarRepository {
    store: Arc<dyn KeyValueStore>,
    notifier: ChangeNotifier,
    profile: ProfileRepository,
    stats: StatsLedger,
}

impl GrammarRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: ChangeNotifier) -> Self {
        Self {
            profile: ProfileRepository::new(Arc::clone(&store), notifier.clone()),
            stats: StatsLedger::new(Arc::clone(&store), notifier.clone()),
            store,
            notifier,
        }
    }

    pub fn get_all(&self) -> StorageResult<Vec<GrammarChart>> {
        load_list(&*self.store, StorageKey::GrammarCharts)
    }

    /// 保存图表；标题已存在时返回 false，成功时奖励 50 经验（语法技能）
    pub fn save(&self, mut chart: GrammarChart) -> StorageResult<bool> {
        let mut charts = self.get_all()?;
        if charts.iter().any(|c| c.title == chart.title) {
            debug!(title = %chart.title, "图表已存在，跳过保存");
            return Ok(false);
        }

        chart.language = Some(self.profile.target_language()?);
        charts.insert(0, chart);
        self.persist(&charts)?;
        self.stats.award(Reward::GrammarChartSaved)?;

        Ok(true)
    }

    pub fn remove(&self, id: &str) -> StorageResult<bool> {
        let mut charts = self.get_all()?;
        let before = charts.len();
        charts.retain(|c| c.id != id);
        if charts.len() == before {
            return Ok(false);
        }

        self.persist(&charts)?;
        Ok(true)
    }

    /// 为图表追加扩展段落
    pub fn add_custom_section(
        &self,
        chart_id: &str,
        section: CustomSection,
    ) -> StorageResult<Option<GrammarChart>> {
        let mut charts = self.get_all()?;
        let Some(chart) = charts.iter_mut().find(|c| c.id == chart_id) else {
            return Ok(None);
        };
        chart.custom_sections.push(section);
        let updated = chart.clone();

        self.persist(&charts)?;
        Ok(Some(updated))
    }

    pub fn list_by_language(&self, language: TargetLanguage) -> StorageResult<Vec<GrammarChart>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|c| c.language() == language)
            .collect())
    }

    fn persist(&self, charts: &[GrammarChart]) -> StorageResult<()> {
        store_json(&*self.store, StorageKey::GrammarCharts, charts)?;
        self.notifier
            .emit(ChangeEvent::CollectionUpdated(CollectionKind::GrammarCharts));
        Ok(())
    }
}
