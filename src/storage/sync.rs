//! 快照同步模块
//!
//! 负责本地数据的导出与合并，包括：
//! - 全量快照导出（base64 编码的 JSON）
//! - 按数据分区合并外部快照（求和、取最大值、平均、去重）
//! - 旧版覆盖式导入
//!
//! 合并前会先解码并校验所有分区，任何一个分区无效都不会写入任何数据。
//! 与本地内容完全相同的分区直接跳过；需要合并的本地分区严格解析，
//! 本地数据损坏时中止合并，保留原始内容。

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use crate::storage::events::{ChangeEvent, ChangeNotifier};
use crate::storage::kv::KeyValueStore;
use crate::storage::models::{
    level_for_xp, GrammarChart, Mistake, Skill, SkillRatings, StatsRecord, StudyDay, VocabCard,
    WritingSubmission,
};
use crate::storage::writing::sort_newest_first;
use crate::storage::{StorageError, StorageKey, StorageResult};

/// 没有任何新增时的合并摘要
pub const NOTHING_TO_MERGE: &str = "所有数据已同步，无需合并";

// ============================================================
// Snapshot - 快照
// ============================================================

/// 全量快照：键 -> 原始存储字符串
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: BTreeMap<String, Option<String>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: StorageKey, value: impl Into<String>) {
        self.entries.insert(key.as_str().to_string(), Some(value.into()));
    }

    /// 取分区内容，空字符串与 null 视为不存在
    pub fn section(&self, key: StorageKey) -> Option<&str> {
        self.entries
            .get(key.as_str())
            .and_then(|v| v.as_deref())
            .filter(|v| !v.is_empty())
    }

    /// 编码为可复制的令牌
    pub fn encode(&self) -> StorageResult<String> {
        let json = serde_json::to_string(self)?;
        Ok(STANDARD.encode(json.as_bytes()))
    }

    /// 解码令牌，忽略所有空白字符（含换行）
    pub fn decode(token: &str) -> StorageResult<Self> {
        let compact: String = token
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        if compact.is_empty() {
            return Err(StorageError::Decode("令牌为空".to_string()));
        }

        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| StorageError::Decode(format!("base64 无效: {}", e)))?;
        let json = String::from_utf8(bytes)
            .map_err(|e| StorageError::Decode(format!("非 UTF-8 内容: {}", e)))?;

        serde_json::from_str(&json)
            .map_err(|e| StorageError::Decode(format!("快照结构无效: {}", e)))
    }

    /// 与另一份快照内容不同的分区
    fn changed_section(&self, other: &Snapshot, key: StorageKey) -> Option<&str> {
        self.section(key).filter(|raw| other.section(key) != Some(*raw))
    }

    fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }
}

// ============================================================
// MergeReport - 合并结果
// ============================================================

/// 合并结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub success: bool,
    /// 可读摘要
    pub summary: String,
    pub xp_added: i64,
    pub words_added: usize,
    pub charts_added: usize,
    pub mistakes_added: usize,
    pub writings_added: usize,
    pub plan_adopted: bool,
}

impl MergeReport {
    fn failed(error: &StorageError) -> Self {
        Self {
            success: false,
            summary: format!("合并失败: {}", error),
            ..Self::default()
        }
    }

    /// 是否合并了任何新数据
    pub fn has_changes(&self) -> bool {
        self.summary != NOTHING_TO_MERGE
    }

    fn build_summary(&mut self, stats_merged: bool) {
        let mut parts = Vec::new();
        if stats_merged {
            parts.push(format!("+{} XP", self.xp_added));
        }
        if self.words_added > 0 {
            parts.push(format!("{} 个新单词", self.words_added));
        }
        if self.charts_added > 0 {
            parts.push(format!("{} 张语法图表", self.charts_added));
        }
        if self.mistakes_added > 0 {
            parts.push(format!("{} 条错题", self.mistakes_added));
        }
        if self.writings_added > 0 {
            parts.push(format!("{} 篇写作", self.writings_added));
        }
        if self.plan_adopted {
            parts.push("学习计划".to_string());
        }

        self.summary = if parts.is_empty() {
            NOTHING_TO_MERGE.to_string()
        } else {
            parts.join(", ")
        };
    }
}

// ============================================================
// 外部统计记录
// ============================================================

/// 快照中的统计分区
///
/// 缺失字段使用与本地读取相同的默认值；`rated` 记录快照实际携带的技能，
/// 其余技能合并时保留本地值。
#[derive(Debug, Clone)]
struct IncomingStats {
    record: StatsRecord,
    rated: Vec<Skill>,
}

impl<'de> Deserialize<'de> for IncomingStats {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let rated = match value.get("skills").and_then(serde_json::Value::as_object) {
            Some(skills) => Skill::ALL
                .iter()
                .copied()
                .filter(|s| skills.contains_key(s.key()))
                .collect(),
            None => Vec::new(),
        };
        let record = StatsRecord::deserialize(value)
            .map_err(<D::Error as serde::de::Error>::custom)?;
        Ok(Self { record, rated })
    }
}

/// 合并统计
///
/// 经验与计数求和，等级与连续天数取最大值，技能取平均（四舍五入），
/// 考试成绩逐项取高分。最后活跃时间保留本地值。
fn merge_stats(local: &StatsRecord, incoming: &IncomingStats) -> StatsRecord {
    let rated = &incoming.rated;
    let incoming = &incoming.record;
    let mut merged = local.clone();

    merged.xp = local.xp.saturating_add(incoming.xp).max(0);
    merged.words_learned = local.words_learned.saturating_add(incoming.words_learned);
    merged.mistakes_fixed = local.mistakes_fixed.saturating_add(incoming.mistakes_fixed);
    merged.level = local
        .level
        .max(incoming.level)
        .max(level_for_xp(merged.xp));
    merged.streak = local.streak.max(incoming.streak);

    for &skill in rated {
        let ours = i64::from(local.skills.get(skill));
        let theirs = i64::from(incoming.skills.get(skill));
        let avg = (ours + theirs + 1).div_euclid(2);
        merged
            .skills
            .set(skill, avg.clamp(0, i64::from(SkillRatings::MAX)) as i32);
    }

    for (exam_id, score) in &incoming.exam_high_scores {
        let best = merged.exam_high_scores.entry(exam_id.clone()).or_insert(*score);
        if *score > *best {
            *best = *score;
        }
    }

    merged
}

/// 按自然键追加本地没有的记录，返回新增数量
fn append_missing<T, F>(local: &mut Vec<T>, incoming: Vec<T>, key: F) -> usize
where
    F: Fn(&T) -> String,
{
    let mut seen: HashSet<String> = local.iter().map(&key).collect();
    let before = local.len();
    for item in incoming {
        if seen.insert(key(&item)) {
            local.push(item);
        }
    }
    local.len() - before
}

// ============================================================
// SyncEngine - 同步引擎
// ============================================================

/// 已解码并校验过的快照分区
#[derive(Default)]
struct Sections {
    stats: Option<IncomingStats>,
    vocabulary: Option<Vec<VocabCard>>,
    grammar: Option<Vec<GrammarChart>>,
    mistakes: Option<Vec<Mistake>>,
    writing: Option<Vec<WritingSubmission>>,
    plan: Option<Vec<StudyDay>>,
}

impl Sections {
    /// 解析与本地内容不同的分区
    fn parse(incoming: &Snapshot, current: &Snapshot) -> StorageResult<Self> {
        let changed = |key: StorageKey| incoming.changed_section(current, key);
        Ok(Self {
            stats: parse_incoming(StorageKey::Stats, changed(StorageKey::Stats))?,
            vocabulary: parse_incoming(StorageKey::Vocabulary, changed(StorageKey::Vocabulary))?,
            grammar: parse_incoming(
                StorageKey::GrammarCharts,
                changed(StorageKey::GrammarCharts),
            )?,
            mistakes: parse_incoming(StorageKey::Mistakes, changed(StorageKey::Mistakes))?,
            writing: parse_incoming(StorageKey::Writing, changed(StorageKey::Writing))?,
            // 旧版纯文本计划无法合并，直接忽略
            plan: changed(StorageKey::StudyPlan).and_then(|raw| serde_json::from_str(raw).ok()),
        })
    }
}

/// 严格解析快照分区，内容无效时返回解码错误
fn parse_incoming<T: DeserializeOwned>(
    key: StorageKey,
    raw: Option<&str>,
) -> StorageResult<Option<T>> {
    raw.map(|raw| serde_json::from_str(raw))
        .transpose()
        .map_err(|e| StorageError::Decode(format!("{} 分区无效: {}", key, e)))
}

/// 严格解析本地分区，本地数据损坏时返回错误
fn parse_local<T: DeserializeOwned>(
    current: &Snapshot,
    key: StorageKey,
) -> StorageResult<Option<T>> {
    current
        .section(key)
        .map(|raw| serde_json::from_str(raw))
        .transpose()
        .map_err(|e| StorageError::Corrupted(format!("{} 无法解析: {}", key, e)))
}

/// 同步引擎
#[derive(Clone)]
pub struct SyncEngine {
    store: Arc<dyn KeyValueStore>,
    notifier: ChangeNotifier,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: ChangeNotifier) -> Self {
        Self { store, notifier }
    }

    /// 读取全部持久化键的当前内容
    fn snapshot(&self) -> StorageResult<Snapshot> {
        let mut snapshot = Snapshot::new();
        for key in StorageKey::ALL {
            let value = self.store.get(key.as_str())?;
            snapshot.entries.insert(key.as_str().to_string(), value);
        }
        Ok(snapshot)
    }

    /// 导出全部持久化键的快照
    pub fn export(&self) -> StorageResult<String> {
        self.snapshot()?.encode()
    }

    /// 合并外部快照
    ///
    /// 失败时返回 `success = false` 且不修改任何数据。
    pub fn merge(&self, token: &str) -> MergeReport {
        match self.try_merge(token) {
            Ok(report) => {
                info!(summary = %report.summary, "快照合并完成");
                self.notifier.emit(ChangeEvent::Synced);
                report
            }
            Err(e) => {
                warn!(error = %e, "快照合并失败");
                MergeReport::failed(&e)
            }
        }
    }

    fn try_merge(&self, token: &str) -> StorageResult<MergeReport> {
        let snapshot = Snapshot::decode(token)?;
        let current = self.snapshot()?;
        let sections = Sections::parse(&snapshot, &current)?;

        let mut report = MergeReport {
            success: true,
            ..MergeReport::default()
        };
        let mut writes: Vec<(String, String)> = Vec::new();

        // 1. 统计
        let mut stats_merged = false;
        if let Some(incoming) = &sections.stats {
            let local: StatsRecord =
                parse_local(&current, StorageKey::Stats)?.unwrap_or_default();
            if !incoming.record.same_progress(&local) {
                let merged = merge_stats(&local, incoming);
                writes.push(entry(StorageKey::Stats, &merged)?);
                report.xp_added = incoming.record.xp;
                stats_merged = true;
            }
        }

        // 2. 单词卡（按词条去重）
        if let Some(incoming) = sections.vocabulary {
            let mut local: Vec<VocabCard> =
                parse_local(&current, StorageKey::Vocabulary)?.unwrap_or_default();
            report.words_added = append_missing(&mut local, incoming, |c| c.headword.clone());
            if report.words_added > 0 {
                writes.push(entry(StorageKey::Vocabulary, &local)?);
            }
        }

        // 3. 语法图表（按标题去重）
        if let Some(incoming) = sections.grammar {
            let mut local: Vec<GrammarChart> =
                parse_local(&current, StorageKey::GrammarCharts)?.unwrap_or_default();
            report.charts_added = append_missing(&mut local, incoming, |c| c.title.clone());
            if report.charts_added > 0 {
                writes.push(entry(StorageKey::GrammarCharts, &local)?);
            }
        }

        // 4. 错题（按题目去重）
        if let Some(incoming) = sections.mistakes {
            let mut local: Vec<Mistake> =
                parse_local(&current, StorageKey::Mistakes)?.unwrap_or_default();
            report.mistakes_added = append_missing(&mut local, incoming, |m| m.prompt_text.clone());
            if report.mistakes_added > 0 {
                writes.push(entry(StorageKey::Mistakes, &local)?);
            }
        }

        // 5. 写作（按 ID 去重，按日期倒序）
        if let Some(incoming) = sections.writing {
            let mut local: Vec<WritingSubmission> =
                parse_local(&current, StorageKey::Writing)?.unwrap_or_default();
            report.writings_added = append_missing(&mut local, incoming, |w| w.id.clone());
            if report.writings_added > 0 {
                sort_newest_first(&mut local);
                writes.push(entry(StorageKey::Writing, &local)?);
            }
        }

        // 6. 学习计划（本地为空时整体采用）
        if let Some(incoming) = sections.plan.filter(|p| !p.is_empty()) {
            // 本地无法解析的旧版计划保留原样
            let local_is_empty = match current.section(StorageKey::StudyPlan) {
                None => true,
                Some(raw) => serde_json::from_str::<Vec<StudyDay>>(raw)
                    .map(|plan| plan.is_empty())
                    .unwrap_or(false),
            };
            if local_is_empty {
                writes.push(entry(StorageKey::StudyPlan, &incoming)?);
                report.plan_adopted = true;
            }
        }

        if !writes.is_empty() {
            self.store.write_batch(&writes)?;
        }
        report.build_summary(stats_merged);

        Ok(report)
    }

    /// 旧版覆盖导入：用快照中非空的值覆盖对应键
    pub fn import(&self, token: &str) -> bool {
        let snapshot = match Snapshot::decode(token) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "快照导入失败");
                return false;
            }
        };

        let writes: Vec<(String, String)> = snapshot
            .iter()
            .filter_map(|(key, value)| {
                let key = StorageKey::parse(key)?;
                let value = value.filter(|v| !v.is_empty())?;
                Some((key.as_str().to_string(), value.to_string()))
            })
            .collect();

        if let Err(e) = self.store.write_batch(&writes) {
            warn!(error = %e, "快照导入写入失败");
            return false;
        }

        info!(keys = writes.len(), "快照导入完成");
        self.notifier.emit(ChangeEvent::Synced);
        true
    }
}

fn entry<T: Serialize + ?Sized>(key: StorageKey, value: &T) -> StorageResult<(String, String)> {
    Ok((key.as_str().to_string(), serde_json::to_string(value)?))
}

// ============================================================
// 测试
// ============================================================
