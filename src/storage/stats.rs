//! 学习统计账本
//!
//! 维护经验值、派生等级、连续天数、技能评分与考试最高分。
//! 所有学习活动通过 [`StatsLedger::add_experience`] 或 [`StatsLedger::award`] 记账。

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::debug;

use crate::storage::collection::{load_json, store_json};
use crate::storage::events::{ChangeEvent, ChangeNotifier};
use crate::storage::kv::KeyValueStore;
use crate::storage::models::{level_for_xp, Skill, SkillRatings, StatsRecord, XP_PER_LEVEL};
use crate::storage::{StorageKey, StorageResult};

/// 学习活动奖励
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reward {
    /// 保存单词卡
    VocabularySaved,
    /// 保存语法图表
    GrammarChartSaved,
    /// 提交写作
    WritingSubmitted,
    /// 解决错题
    MistakeResolved,
    /// 完成学习计划任务
    StudyTaskCompleted,
    /// 词汇测验答对一题
    QuizCorrectAnswer,
    /// 闪卡测试答对一题
    FlashcardTestCorrect,
    /// 闪卡测试全对
    FlashcardTestPerfect,
    /// 模拟考试答对 n 题，每题 30
    ExamCorrectAnswers(u32),
}

impl Reward {
    pub fn xp(&self) -> i64 {
        match self {
            Reward::VocabularySaved => 10,
            Reward::GrammarChartSaved => 50,
            Reward::WritingSubmitted => 100,
            Reward::MistakeResolved => 25,
            Reward::StudyTaskCompleted => 15,
            Reward::QuizCorrectAnswer => 15,
            Reward::FlashcardTestCorrect => 20,
            Reward::FlashcardTestPerfect => 100,
            Reward::ExamCorrectAnswers(n) => i64::from(*n) * 30,
        }
    }

    /// 奖励关联的技能
    pub fn skill(&self) -> Option<Skill> {
        match self {
            Reward::VocabularySaved => Some(Skill::Vocabulary),
            Reward::GrammarChartSaved => Some(Skill::Grammar),
            Reward::WritingSubmitted => Some(Skill::Writing),
            _ => None,
        }
    }
}

/// 当前等级进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
    pub level: i64,
    /// 本级已获得经验
    pub xp_into_level: i64,
    /// 距离下一级还需经验
    pub xp_to_next: i64,
}

impl LevelProgress {
    pub fn from_stats(stats: &StatsRecord) -> Self {
        let xp_into_level = stats.xp.max(0) % XP_PER_LEVEL;
        Self {
            level: stats.level,
            xp_into_level,
            xp_to_next: XP_PER_LEVEL - xp_into_level,
        }
    }
}

/// 学习统计账本
#[derive(Clone)]
pub struct StatsLedger {
    store: Arc<dyn KeyValueStore>,
    notifier: ChangeNotifier,
}

impl StatsLedger {
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: ChangeNotifier) -> Self {
        Self { store, notifier }
    }

    /// 获取当前统计
    ///
    /// 不存在时返回默认值；最后活跃日期不是今天时只更新日期，不改变连续天数。
    pub fn get_stats(&self) -> StorageResult<StatsRecord> {
        self.get_stats_at(Utc::now())
    }

    /// 以指定时间为“现在”获取统计
    pub fn get_stats_at(&self, now: DateTime<Utc>) -> StorageResult<StatsRecord> {
        let Some(mut stats) = self.load()? else {
            return Ok(StatsRecord::default());
        };

        let last = stats.last_login.with_timezone(&Local).date_naive();
        let today = now.with_timezone(&Local).date_naive();
        if last != today {
            debug!(%last, %today, "更新最后活跃日期");
            stats.last_login = now;
            self.save(&stats)?;
        }

        Ok(stats)
    }

    /// 增加经验值
    ///
    /// - 等级取 max(当前等级, floor(xp/1000)+1)，不会下降
    /// - 0 < amount < 50 计为学会一个单词
    /// - 25 <= amount <= 30 计为解决一道错题
    /// - 指定技能时该技能 +1，上限 100
    pub fn add_experience(&self, amount: i64, skill: Option<Skill>) -> StorageResult<StatsRecord> {
        let mut stats = self.get_stats()?;

        stats.xp = stats.xp.saturating_add(amount).max(0);
        stats.level = stats.level.max(level_for_xp(stats.xp));

        if amount > 0 && amount < 50 {
            stats.words_learned += 1;
        }
        if (25..=30).contains(&amount) {
            stats.mistakes_fixed += 1;
        }
        if let Some(skill) = skill {
            let current = stats.skills.get(skill);
            stats.skills.set(skill, (current + 1).min(SkillRatings::MAX));
        }

        self.save(&stats)?;
        self.notifier.emit(ChangeEvent::StatsUpdated);

        Ok(stats)
    }

    /// 按活动类型发放奖励
    pub fn award(&self, reward: Reward) -> StorageResult<StatsRecord> {
        self.add_experience(reward.xp(), reward.skill())
    }

    /// 记录考试成绩，返回是否刷新了最高分
    pub fn record_exam_score(&self, exam_id: &str, score: i64) -> StorageResult<bool> {
        let mut stats = self.get_stats()?;

        let improved = match stats.exam_high_scores.get(exam_id) {
            Some(best) => score > *best,
            None => true,
        };
        if improved {
            stats.exam_high_scores.insert(exam_id.to_string(), score);
            self.save(&stats)?;
            self.notifier.emit(ChangeEvent::StatsUpdated);
        }

        Ok(improved)
    }

    /// 当前等级进度
    pub fn level_progress(&self) -> StorageResult<LevelProgress> {
        Ok(LevelProgress::from_stats(&self.get_stats()?))
    }

    /// 读取原始记录（不更新活跃日期）
    pub(crate) fn load(&self) -> StorageResult<Option<StatsRecord>> {
        load_json(&*self.store, StorageKey::Stats)
    }

    fn save(&self, stats: &StatsRecord) -> StorageResult<()> {
        store_json(&*self.store, StorageKey::Stats, stats)
    }
}

// ============================================================
// 测试
// ============================================================
