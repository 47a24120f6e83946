//! 数据模型定义
//!
//! 字段的 JSON 名称与浏览器端存储格式一致，旧版本导出的快照可以直接解析。

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================
// 枚举
// ============================================================

/// 导师角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Deadpool,
    Cap,
    Ironman,
    Wolverine,
    Spidey,
}

/// 语言水平 (CEFR)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum ProficiencyLevel {
    A2,
    B1,
    B2,
    #[default]
    C1,
    C2,
}

impl ProficiencyLevel {
    pub const ALL: [ProficiencyLevel; 5] = [
        ProficiencyLevel::A2,
        ProficiencyLevel::B1,
        ProficiencyLevel::B2,
        ProficiencyLevel::C1,
        ProficiencyLevel::C2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProficiencyLevel::A2 => "A2",
            ProficiencyLevel::B1 => "B1",
            ProficiencyLevel::B2 => "B2",
            ProficiencyLevel::C1 => "C1",
            ProficiencyLevel::C2 => "C2",
        }
    }

    /// 循环切换到下一级，C2 之后回到 A2
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|l| *l == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 目标语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetLanguage {
    #[default]
    English,
    French,
    Italian,
    Spanish,
}

impl TargetLanguage {
    pub const ALL: [TargetLanguage; 4] = [
        TargetLanguage::English,
        TargetLanguage::French,
        TargetLanguage::Italian,
        TargetLanguage::Spanish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetLanguage::English => "English",
            TargetLanguage::French => "French",
            TargetLanguage::Italian => "Italian",
            TargetLanguage::Spanish => "Spanish",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 技能维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Reading,
    Writing,
    Listening,
    Grammar,
    #[serde(rename = "vocab")]
    Vocabulary,
}

impl Skill {
    pub const ALL: [Skill; 5] = [
        Skill::Reading,
        Skill::Writing,
        Skill::Listening,
        Skill::Grammar,
        Skill::Vocabulary,
    ];

    /// 存储中的字段名
    pub fn key(&self) -> &'static str {
        match self {
            Skill::Reading => "reading",
            Skill::Writing => "writing",
            Skill::Listening => "listening",
            Skill::Grammar => "grammar",
            Skill::Vocabulary => "vocab",
        }
    }
}

/// 错题类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MistakeCategory {
    Grammar,
    #[serde(rename = "vocab")]
    Vocabulary,
}

// ============================================================
// Profile - 用户档案
// ============================================================

/// 用户档案（每台设备一个）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    /// 显示名称
    pub username: String,
    /// 导师角色
    #[serde(rename = "avatarId")]
    pub persona: Persona,
    /// 语言水平
    pub level: ProficiencyLevel,
    /// 目标语言
    pub target_language: TargetLanguage,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            username: "Agent".to_string(),
            persona: Persona::Deadpool,
            level: ProficiencyLevel::C1,
            target_language: TargetLanguage::English,
        }
    }
}

// ============================================================
// StatsRecord - 学习统计
// ============================================================

/// 技能评分，每项 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillRatings {
    pub reading: i32,
    pub writing: i32,
    pub listening: i32,
    pub grammar: i32,
    pub vocab: i32,
}

impl SkillRatings {
    pub const MAX: i32 = 100;
    pub const INITIAL: i32 = 50;

    pub fn get(&self, skill: Skill) -> i32 {
        match skill {
            Skill::Reading => self.reading,
            Skill::Writing => self.writing,
            Skill::Listening => self.listening,
            Skill::Grammar => self.grammar,
            Skill::Vocabulary => self.vocab,
        }
    }

    /// 设置评分，自动限制在 0-100
    pub fn set(&mut self, skill: Skill, value: i32) {
        let value = value.clamp(0, Self::MAX);
        match skill {
            Skill::Reading => self.reading = value,
            Skill::Writing => self.writing = value,
            Skill::Listening => self.listening = value,
            Skill::Grammar => self.grammar = value,
            Skill::Vocabulary => self.vocab = value,
        }
    }
}

impl Default for SkillRatings {
    fn default() -> Self {
        Self {
            reading: Self::INITIAL,
            writing: Self::INITIAL,
            listening: Self::INITIAL,
            grammar: Self::INITIAL,
            vocab: Self::INITIAL,
        }
    }
}

/// 每级所需经验值
pub const XP_PER_LEVEL: i64 = 1000;

/// 由经验值推导等级: floor(xp / 1000) + 1
pub fn level_for_xp(xp: i64) -> i64 {
    xp.max(0) / XP_PER_LEVEL + 1
}

/// 学习统计（单例）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRecord {
    /// 经验值
    #[serde(default)]
    pub xp: i64,
    /// RPG 等级
    #[serde(default = "default_level")]
    pub level: i64,
    /// 连续学习天数
    #[serde(default = "default_level")]
    pub streak: i64,
    /// 最后活跃时间
    #[serde(default = "Utc::now")]
    pub last_login: DateTime<Utc>,
    /// 已解决错题数
    #[serde(default)]
    pub mistakes_fixed: i64,
    /// 已学单词数
    #[serde(default)]
    pub words_learned: i64,
    /// 考试最高分
    #[serde(default)]
    pub exam_high_scores: BTreeMap<String, i64>,
    /// 技能评分
    #[serde(default)]
    pub skills: SkillRatings,
}

fn default_level() -> i64 {
    1
}

impl Default for StatsRecord {
    fn default() -> Self {
        Self {
            xp: 0,
            level: 1,
            streak: 1,
            last_login: Utc::now(),
            mistakes_fixed: 0,
            words_learned: 0,
            exam_high_scores: BTreeMap::new(),
            skills: SkillRatings::default(),
        }
    }
}

impl StatsRecord {
    /// 除最后活跃时间外的进度是否完全一致
    pub fn same_progress(&self, other: &StatsRecord) -> bool {
        self.xp == other.xp
            && self.level == other.level
            && self.streak == other.streak
            && self.mistakes_fixed == other.mistakes_fixed
            && self.words_learned == other.words_learned
            && self.exam_high_scores == other.exam_high_scores
            && self.skills == other.skills
    }
}

// ============================================================
// VocabCard - 单词卡
// ============================================================

/// 单词卡
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabCard {
    pub id: String,
    /// 词条（自然键）
    #[serde(rename = "word")]
    pub headword: String,
    #[serde(rename = "translationES", default)]
    pub translation: String,
    #[serde(rename = "definitionES", default)]
    pub definition: String,
    #[serde(rename = "exampleEN", default)]
    pub example_sentence: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub mastered: bool,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<TargetLanguage>,
    /// 旧版英文释义
    #[serde(rename = "definitionEN", default, skip_serializing_if = "Option::is_none")]
    pub definition_en: Option<String>,
}

impl VocabCard {
    pub fn new(
        headword: impl Into<String>,
        translation: impl Into<String>,
        definition: impl Into<String>,
        example_sentence: impl Into<String>,
    ) -> Self {
        Self {
            id: new_record_id(),
            headword: headword.into(),
            translation: translation.into(),
            definition: definition.into(),
            example_sentence: example_sentence.into(),
            synonyms: Vec::new(),
            mastered: false,
            favorite: false,
            language: None,
            definition_en: None,
        }
    }

    /// 缺省语言的旧数据视为英语
    pub fn language(&self) -> TargetLanguage {
        self.language.unwrap_or_default()
    }
}

// ============================================================
// GrammarChart - 语法图表
// ============================================================

/// 自定义扩展段落
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSection {
    pub title: String,
    pub content: String,
}

/// 语法图表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarChart {
    pub id: String,
    /// 标题（自然键）
    pub title: String,
    #[serde(default)]
    pub definition: String,
    /// 结构公式
    #[serde(rename = "structure", default)]
    pub structure_formula: String,
    /// 使用场景
    #[serde(rename = "usageContext", default)]
    pub usage_notes: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub tips: String,
    #[serde(default)]
    pub common_mistakes: Vec<String>,
    #[serde(default)]
    pub native_nuance: String,
    #[serde(default)]
    pub mnemonic: String,
    #[serde(default)]
    pub visual_metaphor: String,
    /// 创建时间（毫秒时间戳）
    #[serde(rename = "timestamp", default)]
    pub created_at: i64,
    #[serde(default)]
    pub custom_sections: Vec<CustomSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<TargetLanguage>,
}

impl GrammarChart {
    /// 创建只有标题的空白图表
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_record_id(),
            title: title.into(),
            definition: String::new(),
            structure_formula: String::new(),
            usage_notes: String::new(),
            examples: Vec::new(),
            tips: String::new(),
            common_mistakes: Vec::new(),
            native_nuance: String::new(),
            mnemonic: String::new(),
            visual_metaphor: String::new(),
            created_at: Utc::now().timestamp_millis(),
            custom_sections: Vec::new(),
            language: None,
        }
    }

    pub fn language(&self) -> TargetLanguage {
        self.language.unwrap_or_default()
    }
}

// ============================================================
// Mistake - 错题
// ============================================================

/// 错题记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mistake {
    pub id: String,
    #[serde(rename = "type")]
    pub category: MistakeCategory,
    /// 题目（合并时的自然键）
    #[serde(rename = "question")]
    pub prompt_text: String,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(rename = "userAnswer", default, skip_serializing_if = "Option::is_none")]
    pub submitted_answer: Option<String>,
    #[serde(default)]
    pub explanation: String,
    /// 记录时间（毫秒时间戳）
    #[serde(rename = "timestamp", default)]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<TargetLanguage>,
}

impl Mistake {
    pub fn new(
        category: MistakeCategory,
        prompt_text: impl Into<String>,
        correct_answer: impl Into<String>,
        submitted_answer: Option<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            id: new_record_id(),
            category,
            prompt_text: prompt_text.into(),
            correct_answer: correct_answer.into(),
            submitted_answer,
            explanation: explanation.into(),
            created_at: Utc::now().timestamp_millis(),
            language: None,
        }
    }

    pub fn language(&self) -> TargetLanguage {
        self.language.unwrap_or_default()
    }
}

// ============================================================
// WritingSubmission - 写作记录
// ============================================================

/// 写作满分
pub const MAX_WRITING_SCORE: i32 = 20;

/// 写作提交记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingSubmission {
    pub id: String,
    /// 文体（essay、email 等）
    #[serde(rename = "type")]
    pub text_type: String,
    pub original_text: String,
    #[serde(default)]
    pub corrected_text: String,
    /// 0-20
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub feedback: String,
    /// 提交时间
    #[serde(rename = "date")]
    pub submitted_at: DateTime<Utc>,
}

impl WritingSubmission {
    pub fn new(
        text_type: impl Into<String>,
        original_text: impl Into<String>,
        corrected_text: impl Into<String>,
        score: i32,
        feedback: impl Into<String>,
    ) -> Self {
        Self {
            id: new_record_id(),
            text_type: text_type.into(),
            original_text: original_text.into(),
            corrected_text: corrected_text.into(),
            score: score.clamp(0, MAX_WRITING_SCORE),
            feedback: feedback.into(),
            submitted_at: Utc::now(),
        }
    }
}

// ============================================================
// StudyPlan - 学习计划
// ============================================================

/// 学习任务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyTask {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl StudyTask {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: new_record_id(),
            description: description.into(),
            completed: false,
        }
    }
}

/// 学习计划中的一天
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyDay {
    /// 如 "Monday"
    #[serde(rename = "day")]
    pub day_label: String,
    #[serde(rename = "focus")]
    pub focus_area: String,
    #[serde(default)]
    pub tasks: Vec<StudyTask>,
}

/// 生成新的记录 ID
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================
// 测试
// ============================================================
