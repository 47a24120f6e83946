//! 模型输出的数据结构
//!
//! 生成结果先解析为草稿，再转换为可以保存的存储模型。

use serde::{Deserialize, Serialize};

use crate::storage::models::{
    new_record_id, CustomSection, GrammarChart, StudyDay, StudyTask, TargetLanguage, VocabCard,
    WritingSubmission, MAX_WRITING_SCORE,
};

/// 单词生成模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VocabularyMode {
    #[default]
    Topic,
    Idioms,
    Collocations,
    PhrasalVerbs,
}

impl VocabularyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VocabularyMode::Topic => "Topic",
            VocabularyMode::Idioms => "Idioms",
            VocabularyMode::Collocations => "Collocations",
            VocabularyMode::PhrasalVerbs => "Phrasal Verbs",
        }
    }
}

/// 单词卡草稿
#[derive(Debug, Clone, Deserialize)]
pub struct VocabularyDraft {
    pub word: String,
    #[serde(rename = "translationES", default)]
    pub translation: String,
    #[serde(rename = "definitionES", default)]
    pub definition: String,
    #[serde(rename = "exampleEN", default)]
    pub example_sentence: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl VocabularyDraft {
    pub fn into_card(self, language: TargetLanguage) -> VocabCard {
        let mut card = VocabCard::new(
            self.word,
            self.translation,
            self.definition,
            self.example_sentence,
        );
        card.synonyms = self.synonyms;
        card.language = Some(language);
        card
    }
}

/// 选择题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    #[serde(default = "new_record_id")]
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: i64,
    #[serde(default)]
    pub explanation: String,
}

impl QuizQuestion {
    /// 正确答案下标在选项范围内
    pub fn is_answerable(&self) -> bool {
        usize::try_from(self.correct_index)
            .map(|idx| idx < self.options.len())
            .unwrap_or(false)
    }

    pub fn is_correct(&self, choice: usize) -> bool {
        usize::try_from(self.correct_index).map_or(false, |idx| idx == choice)
    }
}

/// 语法图表草稿
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GrammarChartDraft {
    pub title: String,
    pub definition: String,
    pub structure: String,
    pub usage_context: String,
    pub examples: Vec<String>,
    pub tips: String,
    pub common_mistakes: Vec<String>,
    pub native_nuance: String,
    pub mnemonic: String,
    pub visual_metaphor: String,
    pub custom_sections: Vec<CustomSection>,
}

impl GrammarChartDraft {
    pub fn into_chart(self, language: TargetLanguage) -> GrammarChart {
        let mut chart = GrammarChart::new(self.title);
        chart.definition = self.definition;
        chart.structure_formula = self.structure;
        chart.usage_notes = self.usage_context;
        chart.examples = self.examples;
        chart.tips = self.tips;
        chart.common_mistakes = self.common_mistakes;
        chart.native_nuance = self.native_nuance;
        chart.mnemonic = self.mnemonic;
        chart.visual_metaphor = self.visual_metaphor;
        chart.custom_sections = self.custom_sections;
        chart.language = Some(language);
        chart
    }
}

/// 写作评分
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingEvaluation {
    /// 0-20
    pub score: i32,
    pub feedback: String,
    pub corrected_text: String,
}

impl WritingEvaluation {
    /// 模型不可用时的结果
    pub fn fallback(original: &str) -> Self {
        Self {
            score: 0,
            feedback: "Error".to_string(),
            corrected_text: original.to_string(),
        }
    }

    pub fn into_submission(self, text_type: &str, original: &str) -> WritingSubmission {
        WritingSubmission::new(
            text_type,
            original,
            self.corrected_text,
            self.score,
            self.feedback,
        )
    }
}

/// 模型原始评分，分数可能是小数或越界
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawEvaluation {
    pub score: f64,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub corrected_text: String,
}

impl RawEvaluation {
    pub(crate) fn into_evaluation(self, original: &str) -> WritingEvaluation {
        let score = if self.score.is_finite() {
            self.score.round().clamp(0.0, f64::from(MAX_WRITING_SCORE)) as i32
        } else {
            0
        };
        let corrected_text = if self.corrected_text.trim().is_empty() {
            original.to_string()
        } else {
            self.corrected_text
        };

        WritingEvaluation {
            score,
            feedback: self.feedback,
            corrected_text,
        }
    }
}

/// 学习任务草稿，id 可能缺失
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StudyTaskDraft {
    #[serde(default)]
    id: Option<String>,
    description: String,
    #[serde(default)]
    completed: bool,
}

/// 学习计划草稿
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StudyDayDraft {
    day: String,
    focus: String,
    #[serde(default)]
    tasks: Vec<StudyTaskDraft>,
}

impl StudyDayDraft {
    pub(crate) fn into_day(self) -> StudyDay {
        StudyDay {
            day_label: self.day,
            focus_area: self.focus,
            tasks: self
                .tasks
                .into_iter()
                .map(|t| {
                    let mut task = StudyTask::new(t.description);
                    if let Some(id) = t.id.filter(|id| !id.is_empty()) {
                        task.id = id;
                    }
                    task.completed = t.completed;
                    task
                })
                .collect(),
        }
    }
}

/// 翻译模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationMode {
    /// 直接翻译
    #[default]
    Translate,
    /// 润色为更地道的表达
    Improve,
}

/// 翻译结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub main_translation: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub nuance: String,
    #[serde(default)]
    pub key_vocabulary: Vec<String>,
}
