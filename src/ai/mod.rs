//! AI 内容生成边界
//!
//! 存储层不依赖具体模型服务。这里定义：
//! - [`CompletionClient`]：向模型发送提示词并取回文本的接口
//! - [`decode`]：把模型文本解码为类型化结果
//! - [`ContentGenerator`]：各类学习内容的生成，任何失败都返回兜底值

pub mod decode;
pub mod prompts;
pub mod types;

pub use decode::{decode_json, extract_json, Decoded};
pub use types::{
    GrammarChartDraft, QuizQuestion, TranslationMode, TranslationResult, VocabularyDraft,
    VocabularyMode, WritingEvaluation,
};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::storage::models::{
    CustomSection, GrammarChart, ProficiencyLevel, StudyDay, TargetLanguage, VocabCard,
};
use types::{RawEvaluation, StudyDayDraft};

/// 对话请求失败时的回复
pub const CONVERSATION_FALLBACK: &str = "连接中断，请稍后再试。";

/// AI 调用错误
#[derive(Error, Debug)]
pub enum AiError {
    #[error("请求失败: {0}")]
    Request(String),

    #[error("模型返回空响应")]
    EmptyResponse,
}

/// 期望的响应格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Text,
}

/// 一次补全请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub format: ResponseFormat,
}

impl CompletionRequest {
    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            format: ResponseFormat::Json,
        }
    }

    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            format: ResponseFormat::Text,
        }
    }
}

/// 模型补全接口
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AiError>;
}

/// 学习内容生成器
pub struct ContentGenerator<C> {
    client: C,
}

impl<C: CompletionClient> ContentGenerator<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// 按主题批量生成单词卡
    pub async fn generate_vocabulary(
        &self,
        topic: &str,
        mode: VocabularyMode,
        level: ProficiencyLevel,
        language: TargetLanguage,
    ) -> Vec<VocabCard> {
        let prompt = prompts::vocabulary(topic, mode, level, language);
        self.request_json::<Vec<VocabularyDraft>>(prompt)
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|d| !d.word.trim().is_empty())
            .map(|d| d.into_card(language))
            .collect()
    }

    /// 为指定词条生成一张卡片
    pub async fn generate_card(&self, word: &str, language: TargetLanguage) -> Option<VocabCard> {
        self.request_json::<VocabularyDraft>(prompts::single_card(word, language))
            .await
            .ok()
            .map(|d| d.into_card(language))
    }

    /// 生成选择题，丢弃正确答案下标越界的题目
    pub async fn generate_quiz(
        &self,
        topic: &str,
        count: usize,
        level: ProficiencyLevel,
        language: TargetLanguage,
    ) -> Vec<QuizQuestion> {
        let questions: Vec<QuizQuestion> = self
            .request_json(prompts::quiz(topic, count, level, language))
            .await
            .unwrap_or_default();

        let total = questions.len();
        let valid: Vec<QuizQuestion> = questions.into_iter().filter(|q| q.is_answerable()).collect();
        if valid.len() < total {
            debug!(dropped = total - valid.len(), "丢弃答案越界的题目");
        }
        valid
    }

    pub async fn generate_grammar_chart(
        &self,
        topic: &str,
        level: ProficiencyLevel,
        language: TargetLanguage,
    ) -> Option<GrammarChart> {
        self.request_json::<GrammarChartDraft>(prompts::grammar_chart(topic, level, language))
            .await
            .ok()
            .filter(|d| !d.title.trim().is_empty())
            .map(|d| d.into_chart(language))
    }

    /// 针对图表的追问，生成一个扩展段落
    pub async fn expand_grammar_chart(&self, topic: &str, query: &str) -> Option<CustomSection> {
        self.request_json(prompts::expand_chart(topic, query))
            .await
            .ok()
    }

    /// 写作评分（0-20），失败时返回 0 分与原文
    pub async fn evaluate_writing(
        &self,
        text: &str,
        text_type: &str,
        level: ProficiencyLevel,
        language: TargetLanguage,
    ) -> WritingEvaluation {
        let prompt = prompts::writing_evaluation(text, text_type, level, language);
        match self.request_json::<RawEvaluation>(prompt).await {
            Decoded::Parsed(raw) => raw.into_evaluation(text),
            Decoded::Fallback(_) => WritingEvaluation::fallback(text),
        }
    }

    pub async fn generate_study_plan(&self, hours_per_week: u32, focus: &str) -> Vec<StudyDay> {
        self.request_json::<Vec<StudyDayDraft>>(prompts::study_plan(hours_per_week, focus))
            .await
            .unwrap_or_default()
            .into_iter()
            .map(StudyDayDraft::into_day)
            .collect()
    }

    pub async fn translate(
        &self,
        text: &str,
        target: TargetLanguage,
        mode: TranslationMode,
    ) -> Option<TranslationResult> {
        self.request_json(prompts::translation(text, target, mode))
            .await
            .ok()
    }

    /// 自由对话，返回纯文本回复
    pub async fn converse(
        &self,
        message: &str,
        level: ProficiencyLevel,
        language: TargetLanguage,
    ) -> String {
        let request = CompletionRequest::text(prompts::conversation(message, level, language));
        match self.client.complete(&request).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => CONVERSATION_FALLBACK.to_string(),
            Err(e) => {
                warn!(error = %e, "对话请求失败");
                CONVERSATION_FALLBACK.to_string()
            }
        }
    }

    async fn request_json<T: DeserializeOwned>(&self, prompt: String) -> Decoded<T> {
        let request = CompletionRequest::json(prompt);
        match self.client.complete(&request).await {
            Ok(text) => decode_json(&text),
            Err(e) => {
                warn!(error = %e, "AI 请求失败");
                Decoded::Fallback(e.to_string())
            }
        }
    }
}
