//! 提示词模板
//!
//! 面向学习者的解释统一使用西班牙语，例句与题目使用目标语言。

use crate::storage::models::{ProficiencyLevel, TargetLanguage};

use super::types::{TranslationMode, VocabularyMode};

/// 每次生成的单词数量
pub const VOCABULARY_BATCH_SIZE: usize = 40;

pub fn vocabulary(
    topic: &str,
    mode: VocabularyMode,
    level: ProficiencyLevel,
    language: TargetLanguage,
) -> String {
    format!(
        "Generate exactly {count} advanced {language} vocabulary items (words, idioms, or collocations) \
         specifically for Level {level}.\n\
         Mode: {mode}. Topic context: \"{topic}\".\n\
         Output JSON array: [{{ word, translationES (Spanish translation), \
         definitionES (Definition in SPANISH/Castellano), exampleEN (Sentence in {language}), \
         synonyms (array of {language} synonyms) }}].",
        count = VOCABULARY_BATCH_SIZE,
        mode = mode.as_str(),
    )
}

pub fn single_card(word: &str, language: TargetLanguage) -> String {
    format!(
        "Create a single vocabulary card for the word/phrase: \"{word}\" in {language}.\n\
         Output JSON strictly: {{ word, translationES (Spanish translation), \
         definitionES (Definition in SPANISH/Castellano), exampleEN (Sentence in {language}), \
         synonyms (array of {language} synonyms) }}"
    )
}

pub fn quiz(topic: &str, count: usize, level: ProficiencyLevel, language: TargetLanguage) -> String {
    format!(
        "Create a multiple choice quiz in {language}. Topic: \"{topic}\". Questions: {count}. Level: {level}.\n\
         Questions and Options MUST be in {language}.\n\
         Explanation MUST be in SPANISH (Castellano).\n\
         Output JSON array: [{{ id, question, options (array of strings), \
         correctIndex (0-based integer), explanation }}]."
    )
}

pub fn grammar_chart(topic: &str, level: ProficiencyLevel, language: TargetLanguage) -> String {
    format!(
        "Create a Visual Grammar Blueprint/Cheat Sheet for: \"{topic}\" adapted for {language} Level {level}.\n\
         Output JSON strictly with fields: title, definition, structure, usageContext, examples, \
         tips, commonMistakes, nativeNuance, mnemonic, visualMetaphor.\n\
         Content Language Rules:\n\
         1. title, structure and examples: {language}\n\
         2. definition, usageContext, tips, commonMistakes, nativeNuance, mnemonic, \
         visualMetaphor: SPANISH (Castellano)"
    )
}

pub fn expand_chart(topic: &str, query: &str) -> String {
    format!(
        "User wants to expand a grammar chart about \"{topic}\". Query: \"{query}\".\n\
         Provide a concise academic explanation in SPANISH (Castellano), \
         but use the target language for examples.\n\
         JSON Output: {{ title, content }}."
    )
}

pub fn writing_evaluation(
    text: &str,
    text_type: &str,
    level: ProficiencyLevel,
    language: TargetLanguage,
) -> String {
    format!(
        "Act as a {language} examiner (Level {level}). Evaluate this {text_type}: \"{text}\".\n\
         Return JSON: {{ score (0-20), feedback (in SPANISH), correctedText (in {language}) }}."
    )
}

pub fn study_plan(hours_per_week: u32, focus: &str) -> String {
    format!(
        "Weekly study plan. {hours_per_week} hours/week. Focus: \"{focus}\".\n\
         Output JSON array of days: [{{ day, focus, tasks: [{{ id, description, completed }}] }}].\n\
         The 'description' of the tasks should be in SPANISH (Castellano) \
         so the user understands exactly what to do."
    )
}

pub fn translation(text: &str, target: TargetLanguage, mode: TranslationMode) -> String {
    const OUTPUT: &str = "Output JSON: { mainTranslation, alternatives (3 variations), \
        nuance (detailed explanation IN SPANISH), keyVocabulary (4-5 items formatted \
        'Term - [Synonym] : Definition in SPANISH') }";

    match mode {
        TranslationMode::Improve => format!(
            "Act as a professional C2 level linguistic editor for {target}. Rewrite the following \
             text to be more formal, academic, and native-level appropriate. Maintain the original meaning.\n\
             Input: \"{text}\"\n{OUTPUT}"
        ),
        TranslationMode::Translate => {
            let source = if target == TargetLanguage::Spanish {
                "the foreign language (English/French/Italian)"
            } else {
                "Spanish"
            };
            format!(
                "Translate the following text into {target}. Source language is {source}.\n\
                 Input: \"{text}\"\n{OUTPUT}"
            )
        }
    }
}

pub fn conversation(message: &str, level: ProficiencyLevel, language: TargetLanguage) -> String {
    format!(
        "You are a conversational partner for a student learning {language} at level {level}.\n\
         Keep your responses relatively short (1-2 sentences) to keep the flow natural.\n\
         Respond IN {language} ONLY. Correct any major mistakes gently.\n\
         The user says: \"{message}\""
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_embed_level_and_language() {
        let prompt = vocabulary(
            "climate",
            VocabularyMode::Idioms,
            ProficiencyLevel::B2,
            TargetLanguage::French,
        );
        assert!(prompt.contains("Level B2"));
        assert!(prompt.contains("French vocabulary"));
        assert!(prompt.contains("Mode: Idioms"));
        assert!(prompt.contains("exactly 40"));

        let prompt = quiz("travel", 5, ProficiencyLevel::C1, TargetLanguage::Italian);
        assert!(prompt.contains("Questions: 5"));
        assert!(prompt.contains("in Italian"));
    }

    #[test]
    fn test_translation_source_language() {
        let to_spanish = translation("Hello", TargetLanguage::Spanish, TranslationMode::Translate);
        assert!(to_spanish.contains("foreign language"));

        let to_english = translation("Hola", TargetLanguage::English, TranslationMode::Translate);
        assert!(to_english.contains("Source language is Spanish"));

        let improve = translation("Hi there", TargetLanguage::English, TranslationMode::Improve);
        assert!(improve.contains("linguistic editor for English"));
        assert!(improve.contains("mainTranslation"));
    }
}
