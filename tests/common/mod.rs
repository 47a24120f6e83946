#![allow(dead_code)]

use nexus_lingo::storage::{
    GrammarChart, Mistake, MistakeCategory, Snapshot, StatsRecord, Storage, StorageKey, StudyDay,
    StudyTask, VocabCard, WritingSubmission,
};

/// 直接写入统计记录，绕过奖励规则
pub fn seed_stats(storage: &Storage, stats: &StatsRecord) {
    storage
        .store()
        .set(
            StorageKey::Stats.as_str(),
            &serde_json::to_string(stats).unwrap(),
        )
        .unwrap();
}

/// 直接写入原始字符串，模拟旧版本或损坏的数据
pub fn seed_raw(storage: &Storage, key: StorageKey, raw: &str) {
    storage.store().set(key.as_str(), raw).unwrap();
}

/// 读取全部键的原始值
pub fn raw_state(storage: &Storage) -> Vec<(StorageKey, Option<String>)> {
    StorageKey::ALL
        .into_iter()
        .map(|key| (key, storage.store().get(key.as_str()).unwrap()))
        .collect()
}

/// 构造外部设备导出的令牌
pub fn foreign_token(sections: &[(StorageKey, String)]) -> String {
    let mut snapshot = Snapshot::new();
    for (key, value) in sections {
        snapshot.insert(*key, value.clone());
    }
    snapshot.encode().unwrap()
}

pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap()
}

pub fn card(word: &str) -> VocabCard {
    VocabCard::new(word, "traducción", "definición", format!("A sentence with {word}."))
}

pub fn chart(title: &str) -> GrammarChart {
    let mut chart = GrammarChart::new(title);
    chart.structure_formula = "S + aux + V".to_string();
    chart
}

pub fn mistake(question: &str) -> Mistake {
    Mistake::new(
        MistakeCategory::Grammar,
        question,
        "had gone",
        Some("went".to_string()),
        "Past perfect for the earlier action.",
    )
}

pub fn submission(score: i32) -> WritingSubmission {
    WritingSubmission::new("essay", "Original", "Corrected", score, "Bien")
}

pub fn plan(days: usize) -> Vec<StudyDay> {
    (0..days)
        .map(|i| StudyDay {
            day_label: format!("Day {}", i + 1),
            focus_area: "Listening".to_string(),
            tasks: vec![StudyTask::new("Podcast"), StudyTask::new("Shadowing")],
        })
        .collect()
}

/// 填充一套包含所有数据分区的本地状态
pub fn populated_storage() -> Storage {
    let storage = Storage::in_memory();
    storage.vocabulary().save(card("ubiquitous")).unwrap();
    storage.vocabulary().save(card("resilient")).unwrap();
    storage.grammar().save(chart("Inversion")).unwrap();
    storage.mistakes().save(mistake("By the time we arrived, they ___ (go).")).unwrap();
    storage.writing().save(submission(14)).unwrap();
    storage.plan().save_plan(&plan(2)).unwrap();
    storage.stats().record_exam_score("c1-mock-1", 72).unwrap();
    storage.profile().save_nav_order(&["vocab".to_string()]).unwrap();
    storage
}
