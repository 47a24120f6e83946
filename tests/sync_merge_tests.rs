//! 快照导出、合并与导入的集成测试

mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Duration, Utc};
use tempfile::TempDir;

use common::*;
use nexus_lingo::storage::sync::NOTHING_TO_MERGE;
use nexus_lingo::storage::{
    ChangeEvent, Skill, SkillRatings, StatsRecord, Storage, StorageKey, VocabCard,
    WritingSubmission,
};

// ============================================================
// 往返与跨设备
// ============================================================

#[test]
fn export_then_merge_on_same_state_changes_nothing() {
    let storage = populated_storage();
    let before = raw_state(&storage);

    let token = storage.sync().export().unwrap();
    let report = storage.sync().merge(&token);

    assert!(report.success);
    assert_eq!(report.summary, NOTHING_TO_MERGE);
    assert!(!report.has_changes());
    assert_eq!(raw_state(&storage), before);
}

#[test]
fn export_of_empty_storage_merges_cleanly() {
    let storage = Storage::in_memory();
    let token = storage.sync().export().unwrap();

    let report = storage.sync().merge(&token);

    assert!(report.success);
    assert_eq!(report.summary, NOTHING_TO_MERGE);
}

#[test]
fn merge_from_another_device_adds_everything_new() {
    let device_a = populated_storage();
    let device_b = Storage::in_memory();
    device_b.vocabulary().save(card("ubiquitous")).unwrap();

    let report = device_b.sync().merge(&device_a.sync().export().unwrap());

    assert!(report.success);
    assert_eq!(report.words_added, 1);
    assert_eq!(report.charts_added, 1);
    assert_eq!(report.mistakes_added, 1);
    assert_eq!(report.writings_added, 1);
    assert!(report.plan_adopted);
    assert_eq!(report.xp_added, 170);
    assert_eq!(
        report.summary,
        "+170 XP, 1 个新单词, 1 张语法图表, 1 条错题, 1 篇写作, 学习计划"
    );

    let stats = device_b.stats().get_stats().unwrap();
    assert_eq!(stats.xp, 180);
    assert_eq!(stats.words_learned, 3);
    assert_eq!(stats.exam_high_scores["c1-mock-1"], 72);
    assert_eq!(device_b.vocabulary().get_all().unwrap().len(), 2);
    assert_eq!(device_b.plan().get_plan().unwrap().len(), 2);
}

#[test]
fn merge_tolerates_whitespace_around_token() {
    let device_a = populated_storage();
    let token = device_a.sync().export().unwrap();
    let (head, tail) = token.split_at(token.len() / 3);
    let wrapped = format!("\n   {head}\n{tail}   \n");

    let report = Storage::in_memory().sync().merge(&wrapped);

    assert!(report.success);
    assert_eq!(report.words_added, 2);
}

// ============================================================
// 分区合并规则
// ============================================================

#[test]
fn stats_are_summed_maxed_and_averaged() {
    let storage = Storage::in_memory();
    seed_stats(
        &storage,
        &StatsRecord {
            xp: 100,
            streak: 2,
            ..StatsRecord::default()
        },
    );
    let token = foreign_token(&[(
        StorageKey::Stats,
        r#"{"xp":50,"level":1,"streak":5,"skills":{"reading":70}}"#.to_string(),
    )]);

    let report = storage.sync().merge(&token);

    assert!(report.success);
    assert_eq!(report.summary, "+50 XP");
    let stats = storage.stats().get_stats().unwrap();
    assert_eq!(stats.xp, 150);
    assert_eq!(stats.streak, 5);
    assert_eq!(stats.skills.get(Skill::Reading), 60);
    assert_eq!(stats.skills.get(Skill::Listening), SkillRatings::INITIAL);
}

#[test]
fn merged_level_never_drops_below_either_side() {
    let storage = Storage::in_memory();
    seed_stats(
        &storage,
        &StatsRecord {
            xp: 1500,
            level: 2,
            ..StatsRecord::default()
        },
    );
    let token = foreign_token(&[(StorageKey::Stats, r#"{"xp":800,"level":1}"#.to_string())]);

    storage.sync().merge(&token);

    let stats = storage.stats().get_stats().unwrap();
    assert_eq!(stats.xp, 2300);
    assert_eq!(stats.level, 3);
}

#[test]
fn vocabulary_is_deduplicated_by_headword() {
    let storage = Storage::in_memory();
    storage.vocabulary().save(card("ubiquitous")).unwrap();
    let mut theirs = card("ubiquitous");
    theirs.translation = "omnipresente".to_string();
    let token = foreign_token(&[(
        StorageKey::Vocabulary,
        to_json(&vec![theirs, card("resilient")]),
    )]);

    let report = storage.sync().merge(&token);

    assert_eq!(report.words_added, 1);
    assert_eq!(report.summary, "1 个新单词");
    let cards = storage.vocabulary().get_all().unwrap();
    let words: Vec<&str> = cards.iter().map(|c| c.headword.as_str()).collect();
    assert_eq!(words, vec!["ubiquitous", "resilient"]);
    // 本地版本保留
    assert_eq!(cards[0].translation, "traducción");
}

#[test]
fn charts_and_mistakes_are_deduplicated_by_natural_key() {
    let storage = Storage::in_memory();
    storage.grammar().save(chart("Inversion")).unwrap();
    storage.mistakes().save(mistake("Q1")).unwrap();

    let token = foreign_token(&[
        (
            StorageKey::GrammarCharts,
            to_json(&vec![chart("Inversion"), chart("Cleft Sentences")]),
        ),
        (
            StorageKey::Mistakes,
            to_json(&vec![mistake("Q1"), mistake("Q2"), mistake("Q3")]),
        ),
    ]);

    let report = storage.sync().merge(&token);

    assert_eq!(report.charts_added, 1);
    assert_eq!(report.mistakes_added, 2);
    assert_eq!(report.summary, "1 张语法图表, 2 条错题");
    assert_eq!(storage.grammar().get_all().unwrap().len(), 2);
    assert_eq!(storage.mistakes().get_all().unwrap().len(), 3);
}

#[test]
fn writing_is_deduplicated_by_id_and_sorted_newest_first() {
    let storage = Storage::in_memory();
    let mut ours = submission(12);
    ours.submitted_at = Utc::now() - Duration::days(1);
    storage.writing().save(ours.clone()).unwrap();

    let mut newest = submission(18);
    newest.submitted_at = Utc::now();
    let mut oldest = submission(9);
    oldest.submitted_at = Utc::now() - Duration::days(3);
    // 同 id 不同内容仍视为重复
    let mut same_id = ours.clone();
    same_id.original_text = "edited elsewhere".to_string();

    let token = foreign_token(&[(
        StorageKey::Writing,
        to_json(&vec![oldest.clone(), same_id, newest.clone()]),
    )]);

    let report = storage.sync().merge(&token);

    assert_eq!(report.writings_added, 2);
    let ids: Vec<String> = storage
        .writing()
        .get_all()
        .unwrap()
        .into_iter()
        .map(|w: WritingSubmission| w.id)
        .collect();
    assert_eq!(ids, vec![newest.id, ours.id, oldest.id]);
}

#[test]
fn study_plan_adopted_only_when_local_is_empty() {
    let empty = Storage::in_memory();
    let token = foreign_token(&[(StorageKey::StudyPlan, to_json(&plan(3)))]);

    let report = empty.sync().merge(&token);
    assert!(report.plan_adopted);
    assert_eq!(report.summary, "学习计划");
    assert_eq!(empty.plan().get_plan().unwrap().len(), 3);

    let busy = Storage::in_memory();
    busy.plan().save_plan(&plan(1)).unwrap();
    let before = busy.plan().get_plan().unwrap();

    let report = busy.sync().merge(&token);
    assert!(!report.plan_adopted);
    assert_eq!(busy.plan().get_plan().unwrap(), before);
}

#[test]
fn legacy_text_plan_is_skipped() {
    let storage = Storage::in_memory();
    let token = foreign_token(&[(StorageKey::StudyPlan, "Lunes: leer 20 minutos".to_string())]);

    let report = storage.sync().merge(&token);

    assert!(report.success);
    assert!(!report.plan_adopted);
    assert!(storage.plan().get_plan().unwrap().is_empty());
}

#[test]
fn absent_and_empty_sections_are_skipped() {
    let storage = populated_storage();
    let before = raw_state(&storage);
    let token = foreign_token(&[
        (StorageKey::Vocabulary, String::new()),
        (StorageKey::Profile, r#"{"username":"Other"}"#.to_string()),
    ]);

    let report = storage.sync().merge(&token);

    assert!(report.success);
    assert_eq!(report.summary, NOTHING_TO_MERGE);
    assert_eq!(raw_state(&storage), before);
}

// ============================================================
// 失败时不修改数据
// ============================================================

#[test]
fn corrupted_token_leaves_state_untouched() {
    let storage = populated_storage();
    let before = raw_state(&storage);

    for token in ["", "   ", "@@not base64@@", "bm90IGpzb24="] {
        let report = storage.sync().merge(token);
        assert!(!report.success, "token {token:?} should fail");
        assert!(report.summary.starts_with("合并失败"));
    }

    assert_eq!(raw_state(&storage), before);
}

#[test]
fn invalid_section_aborts_the_whole_merge() {
    let storage = populated_storage();
    let before = raw_state(&storage);
    // 统计分区有效，单词分区损坏
    let token = foreign_token(&[
        (StorageKey::Stats, r#"{"xp":500,"level":1}"#.to_string()),
        (StorageKey::Vocabulary, "{not json".to_string()),
    ]);

    let report = storage.sync().merge(&token);

    assert!(!report.success);
    assert!(report.summary.contains("nexus_vocab"));
    assert_eq!(raw_state(&storage), before);
}

// ============================================================
// 旧版与损坏的本地数据
// ============================================================

#[test]
fn stats_without_skills_round_trip_changes_nothing() {
    let storage = Storage::in_memory();
    let raw = format!(
        r#"{{"xp":500,"level":1,"streak":2,"lastLogin":"{}","mistakesFixed":0,"wordsLearned":3}}"#,
        Utc::now().to_rfc3339()
    );
    seed_raw(&storage, StorageKey::Stats, &raw);

    let token = storage.sync().export().unwrap();
    let report = storage.sync().merge(&token);

    assert!(report.success);
    assert_eq!(report.summary, NOTHING_TO_MERGE);
    assert_eq!(storage.stats().get_stats().unwrap().xp, 500);
}

#[test]
fn stats_with_same_progress_are_not_summed() {
    let storage = Storage::in_memory();
    seed_raw(&storage, StorageKey::Stats, r#"{"xp":500,"wordsLearned":3}"#);
    let before = raw_state(&storage);

    // 另一台设备补全了默认字段，只有最后活跃时间不同
    let same = StatsRecord {
        xp: 500,
        words_learned: 3,
        last_login: Utc::now() + Duration::days(2),
        ..StatsRecord::default()
    };
    let token = foreign_token(&[(StorageKey::Stats, to_json(&same))]);
    let report = storage.sync().merge(&token);

    assert!(report.success);
    assert_eq!(report.summary, NOTHING_TO_MERGE);
    assert_eq!(raw_state(&storage), before);
}

#[test]
fn corrupted_local_stats_still_merge_own_export() {
    let storage = populated_storage();
    seed_raw(&storage, StorageKey::Stats, "{broken");
    let before = raw_state(&storage);

    let token = storage.sync().export().unwrap();
    let report = storage.sync().merge(&token);

    assert!(report.success);
    assert_eq!(report.summary, NOTHING_TO_MERGE);
    assert_eq!(raw_state(&storage), before);
}

#[test]
fn corrupted_local_collection_is_never_replaced() {
    let storage = Storage::in_memory();
    seed_raw(&storage, StorageKey::Vocabulary, "{broken");
    let before = raw_state(&storage);

    let token = foreign_token(&[
        (StorageKey::Stats, r#"{"xp":40}"#.to_string()),
        (StorageKey::Vocabulary, to_json(&vec![card("resilient")])),
    ]);
    let report = storage.sync().merge(&token);

    assert!(!report.success);
    assert!(report.summary.contains("本地数据损坏"));
    assert!(report.summary.contains("nexus_vocab"));
    assert_eq!(raw_state(&storage), before);
}

#[test]
fn local_text_plan_is_kept_on_merge() {
    let storage = Storage::in_memory();
    seed_raw(&storage, StorageKey::StudyPlan, "Lunes: leer 20 minutos");
    let before = raw_state(&storage);

    let token = foreign_token(&[(StorageKey::StudyPlan, to_json(&plan(2)))]);
    let report = storage.sync().merge(&token);

    assert!(report.success);
    assert!(!report.plan_adopted);
    assert_eq!(raw_state(&storage), before);
}

// ============================================================
// 通知
// ============================================================

#[test]
fn successful_merge_emits_synced() {
    let storage = Storage::in_memory();
    let mut rx = storage.subscribe();

    storage.sync().merge(&foreign_token(&[(
        StorageKey::Vocabulary,
        to_json(&vec![card("resilient")]),
    )]));

    let events: Vec<ChangeEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(events, vec![ChangeEvent::Synced]);
}

#[test]
fn failed_merge_emits_nothing() {
    let storage = Storage::in_memory();
    let mut rx = storage.subscribe();

    storage.sync().merge("%%%");

    assert!(rx.try_recv().is_err());
}

// ============================================================
// 覆盖导入
// ============================================================

#[test]
fn import_overwrites_known_keys() {
    let storage = Storage::in_memory();
    storage.vocabulary().save(card("local-only")).unwrap();

    let incoming: Vec<VocabCard> = vec![card("imported")];
    let token = foreign_token(&[(StorageKey::Vocabulary, to_json(&incoming))]);

    assert!(storage.sync().import(&token));

    let cards = storage.vocabulary().get_all().unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].headword, "imported");
    // 快照里没有的键保持不变
    assert_eq!(storage.stats().get_stats().unwrap().xp, 10);
}

#[test]
fn import_ignores_unknown_and_null_keys() {
    let storage = Storage::in_memory();
    let raw = r#"{"nexus_profile":"{\"username\":\"Ana\"}","nexus_stats":null,"other_app_key":"x"}"#;
    let token = STANDARD.encode(raw);

    assert!(storage.sync().import(&token));

    assert_eq!(storage.profile().get_profile().unwrap().username, "Ana");
    assert!(storage.store().get("other_app_key").unwrap().is_none());
    assert!(storage.store().get(StorageKey::Stats.as_str()).unwrap().is_none());
}

#[test]
fn import_rejects_garbage() {
    let storage = populated_storage();
    let before = raw_state(&storage);

    assert!(!storage.sync().import("definitely not a token"));
    assert_eq!(raw_state(&storage), before);
}

// ============================================================
// SQLite 文件存储
// ============================================================

#[test]
fn merge_persists_to_sqlite_file() {
    let dir = TempDir::new().unwrap();
    let source = Storage::open(dir.path().join("a/nexus.db")).unwrap();
    source.vocabulary().save(card("resilient")).unwrap();
    source.grammar().save(chart("Inversion")).unwrap();
    let token = source.sync().export().unwrap();

    let target_path = dir.path().join("b/nexus.db");
    {
        let target = Storage::open(&target_path).unwrap();
        let report = target.sync().merge(&token);
        assert!(report.success);
        assert_eq!(report.words_added, 1);
    }

    let reopened = Storage::open(&target_path).unwrap();
    assert_eq!(reopened.vocabulary().get_all().unwrap()[0].headword, "resilient");
    assert_eq!(reopened.grammar().get_all().unwrap().len(), 1);
    assert_eq!(reopened.stats().get_stats().unwrap().xp, 60);
}

#[test]
fn failed_merge_leaves_sqlite_file_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nexus.db");
    let storage = Storage::open(&path).unwrap();
    storage.vocabulary().save(card("ubiquitous")).unwrap();
    let before = raw_state(&storage);

    let token = foreign_token(&[
        (StorageKey::Vocabulary, to_json(&vec![card("resilient")])),
        (StorageKey::Writing, "[{\"id\":1}]".to_string()),
    ]);
    assert!(!storage.sync().merge(&token).success);
    drop(storage);

    let reopened = Storage::open(&path).unwrap();
    assert_eq!(raw_state(&reopened), before);
}
