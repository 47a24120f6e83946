//! 本地持久化模块
//!
//! 提供基于键值存储的本地数据持久化，支持：
//! - 用户档案与导航顺序
//! - 经验值、等级、技能评分等学习统计
//! - 单词卡、语法图表、错题、写作记录与学习计划
//! - 快照导出、合并与覆盖导入

// ============================================================
// 子模块声明
// ============================================================

mod collection;
pub mod events;
pub mod grammar;
pub mod kv;
pub mod migrations;
pub mod mistakes;
pub mod models;
pub mod plan;
pub mod profile;
pub mod sqlite;
pub mod stats;
pub mod sync;
pub mod vocabulary;
pub mod writing;

// ============================================================
// 重新导出主要类型
// ============================================================

pub use events::{ChangeEvent, ChangeNotifier, CollectionKind};
pub use grammar::GrammarRepository;
pub use kv::{KeyValueStore, MemoryStore};
pub use mistakes::MistakeRepository;
pub use models::*;
pub use plan::StudyPlanRepository;
pub use profile::ProfileRepository;
pub use sqlite::SqliteStore;
pub use stats::{LevelProgress, Reward, StatsLedger};
pub use sync::{MergeReport, Snapshot, SyncEngine};
pub use vocabulary::VocabularyRepository;
pub use writing::WritingRepository;

// ============================================================
// 依赖导入
// ============================================================

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;

// ============================================================
// 错误类型定义
// ============================================================

/// 存储模块错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("迁移错误: {0}")]
    Migration(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("快照解码失败: {0}")]
    Decode(String),

    #[error("本地数据损坏: {0}")]
    Corrupted(String),

    #[error("数据未找到: {0}")]
    NotFound(String),

    #[error("锁获取失败: {0}")]
    LockError(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// ============================================================
// StorageKey - 持久化键空间
// ============================================================

/// 持久化键
///
/// 键名与浏览器端 localStorage 保持一致，保证导出的快照可以互相导入。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageKey {
    Stats,
    Vocabulary,
    GrammarCharts,
    Mistakes,
    Writing,
    StudyPlan,
    Profile,
    NavOrder,
}

impl StorageKey {
    /// 全部键，顺序即导出顺序
    pub const ALL: [StorageKey; 8] = [
        StorageKey::Stats,
        StorageKey::Vocabulary,
        StorageKey::GrammarCharts,
        StorageKey::Mistakes,
        StorageKey::Writing,
        StorageKey::StudyPlan,
        StorageKey::Profile,
        StorageKey::NavOrder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Stats => "nexus_stats",
            StorageKey::Vocabulary => "nexus_vocab",
            StorageKey::GrammarCharts => "nexus_grammar_charts",
            StorageKey::Mistakes => "nexus_mistakes",
            StorageKey::Writing => "nexus_writing",
            StorageKey::StudyPlan => "nexus_plan_v2",
            StorageKey::Profile => "nexus_profile",
            StorageKey::NavOrder => "nexus_nav_order",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == raw)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// Storage - 统一存储结构体
// ============================================================

/// 统一存储结构体
///
/// 持有同一个键值存储和变更通知器，提供对所有 Repository 的便捷访问。
/// 克隆开销很小，各 Repository 共享底层存储。
#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn KeyValueStore>,
    notifier: ChangeNotifier,
}

impl Storage {
    /// 基于任意键值存储创建 Storage
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            notifier: ChangeNotifier::new(),
        }
    }

    /// 创建内存存储（用于测试）
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// 打开 SQLite 文件存储
    ///
    /// # Example
    /// ```ignore
    /// let storage = Storage::open("./data/nexus.db")?;
    /// let stats = storage.stats().get_stats()?;
    /// ```
    pub fn open<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let store = SqliteStore::open(db_path)?;
        Ok(Self::new(Arc::new(store)))
    }

    /// 获取底层键值存储
    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    /// 获取变更通知器
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// 订阅数据变更通知
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }

    /// 获取用户档案仓库
    pub fn profile(&self) -> ProfileRepository {
        ProfileRepository::new(self.store(), self.notifier.clone())
    }

    /// 获取学习统计账本
    pub fn stats(&self) -> StatsLedger {
        StatsLedger::new(self.store(), self.notifier.clone())
    }

    /// 获取单词卡仓库
    pub fn vocabulary(&self) -> VocabularyRepository {
        VocabularyRepository::new(self.store(), self.notifier.clone())
    }

    /// 获取语法图表仓库
    pub fn grammar(&self) -> GrammarRepository {
        GrammarRepository::new(self.store(), self.notifier.clone())
    }

    /// 获取错题仓库
    pub fn mistakes(&self) -> MistakeRepository {
        MistakeRepository::new(self.store(), self.notifier.clone())
    }

    /// 获取写作记录仓库
    pub fn writing(&self) -> WritingRepository {
        WritingRepository::new(self.store(), self.notifier.clone())
    }

    /// 获取学习计划仓库
    pub fn plan(&self) -> StudyPlanRepository {
        StudyPlanRepository::new(self.store(), self.notifier.clone())
    }

    /// 获取同步引擎
    pub fn sync(&self) -> SyncEngine {
        SyncEngine::new(self.store(), self.notifier.clone())
    }
}

// ============================================================
// 测试
// ============================================================
