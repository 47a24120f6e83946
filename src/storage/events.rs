//! 变更通知
//!
//! 统计、档案或集合发生变化时广播 [`ChangeEvent`]，界面层（如侧边栏）据此刷新显示。

use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 64;

/// 集合类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Vocabulary,
    GrammarCharts,
    Mistakes,
    Writing,
    StudyPlan,
}

/// 数据变更事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    /// 经验值、等级或技能变化
    StatsUpdated,
    /// 档案或导航顺序变化
    ProfileUpdated,
    /// 某个集合发生增删改
    CollectionUpdated(CollectionKind),
    /// 完成一次合并或导入
    Synced,
}

/// 变更通知器
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// 订阅变更事件
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// 广播事件；没有订阅者时静默丢弃
    pub fn emit(&self, event: ChangeEvent) {
        if self.sender.send(event).is_err() {
            debug!(?event, "No subscribers for change event");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
