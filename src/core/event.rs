//! 动画事件订阅

use std::collections::HashMap;
use std::rc::Rc;

use super::types::SubscriptionId;

/// 事件回调（无参数，需要的数据由闭包自行捕获）
pub type EventCallback = Rc<dyn Fn()>;

/// 事件名 -> 按订阅顺序排列的回调列表
#[derive(Default)]
pub struct EventSubscribers {
    next_id: SubscriptionId,
    lists: HashMap<String, Vec<(SubscriptionId, EventCallback)>>,
}

impl EventSubscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, event: &str, callback: EventCallback) -> SubscriptionId {
        self.next_id += 1;
        let id = self.next_id;
        self.lists
            .entry(event.to_string())
            .or_default()
            .push((id, callback));
        id
    }

    /// 移除回调，列表为空时一并删除。返回是否找到
    pub fn unsubscribe(&mut self, event: &str, id: SubscriptionId) -> bool {
        let Some(list) = self.lists.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sub, _)| *sub != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.lists.remove(event);
        }
        removed
    }

    /// 回调列表的快照，回调执行期间可以安全地增删订阅
    pub fn snapshot(&self, event: &str) -> Vec<EventCallback> {
        self.lists
            .get(event)
            .map(|list| list.iter().map(|(_, cb)| Rc::clone(cb)).collect())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.lists.get(event).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn clear(&mut self) {
        self.lists.clear();
    }
}
