//! 监听器注册表
//!
//! 按注册顺序保存回调，按引用相等移除。注册表跨重连保留

use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// 入站消息回调
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// 把闭包包装成 [`Listener`]
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&Value) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// 监听器注册表
///
/// 每次分发前先取快照再逐个调用，回调内部可以安全地增删监听器：
/// 本轮分发不受影响，变更从下一条消息开始生效
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加监听器，不去重
    pub fn add(&self, listener: Listener) {
        self.listeners.lock().push(listener);
    }

    /// 移除所有与 `listener` 指向同一回调的条目，返回移除数量
    pub fn remove(&self, listener: &Listener) -> usize {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        before - listeners.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// 当前监听器的快照
    pub fn snapshot(&self) -> Vec<Listener> {
        self.listeners.lock().clone()
    }

    /// 按注册顺序调用快照中的每个监听器，返回调用次数
    ///
    /// 某个监听器 panic 时记录日志并继续调用后面的监听器
    pub fn dispatch(&self, value: &Value) -> usize {
        let snapshot = self.snapshot();
        for listener in &snapshot {
            invoke(listener, value);
        }
        snapshot.len()
    }
}

/// 调用单个回调并吞掉 panic，返回是否正常结束
pub(crate) fn invoke(listener: &Listener, value: &Value) -> bool {
    match catch_unwind(AssertUnwindSafe(|| listener(value))) {
        Ok(()) => true,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("Listener panicked: {}", reason);
            false
        }
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.len())
            .finish()
    }
}
