//! 实时事件通道 - 基础设施层
//!
//! 按运行 ID 分发的发布/订阅通道，观察者可以在运行开始前或进行中订阅

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 1024;

/// 实时事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// 一行文本（日志、PROGRESS、ROW_LOG、SUMMARY）
    Line(String),
    /// 运行结束，`exit_code` 为 0 表示无失败
    Finished { exit_code: i32 },
}

/// 事件中心
#[derive(Debug, Clone, Default)]
pub struct EventHub {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<RunEvent>>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅某次运行
    pub fn subscribe(&self, run_id: &str) -> broadcast::Receiver<RunEvent> {
        self.sender(run_id).subscribe()
    }

    /// 发布一行文本
    pub fn publish(&self, run_id: &str, line: impl Into<String>) {
        self.send(run_id, RunEvent::Line(line.into()));
    }

    /// 发布结束信号，并释放该运行的通道
    pub fn finish(&self, run_id: &str, exit_code: i32) {
        self.send(run_id, RunEvent::Finished { exit_code });
        if let Ok(mut channels) = self.channels.lock() {
            channels.remove(run_id);
        }
    }

    fn send(&self, run_id: &str, event: RunEvent) {
        // 没有订阅者时发送失败，忽略即可
        let _ = self.sender(run_id).send(event);
    }

    fn sender(&self, run_id: &str) -> broadcast::Sender<RunEvent> {
        let mut channels = match self.channels.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        channels
            .entry(run_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events_for_their_run_only() {
        let hub = EventHub::new();
        let mut rx_a = hub.subscribe("a");
        let mut rx_b = hub.subscribe("b");

        hub.publish("a", "PROGRESS:1:2:50");
        hub.finish("a", 0);
        hub.publish("b", "hello");

        assert_eq!(rx_a.recv().await.unwrap(), RunEvent::Line("PROGRESS:1:2:50".into()));
        assert_eq!(rx_a.recv().await.unwrap(), RunEvent::Finished { exit_code: 0 });
        assert_eq!(rx_b.recv().await.unwrap(), RunEvent::Line("hello".into()));
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let hub = EventHub::new();
        hub.publish("nobody", "line");
        hub.finish("nobody", 1);
    }
}
