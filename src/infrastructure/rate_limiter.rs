//! 全局限速器 - 基础设施层
//!
//! 以固定频率发放令牌，所有 worker 共享同一个节拍源，
//! 因此整体吞吐受 `requests_per_second` 约束，而不是 `并发数 × 频率`

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// 全局限速器
#[derive(Clone)]
pub struct RateLimiter {
    ticker: Arc<Mutex<Interval>>,
    period: Duration,
}

impl RateLimiter {
    /// 创建限速器
    ///
    /// # 参数
    /// - `requests_per_second`: 每秒允许的请求数（0 按 1 处理）
    pub fn new(requests_per_second: u32) -> Self {
        let period = Duration::from_secs(1) / requests_per_second.max(1);
        Self::with_period(period)
    }

    /// 以节拍间隔创建
    pub fn with_period(period: Duration) -> Self {
        let mut ticker = interval(period);
        // 空闲后不补发积压的节拍，相邻两次放行至少间隔一个周期
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            ticker: Arc::new(Mutex::new(ticker)),
            period,
        }
    }

    /// 等待下一个节拍
    pub async fn wait(&self) {
        let mut ticker = self.ticker.lock().await;
        ticker.tick().await;
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}
