//! 进度广播 - 业务能力层
//!
//! 运行日志上的结构化消息：配置横幅、`PROGRESS:`、汇总块和 `SUMMARY:`。
//! 所有输出都经过 `RunLog`，因此文件和实时通道看到的是同一条流

use crate::infrastructure::log_sink::RunLog;
use crate::models::client::Commission;
use crate::models::result::SummaryReport;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

const BANNER_WIDTH: usize = 61;

/// 进度计数器，所有 worker 共享
pub struct ProgressReporter {
    log: RunLog,
    total: usize,
    completed: AtomicUsize,
}

impl ProgressReporter {
    pub fn new(log: RunLog, total: usize) -> Self {
        Self {
            log,
            total,
            completed: AtomicUsize::new(0),
        }
    }

    /// 一条记录结束：计数加一并发布 `PROGRESS:<完成>:<总数>:<百分比>`
    ///
    /// # 返回
    /// 返回加一后的完成数
    pub fn record_completed(&self) -> usize {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.line(progress_line(completed, self.total));
        completed
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

/// 百分比向下取整
pub fn progress_line(completed: usize, total: usize) -> String {
    let percentage = if total == 0 {
        100
    } else {
        completed * 100 / total
    };
    format!("PROGRESS:{}:{}:{}", completed, total, percentage)
}

/// 配置横幅
///
/// # 参数
/// - `env`: 环境名
/// - `base_url`: API 地址
/// - `endpoint`: 接口路径
/// - `offer_id`: 优惠 ID
/// - `commission`: 佣金
pub fn write_config_banner(
    log: &RunLog,
    env: &str,
    base_url: &str,
    endpoint: &str,
    offer_id: &str,
    commission: &Commission,
) {
    log.line("=".repeat(BANNER_WIDTH));
    log.line(format!("Environment: {}", env));
    log.line(format!("API Base URL: {}", base_url));
    log.line(format!("API Endpoint: {}", endpoint));
    log.line(format!("Offer ID: {}", offer_id));
    log.line(format!(
        "RZP Commission: {} (DB value: {})",
        commission.input, commission.minor
    ));
    log.line("=".repeat(BANNER_WIDTH));
    log.blank();
}

/// 写入汇总块和 `SUMMARY:` 行
pub fn write_summary(log: &RunLog, report: &SummaryReport) {
    let summary = &report.summary;

    log.blank();
    log.line("=".repeat(BANNER_WIDTH));
    log.line("Upload Summary:");
    log.line(format!(
        "Total: {}, Success: {}, Failed: {}",
        summary.total, summary.success, summary.failed
    ));
    log.line(format!("Procurement Batch ID: {}", report.procurement_batch_id));
    log.line("=".repeat(BANNER_WIDTH));

    match serde_json::to_string(report) {
        Ok(json) => log.line(format!("SUMMARY:{}", json)),
        Err(e) => warn!("汇总序列化失败: {}", e),
    }

    info!(
        "📊 {} 完成: 总数 {}, 成功 {}, 失败 {} ({})",
        report.run_id, summary.total, summary.success, summary.failed, summary.status
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::event_hub::EventHub;

    #[test]
    fn test_progress_percentage_is_floored() {
        assert_eq!(progress_line(1, 3), "PROGRESS:1:3:33");
        assert_eq!(progress_line(2, 3), "PROGRESS:2:3:66");
        assert_eq!(progress_line(3, 3), "PROGRESS:3:3:100");
    }

    #[tokio::test]
    async fn test_reporter_counts_every_completion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let (log, writer) = RunLog::open(&path, "run", EventHub::new()).await.unwrap();

        let reporter = std::sync::Arc::new(ProgressReporter::new(log.clone(), 4));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let reporter = reporter.clone();
            handles.push(tokio::spawn(async move { reporter.record_completed() }));
        }
        let mut seen: Vec<usize> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3, 4]);
        assert_eq!(reporter.completed(), 4);

        drop(reporter);
        drop(log);
        writer.join().await;

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.lines().any(|l| l == "PROGRESS:4:4:100"));
        assert_eq!(content.lines().count(), 4);
    }
}
