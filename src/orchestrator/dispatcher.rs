//! 并发派发器 - 编排层
//!
//! 为每张券启动一个任务，任务内部由 `VoucherFlow` 完成限速、并发和控制检查。
//! 完成顺序不确定，但结果按输入顺序返回

use crate::models::result::{FailureKind, UploadResult};
use crate::models::voucher::VoucherRecord;
use crate::services::progress::ProgressReporter;
use crate::workflow::voucher_flow::VoucherFlow;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info};

/// 派发所有记录并等待全部结束
///
/// # 参数
/// - `flow`: 单张券处理流程
/// - `progress`: 共享进度计数
/// - `records`: 全部记录（派发前已完整加载）
///
/// # 返回
/// 与 `records` 一一对应、顺序一致的结果
pub async fn dispatch(
    flow: VoucherFlow,
    progress: Arc<ProgressReporter>,
    records: &[VoucherRecord],
) -> Vec<UploadResult> {
    info!("🚀 开始派发 {} 张券", records.len());

    let handles: Vec<_> = records
        .iter()
        .cloned()
        .map(|voucher| {
            let flow = flow.clone();
            let progress = progress.clone();
            tokio::spawn(async move {
                let result = flow.run(&voucher).await;
                progress.record_completed();
                result
            })
        })
        .collect();

    let mut results = Vec::with_capacity(records.len());
    for (voucher, joined) in records.iter().zip(join_all(handles).await) {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => {
                error!("[行 {}] 处理任务异常退出: {}", voucher.row_number, e);
                let mut result = flow.context().pending_result(voucher);
                result.fail(FailureKind::Internal, e.to_string());
                progress.record_completed();
                results.push(result);
            }
        }
    }

    info!("✅ 派发结束: {}/{}", progress.completed(), progress.total());
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::voucher_client::VoucherClient;
    use crate::config::Credentials;
    use crate::infrastructure::control_store::{MemoryControlStore, RunControlStore};
    use crate::infrastructure::event_hub::EventHub;
    use crate::infrastructure::log_sink::RunLog;
    use crate::infrastructure::rate_limiter::RateLimiter;
    use crate::models::client::{ClientInfo, Commission};
    use crate::models::context::UploadContext;
    use crate::models::control::RunControlState;
    use crate::models::result::STOPPED_BY_USER;
    use crate::services::submission_service::{RetryPolicy, SubmissionService};
    use std::time::{Duration, Instant};
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn voucher(row: usize) -> VoucherRecord {
        VoucherRecord {
            voucher_code: format!("CODE{}", row),
            pin: None,
            amount: 100,
            original_amount: "1".to_string(),
            expiry_date: 1704067200,
            original_validity: "1704067200".to_string(),
            row_number: row,
            original_row: vec![format!("CODE{}", row)],
        }
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let server = MockServer::start().await;
        // 第一张券最慢完成
        Mock::given(method("POST"))
            .and(body_string_contains("CODE2"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let creds = Credentials {
            base_url: server.uri(),
            username: "u".to_string(),
            password: "p".to_string(),
        };
        let ctx = Arc::new(UploadContext {
            run_id: "run".to_string(),
            client: ClientInfo::default(),
            commission: Commission::parse("1").unwrap(),
            procurement_id: "PROC0000000001".to_string(),
        });
        let (log, writer) = RunLog::open(&path, "run", EventHub::new()).await.unwrap();
        let client = VoucherClient::new(&creds, "", Duration::from_secs(5)).unwrap();
        let flow = VoucherFlow::new(
            Arc::new(MemoryControlStore::default()),
            RateLimiter::with_period(Duration::from_millis(1)),
            3,
            SubmissionService::new(client, RetryPolicy::default(), ctx, log.clone()),
            Duration::from_millis(10),
        );

        let records: Vec<VoucherRecord> = [2, 3, 5, 6, 7].into_iter().map(voucher).collect();
        let progress = Arc::new(ProgressReporter::new(log.clone(), records.len()));
        let results = dispatch(flow, progress.clone(), &records).await;

        let rows: Vec<usize> = results.iter().map(|r| r.row_number).collect();
        assert_eq!(rows, vec![2, 3, 5, 6, 7]);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(progress.completed(), 5);

        drop(progress);
        drop(log);
        writer.join().await;

        let content = std::fs::read_to_string(&path).unwrap();
        let progress_lines: Vec<&str> = content
            .lines()
            .filter(|l| l.starts_with("PROGRESS:"))
            .collect();
        assert_eq!(progress_lines.len(), 5);
        assert!(progress_lines.contains(&"PROGRESS:5:5:100"));
    }

    #[tokio::test]
    async fn test_stop_drains_queued_records_promptly() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let creds = Credentials {
            base_url: server.uri(),
            username: "u".to_string(),
            password: "p".to_string(),
        };
        let ctx = Arc::new(UploadContext {
            run_id: "run".to_string(),
            client: ClientInfo::default(),
            commission: Commission::parse("0").unwrap(),
            procurement_id: "PROC0000000001".to_string(),
        });
        let (log, _writer) = RunLog::open(dir.path().join("run.log"), "run", EventHub::new())
            .await
            .unwrap();
        let client = VoucherClient::new(&creds, "", Duration::from_secs(5)).unwrap();
        let control = Arc::new(MemoryControlStore::default());
        // 每秒 3 张、3 个并发：30 张券全部走完需要约 10 秒
        let flow = VoucherFlow::new(
            control.clone(),
            RateLimiter::new(3),
            3,
            SubmissionService::new(client, RetryPolicy::default(), ctx, log.clone()),
            Duration::from_millis(10),
        );

        let records: Vec<VoucherRecord> = (2..32).map(voucher).collect();
        let progress = Arc::new(ProgressReporter::new(log.clone(), records.len()));

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            control.write(RunControlState::Stopped).unwrap();
        });

        let started = Instant::now();
        let results = dispatch(flow, progress.clone(), &records).await;
        let elapsed = started.elapsed();
        stopper.await.unwrap();

        assert!(elapsed < Duration::from_secs(2), "drain took {:?}", elapsed);
        assert_eq!(results.len(), 30);
        assert_eq!(progress.completed(), 30);

        let submitted = results.iter().filter(|r| r.success).count();
        let stopped = results
            .iter()
            .filter(|r| r.error_message.as_deref() == Some(STOPPED_BY_USER))
            .count();
        assert!((1..=3).contains(&submitted), "submitted {}", submitted);
        assert_eq!(submitted + stopped, 30);
        assert_eq!(server.received_requests().await.unwrap().len(), submitted);
    }
}
