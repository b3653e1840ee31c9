//! 提交服务 - 业务能力层
//!
//! 只负责"把一张券提交到远端"，包含重试策略：
//! - 网络失败：等待 `backoff` 后重试
//! - 200：成功，不再重试
//! - 429：等待 `rate_limit_backoff` 后重试
//! - 其他状态：记录响应体，等待 `backoff` 后重试
//!
//! 同一张券的多次尝试严格串行

use crate::clients::voucher_client::{VoucherBenefitsRequest, VoucherClient};
use crate::infrastructure::log_sink::RunLog;
use crate::models::context::UploadContext;
use crate::models::result::{FailureKind, UploadResult};
use crate::models::voucher::VoucherRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最多尝试次数（含第一次）
    pub max_retries: u32,
    /// 普通失败后的等待
    pub backoff: Duration,
    /// 远端限流后的等待
    pub rate_limit_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_secs(2),
            rate_limit_backoff: Duration::from_secs(5),
        }
    }
}

/// 提交服务
#[derive(Clone)]
pub struct SubmissionService {
    client: VoucherClient,
    policy: RetryPolicy,
    ctx: Arc<UploadContext>,
    log: RunLog,
}

impl SubmissionService {
    pub fn new(
        client: VoucherClient,
        policy: RetryPolicy,
        ctx: Arc<UploadContext>,
        log: RunLog,
    ) -> Self {
        Self {
            client,
            policy,
            ctx,
            log,
        }
    }

    pub fn context(&self) -> &UploadContext {
        &self.ctx
    }

    /// 提交一张券（含重试）
    ///
    /// # 参数
    /// - `voucher`: 券码记录
    ///
    /// # 返回
    /// 返回该券的最终结果，`retry_count` 为实际尝试次数
    pub async fn submit(&self, voucher: &VoucherRecord) -> UploadResult {
        let mut result = self.ctx.pending_result(voucher);
        let request = VoucherBenefitsRequest::single(
            voucher,
            self.ctx.offer_id(),
            self.ctx.commission.minor,
            &self.ctx.procurement_id,
        );
        let max = self.policy.max_retries.max(1);

        for attempt in 1..=max {
            result.retry_count = attempt;
            let has_next = attempt < max;

            let response = match self.client.submit(&request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(
                        "[行 {}] 请求失败 (尝试 {}/{}): {}",
                        voucher.row_number, attempt, max, e
                    );
                    result.fail(FailureKind::Transport, e.to_string());
                    if has_next {
                        sleep(self.policy.backoff).await;
                    }
                    continue;
                }
            };

            result.status_code = Some(response.status);
            result.api_response = response.body.clone();

            match response.status {
                200 => {
                    result.succeed();
                    self.log.line(self.row_log(voucher, "Success"));
                    return result;
                }
                429 => {
                    debug!("[行 {}] 远端限流，等待后重试", voucher.row_number);
                    result.fail(FailureKind::RateLimited, "Rate limited");
                    if has_next {
                        sleep(self.policy.rate_limit_backoff).await;
                    }
                }
                status => {
                    debug!(
                        "[行 {}] 远端返回 {} (尝试 {}/{})",
                        voucher.row_number, status, attempt, max
                    );
                    result.fail(FailureKind::RemoteStatus, response.body);
                    if has_next {
                        sleep(self.policy.backoff).await;
                    }
                }
            }
        }

        let reason = result.error_message.clone().unwrap_or_default();
        self.log
            .line(self.row_log(voucher, &format!("Failure - {}", reason)));
        result
    }

    /// `ROW_LOG:客户,券码,佣金,有效期 (epoch),结果`
    fn row_log(&self, voucher: &VoucherRecord, outcome: &str) -> String {
        format!(
            "ROW_LOG:{},{},{},{},{}",
            self.ctx.client_name(),
            voucher.voucher_code,
            self.ctx.commission.input,
            voucher.validity_display(),
            outcome
        )
    }
}
