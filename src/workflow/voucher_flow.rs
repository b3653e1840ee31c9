//! 单张券处理流程 - 流程层
//!
//! 核心职责：定义"一张券"从排队到提交的完整流程
//!
//! 流程顺序：
//! 1. 读取控制状态：停止则直接记为 "Stopped by user"，暂停则轮询等待
//! 2. 等待全局限速节拍
//! 3. 获取并发槽位
//! 4. 再次检查控制状态（等待期间可能已被暂停或停止）
//! 5. 提交（含重试），结束后释放槽位
//!
//! 第 2、3 步的等待可被停止信号打断，停止后排队中的券立即记为停止。
//! 停止只阻止新的提交开始，正在进行中的请求不会被中断

use crate::infrastructure::control_store::{read_state, RunControlStore, StopSignal};
use crate::infrastructure::rate_limiter::RateLimiter;
use crate::models::context::UploadContext;
use crate::models::control::RunControlState;
use crate::models::result::{FailureKind, UploadResult};
use crate::models::voucher::VoucherRecord;
use crate::services::submission_service::SubmissionService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 单张券处理流程
///
/// - 只读控制状态，从不写入
/// - 限速器和并发槽位在所有券之间共享
#[derive(Clone)]
pub struct VoucherFlow {
    control: Arc<dyn RunControlStore>,
    limiter: RateLimiter,
    slots: Arc<Semaphore>,
    submitter: SubmissionService,
    poll_interval: Duration,
    stop: StopSignal,
}

impl VoucherFlow {
    /// 创建新的处理流程
    ///
    /// # 参数
    /// - `control`: 运行控制状态
    /// - `limiter`: 全局限速器
    /// - `max_workers`: 并发槽位数量
    /// - `submitter`: 提交服务
    /// - `poll_interval`: 暂停时以及停止信号的轮询间隔
    ///
    /// 会启动停止信号的轮询任务，需要在 tokio 运行时内调用
    pub fn new(
        control: Arc<dyn RunControlStore>,
        limiter: RateLimiter,
        max_workers: usize,
        submitter: SubmissionService,
        poll_interval: Duration,
    ) -> Self {
        let stop = StopSignal::spawn(control.clone(), poll_interval);

        Self {
            control,
            limiter,
            slots: Arc::new(Semaphore::new(max_workers.max(1))),
            submitter,
            poll_interval,
            stop,
        }
    }

    pub fn context(&self) -> &UploadContext {
        self.submitter.context()
    }

    pub async fn run(&self, voucher: &VoucherRecord) -> UploadResult {
        let ctx = self.submitter.context();

        if self.wait_while_paused(voucher).await == RunControlState::Stopped {
            debug!("[行 {}] 运行已停止，跳过", voucher.row_number);
            return ctx.stopped_result(voucher);
        }

        tokio::select! {
            biased;
            _ = self.stop.stopped() => {
                debug!("[行 {}] 等待限速节拍时运行已停止", voucher.row_number);
                return ctx.stopped_result(voucher);
            }
            _ = self.limiter.wait() => {}
        }

        let _permit = tokio::select! {
            biased;
            _ = self.stop.stopped() => {
                debug!("[行 {}] 等待并发槽位时运行已停止", voucher.row_number);
                return ctx.stopped_result(voucher);
            }
            permit = self.slots.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(e) => {
                    error!("[行 {}] 获取并发槽位失败: {}", voucher.row_number, e);
                    let mut result = ctx.pending_result(voucher);
                    result.fail(FailureKind::Internal, e.to_string());
                    return result;
                }
            },
        };

        if self.wait_while_paused(voucher).await == RunControlState::Stopped {
            debug!("[行 {}] 等待期间运行已停止，跳过", voucher.row_number);
            return ctx.stopped_result(voucher);
        }

        self.submitter.submit(voucher).await
    }

    /// 暂停时轮询，直到状态变为运行或停止
    async fn wait_while_paused(&self, voucher: &VoucherRecord) -> RunControlState {
        let mut state = read_state(&self.control).await;
        if state == RunControlState::Paused {
            info!("⏸️ [行 {}] 运行已暂停，等待恢复", voucher.row_number);
        }
        while state == RunControlState::Paused {
            sleep(self.poll_interval).await;
            state = read_state(&self.control).await;
        }
        state
    }
}
