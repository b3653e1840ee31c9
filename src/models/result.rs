use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 操作员停止时写入每行的原因
pub const STOPPED_BY_USER: &str = "Stopped by user";

/// 失败类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 操作员停止
    StoppedByOperator,
    /// 网络层失败（连接、超时）
    Transport,
    /// 远端限流（429）
    RateLimited,
    /// 远端返回非 200 状态
    RemoteStatus,
    /// 内部错误（任务异常退出等）
    Internal,
}

/// 单行上传结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub row_number: usize,
    pub voucher_code: String,
    pub original_row: Vec<String>,
    pub client_name: String,
    pub offer_id: String,
    pub rzp_commission: String,
    pub epoch_time: i64,
    pub procurement_id: String,
    pub success: bool,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub api_response: String,
    /// 实际消耗的尝试次数
    pub retry_count: u32,
    pub original_validity: String,
}

impl UploadResult {
    /// 记录失败
    pub fn fail(&mut self, kind: FailureKind, message: impl Into<String>) {
        self.success = false;
        self.failure_kind = Some(kind);
        self.error_message = Some(message.into());
    }

    /// 记录成功，清除之前尝试留下的错误
    pub fn succeed(&mut self) {
        self.success = true;
        self.failure_kind = None;
        self.error_message = None;
    }

    /// 导出列 `success_failure`
    pub fn outcome_label(&self) -> &'static str {
        if self.success {
            "Success"
        } else {
            "Failure"
        }
    }
}

/// 运行整体状态，完全由成功/失败计数推导
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Success,
    Failed,
    PartialSuccess,
}

impl RunStatus {
    pub fn derive(total: usize, success: usize, failed: usize) -> Self {
        if failed == 0 && total > 0 {
            RunStatus::Success
        } else if success == 0 && failed > 0 {
            RunStatus::Failed
        } else {
            RunStatus::PartialSuccess
        }
    }
}

impl Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => write!(f, "Success"),
            RunStatus::Failed => write!(f, "Failed"),
            RunStatus::PartialSuccess => write!(f, "Partial Success"),
        }
    }
}

/// 运行汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    /// 失败行的表格行号
    pub failed_rows: Vec<usize>,
    pub status: RunStatus,
}

impl RunSummary {
    pub fn from_results(results: &[UploadResult]) -> Self {
        let success = results.iter().filter(|r| r.success).count();
        let failed_rows: Vec<usize> = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.row_number)
            .collect();
        let failed = failed_rows.len();

        Self {
            total: results.len(),
            success,
            failed,
            failed_rows,
            status: RunStatus::derive(results.len(), success, failed),
        }
    }

    /// 结束信号的退出码：有失败即为 1
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            1
        } else {
            0
        }
    }
}

/// `SUMMARY:` 行携带的完整报告
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    #[serde(flatten)]
    pub summary: RunSummary,
    #[serde(rename = "procurementBatchID")]
    pub procurement_batch_id: String,
    pub failed_results: Vec<UploadResult>,
    pub result_csv_path: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failed_csv_path: Option<String>,
    pub run_id: String,
}
