/// 券码发放 API 客户端
///
/// 封装单次提交调用：一次 POST，Basic 认证，固定超时。重试逻辑不在这里
use crate::config::Credentials;
use crate::error::ApiError;
use crate::models::voucher::VoucherRecord;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// 发放接口路径
pub const VOUCHER_BENEFITS_ENDPOINT: &str = "/offers/voucher-benefits";

const VOUCHER_TYPE: &str = "VOUCHER_TYPE_PERSONALISED";
const VOUCHER_STATUS: &str = "VOUCHER_BENEFIT_STATUS_UNCLAIMED";

/// 单张券的提交内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherBenefit {
    pub offer_id: String,
    pub voucher_type: String,
    pub voucher_status: String,
    /// 最小货币单位
    pub voucher_value: i64,
    pub expiry_date: i64,
    pub voucher_code: String,
    /// 佣金（最小货币单位的字符串形式）
    pub rzp_commission: String,
    pub procurement_batch_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pin: Option<String>,
}

/// 请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherBenefitsRequest {
    pub voucher_benefits: Vec<VoucherBenefit>,
}

impl VoucherBenefitsRequest {
    /// 为单张券构建请求体
    pub fn single(
        voucher: &VoucherRecord,
        offer_id: &str,
        commission_minor: i64,
        procurement_batch_id: &str,
    ) -> Self {
        Self {
            voucher_benefits: vec![VoucherBenefit {
                offer_id: offer_id.to_string(),
                voucher_type: VOUCHER_TYPE.to_string(),
                voucher_status: VOUCHER_STATUS.to_string(),
                voucher_value: voucher.amount,
                expiry_date: voucher.expiry_date,
                voucher_code: voucher.voucher_code.clone(),
                rzp_commission: commission_minor.to_string(),
                procurement_batch_id: procurement_batch_id.to_string(),
                pin: voucher.pin.clone(),
            }],
        }
    }
}

/// 远端响应：状态码与原始响应体，对本模块不透明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// 券码发放 API 客户端
#[derive(Debug, Clone)]
pub struct VoucherClient {
    http: reqwest::Client,
    url: String,
    username: String,
    password: String,
    user_id: String,
}

impl VoucherClient {
    /// 创建新的客户端
    ///
    /// # 参数
    /// - `credentials`: 环境凭据
    /// - `user_id`: 请求头 X-User-Id
    /// - `timeout`: 单次请求超时
    pub fn new(
        credentials: &Credentials,
        user_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self {
            http,
            url: format!(
                "{}{}",
                credentials.base_url.trim_end_matches('/'),
                VOUCHER_BENEFITS_ENDPOINT
            ),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            user_id: user_id.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 提交一次
    ///
    /// 只有网络层失败返回 `Err`；任何 HTTP 状态码都作为 `ApiResponse` 返回
    pub async fn submit(&self, request: &VoucherBenefitsRequest) -> Result<ApiResponse, ApiError> {
        let mut builder = self
            .http
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .header("X-User-Type", "advertiser")
            .json(request);
        if !self.user_id.is_empty() {
            builder = builder.header("X-User-Id", &self.user_id);
        }

        let response = builder.send().await.map_err(|e| self.transport(e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.transport(e))?;

        debug!("提交结果: status={} body={}", status, body);

        Ok(ApiResponse { status, body })
    }

    fn transport(&self, source: reqwest::Error) -> ApiError {
        ApiError::Transport {
            endpoint: self.url.clone(),
            source,
        }
    }
}
