use crate::error::ConfigError;
use crate::models::client::{ClientInfo, Commission};
use crate::services::submission_service::RetryPolicy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- 派发配置 ---
    /// 同时在途的提交数量
    pub max_workers: usize,
    /// 全局每秒请求数（所有 worker 共享）
    pub requests_per_second: u32,
    /// 每张券最多尝试次数
    pub max_retries: u32,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 普通失败后的等待（秒）
    pub retry_backoff_secs: u64,
    /// 远端限流（429）后的等待（秒）
    pub rate_limit_backoff_secs: u64,
    /// 暂停时轮询控制状态的间隔（毫秒）
    pub control_poll_millis: u64,
    // --- 存储配置 ---
    /// 运行目录的父目录
    pub uploads_dir: PathBuf,
    /// 全局采购批次 ID 记录
    pub procurement_log_file: PathBuf,
    /// 环境凭据文件（TOML）
    pub environments_file: PathBuf,
    // --- 上传上下文 ---
    /// 目标环境名
    pub upload_env: String,
    /// 请求头 X-User-Id
    pub api_user_id: String,
    /// 客户信息 JSON（优先于 client_name / offer_id）
    pub client_json: Option<String>,
    pub client_name: Option<String>,
    pub offer_id: Option<String>,
    /// 佣金（主单位文本）
    pub rzp_commission: String,
    /// 操作员
    pub operator: String,
    pub amount_type: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: 3,
            requests_per_second: 3,
            max_retries: 3,
            request_timeout_secs: 30,
            retry_backoff_secs: 2,
            rate_limit_backoff_secs: 5,
            control_poll_millis: 1000,
            uploads_dir: PathBuf::from("storage/stock_uploads"),
            procurement_log_file: PathBuf::from("storage/procurement_batch_id.txt"),
            environments_file: PathBuf::from("config/environments.toml"),
            upload_env: "UAT".to_string(),
            api_user_id: "rzp.merchant.MK6oPUp488NKF6".to_string(),
            client_json: None,
            client_name: None,
            offer_id: None,
            rzp_commission: "0".to_string(),
            operator: String::new(),
            amount_type: String::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_workers: std::env::var("MAX_WORKERS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_workers),
            requests_per_second: std::env::var("REQUESTS_PER_SECOND").ok().and_then(|v| v.parse().ok()).unwrap_or(default.requests_per_second),
            max_retries: std::env::var("MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retries),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            retry_backoff_secs: std::env::var("RETRY_BACKOFF_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_backoff_secs),
            rate_limit_backoff_secs: std::env::var("RATE_LIMIT_BACKOFF_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.rate_limit_backoff_secs),
            control_poll_millis: std::env::var("CONTROL_POLL_MILLIS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.control_poll_millis),
            uploads_dir: std::env::var("UPLOADS_DIR").map(PathBuf::from).unwrap_or(default.uploads_dir),
            procurement_log_file: std::env::var("PROCUREMENT_LOG_FILE").map(PathBuf::from).unwrap_or(default.procurement_log_file),
            environments_file: std::env::var("ENVIRONMENTS_FILE").map(PathBuf::from).unwrap_or(default.environments_file),
            upload_env: std::env::var("UPLOAD_ENV").unwrap_or(default.upload_env),
            api_user_id: std::env::var("API_USER_ID").unwrap_or(default.api_user_id),
            client_json: std::env::var("CLIENT_JSON").ok().or(default.client_json),
            client_name: std::env::var("CLIENT_NAME").ok().or(default.client_name),
            offer_id: std::env::var("OFFER_ID").ok().or(default.offer_id),
            rzp_commission: std::env::var("RZP_COMMISSION").unwrap_or(default.rzp_commission),
            operator: std::env::var("OPERATOR").unwrap_or(default.operator),
            amount_type: std::env::var("AMOUNT_TYPE").unwrap_or(default.amount_type),
        }
    }

    /// 客户信息：`client_json` 优先，否则使用独立字段
    pub fn client(&self) -> Result<ClientInfo, ConfigError> {
        match self.client_json.as_deref().map(str::trim) {
            Some(json) if !json.is_empty() => ClientInfo::from_json(json),
            _ => Ok(ClientInfo::new(self.client_name.clone(), self.offer_id.clone())),
        }
    }

    pub fn commission(&self) -> Result<Commission, ConfigError> {
        Commission::parse(&self.rzp_commission)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn control_poll_interval(&self) -> Duration {
        Duration::from_millis(self.control_poll_millis)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries.max(1),
            backoff: Duration::from_secs(self.retry_backoff_secs),
            rate_limit_backoff: Duration::from_secs(self.rate_limit_backoff_secs),
        }
    }

    /// 读取环境凭据文件
    pub fn load_environments(&self) -> Result<Environments, ConfigError> {
        let path = self.environments_file.display().to_string();
        let content = std::fs::read_to_string(&self.environments_file).map_err(|e| {
            ConfigError::EnvironmentsUnreadable {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;

        Environments::from_toml(&content).map_err(|e| ConfigError::EnvironmentsUnreadable {
            path,
            reason: e.to_string(),
        })
    }
}

/// 环境凭据
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// 所有环境（键为大写环境名）
#[derive(Debug, Clone, Default)]
pub struct Environments(HashMap<String, Credentials>);

impl Environments {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let raw: HashMap<String, Credentials> = toml::from_str(content)?;
        Ok(Self(
            raw.into_iter()
                .map(|(name, creds)| (name.to_uppercase(), creds))
                .collect(),
        ))
    }

    /// 按环境名查找（忽略大小写）
    pub fn get(&self, env: &str) -> Result<&Credentials, ConfigError> {
        let key = env.to_uppercase();
        self.0
            .get(&key)
            .ok_or(ConfigError::EnvironmentNotFound(key))
    }
}
