use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入文件结构错误（整批终止）
    #[error("输入文件错误: {0}")]
    Schema(#[from] SchemaError),
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 运行控制错误
    #[error("控制错误: {0}")]
    Control(#[from] ControlError),
}

/// 输入文件结构错误
///
/// 在派发之前发生，整个运行直接终止
#[derive(Debug, Error)]
pub enum SchemaError {
    /// 行数不足（至少需要表头 + 一行数据）
    #[error("CSV file is empty or has no data rows")]
    TooFewRows,
    /// 缺少必需列
    #[error("required column '{column}' (or {aliases}) not found")]
    MissingColumn {
        column: &'static str,
        aliases: &'static str,
    },
    /// 所有数据行都被跳过
    #[error("CSV file has no valid voucher rows")]
    NoValidRows,
    /// CSV 本身无法解析
    #[error("CSV 解析失败: {0}")]
    Csv(#[from] csv::Error),
}

/// API 调用错误
///
/// 只影响单行结果，不会终止整个运行
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败（连接、超时等）
    #[error("{source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 无法构建 HTTP 客户端
    #[error("HTTP 客户端初始化失败: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入 CSV 失败
    #[error("写入CSV失败 ({path}): {source}")]
    CsvWriteFailed {
        path: String,
        #[source]
        source: csv::Error,
    },
    /// JSON 序列化/反序列化失败
    #[error("JSON处理失败 ({path}): {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境配置文件无法读取或解析
    #[error("Failed to load environments from {path}: {reason}")]
    EnvironmentsUnreadable { path: String, reason: String },
    /// 找不到指定环境
    #[error("Environment '{0}' not found in configuration")]
    EnvironmentNotFound(String),
    /// 客户信息格式错误
    #[error("客户信息解析失败: {0}")]
    InvalidClient(#[source] serde_json::Error),
    /// 佣金格式错误
    #[error("佣金格式错误: '{0}'")]
    InvalidCommission(String),
}

/// 运行控制错误
#[derive(Debug, Error)]
pub enum ControlError {
    /// 未知操作
    #[error("Invalid action: {0}")]
    InvalidAction(String),
    /// 运行不存在
    #[error("Run not found: {0}")]
    RunNotFound(String),
    /// 已停止的运行不能恢复
    #[error("Run is stopped and cannot be resumed")]
    AlreadyStopped,
    /// 控制文件读写失败
    #[error("Cannot update control file: {0}")]
    Io(#[from] std::io::Error),
}

// ========== 便捷构造函数 ==========

impl FileError {
    /// 创建文件读取错误
    pub fn read(path: impl Into<String>, source: std::io::Error) -> Self {
        FileError::ReadFailed {
            path: path.into(),
            source,
        }
    }

    /// 创建文件写入错误
    pub fn write(path: impl Into<String>, source: std::io::Error) -> Self {
        FileError::WriteFailed {
            path: path.into(),
            source,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
