/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use crate::config::Config;
use crate::infrastructure::run_workspace::RunWorkspace;
use crate::models::result::RunSummary;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志（`RUST_LOG` 未设置时默认 info）
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `config`: 配置
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 券码批量上传模式");
    info!("🌐 目标环境: {}", config.upload_env);
    info!(
        "📊 最大并发数: {}，每秒请求数: {}，最多尝试: {}",
        config.max_workers, config.requests_per_second, config.max_retries
    );
    info!("{}", "=".repeat(60));
}

/// 记录运行目录信息
pub fn log_run_prepared(workspace: &RunWorkspace) {
    info!("✓ 运行 ID: {}", workspace.run_id);
    info!("📁 运行目录: {}", workspace.folder.display());
    info!("🏷️ 采购批次 ID: {}", workspace.procurement_id);
}

/// 打印最终统计信息
///
/// # 参数
/// - `summary`: 运行汇总
/// - `run_folder`: 运行目录
pub fn print_final_stats(summary: &RunSummary, run_folder: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.success, summary.total);
    info!("❌ 失败: {}", summary.failed);
    if !summary.failed_rows.is_empty() {
        info!("📝 失败行: {:?}", summary.failed_rows);
    }
    info!("📌 状态: {}", summary.status);
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", run_folder.display());
}
