//! 批量上传处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次运行的完整生命周期。
//!
//! ## 核心功能
//!
//! 1. **准备运行**：创建运行目录（原始文件副本、元数据、采购批次 ID、控制文件）
//! 2. **加载配置**：读取环境凭据，写入配置横幅
//! 3. **解析输入**：CSV → `VoucherRecord`，坏行写入警告后跳过
//! 4. **并发派发**：委托 dispatcher，按输入顺序收集结果
//! 5. **导出与汇总**：写出结果表格，发布 `SUMMARY:` 和结束信号
//!
//! 派发前的任何错误都会写入 `ERROR: ...` 并以退出码 1 结束，
//! 单行失败不会中断整个运行

use crate::clients::voucher_client::{VoucherClient, VOUCHER_BENEFITS_ENDPOINT};
use crate::config::Config;
use crate::error::{AppResult, ControlError};
use crate::infrastructure::control_store::{apply_control_action, FileControlStore};
use crate::infrastructure::event_hub::EventHub;
use crate::infrastructure::log_sink::{RunLog, RUN_LOG_FILE_NAME};
use crate::infrastructure::rate_limiter::RateLimiter;
use crate::infrastructure::run_workspace::RunWorkspace;
use crate::models::context::UploadContext;
use crate::models::control::{ControlAction, RunControlState};
use crate::models::loaders::load_vouchers;
use crate::models::result::{RunSummary, SummaryReport, UploadResult};
use crate::orchestrator::dispatcher::dispatch;
use crate::services::export_service::ResultExporter;
use crate::services::progress::{write_config_banner, write_summary, ProgressReporter};
use crate::services::submission_service::SubmissionService;
use crate::utils::logging::{log_run_prepared, log_startup, print_final_stats};
use crate::workflow::voucher_flow::VoucherFlow;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// 一次运行的结果
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: String,
    /// 结束信号的退出码：有失败即为 1
    pub exit_code: i32,
    /// 派发前失败时为 `None`
    pub report: Option<SummaryReport>,
}

/// 应用主结构
pub struct App {
    config: Config,
    hub: EventHub,
}

impl App {
    /// 初始化应用
    ///
    /// # 参数
    /// - `config`: 配置
    /// - `hub`: 实时事件中心（观察者通过它订阅运行日志）
    pub fn initialize(config: Config, hub: EventHub) -> Self {
        log_startup(&config);
        Self { config, hub }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    /// 为上传文件创建运行目录
    pub async fn prepare(&self, csv_path: &Path) -> Result<RunWorkspace> {
        let client = self.config.client().context("Invalid client metadata")?;
        let workspace = RunWorkspace::create(&self.config, &client, csv_path).await?;
        log_run_prepared(&workspace);
        Ok(workspace)
    }

    /// 执行一次运行
    ///
    /// 无论成功与否都会发出结束信号
    pub async fn execute(&self, workspace: &RunWorkspace) -> Result<RunOutcome> {
        let (log, writer) = RunLog::open(
            workspace.join(RUN_LOG_FILE_NAME),
            workspace.run_id.clone(),
            self.hub.clone(),
        )
        .await?;

        let (exit_code, report) = match self.pipeline(workspace, &log).await {
            Ok(report) => (report.summary.exit_code(), Some(report)),
            Err(e) => {
                error!("❌ 运行 {} 失败: {:#}", workspace.run_id, e);
                log.line(format!("ERROR: {:#}", e));
                (1, None)
            }
        };

        log.finish(exit_code).await;
        drop(log);
        writer.join().await;

        if let Some(report) = &report {
            print_final_stats(&report.summary, &workspace.folder);
        }

        Ok(RunOutcome {
            run_id: workspace.run_id.clone(),
            exit_code,
            report,
        })
    }

    /// 运行主流程：配置 → 解析 → 派发 → 导出 → 汇总
    async fn pipeline(&self, workspace: &RunWorkspace, log: &RunLog) -> Result<SummaryReport> {
        let environments = self.config.load_environments()?;
        let credentials = environments.get(&self.config.upload_env)?;
        let commission = self.config.commission()?;
        let client = workspace.metadata.client.clone();

        write_config_banner(
            log,
            &self.config.upload_env.to_uppercase(),
            &credentials.base_url,
            VOUCHER_BENEFITS_ENDPOINT,
            client.offer_id_or_empty(),
            &commission,
        );

        let batch = load_vouchers(&workspace.raw_csv)
            .await
            .context("Failed to parse CSV")?;
        for warning in &batch.warnings {
            log.line(warning.to_string());
        }

        let total = batch.records.len();
        log.line(format!("Found {} vouchers to upload", total));
        log.blank();

        let ctx = Arc::new(UploadContext {
            run_id: workspace.run_id.clone(),
            client,
            commission,
            procurement_id: workspace.procurement_id.clone(),
        });
        info!("📋 {} 共 {} 张券", ctx, total);

        let client = VoucherClient::new(
            credentials,
            self.config.api_user_id.clone(),
            self.config.request_timeout(),
        )?;
        let submitter = SubmissionService::new(
            client,
            self.config.retry_policy(),
            ctx.clone(),
            log.clone(),
        );
        let flow = VoucherFlow::new(
            Arc::new(workspace.control_store()),
            RateLimiter::new(self.config.requests_per_second),
            self.config.max_workers,
            submitter,
            self.config.control_poll_interval(),
        );
        let progress = Arc::new(ProgressReporter::new(log.clone(), total));

        let results = dispatch(flow, progress, &batch.records).await;

        let report = self.finalize(workspace, log, batch.headers, results)?;
        write_summary(log, &report);
        Ok(report)
    }

    /// 导出结果并生成汇总
    fn finalize(
        &self,
        workspace: &RunWorkspace,
        log: &RunLog,
        headers: Vec<String>,
        results: Vec<UploadResult>,
    ) -> Result<SummaryReport> {
        let exporter = ResultExporter::new(&workspace.folder, headers);
        let files = exporter
            .export(&results, chrono::Local::now())
            .context("Failed to save results")?;

        log.blank();
        log.line(format!(
            "Results saved to: {}",
            workspace.join(&files.results).display()
        ));
        if let Some(failures) = &files.failures {
            log.line(format!(
                "Failed uploads saved to: {}",
                workspace.join(failures).display()
            ));
        }

        let summary = RunSummary::from_results(&results);
        let failed_results = results.into_iter().filter(|r| !r.success).collect();

        Ok(SummaryReport {
            summary,
            procurement_batch_id: workspace.procurement_id.clone(),
            failed_results,
            result_csv_path: files.results,
            failed_csv_path: files.failures,
            run_id: workspace.run_id.clone(),
        })
    }
}

/// 外部控制入口：暂停 / 恢复 / 停止某次运行
///
/// # 参数
/// - `run_folder`: 运行目录
/// - `action`: 控制指令文本（`pause` / `resume` / `stop`）
///
/// # 返回
/// 返回写入后的新状态
pub fn control_run(run_folder: &Path, action: &str) -> AppResult<RunControlState> {
    let action: ControlAction = action.parse()?;
    let run_id = run_folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| ControlError::RunNotFound(run_folder.display().to_string()))?;

    let store = FileControlStore::in_run_folder(run_folder);
    let state = apply_control_action(&store, &run_id, action)?;
    info!("🎛️ 运行 {} 状态已更新为 {}", run_id, state);
    Ok(state)
}
