//! # Voucher Upload
//!
//! 一个用于批量发放预付券码的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 模型层（Models）
//! - `models/` - 券码记录、上传结果、运行控制状态、客户信息
//! - `loaders::csv_loader` - CSV → `VoucherRecord`（列名别名、金额换算、日期解析）
//!
//! ### ② 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有共享资源，只暴露能力
//! - `RateLimiter` - 全局限速节拍，所有 worker 共享
//! - `RunControlStore` - 外部可写的运行控制状态（fail-open 读取）
//! - `RunLog` - 唯一的运行日志写入者，同时转发到 `EventHub`
//! - `RunWorkspace` - 运行目录
//!
//! ### ③ 客户端层（Clients）
//! - `VoucherClient` - 单次提交调用（Basic 认证、固定超时）
//!
//! ### ④ 业务能力层（Services）
//! - `SubmissionService` - 单张券提交（含重试）
//! - `ProgressReporter` - 进度、横幅与汇总消息
//! - `ResultExporter` - 结果导出
//!
//! ### ⑤ 流程层（Workflow）
//! - `VoucherFlow` - 一张券的流程（控制检查 → 限速 → 槽位 → 再检查 → 提交）
//!
//! ### ⑥ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 一次运行的生命周期
//! - `orchestrator/dispatcher` - 并发派发，按输入顺序收集结果
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::VoucherClient;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{EventHub, RunEvent, RunWorkspace};
pub use models::{RunControlState, RunSummary, SummaryReport, UploadResult, VoucherRecord};
pub use orchestrator::{control_run, App, RunOutcome};
pub use workflow::VoucherFlow;
