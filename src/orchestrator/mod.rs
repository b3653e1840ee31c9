//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次运行的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量上传处理器
//! - 管理运行生命周期（准备、执行、结束信号）
//! - 加载环境凭据和输入文件
//! - 导出结果、发布汇总
//! - 外部控制入口（暂停 / 恢复 / 停止）
//!
//! ### `dispatcher` - 并发派发器
//! - 每张券一个任务
//! - 按输入顺序收集结果
//! - 每完成一张券发布一次进度
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理一次运行)
//!     ↓
//! dispatcher (处理 Vec<VoucherRecord>)
//!     ↓
//! workflow::VoucherFlow (处理单张券)
//!     ↓
//! services (能力层：submission / progress / export)
//!     ↓
//! infrastructure (基础设施：限速器、控制状态、运行日志)
//! ```

pub mod batch_processor;
pub mod dispatcher;

// 重新导出主要类型
pub use batch_processor::{control_run, App, RunOutcome};
pub use dispatcher::dispatch;
