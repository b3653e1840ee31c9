//! 运行日志写入器 - 基础设施层
//!
//! 唯一持有运行日志文件的写入者：所有 worker 通过通道把整行文本交给它，
//! 它按到达顺序追加到文件并转发到实时通道。每行是原子的，不同 worker 之间不保证行序

use crate::infrastructure::event_hub::EventHub;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::error;

/// 运行日志文件名
pub const RUN_LOG_FILE_NAME: &str = "terminal_output.log";

enum LogCommand {
    Line(String),
    Finish {
        exit_code: i32,
        done: oneshot::Sender<()>,
    },
}

/// 运行日志句柄（可克隆，供多个 worker 共享）
#[derive(Clone)]
pub struct RunLog {
    tx: mpsc::UnboundedSender<LogCommand>,
}

/// 后台写入任务
pub struct RunLogWriter {
    handle: JoinHandle<()>,
    path: PathBuf,
}

impl RunLog {
    /// 打开运行日志并启动写入任务
    ///
    /// # 参数
    /// - `path`: 日志文件路径（会被截断重建）
    /// - `run_id`: 运行 ID，实时通道的键
    /// - `hub`: 实时事件中心
    pub async fn open(
        path: impl AsRef<Path>,
        run_id: impl Into<String>,
        hub: EventHub,
    ) -> Result<(Self, RunLogWriter)> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(file, rx, run_id.into(), hub));

        Ok((Self { tx }, RunLogWriter { handle, path }))
    }

    /// 写入一行（自动补换行）
    pub fn line(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        let line = if message.ends_with('\n') {
            message.to_string()
        } else {
            format!("{}\n", message)
        };
        let _ = self.tx.send(LogCommand::Line(line));
    }

    /// 写入空行
    pub fn blank(&self) {
        self.line("");
    }

    /// 发出结束信号，并等待之前的所有行落盘
    pub async fn finish(&self, exit_code: i32) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(LogCommand::Finish { exit_code, done }).is_ok() {
            let _ = wait.await;
        }
    }
}

impl RunLogWriter {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 等待写入任务退出（所有句柄都被丢弃后）
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            error!("运行日志写入任务异常退出: {}", e);
        }
    }
}

async fn run_writer(
    mut file: tokio::fs::File,
    mut rx: mpsc::UnboundedReceiver<LogCommand>,
    run_id: String,
    hub: EventHub,
) {
    while let Some(command) = rx.recv().await {
        match command {
            LogCommand::Line(line) => {
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    error!("写入运行日志失败: {}", e);
                }
                hub.publish(&run_id, line);
            }
            LogCommand::Finish { exit_code, done } => {
                if let Err(e) = file.flush().await {
                    error!("刷新运行日志失败: {}", e);
                }
                hub.finish(&run_id, exit_code);
                let _ = done.send(());
            }
        }
    }

    let _ = file.flush().await;
}
