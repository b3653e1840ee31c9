//! 运行控制状态存储 - 基础设施层
//!
//! 状态由外部（操作员）写入，派发器只读取。每次读取都是新鲜读取，不做缓存；
//! 读取失败按 `Running` 处理，避免一次偶发读错误卡住整批

use crate::error::ControlError;
use crate::models::control::{ControlAction, ControlFile, RunControlState};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info};

/// 控制文件名
pub const CONTROL_FILE_NAME: &str = "control.json";

/// 运行控制状态存储
pub trait RunControlStore: Send + Sync {
    /// 读取当前状态（失败时返回 `Running`）
    fn read(&self) -> RunControlState;

    /// 写入新状态
    fn write(&self, state: RunControlState) -> Result<(), ControlError>;

    /// 对应的运行是否存在
    fn exists(&self) -> bool {
        true
    }
}

/// 基于 `control.json` 的存储
#[derive(Debug, Clone)]
pub struct FileControlStore {
    path: PathBuf,
}

impl FileControlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 使用运行目录下的 `control.json`
    pub fn in_run_folder(run_folder: &Path) -> Self {
        Self::new(run_folder.join(CONTROL_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RunControlStore for FileControlStore {
    fn read(&self) -> RunControlState {
        let parsed = fs::read(&self.path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                serde_json::from_slice::<ControlFile>(&bytes).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(control) => control.state,
            Err(e) => {
                debug!("控制文件读取失败，按 running 处理: {}", e);
                RunControlState::Running
            }
        }
    }

    fn write(&self, state: RunControlState) -> Result<(), ControlError> {
        let data = serde_json::to_vec_pretty(&ControlFile { state })
            .map_err(|e| ControlError::Io(std::io::Error::other(e)))?;

        // 先写临时文件再改名，避免读到半截内容
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// 内存存储，基于 `watch` 通道
#[derive(Debug)]
pub struct MemoryControlStore {
    tx: watch::Sender<RunControlState>,
}

impl MemoryControlStore {
    pub fn new(initial: RunControlState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<RunControlState> {
        self.tx.subscribe()
    }
}

impl Default for MemoryControlStore {
    fn default() -> Self {
        Self::new(RunControlState::Running)
    }
}

impl RunControlStore for MemoryControlStore {
    fn read(&self) -> RunControlState {
        *self.tx.borrow()
    }

    fn write(&self, state: RunControlState) -> Result<(), ControlError> {
        self.tx.send_replace(state);
        Ok(())
    }
}

/// 在阻塞线程池中读取控制状态（文件存储是同步 IO）
///
/// 读取任务异常时同样按 `Running` 处理
pub async fn read_state(store: &Arc<dyn RunControlStore>) -> RunControlState {
    let store = store.clone();
    match tokio::task::spawn_blocking(move || store.read()).await {
        Ok(state) => state,
        Err(e) => {
            debug!("控制状态读取任务失败，按 running 处理: {}", e);
            RunControlState::Running
        }
    }
}

/// 停止信号
///
/// 一个后台任务按固定间隔读取控制状态，读到 `Stopped` 后通知所有等待者。
/// 所有句柄都被丢弃后后台任务退出
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// 启动轮询任务（需要在 tokio 运行时内调用）
    ///
    /// # 参数
    /// - `store`: 控制状态存储
    /// - `poll_interval`: 轮询间隔
    pub fn spawn(store: Arc<dyn RunControlStore>, poll_interval: Duration) -> Self {
        let (tx, rx) = watch::channel(false);

        tokio::spawn(async move {
            loop {
                if read_state(&store).await == RunControlState::Stopped {
                    info!("⏹️ 收到停止指令");
                    let _ = tx.send(true);
                    break;
                }
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = sleep(poll_interval) => {}
                }
            }
        });

        Self { rx }
    }

    /// 等待停止；轮询任务未停止就退出时永不返回
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// 操作员控制入口：校验运行存在并应用指令
///
/// # 返回
/// 返回写入后的新状态
pub fn apply_control_action(
    store: &dyn RunControlStore,
    run_id: &str,
    action: ControlAction,
) -> Result<RunControlState, ControlError> {
    if !store.exists() {
        return Err(ControlError::RunNotFound(run_id.to_string()));
    }

    let next = action.apply(store.read())?;
    store.write(next)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileControlStore::in_run_folder(dir.path());

        store.write(RunControlState::Paused).unwrap();
        assert_eq!(store.read(), RunControlState::Paused);

        store.write(RunControlState::Stopped).unwrap();
        assert_eq!(store.read(), RunControlState::Stopped);
    }

    #[test]
    fn test_file_store_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileControlStore::in_run_folder(dir.path());

        // 文件不存在
        assert_eq!(store.read(), RunControlState::Running);

        // 内容损坏
        fs::write(store.path(), b"{not json").unwrap();
        assert_eq!(store.read(), RunControlState::Running);
    }

    #[test]
    fn test_apply_action_requires_existing_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileControlStore::in_run_folder(dir.path());

        let err = apply_control_action(&store, "run-1", ControlAction::Pause).unwrap_err();
        assert!(matches!(err, ControlError::RunNotFound(_)));
    }

    #[test]
    fn test_apply_action_rejects_resume_after_stop() {
        let store = MemoryControlStore::default();

        assert_eq!(
            apply_control_action(&store, "run-1", ControlAction::Stop).unwrap(),
            RunControlState::Stopped
        );
        assert!(matches!(
            apply_control_action(&store, "run-1", ControlAction::Resume),
            Err(ControlError::AlreadyStopped)
        ));
        assert_eq!(store.read(), RunControlState::Stopped);
    }

    #[tokio::test]
    async fn test_read_state_off_the_async_thread() {
        let dir = tempfile::tempdir().unwrap();
        let file_store = FileControlStore::in_run_folder(dir.path());
        file_store.write(RunControlState::Paused).unwrap();

        let store: Arc<dyn RunControlStore> = Arc::new(file_store);
        assert_eq!(read_state(&store).await, RunControlState::Paused);
    }

    #[tokio::test]
    async fn test_stop_signal_fires_after_stop_is_written() {
        let store = Arc::new(MemoryControlStore::default());
        let signal = StopSignal::spawn(store.clone(), Duration::from_millis(10));

        let early = tokio::time::timeout(Duration::from_millis(50), signal.stopped()).await;
        assert!(early.is_err());

        store.write(RunControlState::Stopped).unwrap();
        tokio::time::timeout(Duration::from_secs(1), signal.stopped())
            .await
            .unwrap();

        // 已停止后再次等待立即返回
        tokio::time::timeout(Duration::from_millis(50), signal.stopped())
            .await
            .unwrap();
    }

    #[test]
    fn test_memory_store_notifies_subscribers() {
        let store = MemoryControlStore::default();
        let rx = store.subscribe();

        store.write(RunControlState::Paused).unwrap();
        assert_eq!(*rx.borrow(), RunControlState::Paused);
    }
}
