//! 运行目录 - 基础设施层
//!
//! 每次运行在上传目录下拥有独立文件夹：
//!
//! ```text
//! <uploads_dir>/<run_id>/
//!     raw.csv                    上传文件副本
//!     meta.json                  运行元数据
//!     procurement_batch_id.txt   采购批次 ID
//!     control.json               运行控制状态
//!     terminal_output.log        运行日志
//!     upload_results_*.csv       导出结果
//! ```

use crate::config::Config;
use crate::error::FileError;
use crate::infrastructure::control_store::{FileControlStore, RunControlStore};
use crate::models::client::ClientInfo;
use crate::models::control::RunControlState;
use crate::utils::ids::{generate_procurement_id, generate_run_id};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

pub const RAW_CSV_NAME: &str = "raw.csv";
pub const META_FILE_NAME: &str = "meta.json";
pub const PROCUREMENT_ID_FILE_NAME: &str = "procurement_batch_id.txt";

/// 运行元数据（`meta.json`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub run_id: String,
    pub file_name: String,
    pub user: String,
    pub env: String,
    pub client: ClientInfo,
    pub amount_type: String,
    pub rzp_commission_input: String,
}

/// 一次运行的工作目录
#[derive(Debug, Clone)]
pub struct RunWorkspace {
    pub run_id: String,
    pub folder: PathBuf,
    pub raw_csv: PathBuf,
    pub procurement_id: String,
    pub metadata: RunMetadata,
}

impl RunWorkspace {
    /// 创建运行目录
    ///
    /// # 参数
    /// - `config`: 配置
    /// - `client`: 客户信息
    /// - `csv_path`: 上传的 CSV 文件
    pub async fn create(config: &Config, client: &ClientInfo, csv_path: &Path) -> Result<Self> {
        let file_name = csv_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.csv".to_string());
        let file_stem = csv_path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let procurement_id = generate_procurement_id();
        let run_id = generate_run_id(&file_stem, chrono::Local::now(), &procurement_id);
        let folder = config.uploads_dir.join(&run_id);

        fs::create_dir_all(&config.uploads_dir)
            .await
            .map_err(|e| FileError::write(config.uploads_dir.display().to_string(), e))
            .context("Failed to create uploads folder")?;
        // 已存在的运行目录不复用
        fs::create_dir(&folder)
            .await
            .map_err(|e| FileError::write(folder.display().to_string(), e))
            .context("Failed to create run folder")?;

        // 保存上传文件副本
        let raw_csv = folder.join(RAW_CSV_NAME);
        fs::copy(csv_path, &raw_csv)
            .await
            .map_err(|e| FileError::read(csv_path.display().to_string(), e))
            .context("Failed to save file")?;

        let metadata = RunMetadata {
            run_id: run_id.clone(),
            file_name: file_name.clone(),
            user: config.operator.clone(),
            env: config.upload_env.clone(),
            client: client.clone(),
            amount_type: config.amount_type.clone(),
            rzp_commission_input: config.rzp_commission.clone(),
        };
        let meta_path = folder.join(META_FILE_NAME);
        let meta_json = serde_json::to_vec_pretty(&metadata).map_err(|e| FileError::Json {
            path: meta_path.display().to_string(),
            source: e,
        })?;
        fs::write(&meta_path, meta_json)
            .await
            .map_err(|e| FileError::write(meta_path.display().to_string(), e))?;

        // 采购批次 ID：写入运行目录，并追加到全局记录
        let proc_path = folder.join(PROCUREMENT_ID_FILE_NAME);
        fs::write(&proc_path, &procurement_id)
            .await
            .map_err(|e| FileError::write(proc_path.display().to_string(), e))?;
        append_procurement_log(&config.procurement_log_file, &procurement_id, &file_name).await?;

        // 控制文件初始为 running
        FileControlStore::in_run_folder(&folder).write(RunControlState::Running)?;

        info!("📁 运行目录已创建: {}", folder.display());

        Ok(Self {
            run_id,
            folder,
            raw_csv,
            procurement_id,
            metadata,
        })
    }

    /// 该运行的控制状态存储
    pub fn control_store(&self) -> FileControlStore {
        FileControlStore::in_run_folder(&self.folder)
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.folder.join(name)
    }
}

async fn append_procurement_log(path: &Path, procurement_id: &str, file_name: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| FileError::write(parent.display().to_string(), e))?;
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| FileError::write(path.display().to_string(), e))?;

    file.write_all(format!("{} {}\n", procurement_id, file_name).as_bytes())
        .await
        .map_err(|e| FileError::write(path.display().to_string(), e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_lays_out_run_folder() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("batch.csv");
        std::fs::write(&csv_path, "code,amount,validity\nA,1,2024-01-01\n").unwrap();

        let config = Config {
            uploads_dir: dir.path().join("uploads"),
            procurement_log_file: dir.path().join("procurement_batch_id.txt"),
            operator: "ops@example.com".to_string(),
            ..Config::default()
        };
        let client = ClientInfo::new(Some("Acme".into()), Some("offer_1".into()));

        let workspace = RunWorkspace::create(&config, &client, &csv_path)
            .await
            .unwrap();

        assert!(workspace.run_id.starts_with("batch_"));
        assert!(workspace.run_id.ends_with(&workspace.procurement_id));
        assert!(workspace.raw_csv.exists());
        assert_eq!(workspace.procurement_id.len(), 14);
        assert_eq!(workspace.control_store().read(), RunControlState::Running);

        let meta: RunMetadata = serde_json::from_slice(
            &std::fs::read(workspace.join(META_FILE_NAME)).unwrap(),
        )
        .unwrap();
        assert_eq!(meta.user, "ops@example.com");
        assert_eq!(meta.client.offer_id.as_deref(), Some("offer_1"));

        let log = std::fs::read_to_string(&config.procurement_log_file).unwrap();
        assert_eq!(log, format!("{} batch.csv\n", workspace.procurement_id));
    }

    #[tokio::test]
    async fn test_same_file_twice_gets_separate_folders() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("batch.csv");
        std::fs::write(&csv_path, "code,amount,validity\nA,1,2024-01-01\n").unwrap();

        let config = Config {
            uploads_dir: dir.path().join("uploads"),
            procurement_log_file: dir.path().join("procurement_batch_id.txt"),
            ..Config::default()
        };
        let first = RunWorkspace::create(&config, &ClientInfo::default(), &csv_path)
            .await
            .unwrap();
        first.control_store().write(RunControlState::Stopped).unwrap();

        let second = RunWorkspace::create(&config, &ClientInfo::default(), &csv_path)
            .await
            .unwrap();

        assert_ne!(first.run_id, second.run_id);
        assert_ne!(first.folder, second.folder);
        assert_eq!(first.control_store().read(), RunControlState::Stopped);
        assert_eq!(second.control_store().read(), RunControlState::Running);

        let meta: RunMetadata =
            serde_json::from_slice(&std::fs::read(first.join(META_FILE_NAME)).unwrap()).unwrap();
        assert_eq!(meta.run_id, first.run_id);

        let log = std::fs::read_to_string(&config.procurement_log_file).unwrap();
        assert_eq!(log.lines().count(), 2);
    }
}
