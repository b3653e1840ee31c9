//! 结果导出服务
//!
//! 派发全部结束后写两份表格：全部结果 + 仅失败。没有失败时不生成失败表

use crate::error::FileError;
use crate::models::result::UploadResult;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

/// 追加在原始列之后的列
pub const APPENDED_COLUMNS: [&str; 7] = [
    "client_name",
    "offer_id",
    "rzp_commission",
    "epoch_time",
    "procurement_batch_id",
    "success_failure",
    "api_response",
];

/// 导出文件（文件名，不含目录）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFiles {
    pub results: String,
    pub failures: Option<String>,
}

/// 导出器
#[derive(Debug, Clone)]
pub struct ResultExporter {
    folder: PathBuf,
    headers: Vec<String>,
}

impl ResultExporter {
    /// # 参数
    /// - `folder`: 运行目录
    /// - `headers`: 原始表头
    pub fn new(folder: impl Into<PathBuf>, headers: Vec<String>) -> Self {
        Self {
            folder: folder.into(),
            headers,
        }
    }

    /// 写出导出文件
    ///
    /// # 参数
    /// - `results`: 按输入顺序排列的全部结果
    /// - `now`: 用于文件名的时间戳
    pub fn export(
        &self,
        results: &[UploadResult],
        now: DateTime<Local>,
    ) -> Result<ExportFiles, FileError> {
        let stamp = now.format("%Y%m%d_%H%M%S");

        let results_name = format!("upload_results_{}.csv", stamp);
        self.write_table(&self.folder.join(&results_name), results.iter())?;
        info!("📄 结果已导出: {}", results_name);

        let failed: Vec<&UploadResult> = results.iter().filter(|r| !r.success).collect();
        let failures = if failed.is_empty() {
            None
        } else {
            let name = format!("failed_uploads_{}.csv", stamp);
            self.write_table(&self.folder.join(&name), failed.into_iter())?;
            info!("📄 失败记录已导出: {}", name);
            Some(name)
        };

        Ok(ExportFiles {
            results: results_name,
            failures,
        })
    }

    fn write_table<'a>(
        &self,
        path: &Path,
        rows: impl Iterator<Item = &'a UploadResult>,
    ) -> Result<(), FileError> {
        let csv_err = |source: csv::Error| FileError::CsvWriteFailed {
            path: path.display().to_string(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(csv_err)?;

        let header = self
            .headers
            .iter()
            .map(String::as_str)
            .chain(APPENDED_COLUMNS);
        writer.write_record(header).map_err(csv_err)?;

        for result in rows {
            writer.write_record(export_row(result)).map_err(csv_err)?;
        }

        writer
            .flush()
            .map_err(|e| FileError::write(path.display().to_string(), e))
    }
}

fn export_row(result: &UploadResult) -> Vec<String> {
    let mut row = result.original_row.clone();
    row.extend([
        result.client_name.clone(),
        result.offer_id.clone(),
        result.rzp_commission.clone(),
        result.epoch_time.to_string(),
        result.procurement_id.clone(),
        result.outcome_label().to_string(),
        result.api_response.clone(),
    ]);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn result(row: usize, success: bool) -> UploadResult {
        UploadResult {
            row_number: row,
            voucher_code: format!("V{}", row),
            original_row: vec![format!("V{}", row), "100".into(), "2024-01-01".into()],
            client_name: "Acme".into(),
            offer_id: "offer_1".into(),
            rzp_commission: "2.5".into(),
            epoch_time: 1704067200,
            procurement_id: "PROC0000000001".into(),
            success,
            status_code: Some(if success { 200 } else { 400 }),
            error_message: None,
            failure_kind: None,
            api_response: if success { "{}".into() } else { "bad, request".into() },
            retry_count: 1,
            original_validity: "2024-01-01".into(),
        }
    }

    fn headers() -> Vec<String> {
        vec!["Code".into(), "Amount".into(), "Validity".into()]
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap()
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_export_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ResultExporter::new(dir.path(), headers());
        let now = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();

        let files = exporter
            .export(&[result(2, true), result(3, false), result(4, true)], now)
            .unwrap();

        assert_eq!(files.results, "upload_results_20240305_140709.csv");
        assert_eq!(
            files.failures.as_deref(),
            Some("failed_uploads_20240305_140709.csv")
        );

        let all = read_rows(&dir.path().join(&files.results));
        assert_eq!(all.len(), 4);
        assert_eq!(
            all[0],
            vec![
                "Code",
                "Amount",
                "Validity",
                "client_name",
                "offer_id",
                "rzp_commission",
                "epoch_time",
                "procurement_batch_id",
                "success_failure",
                "api_response"
            ]
        );
        assert_eq!(all[1][0], "V2");
        assert_eq!(all[1][8], "Success");

        let failed = read_rows(&dir.path().join(files.failures.unwrap()));
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[1][0], "V3");
        assert_eq!(failed[1][8], "Failure");
        assert_eq!(failed[1][9], "bad, request");
    }

    #[test]
    fn test_no_failures_file_when_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ResultExporter::new(dir.path(), headers());

        let files = exporter.export(&[result(2, true)], Local::now()).unwrap();

        assert!(files.failures.is_none());
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec![files.results]);
    }
}
