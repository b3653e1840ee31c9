//! CSV 券码文件加载与规范化
//!
//! 列名按别名表匹配（忽略大小写与首尾空白）；单行的面额或日期无法解析时跳过该行并给出警告，
//! 缺少必需列或数据行不足时整体失败

use crate::error::SchemaError;
use crate::models::voucher::VoucherRecord;
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use phf::phf_map;
use std::fmt::Display;
use std::path::Path;
use tokio::fs;
use tracing::warn;

/// 可识别的列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    VoucherCode,
    Pin,
    Amount,
    Expiry,
}

/// 列名别名表（键为小写、去空白后的表头）
static COLUMN_ALIASES: phf::Map<&'static str, Column> = phf_map! {
    "code" => Column::VoucherCode,
    "cardnumber" => Column::VoucherCode,
    "card number" => Column::VoucherCode,
    "secret" => Column::Pin,
    "cardpin" => Column::Pin,
    "pin" => Column::Pin,
    "amount" => Column::Amount,
    "denomination" => Column::Amount,
    "validity" => Column::Expiry,
    "expirydate" => Column::Expiry,
    "expiry date" => Column::Expiry,
};

/// 日期格式，按顺序尝试，第一个成功的生效
enum DatePattern {
    DateTime(&'static str),
    Date(&'static str),
}

const DATE_PATTERNS: &[DatePattern] = &[
    DatePattern::DateTime("%Y-%m-%d %H:%M:%S UTC"),
    DatePattern::DateTime("%Y-%m-%d %H:%M:%S"),
    DatePattern::Date("%Y-%m-%d"),
    DatePattern::Date("%d-%m-%Y"),
    DatePattern::DateTime("%d-%b-%Y, %H:%M"),
    DatePattern::DateTime("%d-%B-%Y, %H:%M"),
    DatePattern::Date("%m/%d/%y"),
];

/// 被跳过的行
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowWarning {
    InvalidAmount { row: usize, value: String },
    InvalidDate { row: usize, value: String },
    EmptyVoucherCode { row: usize },
}

impl Display for RowWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowWarning::InvalidAmount { row, value } => {
                write!(f, "Warning: Invalid amount in row {}: {}", row, value)
            }
            RowWarning::InvalidDate { row, value } => {
                write!(f, "Warning: Invalid date in row {}: {}", row, value)
            }
            RowWarning::EmptyVoucherCode { row } => {
                write!(f, "Warning: Empty voucher code in row {}", row)
            }
        }
    }
}

/// 规范化结果
#[derive(Debug, Clone, Default)]
pub struct VoucherBatch {
    /// 原始表头（导出时使用）
    pub headers: Vec<String>,
    pub records: Vec<VoucherRecord>,
    pub warnings: Vec<RowWarning>,
}

/// 列位置映射
#[derive(Debug, Default)]
struct ColumnMap {
    voucher_code: Option<usize>,
    pin: Option<usize>,
    amount: Option<usize>,
    expiry: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> Result<Self, SchemaError> {
        let mut map = ColumnMap::default();

        for (i, header) in headers.iter().enumerate() {
            let normalized = header.trim_start_matches('\u{feff}').trim().to_lowercase();
            match COLUMN_ALIASES.get(normalized.as_str()) {
                Some(Column::VoucherCode) => map.voucher_code = Some(i),
                Some(Column::Pin) => map.pin = Some(i),
                Some(Column::Amount) => map.amount = Some(i),
                Some(Column::Expiry) => map.expiry = Some(i),
                None => {}
            }
        }

        if map.voucher_code.is_none() {
            return Err(SchemaError::MissingColumn {
                column: "voucher_code",
                aliases: "'code'/'cardnumber'/'card number'",
            });
        }
        if map.amount.is_none() {
            return Err(SchemaError::MissingColumn {
                column: "voucher_value",
                aliases: "'amount'/'denomination'",
            });
        }
        if map.expiry.is_none() {
            return Err(SchemaError::MissingColumn {
                column: "expiry_date",
                aliases: "'validity'/'expirydate'/'expiry date'",
            });
        }

        Ok(map)
    }
}

/// 从文件加载券码
pub async fn load_vouchers(csv_path: &Path) -> Result<VoucherBatch> {
    let content = fs::read(csv_path)
        .await
        .with_context(|| format!("无法读取CSV文件: {}", csv_path.display()))?;

    let batch = parse_vouchers(&content)
        .with_context(|| format!("无法解析CSV文件: {}", csv_path.display()))?;

    Ok(batch)
}

/// 解析 CSV 内容
///
/// # 参数
/// - `data`: 原始 CSV 字节（UTF-8，首行为表头）
///
/// # 返回
/// 返回按输入顺序排列的券码、原始表头以及被跳过的行
pub fn parse_vouchers(data: &[u8]) -> Result<VoucherBatch, SchemaError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let rows: Vec<Vec<String>> = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(str::to_string).collect::<Vec<String>>()))
        .collect::<Result<_, _>>()?;

    if rows.len() < 2 {
        return Err(SchemaError::TooFewRows);
    }

    let headers = rows[0].clone();
    let columns = ColumnMap::resolve(&headers)?;

    let mut batch = VoucherBatch {
        headers,
        ..Default::default()
    };

    for (i, row) in rows.into_iter().enumerate().skip(1) {
        // 表格行号：表头为第 1 行
        let row_number = i + 1;
        match normalize_row(&columns, row_number, row) {
            Ok(record) => batch.records.push(record),
            Err(warning) => {
                warn!("{}", warning);
                batch.warnings.push(warning);
            }
        }
    }

    if batch.records.is_empty() {
        return Err(SchemaError::NoValidRows);
    }

    Ok(batch)
}

fn normalize_row(
    columns: &ColumnMap,
    row_number: usize,
    row: Vec<String>,
) -> Result<VoucherRecord, RowWarning> {
    let cell = |index: Option<usize>| -> String {
        index
            .and_then(|i| row.get(i))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    let voucher_code = cell(columns.voucher_code);
    let amount_str = cell(columns.amount);
    let expiry_str = cell(columns.expiry);
    let pin = Some(cell(columns.pin)).filter(|p| !p.is_empty());

    let amount = parse_amount(&amount_str).ok_or_else(|| RowWarning::InvalidAmount {
        row: row_number,
        value: amount_str.clone(),
    })?;

    let expiry_date = parse_expiry(&expiry_str).ok_or_else(|| RowWarning::InvalidDate {
        row: row_number,
        value: expiry_str.clone(),
    })?;

    if voucher_code.is_empty() {
        return Err(RowWarning::EmptyVoucherCode { row: row_number });
    }

    Ok(VoucherRecord {
        voucher_code,
        pin,
        amount,
        original_amount: amount_str,
        expiry_date,
        original_validity: expiry_str,
        row_number,
        original_row: row,
    })
}

/// 面额：整数主单位 → 最小单位
pub fn parse_amount(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()?.checked_mul(100)
}

/// 过期时间：先尝试 Unix 秒，再按顺序尝试日期格式（UTC）
pub fn parse_expiry(value: &str) -> Option<i64> {
    let value = value.trim();

    if let Ok(timestamp) = value.parse::<i64>() {
        return Some(timestamp);
    }

    DATE_PATTERNS.iter().find_map(|pattern| match pattern {
        DatePattern::DateTime(fmt) => NaiveDateTime::parse_from_str(value, fmt)
            .ok()
            .map(|dt| dt.and_utc().timestamp()),
        DatePattern::Date(fmt) => NaiveDate::parse_from_str(value, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_row() {
        let batch = parse_vouchers(b"Code,Amount,Validity\nABC123,100,2024-01-01\n").unwrap();

        assert_eq!(batch.headers, vec!["Code", "Amount", "Validity"]);
        assert_eq!(batch.records.len(), 1);
        let record = &batch.records[0];
        assert_eq!(record.voucher_code, "ABC123");
        assert_eq!(record.amount, 10000);
        assert_eq!(record.expiry_date, 1704067200);
        assert_eq!(record.row_number, 2);
        assert_eq!(record.pin, None);
    }

    #[test]
    fn test_missing_amount_column_fails() {
        let err = parse_vouchers(b"Code,Validity\nABC123,2024-01-01\n").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::MissingColumn {
                column: "voucher_value",
                ..
            }
        ));
    }

    #[test]
    fn test_header_only_fails() {
        let err = parse_vouchers(b"Code,Amount,Validity\n").unwrap_err();
        assert!(matches!(err, SchemaError::TooFewRows));
    }

    #[test]
    fn test_aliases_are_case_insensitive_and_trimmed() {
        let csv = " Card Number ,DENOMINATION, Expiry Date ,CardPin\nX1,50,1700000000, 9999 \n";
        let batch = parse_vouchers(csv.as_bytes()).unwrap();

        let record = &batch.records[0];
        assert_eq!(record.voucher_code, "X1");
        assert_eq!(record.amount, 5000);
        assert_eq!(record.expiry_date, 1700000000);
        assert_eq!(record.pin.as_deref(), Some("9999"));
        assert_eq!(record.original_row[3], " 9999 ");
    }

    #[test]
    fn test_bad_rows_are_skipped_with_gaps() {
        let csv = "code,amount,validity\nA,10,2024-01-01\nB,ten,2024-01-01\nC,10,someday\nD,20,2024-02-01\n";
        let batch = parse_vouchers(csv.as_bytes()).unwrap();

        let rows: Vec<usize> = batch.records.iter().map(|r| r.row_number).collect();
        assert_eq!(rows, vec![2, 5]);
        assert_eq!(batch.warnings.len(), 2);
        assert_eq!(
            batch.warnings[0].to_string(),
            "Warning: Invalid amount in row 3: ten"
        );
        assert_eq!(
            batch.warnings[1].to_string(),
            "Warning: Invalid date in row 4: someday"
        );
    }

    #[test]
    fn test_all_rows_invalid() {
        let err = parse_vouchers(b"code,amount,validity\nA,x,2024-01-01\n").unwrap_err();
        assert!(matches!(err, SchemaError::NoValidRows));
    }

    #[test]
    fn test_expiry_formats() {
        assert_eq!(parse_expiry("1704067200"), Some(1704067200));
        assert_eq!(parse_expiry("2024-01-01 10:30:00 UTC"), Some(1704105000));
        assert_eq!(parse_expiry("2024-01-01 10:30:00"), Some(1704105000));
        assert_eq!(parse_expiry("01-02-2024"), Some(1706745600));
        assert_eq!(parse_expiry("5-Jan-2024, 10:30"), Some(1704450600));
        assert_eq!(parse_expiry("5-January-2024, 10:30"), Some(1704450600));
        assert_eq!(parse_expiry("1/5/24"), Some(1704412800));
        assert_eq!(parse_expiry("next tuesday"), None);
    }

    #[test]
    fn test_amount_overflow_is_rejected() {
        assert_eq!(parse_amount("100"), Some(10000));
        assert_eq!(parse_amount(&i64::MAX.to_string()), None);
        assert_eq!(parse_amount("1.5"), None);
    }
}
