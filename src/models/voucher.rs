use serde::{Deserialize, Serialize};

/// 单条券码记录
///
/// 由 CSV 的一行数据规范化而来，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherRecord {
    /// 券码（非空）
    pub voucher_code: String,
    /// 卡密（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    /// 面额，最小货币单位（主单位 × 100）
    pub amount: i64,
    /// CSV 中的原始面额文本
    pub original_amount: String,
    /// 过期时间（Unix 秒）
    pub expiry_date: i64,
    /// CSV 中的原始有效期文本
    pub original_validity: String,
    /// 表格行号（表头为第 1 行）
    pub row_number: usize,
    /// 原始整行数据，导出时原样写回
    pub original_row: Vec<String>,
}

impl VoucherRecord {
    /// 用于日志展示的有效期："原始文本 (epoch)"
    pub fn validity_display(&self) -> String {
        format!("{} ({})", self.original_validity, self.expiry_date)
    }
}
