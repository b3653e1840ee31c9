//! 运行上下文
//!
//! 一次运行内所有券共享的信息：客户、佣金、采购批次 ID

use crate::models::client::{ClientInfo, Commission};
use crate::models::result::{FailureKind, UploadResult, STOPPED_BY_USER};
use crate::models::voucher::VoucherRecord;
use std::fmt::Display;

#[derive(Debug, Clone)]
pub struct UploadContext {
    pub run_id: String,
    pub client: ClientInfo,
    pub commission: Commission,
    pub procurement_id: String,
}

impl UploadContext {
    pub fn client_name(&self) -> &str {
        self.client.name_or_empty()
    }

    pub fn offer_id(&self) -> &str {
        self.client.offer_id_or_empty()
    }

    /// 为某张券创建尚未提交的结果
    pub fn pending_result(&self, voucher: &VoucherRecord) -> UploadResult {
        UploadResult {
            row_number: voucher.row_number,
            voucher_code: voucher.voucher_code.clone(),
            original_row: voucher.original_row.clone(),
            client_name: self.client_name().to_string(),
            offer_id: self.offer_id().to_string(),
            rzp_commission: self.commission.input.clone(),
            epoch_time: voucher.expiry_date,
            procurement_id: self.procurement_id.clone(),
            success: false,
            status_code: None,
            error_message: None,
            failure_kind: None,
            api_response: String::new(),
            retry_count: 0,
            original_validity: voucher.original_validity.clone(),
        }
    }

    /// 操作员停止导致未提交的结果
    pub fn stopped_result(&self, voucher: &VoucherRecord) -> UploadResult {
        let mut result = self.pending_result(voucher);
        result.fail(FailureKind::StoppedByOperator, STOPPED_BY_USER);
        result
    }
}

impl Display for UploadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[运行 {} 客户 {} 批次 {}]",
            self.run_id,
            self.client_name(),
            self.procurement_id
        )
    }
}
