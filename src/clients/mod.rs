pub mod voucher_client;

pub use voucher_client::{ApiResponse, VoucherBenefitsRequest, VoucherClient};
