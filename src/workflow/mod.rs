pub mod voucher_flow;

pub use voucher_flow::VoucherFlow;
