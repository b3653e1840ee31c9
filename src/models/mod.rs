pub mod client;
pub mod context;
pub mod control;
pub mod loaders;
pub mod result;
pub mod voucher;

pub use client::{ClientInfo, Commission};
pub use context::UploadContext;
pub use control::{ControlAction, ControlFile, RunControlState};
pub use loaders::{load_vouchers, parse_vouchers, RowWarning, VoucherBatch};
pub use result::{FailureKind, RunStatus, RunSummary, SummaryReport, UploadResult, STOPPED_BY_USER};
pub use voucher::VoucherRecord;
