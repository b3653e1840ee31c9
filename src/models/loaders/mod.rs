pub mod csv_loader;

pub use csv_loader::{load_vouchers, parse_vouchers, RowWarning, VoucherBatch};
