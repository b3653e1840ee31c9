pub mod ids;
pub mod logging;

pub use ids::{generate_procurement_id, generate_run_id};
