pub mod error;
pub mod wire;
pub mod worker;

pub use error::QuerierError;
pub use worker::{default_interval, query_server_info, run, run_query_cycle};
