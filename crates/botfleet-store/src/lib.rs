pub mod error;
pub mod models;
pub mod schema;

pub use error::StoreError;
pub use schema::init_db;
