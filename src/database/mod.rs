pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query_builder;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{Collection, DataStore, Page, Row, StoreError};
