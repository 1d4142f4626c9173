use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::filter::{FilterData, FilterError};

/// One record as the store returns it: column name to JSON value.
pub type Row = Map<String, Value>;

/// The two record collections the API reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Journal,
    Profiles,
}

impl Collection {
    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Journal => "journal",
            Collection::Profiles => "profiles",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A page of rows plus the exact number of rows matching the filter.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub rows: Vec<Row>,
    pub count: i64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A single-row read matched nothing. Callers treat this as benign absence.
    #[error("no rows returned")]
    NoRows,

    #[error("expected a single row, found {0}")]
    MultipleRows(usize),

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid query: {0}")]
    Query(String),

    #[error("{0}")]
    Backend(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_no_rows(&self) -> bool {
        matches!(self, StoreError::NoRows)
    }
}

impl From<FilterError> for StoreError {
    fn from(err: FilterError) -> Self {
        StoreError::Query(err.to_string())
    }
}

/// Query/insert/update/upsert/delete access to the hosted relational store.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn select(&self, collection: Collection, filter: FilterData) -> Result<Vec<Row>, StoreError>;

    /// Exact number of rows matching the filter's WHERE clause. Order, limit
    /// and offset are ignored.
    async fn count(&self, collection: Collection, filter: FilterData) -> Result<i64, StoreError>;

    /// Inserts one row and returns the stored rows with store-assigned columns.
    async fn insert(&self, collection: Collection, row: Row) -> Result<Vec<Row>, StoreError>;

    /// Applies `patch` to every row matching `where_clause`, returning the number updated.
    async fn update(&self, collection: Collection, where_clause: Value, patch: Row) -> Result<u64, StoreError>;

    /// Insert-or-replace keyed by `conflict_column`. Columns absent from `row` keep their values.
    async fn upsert(&self, collection: Collection, row: Row, conflict_column: &str) -> Result<(), StoreError>;

    async fn delete(&self, collection: Collection, where_clause: Value) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Rows for the requested range together with the total match count.
    async fn select_page(&self, collection: Collection, filter: FilterData) -> Result<Page, StoreError> {
        let count = self.count(collection, filter.clone()).await?;
        let rows = self.select(collection, filter).await?;
        Ok(Page { rows, count })
    }

    /// Exactly one row, or [`StoreError::NoRows`] / [`StoreError::MultipleRows`].
    async fn select_single(&self, collection: Collection, filter: FilterData) -> Result<Row, StoreError> {
        let mut rows = self.select(collection, filter).await?;
        match rows.len() {
            0 => Err(StoreError::NoRows),
            1 => Ok(rows.remove(0)),
            n => Err(StoreError::MultipleRows(n)),
        }
    }
}
