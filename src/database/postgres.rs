use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use crate::database::manager;
use crate::database::query_builder::{self, QueryBuilder};
use crate::database::store::{Collection, DataStore, Row, StoreError};
use crate::filter::FilterData;

/// [`DataStore`] backed by the hosted Postgres database.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn builder(collection: Collection) -> Result<QueryBuilder, StoreError> {
        QueryBuilder::new(collection.table_name())
    }
}

#[async_trait]
impl DataStore for PgStore {
    async fn select(&self, collection: Collection, filter: FilterData) -> Result<Vec<Row>, StoreError> {
        let sql = Self::builder(collection)?.select_sql(filter)?;
        tracing::debug!("select {}: {}", collection, sql.query);
        query_builder::fetch_rows(&self.pool, &sql).await
    }

    async fn count(&self, collection: Collection, filter: FilterData) -> Result<i64, StoreError> {
        let sql = Self::builder(collection)?.count_sql(filter)?;
        tracing::debug!("count {}: {}", collection, sql.query);
        query_builder::fetch_count(&self.pool, &sql).await
    }

    async fn insert(&self, collection: Collection, row: Row) -> Result<Vec<Row>, StoreError> {
        let sql = Self::builder(collection)?.insert_sql(row)?;
        tracing::debug!("insert {}: {}", collection, sql.query);
        query_builder::fetch_rows(&self.pool, &sql).await
    }

    async fn update(&self, collection: Collection, where_clause: Value, patch: Row) -> Result<u64, StoreError> {
        let sql = Self::builder(collection)?.update_sql(where_clause, patch)?;
        tracing::debug!("update {}: {}", collection, sql.query);
        query_builder::execute(&self.pool, &sql).await
    }

    async fn upsert(&self, collection: Collection, row: Row, conflict_column: &str) -> Result<(), StoreError> {
        let sql = Self::builder(collection)?.upsert_sql(row, conflict_column)?;
        tracing::debug!("upsert {}: {}", collection, sql.query);
        query_builder::execute(&self.pool, &sql).await.map(|_| ())
    }

    async fn delete(&self, collection: Collection, where_clause: Value) -> Result<u64, StoreError> {
        let sql = Self::builder(collection)?.delete_sql(where_clause)?;
        tracing::debug!("delete {}: {}", collection, sql.query);
        query_builder::execute(&self.pool, &sql).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        manager::health_check(&self.pool).await
    }
}
