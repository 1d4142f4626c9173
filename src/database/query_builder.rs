use serde_json::Value;
use sqlx::{self, postgres::PgArguments, PgPool, Row as _};

use crate::database::store::{Row, StoreError};
use crate::filter::filter::validate_identifier;
use crate::filter::types::SqlResult;
use crate::filter::{Filter, FilterData};

/// SQL generation and execution for one table.
///
/// Writes bind the whole record as a single JSONB parameter and expand it
/// with `jsonb_populate_record`, so Postgres coerces each value to the
/// column's declared type.
pub struct QueryBuilder {
    table_name: String,
}

impl QueryBuilder {
    pub fn new(table_name: impl Into<String>) -> Result<Self, StoreError> {
        let table_name = table_name.into();
        Filter::new(&table_name)?;
        Ok(Self { table_name })
    }

    pub fn select_sql(&self, filter_data: FilterData) -> Result<SqlResult, StoreError> {
        let mut filter = Filter::new(&self.table_name)?;
        filter.assign(filter_data)?;
        Ok(filter.to_sql()?)
    }

    pub fn count_sql(&self, filter_data: FilterData) -> Result<SqlResult, StoreError> {
        let mut filter = Filter::new(&self.table_name)?;
        filter.where_clause(filter_data.where_clause.unwrap_or(Value::Null))?;
        Ok(filter.to_count_sql()?)
    }

    pub fn insert_sql(&self, row: Row) -> Result<SqlResult, StoreError> {
        let columns = Self::column_list(&row)?;
        let query = format!(
            "INSERT INTO \"{table}\" ({columns}) SELECT {columns} FROM jsonb_populate_record(NULL::\"{table}\", $1) \
             RETURNING row_to_json(\"{table}\") AS row",
            table = self.table_name,
            columns = columns,
        );
        Ok(SqlResult { query, params: vec![Value::Object(row)] })
    }

    pub fn update_sql(&self, where_clause: Value, patch: Row) -> Result<SqlResult, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::Query("update requires at least one column".to_string()));
        }
        for column in patch.keys() {
            validate_identifier(column).map_err(StoreError::Query)?;
        }
        let assignments = patch
            .keys()
            .map(|c| format!(
                "\"{c}\" = (SELECT \"{c}\" FROM jsonb_populate_record(NULL::\"{t}\", $1))",
                c = c,
                t = self.table_name
            ))
            .collect::<Vec<_>>()
            .join(", ");

        let where_result = self.where_after(where_clause, 1)?;
        let query = [
            format!("UPDATE \"{}\" SET {}", self.table_name, assignments),
            Filter::prefixed_where(&where_result.query),
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        let mut params = vec![Value::Object(patch)];
        params.extend(where_result.params);
        Ok(SqlResult { query, params })
    }

    pub fn upsert_sql(&self, row: Row, conflict_column: &str) -> Result<SqlResult, StoreError> {
        validate_identifier(conflict_column).map_err(StoreError::Query)?;
        if !row.contains_key(conflict_column) {
            return Err(StoreError::Query(format!("upsert row is missing conflict column '{}'", conflict_column)));
        }
        let columns = Self::column_list(&row)?;
        let updates = row
            .keys()
            .filter(|c| c.as_str() != conflict_column)
            .map(|c| format!("\"{c}\" = EXCLUDED.\"{c}\"", c = c))
            .collect::<Vec<_>>();
        let on_conflict = if updates.is_empty() {
            format!("ON CONFLICT (\"{}\") DO NOTHING", conflict_column)
        } else {
            format!("ON CONFLICT (\"{}\") DO UPDATE SET {}", conflict_column, updates.join(", "))
        };
        let query = format!(
            "INSERT INTO \"{table}\" ({columns}) SELECT {columns} FROM jsonb_populate_record(NULL::\"{table}\", $1) {on_conflict}",
            table = self.table_name,
            columns = columns,
            on_conflict = on_conflict,
        );
        Ok(SqlResult { query, params: vec![Value::Object(row)] })
    }

    pub fn delete_sql(&self, where_clause: Value) -> Result<SqlResult, StoreError> {
        let where_result = self.where_after(where_clause, 0)?;
        if where_result.query.is_empty() {
            return Err(StoreError::Query("refusing to delete without a WHERE clause".to_string()));
        }
        Ok(SqlResult {
            query: format!("DELETE FROM \"{}\" WHERE {}", self.table_name, where_result.query),
            params: where_result.params,
        })
    }

    fn where_after(&self, where_clause: Value, starting_param_index: usize) -> Result<SqlResult, StoreError> {
        let mut filter = Filter::new(&self.table_name)?;
        filter.where_clause(where_clause)?;
        Ok(filter.to_where_sql(starting_param_index)?)
    }

    fn column_list(row: &Row) -> Result<String, StoreError> {
        if row.is_empty() {
            return Err(StoreError::Query("row has no columns".to_string()));
        }
        let mut columns = Vec::with_capacity(row.len());
        for column in row.keys() {
            validate_identifier(column).map_err(StoreError::Query)?;
            columns.push(format!("\"{}\"", column));
        }
        Ok(columns.join(", "))
    }
}

pub async fn fetch_rows(pool: &PgPool, sql_result: &SqlResult) -> Result<Vec<Row>, StoreError> {
    let mut q = sqlx::query(&sql_result.query);
    for p in sql_result.params.iter() {
        q = bind_param_query(q, p);
    }
    let rows = q.fetch_all(pool).await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match row.try_get::<Value, _>("row")? {
            Value::Object(map) => out.push(map),
            other => return Err(StoreError::Query(format!("expected JSON object row, got {}", other))),
        }
    }
    Ok(out)
}

pub async fn fetch_count(pool: &PgPool, sql_result: &SqlResult) -> Result<i64, StoreError> {
    let mut q = sqlx::query(&sql_result.query);
    for p in sql_result.params.iter() {
        q = bind_param_query(q, p);
    }
    let row = q.fetch_one(pool).await?;
    let count: i64 = row.try_get("count")?;
    Ok(count)
}

pub async fn execute(pool: &PgPool, sql_result: &SqlResult) -> Result<u64, StoreError> {
    let mut q = sqlx::query(&sql_result.query);
    for p in sql_result.params.iter() {
        q = bind_param_query(q, p);
    }
    let result = q.execute(pool).await?;
    Ok(result.rows_affected())
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres has no unsigned 64-bit type
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // Arrays are expanded into individual placeholders by FilterWhere;
        // records travel as a single JSONB parameter.
        Value::Array(_) | Value::Object(_) => q.bind(v),
    }
}
