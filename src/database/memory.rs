use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::database::store::{Collection, DataStore, Row, StoreError};
use crate::filter::filter_order::FilterOrder;
use crate::filter::types::{FilterOp, SortDirection};
use crate::filter::FilterData;

/// In-process [`DataStore`] that evaluates the same filter language as the
/// Postgres store. Used by tests and local runs without a database.
pub struct MemoryStore {
    tables: RwLock<HashMap<Collection, Vec<Row>>>,
    next_id: AtomicI64,
    mutations: AtomicUsize,
    fault: RwLock<Option<String>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            mutations: AtomicUsize::new(0),
            fault: RwLock::new(None),
        }
    }

    /// Every subsequent operation fails with `message` until [`clear_fault`](Self::clear_fault).
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.fault.write().await = Some(message.into());
    }

    pub async fn clear_fault(&self) {
        *self.fault.write().await = None;
    }

    /// Number of insert/update/upsert/delete calls received, including failed ones.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(AtomicOrdering::SeqCst)
    }

    /// Stores rows verbatim without counting them as mutations.
    pub async fn seed(&self, collection: Collection, rows: impl IntoIterator<Item = Row>) {
        let mut tables = self.tables.write().await;
        let table = tables.entry(collection).or_default();
        for mut row in rows {
            if collection == Collection::Journal && !row.contains_key("id") {
                row.insert("id".to_string(), Value::from(self.next_id.fetch_add(1, AtomicOrdering::SeqCst)));
            }
            table.push(row);
        }
    }

    pub async fn rows(&self, collection: Collection) -> Vec<Row> {
        self.tables.read().await.get(&collection).cloned().unwrap_or_default()
    }

    async fn check_fault(&self) -> Result<(), StoreError> {
        match self.fault.read().await.as_ref() {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }

    async fn begin_mutation(&self) -> Result<(), StoreError> {
        self.mutations.fetch_add(1, AtomicOrdering::SeqCst);
        self.check_fault().await
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, collection: Collection, filter: FilterData) -> Result<Vec<Row>, StoreError> {
        self.check_fault().await?;
        let tables = self.tables.read().await;
        let where_clause = filter.where_clause.unwrap_or(Value::Null);

        let mut rows = Vec::new();
        for row in tables.get(&collection).map(Vec::as_slice).unwrap_or_default() {
            if matches(row, &where_clause)? {
                rows.push(row.clone());
            }
        }

        if let Some(order) = filter.order {
            let infos = FilterOrder::validate_and_parse(&order)?;
            rows.sort_by(|a, b| {
                for info in &infos {
                    let ord = sort_cmp(a.get(&info.column), b.get(&info.column));
                    let ord = if info.sort == SortDirection::Desc { ord.reverse() } else { ord };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        let selected = rows.into_iter().skip(offset).take(limit);

        Ok(match filter.select {
            Some(columns) if !columns.iter().any(|c| c == "*") => selected
                .map(|row| {
                    columns
                        .iter()
                        .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
                        .collect::<Map<_, _>>()
                })
                .collect(),
            _ => selected.collect(),
        })
    }

    async fn count(&self, collection: Collection, filter: FilterData) -> Result<i64, StoreError> {
        self.check_fault().await?;
        let tables = self.tables.read().await;
        let where_clause = filter.where_clause.unwrap_or(Value::Null);
        let mut count = 0;
        for row in tables.get(&collection).map(Vec::as_slice).unwrap_or_default() {
            if matches(row, &where_clause)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn insert(&self, collection: Collection, mut row: Row) -> Result<Vec<Row>, StoreError> {
        self.begin_mutation().await?;
        if row.is_empty() {
            return Err(StoreError::Query("row has no columns".to_string()));
        }
        if collection == Collection::Journal && !row.contains_key("id") {
            row.insert("id".to_string(), Value::from(self.next_id.fetch_add(1, AtomicOrdering::SeqCst)));
        }
        self.tables.write().await.entry(collection).or_default().push(row.clone());
        Ok(vec![row])
    }

    async fn update(&self, collection: Collection, where_clause: Value, patch: Row) -> Result<u64, StoreError> {
        self.begin_mutation().await?;
        if patch.is_empty() {
            return Err(StoreError::Query("update requires at least one column".to_string()));
        }
        let mut tables = self.tables.write().await;
        let mut updated = 0;
        for row in tables.entry(collection).or_default().iter_mut() {
            if matches(row, &where_clause)? {
                for (k, v) in &patch {
                    row.insert(k.clone(), v.clone());
                }
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn upsert(&self, collection: Collection, row: Row, conflict_column: &str) -> Result<(), StoreError> {
        self.begin_mutation().await?;
        let key = row
            .get(conflict_column)
            .cloned()
            .ok_or_else(|| StoreError::Query(format!("upsert row is missing conflict column '{}'", conflict_column)))?;

        let mut tables = self.tables.write().await;
        let table = tables.entry(collection).or_default();
        match table.iter_mut().find(|existing| existing.get(conflict_column).map(text_form) == Some(text_form(&key))) {
            Some(existing) => {
                for (k, v) in row {
                    existing.insert(k, v);
                }
            }
            None => table.push(row),
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, where_clause: Value) -> Result<u64, StoreError> {
        self.begin_mutation().await?;
        if where_clause.as_object().map_or(true, Map::is_empty) {
            return Err(StoreError::Query("refusing to delete without a WHERE clause".to_string()));
        }
        let mut tables = self.tables.write().await;
        let table = tables.entry(collection).or_default();
        let mut kept = Vec::with_capacity(table.len());
        let mut deleted = 0;
        for row in table.drain(..) {
            if matches(&row, &where_clause)? {
                deleted += 1;
            } else {
                kept.push(row);
            }
        }
        *table = kept;
        Ok(deleted)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_fault().await
    }
}

fn matches(row: &Row, where_clause: &Value) -> Result<bool, StoreError> {
    let conditions = match where_clause {
        Value::Null => return Ok(true),
        Value::Object(obj) => obj,
        _ => return Err(StoreError::Query("WHERE must be an object".to_string())),
    };

    for (key, value) in conditions {
        let ok = match key.as_str() {
            "$and" | "$or" => {
                let parts = value
                    .as_array()
                    .ok_or_else(|| StoreError::Query(format!("{} requires array", key)))?;
                let mut results = Vec::with_capacity(parts.len());
                for part in parts {
                    results.push(matches(row, part)?);
                }
                if key == "$and" { results.iter().all(|r| *r) } else { results.iter().any(|r| *r) }
            }
            "$not" => !matches(row, value)?,
            op if op.starts_with('$') => return Err(StoreError::Query(format!("Unsupported operator: {}", op))),
            column => match value {
                Value::Object(ops) => {
                    let mut all = true;
                    for (op_key, data) in ops {
                        let op = FilterOp::parse(op_key)
                            .ok_or_else(|| StoreError::Query(format!("Unsupported operator: {}", op_key)))?;
                        all &= evaluate(row.get(column), &op, data);
                    }
                    all
                }
                data => evaluate(row.get(column), &FilterOp::Eq, data),
            },
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn evaluate(actual: Option<&Value>, op: &FilterOp, data: &Value) -> bool {
    let actual = actual.filter(|v| !v.is_null());
    match op {
        FilterOp::Eq if data.is_null() => actual.is_none(),
        FilterOp::Ne if data.is_null() => actual.is_some(),
        FilterOp::Eq => compare(actual, data) == Some(Ordering::Equal),
        FilterOp::Ne => matches!(compare(actual, data), Some(o) if o != Ordering::Equal),
        FilterOp::Gt => compare(actual, data) == Some(Ordering::Greater),
        FilterOp::Gte => matches!(compare(actual, data), Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Lt => compare(actual, data) == Some(Ordering::Less),
        FilterOp::Lte => matches!(compare(actual, data), Some(Ordering::Less | Ordering::Equal)),
        FilterOp::Like | FilterOp::ILike => match (actual, data.as_str()) {
            (Some(v), Some(pattern)) => like_match(pattern, &text_form(v), *op == FilterOp::ILike),
            _ => false,
        },
        FilterOp::In => match data {
            Value::Array(values) => values.iter().any(|v| compare(actual, v) == Some(Ordering::Equal)),
            other => compare(actual, other) == Some(Ordering::Equal),
        },
    }
}

/// SQL-like comparison: NULL compares as unknown, text input compares
/// against the column's text form.
fn compare(actual: Option<&Value>, data: &Value) -> Option<Ordering> {
    let actual = actual?;
    if data.is_null() {
        return None;
    }
    match (actual, data) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        _ => Some(text_form(actual).cmp(&text_form(data))),
    }
}

/// Ordering used by ORDER BY: NULL sorts after every value, as in Postgres.
fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare(Some(a), b).unwrap_or(Ordering::Equal),
    }
}

fn text_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// LIKE matching with `%`, `_` and backslash escapes.
fn like_match(pattern: &str, text: &str, case_insensitive: bool) -> bool {
    let (pattern, text) = if case_insensitive {
        (pattern.to_lowercase(), text.to_lowercase())
    } else {
        (pattern.to_string(), text.to_string())
    };

    #[derive(Clone, Copy, PartialEq)]
    enum Token {
        Any,
        One,
        Lit(char),
    }

    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => Token::Any,
            '_' => Token::One,
            '\\' => Token::Lit(chars.next().unwrap_or('\\')),
            other => Token::Lit(other),
        });
    }

    let text: Vec<char> = text.chars().collect();
    // reachable[j]: pattern prefix consumed so far can end at text position j
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;
    for token in tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Token::Any => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= reachable[j];
                    next[j] = seen;
                }
            }
            Token::One => {
                for j in 0..text.len() {
                    next[j + 1] = reachable[j];
                }
            }
            Token::Lit(c) => {
                for j in 0..text.len() {
                    next[j + 1] = reachable[j] && text[j] == c;
                }
            }
        }
        reachable = next;
    }
    reachable[text.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn like_handles_wildcards_and_escapes() {
        assert!(like_match("%ell%", "hello", false));
        assert!(!like_match("%ELL%", "hello", false));
        assert!(like_match("%ELL%", "hello", true));
        assert!(like_match("h_llo", "hello", false));
        assert!(!like_match("h_llo", "hllo", false));
        assert!(like_match("100\\%", "100%", false));
        assert!(!like_match("100\\%", "1000", false));
        assert!(like_match("%", "", false));
    }

    #[tokio::test]
    async fn select_filters_sorts_and_paginates() {
        let store = MemoryStore::new();
        store.seed(Collection::Journal, vec![
            row(json!({ "user_id": "a", "day": "2024-01-01", "content": "first" })),
            row(json!({ "user_id": "a", "day": "2024-01-03", "content": "third" })),
            row(json!({ "user_id": "a", "day": "2024-01-02", "content": "second" })),
            row(json!({ "user_id": "b", "day": "2024-01-04", "content": "other user" })),
        ]).await;

        let filter = FilterData {
            select: Some(vec!["day".into()]),
            where_clause: Some(json!({ "user_id": "a" })),
            order: Some(json!("day desc")),
            limit: Some(2),
            offset: Some(1),
        };
        let page = store.select_page(Collection::Journal, filter).await.unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.rows, vec![row(json!({ "day": "2024-01-02" })), row(json!({ "day": "2024-01-01" }))]);
    }

    #[tokio::test]
    async fn numeric_and_text_ids_compare_by_text_form() {
        let store = MemoryStore::new();
        store.seed(Collection::Journal, vec![row(json!({ "id": 7, "content": "x" }))]).await;
        let by_text = store.select(Collection::Journal, FilterData::matching(json!({ "id": "7" }))).await.unwrap();
        let by_number = store.select(Collection::Journal, FilterData::matching(json!({ "id": 7 }))).await.unwrap();
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_number.len(), 1);
    }

    #[tokio::test]
    async fn upsert_merges_and_delete_removes() {
        let store = MemoryStore::new();
        store.upsert(Collection::Profiles, row(json!({ "id": "u", "username": "kit" })), "id").await.unwrap();
        store.upsert(Collection::Profiles, row(json!({ "id": "u", "website": "kit.dev" })), "id").await.unwrap();
        let single = store.select_single(Collection::Profiles, FilterData::matching(json!({ "id": "u" }))).await.unwrap();
        assert_eq!(single, row(json!({ "id": "u", "username": "kit", "website": "kit.dev" })));

        assert_eq!(store.delete(Collection::Profiles, json!({ "id": "u" })).await.unwrap(), 1);
        assert!(store
            .select_single(Collection::Profiles, FilterData::matching(json!({ "id": "u" })))
            .await
            .unwrap_err()
            .is_no_rows());
        assert_eq!(store.mutation_count(), 3);
    }

    #[tokio::test]
    async fn fault_fails_every_operation() {
        let store = MemoryStore::new();
        store.fail_with("connection reset").await;
        let err = store.select(Collection::Journal, FilterData::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
        assert!(store.ping().await.is_err());
        store.clear_fault().await;
        assert!(store.ping().await.is_ok());
    }

    #[test]
    fn nulls_sort_last_ascending() {
        assert_eq!(sort_cmp(None, Some(&json!("a"))), Ordering::Greater);
        assert_eq!(sort_cmp(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
    }
}
