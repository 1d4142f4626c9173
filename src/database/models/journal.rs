use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::store::Row;

/// Store-assigned entry identifier. Integer keys stay integers on the wire,
/// anything else is carried as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    Number(i64),
    Text(String),
}

impl EntryId {
    /// Path segments arrive as text; numeric ones become [`EntryId::Number`].
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(n) => EntryId::Number(n),
            Err(_) => EntryId::Text(raw.to_string()),
        }
    }

    /// Numeric text such as `"7"` becomes [`EntryId::Number`] so it binds as an integer.
    pub fn normalized(self) -> Self {
        match self {
            EntryId::Text(s) => Self::parse(s.trim()),
            number => number,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, EntryId::Text(s) if s.trim().is_empty())
    }

    pub fn to_value(&self) -> Value {
        match self {
            EntryId::Number(n) => json!(n),
            EntryId::Text(s) => json!(s),
        }
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryId::Number(n) => write!(f, "{}", n),
            EntryId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: EntryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    /// Null in the store passes through as null rather than failing the read.
    #[serde(default)]
    pub day: Option<NaiveDate>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Value>,
}

impl JournalEntry {
    pub fn from_row(row: Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(row))
    }
}

/// Columns written when an entry is created. `user_id` always comes from the session.
#[derive(Debug, Clone)]
pub struct NewJournalEntry {
    pub user_id: Uuid,
    pub day: NaiveDate,
    pub content: String,
}

impl NewJournalEntry {
    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        row.insert("user_id".to_string(), json!(self.user_id));
        row.insert("day".to_string(), json!(self.day));
        row.insert("content".to_string(), json!(self.content));
        row
    }
}

/// Columns written when an entry is edited.
#[derive(Debug, Clone)]
pub struct JournalPatch {
    pub content: String,
    pub embedding: Option<Value>,
}

impl JournalPatch {
    /// A missing or null embedding is left out so the stored vector survives.
    pub fn into_row(self) -> Row {
        let mut row = Row::new();
        row.insert("content".to_string(), json!(self.content));
        if let Some(embedding) = self.embedding.filter(|e| !e.is_null()) {
            row.insert("embedding".to_string(), embedding);
        }
        row
    }
}
