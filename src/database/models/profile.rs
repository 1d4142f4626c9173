use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::store::Row;

/// Field map supplied to `PUT /userProfile/public`.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    fields: Row,
}

impl ProfileUpdate {
    pub fn new(mut fields: Row) -> Self {
        if let Some(Value::String(url)) = fields.get_mut("avatar_url") {
            *url = strip_url_scheme(url).to_string();
        }
        Self { fields }
    }

    /// An empty update means "remove my profile".
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &Row {
        &self.fields
    }

    /// Row to upsert; the session's user id always wins over a supplied `id`.
    pub fn into_row(self, user_id: Uuid) -> Row {
        let mut row = self.fields;
        row.insert("id".to_string(), json!(user_id));
        row
    }
}

/// Drops a leading `http://` and then a leading `https://`.
pub fn strip_url_scheme(url: &str) -> &str {
    let url = url.strip_prefix("http://").unwrap_or(url);
    url.strip_prefix("https://").unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn strips_only_leading_scheme() {
        assert_eq!(strip_url_scheme("https://x.com/a.png"), "x.com/a.png");
        assert_eq!(strip_url_scheme("http://x.com/a.png"), "x.com/a.png");
        assert_eq!(strip_url_scheme("x.com/a.png"), "x.com/a.png");
        assert_eq!(strip_url_scheme("x.com/?next=https://y.com"), "x.com/?next=https://y.com");
    }

    #[test]
    fn normalizes_avatar_and_forces_session_id() {
        let user_id = Uuid::new_v4();
        let update = ProfileUpdate::new(fields(json!({
            "id": "someone-else",
            "avatar_url": "https://x.com/a.png",
            "username": "kit"
        })));
        assert!(!update.is_empty());

        let row = update.into_row(user_id);
        assert_eq!(row["avatar_url"], json!("x.com/a.png"));
        assert_eq!(row["id"], json!(user_id));
        assert_eq!(row["username"], json!("kit"));
    }

    #[test]
    fn non_string_avatar_is_left_alone() {
        let update = ProfileUpdate::new(fields(json!({ "avatar_url": null })));
        assert_eq!(update.fields()["avatar_url"], Value::Null);
        assert!(ProfileUpdate::new(Row::new()).is_empty());
    }
}
