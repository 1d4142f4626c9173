use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use super::error::FilterError;
use super::filter::validate_identifier;
use super::types::{FilterOp, FilterWhereInfo};

pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<String>,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
        }
    }

    /// Compile a WHERE object into SQL. Placeholders are numbered from
    /// `starting_param_index + 1`; an empty object compiles to an empty string.
    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.parse_where_data(where_data)?;
        Ok((filter_where.conditions.join(" AND "), filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null => Ok(()),
            Value::Object(obj) => {
                for (key, value) in obj {
                    if key.starts_with('$') {
                        self.parse_logical_operator(key, value)?;
                    } else {
                        self.parse_field_condition(key, value)?;
                    }
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn parse_logical_operator(&mut self, op: &str, value: &Value) -> Result<(), FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value.as_array().ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let mut sql_parts = Vec::new();
                for v in arr {
                    let (sql, params) = Self::generate(v, self.param_index)?;
                    self.param_index += params.len();
                    self.param_values.extend(params);
                    if !sql.is_empty() { sql_parts.push(format!("({})", sql)); }
                }
                if sql_parts.is_empty() { return Ok(()); }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                self.conditions.push(format!("({})", sql_parts.join(joiner)));
                Ok(())
            }
            "$not" => {
                let (sql, params) = Self::generate(value, self.param_index)?;
                self.param_index += params.len();
                self.param_values.extend(params);
                if !sql.is_empty() { self.conditions.push(format!("NOT ({})", sql)); }
                Ok(())
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<(), FilterError> {
        validate_identifier(field).map_err(FilterError::InvalidColumn)?;
        let infos = match value {
            Value::Object(obj) => {
                let mut infos = Vec::with_capacity(obj.len());
                for (op_key, op_val) in obj {
                    let operator = FilterOp::parse(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    infos.push(FilterWhereInfo { column: field.to_string(), operator, data: op_val.clone() });
                }
                infos
            }
            // Implicit equality: { field: value }
            _ => vec![FilterWhereInfo { column: field.to_string(), operator: FilterOp::Eq, data: value.clone() }],
        };
        for info in &infos {
            let sql = self.build_sql_condition(info)?;
            self.conditions.push(sql);
        }
        Ok(())
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let column = format!("\"{}\"", condition.column);
        let data = condition.data.clone();
        Ok(match condition.operator {
            FilterOp::Eq => {
                if data.is_null() { format!("{} IS NULL", column) }
                else { format!("{} = {}", column, self.typed_param(data)) }
            }
            FilterOp::Ne => {
                if data.is_null() { format!("{} IS NOT NULL", column) }
                else { format!("{} <> {}", column, self.typed_param(data)) }
            }
            FilterOp::Gt => format!("{} > {}", column, self.typed_param(data)),
            FilterOp::Gte => format!("{} >= {}", column, self.typed_param(data)),
            FilterOp::Lt => format!("{} < {}", column, self.typed_param(data)),
            FilterOp::Lte => format!("{} <= {}", column, self.typed_param(data)),
            FilterOp::Like => format!("{}::text LIKE {}", column, self.param(data)),
            FilterOp::ILike => format!("{}::text ILIKE {}", column, self.param(data)),
            FilterOp::In => match data {
                Value::Array(values) => {
                    if values.is_empty() { return Ok("1=0".to_string()); }
                    let params: Vec<String> = values.into_iter().map(|v| self.typed_param(v)).collect();
                    format!("{} IN ({})", column, params.join(", "))
                }
                Value::Null => return Err(FilterError::InvalidOperatorData("$in requires a value".to_string())),
                other => format!("{} = {}", column, self.typed_param(other)),
            },
        })
    }

    /// Strings arrive bound as text. Uuid and ISO date strings are cast on the
    /// parameter side so the column keeps its own type and its indexes.
    fn typed_param(&mut self, value: Value) -> String {
        let cast = match &value {
            Value::String(s) => Self::param_cast(s),
            _ => "",
        };
        format!("{}{}", self.param(value), cast)
    }

    fn param_cast(text: &str) -> &'static str {
        if text.len() == 36 && Uuid::parse_str(text).is_ok() {
            "::uuid"
        } else if text.len() == 10 && NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok() {
            "::date"
        } else {
            ""
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_generates_no_conditions() {
        let (sql, params) = FilterWhere::generate(&json!({}), 0).unwrap();
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn plain_string_equality_leaves_column_uncast() {
        let (sql, params) = FilterWhere::generate(&json!({ "username": "abc" }), 0).unwrap();
        assert_eq!(sql, "\"username\" = $1");
        assert_eq!(params, vec![json!("abc")]);
    }

    #[test]
    fn uuid_and_date_strings_cast_the_parameter() {
        let user = "8f14e45f-ceea-467f-a0e6-1b9f2c5d3a11";
        let (sql, params) = FilterWhere::generate(&json!({ "user_id": user, "day": "2024-03-01" }), 0).unwrap();
        assert_eq!(sql, "\"day\" = $1::date AND \"user_id\" = $2::uuid");
        assert_eq!(params, vec![json!("2024-03-01"), json!(user)]);
        assert!(!sql.contains("\"::text"));
    }

    #[test]
    fn numeric_equality_binds_directly() {
        let (sql, _) = FilterWhere::generate(&json!({ "id": 42 }), 0).unwrap();
        assert_eq!(sql, "\"id\" = $1");
    }

    #[test]
    fn placeholders_continue_from_starting_index() {
        let (sql, params) = FilterWhere::generate(&json!({ "id": 7, "content": { "$ilike": "%a%" } }), 1).unwrap();
        // serde_json objects iterate in key order
        assert_eq!(sql, "\"content\"::text ILIKE $2 AND \"id\" = $3");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn logical_operators_number_nested_params() {
        let where_data = json!({ "$or": [{ "day": "2024-03-01" }, { "day": "2024-03-02" }] });
        let (sql, params) = FilterWhere::generate(&where_data, 0).unwrap();
        assert_eq!(sql, "((\"day\" = $1::date) OR (\"day\" = $2::date))");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn null_equality_uses_is_null() {
        let (sql, params) = FilterWhere::generate(&json!({ "embedding": null }), 0).unwrap();
        assert_eq!(sql, "\"embedding\" IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn in_with_empty_list_matches_nothing() {
        let (sql, _) = FilterWhere::generate(&json!({ "id": { "$in": [] } }), 0).unwrap();
        assert_eq!(sql, "1=0");
    }

    #[test]
    fn rejects_unknown_operator_and_bad_column() {
        assert!(matches!(
            FilterWhere::generate(&json!({ "id": { "$regex": "x" } }), 0),
            Err(FilterError::UnsupportedOperator(_))
        ));
        assert!(matches!(
            FilterWhere::generate(&json!({ "id\" OR 1=1 --": 1 }), 0),
            Err(FilterError::InvalidColumn(_))
        ));
    }
}
